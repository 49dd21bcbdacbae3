//! Modèle de jeton partagé par le lexer, le compilateur et le décodeur.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::checksum::checksum;
use crate::codec::ByteWriter;
use crate::error::QbResult;
use crate::tag::Tag;

/// Jeton : un tag plus la charge utile minimale pour le ré-encoder.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Token {
    /// Tag sans charge utile (ponctuation, mot-clé, marqueur).
    Simple(Tag),
    /// Nom en clair.
    Name(String),
    /// Argument en clair, `<nom>`.
    Arg(String),
    /// Nom connu par son seul checksum.
    NameChecksum(u32),
    /// Argument connu par son seul checksum.
    ArgChecksum(u32),
    /// Entier signé.
    Integer(i32),
    /// Entier hexadécimal.
    HexInteger(u32),
    /// Flottant.
    Float(f32),
    /// Chaîne (octets, sans le NUL final).
    String(Vec<u8>),
    /// Chaîne localisée (octets, sans le NUL final).
    LocalString(Vec<u8>),
    /// `PAIR(x, y)`.
    Pair(f32, f32),
    /// `VECTOR(x, y, z)`.
    Vector(f32, f32, f32),
    /// Fin de ligne numérotée.
    EndOfLineNumber(u32),
    /// Saut relatif long (base = après le champ).
    Jump(i32),
    /// Saut relatif court (`FastIf`, `FastElse`, `ShortJump` ; base = le champ).
    ShortBranch {
        /// Tag porteur.
        tag: Tag,
        /// Déplacement relatif.
        offset: i16,
    },
    /// En-tête de la famille random.
    Random {
        /// `Random`, `Random2`, `RandomNoRepeat` ou `RandomPermute`.
        tag: Tag,
        /// Poids des branches.
        weights: Vec<u16>,
        /// Sauts relatifs longs vers chaque branche.
        jumps: Vec<i32>,
    },
    /// Entrée de table checksum → nom.
    ChecksumName(u32, String),
}

impl Token {
    /// Tag du jeton.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        match self {
            Self::Simple(tag) | Self::ShortBranch { tag, .. } | Self::Random { tag, .. } => *tag,
            Self::Name(_) => Tag::Name,
            Self::Arg(_) => Tag::Arg,
            Self::NameChecksum(_) => Tag::NameChecksum,
            Self::ArgChecksum(_) => Tag::ArgChecksum,
            Self::Integer(_) => Tag::Integer,
            Self::HexInteger(_) => Tag::HexInteger,
            Self::Float(_) => Tag::Float,
            Self::String(_) => Tag::String,
            Self::LocalString(_) => Tag::LocalString,
            Self::Pair(..) => Tag::Pair,
            Self::Vector(..) => Tag::Vector,
            Self::EndOfLineNumber(_) => Tag::EndOfLineNumber,
            Self::Jump(_) => Tag::Jump,
            Self::ChecksumName(..) => Tag::ChecksumName,
        }
    }

    /// Vrai si le jeton est une valeur (opérande) plutôt qu'un opérateur.
    #[must_use]
    pub const fn is_operand(&self) -> bool {
        matches!(
            self,
            Self::Name(_)
                | Self::Arg(_)
                | Self::NameChecksum(_)
                | Self::ArgChecksum(_)
                | Self::Integer(_)
                | Self::HexInteger(_)
                | Self::Float(_)
                | Self::String(_)
                | Self::LocalString(_)
                | Self::Simple(Tag::CloseParenth | Tag::EndArray | Tag::EndStruct)
        )
    }

    /// Encode le jeton à la fin de `w`.
    ///
    /// Les noms en clair sont encodés par leur checksum ; les marqueurs internes
    /// (`RANDOMCASE`, `RANDOMEND`, ...) échouent avec `InternalTag`.
    pub fn encode(&self, w: &mut ByteWriter) -> QbResult<()> {
        match self {
            Self::Simple(tag) => w.write_tag(*tag)?,
            Self::Name(text) => encode_name(w, false, checksum(text))?,
            Self::Arg(text) => encode_name(w, true, checksum(text))?,
            Self::NameChecksum(crc) => encode_name(w, false, *crc)?,
            Self::ArgChecksum(crc) => encode_name(w, true, *crc)?,
            Self::Integer(v) => {
                w.write_tag(Tag::Integer)?;
                w.write_i32_le(*v);
            }
            Self::HexInteger(v) => {
                w.write_tag(Tag::HexInteger)?;
                w.write_u32_le(*v);
            }
            Self::Float(v) => {
                w.write_tag(Tag::Float)?;
                w.write_f32_le(*v);
            }
            Self::String(bytes) => {
                w.write_tag(Tag::String)?;
                w.write_sized(bytes);
            }
            Self::LocalString(bytes) => {
                w.write_tag(Tag::LocalString)?;
                w.write_sized(bytes);
            }
            Self::Pair(x, y) => {
                w.write_tag(Tag::Pair)?;
                w.write_f32_le(*x);
                w.write_f32_le(*y);
            }
            Self::Vector(x, y, z) => {
                w.write_tag(Tag::Vector)?;
                w.write_f32_le(*x);
                w.write_f32_le(*y);
                w.write_f32_le(*z);
            }
            Self::EndOfLineNumber(line) => {
                w.write_tag(Tag::EndOfLineNumber)?;
                w.write_u32_le(*line);
            }
            Self::Jump(rel) => {
                w.write_tag(Tag::Jump)?;
                w.write_i32_le(*rel);
            }
            Self::ShortBranch { tag, offset } => {
                w.write_tag(*tag)?;
                w.write_i16_le(*offset);
            }
            Self::Random { tag, weights, jumps } => {
                w.write_tag(*tag)?;
                #[allow(clippy::cast_possible_truncation)]
                let count = weights.len() as u32;
                w.write_u32_le(count);
                for weight in weights {
                    w.write_u16_le(*weight);
                }
                for jump in jumps {
                    w.write_i32_le(*jump);
                }
            }
            Self::ChecksumName(crc, text) => {
                w.write_tag(Tag::ChecksumName)?;
                w.write_u32_le(*crc);
                w.write_cstr(text.as_bytes());
            }
        }
        Ok(())
    }
}

fn encode_name(w: &mut ByteWriter, arg: bool, crc: u32) -> QbResult<()> {
    if arg {
        w.write_tag(Tag::Arg)?;
    }
    w.write_tag(Tag::Name)?;
    w.write_u32_le(crc);
    Ok(())
}

/* ─────────────────────────── Tests ─────────────────────────── */
