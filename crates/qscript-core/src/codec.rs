//! Codec binaire QB (little-endian).
//!
//! - `ByteWriter` : écriture en fin de buffer + patch d'adresses déjà émises.
//! - `QbReader` : lectures **bornées** à une position donnée, `skip_token`
//!   (longueur d'une instruction déduite de son seul tag), `read_token`.
//!
//! Deux bases d'adressage coexistent : une adresse longue (4 octets) est relative
//! à la position qui suit le champ, une adresse courte (2 octets) est relative à
//! la position du champ lui-même.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{QbError, QbResult};
use crate::tag::Tag;
use crate::token::Token;

/* ─────────────────────────── Byte Writer (LE) ─────────────────────────── */

/// Buffer d'écriture (croît automatiquement).
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Crée un writer vide.
    #[must_use]
    pub fn new() -> Self { Self { buf: Vec::new() } }
    /// Taille courante (= offset du prochain octet écrit).
    #[must_use]
    pub fn len(&self) -> usize { self.buf.len() }
    /// Vrai si rien n'a été écrit.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }
    /// Accès en lecture au contenu.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] { &self.buf }
    /// Récupère le buffer (consomme).
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> { self.buf }

    /// Écrit l'octet d'un tag (refuse les tags internes).
    pub fn write_tag(&mut self, tag: Tag) -> QbResult<()> {
        self.buf.push(tag.wire_byte()?);
        Ok(())
    }
    /// Ajoute des octets bruts.
    pub fn write_bytes(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }
    /// Écrit un u16 little-endian.
    pub fn write_u16_le(&mut self, v: u16) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Écrit un i16 little-endian.
    pub fn write_i16_le(&mut self, v: i16) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Écrit un u32 little-endian.
    pub fn write_u32_le(&mut self, v: u32) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Écrit un i32 little-endian.
    pub fn write_i32_le(&mut self, v: i32) { self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Écrit un f32 little-endian (bits bruts).
    pub fn write_f32_le(&mut self, v: f32) { self.buf.extend_from_slice(&v.to_le_bytes()); }

    /// Octets suivis d'un NUL.
    pub fn write_cstr(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.buf.push(0);
    }

    /// Longueur u32 (NUL compris), octets, NUL.
    pub fn write_sized(&mut self, bytes: &[u8]) {
        #[allow(clippy::cast_possible_truncation)]
        let len = (bytes.len() + 1) as u32;
        self.write_u32_le(len);
        self.write_cstr(bytes);
    }

    fn slot(&mut self, at: usize, n: usize) -> QbResult<&mut [u8]> {
        let len = self.buf.len();
        at.checked_add(n)
            .and_then(|end| self.buf.get_mut(at..end))
            .ok_or(QbError::out_of_range(at, n, len))
    }

    /// Réécrit un i16 déjà émis.
    pub fn patch_i16_le(&mut self, at: usize, v: i16) -> QbResult<()> {
        LittleEndian::write_i16(self.slot(at, 2)?, v);
        Ok(())
    }

    /// Réécrit un i32 déjà émis.
    pub fn patch_i32_le(&mut self, at: usize, v: i32) -> QbResult<()> {
        LittleEndian::write_i32(self.slot(at, 4)?, v);
        Ok(())
    }
}

/* ─────────────────────────── Reader borné ─────────────────────────── */

/// En-tête random décodé (cibles absolues).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomHeader {
    /// Tag de la famille.
    pub tag: Tag,
    /// Poids.
    pub weights: Vec<u16>,
    /// Offset absolu de chaque branche.
    pub targets: Vec<usize>,
    /// Offset qui suit l'en-tête.
    pub end: usize,
}

/// Lecteur à accès aléatoire sur un buffer QB.
#[derive(Debug, Clone, Copy)]
pub struct QbReader<'a> {
    data: &'a [u8],
}

impl<'a> QbReader<'a> {
    /// Construit un lecteur.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self { Self { data } }
    /// Taille du buffer.
    #[must_use]
    pub const fn len(&self) -> usize { self.data.len() }
    /// Vrai si le buffer est vide.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.data.is_empty() }

    /// `n` octets à `pos`, ou `OutOfRange`.
    pub fn field(&self, pos: usize, n: usize) -> QbResult<&'a [u8]> {
        pos.checked_add(n)
            .and_then(|end| self.data.get(pos..end))
            .ok_or(QbError::out_of_range(pos, n, self.data.len()))
    }

    fn ensure(&self, pos: usize, n: usize) -> QbResult<usize> {
        self.field(pos, n).map(|_| pos + n)
    }

    /// Octet brut.
    pub fn read_u8(&self, pos: usize) -> QbResult<u8> { Ok(self.field(pos, 1)?[0]) }
    /// u16 LE.
    pub fn read_u16(&self, pos: usize) -> QbResult<u16> { Ok(LittleEndian::read_u16(self.field(pos, 2)?)) }
    /// i16 LE.
    pub fn read_i16(&self, pos: usize) -> QbResult<i16> { Ok(LittleEndian::read_i16(self.field(pos, 2)?)) }
    /// u32 LE.
    pub fn read_u32(&self, pos: usize) -> QbResult<u32> { Ok(LittleEndian::read_u32(self.field(pos, 4)?)) }
    /// i32 LE.
    pub fn read_i32(&self, pos: usize) -> QbResult<i32> { Ok(LittleEndian::read_i32(self.field(pos, 4)?)) }
    /// f32 LE (réinterprétation des bits).
    pub fn read_f32(&self, pos: usize) -> QbResult<f32> { Ok(LittleEndian::read_f32(self.field(pos, 4)?)) }

    /// Tag à `pos` ; `UnknownTag` si l'octet n'a pas de sens.
    pub fn read_tag(&self, pos: usize) -> QbResult<Tag> {
        let b = self.read_u8(pos)?;
        Tag::from_byte(b).ok_or(QbError::UnknownTag { tag: b, offset: pos })
    }

    fn target(&self, field: usize, base: usize, rel: i64) -> QbResult<usize> {
        #[allow(clippy::cast_possible_wrap)]
        let target = base as i64 + rel;
        usize::try_from(target)
            .ok()
            .filter(|t| *t <= self.data.len())
            .ok_or(QbError::BadAddress { offset: field, target })
    }

    /// Adresse longue : champ i32 à `pos`, base = `pos + 4`.
    pub fn long_address(&self, pos: usize) -> QbResult<usize> {
        let rel = self.read_i32(pos)?;
        self.target(pos, pos + 4, i64::from(rel))
    }

    /// Adresse courte : champ i16 à `pos`, base = `pos`.
    pub fn short_address(&self, pos: usize) -> QbResult<usize> {
        let rel = self.read_i16(pos)?;
        self.target(pos, pos, i64::from(rel))
    }

    fn cstr_end(&self, pos: usize) -> QbResult<usize> {
        let len = self.data.len();
        self.data
            .get(pos..)
            .and_then(|rest| rest.iter().position(|b| *b == 0))
            .map(|i| pos + i + 1)
            .ok_or(QbError::out_of_range(pos, len.saturating_sub(pos) + 1, len))
    }

    fn random_len(&self, pos: usize) -> QbResult<usize> {
        let count = self.read_u32(pos + 1)? as usize;
        let len = count.checked_mul(6).and_then(|t| t.checked_add(5));
        len.ok_or(QbError::out_of_range(pos, usize::MAX, self.data.len()))
    }

    /// Position du jeton suivant, ou `None` sur `EndOfFile`.
    ///
    /// Toute l'étendue du jeton est vérifiée contre la taille du buffer.
    pub fn skip_token(&self, pos: usize) -> QbResult<Option<usize>> {
        use Tag::*;
        let tag = self.read_tag(pos)?;
        let next = match tag {
            EndOfFile => return Ok(None),
            EndOfLine | StartStruct | EndStruct | StartArray | EndArray | Equals | Dot | Comma
            | Minus | Add | Divide | Multiply | OpenParenth | CloseParenth | SameAs | LessThan
            | LessThanEqual | GreaterThan | GreaterThanEqual | Begin | Repeat | Break | Script
            | EndScript | If | Else | ElseIf | EndIf | Return | AllArgs | Arg | Or | And | Xor
            | ShiftLeft | ShiftRight | RandomRange | RandomRange2 | Not | KeywordAnd | KeywordOr
            | Switch | EndSwitch | Case | Default | Colon => pos + 1,
            Name | Integer | HexInteger | Float | EndOfLineNumber | Jump => self.ensure(pos, 5)?,
            Pair => self.ensure(pos, 9)?,
            Vector => self.ensure(pos, 13)?,
            String | LocalString => {
                let len = self.read_u32(pos + 1)? as usize;
                self.ensure(pos + 5, len)?
            }
            ChecksumName => {
                self.ensure(pos, 5)?;
                self.cstr_end(pos + 5)?
            }
            Random | Random2 | RandomNoRepeat | RandomPermute => {
                let len = self.random_len(pos)?;
                self.ensure(pos, len)?
            }
            FastIf | FastElse | ShortJump => self.ensure(pos, 3)?,
            DebugInfo | Enum | Array | Undefined | At | RandomEnd | RandomCase | Label
            | NameChecksum | ArgChecksum => {
                return Err(QbError::UnknownTag { tag: self.read_u8(pos)?, offset: pos })
            }
        };
        Ok(Some(next))
    }

    /// Décode l'en-tête random à `pos`.
    pub fn random_header(&self, pos: usize) -> QbResult<RandomHeader> {
        let tag = self.read_tag(pos)?;
        let len = self.random_len(pos)?;
        let end = self.ensure(pos, len)?;
        let count = (len - 5) / 6;
        let weights = (0..count)
            .map(|i| self.read_u16(pos + 5 + 2 * i))
            .collect::<QbResult<Vec<_>>>()?;
        let slots = pos + 5 + 2 * count;
        let targets = (0..count)
            .map(|i| self.long_address(slots + 4 * i))
            .collect::<QbResult<Vec<_>>>()?;
        Ok(RandomHeader { tag, weights, targets, end })
    }

    /// Décode le jeton à `pos`.
    ///
    /// Les noms sont rendus sous forme de checksum (`Token::NameChecksum`) ; un
    /// `Arg` est un marqueur seul (`Token::Simple(Tag::Arg)`) suivi du nom.
    pub fn read_token(&self, pos: usize) -> QbResult<Token> {
        let next = self.skip_token(pos)?;
        let tag = self.read_tag(pos)?;
        let tok = match tag {
            Tag::Name => Token::NameChecksum(self.read_u32(pos + 1)?),
            Tag::Integer => Token::Integer(self.read_i32(pos + 1)?),
            Tag::HexInteger => Token::HexInteger(self.read_u32(pos + 1)?),
            Tag::Float => Token::Float(self.read_f32(pos + 1)?),
            Tag::EndOfLineNumber => Token::EndOfLineNumber(self.read_u32(pos + 1)?),
            Tag::Jump => Token::Jump(self.read_i32(pos + 1)?),
            Tag::Pair => Token::Pair(self.read_f32(pos + 1)?, self.read_f32(pos + 5)?),
            Tag::Vector => Token::Vector(
                self.read_f32(pos + 1)?,
                self.read_f32(pos + 5)?,
                self.read_f32(pos + 9)?,
            ),
            Tag::String | Tag::LocalString => {
                let end = next.unwrap_or(pos + 5);
                let mut bytes = self.data[pos + 5..end].to_vec();
                if bytes.last() == Some(&0) {
                    bytes.pop();
                }
                if tag == Tag::String { Token::String(bytes) } else { Token::LocalString(bytes) }
            }
            Tag::ChecksumName => {
                let end = next.unwrap_or(pos + 6);
                let text = &self.data[pos + 5..end - 1];
                Token::ChecksumName(self.read_u32(pos + 1)?, std::string::String::from_utf8_lossy(text).into_owned())
            }
            Tag::Random | Tag::Random2 | Tag::RandomNoRepeat | Tag::RandomPermute => {
                let count = (self.random_len(pos)? - 5) / 6;
                let weights = (0..count)
                    .map(|i| self.read_u16(pos + 5 + 2 * i))
                    .collect::<QbResult<Vec<_>>>()?;
                let slots = pos + 5 + 2 * count;
                let jumps = (0..count)
                    .map(|i| self.read_i32(slots + 4 * i))
                    .collect::<QbResult<Vec<_>>>()?;
                Token::Random { tag, weights, jumps }
            }
            Tag::FastIf | Tag::FastElse | Tag::ShortJump => {
                Token::ShortBranch { tag, offset: self.read_i16(pos + 1)? }
            }
            other => Token::Simple(other),
        };
        Ok(tok)
    }

    /// Itère sur `(offset, jeton)` depuis le début jusqu'à `EndOfFile` inclus.
    #[must_use]
    pub const fn tokens(&self) -> Tokens<'a> { Tokens { reader: *self, pos: Some(0) } }
}

/// Itérateur de jetons (voir [`QbReader::tokens`]).
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    reader: QbReader<'a>,
    pos: Option<usize>,
}

impl Iterator for Tokens<'_> {
    type Item = QbResult<(usize, Token)>;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.pos?;
        let step = self
            .reader
            .skip_token(pos)
            .and_then(|next| Ok((next, self.reader.read_token(pos)?)));
        match step {
            Ok((next, tok)) => {
                self.pos = next;
                Some(Ok((pos, tok)))
            }
            Err(e) => {
                self.pos = None;
                Some(Err(e))
            }
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
