//! qscript-core - primitives partagées par le compilateur et le décompilateur QB
//!
//! Fournit :
//! - `SourceId`, `Pos`, `Span`, `Spanned<T>`
//! - `Tag` : table des tags d'instruction (octet sur le fil, tags internes négatifs)
//! - `Token` : modèle de jeton (tag + charge utile minimale)
//! - `checksum()` + `ChecksumTable` (checksum → texte d'origine, détection de collisions)
//! - Codec binaire little-endian : `ByteWriter`, `QbReader` (lectures bornées, `skip_token`)
//! - Erreurs `QbError` + alias `QbResult<T>`
//!
//! Features :
//! - `serde` : derive (dé)sérialisation sur `Tag`, `Token`, `Span`

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Checksums d'identifiants et table checksum → texte.
pub mod checksum;
/// Lecture/écriture du flux d'instructions QB.
pub mod codec;
/// Erreurs du codec.
pub mod error;
/// Table des tags d'instruction.
pub mod tag;
/// Modèle de jeton partagé.
pub mod token;

pub use checksum::{checksum, ChecksumTable, Collision};
pub use codec::{ByteWriter, QbReader, RandomHeader, Tokens};
pub use error::{QbError, QbResult};
pub use tag::Tag;
pub use token::Token;

/* ─────────────────────────── Spans / Positions ─────────────────────────── */

/// Identifiant de source (fichier, buffer, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceId(pub u32);

/// Position (offset byte) depuis le début de la source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pos(pub u32);

impl Pos {
    /// Position nulle.
    pub const ZERO: Self = Self(0);
}

/// Plage (demi-ouverte) `[start, end)` dans une source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Source d'où provient l'item.
    pub source: SourceId,
    /// Début inclus.
    pub start: Pos,
    /// Fin exclue.
    pub end: Pos,
}

impl Span {
    /// Crée un span.
    #[must_use]
    pub const fn new(source: SourceId, start: Pos, end: Pos) -> Self { Self { source, start, end } }
    /// Longueur en bytes.
    #[must_use]
    pub const fn len(&self) -> u32 { self.end.0.saturating_sub(self.start.0) }
    /// Vrai si le span est vide.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.start.0 >= self.end.0 }
}

/// Wrapper utilitaire « valeur + span ».
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spanned<T> {
    /// La valeur.
    pub value: T,
    /// La localisation.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Construit un `Spanned<T>`.
    pub const fn new(value: T, span: Span) -> Self { Self { value, span } }
}

/* ─────────────────────────── Prélude ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        checksum, ByteWriter, ChecksumTable, Pos, QbError, QbReader, QbResult, SourceId, Span,
        Spanned, Tag, Token,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
