//! Erreurs du codec QB.

use thiserror::Error;

/// Alias résultat du codec.
pub type QbResult<T> = core::result::Result<T, QbError>;

/// Erreurs de lecture/écriture du flux d'instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QbError {
    /// Une lecture déborderait du buffer.
    #[error("out of range: need {needed} bytes at offset {offset} (buffer is {len} bytes)")]
    OutOfRange {
        /// Offset de la lecture fautive.
        offset: usize,
        /// Nombre d'octets demandés.
        needed: usize,
        /// Taille du buffer.
        len: usize,
    },
    /// Octet de tag sans règle de décodage.
    #[error("unknown tag {tag} at offset {offset}")]
    UnknownTag {
        /// Octet brut.
        tag: u8,
        /// Offset du tag.
        offset: usize,
    },
    /// Adresse relative pointant hors du buffer.
    #[error("address field at offset {offset} points outside the buffer (target {target})")]
    BadAddress {
        /// Offset du champ d'adresse.
        offset: usize,
        /// Cible calculée.
        target: i64,
    },
    /// Un tag interne (négatif) a atteint l'encodeur.
    #[error("internal tag {tag} cannot be encoded")]
    InternalTag {
        /// Valeur du tag.
        tag: i8,
    },
}

impl QbError {
    /// Construit une erreur `OutOfRange`.
    #[must_use]
    pub const fn out_of_range(offset: usize, needed: usize, len: usize) -> Self {
        Self::OutOfRange { offset, needed, len }
    }
}
