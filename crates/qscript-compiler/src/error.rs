//! Erreurs de compilation.

use qscript_core::{Collision, QbError};
use qscript_lexer::LexError;
use thiserror::Error;

/// Résultat de compilation.
pub type CompileResult<T> = core::result::Result<T, CompileError>;

/// Erreur fatale : la compilation s'arrête sans sortie partielle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Forme de jeton inattendue (délimiteur manquant, liste de poids, ...).
    #[error("line {line}, column {column}: syntax error: {message}")]
    Syntax {
        /// Ligne (1-based).
        line: u32,
        /// Colonne (1-based).
        column: u32,
        /// Message.
        message: String,
    },
    /// Construction ouverte sans fermeture, ou l'inverse.
    #[error("line {line}: unbalanced {construct}: {message}")]
    Unbalanced {
        /// Mot-clé fautif.
        construct: &'static str,
        /// Ligne du mot-clé.
        line: u32,
        /// Message.
        message: String,
    },
    /// Deux identifiants distincts partagent un checksum.
    #[error("checksum collision 0x{checksum:08x}: {existing:?} and {incoming:?}")]
    ChecksumCollision {
        /// Checksum partagé.
        checksum: u32,
        /// Identifiant déjà vu.
        existing: String,
        /// Identifiant entrant.
        incoming: String,
    },
    /// Saut court hors de la plage i16.
    #[error("line {line}: branch distance {distance} does not fit in a short jump")]
    JumpOutOfRange {
        /// Ligne du mot-clé qui ferme le bloc.
        line: u32,
        /// Distance demandée.
        distance: i64,
    },
    /// Erreur lexicale (rendue comme erreur de syntaxe localisée).
    #[error("line {line}, column {column}: syntax error: {source}")]
    Lex {
        /// Ligne (1-based).
        line: u32,
        /// Colonne (1-based).
        column: u32,
        /// Erreur du lexer.
        source: LexError,
    },
    /// Erreur d'encodage.
    #[error(transparent)]
    Encode(#[from] QbError),
}

impl From<Collision> for CompileError {
    fn from(c: Collision) -> Self {
        Self::ChecksumCollision { checksum: c.checksum, existing: c.existing, incoming: c.incoming }
    }
}
