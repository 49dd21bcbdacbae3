//! Checksums d'identifiants.
//!
//! Le checksum est un CRC-32 (polynôme réfléchi `0xEDB88320`, init `0xFFFFFFFF`)
//! **sans** inversion finale, calculé sur le texte normalisé : lettres ASCII en
//! minuscules, `/` remplacé par `\`. Deux identifiants qui ne diffèrent que par la
//! casse sont donc le même identifiant.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[inline]
const fn normalize(b: u8) -> u8 {
    match b {
        b'/' => b'\\',
        _ => b.to_ascii_lowercase(),
    }
}

/// Checksum d'un identifiant.
#[must_use]
pub fn checksum(text: &str) -> u32 {
    let norm: Vec<u8> = text.bytes().map(normalize).collect();
    // crc32fast applique l'inversion finale ; on la défait.
    !crc32fast::hash(&norm)
}

/// Deux textes distincts pour un même checksum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("checksum collision 0x{checksum:08x}: {existing:?} and {incoming:?}")]
pub struct Collision {
    /// Checksum partagé.
    pub checksum: u32,
    /// Texte déjà enregistré.
    pub existing: String,
    /// Texte qui entre en collision.
    pub incoming: String,
}

/// Table checksum → texte d'origine (ordre d'itération trié par checksum).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChecksumTable {
    names: BTreeMap<u32, String>,
}

impl ChecksumTable {
    /// Table vide.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Calcule le checksum de `text` et l'enregistre.
    pub fn insert(&mut self, text: &str) -> Result<u32, Collision> {
        let crc = checksum(text);
        self.insert_with(crc, text)?;
        Ok(crc)
    }

    /// Enregistre `text` sous un checksum donné.
    ///
    /// La première orthographe est conservée ; un texte différent après
    /// normalisation est une collision.
    pub fn insert_with(&mut self, crc: u32, text: &str) -> Result<(), Collision> {
        match self.names.get(&crc) {
            None => {
                self.names.insert(crc, text.to_owned());
                Ok(())
            }
            Some(existing) if same_identifier(existing, text) => Ok(()),
            Some(existing) => Err(Collision {
                checksum: crc,
                existing: existing.clone(),
                incoming: text.to_owned(),
            }),
        }
    }

    /// Texte associé à un checksum.
    #[must_use]
    pub fn get(&self, crc: u32) -> Option<&str> { self.names.get(&crc).map(String::as_str) }

    /// Nombre d'entrées.
    #[must_use]
    pub fn len(&self) -> usize { self.names.len() }

    /// Vrai si la table est vide.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.names.is_empty() }

    /// Entrées triées par checksum.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.names.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

fn same_identifier(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.bytes().zip(b.bytes()).all(|(x, y)| normalize(x) == normalize(y))
}

/* ─────────────────────────── Tests ─────────────────────────── */
