//! Pré-scan : étiquettes synthétiques et table checksum → nom.
//!
//! Un seul passage du début à `EndOfFile` ; rien n'est rendu ici. Les adresses
//! sont validées par le codec (`BadAddress` si une cible sort du buffer).

use std::cmp::Reverse;
use std::collections::BTreeMap;

use qscript_core::{checksum, ChecksumTable, QbReader, QbResult, Tag, Token};

/// Nature d'une étiquette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelKind {
    /// Cible d'un saut court (if/else/switch rapides).
    Branch,
    /// Début d'une branche random.
    RandomCase,
    /// Fin d'un bloc random.
    RandomEnd,
}

/// Étiquette posée sur un offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label {
    /// Nature.
    pub kind: LabelKind,
    /// Offset de l'en-tête random propriétaire (0 pour une branche).
    pub owner: usize,
}

/// Offset → étiquettes, dans l'ordre d'impression.
pub type LabelMap = BTreeMap<usize, Vec<Label>>;

/// Résultat du pré-scan.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    /// Étiquettes par offset.
    pub labels: LabelMap,
    /// Noms lus dans la table de queue.
    pub names: ChecksumTable,
}

impl Resolved {
    /// Étiquettes posées sur `offset` (vide si aucune).
    #[must_use]
    pub fn labels_at(&self, offset: usize) -> &[Label] {
        self.labels.get(&offset).map_or(&[], Vec::as_slice)
    }

    fn add(&mut self, offset: usize, label: Label) {
        let slot = self.labels.entry(offset).or_default();
        if !slot.contains(&label) {
            slot.push(label);
        }
    }

    fn random(&mut self, reader: &QbReader<'_>, pos: usize) -> QbResult<()> {
        let header = reader.random_header(pos)?;
        let case = Label { kind: LabelKind::RandomCase, owner: pos };
        let end = Label { kind: LabelKind::RandomEnd, owner: pos };
        for &target in &header.targets {
            self.add(target, case);
        }
        match header.targets.as_slice() {
            [] => self.add(header.end, end),
            // aucun saut de fin : RANDOMEND n'occupe pas d'octet, on le colle à la branche
            [only] => self.add(*only, end),
            [_, rest @ ..] => {
                for &target in rest {
                    let Some(jump) = target.checked_sub(5) else { continue };
                    if reader.read_u8(jump)? != Tag::Jump as u8 {
                        log::warn!("random at {pos:#x}: no end jump before case at {target:#x}");
                        continue;
                    }
                    let address = reader.long_address(jump + 1)?;
                    self.add(address, end);
                }
            }
        }
        Ok(())
    }

    fn name(&mut self, crc: u32, text: &str) {
        if checksum(text) != crc {
            log::warn!("name {text:?} does not hash to 0x{crc:08x}, ignored");
            return;
        }
        if let Err(c) = self.names.insert_with(crc, text) {
            log::warn!("{c}, keeping {:?}", c.existing);
        }
    }
}

/// Parcourt `bytes` et construit les deux tables.
pub fn resolve(bytes: &[u8]) -> QbResult<Resolved> {
    let reader = QbReader::new(bytes);
    let mut out = Resolved::default();
    for item in reader.tokens() {
        let (pos, tok) = item?;
        match tok {
            Token::ShortBranch { .. } => {
                let target = reader.short_address(pos + 1)?;
                out.add(target, Label { kind: LabelKind::Branch, owner: 0 });
            }
            Token::Random { .. } => out.random(&reader, pos)?,
            Token::ChecksumName(crc, text) => out.name(crc, &text),
            _ => {}
        }
    }
    // branches d'abord, puis le random le plus interne ; CASE avant END pour un même en-tête
    for labels in out.labels.values_mut() {
        labels.sort_by_key(|l| (l.kind != LabelKind::Branch, Reverse(l.owner), l.kind));
    }
    log::debug!("resolved {} labelled offsets, {} names", out.labels.len(), out.names.len());
    Ok(out)
}
