//! qscript-disasm - QB → QScript
//!
//! Deux passages sur le buffer, tous deux via `QbReader::skip_token` :
//! 1. `resolve` : étiquettes synthétiques (branches random, cibles des sauts
//!    courts) et table checksum → nom lue en queue de flux ;
//! 2. `Disassembler` : rendu texte, indentation reconstruite.
//!
//! Aucune cible n'est demandée : les encodages rapides se décrivent eux-mêmes.
//! Un checksum sans nom est rendu `%(0x…)` et signalé (`log::warn!` +
//! `Disassembly::unresolved`) ; c'est la seule condition non fatale.
//!
//! ```
//! use qscript_compiler::{compile, Target};
//!
//! let qb = compile("foo = 1\n", Target::Thug1).unwrap();
//! assert_eq!(qscript_disasm::decompile(&qb).unwrap(), "foo = 1\n");
//! ```

#![deny(missing_docs)]

/// Désassembleur et options de rendu.
pub mod disassembler;
mod render;
/// Pré-scan étiquettes / noms.
pub mod resolver;

pub use disassembler::{DisasmOptions, Disassembler, Disassembly};
pub use resolver::{resolve, Label, LabelKind, LabelMap, Resolved};

use qscript_core::QbResult;

/// Décompile avec les options par défaut.
pub fn decompile(bytes: &[u8]) -> QbResult<String> {
    Disassembler::default().disassemble(bytes).map(|d| d.text)
}
