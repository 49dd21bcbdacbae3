//! qscript-compiler - QScript → QB en une passe
//!
//! - Entrée : texte source UTF-8 (lexé par `qscript-lexer`)
//! - Sortie : flux d'instructions QB, table checksum → nom en queue, `EndOfFile`
//! - Deux cibles : `Target::Thug1` (mots-clés seuls) et `Target::Thug2`
//!   (if/else/switch encodés avec des sauts courts backpatchés)
//! - Random pondéré (`RANDOM(...)` / `RANDOMCASE` / `RANDOMEND`) sur les deux cibles
//! - Erreurs : `CompileError` (syntaxe, construction déséquilibrée, collision de checksums,
//!   saut hors plage) ; aucune sortie partielle
//!
//! API principale :
//! ```
//! use qscript_compiler::{compile, Target};
//!
//! let qb = compile("foo = 1\n", Target::Thug1).unwrap();
//! assert_eq!(qb[0], 22); // Name
//! assert_eq!(*qb.last().unwrap(), 0); // EndOfFile
//! ```

#![deny(missing_docs)]

mod backpatch;
mod codegen;
/// Erreurs de compilation.
pub mod error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use qscript_core::SourceId;
use qscript_lexer::{Lexer, LineMap};

pub use error::{CompileError, CompileResult};

/* ─────────────────────────── Options ─────────────────────────── */

/// Jeu d'instructions visé.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Target {
    /// Mots-clés complets ; les branches sont résolues à l'exécution.
    #[default]
    Thug1,
    /// If/else/switch/case compacts, avec sauts courts.
    Thug2,
}

impl Target {
    /// Vrai pour la cible à sauts courts.
    #[must_use]
    pub const fn is_fast(self) -> bool { matches!(self, Self::Thug2) }
}

/// Options du compilateur.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompileOptions {
    /// Cible.
    pub target: Target,
    /// Émettre `EndOfLineNumber(ligne)` au lieu de `EndOfLine`.
    pub line_numbers: bool,
}

/* ─────────────────────────── Façade ─────────────────────────── */

/// Le compilateur QScript.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    /// Options.
    pub options: CompileOptions,
}

impl Compiler {
    /// Crée un compilateur.
    #[must_use]
    pub const fn new(options: CompileOptions) -> Self { Self { options } }

    /// Compile une source complète.
    pub fn compile(&self, source: &str) -> CompileResult<Vec<u8>> {
        let lines = LineMap::new(source);
        let tokens = Lexer::new(source, SourceId(0)).tokenize().map_err(|e| {
            let (line, column) = lines.line_col(e.span.start);
            CompileError::Lex { line, column, source: e }
        })?;
        log::debug!("compiling {} tokens for {:?}", tokens.len(), self.options.target);
        codegen::Generator::new(tokens, lines, &self.options).run()
    }
}

/// Raccourci : compile `source` pour `target` sans numéros de ligne.
pub fn compile(source: &str, target: Target) -> CompileResult<Vec<u8>> {
    Compiler::new(CompileOptions { target, ..CompileOptions::default() }).compile(source)
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use qscript_core::{checksum, QbReader, Tag, Token};

    fn thug1(src: &str) -> Vec<u8> { compile(src, Target::Thug1).unwrap() }
    fn thug2(src: &str) -> Vec<u8> { compile(src, Target::Thug2).unwrap() }

    fn table(qb: &[u8]) -> Vec<(u32, String)> {
        QbReader::new(qb)
            .tokens()
            .filter_map(|t| match t.unwrap().1 {
                Token::ChecksumName(crc, text) => Some((crc, text)),
                _ => None,
            })
            .collect()
    }

    fn name(crc: u32) -> Vec<u8> {
        let mut v = vec![Tag::Name as u8];
        v.extend_from_slice(&crc.to_le_bytes());
        v
    }

    #[test]
    fn assignment_with_name_table() {
        let foo = checksum("foo");
        let mut expected = name(foo);
        expected.extend_from_slice(&[7, 23, 1, 0, 0, 0, 1, 43]);
        expected.extend_from_slice(&foo.to_le_bytes());
        expected.extend_from_slice(b"foo\0");
        expected.push(0);
        assert_eq!(thug1("foo = 1\n"), expected);
    }

    #[test]
    fn blank_lines_collapse() {
        let qb = thug1("a\n\n\n\nb\n");
        assert_eq!(qb[5], Tag::EndOfLine as u8);
        assert_eq!(qb[6], Tag::Name as u8);
        assert_eq!(qb[11], Tag::EndOfLine as u8);
        assert_eq!(qb[12], Tag::ChecksumName as u8);
    }

    #[test]
    fn markers_do_not_split_blank_lines() {
        let qb = thug1("RANDOM(1)\nRANDOMCASE\nx\nRANDOMEND\n");
        // en-tête (11 octets), une seule fin de ligne, puis le corps
        assert_eq!(qb[11], Tag::EndOfLine as u8);
        assert_eq!(qb[12], Tag::Name as u8);
        assert_eq!(QbReader::new(&qb).random_header(0).unwrap().targets, vec![12]);
    }

    #[test]
    fn line_numbers_mode() {
        let opts = CompileOptions { target: Target::Thug1, line_numbers: true };
        let qb = Compiler::new(opts).compile("a\n\nb\n").unwrap();
        let r = QbReader::new(&qb);
        assert_eq!(qb[5], Tag::EndOfLineNumber as u8);
        assert_eq!(r.read_u32(6).unwrap(), 1);
        assert_eq!(qb[15], Tag::EndOfLineNumber as u8);
        assert_eq!(r.read_u32(16).unwrap(), 3);
    }

    #[test]
    fn pair_and_vector() {
        let qb = thug1("PAIR(1, -2.5) VECTOR(0x10, 2, 3.0)");
        let r = QbReader::new(&qb);
        assert_eq!(qb[0], Tag::Pair as u8);
        assert_eq!(r.read_f32(1).unwrap(), 1.0);
        assert_eq!(r.read_f32(5).unwrap(), -2.5);
        assert_eq!(qb[9], Tag::Vector as u8);
        assert_eq!(r.read_f32(10).unwrap(), 16.0);
        assert_eq!(r.read_f32(18).unwrap(), 3.0);
    }

    #[test]
    fn malformed_composites() {
        let err = compile("VECTOR(1, 2)", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::Syntax { ref message, .. } if message == "expected ','"));
        let err = compile("PAIR 1, 2)", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::Syntax { ref message, .. } if message == "expected '('"));
        let err = compile("PAIR(1, a)", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::Syntax { ref message, .. } if message == "expected integer or float"));
        let err = compile("PAIR(1,", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::Syntax { ref message, .. } if message == "unexpected end of script"));
    }

    #[test]
    fn random_patches_slots_and_end_jumps() {
        let qb = thug1("RANDOM(1, 2)\nRANDOMCASE a\nRANDOMCASE b\nRANDOMEND\n");
        let r = QbReader::new(&qb);
        let h = r.random_header(0).unwrap();
        assert_eq!(h.weights, vec![1, 2]);
        assert_eq!(h.targets, vec![18, 29]);
        assert_eq!(qb[24], Tag::Jump as u8);
        assert_eq!(r.long_address(25).unwrap(), 35);
        // RANDOMEND n'écrit rien : la fin de ligne qui suit est fusionnée
        assert_eq!(qb[34], Tag::EndOfLine as u8);
        assert_eq!(qb[35], Tag::ChecksumName as u8);
    }

    #[test]
    fn random_weights_accept_floats_and_trailing_comma() {
        let qb = thug1("RANDOM_PERMUTE(2.9, 3,)\nRANDOMCASE\nRANDOMCASE\nRANDOMEND");
        let h = QbReader::new(&qb).random_header(0).unwrap();
        assert_eq!(h.tag, Tag::RandomPermute);
        assert_eq!(h.weights, vec![2, 3]);
    }

    #[test]
    fn random_case_count_must_match() {
        let err = compile("RANDOM(1, 1)\nRANDOMCASE a\nRANDOMEND\n", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::Unbalanced { construct: "RANDOMEND", line: 3, .. }));
        let err = compile("RANDOM(1)\nRANDOMCASE a\nRANDOMCASE b\n", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::Unbalanced { construct: "RANDOMCASE", line: 3, .. }));
        let err = compile("RANDOM(1)\nRANDOMCASE a\n", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::Unbalanced { construct: "RANDOM", line: 1, .. }));
        let err = compile("RANDOMCASE\n", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::Unbalanced { construct: "RANDOMCASE", .. }));
    }

    #[test]
    fn fast_if_else_addresses() {
        let qb = thug2("IF a\nb\nELSE\nc\nENDIF\n");
        let r = QbReader::new(&qb);
        assert_eq!(qb[0], Tag::FastIf as u8);
        assert_eq!(r.short_address(1).unwrap(), 18);
        assert_eq!(qb[15], Tag::FastElse as u8);
        assert_eq!(r.short_address(16).unwrap(), 26);
        assert_eq!(qb[25], Tag::EndIf as u8);
    }

    #[test]
    fn full_keyword_target_has_no_addresses() {
        let qb = thug1("IF a\nELSEIF b\nENDIF\n");
        assert_eq!(qb[0], Tag::If as u8);
        assert_eq!(qb[7], Tag::ElseIf as u8);
        assert_eq!(qb[14], Tag::EndIf as u8);
    }

    #[test]
    fn fast_conditionals_must_balance() {
        let cases = [
            ("ELSE\n", "ELSE"),
            ("ENDIF\n", "ENDIF"),
            ("IF a\nELSE\nELSE\nENDIF\n", "ELSE"),
            ("IF a\n", "IF"),
        ];
        for (src, construct) in cases {
            match compile(src, Target::Thug2) {
                Err(CompileError::Unbalanced { construct: c, .. }) => assert_eq!(c, construct, "{src:?}"),
                other => panic!("{src:?}: {other:?}"),
            }
        }
        assert!(matches!(compile("IF a\nELSEIF b\nENDIF", Target::Thug2), Err(CompileError::Syntax { .. })));
    }

    #[test]
    fn fast_switch_jumps() {
        // SWITCH a / CASE 1 / CASE 2 / DEFAULT / ENDSWITCH
        let qb = thug2("SWITCH a\nCASE 1\nb\nCASE 2\nc\nDEFAULT\nd\nENDSWITCH\n");
        let r = QbReader::new(&qb);
        let end = qb.iter().position(|b| *b == Tag::EndSwitch as u8).unwrap();
        let cases: Vec<usize> = (0..end)
            .filter(|i| matches!(qb[*i], 62 | 63) && qb[*i + 1] == Tag::ShortJump as u8)
            .collect();
        assert_eq!(cases.len(), 3);
        // échec du test : vers le case suivant, puis vers ENDSWITCH
        assert_eq!(r.short_address(cases[0] + 2).unwrap(), cases[1]);
        assert_eq!(r.short_address(cases[1] + 2).unwrap(), cases[2]);
        assert_eq!(r.short_address(cases[2] + 2).unwrap(), end);
        // fin de corps : juste après ENDSWITCH
        for c in &cases[1..] {
            assert_eq!(qb[c - 3], Tag::ShortJump as u8);
            assert_eq!(r.short_address(c - 2).unwrap(), end + 1);
        }
    }

    #[test]
    fn fast_switch_must_balance() {
        assert!(matches!(compile("CASE 1\n", Target::Thug2), Err(CompileError::Unbalanced { construct: "CASE", .. })));
        assert!(matches!(compile("ENDSWITCH\n", Target::Thug2), Err(CompileError::Unbalanced { .. })));
        assert!(matches!(compile("SWITCH a\n", Target::Thug2), Err(CompileError::Unbalanced { construct: "SWITCH", .. })));
        assert!(compile("CASE 1\n", Target::Thug1).is_ok());
    }

    #[test]
    fn collisions_and_repeats() {
        let err = compile("plumless = buckeroo\n", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::ChecksumCollision { ref existing, .. } if existing == "plumless"));
        let qb = thug1("Foo = foo + FOO\n");
        assert_eq!(table(&qb), vec![(checksum("foo"), "Foo".to_owned())]);
    }

    #[test]
    fn args_and_checksum_literals() {
        let qb = thug1("<speed> %(0xdeadbeef) <%(0x1)>");
        assert_eq!(qb[0], Tag::Arg as u8);
        assert_eq!(&qb[1..6], name(checksum("speed")).as_slice());
        assert_eq!(&qb[6..11], name(0xDEAD_BEEF).as_slice());
        assert_eq!(&qb[11..17], [45, 22, 1, 0, 0, 0].as_slice());
        // seul "speed" va dans la table
        assert_eq!(table(&qb), vec![(checksum("speed"), "speed".to_owned())]);
    }

    #[test]
    fn lex_errors_are_located() {
        let err = compile("a = 1\nb = @", Target::Thug1).unwrap_err();
        assert!(matches!(err, CompileError::Lex { line: 2, column: 5, .. }));
        assert!(err.to_string().starts_with("line 2, column 5: syntax error"));
    }
}
