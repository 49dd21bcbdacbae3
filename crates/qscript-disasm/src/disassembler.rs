//! Désassembleur : second passage sur le flux, rendu ligne par ligne.
//!
//! Indentation : `depth` courant + deux ajustements en attente (`pre` avant la
//! ligne, `post` après), appliqués au flush puis remis à zéro.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use qscript_core::{ChecksumTable, QbReader, QbResult, Tag, Token};

use crate::render;
use crate::resolver::{resolve, Label, LabelKind};

/* ─────────────────────────── Options / résultat ─────────────────────────── */

/// Options de rendu.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisasmOptions {
    /// Unité d'indentation (une tabulation par défaut).
    pub indent: String,
    /// Imprime `LABEL_<offset>:` sur les cibles des sauts courts (texte non recompilable).
    pub branch_labels: bool,
}

impl Default for DisasmOptions {
    fn default() -> Self { Self { indent: "\t".into(), branch_labels: false } }
}

/// Texte produit et diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disassembly {
    /// Source QScript.
    pub text: String,
    /// Checksums sans nom connu, rendus `%(0x…)` (triés, sans doublon).
    pub unresolved: Vec<u32>,
}

/// Le décompilateur QB.
#[derive(Debug, Clone, Default)]
pub struct Disassembler {
    /// Options.
    pub options: DisasmOptions,
}

impl Disassembler {
    /// Crée un désassembleur.
    #[must_use]
    pub const fn new(options: DisasmOptions) -> Self { Self { options } }

    /// Décompile un buffer complet (terminé par `EndOfFile`).
    pub fn disassemble(&self, bytes: &[u8]) -> QbResult<Disassembly> {
        let resolved = resolve(bytes)?;
        let mut printer = Printer::new(&self.options, &resolved.names);
        for item in QbReader::new(bytes).tokens() {
            let (pos, tok) = item?;
            for label in resolved.labels_at(pos) {
                printer.label(pos, *label);
            }
            printer.token(tok);
        }
        let out = printer.finish();
        log::debug!("decompiled {} bytes, {} unresolved names", bytes.len(), out.unresolved.len());
        Ok(out)
    }
}

/* ─────────────────────────── Impression ─────────────────────────── */

struct Printer<'a> {
    opts: &'a DisasmOptions,
    names: &'a ChecksumTable,
    out: String,
    line: Vec<String>,
    depth: i32,
    pre: i32,
    post: i32,
    /// Le nom suivant est un argument.
    arg: bool,
    /// La ligne courante contient `ENDSCRIPT`.
    script_end: bool,
    unresolved: BTreeSet<u32>,
}

impl<'a> Printer<'a> {
    fn new(opts: &'a DisasmOptions, names: &'a ChecksumTable) -> Self {
        Self {
            opts,
            names,
            out: String::new(),
            line: Vec::new(),
            depth: 0,
            pre: 0,
            post: 0,
            arg: false,
            script_end: false,
            unresolved: BTreeSet::new(),
        }
    }

    fn push(&mut self, piece: impl Into<String>) { self.line.push(piece.into()); }

    fn label(&mut self, pos: usize, label: Label) {
        match label.kind {
            LabelKind::Branch if self.opts.branch_labels => self.push(format!("LABEL_{pos}:")),
            LabelKind::Branch => {}
            LabelKind::RandomCase => self.push("RANDOMCASE"),
            LabelKind::RandomEnd => {
                self.pre -= 1;
                self.push("RANDOMEND");
            }
        }
    }

    fn token(&mut self, tok: Token) {
        let arg = std::mem::take(&mut self.arg);
        match tok {
            Token::Simple(Tag::EndOfLine) | Token::EndOfLineNumber(_) => self.flush(),
            Token::Simple(Tag::Arg) => self.arg = true,
            Token::Simple(tag) | Token::ShortBranch { tag, .. } => {
                self.indent(tag);
                if let Some(text) = tag.text() {
                    self.push(text);
                }
            }
            Token::NameChecksum(crc) => {
                let name = self.name(crc);
                self.push(if arg { format!("<{name}>") } else { name });
            }
            Token::Integer(v) => self.push(v.to_string()),
            Token::HexInteger(v) => self.push(format!("0x{v:x}")),
            Token::Float(v) => self.push(render::float(v)),
            Token::String(bytes) => self.push(format!("\"{}\"", render::escape(&bytes))),
            Token::LocalString(bytes) => self.push(format!("#\"{}\"", render::escape(&bytes))),
            Token::Pair(x, y) => self.push(format!("PAIR({}, {})", render::float(x), render::float(y))),
            Token::Vector(x, y, z) => self.push(format!(
                "VECTOR({}, {}, {})",
                render::float(x),
                render::float(y),
                render::float(z)
            )),
            Token::Random { tag, weights, .. } => {
                self.post += 1;
                let weights: Vec<String> = weights.iter().map(u16::to_string).collect();
                self.push(format!("{}({})", tag.keyword().unwrap_or("RANDOM"), weights.join(", ")));
            }
            // sauts de fin random, table de queue : pas de texte
            Token::Jump(_) | Token::ChecksumName(..) => {}
            // jamais produits par le décodeur
            Token::Name(_) | Token::Arg(_) | Token::ArgChecksum(_) => {}
        }
    }

    fn indent(&mut self, tag: Tag) {
        use Tag::*;
        match tag {
            StartStruct | StartArray | Script | Begin | If | FastIf => self.post += 1,
            EndStruct | EndArray | EndIf => self.pre -= 1,
            EndScript => {
                self.pre -= 1;
                self.script_end = true;
            }
            Else | ElseIf | FastElse | Case | Default => {
                self.depth -= 1;
                self.post += 1;
            }
            Switch => self.post += 2,
            EndSwitch => self.pre -= 2,
            Repeat => self.depth -= 1,
            _ => {}
        }
    }

    fn name(&mut self, crc: u32) -> String {
        match self.names.get(crc) {
            Some(text) if render::is_identifier(text) && Tag::from_keyword(text).is_none() => text.to_owned(),
            Some(text) if render::is_quotable(text) => format!("%\"{text}\""),
            Some(_) => render::checksum_literal(crc),
            None => {
                if self.unresolved.insert(crc) {
                    log::warn!("unresolved checksum 0x{crc:08x}");
                }
                render::checksum_literal(crc)
            }
        }
    }

    /// Écrit la ligne courante ; l'ajustement net s'applique avant l'indentation
    /// s'il est négatif, après sinon.
    fn write_line(&mut self) {
        let net = self.pre + self.post;
        if net < 0 {
            self.depth += net;
        }
        if !self.line.is_empty() {
            let depth = usize::try_from(self.depth).unwrap_or(0);
            self.out.push_str(&self.opts.indent.repeat(depth));
            self.out.push_str(&self.line.join(" "));
        }
        if net > 0 {
            self.depth += net;
        }
        self.depth = self.depth.max(0);
        self.pre = 0;
        self.post = 0;
        self.line.clear();
    }

    fn flush(&mut self) {
        self.write_line();
        self.out.push('\n');
        if std::mem::take(&mut self.script_end) {
            self.out.push('\n');
        }
    }

    /// Dernière ligne sans retour final : une étiquette posée sur la table de queue
    /// reste ainsi en fin de texte.
    fn finish(mut self) -> Disassembly {
        if !self.line.is_empty() {
            self.write_line();
        }
        if self.out.ends_with("\n\n") {
            self.out.pop();
        }
        Disassembly { text: self.out, unresolved: self.unresolved.into_iter().collect() }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
