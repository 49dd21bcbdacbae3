//! Backpatch : placeholders d'adresse et une pile explicite par famille de construction
//! (conditionnel, switch, random).

use qscript_core::{ByteWriter, QbResult, Tag};

use crate::error::{CompileError, CompileResult};

/* ─────────────────────────── Placeholders ─────────────────────────── */

/// Écrit `tag` + un champ i16 nul ; renvoie l'offset du champ.
pub(crate) fn emit_short_placeholder(out: &mut ByteWriter, tag: Tag) -> QbResult<usize> {
    out.write_tag(tag)?;
    let field = out.len();
    out.write_i16_le(0);
    Ok(field)
}

/// Écrit `tag` + un champ i32 nul ; renvoie l'offset du champ.
pub(crate) fn emit_long_placeholder(out: &mut ByteWriter, tag: Tag) -> QbResult<usize> {
    out.write_tag(tag)?;
    let field = out.len();
    out.write_i32_le(0);
    Ok(field)
}

#[allow(clippy::cast_possible_wrap)]
const fn distance(from: usize, to: usize) -> i64 { to as i64 - from as i64 }

/// Adresse courte : relative au champ lui-même.
pub(crate) fn patch_short(out: &mut ByteWriter, field: usize, target: usize, line: u32) -> CompileResult<()> {
    let distance = distance(field, target);
    let rel = i16::try_from(distance).map_err(|_| CompileError::JumpOutOfRange { line, distance })?;
    out.patch_i16_le(field, rel)?;
    Ok(())
}

/// Adresse longue : relative à la position qui suit le champ.
pub(crate) fn patch_long(out: &mut ByteWriter, field: usize, target: usize, line: u32) -> CompileResult<()> {
    let distance = distance(field + 4, target);
    let rel = i32::try_from(distance).map_err(|_| CompileError::JumpOutOfRange { line, distance })?;
    out.patch_i32_le(field, rel)?;
    Ok(())
}

/* ─────────────────────────── Cadres ─────────────────────────── */

/// Branche conditionnelle en attente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CondKind {
    If,
    Else,
}

#[derive(Debug, Clone)]
pub(crate) struct CondFrame {
    pub kind: CondKind,
    /// Champ i16 à patcher.
    pub field: usize,
    pub line: u32,
}

/// Un `CASE`/`DEFAULT` émis dans un switch rapide.
#[derive(Debug, Clone)]
pub(crate) struct CaseSlot {
    /// Saut « vers la fin » qui précède le case (absent pour le premier).
    pub skip: Option<usize>,
    /// Offset du tag `CASE`/`DEFAULT`.
    pub at: usize,
    /// Saut « vers le case suivant » qui suit le tag.
    pub body: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct SwitchFrame {
    pub cases: Vec<CaseSlot>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct RandomFrame {
    /// Offset de l'en-tête.
    pub header: usize,
    /// Nombre de branches déclarées.
    pub count: usize,
    /// Branches déjà ouvertes.
    pub filled: usize,
    /// Champs des sauts « vers la fin » posés avant chaque branche sauf la première.
    pub end_jumps: Vec<usize>,
    pub line: u32,
}

impl RandomFrame {
    /// Champ d'adresse de la branche `i` dans la table de l'en-tête.
    pub const fn slot(&self, i: usize) -> usize { self.header + 5 + 2 * self.count + 4 * i }
}

/// Les trois piles, vivantes le temps d'une compilation.
#[derive(Debug, Default)]
pub(crate) struct Frames {
    pub conds: Vec<CondFrame>,
    pub switches: Vec<SwitchFrame>,
    pub randoms: Vec<RandomFrame>,
}

impl Frames {
    /// Première construction restée ouverte, s'il y en a une.
    pub fn unterminated(&self) -> Option<CompileError> {
        if let Some(f) = self.conds.last() {
            let construct = match f.kind {
                CondKind::If => "IF",
                CondKind::Else => "ELSE",
            };
            return Some(CompileError::Unbalanced {
                construct,
                line: f.line,
                message: "missing ENDIF".into(),
            });
        }
        if let Some(f) = self.switches.last() {
            return Some(CompileError::Unbalanced {
                construct: "SWITCH",
                line: f.line,
                message: "missing ENDSWITCH".into(),
            });
        }
        self.randoms.last().map(|f| CompileError::Unbalanced {
            construct: "RANDOM",
            line: f.line,
            message: "missing RANDOMEND".into(),
        })
    }
}
