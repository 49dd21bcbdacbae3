//! Générateur de code : une passe gauche → droite sur les jetons du lexer.
//!
//! Les jetons restent dans une file consommée par l'avant ; les littéraux composites
//! et les listes de poids tirent leurs jetons directement. Trois piles de backpatch,
//! table des checksums émise en fin de flux.

use std::collections::VecDeque;

use qscript_core::{ByteWriter, ChecksumTable, Pos, Spanned, Tag, Token};
use qscript_lexer::LineMap;

use crate::backpatch::{
    emit_long_placeholder, emit_short_placeholder, patch_long, patch_short, CaseSlot, CondFrame,
    CondKind, Frames, RandomFrame, SwitchFrame,
};
use crate::error::{CompileError, CompileResult};
use crate::CompileOptions;

pub(crate) struct Generator<'o> {
    tokens: VecDeque<Spanned<Token>>,
    lines: LineMap,
    opts: &'o CompileOptions,
    out: ByteWriter,
    names: ChecksumTable,
    frames: Frames,
    /// Début du dernier jeton consommé (diagnostics).
    at: Pos,
    /// Taille du flux juste après la dernière fin de ligne émise.
    eol_end: Option<usize>,
}

impl<'o> Generator<'o> {
    pub fn new(tokens: Vec<Spanned<Token>>, lines: LineMap, opts: &'o CompileOptions) -> Self {
        Self {
            tokens: tokens.into(),
            lines,
            opts,
            out: ByteWriter::new(),
            names: ChecksumTable::new(),
            frames: Frames::default(),
            at: Pos::ZERO,
            eol_end: None,
        }
    }

    /// Émet tout le flux, la table des noms et `EndOfFile`.
    pub fn run(mut self) -> CompileResult<Vec<u8>> {
        while let Some(tok) = self.pop() {
            self.emit(tok)?;
        }
        if let Some(err) = self.frames.unterminated() {
            return Err(err);
        }
        for (crc, text) in self.names.iter() {
            Token::ChecksumName(crc, text.to_owned()).encode(&mut self.out)?;
        }
        self.out.write_tag(Tag::EndOfFile)?;
        log::debug!("emitted {} bytes, {} names", self.out.len(), self.names.len());
        Ok(self.out.into_vec())
    }

    /* ────────── Flux de jetons ────────── */

    fn pop(&mut self) -> Option<Token> {
        let tok = self.tokens.pop_front()?;
        self.at = tok.span.start;
        Some(tok.value)
    }

    fn pop_required(&mut self) -> CompileResult<Token> {
        self.pop().ok_or_else(|| self.syntax("unexpected end of script"))
    }

    fn line(&self) -> u32 { self.lines.line_col(self.at).0 }

    fn syntax(&self, message: impl Into<String>) -> CompileError {
        let (line, column) = self.lines.line_col(self.at);
        CompileError::Syntax { line, column, message: message.into() }
    }

    fn unbalanced(&self, construct: &'static str, message: &str) -> CompileError {
        CompileError::Unbalanced { construct, line: self.line(), message: message.into() }
    }

    fn fast(&self) -> bool { self.opts.target.is_fast() }

    /* ────────── Dispatch ────────── */

    fn emit(&mut self, tok: Token) -> CompileResult<()> {
        log::trace!("@{:#x} {:?}", self.out.len(), tok);
        match tok {
            Token::Name(text) => {
                let crc = self.names.insert(&text)?;
                Token::NameChecksum(crc).encode(&mut self.out)?;
            }
            Token::Arg(text) => {
                let crc = self.names.insert(&text)?;
                Token::ArgChecksum(crc).encode(&mut self.out)?;
            }
            Token::Simple(Tag::EndOfLine) => self.end_of_line()?,
            Token::Simple(Tag::Pair) => self.pair()?,
            Token::Simple(Tag::Vector) => self.vector()?,
            Token::Simple(tag) if tag.is_random_header() => self.random_open(tag)?,
            Token::Simple(Tag::RandomCase) => self.random_case()?,
            Token::Simple(Tag::RandomEnd) => self.random_end()?,
            Token::Simple(tag @ (Tag::If | Tag::Else | Tag::ElseIf | Tag::EndIf)) if self.fast() => {
                self.conditional(tag)?;
            }
            Token::Simple(tag @ (Tag::Switch | Tag::Case | Tag::Default | Tag::EndSwitch)) if self.fast() => {
                self.switch(tag)?;
            }
            other => other.encode(&mut self.out)?,
        }
        Ok(())
    }

    /// Une seule fin de ligne pour une suite de retours.
    ///
    /// Le test porte sur le flux émis : `RANDOMCASE`/`RANDOMEND` n'écrivent rien
    /// et ne doivent pas séparer deux fins de ligne.
    fn end_of_line(&mut self) -> CompileResult<()> {
        if self.eol_end == Some(self.out.len()) {
            return Ok(());
        }
        if self.opts.line_numbers {
            Token::EndOfLineNumber(self.line()).encode(&mut self.out)?;
        } else {
            self.out.write_tag(Tag::EndOfLine)?;
        }
        self.eol_end = Some(self.out.len());
        Ok(())
    }

    /* ────────── Littéraux composites ────────── */

    fn expect(&mut self, tag: Tag, text: &str) -> CompileResult<()> {
        match self.pop_required()? {
            Token::Simple(t) if t == tag => Ok(()),
            _ => Err(self.syntax(format!("expected '{text}'"))),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn real(&mut self) -> CompileResult<f32> {
        match self.pop_required()? {
            Token::Float(v) => Ok(v),
            Token::Integer(v) => Ok(v as f32),
            Token::HexInteger(v) => Ok(v as f32),
            _ => Err(self.syntax("expected integer or float")),
        }
    }

    fn pair(&mut self) -> CompileResult<()> {
        self.expect(Tag::OpenParenth, "(")?;
        let x = self.real()?;
        self.expect(Tag::Comma, ",")?;
        let y = self.real()?;
        self.expect(Tag::CloseParenth, ")")?;
        Token::Pair(x, y).encode(&mut self.out)?;
        Ok(())
    }

    fn vector(&mut self) -> CompileResult<()> {
        self.expect(Tag::OpenParenth, "(")?;
        let x = self.real()?;
        self.expect(Tag::Comma, ",")?;
        let y = self.real()?;
        self.expect(Tag::Comma, ",")?;
        let z = self.real()?;
        self.expect(Tag::CloseParenth, ")")?;
        Token::Vector(x, y, z).encode(&mut self.out)?;
        Ok(())
    }

    /* ────────── Random ────────── */

    /// `( w1, w2, ... )` ; un flottant est tronqué vers le bas.
    fn weights(&mut self) -> CompileResult<Vec<u16>> {
        self.expect(Tag::OpenParenth, "(")?;
        let mut weights = Vec::new();
        loop {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let weight = match self.pop_required()? {
                Token::Simple(Tag::CloseParenth) => break,
                Token::Integer(v) => v as u16,
                Token::HexInteger(v) => v as u16,
                Token::Float(v) => v.floor() as i32 as u16,
                _ => return Err(self.syntax("expected integer or float")),
            };
            weights.push(weight);
            match self.pop_required()? {
                Token::Simple(Tag::CloseParenth) => break,
                Token::Simple(Tag::Comma) => {}
                _ => return Err(self.syntax("expected ',' or ')'")),
            }
        }
        Ok(weights)
    }

    fn random_open(&mut self, tag: Tag) -> CompileResult<()> {
        let line = self.line();
        let weights = self.weights()?;
        let count = weights.len();
        self.frames.randoms.push(RandomFrame {
            header: self.out.len(),
            count,
            filled: 0,
            end_jumps: Vec::new(),
            line,
        });
        Token::Random { tag, weights, jumps: vec![0; count] }.encode(&mut self.out)?;
        Ok(())
    }

    fn random_case(&mut self) -> CompileResult<()> {
        let line = self.line();
        let Some(frame) = self.frames.randoms.last_mut() else {
            return Err(self.unbalanced("RANDOMCASE", "no open RANDOM"));
        };
        if frame.filled >= frame.count {
            return Err(self.unbalanced("RANDOMCASE", "more cases than weights"));
        }
        if frame.filled != 0 {
            let field = emit_long_placeholder(&mut self.out, Tag::Jump)?;
            frame.end_jumps.push(field);
        }
        let slot = frame.slot(frame.filled);
        frame.filled += 1;
        let here = self.out.len();
        patch_long(&mut self.out, slot, here, line)
    }

    fn random_end(&mut self) -> CompileResult<()> {
        let line = self.line();
        match self.frames.randoms.last() {
            None => return Err(self.unbalanced("RANDOMEND", "no open RANDOM")),
            Some(f) if f.filled != f.count => {
                let msg = format!("random was incomplete ({} of {} cases)", f.filled, f.count);
                return Err(self.unbalanced("RANDOMEND", &msg));
            }
            Some(_) => {}
        }
        let Some(frame) = self.frames.randoms.pop() else { return Ok(()) };
        let end = self.out.len();
        for field in frame.end_jumps {
            patch_long(&mut self.out, field, end, line)?;
        }
        Ok(())
    }

    /* ────────── Conditionnel rapide ────────── */

    fn conditional(&mut self, tag: Tag) -> CompileResult<()> {
        let line = self.line();
        match tag {
            Tag::If => {
                let field = emit_short_placeholder(&mut self.out, Tag::FastIf)?;
                self.frames.conds.push(CondFrame { kind: CondKind::If, field, line });
            }
            Tag::Else => {
                let field = match self.frames.conds.last() {
                    Some(f) if f.kind == CondKind::If => f.field,
                    Some(_) => return Err(self.unbalanced("ELSE", "ELSE after ELSE")),
                    None => return Err(self.unbalanced("ELSE", "ELSE without IF")),
                };
                // saute le FastElse + son champ
                let target = self.out.len() + 3;
                patch_short(&mut self.out, field, target, line)?;
                self.frames.conds.pop();
                let field = emit_short_placeholder(&mut self.out, Tag::FastElse)?;
                self.frames.conds.push(CondFrame { kind: CondKind::Else, field, line });
            }
            Tag::EndIf => {
                let Some(frame) = self.frames.conds.pop() else {
                    return Err(self.unbalanced("ENDIF", "ENDIF without IF"));
                };
                let target = self.out.len() + 1;
                patch_short(&mut self.out, frame.field, target, line)?;
                self.out.write_tag(Tag::EndIf)?;
            }
            _ => return Err(self.syntax("ELSEIF is not available on the fast-branch target")),
        }
        Ok(())
    }

    /* ────────── Switch rapide ────────── */

    fn switch(&mut self, tag: Tag) -> CompileResult<()> {
        let line = self.line();
        match tag {
            Tag::Switch => {
                self.out.write_tag(Tag::Switch)?;
                self.frames.switches.push(SwitchFrame { cases: Vec::new(), line });
            }
            Tag::Case | Tag::Default => {
                let construct = if tag == Tag::Case { "CASE" } else { "DEFAULT" };
                let Some(frame) = self.frames.switches.last_mut() else {
                    return Err(self.unbalanced(construct, "no open SWITCH"));
                };
                let skip = if frame.cases.is_empty() {
                    None
                } else {
                    Some(emit_short_placeholder(&mut self.out, Tag::ShortJump)?)
                };
                let at = self.out.len();
                self.out.write_tag(tag)?;
                let body = emit_short_placeholder(&mut self.out, Tag::ShortJump)?;
                frame.cases.push(CaseSlot { skip, at, body });
            }
            _ => {
                let Some(frame) = self.frames.switches.pop() else {
                    return Err(self.unbalanced("ENDSWITCH", "no open SWITCH"));
                };
                let end = self.out.len();
                for (i, case) in frame.cases.iter().enumerate() {
                    let next = frame.cases.get(i + 1).map_or(end, |c| c.at);
                    patch_short(&mut self.out, case.body, next, line)?;
                    if let Some(skip) = case.skip {
                        patch_short(&mut self.out, skip, end + 1, line)?;
                    }
                }
                self.out.write_tag(Tag::EndSwitch)?;
            }
        }
        Ok(())
    }
}
