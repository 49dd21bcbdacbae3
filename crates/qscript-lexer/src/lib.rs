//! qscript-lexer - analyse lexicale QScript
//!
//! Faits saillants :
//! - `Lexer` : produit des `Spanned<Token>` (modèle partagé de `qscript-core`)
//! - fins de ligne explicites (`EndOfLine`), commentaires `//` et `/* */`, continuation `\` + retour
//! - mots-clés **insensibles à la casse**, noms `%"texte"`, checksums `%(0x…)`, arguments `<nom>`
//! - nombres accumulés chiffre par chiffre (décimal, hex, flottants), signe géré au lexing
//! - chaînes décodées en **octets** (échappements C, octal 1..3 chiffres, hex 1..2 chiffres)
//! - `LineMap` pour `(ligne, colonne)`
//!
//! Exemple éclair :
//! ```
//! use qscript_core::{SourceId, Tag, Token};
//! use qscript_lexer::Lexer;
//!
//! let toks = Lexer::new("foo = -1\n", SourceId(0)).tokenize().unwrap();
//! let kinds: Vec<Token> = toks.into_iter().map(|t| t.value).collect();
//! assert_eq!(kinds, vec![
//!     Token::Name("foo".into()),
//!     Token::Simple(Tag::Equals),
//!     Token::Integer(-1),
//!     Token::Simple(Tag::EndOfLine),
//! ]);
//! ```

#![deny(missing_docs)]

use core::fmt;

use qscript_core::{Pos, SourceId, Span, Spanned, Tag, Token};

/* ─────────────────────────── LineMap ─────────────────────────── */

/// Table des lignes pour (byte offset) → (ligne, colonne).
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Offsets des débuts de lignes (toujours contient 0).
    pub line_starts: Vec<u32>,
}

impl LineMap {
    /// Construit la table à partir d'un `&str`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(src: &str) -> Self {
        let mut ls = Vec::with_capacity(64);
        ls.push(0);
        for (i, b) in src.as_bytes().iter().enumerate() {
            if *b == b'\n' {
                ls.push((i as u32) + 1);
            }
        }
        Self { line_starts: ls }
    }

    /// Convertit un `Pos` en (ligne, colonne), 1-based.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn line_col(&self, pos: Pos) -> (u32, u32) {
        let off = pos.0;
        let idx = match self.line_starts.binary_search(&off) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts.get(idx).copied().unwrap_or(0);
        let col = off.saturating_sub(line_start) + 1;
        ((idx as u32) + 1, col)
    }

    /// Nombre de lignes.
    #[must_use]
    pub fn line_count(&self) -> usize { self.line_starts.len() }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Genre d'erreur lexicale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Caractère inattendu.
    UnexpectedChar(char),
    /// Commentaire bloc non terminé.
    UnterminatedBlockComment,
    /// Chaîne non terminée (fin de ligne ou de fichier).
    UnterminatedString,
    /// Littéral numérique invalide.
    InvalidNumber,
    /// `%` non suivi de `"texte"` ni de `(0x…)`.
    MalformedName,
    /// Argument `<%…` sans `>` final.
    MalformedArgument,
}

/// Erreur lexicale avec localisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Localisation.
    pub span: Span,
    /// Genre d'erreur.
    pub kind: LexErrorKind,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LexErrorKind::*;
        match &self.kind {
            UnexpectedChar(c) => write!(f, "unexpected character: {c:?}"),
            UnterminatedBlockComment => write!(f, "unterminated block comment"),
            UnterminatedString => write!(f, "unterminated string literal"),
            InvalidNumber => write!(f, "invalid number literal"),
            MalformedName => write!(f, "expected %\"name\" or %(0x checksum)"),
            MalformedArgument => write!(f, "expected '>' to close argument"),
        }
    }
}

impl std::error::Error for LexError {}

/* ─────────────────────────── Lexer ─────────────────────────── */

/// Analyseur lexical (itératif, une seule passe).
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    /// Position courante en bytes.
    off: usize,
    /// Id de la source.
    source: SourceId,
    /// Le jeton précédent est une valeur (règle du signe).
    prev_operand: bool,
    /// Table des lignes (exposée pour diagnostics).
    pub lines: LineMap,
}

impl<'a> Lexer<'a> {
    /// Crée un lexer.
    #[must_use]
    pub fn new(src: &'a str, source: SourceId) -> Self {
        Self { src, bytes: src.as_bytes(), off: 0, source, prev_operand: false, lines: LineMap::new(src) }
    }

    /// Prochain jeton, `None` en fin de source.
    pub fn next(&mut self) -> Result<Option<Spanned<Token>>, LexError> {
        use Tag::*;
        let spaced = self.skip_ws_and_comments()?;
        let start = self.off;
        let Some(c) = self.bump() else { return Ok(None) };

        let tok = match c {
            b'\n' => Token::Simple(EndOfLine),
            c if is_ident_start(c) => {
                self.consume_while(is_ident_continue);
                let word = &self.src[start..self.off];
                Tag::from_keyword(word).map_or_else(|| Token::Name(word.to_owned()), Token::Simple)
            }
            b'0'..=b'9' => self.lex_number(start, start, false)?,
            b'-' | b'+'
                if self.peek().is_some_and(|b| b.is_ascii_digit()) && (spaced || !self.prev_operand) =>
            {
                self.lex_number(start, self.off, c == b'-')?
            }
            b'"' => Token::String(self.lex_string(start, b'"')?),
            b'\'' => Token::LocalString(self.lex_string(start, b'\'')?),
            b'#' if self.eat(b'"') => Token::LocalString(self.lex_string(start, b'"')?),
            b'%' => self.lex_name(start, false)?,
            b'<' => self.lex_angle(start)?,
            b'>' => {
                if self.eat(b'>') {
                    Token::Simple(ShiftRight)
                } else if self.eat(b'=') {
                    Token::Simple(GreaterThanEqual)
                } else {
                    Token::Simple(GreaterThan)
                }
            }
            b'=' => Token::Simple(if self.eat(b'=') { SameAs } else { Equals }),
            b'!' => Token::Simple(Not),
            b'{' => Token::Simple(StartStruct),
            b'}' => Token::Simple(EndStruct),
            b'[' => Token::Simple(StartArray),
            b']' => Token::Simple(EndArray),
            b'(' => Token::Simple(OpenParenth),
            b')' => Token::Simple(CloseParenth),
            b'.' => Token::Simple(Dot),
            b',' => Token::Simple(Comma),
            b':' => Token::Simple(Colon),
            b'-' => Token::Simple(Minus),
            b'+' => Token::Simple(Add),
            b'*' => Token::Simple(Multiply),
            b'/' => Token::Simple(Divide),
            b'|' => Token::Simple(Or),
            b'&' => Token::Simple(And),
            b'^' => Token::Simple(Xor),
            _ => return Err(self.unexpected(start)),
        };

        self.prev_operand = tok.is_operand();
        Ok(Some(Spanned::new(tok, self.span_from(start))))
    }

    /// Tokenise toute la source.
    pub fn tokenize(mut self) -> Result<Vec<Spanned<Token>>, LexError> {
        let mut out = Vec::new();
        while let Some(t) = self.next()? {
            log::trace!("lex {:?} @ {}..{}", t.value, t.span.start.0, t.span.end.0);
            out.push(t);
        }
        log::debug!("lexed {} tokens over {} lines", out.len(), self.lines.line_count());
        Ok(out)
    }

    /* ────────── Primitives internes ────────── */

    #[inline] fn peek(&self) -> Option<u8> { self.bytes.get(self.off).copied() }
    #[inline] fn peek2(&self) -> Option<u8> { self.bytes.get(self.off + 1).copied() }
    #[inline] fn bump(&mut self) -> Option<u8> { let b = self.peek(); if b.is_some() { self.off += 1; } b }
    #[inline] fn eat(&mut self, b: u8) -> bool { if self.peek() == Some(b) { self.off += 1; true } else { false } }

    fn consume_while(&mut self, mut p: impl FnMut(u8) -> bool) {
        while let Some(b) = self.peek() {
            if p(b) { self.off += 1; } else { break; }
        }
    }

    /// Saute blancs, commentaires et continuations ; vrai si quelque chose a été sauté.
    fn skip_ws_and_comments(&mut self) -> Result<bool, LexError> {
        let start = self.off;
        loop {
            self.consume_while(|b| matches!(b, b' ' | b'\t' | b'\r' | 0x0B | 0x0C));
            match (self.peek(), self.peek2()) {
                (Some(b'/'), Some(b'/')) => self.consume_while(|b| b != b'\n'),
                (Some(b'/'), Some(b'*')) => {
                    let open = self.off;
                    let body = &self.bytes[open + 2..];
                    match body.windows(2).position(|w| w == b"*/") {
                        Some(i) => self.off = open + 2 + i + 2,
                        None => {
                            self.off = self.bytes.len();
                            return Err(self.err_from(open, LexErrorKind::UnterminatedBlockComment));
                        }
                    }
                }
                (Some(b'\\'), Some(b'\n')) => self.off += 2,
                (Some(b'\\'), Some(b'\r')) if self.bytes.get(self.off + 2) == Some(&b'\n') => self.off += 3,
                _ => break,
            }
        }
        Ok(self.off > start)
    }

    /// Entier (décimal/hex) ou flottant ; `digits` pointe sur le premier chiffre.
    fn lex_number(&mut self, start: usize, digits: usize, minus: bool) -> Result<Token, LexError> {
        self.off = digits;
        if self.peek() == Some(b'0') && matches!(self.peek2(), Some(b'x' | b'X')) {
            self.off += 2;
            let hex_start = self.off;
            let mut value: u32 = 0;
            while let Some(d) = self.peek().and_then(hex_val) {
                value = value.wrapping_mul(16).wrapping_add(u32::from(d));
                self.off += 1;
            }
            if self.off == hex_start {
                return Err(self.err_from(start, LexErrorKind::InvalidNumber));
            }
            self.reject_trailing(start)?;
            return Ok(Token::HexInteger(if minus { value.wrapping_neg() } else { value }));
        }

        let mut int: i32 = 0;
        let mut real: f64 = 0.0;
        while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
            let d = d - b'0';
            int = int.wrapping_mul(10).wrapping_add(i32::from(d));
            real = real.mul_add(10.0, f64::from(d));
            self.off += 1;
        }

        if self.peek() == Some(b'.') && self.peek2().is_some_and(|b| b.is_ascii_digit()) {
            self.off += 1;
            let mut decimal = 10.0;
            while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
                real += f64::from(d - b'0') / decimal;
                decimal *= 10.0;
                self.off += 1;
            }
            self.reject_trailing(start)?;
            if minus {
                real = -real;
            }
            #[allow(clippy::cast_possible_truncation)]
            let value = real as f32;
            return Ok(Token::Float(value));
        }

        self.reject_trailing(start)?;
        Ok(Token::Integer(if minus { int.wrapping_neg() } else { int }))
    }

    fn reject_trailing(&self, start: usize) -> Result<(), LexError> {
        if self.peek().is_some_and(is_ident_continue) {
            return Err(self.err_from(start, LexErrorKind::InvalidNumber));
        }
        Ok(())
    }

    /// Corps d'une chaîne jusqu'à `quote` (exclu), échappements décodés.
    fn lex_string(&mut self, start: usize, quote: u8) -> Result<Vec<u8>, LexError> {
        let mut out = Vec::new();
        loop {
            let c = match self.bump() {
                None | Some(b'\n') => return Err(self.err_from(start, LexErrorKind::UnterminatedString)),
                Some(c) => c,
            };
            if c == quote {
                break;
            }
            if c != b'\\' {
                out.push(c);
                continue;
            }
            let Some(e) = self.bump() else {
                return Err(self.err_from(start, LexErrorKind::UnterminatedString));
            };
            match e {
                b'a' => out.push(0x07),
                b'b' => out.push(0x08),
                b'f' => out.push(0x0C),
                b'n' => out.push(b'\n'),
                b'r' => out.push(b'\r'),
                b't' => out.push(b'\t'),
                b'v' => out.push(0x0B),
                b'0'..=b'7' => {
                    let mut v = u32::from(e - b'0');
                    for _ in 0..2 {
                        match self.peek() {
                            Some(d @ b'0'..=b'7') => {
                                v = v * 8 + u32::from(d - b'0');
                                self.off += 1;
                            }
                            _ => break,
                        }
                    }
                    // \777 déborde : on garde l'octet de poids faible
                    #[allow(clippy::cast_possible_truncation)]
                    out.push(v as u8);
                }
                b'x' => {
                    let mut v: u8 = 0;
                    let mut n = 0;
                    while n < 2 {
                        let Some(d) = self.peek().and_then(hex_val) else { break };
                        v = (v << 4) | d;
                        self.off += 1;
                        n += 1;
                    }
                    out.push(if n == 0 { b'x' } else { v });
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    /// Après `%` : `"texte"` ou `(0xHEX)`.
    fn lex_name(&mut self, start: usize, arg: bool) -> Result<Token, LexError> {
        if self.eat(b'"') {
            let text_start = self.off;
            loop {
                match self.bump() {
                    Some(b'"') => break,
                    None | Some(b'\n') => return Err(self.err_from(start, LexErrorKind::UnterminatedString)),
                    Some(_) => {}
                }
            }
            let text = self.src[text_start..self.off - 1].to_owned();
            return Ok(if arg { Token::Arg(text) } else { Token::Name(text) });
        }
        if self.eat(b'(') && self.eat(b'0') && (self.eat(b'x') || self.eat(b'X')) {
            let hex_start = self.off;
            let mut crc: u32 = 0;
            while let Some(d) = self.peek().and_then(hex_val) {
                if self.off - hex_start == 8 {
                    return Err(self.err_from(start, LexErrorKind::MalformedName));
                }
                crc = (crc << 4) | u32::from(d);
                self.off += 1;
            }
            if self.off > hex_start && self.eat(b')') {
                return Ok(if arg { Token::ArgChecksum(crc) } else { Token::NameChecksum(crc) });
            }
        }
        Err(self.err_from(start, LexErrorKind::MalformedName))
    }

    /// Après `<` : `<...>`, `<<`, `<=`, `<nom>`, `<%…>` ou `<`.
    fn lex_angle(&mut self, start: usize) -> Result<Token, LexError> {
        if self.bytes[self.off..].starts_with(b"...>") {
            self.off += 4;
            return Ok(Token::Simple(Tag::AllArgs));
        }
        if self.eat(b'<') {
            return Ok(Token::Simple(Tag::ShiftLeft));
        }
        if self.eat(b'=') {
            return Ok(Token::Simple(Tag::LessThanEqual));
        }
        if self.eat(b'%') {
            let tok = self.lex_name(start, true)?;
            if !self.eat(b'>') {
                return Err(self.err_from(start, LexErrorKind::MalformedArgument));
            }
            return Ok(tok);
        }
        if self.peek().is_some_and(is_ident_start) {
            let name_start = self.off;
            let mut end = name_start;
            while self.bytes.get(end).copied().is_some_and(is_ident_continue) {
                end += 1;
            }
            if self.bytes.get(end) == Some(&b'>') {
                self.off = end + 1;
                return Ok(Token::Arg(self.src[name_start..end].to_owned()));
            }
        }
        Ok(Token::Simple(Tag::LessThan))
    }

    /* ────────── Spans / erreurs ────────── */

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn span_from(&self, start: usize) -> Span {
        Span { source: self.source, start: Pos(start as u32), end: Pos(self.off as u32) }
    }
    #[inline] fn err_from(&self, start: usize, kind: LexErrorKind) -> LexError { LexError { span: self.span_from(start), kind } }

    fn unexpected(&mut self, start: usize) -> LexError {
        let ch = self.src[start..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
        self.off = start + ch.len_utf8();
        self.err_from(start, LexErrorKind::UnexpectedChar(ch))
    }
}

/* ─────────────────────────── Helpers ─────────────────────────── */

#[inline]
const fn is_ident_start(b: u8) -> bool { b == b'_' || b.is_ascii_alphabetic() }

#[inline]
const fn is_ident_continue(b: u8) -> bool { b == b'_' || b.is_ascii_alphanumeric() }

#[inline]
const fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
