//! Table des tags d'instruction QB.
//!
//! Un tag occupe un octet sur le fil. Les valeurs négatives sont des marqueurs
//! internes au compilateur et ne sont jamais sérialisées.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{QbError, QbResult};

/// Tag d'instruction (ou marqueur interne si négatif).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(i8)]
pub enum Tag {
    /* ── internes ── */
    /// `RANDOMEND` : ferme un bloc random (jamais émis).
    RandomEnd = -1,
    /// `RANDOMCASE` : ouvre une branche random (jamais émis).
    RandomCase = -2,
    /// Étiquette de source (réservé).
    Label = -3,
    /// Nom dont seul le checksum est connu, `%(0x…)`.
    NameChecksum = -4,
    /// Argument dont seul le checksum est connu, `<%(0x…)>`.
    ArgChecksum = -5,

    /* ── flux ── */
    /// Fin de flux.
    EndOfFile = 0,
    /// Fin de ligne.
    EndOfLine = 1,
    /// Fin de ligne + numéro de ligne (u32).
    EndOfLineNumber = 2,
    /// `{`
    StartStruct = 3,
    /// `}`
    EndStruct = 4,
    /// `[`
    StartArray = 5,
    /// `]`
    EndArray = 6,
    /// `=`
    Equals = 7,
    /// `.`
    Dot = 8,
    /// `,`
    Comma = 9,
    /// `-`
    Minus = 10,
    /// `+`
    Add = 11,
    /// `/`
    Divide = 12,
    /// `*`
    Multiply = 13,
    /// `(`
    OpenParenth = 14,
    /// `)`
    CloseParenth = 15,
    /// Infos de debug (ignoré par l'interpréteur, pas de décodage).
    DebugInfo = 16,
    /// `==`
    SameAs = 17,
    /// `<`
    LessThan = 18,
    /// `<=`
    LessThanEqual = 19,
    /// `>`
    GreaterThan = 20,
    /// `>=`
    GreaterThanEqual = 21,

    /* ── valeurs ── */
    /// Nom (checksum u32).
    Name = 22,
    /// Entier signé (i32).
    Integer = 23,
    /// Entier hexadécimal (u32).
    HexInteger = 24,
    /// Énumération (pas de décodage).
    Enum = 25,
    /// Flottant (f32).
    Float = 26,
    /// Chaîne (longueur u32 + octets + NUL).
    String = 27,
    /// Chaîne localisée.
    LocalString = 28,
    /// Tableau (pas de décodage).
    Array = 29,
    /// Vecteur (3 × f32).
    Vector = 30,
    /// Paire (2 × f32).
    Pair = 31,

    /* ── mots-clés ── */
    /// `BEGIN`
    Begin = 32,
    /// `REPEAT`
    Repeat = 33,
    /// `BREAK`
    Break = 34,
    /// `SCRIPT`
    Script = 35,
    /// `ENDSCRIPT`
    EndScript = 36,
    /// `IF`
    If = 37,
    /// `ELSE`
    Else = 38,
    /// `ELSEIF`
    ElseIf = 39,
    /// `ENDIF`
    EndIf = 40,
    /// `RETURN`
    Return = 41,
    /// Indéfini (pas de décodage).
    Undefined = 42,
    /// Table de debug checksum → nom.
    ChecksumName = 43,
    /// `<...>`
    AllArgs = 44,
    /// Préfixe d'un nom écrit `<nom>`.
    Arg = 45,
    /// Saut relatif long (i32).
    Jump = 46,
    /// `RANDOM(...)`
    Random = 47,
    /// `RANDOM_RANGE`
    RandomRange = 48,
    /// Interne à qcomp (pas de décodage).
    At = 49,
    /// `|`
    Or = 50,
    /// `&`
    And = 51,
    /// `^`
    Xor = 52,
    /// `<<`
    ShiftLeft = 53,
    /// `>>`
    ShiftRight = 54,
    /// `RANDOM2(...)`
    Random2 = 55,
    /// `RANDOM_RANGE2`
    RandomRange2 = 56,
    /// `NOT`
    Not = 57,
    /// `AND`
    KeywordAnd = 58,
    /// `OR`
    KeywordOr = 59,
    /// `SWITCH`
    Switch = 60,
    /// `ENDSWITCH`
    EndSwitch = 61,
    /// `CASE`
    Case = 62,
    /// `DEFAULT`
    Default = 63,
    /// `RANDOM_NO_REPEAT(...)`
    RandomNoRepeat = 64,
    /// `RANDOM_PERMUTE(...)`
    RandomPermute = 65,
    /// `:`
    Colon = 66,

    /* ── cible rapide ── */
    /// `IF` avec saut court vers la branche fausse.
    FastIf = 71,
    /// `ELSE` avec saut court vers la fin.
    FastElse = 72,
    /// Saut court (i16, base = le champ lui-même).
    ShortJump = 73,
}

/// Mots-clés reconnus par le lexer (insensibles à la casse).
const KEYWORDS: &[(&str, Tag)] = &[
    ("BEGIN", Tag::Begin),
    ("REPEAT", Tag::Repeat),
    ("BREAK", Tag::Break),
    ("SCRIPT", Tag::Script),
    ("ENDSCRIPT", Tag::EndScript),
    ("IF", Tag::If),
    ("ELSE", Tag::Else),
    ("ELSEIF", Tag::ElseIf),
    ("ENDIF", Tag::EndIf),
    ("RETURN", Tag::Return),
    ("RANDOM", Tag::Random),
    ("RANDOM2", Tag::Random2),
    ("RANDOM_NO_REPEAT", Tag::RandomNoRepeat),
    ("RANDOM_PERMUTE", Tag::RandomPermute),
    ("RANDOMCASE", Tag::RandomCase),
    ("RANDOMEND", Tag::RandomEnd),
    ("RANDOM_RANGE", Tag::RandomRange),
    ("RANDOM_RANGE2", Tag::RandomRange2),
    ("NOT", Tag::Not),
    ("AND", Tag::KeywordAnd),
    ("OR", Tag::KeywordOr),
    ("SWITCH", Tag::Switch),
    ("ENDSWITCH", Tag::EndSwitch),
    ("CASE", Tag::Case),
    ("DEFAULT", Tag::Default),
    ("VECTOR", Tag::Vector),
    ("PAIR", Tag::Pair),
];

impl Tag {
    /// Décode un octet de tag lu sur le fil (jamais un tag interne).
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        use Tag::*;
        Some(match b {
            0 => EndOfFile,
            1 => EndOfLine,
            2 => EndOfLineNumber,
            3 => StartStruct,
            4 => EndStruct,
            5 => StartArray,
            6 => EndArray,
            7 => Equals,
            8 => Dot,
            9 => Comma,
            10 => Minus,
            11 => Add,
            12 => Divide,
            13 => Multiply,
            14 => OpenParenth,
            15 => CloseParenth,
            16 => DebugInfo,
            17 => SameAs,
            18 => LessThan,
            19 => LessThanEqual,
            20 => GreaterThan,
            21 => GreaterThanEqual,
            22 => Name,
            23 => Integer,
            24 => HexInteger,
            25 => Enum,
            26 => Float,
            27 => String,
            28 => LocalString,
            29 => Array,
            30 => Vector,
            31 => Pair,
            32 => Begin,
            33 => Repeat,
            34 => Break,
            35 => Script,
            36 => EndScript,
            37 => If,
            38 => Else,
            39 => ElseIf,
            40 => EndIf,
            41 => Return,
            42 => Undefined,
            43 => ChecksumName,
            44 => AllArgs,
            45 => Arg,
            46 => Jump,
            47 => Random,
            48 => RandomRange,
            49 => At,
            50 => Or,
            51 => And,
            52 => Xor,
            53 => ShiftLeft,
            54 => ShiftRight,
            55 => Random2,
            56 => RandomRange2,
            57 => Not,
            58 => KeywordAnd,
            59 => KeywordOr,
            60 => Switch,
            61 => EndSwitch,
            62 => Case,
            63 => Default,
            64 => RandomNoRepeat,
            65 => RandomPermute,
            66 => Colon,
            71 => FastIf,
            72 => FastElse,
            73 => ShortJump,
            _ => return None,
        })
    }

    /// Valeur numérique du tag.
    #[must_use]
    pub const fn value(self) -> i8 { self as i8 }

    /// Vrai pour les marqueurs internes (jamais sérialisés).
    #[must_use]
    pub const fn is_internal(self) -> bool { (self as i8) < 0 }

    /// Octet à écrire sur le fil ; échoue pour un tag interne.
    #[allow(clippy::cast_sign_loss)]
    pub fn wire_byte(self) -> QbResult<u8> {
        if self.is_internal() {
            return Err(QbError::InternalTag { tag: self as i8 });
        }
        Ok(self as i8 as u8)
    }

    /// Vrai pour les en-têtes de la famille random (table poids + sauts).
    #[must_use]
    pub const fn is_random_header(self) -> bool {
        matches!(self, Self::Random | Self::Random2 | Self::RandomNoRepeat | Self::RandomPermute)
    }

    /// Vrai pour les instructions porteuses d'une adresse courte.
    #[must_use]
    pub const fn is_short_branch(self) -> bool {
        matches!(self, Self::FastIf | Self::FastElse | Self::ShortJump)
    }

    /// Vrai pour les jetons qui terminent une ligne logique.
    #[must_use]
    pub const fn ends_line(self) -> bool {
        matches!(self, Self::EndOfLine | Self::EndOfLineNumber | Self::EndOfFile)
    }

    /// Mot-clé correspondant (insensible à la casse).
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(word))
            .map(|&(_, tag)| tag)
    }

    /// Orthographe canonique du mot-clé, si le tag en est un.
    #[must_use]
    pub fn keyword(self) -> Option<&'static str> {
        KEYWORDS.iter().find(|&&(_, tag)| tag == self).map(|&(kw, _)| kw)
    }

    /// Texte source d'un tag sans charge utile (ponctuation ou mot-clé).
    #[must_use]
    pub fn text(self) -> Option<&'static str> {
        use Tag::*;
        let sym = match self {
            StartStruct => "{",
            EndStruct => "}",
            StartArray => "[",
            EndArray => "]",
            Equals => "=",
            Dot => ".",
            Comma => ",",
            Minus => "-",
            Add => "+",
            Divide => "/",
            Multiply => "*",
            OpenParenth => "(",
            CloseParenth => ")",
            SameAs => "==",
            LessThan => "<",
            LessThanEqual => "<=",
            GreaterThan => ">",
            GreaterThanEqual => ">=",
            AllArgs => "<...>",
            Or => "|",
            And => "&",
            Xor => "^",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            Colon => ":",
            FastIf => "IF",
            FastElse => "ELSE",
            _ => return self.keyword(),
        };
        Some(sym)
    }
}

impl core::fmt::Display for Tag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.text() {
            Some(t) => f.write_str(t),
            None => write!(f, "{self:?}"),
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
