//! qscript-tests - corpus et utilitaires partagés par les tests d'intégration.
//!
//! Les scripts de `SAMPLES` compilent sur les deux cibles ; `THUG1_ONLY`
//! utilise des formes absentes de la cible rapide (`ELSEIF`).

use qscript_compiler::{compile, Target};
use qscript_disasm::decompile;

/// Erreur de l'un des trois passages.
pub type TripError = Box<dyn std::error::Error>;

/// Scripts valides sur les deux cibles.
pub const SAMPLES: &[(&str, &str)] = &[
    ("assign", "foo = 1\n"),
    (
        "player",
        r#"// réglages du joueur
SCRIPT player_setup speed = 1.5
    SetParams { name = "Tony" board = #"Birdhouse" pos = VECTOR(0, 10.5, -3) }
    IF GotParam run
        <speed> = (<speed> * 2)
    ELSE
        Printf "walking\n"
    ENDIF
    BEGIN
        Wait 1 gameframe
    REPEAT 10
ENDSCRIPT
"#,
    ),
    (
        "switch",
        r#"SCRIPT pick_trick
    SWITCH <trick>
        CASE kickflip
            score = 100
        CASE heelflip
            score = 0x7F
        CASE %"360 flip"
            score = -250
        DEFAULT
            score = 0
    ENDSWITCH
    RETURN score = <score>
ENDSCRIPT
"#,
    ),
    (
        "random",
        r#"SCRIPT taunt
    RANDOM(1, 2, 3)
        RANDOMCASE PlaySound taunt_1
        RANDOMCASE PlaySound taunt_2
        RANDOMCASE
            RANDOM_NO_REPEAT(5)
                RANDOMCASE PlaySound taunt_3
            RANDOMEND
    RANDOMEND
    offset = PAIR(0.25, -1)
    mask = 0xFF00 | (flags & 3)
    IF NOT (a == b) AND (c >= 2 OR d <= -4)
        x = <...>
    ENDIF
ENDSCRIPT
"#,
    ),
    (
        "strings",
        "msg = \"tab\\there \\\"quoted\\\" back\\\\slash \\101\\x42\"\n\
         loc = 'localized'\n\
         bell = \"\\a\\b\\f\\v\\r\\n\"\n\
         hash = %(0x12345678) <%(0xabc)>\n\
         sum = 1 + \\\n 2 /* bloc */ - 3.75\n",
    ),
    ("no_newline", "RANDOM_PERMUTE(2, 2) RANDOMCASE a RANDOMCASE b RANDOMEND"),
];

/// Scripts propres à la cible à mots-clés complets.
pub const THUG1_ONLY: &[(&str, &str)] = &[(
    "elseif",
    "IF a\n    b\nELSEIF c\n    d\nELSE\n    e\nENDIF\n",
)];

/// Les trois étapes d'un aller-retour.
#[derive(Debug, Clone)]
pub struct RoundTrip {
    /// `compile(src)`
    pub first: Vec<u8>,
    /// `decompile(first)`
    pub text: String,
    /// `compile(text)`
    pub second: Vec<u8>,
}

/// compile → decompile → compile.
pub fn round_trip(src: &str, target: Target) -> Result<RoundTrip, TripError> {
    let first = compile(src, target)?;
    let text = decompile(&first)?;
    let second = compile(&text, target)?;
    Ok(RoundTrip { first, text, second })
}

/// Indentation (en tabulations) et contenu de chaque ligne non vide.
pub fn lines(text: &str) -> Vec<(usize, &str)> {
    text.lines()
        .filter(|l| !l.is_empty())
        .map(|l| {
            let body = l.trim_start_matches('\t');
            (l.len() - body.len(), body)
        })
        .collect()
}
