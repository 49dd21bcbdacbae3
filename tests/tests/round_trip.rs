//! Allers-retours complets et point fixe `compile ∘ decompile`.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use qscript_compiler::{compile, Target};
use qscript_core::{checksum, ByteWriter, Tag, Token};
use qscript_disasm::decompile;
use qscript_tests::{round_trip, SAMPLES, THUG1_ONLY};

#[test]
fn assignment_bytes_and_text() {
    let foo = checksum("foo");
    let qb = compile("foo = 1\n", Target::Thug1).unwrap();

    let mut expected = ByteWriter::new();
    Token::NameChecksum(foo).encode(&mut expected).unwrap();
    expected.write_tag(Tag::Equals).unwrap();
    Token::Integer(1).encode(&mut expected).unwrap();
    expected.write_tag(Tag::EndOfLine).unwrap();
    Token::ChecksumName(foo, "foo".into()).encode(&mut expected).unwrap();
    expected.write_tag(Tag::EndOfFile).unwrap();

    assert_eq!(qb, expected.into_vec());
    assert_eq!(decompile(&qb).unwrap(), "foo = 1\n");
}

#[test]
fn samples_reach_a_fixed_point() {
    for target in [Target::Thug1, Target::Thug2] {
        for (name, src) in SAMPLES {
            let trip = round_trip(src, target).unwrap_or_else(|e| panic!("{name} {target:?}: {e}"));
            assert_eq!(trip.first, trip.second, "{name} {target:?}:\n{}", trip.text);
            assert_eq!(decompile(&trip.second).unwrap(), trip.text, "{name} {target:?}");
        }
    }
    for (name, src) in THUG1_ONLY {
        let trip = round_trip(src, Target::Thug1).unwrap();
        assert_eq!(trip.first, trip.second, "{name}:\n{}", trip.text);
    }
}

#[test]
fn decompiled_sample_text() {
    let trip = round_trip(SAMPLES[3].1, Target::Thug2).unwrap();
    let expected = "\
SCRIPT taunt
\tRANDOM(1, 2, 3)
\t\tRANDOMCASE PlaySound taunt_1
\t\tRANDOMCASE PlaySound taunt_2
\t\tRANDOMCASE
\t\tRANDOM_NO_REPEAT(5)
\t\tRANDOMCASE RANDOMEND PlaySound taunt_3
\tRANDOMEND offset = PAIR(0.25, -1.0)
\tmask = 0xff00 | ( flags & 3 )
\tIF NOT ( a == b ) AND ( c >= 2 OR d <= -4 )
\t\tx = <...>
\tENDIF
ENDSCRIPT
";
    assert_eq!(trip.text, expected);
}

#[test]
fn names_keep_their_first_spelling() {
    let trip = round_trip("Speed = speed + SPEED\n", Target::Thug1).unwrap();
    assert_eq!(trip.text, "Speed = Speed + Speed\n");
    assert_eq!(trip.first, trip.second);
}

#[test]
fn line_numbers_decompile_like_plain_lines() {
    let opts = qscript_compiler::CompileOptions { target: Target::Thug1, line_numbers: true };
    let qb = qscript_compiler::Compiler::new(opts).compile("a = 1\n\nb = 2\n").unwrap();
    assert_eq!(decompile(&qb).unwrap(), "a = 1\nb = 2\n");
}

/* ─────────── Propriété : littéraux ─────────── */

fn literal_buffer(i: i32, h: u32, f: f32, s: &[u8], l: &[u8]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    let names = ["i", "h", "f", "s", "l"];
    let values = [
        Token::Integer(i),
        Token::HexInteger(h),
        Token::Float(f),
        Token::String(s.to_vec()),
        Token::LocalString(l.to_vec()),
    ];
    for (name, value) in names.iter().zip(values) {
        Token::NameChecksum(checksum(name)).encode(&mut w).unwrap();
        w.write_tag(Tag::Equals).unwrap();
        value.encode(&mut w).unwrap();
        w.write_tag(Tag::EndOfLine).unwrap();
    }
    let mut table: Vec<_> = names.iter().map(|n| (checksum(n), *n)).collect();
    table.sort_unstable();
    for (crc, name) in table {
        Token::ChecksumName(crc, name.into()).encode(&mut w).unwrap();
    }
    w.write_tag(Tag::EndOfFile).unwrap();
    w.into_vec()
}

fn quarter() -> impl Strategy<Value = f32> {
    (-4_000_000i32..4_000_000).prop_map(|n| n as f32 / 4.0)
}

fn payload() -> impl Strategy<Value = Vec<u8>> {
    // le NUL final est implicite ; l'octet 0 reste permis au milieu
    proptest::collection::vec(any::<u8>(), 0..24)
}

proptest! {
    #[test]
    fn literals_survive_decompile_and_recompile(
        i in any::<i32>(),
        h in any::<u32>(),
        f in quarter(),
        s in payload(),
        l in payload(),
    ) {
        let qb = literal_buffer(i, h, f, &s, &l);
        let text = decompile(&qb).unwrap();
        let again = compile(&text, Target::Thug1).unwrap();
        prop_assert_eq!(again, qb, "{}", text);
    }
}
