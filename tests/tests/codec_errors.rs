//! Buffers invalides et collisions de checksums.

use pretty_assertions::assert_eq;

use qscript_compiler::{compile, CompileError, Target};
use qscript_core::{checksum, QbError, QbReader};
use qscript_disasm::decompile;

#[test]
fn truncated_string_is_out_of_range() {
    // longueur annoncée : 100, un seul octet présent
    let qb = [27, 100, 0, 0, 0, b'a'];
    let err = QbReader::new(&qb).skip_token(0).unwrap_err();
    assert_eq!(err, QbError::OutOfRange { offset: 5, needed: 100, len: 6 });
    assert_eq!(decompile(&qb).unwrap_err(), err);
}

#[test]
fn tags_without_decoding_rule_fail() {
    for tag in [16u8, 25, 42, 70, 200] {
        let err = decompile(&[tag, 0]).unwrap_err();
        assert_eq!(err, QbError::UnknownTag { tag, offset: 0 });
    }
    let err = decompile(&[1, 70, 0]).unwrap_err();
    assert_eq!(err, QbError::UnknownTag { tag: 70, offset: 1 });
}

#[test]
fn missing_end_of_file() {
    assert_eq!(decompile(&[]).unwrap_err(), QbError::OutOfRange { offset: 0, needed: 1, len: 0 });
    assert_eq!(decompile(&[1]).unwrap_err(), QbError::OutOfRange { offset: 1, needed: 1, len: 1 });
}

#[test]
fn branch_outside_buffer() {
    // FastIf +100 depuis le champ
    let qb = [71, 100, 0, 0];
    assert!(matches!(decompile(&qb).unwrap_err(), QbError::BadAddress { offset: 1, .. }));
}

#[test]
fn colliding_identifiers_are_rejected() {
    assert_eq!(checksum("plumless"), checksum("buckeroo"));
    let err = compile("plumless = buckeroo\n", Target::Thug1).unwrap_err();
    assert_eq!(
        err,
        CompileError::ChecksumCollision {
            checksum: checksum("plumless"),
            existing: "plumless".into(),
            incoming: "buckeroo".into(),
        }
    );
}

#[test]
fn repeated_identifiers_are_fine() {
    let qb = compile("a = A\nA = a\n", Target::Thug1).unwrap();
    assert_eq!(decompile(&qb).unwrap(), "a = a\na = a\n");
}
