//! Blocs random et switch rapide : tables de sauts et rendu.

use pretty_assertions::assert_eq;

use qscript_compiler::{compile, CompileError, Target};
use qscript_core::{QbReader, Tag, Token};
use qscript_disasm::decompile;
use qscript_tests::{lines, round_trip};

fn tokens(qb: &[u8]) -> Vec<(usize, Token)> {
    QbReader::new(qb).tokens().collect::<Result<_, _>>().unwrap()
}

#[test]
fn case_count_must_match_weights() {
    let short = compile("RANDOM(1, 1, 1)\nRANDOMCASE a\nRANDOMCASE b\nRANDOMEND\n", Target::Thug1);
    assert!(
        matches!(short, Err(CompileError::Unbalanced { construct: "RANDOMEND", line: 4, .. })),
        "{short:?}"
    );

    let long = compile("RANDOM(1, 1)\nRANDOMCASE a\nRANDOMCASE b\nRANDOMCASE c\nRANDOMEND\n", Target::Thug1);
    assert!(
        matches!(long, Err(CompileError::Unbalanced { construct: "RANDOMCASE", line: 4, .. })),
        "{long:?}"
    );

    let open = compile("RANDOM(1)\nRANDOMCASE a\n", Target::Thug1);
    assert!(matches!(open, Err(CompileError::Unbalanced { .. })), "{open:?}");
}

#[test]
fn every_case_jumps_to_the_same_end() {
    let src = "RANDOM2(4, 3, 2, 1)\nRANDOMCASE a\nRANDOMCASE b\nRANDOMCASE c\nRANDOMCASE d\nRANDOMEND\nafter\n";
    let qb = compile(src, Target::Thug1).unwrap();
    let reader = QbReader::new(&qb);
    let toks = tokens(&qb);

    let header = reader.random_header(0).unwrap();
    assert_eq!(header.tag, Tag::Random2);
    assert_eq!(header.weights, vec![4, 3, 2, 1]);
    for (i, target) in header.targets.iter().enumerate() {
        assert!(matches!(reader.read_token(*target).unwrap(), Token::NameChecksum(_)));
        if i > 0 {
            assert_eq!(reader.read_tag(target - 5).unwrap(), Tag::Jump);
        }
    }

    let ends: Vec<usize> = toks
        .iter()
        .filter(|(_, t)| matches!(t, Token::Jump(_)))
        .map(|(pos, _)| reader.long_address(pos + 1).unwrap())
        .collect();
    assert_eq!(ends.len(), 3);
    assert!(ends.iter().all(|e| *e == ends[0]));

    // la fin tombe sur le nom qui suit le bloc
    let eols: Vec<usize> = toks
        .iter()
        .filter(|(_, t)| *t == Token::Simple(Tag::EndOfLine))
        .map(|(pos, _)| *pos)
        .collect();
    assert_eq!(reader.read_tag(ends[0] - 1).unwrap(), Tag::EndOfLine);
    assert!(eols.contains(&(ends[0] - 1)));
    assert!(matches!(reader.read_token(ends[0]).unwrap(), Token::NameChecksum(_)));
}

#[test]
fn nested_randoms_round_trip() {
    let src = "RANDOM_PERMUTE(1, 1)\n\
               RANDOMCASE\n\
               RANDOM(2, 2)\n\
               RANDOMCASE x\n\
               RANDOMCASE y\n\
               RANDOMEND\n\
               RANDOMCASE z\n\
               RANDOMEND\n\
               done\n";
    let trip = round_trip(src, Target::Thug1).unwrap();
    assert_eq!(trip.first, trip.second, "{}", trip.text);
    // la fin de ligne après le premier RANDOMCASE est fusionnée
    assert_eq!(
        trip.text,
        "RANDOM_PERMUTE(1, 1)\n\
         \tRANDOMCASE RANDOM(2, 2)\n\
         \t\tRANDOMCASE x\n\
         \t\tRANDOMCASE y\n\
         \tRANDOMEND RANDOMCASE z\n\
         RANDOMEND done\n"
    );
}

#[test]
fn fast_switch_jump_table() {
    let src = "SWITCH a\nCASE 1\nx\nCASE 2\ny\nCASE 3\nz\nDEFAULT\nw\nENDSWITCH\n";
    let qb = compile(src, Target::Thug2).unwrap();
    let reader = QbReader::new(&qb);
    let toks = tokens(&qb);

    let is_case = |t: &Token| matches!(t, Token::Simple(Tag::Case | Tag::Default));
    let is_jump = |t: &Token| matches!(t, Token::ShortBranch { tag: Tag::ShortJump, .. });

    let cases: Vec<usize> = toks.iter().filter(|(_, t)| is_case(t)).map(|(p, _)| *p).collect();
    let end = toks
        .iter()
        .find(|(_, t)| *t == Token::Simple(Tag::EndSwitch))
        .map(|(p, _)| *p)
        .unwrap();
    assert_eq!(cases.len(), 4);

    let (mut skips, mut bodies) = (0, 0);
    for w in toks.windows(2) {
        let ((p0, t0), (p1, t1)) = (&w[0], &w[1]);
        if is_jump(t0) && is_case(t1) {
            // saut de fin du cas précédent : après ENDSWITCH
            assert_eq!(reader.short_address(p0 + 1).unwrap(), end + 1);
            skips += 1;
        }
        if is_case(t0) && is_jump(t1) {
            let next = cases.iter().copied().find(|c| c > p0).unwrap_or(end);
            assert_eq!(reader.short_address(p1 + 1).unwrap(), next);
            bodies += 1;
        }
    }
    assert_eq!((skips, bodies), (3, 4));

    let text = decompile(&qb).unwrap();
    let ls = lines(&text);
    assert_eq!(ls.iter().filter(|(d, b)| *d == 1 && b.starts_with("CASE")).count(), 3);
    assert_eq!(ls.iter().filter(|(d, b)| *d == 1 && *b == "DEFAULT").count(), 1);
    assert_eq!(ls.iter().filter(|(d, _)| *d == 2).count(), 4);
    assert_eq!(ls.last(), Some(&(0, "ENDSWITCH")));
}

#[test]
fn full_keyword_switch_has_no_jumps() {
    let qb = compile("SWITCH a\nCASE 1\nx\nENDSWITCH\n", Target::Thug1).unwrap();
    assert!(tokens(&qb).iter().all(|(_, t)| !matches!(t, Token::ShortBranch { .. })));
}

#[test]
fn stray_switch_keywords_fail_on_fast_target() {
    for src in ["CASE 1\n", "DEFAULT\n", "ENDSWITCH\n", "SWITCH a\nCASE 1\n"] {
        let err = compile(src, Target::Thug2).unwrap_err();
        assert!(matches!(err, CompileError::Unbalanced { .. }), "{src:?}: {err}");
    }
}
