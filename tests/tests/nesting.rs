//! Arbres IF/ELSE aléatoires : indentation cohérente et point fixe.

use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;

use qscript_compiler::Target;
use qscript_tests::{lines, round_trip};

#[derive(Debug, Clone)]
enum Node {
    Stmt(u8),
    If { cond: u8, then: Vec<Node>, other: Option<Vec<Node>> },
}

fn tree() -> impl Strategy<Value = Vec<Node>> {
    let leaf = (0u8..20).prop_map(Node::Stmt);
    let node = leaf.prop_recursive(4, 48, 4, |inner| {
        (0u8..20, vec(inner.clone(), 0..4), option::of(vec(inner, 0..4)))
            .prop_map(|(cond, then, other)| Node::If { cond, then, other })
    });
    vec(node, 1..6)
}

fn render(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Stmt(n) => out.push_str(&format!("v{n} = {n}\n")),
            Node::If { cond, then, other } => {
                out.push_str(&format!("IF c{cond}\n"));
                render(then, out);
                if let Some(other) = other {
                    out.push_str("ELSE\n");
                    render(other, out);
                }
                out.push_str("ENDIF\n");
            }
        }
    }
}

fn count_ifs(nodes: &[Node]) -> (usize, usize) {
    nodes.iter().fold((0, 0), |(ifs, elses), node| match node {
        Node::Stmt(_) => (ifs, elses),
        Node::If { then, other, .. } => {
            let (a, b) = count_ifs(then);
            let (c, d) = other.as_deref().map_or((0, 0), count_ifs);
            (ifs + 1 + a + c, elses + usize::from(other.is_some()) + b + d)
        }
    })
}

/// Vérifie l'imbrication du texte avec une pile de profondeurs.
fn check_indentation(text: &str) -> Result<(usize, usize), String> {
    let mut open: Vec<usize> = Vec::new();
    let (mut ifs, mut elses) = (0, 0);
    for (depth, body) in lines(text) {
        let word = body.split_whitespace().next().unwrap_or_default();
        match word {
            "IF" => {
                if depth != open.len() {
                    return Err(format!("IF at depth {depth}, expected {}", open.len()));
                }
                open.push(depth);
                ifs += 1;
            }
            "ELSE" | "ENDIF" => {
                let expected = open.last().copied().ok_or_else(|| format!("stray {word}"))?;
                if depth != expected {
                    return Err(format!("{word} at depth {depth}, expected {expected}"));
                }
                if word == "ENDIF" {
                    open.pop();
                } else {
                    elses += 1;
                }
            }
            _ if depth != open.len() => {
                return Err(format!("{body:?} at depth {depth}, expected {}", open.len()));
            }
            _ => {}
        }
    }
    if open.is_empty() { Ok((ifs, elses)) } else { Err("unclosed IF".into()) }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn nested_conditionals_indent_and_recompile(nodes in tree(), fast in any::<bool>()) {
        let mut src = String::new();
        render(&nodes, &mut src);
        let target = if fast { Target::Thug2 } else { Target::Thug1 };

        let trip = round_trip(&src, target).unwrap();
        prop_assert_eq!(&trip.first, &trip.second, "{}", trip.text);

        let counts = check_indentation(&trip.text).map_err(|e| TestCaseError::fail(format!("{e}\n{}", trip.text)))?;
        prop_assert_eq!(counts, count_ifs(&nodes));
    }
}

#[test]
fn deep_chain_stays_aligned() {
    let mut src = String::new();
    for i in 0..12 {
        src.push_str(&format!("IF c{i}\n"));
    }
    src.push_str("x = 1\n");
    for _ in 0..12 {
        src.push_str("ELSE\ny = 2\nENDIF\n");
    }
    for target in [Target::Thug1, Target::Thug2] {
        let trip = round_trip(&src, target).unwrap();
        assert_eq!(trip.first, trip.second);
        assert_eq!(check_indentation(&trip.text), Ok((12, 12)));
        assert!(trip.text.contains(&format!("{}x = 1\n", "\t".repeat(12))));
    }
}
