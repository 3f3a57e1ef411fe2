use std::path::Path;

use faultline::proposer::{MutationProposal, MutationProposer, ProposalContext, RuleBasedProposer};

fn propose(language: &str, block: &str, offsets: &[usize]) -> Vec<MutationProposal> {
    let ctx = ProposalContext {
        path: Path::new("app.py"),
        language,
        block_source: block,
        covered_offsets: offsets,
    };
    RuleBasedProposer.propose(&ctx).unwrap()
}

#[test]
fn equality_is_negated() {
    let proposals = propose("python", "def f(x):\n    return x == 0\n", &[2]);
    assert!(proposals
        .iter()
        .any(|p| p.mutated.contains("x != 0") && p.operator == "negate_eq"));
}

#[test]
fn boundary_operators_are_shifted() {
    let proposals = propose("python", "if x > 0:\n", &[1]);
    let boundary = proposals.iter().find(|p| p.operator == "boundary").unwrap();
    assert_eq!(boundary.mutated, "if x >= 0:");
    assert_eq!(boundary.description, "replace > with >=");
}

#[test]
fn two_char_comparisons_win_over_their_prefix() {
    let proposals = propose("python", "if x <= 0:\n", &[1]);
    let boundary = proposals.iter().find(|p| p.operator == "boundary").unwrap();
    assert_eq!(boundary.mutated, "if x < 0:");
}

#[test]
fn python_uses_word_logical_operators() {
    let proposals = propose("python", "if a and b:\n", &[1]);
    let logic = proposals.iter().find(|p| p.operator == "logic_flip").unwrap();
    assert_eq!(logic.mutated, "if a or b:");
}

#[test]
fn word_tokens_do_not_match_inside_identifiers() {
    // "for" contains "or"; "android" contains "and".
    let proposals = propose("python", "for android in items:\n", &[1]);
    assert!(proposals.iter().all(|p| p.operator != "logic_flip"));
}

#[test]
fn non_python_uses_symbol_logical_operators() {
    let proposals = propose("rust", "if a && b {\n", &[1]);
    let logic = proposals.iter().find(|p| p.operator == "logic_flip").unwrap();
    assert_eq!(logic.mutated, "if a || b {");
}

#[test]
fn python_booleans_are_capitalized() {
    let proposals = propose("python", "flag = True\n", &[1]);
    let flip = proposals.iter().find(|p| p.operator == "bool_flip").unwrap();
    assert_eq!(flip.mutated, "flag = False");
}

#[test]
fn rust_booleans_are_lowercase() {
    let proposals = propose("rust", "let flag = true;\n", &[1]);
    let flip = proposals.iter().find(|p| p.operator == "bool_flip").unwrap();
    assert_eq!(flip.mutated, "let flag = false;");
}

#[test]
fn arithmetic_operators_are_swapped() {
    let proposals = propose("python", "total = a + b\n", &[1]);
    let arith = proposals.iter().find(|p| p.operator == "arith").unwrap();
    assert_eq!(arith.mutated, "total = a - b");
}

#[test]
fn arrow_is_not_treated_as_a_minus() {
    let proposals = propose("rust", "fn f(x: i32) -> i32 {\n", &[1]);
    assert!(proposals.iter().all(|p| p.operator != "arith"));
}

#[test]
fn comment_lines_produce_nothing() {
    let proposals = propose("python", "# x == 0 and True\n", &[1]);
    assert!(proposals.is_empty());

    let proposals = propose("rust", "// a && b\n", &[1]);
    assert!(proposals.is_empty());
}

#[test]
fn blank_lines_produce_nothing() {
    assert!(propose("python", "\n\n", &[1, 2]).is_empty());
}

#[test]
fn only_covered_offsets_are_considered() {
    let block = "def f(x):\n    a = x + 1\n    b = x * 2\n    return a\n";
    let proposals = propose("python", block, &[2]);
    assert!(!proposals.is_empty());
    assert!(proposals.iter().all(|p| p.line == 2));
}

#[test]
fn offsets_outside_the_block_are_ignored() {
    let proposals = propose("python", "x = 1 + 2\n", &[99]);
    assert!(proposals.is_empty());
}

#[test]
fn one_proposal_per_category_per_line() {
    let proposals = propose("python", "ok = a < b and c + d > 0\n", &[1]);
    let boundary = proposals.iter().filter(|p| p.operator == "boundary").count();
    assert_eq!(boundary, 1);
    let arith = proposals.iter().filter(|p| p.operator == "arith").count();
    assert_eq!(arith, 1);
}

#[test]
fn original_records_the_trimmed_source_line() {
    let proposals = propose("python", "def f(x):\n    return x + 1\n", &[2]);
    let arith = proposals.iter().find(|p| p.operator == "arith").unwrap();
    assert_eq!(arith.original, "return x + 1");
}
