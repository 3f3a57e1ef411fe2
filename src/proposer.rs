use std::path::Path;

use crate::error::Result;

/// What a proposer sees for one covered block: the snippet text and the
/// 1-based offsets into it that are proven executed.
#[derive(Debug)]
pub struct ProposalContext<'a> {
    pub path: &'a Path,
    pub language: &'a str,
    pub block_source: &'a str,
    pub covered_offsets: &'a [usize],
}

/// One single-line rewrite. `line` is block-local and 1-based; the
/// engine maps it back to a file line before applying.
#[derive(Debug, Clone)]
pub struct MutationProposal {
    pub line: usize,
    pub original: String,
    pub mutated: String,
    pub operator: String,
    pub description: String,
}

/// Strategy boundary. The engine is agnostic to how proposals are
/// generated as long as each edit is a single addressable line
/// replacement.
pub trait MutationProposer {
    fn propose(&self, ctx: &ProposalContext) -> Result<Vec<MutationProposal>>;
}

/// Bundled rule-based proposer: per-category operator tables rewriting
/// a single covered line. Purely textual; downstream syntax validation
/// owns correctness.
pub struct RuleBasedProposer;

struct Rewrite {
    from: &'static str,
    to: &'static str,
    operator: &'static str,
}

const COMPARISON: &[Rewrite] = &[
    Rewrite { from: "==", to: "!=", operator: "negate_eq" },
    Rewrite { from: "!=", to: "==", operator: "negate_eq" },
    Rewrite { from: "<=", to: "<", operator: "boundary" },
    Rewrite { from: ">=", to: ">", operator: "boundary" },
    Rewrite { from: "<", to: "<=", operator: "boundary" },
    Rewrite { from: ">", to: ">=", operator: "boundary" },
];

const ARITHMETIC: &[Rewrite] = &[
    Rewrite { from: "+", to: "-", operator: "arith" },
    Rewrite { from: "-", to: "+", operator: "arith" },
    Rewrite { from: "*", to: "/", operator: "arith" },
    Rewrite { from: "/", to: "*", operator: "arith" },
];

const LOGICAL_WORDS: &[Rewrite] = &[
    Rewrite { from: "and", to: "or", operator: "logic_flip" },
    Rewrite { from: "or", to: "and", operator: "logic_flip" },
];

const LOGICAL_SYMBOLS: &[Rewrite] = &[
    Rewrite { from: "&&", to: "||", operator: "logic_flip" },
    Rewrite { from: "||", to: "&&", operator: "logic_flip" },
];

const BOOLEAN_PYTHON: &[Rewrite] = &[
    Rewrite { from: "True", to: "False", operator: "bool_flip" },
    Rewrite { from: "False", to: "True", operator: "bool_flip" },
];

const BOOLEAN_LOWER: &[Rewrite] = &[
    Rewrite { from: "true", to: "false", operator: "bool_flip" },
    Rewrite { from: "false", to: "true", operator: "bool_flip" },
];

impl MutationProposer for RuleBasedProposer {
    fn propose(&self, ctx: &ProposalContext) -> Result<Vec<MutationProposal>> {
        let lines: Vec<&str> = ctx.block_source.lines().collect();
        let (logical, boolean) = tables_for(ctx.language);

        let mut proposals = Vec::new();
        for &offset in ctx.covered_offsets {
            let Some(line_text) = offset.checked_sub(1).and_then(|i| lines.get(i)) else {
                continue;
            };
            let trimmed = line_text.trim();
            if trimmed.is_empty() || is_comment(trimmed, ctx.language) {
                continue;
            }
            // First match per category per line.
            for table in [COMPARISON, logical, ARITHMETIC, boolean] {
                if let Some(proposal) = rewrite_line(trimmed, table, offset) {
                    proposals.push(proposal);
                }
            }
        }
        Ok(proposals)
    }
}

fn tables_for(language: &str) -> (&'static [Rewrite], &'static [Rewrite]) {
    match language {
        "python" => (LOGICAL_WORDS, BOOLEAN_PYTHON),
        _ => (LOGICAL_SYMBOLS, BOOLEAN_LOWER),
    }
}

fn is_comment(trimmed: &str, language: &str) -> bool {
    match language {
        "python" => trimmed.starts_with('#'),
        _ => trimmed.starts_with("//"),
    }
}

fn rewrite_line(line: &str, table: &[Rewrite], offset: usize) -> Option<MutationProposal> {
    for rw in table {
        if let Some(idx) = find_token(line, rw.from) {
            let mut mutated = String::with_capacity(line.len());
            mutated.push_str(&line[..idx]);
            mutated.push_str(rw.to);
            mutated.push_str(&line[idx + rw.from.len()..]);
            return Some(MutationProposal {
                line: offset,
                original: line.to_string(),
                mutated,
                operator: rw.operator.to_string(),
                description: format!("replace {} with {}", rw.from, rw.to),
            });
        }
    }
    None
}

const OPERATOR_CHARS: &str = "<>=!&|+-*/";

/// Find a token occurrence that is not part of a larger token: word
/// tokens need non-identifier neighbors, symbol tokens need neighbors
/// outside the operator alphabet (so `<` never matches inside `<=`,
/// `-` never matches inside `->`, `/` never opens a `//` comment).
fn find_token(line: &str, token: &str) -> Option<usize> {
    let word = token.chars().all(|c| c.is_alphanumeric());
    for (idx, _) in line.match_indices(token) {
        let prev = line[..idx].chars().next_back();
        let next = line[idx + token.len()..].chars().next();
        let ok = if word {
            !prev.is_some_and(|c| c.is_alphanumeric() || c == '_')
                && !next.is_some_and(|c| c.is_alphanumeric() || c == '_')
        } else {
            !prev.is_some_and(|c| OPERATOR_CHARS.contains(c))
                && !next.is_some_and(|c| OPERATOR_CHARS.contains(c))
        };
        if ok {
            return Some(idx);
        }
    }
    None
}
