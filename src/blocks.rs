use std::collections::BTreeSet;
use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::error::{Error, Result};
use crate::{detect_language, Language};

/// A node span discovered in a parsed file. Lines are 1-based and
/// inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
}

/// A block whose span intersects the executed-line set, with the
/// block-local 1-based offsets of the executed lines inside it.
#[derive(Debug, Clone)]
pub struct CoveredBlock {
    pub block: Block,
    pub executed_offsets: Vec<usize>,
}

/// Function and method definition spans, top-level only: a definition
/// nested inside another one is already part of the outer span.
pub fn function_blocks(language: Language, source: &str) -> Vec<Block> {
    collect_blocks(language, source, language.definition_kinds())
}

/// Control-flow construct spans, for finer-grained targeting than
/// whole definitions.
pub fn flow_blocks(language: Language, source: &str) -> Vec<Block> {
    collect_blocks(language, source, language.flow_kinds())
}

/// Definition spans of `path` intersected with the executed-line set.
pub fn covered_blocks(
    path: &Path,
    source: &str,
    executed: &BTreeSet<usize>,
) -> Result<Vec<CoveredBlock>> {
    let language = detect_language(path).ok_or_else(|| Error::UnsupportedLanguage {
        path: path.to_path_buf(),
    })?;

    let mut covered = Vec::new();
    for block in function_blocks(language, source) {
        let executed_offsets: Vec<usize> = executed
            .iter()
            .filter(|&&line| line >= block.start_line && line <= block.end_line)
            .map(|&line| line - block.start_line + 1)
            .collect();
        if !executed_offsets.is_empty() {
            covered.push(CoveredBlock {
                block,
                executed_offsets,
            });
        }
    }
    Ok(covered)
}

/// Reparse a candidate with the grammar selected by `path`'s extension.
/// Valid iff the tree reports no syntax errors. Shared with the applier.
pub fn check_syntax(path: &Path, candidate: &str) -> Result<bool> {
    let language = detect_language(path).ok_or_else(|| Error::UnsupportedLanguage {
        path: path.to_path_buf(),
    })?;
    let tree = parse_tree(language, candidate);
    Ok(!tree.root_node().has_error())
}

fn parse_tree(language: Language, source: &str) -> tree_sitter::Tree {
    let mut parser = Parser::new();
    parser
        .set_language(&language.grammar())
        .expect("Failed to set grammar");
    parser.parse(source, None).expect("Failed to parse source")
}

fn collect_blocks(language: Language, source: &str, kinds: &[&str]) -> Vec<Block> {
    let tree = parse_tree(language, source);
    let mut blocks = Vec::new();
    walk(tree.root_node(), kinds, &mut blocks);
    blocks
}

fn walk(node: Node, kinds: &[&str], blocks: &mut Vec<Block>) {
    if kinds.contains(&node.kind()) {
        blocks.push(Block {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
        });
        return;
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            walk(child, kinds, blocks);
        }
    }
}
