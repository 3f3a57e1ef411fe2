pub mod apply;
pub mod blocks;
pub mod config;
pub mod controller;
pub mod coverage;
pub mod error;
pub mod git;
pub mod proposer;
pub mod report;
pub mod sandbox;
pub mod scope;
pub mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    /// Stable tag used in stored records and proposal contexts.
    pub fn tag(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
        }
    }

    pub fn grammar(self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Node kinds that delimit function and method definitions.
    pub fn definition_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["function_definition"],
            Language::Rust => &["function_item"],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &[
                "function_declaration",
                "generator_function_declaration",
                "method_definition",
                "arrow_function",
                "function_expression",
                "generator_function",
            ],
        }
    }

    /// Node kinds for control-flow constructs, for finer-grained
    /// targeting than whole definitions.
    pub fn flow_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Python => &[
                "if_statement",
                "for_statement",
                "while_statement",
                "return_statement",
            ],
            Language::Rust => &[
                "if_expression",
                "for_expression",
                "while_expression",
                "match_expression",
                "return_expression",
            ],
            Language::JavaScript | Language::TypeScript | Language::Tsx => &[
                "if_statement",
                "for_statement",
                "while_statement",
                "switch_statement",
                "return_statement",
            ],
        }
    }
}

pub fn detect_language(path: &std::path::Path) -> Option<Language> {
    match path.extension()?.to_str()? {
        "py" => Some(Language::Python),
        "rs" => Some(Language::Rust),
        "js" | "mjs" | "cjs" => Some(Language::JavaScript),
        "ts" | "mts" | "cts" => Some(Language::TypeScript),
        "tsx" | "jsx" => Some(Language::Tsx),
        _ => None,
    }
}
