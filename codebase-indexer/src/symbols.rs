use crate::config::IndexerConfig;
use crate::discovery::discover_files;
use crate::error::Result;
use crate::normalize_root;
use async_trait::async_trait;
use coderag_code_chunker::{Language, SymbolInfo};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tree_sitter::{Node, Parser};

/// A named definition located in a project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: String,
    /// Path relative to the project root
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
}

impl Symbol {
    /// Boundaries in the form the chunker consumes
    pub fn to_symbol_info(&self) -> SymbolInfo {
        SymbolInfo::new(&self.name, &self.kind, self.start_line, self.end_line)
    }
}

/// Source of symbol boundaries and name lookups.
#[async_trait]
pub trait SymbolIndex: Send + Sync {
    /// (Re)build the index for a project.
    async fn index_project(&self, root: &Path) -> Result<()>;

    /// Refresh one file; a missing file drops its symbols.
    async fn update_file(&self, _root: &Path, _file_path: &str) -> Result<()> {
        Ok(())
    }

    async fn symbols_in_file(&self, root: &Path, file_path: &str) -> Vec<Symbol>;

    /// Symbols whose name matches `query`.
    async fn search_by_name(&self, root: &Path, query: &str) -> Result<Vec<Symbol>>;
}

/// Symbol index backed by tree-sitter grammars.
///
/// Lookups are case-insensitive substring matches on the symbol name. A
/// project that was never indexed is indexed on first lookup.
#[derive(Debug, Default)]
pub struct TreeSitterSymbolIndex {
    config: IndexerConfig,
    projects: RwLock<HashMap<PathBuf, HashMap<String, Vec<Symbol>>>>,
}

impl TreeSitterSymbolIndex {
    pub fn new(config: IndexerConfig) -> Self {
        Self {
            config,
            projects: RwLock::new(HashMap::new()),
        }
    }

    async fn scan_file(root: &Path, file_path: &str) -> Option<Vec<Symbol>> {
        let language = Language::from_path(Path::new(file_path));
        match tokio::fs::read_to_string(root.join(file_path)).await {
            Ok(content) => Some(extract_symbols(file_path, &content, language)),
            Err(e) => {
                debug!("Skipping {file_path} for symbol extraction: {e}");
                None
            }
        }
    }

    async fn is_indexed(&self, root: &Path) -> bool {
        self.projects.read().await.contains_key(root)
    }
}

#[async_trait]
impl SymbolIndex for TreeSitterSymbolIndex {
    async fn index_project(&self, root: &Path) -> Result<()> {
        let root = normalize_root(root);
        let files = discover_files(&root, &self.config)?;

        let mut by_file = HashMap::with_capacity(files.len());
        for file_path in files {
            if let Some(symbols) = Self::scan_file(&root, &file_path).await {
                by_file.insert(file_path, symbols);
            }
        }

        let total: usize = by_file.values().map(Vec::len).sum();
        info!(
            "Indexed {total} symbols in {} files under {}",
            by_file.len(),
            root.display()
        );
        self.projects.write().await.insert(root, by_file);
        Ok(())
    }

    /// A project that was never indexed gets a full scan instead.
    async fn update_file(&self, root: &Path, file_path: &str) -> Result<()> {
        let root = normalize_root(root);
        if !self.is_indexed(&root).await {
            debug!("No symbol index for {} yet, scanning all files", root.display());
            return self.index_project(&root).await;
        }
        let symbols = Self::scan_file(&root, file_path).await;

        let mut projects = self.projects.write().await;
        let Some(project) = projects.get_mut(&root) else {
            return Ok(());
        };
        match symbols {
            Some(symbols) => project.insert(file_path.to_string(), symbols),
            None => project.remove(file_path),
        };
        Ok(())
    }

    async fn symbols_in_file(&self, root: &Path, file_path: &str) -> Vec<Symbol> {
        let root = normalize_root(root);
        self.projects
            .read()
            .await
            .get(&root)
            .and_then(|files| files.get(file_path))
            .cloned()
            .unwrap_or_default()
    }

    async fn search_by_name(&self, root: &Path, query: &str) -> Result<Vec<Symbol>> {
        let root = normalize_root(root);
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        if !self.is_indexed(&root).await {
            self.index_project(&root).await?;
        }

        let projects = self.projects.read().await;
        let mut matches: Vec<Symbol> = projects
            .get(&root)
            .into_iter()
            .flat_map(HashMap::values)
            .flatten()
            .filter(|symbol| symbol.name.to_lowercase().contains(&query))
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then_with(|| a.start_line.cmp(&b.start_line))
        });
        Ok(matches)
    }
}

/// Node kinds whose nested functions are methods.
const CONTAINER_NODES: &[&str] = &[
    "impl_item",
    "trait_item",
    "class_definition",
    "class_body",
    "field_declaration_list",
];

fn grammar(language: Language) -> Option<tree_sitter::Language> {
    match language {
        Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
        Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Language::C | Language::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
        _ => None,
    }
}

struct Definition<'tree> {
    kind: &'static str,
    name: String,
    /// Node whose rows bound the symbol
    span: Node<'tree>,
}

fn field_text(node: Node, field: &str, source: &[u8]) -> Option<String> {
    let text = node.child_by_field_name(field)?.utf8_text(source).ok()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn inside_container(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if CONTAINER_NODES.contains(&parent.kind()) {
            return true;
        }
        current = parent.parent();
    }
    false
}

/// `const name = (...) => {}` and `const name = function () {}`
fn function_binding<'tree>(node: Node<'tree>, source: &[u8]) -> Option<Definition<'tree>> {
    let value = node.child_by_field_name("value")?;
    if !matches!(
        value.kind(),
        "arrow_function" | "function_expression" | "function"
    ) {
        return None;
    }
    Some(Definition {
        kind: "function",
        name: field_text(node, "name", source)?,
        span: node.parent().unwrap_or(node),
    })
}

/// C and C++ definitions name themselves through nested declarators.
fn c_function<'tree>(node: Node<'tree>, source: &[u8]) -> Option<Definition<'tree>> {
    let mut declarator = node.child_by_field_name("declarator")?;
    while declarator.kind() != "function_declarator" {
        declarator = declarator.child_by_field_name("declarator")?;
    }
    let qualified = field_text(declarator, "declarator", source)?;
    let (name, kind) = match qualified.rsplit_once("::") {
        Some((_, name)) => (name.to_string(), "method"),
        None => (qualified, "function"),
    };
    Some(Definition { kind, name, span: node })
}

fn definition<'tree>(
    node: Node<'tree>,
    source: &[u8],
    language: Language,
) -> Option<Definition<'tree>> {
    use Language::{C, Cpp, Go, JavaScript, Python, Rust, TypeScript};

    let kind = match (language, node.kind()) {
        (Rust, "function_item") => "function",
        (Rust, "struct_item") => "struct",
        (Rust, "enum_item") => "enum",
        (Rust, "trait_item") => "trait",
        (Rust, "mod_item") if node.child_by_field_name("body").is_some() => "module",

        (Go, "function_declaration") => "function",
        (Go, "method_declaration") => "method",
        (Go, "type_spec") => match node.child_by_field_name("type")?.kind() {
            "struct_type" => "struct",
            "interface_type" => "interface",
            _ => return None,
        },

        (Python, "function_definition") => "function",
        (Python, "class_definition") => "class",

        (JavaScript | TypeScript, "function_declaration" | "generator_function_declaration") => {
            "function"
        }
        (JavaScript | TypeScript, "class_declaration" | "abstract_class_declaration") => "class",
        (JavaScript | TypeScript, "method_definition") => "method",
        (JavaScript | TypeScript, "variable_declarator") => {
            return function_binding(node, source);
        }
        (TypeScript, "interface_declaration") => "interface",
        (TypeScript, "enum_declaration") => "enum",

        (C | Cpp, "function_definition") => return c_function(node, source),
        (C | Cpp, "class_specifier" | "struct_specifier" | "enum_specifier")
            if node.child_by_field_name("body").is_some() =>
        {
            match node.kind() {
                "class_specifier" => "class",
                "struct_specifier" => "struct",
                _ => "enum",
            }
        }

        _ => return None,
    };

    // Decorators belong to the definition they wrap
    let span = match node.parent() {
        Some(parent) if parent.kind() == "decorated_definition" => parent,
        _ => node,
    };

    Some(Definition {
        kind,
        name: field_text(node, "name", source)?,
        span,
    })
}

/// Extract definitions from one file.
///
/// Languages without a grammar yield no symbols, and their files fall back
/// to size-based chunking.
pub fn extract_symbols(file_path: &str, content: &str, language: Language) -> Vec<Symbol> {
    let Some(grammar) = grammar(language) else {
        return Vec::new();
    };

    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&grammar) {
        warn!("Failed to load {} grammar: {e}", language.name());
        return Vec::new();
    }
    let Some(tree) = parser.parse(content, None) else {
        debug!("Failed to parse {file_path}");
        return Vec::new();
    };

    let source = content.as_bytes();
    let mut symbols = Vec::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        if let Some(found) = definition(node, source, language) {
            let kind = if found.kind == "function" && inside_container(node) {
                "method"
            } else {
                found.kind
            };
            symbols.push(Symbol {
                name: found.name,
                kind: kind.to_string(),
                file_path: file_path.to_string(),
                start_line: found.span.start_position().row + 1,
                end_line: found.span.end_position().row + 1,
                language: language.name().to_string(),
            });
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    symbols
}
