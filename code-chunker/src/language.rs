use std::path::Path;

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Go,
    TypeScript,
    JavaScript,
    Vue,
    Python,
    Java,
    Kotlin,
    Dart,
    Rust,
    CSharp,
    Cpp,
    C,
    Ruby,
    Php,
    Swift,
    Scala,
    Clojure,
    Elixir,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Detect language from file extension string
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "go" => Language::Go,
            "ts" | "tsx" => Language::TypeScript,
            "js" | "jsx" | "mjs" => Language::JavaScript,
            "vue" => Language::Vue,
            "py" => Language::Python,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "dart" => Language::Dart,
            "rs" => Language::Rust,
            "cs" => Language::CSharp,
            "cpp" | "cc" | "cxx" | "hpp" => Language::Cpp,
            "c" | "h" => Language::C,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "scala" => Language::Scala,
            "clj" => Language::Clojure,
            "ex" | "exs" => Language::Elixir,
            _ => Language::Unknown,
        }
    }

    /// Get the language name as string
    pub fn name(self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Vue => "vue",
            Language::Python => "python",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Dart => "dart",
            Language::Rust => "rust",
            Language::CSharp => "csharp",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Scala => "scala",
            Language::Clojure => "clojure",
            Language::Elixir => "elixir",
            Language::Unknown => "unknown",
        }
    }

    /// Whether files of this language take part in indexing
    pub fn is_known(self) -> bool {
        self != Language::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("TSX"), Language::TypeScript);
        assert_eq!(Language::from_extension("go"), Language::Go);
        assert_eq!(Language::from_extension("kts"), Language::Kotlin);
        assert_eq!(Language::from_extension("md"), Language::Unknown);
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("main.rs")), Language::Rust);
        assert_eq!(Language::from_path(Path::new("pkg/config.go")), Language::Go);
        assert_eq!(Language::from_path(Path::new("Makefile")), Language::Unknown);
        assert!(!Language::from_path(Path::new("README.md")).is_known());
    }

    #[test]
    fn test_language_name() {
        assert_eq!(Language::Rust.name(), "rust");
        assert_eq!(Language::CSharp.name(), "csharp");
        assert_eq!(Language::Unknown.name(), "unknown");
    }
}
