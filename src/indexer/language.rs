//! Language classification and per-language line patterns
//!
//! Every language maps to up to three line-level regexes: a *boundary* pattern
//! (function/class/type starts, used to pick chunk split points), an *import*
//! pattern and a *class* pattern (both used to classify chunks). Languages
//! without a curated pattern fall back to the generic set, so every tag,
//! including [`Language::Unknown`], always has a usable regex.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

/// Language tag derived from a file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Rust,
    Go,
    Java,
    Kotlin,
    Scala,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Swift,
    Dart,
    Lua,
    Groovy,
    Shell,
    Sql,
    Vue,
    Svelte,
    Html,
    Css,
    Yaml,
    Toml,
    Dockerfile,
    Makefile,
    CMake,
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Dart => "dart",
            Language::Lua => "lua",
            Language::Groovy => "groovy",
            Language::Shell => "shell",
            Language::Sql => "sql",
            Language::Vue => "vue",
            Language::Svelte => "svelte",
            Language::Html => "html",
            Language::Css => "css",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Dockerfile => "dockerfile",
            Language::Makefile => "makefile",
            Language::CMake => "cmake",
            Language::Unknown => "unknown",
        }
    }

    /// Conventionally named files whose extension says nothing useful
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lang = match name {
            "Dockerfile" | "Containerfile" => Language::Dockerfile,
            "Makefile" | "makefile" | "GNUmakefile" => Language::Makefile,
            "CMakeLists.txt" => Language::CMake,
            "Gemfile" | "Rakefile" | "Podfile" | "Vagrantfile" => Language::Ruby,
            "Jenkinsfile" => Language::Groovy,
            _ => {
                // Dockerfile.dev, Dockerfile.prod, ...
                if name.starts_with("Dockerfile.") {
                    Language::Dockerfile
                } else {
                    return None;
                }
            }
        };
        Some(lang)
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let lang = match extension.to_lowercase().as_str() {
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "py" | "pyi" => Language::Python,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "scala" | "sc" => Language::Scala,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" | "rake" => Language::Ruby,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "dart" => Language::Dart,
            "lua" => Language::Lua,
            "groovy" | "gradle" => Language::Groovy,
            "sh" | "bash" | "zsh" => Language::Shell,
            "sql" => Language::Sql,
            "vue" => Language::Vue,
            "svelte" => Language::Svelte,
            "html" | "htm" => Language::Html,
            "css" | "scss" | "sass" | "less" => Language::Css,
            "yaml" | "yml" => Language::Yaml,
            "toml" => Language::Toml,
            "cmake" => Language::CMake,
            "mk" => Language::Makefile,
            _ => return None,
        };
        Some(lang)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a path: whole-filename matches first, then the extension
pub fn classify(path: &Path) -> Language {
    if let Some(lang) = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(Language::from_file_name)
    {
        return lang;
    }

    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Language::from_extension)
        .unwrap_or(Language::Unknown)
}

/// Whether discovery should pick this file up
pub fn is_supported(path: &Path) -> bool {
    classify(path) != Language::Unknown
}

struct PatternSpec {
    language: Language,
    boundary: Option<&'static str>,
    import: Option<&'static str>,
    class: Option<&'static str>,
}

const GENERIC_BOUNDARY: &str = r"^\s*((export|public|private|protected|static|async|pub)\s+)*(function|def|fn|func|class|interface|struct|enum|trait|module|impl)\b";
const GENERIC_IMPORT: &str = r"^\s*(import|from|use|using|require|include|#\s*include)\b";
const GENERIC_CLASS: &str =
    r"^\s*((export|public|private|protected|abstract|pub)\s+)*(class|interface|struct|trait|enum)\b";

const JS_IMPORT: &str = r#"^\s*(import\s|import\(|export\s+(\*|\{[^}]*\})\s+from\s|(const|let|var)\s+[\w{}\s,]+=\s*require\()"#;

const PATTERN_TABLE: &[PatternSpec] = &[
    PatternSpec {
        language: Language::TypeScript,
        boundary: Some(
            r"^\s*(export\s+)?(default\s+)?((async|declare)\s+)*function\b|^\s*(export\s+)?(default\s+)?((abstract|declare)\s+)*(class|interface|enum|namespace)\s+\w+|^\s*(export\s+)?type\s+\w+.*=|^\s*(export\s+)?(const|let)\s+\w+\s*(:[^=]+)?=\s*(async\s+)?(\([^)]*\)|\w+)\s*(:[^=]+)?=>",
        ),
        import: Some(JS_IMPORT),
        class: Some(
            r"^\s*(export\s+)?(default\s+)?((abstract|declare)\s+)*(class|interface|enum)\s+\w+|^\s*(export\s+)?type\s+\w+.*=",
        ),
    },
    PatternSpec {
        language: Language::JavaScript,
        boundary: Some(
            r"^\s*(export\s+)?(default\s+)?(async\s+)?function\b|^\s*(export\s+)?(default\s+)?class\s+\w+|^\s*(export\s+)?(const|let|var)\s+\w+\s*=\s*(async\s+)?(\([^)]*\)|\w+)\s*=>",
        ),
        import: Some(JS_IMPORT),
        class: Some(r"^\s*(export\s+)?(default\s+)?class\b"),
    },
    PatternSpec {
        language: Language::Python,
        boundary: Some(r"^\s*((async\s+)?def|class)\s+\w+|^\s*@[\w.]+"),
        import: Some(r"^\s*(import\s+[\w.]+|from\s+[\w.]+\s+import\b)"),
        class: Some(r"^\s*class\s+\w+"),
    },
    PatternSpec {
        language: Language::Rust,
        boundary: Some(
            r#"^\s*(pub(\([^)]*\))?\s+)?((async|const|unsafe|extern\s+"[^"]*")\s+)*fn\s+\w+|^\s*(pub(\([^)]*\))?\s+)?(struct|enum|trait|union|mod|type)\s+\w+|^\s*(unsafe\s+)?impl\b|^\s*macro_rules!"#,
        ),
        import: Some(r"^\s*(pub(\([^)]*\))?\s+)?(use\s|extern\s+crate\s)"),
        class: Some(r"^\s*(pub(\([^)]*\))?\s+)?(struct|enum|trait|union)\s+\w+|^\s*(unsafe\s+)?impl\b"),
    },
    PatternSpec {
        language: Language::Go,
        boundary: Some(r"^func\s|^type\s+\w+|^(var|const)\s+\("),
        import: Some(r"^\s*(import\b|package\s+\w+)"),
        class: Some(r"^type\s+\w+\s+(struct|interface)\b"),
    },
    PatternSpec {
        language: Language::Java,
        boundary: Some(
            r"^\s*((public|private|protected|static|final|abstract|sealed|non-sealed|strictfp)\s+)*(class|interface|enum|record|@interface)\s+\w+|^\s*((public|private|protected|static|final|abstract|synchronized|native|default)\s+)+[\w<>\[\],.?\s]+\s+\w+\s*\(",
        ),
        import: Some(r"^\s*(import|package)\s+[\w.*]+"),
        class: Some(
            r"^\s*((public|private|protected|static|final|abstract|sealed|non-sealed|strictfp)\s+)*(class|interface|enum|record|@interface)\s+\w+",
        ),
    },
    PatternSpec {
        language: Language::Kotlin,
        boundary: Some(
            r"^\s*((public|private|protected|internal|open|override|abstract|suspend|inline|data|sealed|enum|inner|annotation|value)\s+)*(fun|class|interface|object)\b",
        ),
        import: Some(r"^\s*(import|package)\s+[\w.*]+"),
        class: Some(
            r"^\s*((public|private|protected|internal|open|abstract|data|sealed|enum|inner|annotation|value)\s+)*(class|interface|object)\b",
        ),
    },
    PatternSpec {
        language: Language::Scala,
        boundary: Some(
            r"^\s*((private|protected|override|final|implicit|sealed|abstract|case|lazy)\s+)*(def|class|object|trait)\s+\w+",
        ),
        import: Some(r"^\s*(import|package)\s+[\w.{}]+"),
        class: Some(r"^\s*((private|protected|final|sealed|abstract|case)\s+)*(class|object|trait)\s+\w+"),
    },
    PatternSpec {
        language: Language::C,
        boundary: Some(
            r"^[A-Za-z_][\w\s\*]*[\s\*]\**\w+\s*\([^;]*$|^\s*(typedef\s+)?(struct|union|enum)\s+\w*\s*\{?\s*$",
        ),
        import: Some(r"^\s*#\s*include\b"),
        class: Some(r"^\s*(typedef\s+)?(struct|union|enum)\b"),
    },
    PatternSpec {
        language: Language::Cpp,
        boundary: Some(
            r"^[A-Za-z_][\w\s\*&:<>,]*[\s\*&]\**[\w:~]+\s*\([^;]*$|^\s*(template\s*<.*>\s*)?(class|struct|union|enum(\s+class)?|namespace)\s+\w+[^;]*$|^\s*template\s*<",
        ),
        import: Some(r"^\s*(#\s*(include|import)\b|import\s+[\w.<]+|using\s+namespace\b)"),
        class: Some(r"^\s*(template\s*<.*>\s*)?(class|struct|union|enum(\s+class)?)\s+\w+[^;]*$"),
    },
    PatternSpec {
        language: Language::CSharp,
        boundary: Some(
            r"^\s*((public|private|protected|internal|static|sealed|abstract|partial|readonly|override|virtual|async|unsafe)\s+)*(class|interface|struct|enum|record|namespace)\s+\w+|^\s*((public|private|protected|internal|static|override|virtual|abstract|async|extern)\s+)+[\w<>\[\],.?\s]+\s+\w+\s*\(",
        ),
        import: Some(r"^\s*using\s+(static\s+)?[\w.]+\s*(=\s*[\w.]+\s*)?;"),
        class: Some(
            r"^\s*((public|private|protected|internal|static|sealed|abstract|partial|readonly)\s+)*(class|interface|struct|enum|record)\s+\w+",
        ),
    },
    PatternSpec {
        language: Language::Ruby,
        boundary: Some(r"^\s*(def|class|module)\s+"),
        import: Some(r"^\s*(require|require_relative|load)\b"),
        class: Some(r"^\s*(class|module)\s+"),
    },
    PatternSpec {
        language: Language::Php,
        boundary: Some(
            r"^\s*((public|private|protected|static|final|abstract|readonly)\s+)*(function|class|interface|trait|enum)\s+\w+",
        ),
        import: Some(r"^\s*(use|require|require_once|include|include_once|namespace)\b"),
        class: Some(r"^\s*((final|abstract|readonly)\s+)*(class|interface|trait|enum)\s+\w+"),
    },
    PatternSpec {
        language: Language::Swift,
        boundary: Some(
            r"^\s*((public|private|fileprivate|internal|open|static|final|override|mutating|class|@\w+)\s+)*(func|class|struct|enum|protocol|extension|actor|init)\b",
        ),
        import: Some(r"^\s*(@testable\s+)?import\s+\w+"),
        class: Some(
            r"^\s*((public|private|fileprivate|internal|open|final)\s+)*(class|struct|enum|protocol|extension|actor)\s+\w+",
        ),
    },
    PatternSpec {
        language: Language::Dart,
        boundary: Some(
            r"^\s*(abstract\s+)?(class|mixin|extension|enum)\s+\w+|^\s*(static\s+)?(Future<.*>|Stream<.*>|void|[A-Z]\w*(<.*>)?|int|double|bool|String|dynamic)\s+\w+\s*\(",
        ),
        import: Some(r"^\s*(import|export|part|library)\s"),
        class: Some(r"^\s*(abstract\s+)?(class|mixin|extension|enum)\s+\w+"),
    },
    PatternSpec {
        language: Language::Lua,
        boundary: Some(r"^\s*(local\s+)?function\b"),
        import: Some(r"^\s*(local\s+\w+\s*=\s*)?require\b"),
        class: None,
    },
    PatternSpec {
        language: Language::Groovy,
        boundary: Some(r"^\s*(def|class|interface|enum|stage|pipeline|task)\b"),
        import: Some(r"^\s*(import|package|apply|plugins)\b"),
        class: Some(r"^\s*(class|interface|enum)\s+\w+"),
    },
    PatternSpec {
        language: Language::Shell,
        boundary: Some(r"^\s*(function\s+[\w-]+|[\w-]+\s*\(\)\s*\{?)"),
        import: Some(r"^\s*(source|\.)\s+\S+"),
        class: None,
    },
    PatternSpec {
        language: Language::Sql,
        boundary: Some(r"(?i)^\s*(create|alter|drop|insert\s+into|with)\b"),
        import: None,
        class: Some(r"(?i)^\s*create\s+(or\s+replace\s+)?(table|view|type)\b"),
    },
    PatternSpec {
        language: Language::Vue,
        boundary: Some(r"^\s*<(template|script|style)\b|^\s*(export\s+default|(async\s+)?function\b|const\s+\w+\s*=\s*(async\s+)?\()"),
        import: Some(JS_IMPORT),
        class: None,
    },
    PatternSpec {
        language: Language::Svelte,
        boundary: Some(r"^\s*<(script|style)\b|^\s*((async\s+)?function\b|const\s+\w+\s*=\s*(async\s+)?\()"),
        import: Some(JS_IMPORT),
        class: None,
    },
    PatternSpec {
        language: Language::Html,
        boundary: Some(r"^\s*<(head|body|section|article|main|header|footer|nav|script|style|template|form)\b"),
        import: Some(r#"^\s*<(link|script\s+[^>]*src=)"#),
        class: None,
    },
    PatternSpec {
        language: Language::Css,
        boundary: Some(r"^[^\s@}][^{]*\{\s*$|^@(media|keyframes|supports|mixin|function)\b"),
        import: Some(r"^\s*@(import|use|forward)\b"),
        class: None,
    },
    PatternSpec {
        language: Language::Yaml,
        boundary: Some(r"^[\w.-]+:\s*$|^---"),
        import: None,
        class: None,
    },
    PatternSpec {
        language: Language::Toml,
        boundary: Some(r"^\s*\[\[?[\w.\x22-]+\]\]?\s*$"),
        import: None,
        class: None,
    },
    PatternSpec {
        language: Language::Dockerfile,
        boundary: Some(r"(?i)^\s*FROM\s"),
        import: None,
        class: None,
    },
    PatternSpec {
        language: Language::Makefile,
        boundary: Some(r"^[\w./%-]+\s*::?[^=]*$"),
        import: Some(r"^\s*-?include\s"),
        class: None,
    },
    PatternSpec {
        language: Language::CMake,
        boundary: Some(r"(?i)^\s*(function|macro|add_executable|add_library|project)\s*\("),
        import: Some(r"(?i)^\s*(include|find_package|add_subdirectory)\s*\("),
        class: None,
    },
];

struct CompiledPatterns {
    boundary: Option<Regex>,
    import: Option<Regex>,
    class: Option<Regex>,
}

struct GenericPatterns {
    boundary: Regex,
    import: Regex,
    class: Regex,
}

fn compile(language: Language, kind: &str, pattern: &str) -> Regex {
    Regex::new(pattern)
        .unwrap_or_else(|e| panic!("invalid {} pattern for {}: {}", kind, language, e))
}

static PATTERNS: LazyLock<HashMap<Language, CompiledPatterns>> = LazyLock::new(|| {
    PATTERN_TABLE
        .iter()
        .map(|spec| {
            let compiled = CompiledPatterns {
                boundary: spec.boundary.map(|p| compile(spec.language, "boundary", p)),
                import: spec.import.map(|p| compile(spec.language, "import", p)),
                class: spec.class.map(|p| compile(spec.language, "class", p)),
            };
            (spec.language, compiled)
        })
        .collect()
});

static GENERIC: LazyLock<GenericPatterns> = LazyLock::new(|| GenericPatterns {
    boundary: compile(Language::Unknown, "boundary", GENERIC_BOUNDARY),
    import: compile(Language::Unknown, "import", GENERIC_IMPORT),
    class: compile(Language::Unknown, "class", GENERIC_CLASS),
});

/// Lines that start a function, class or type
pub fn boundary_pattern(language: Language) -> &'static Regex {
    PATTERNS
        .get(&language)
        .and_then(|p| p.boundary.as_ref())
        .unwrap_or(&GENERIC.boundary)
}

/// Lines that import or include other code
pub fn import_pattern(language: Language) -> &'static Regex {
    PATTERNS
        .get(&language)
        .and_then(|p| p.import.as_ref())
        .unwrap_or(&GENERIC.import)
}

/// Lines that declare a class, struct, interface or other type
pub fn class_pattern(language: Language) -> &'static Regex {
    PATTERNS
        .get(&language)
        .and_then(|p| p.class.as_ref())
        .unwrap_or(&GENERIC.class)
}
