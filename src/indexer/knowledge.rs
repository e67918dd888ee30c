//! Knowledge documents: markdown and text files split into heading sections

use crate::types::{ItemMetadata, KnowledgeMetadata};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}#{1,6}\s+(.+?)\s*#*\s*$").expect("heading regex is valid")
});

const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// A section of a knowledge document, the unit of embedding
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeSection {
    pub source: String,
    pub section: String,
    pub text: String,
}

impl KnowledgeSection {
    pub fn to_metadata(&self) -> ItemMetadata {
        ItemMetadata::Knowledge(KnowledgeMetadata {
            text: self.text.clone(),
            source: self.source.clone(),
            section: self.section.clone(),
        })
    }
}

pub fn is_knowledge_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Split a document at ATX headings
///
/// Text before the first heading becomes a section named after the document.
/// Headings inside fenced code blocks are ignored and sections without body
/// text are dropped.
pub fn split_markdown(source: &str, text: &str) -> Vec<KnowledgeSection> {
    let preamble = Path::new(source)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source)
        .to_string();

    let mut sections = Vec::new();
    let mut heading = preamble;
    let mut body: Vec<&str> = Vec::new();
    let mut heading_line: Option<&str> = None;
    let mut in_fence = false;

    let mut flush = |heading: &str, heading_line: Option<&str>, body: &mut Vec<&str>| {
        if body.iter().any(|l| !l.trim().is_empty()) {
            let mut text = String::new();
            if let Some(line) = heading_line {
                text.push_str(line.trim());
                text.push('\n');
            }
            text.push_str(body.join("\n").trim());
            sections.push(KnowledgeSection {
                source: source.to_string(),
                section: heading.to_string(),
                text,
            });
        }
        body.clear();
    };

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }

        if !in_fence && let Some(captures) = HEADING.captures(line) {
            flush(&heading, heading_line, &mut body);
            heading = captures[1].to_string();
            heading_line = Some(line);
            continue;
        }

        body.push(line);
    }
    flush(&heading, heading_line, &mut body);

    sections
}
