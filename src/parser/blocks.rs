use std::sync::LazyLock;

use regex::Regex;

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*\*([^*]+)\*\*$").unwrap());
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());
static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*]\s+)?([A-Z][A-Za-z -]{1,30}):\s*(.*)$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A line that is nothing but `**Name**`; starts a recipe.
    Title(String),
    Heading { level: u8, text: String },
    Field { key: String, value: String },
    Text(String),
    Empty,
}

pub fn classify_lines(markdown: &str) -> Vec<Block> {
    markdown.lines().map(|l| classify(l.trim())).collect()
}

fn classify(line: &str) -> Block {
    if line.is_empty() {
        return Block::Empty;
    }

    // ── Recipe title: **Name** ──
    if let Some(caps) = TITLE_RE.captures(line) {
        return Block::Title(caps[1].trim().to_string());
    }

    // ── Heading: ## text ──
    if let Some(caps) = HEADING_RE.captures(line) {
        return Block::Heading {
            level: caps[1].len() as u8,
            text: caps[2].to_string(),
        };
    }

    // ── Field: Key: value, optionally bulleted ──
    if let Some(caps) = FIELD_RE.captures(line) {
        return Block::Field {
            key: caps[1].trim().to_string(),
            value: caps[2].trim().to_string(),
        };
    }

    Block::Text(line.to_string())
}
