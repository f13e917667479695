use std::iter::Peekable;
use std::sync::LazyLock;

use regex::Regex;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\((?:member'?s? statement|minister'?s? response)").unwrap()
});
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[A-Z]").unwrap());

/// Strip trailing spaces/underscores/line endings and drop anything that isn't
/// printable ASCII (tab and the other ASCII whitespace survive).
pub fn clean_line(line: &str) -> String {
    line.trim_end_matches([' ', '_', '\n', '\r'])
        .chars()
        .filter(is_printable)
        .collect()
}

fn is_printable(c: &char) -> bool {
    c.is_ascii_graphic() || matches!(*c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// "(Member's Statement)" style procedural marker, always a paragraph on its own.
    Marker,
    /// ALL CAPS line; may open a new page without a blank line before it.
    Heading,
    Blank,
    Content,
}

pub fn classify_line(line: &str) -> LineKind {
    if MARKER_RE.is_match(line) {
        return LineKind::Marker;
    }
    if HEADING_RE.is_match(line) && !line.chars().any(|c| c.is_ascii_lowercase()) {
        return LineKind::Heading;
    }
    if line.is_empty() {
        LineKind::Blank
    } else {
        LineKind::Content
    }
}

/// Lines that belong together, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub lines: Vec<String>,
}

impl Paragraph {
    pub fn new(lines: Vec<String>) -> Self {
        Paragraph { lines }
    }

    /// The only line, if this paragraph has exactly one.
    pub fn single_line(&self) -> Option<&str> {
        match self.lines.as_slice() {
            [line] => Some(line.as_str()),
            _ => None,
        }
    }

    /// Lines joined with spaces, whitespace runs collapsed to one space.
    pub fn joined(&self) -> String {
        collapse_whitespace(&self.lines.join(" "))
    }
}

pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Single-pass paragraph grouping over cleaned lines.
///
/// Consecutive lines of the same kind form one paragraph, so a heading never
/// merges with content next to it. Blank runs are dropped; markers stand alone.
pub struct Paragraphs<I: Iterator<Item = String>> {
    lines: Peekable<I>,
}

impl<I: Iterator<Item = String>> Iterator for Paragraphs<I> {
    type Item = Paragraph;

    fn next(&mut self) -> Option<Paragraph> {
        loop {
            let first = self.lines.next()?;
            let kind = classify_line(&first);
            match kind {
                LineKind::Blank => continue,
                LineKind::Marker => return Some(Paragraph::new(vec![first])),
                LineKind::Heading | LineKind::Content => {
                    let mut lines = vec![first];
                    while let Some(line) = self.lines.next_if(|l| classify_line(l) == kind) {
                        lines.push(line);
                    }
                    return Some(Paragraph::new(lines));
                }
            }
        }
    }
}

/// Normalize raw extracted text and split it into paragraphs.
pub fn paragraphs(text: &str) -> Paragraphs<impl Iterator<Item = String> + '_> {
    Paragraphs {
        lines: text.split('\n').map(clean_line).peekable(),
    }
}
