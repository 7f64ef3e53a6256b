/// Splitting plain text into titled sections.
///
/// Several heading conventions are tried (numbered headings, ALL-CAPS lines,
/// `SECTION n`, `Title:` lines). Each candidate split is scored on section length and
/// count, and the best positive score wins. With no usable headings the text is split into
/// paragraphs, and failing that the whole text becomes a single `Full Document` section.
use regex::Regex;
use tracing::debug;

use crate::model::Section;

const MAX_HEADING_CHARS: usize = 100;
const MAX_PARAGRAPH_SECTIONS: usize = 20;
const MIN_PARAGRAPH_CHARS: usize = 50;
const PARAGRAPH_TITLE_CHARS: usize = 100;

struct Part {
    title: String,
    content: String,
}

pub struct Segmenter {
    heading_patterns: Vec<Regex>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter {
    pub fn new() -> Self {
        let heading_patterns = [
            r"^\d+(?:\.\d+)*\.?\s+[A-Z]",
            r"^[A-Z][A-Z0-9 ,&'\-]{3,}$",
            r"^(?:SECTION|Section|ARTICLE|Article)\s+\d+",
            r"^[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*:",
        ]
        .into_iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect();
        Self { heading_patterns }
    }

    pub fn segment(&self, text: &str) -> Vec<Section> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let mut best: Option<(f64, Vec<Part>)> = None;
        for pattern in &self.heading_patterns {
            let parts = split_on_headings(&lines, pattern);
            if parts.len() < 2 {
                continue;
            }
            let score = score_parts(&parts);
            debug!(pattern = pattern.as_str(), parts = parts.len(), score, "heading split scored");
            if score > 0.0 && best.as_ref().map_or(true, |(top, _)| score > *top) {
                best = Some((score, parts));
            }
        }

        let parts = match best {
            Some((_, parts)) => parts,
            None => paragraphs(text),
        };
        if parts.is_empty() {
            return vec![Section::new(0, Some("Full Document"), text.trim())];
        }
        parts
            .into_iter()
            .enumerate()
            .map(|(index, part)| Section::new(index, Some(part.title.as_str()), part.content))
            .collect()
    }
}

/// Convenience wrapper compiling the patterns for a single call.
pub fn segment_text(text: &str) -> Vec<Section> {
    Segmenter::new().segment(text)
}

/// Start a new part at every heading line after the first line.
fn split_on_headings(lines: &[&str], pattern: &Regex) -> Vec<Part> {
    let mut groups: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let is_heading = i > 0
            && !line.is_empty()
            && line.chars().count() <= MAX_HEADING_CHARS
            && pattern.is_match(line);
        if is_heading && current.iter().any(|l| !l.is_empty()) {
            groups.push(std::mem::take(&mut current));
        }
        current.push(line);
    }
    groups.push(current);

    groups
        .into_iter()
        .filter_map(|group| {
            let mut non_empty = group.into_iter().filter(|l| !l.is_empty());
            let heading = non_empty.next()?;
            let body = non_empty.collect::<Vec<_>>().join("\n");
            let content = if body.is_empty() {
                heading.to_string()
            } else {
                body
            };
            Some(Part {
                title: heading.trim_end_matches(':').trim().to_string(),
                content,
            })
        })
        .collect()
}

/// Average per-section quality: reasonable lengths and structural titles score up,
/// tiny or huge sections score down, and a plausible section count adds a bonus.
fn score_parts(parts: &[Part]) -> f64 {
    let mut score: i64 = 0;
    for part in parts {
        let len = part.content.chars().count();
        if 100 < len && len < 5000 {
            score += 2;
        } else if 50 < len && len < 10_000 {
            score += 1;
        }
        let title = part.title.to_lowercase();
        if ["section", "article", "chapter", "part"]
            .iter()
            .any(|k| title.contains(k))
        {
            score += 1;
        }
        if len < 20 || len > 10_000 {
            score -= 1;
        }
    }
    score += match parts.len() {
        3..=15 => 2,
        2..=25 => 1,
        _ => 0,
    };
    score as f64 / parts.len().max(1) as f64
}

fn paragraphs(text: &str) -> Vec<Part> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(MAX_PARAGRAPH_SECTIONS)
        .filter(|p| p.chars().count() > MIN_PARAGRAPH_CHARS)
        .map(|p| {
            let first_line = p.lines().next().unwrap_or(p).trim();
            let title = match first_line.char_indices().nth(PARAGRAPH_TITLE_CHARS) {
                Some((idx, _)) => format!("{}...", &first_line[..idx]),
                None => first_line.to_string(),
            };
            Part {
                title,
                content: p.to_string(),
            }
        })
        .collect()
}
