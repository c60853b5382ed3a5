//! Name scoring shared by search resolution and full-name detection.
//! Everything here is pure and works on plain strings.

use std::cmp::Ordering;
use std::collections::HashSet;

use deunicode::deunicode;

/// Lowercased ASCII form with punctuation turned into spaces and runs of
/// whitespace collapsed: `"Kylian Mbappé-Lottin"` becomes
/// `"kylian mbappe lottin"`.
pub fn normalize_name(raw: &str) -> String {
    let ascii = deunicode(raw).to_lowercase();
    let cleaned = ascii
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity ratio in `0.0..=1.0`, insensitive to case and accents.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::sorensen_dice(&a, &b)
}

/// True when both names share at least one word of two letters or more.
pub fn tokens_overlap(a: &str, b: &str) -> bool {
    let left = name_tokens(a);
    if left.is_empty() {
        return false;
    }
    name_tokens(b).iter().any(|token| left.contains(token))
}

fn name_tokens(raw: &str) -> HashSet<String> {
    normalize_name(raw)
        .split(' ')
        .filter(|token| token.len() >= 2)
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    /// Position of the candidate in the input.
    pub index: usize,
    pub score: f64,
}

/// Scores every candidate against `query` and returns them best first.
/// Equal scores keep their input order, so the first-seen candidate wins a
/// tie.
pub fn rank<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<Scored> {
    let mut scored = candidates
        .into_iter()
        .enumerate()
        .map(|(index, text)| Scored {
            index,
            score: similarity(query, text),
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored
}
