//! Label canonicalization and the string-similarity primitives used by the
//! alias index and the fuzzy resolver.

use std::collections::BTreeMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Character trigram counts. Ordered so that dot products sum in a stable order.
pub type TrigramVector = BTreeMap<String, u32>;

/// Phrases that name a carton size are rewritten to `box <size>`.
const PHRASE_REORDER: &[(&[&str], &str)] = &[
    (&["small", "box"], "box 1.5"),
    (&["medium", "box"], "box 3.0"),
    (&["large", "box"], "box 4.5"),
    (&["extra", "large", "box"], "box 6.0"),
    (&["xl", "box"], "box 6.0"),
];

/// Canonicalizes a free-form label: compatibility fold, lowercase, punctuation to
/// spaces, singular tokens, and a fixed word order for box phrases.
pub fn normalize_label(raw: &str) -> String {
    let folded: String =
        raw.nfkd().filter(|ch| !is_combining_mark(*ch)).collect::<String>().to_lowercase();

    let cleaned: String = folded
        .chars()
        .map(|ch| match ch {
            'a'..='z' | '0'..='9' | ' ' => ch,
            _ => ' ',
        })
        .collect();

    let tokens: Vec<String> = cleaned.split_whitespace().map(singularize).collect();
    if tokens.is_empty() {
        return String::new();
    }

    if (2..=3).contains(&tokens.len()) {
        if let Some((_, rewritten)) =
            PHRASE_REORDER.iter().find(|(phrase, _)| phrase.iter().eq(tokens.iter()))
        {
            return (*rewritten).to_string();
        }
        if tokens.last().map(String::as_str) == Some("box") && tokens[0] != "box" {
            let mut rotated = Vec::with_capacity(tokens.len());
            rotated.push("box".to_string());
            rotated.extend(tokens[..tokens.len() - 1].iter().cloned());
            return rotated.join(" ");
        }
    }

    tokens.join(" ")
}

fn is_numeric(token: &str) -> bool {
    token.parse::<f64>().is_ok()
}

fn singularize(token: &str) -> String {
    if is_numeric(token) || token.len() <= 3 {
        return token.to_string();
    }
    if let Some(stem) = token.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = token.strip_suffix("ves") {
        return format!("{stem}f");
    }
    if token.ends_with("ses") || token.ends_with("xes") {
        return token[..token.len() - 2].to_string();
    }
    if let Some(stem) = token.strip_suffix('s') {
        return stem.to_string();
    }
    token.to_string()
}

/// Unigrams followed by adjacent bigrams.
pub fn generate_tokens(normalized: &str) -> Vec<String> {
    let words: Vec<&str> = normalized.split_whitespace().collect();
    let mut tokens: Vec<String> = words.iter().map(|word| (*word).to_string()).collect();
    tokens.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    tokens
}

pub fn trigram_vector(normalized: &str) -> TrigramVector {
    let mut vector = TrigramVector::new();
    if normalized.is_empty() {
        return vector;
    }

    let padded: Vec<char> = format!(" {normalized} ").chars().collect();
    if padded.len() < 3 {
        vector.insert(padded.iter().collect(), 1);
        return vector;
    }

    for window in padded.windows(3) {
        *vector.entry(window.iter().collect()).or_insert(0) += 1;
    }
    vector
}

pub fn cosine_similarity(left: &TrigramVector, right: &TrigramVector) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let dot: f64 = left
        .iter()
        .filter_map(|(gram, count)| right.get(gram).map(|other| f64::from(*count * *other)))
        .sum();
    if dot == 0.0 {
        return 0.0;
    }

    let norm = |vector: &TrigramVector| {
        vector.values().map(|count| f64::from(*count).powi(2)).sum::<f64>().sqrt()
    };
    let (left_norm, right_norm) = (norm(left), norm(right));
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm * right_norm)
}

/// Ratcliff/Obershelp similarity: `2 * matched / (len(a) + len(b))`.
///
/// Matching blocks are found by taking the longest common block (earliest in `left`,
/// then earliest in `right`) and recursing on both sides of it.
pub fn sequence_ratio(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    let total = left.len() + right.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_characters(&left, &right) as f64 / total as f64
}

fn matched_characters(left: &[char], right: &[char]) -> usize {
    let mut pending = vec![(0, left.len(), 0, right.len())];
    let mut matched = 0;

    while let Some((left_lo, left_hi, right_lo, right_hi)) = pending.pop() {
        let (start_left, start_right, size) =
            longest_common_block(left, right, left_lo..left_hi, right_lo..right_hi);
        if size == 0 {
            continue;
        }
        matched += size;
        if left_lo < start_left && right_lo < start_right {
            pending.push((left_lo, start_left, right_lo, start_right));
        }
        if start_left + size < left_hi && start_right + size < right_hi {
            pending.push((start_left + size, left_hi, start_right + size, right_hi));
        }
    }

    matched
}

fn longest_common_block(
    left: &[char],
    right: &[char],
    left_range: std::ops::Range<usize>,
    right_range: std::ops::Range<usize>,
) -> (usize, usize, usize) {
    let mut best = (left_range.start, right_range.start, 0);
    // previous[k + 1] is the run length ending at (i - 1, right_range.start + k)
    let width = right_range.len() + 1;
    let mut previous = vec![0usize; width];
    let mut current = vec![0usize; width];

    for i in left_range {
        for (offset, j) in right_range.clone().enumerate() {
            current[offset + 1] =
                if left[i] == right[j] { previous[offset] + 1 } else { 0 };
            let run = current[offset + 1];
            if run > best.2 {
                best = (i + 1 - run, j + 1 - run, run);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}
