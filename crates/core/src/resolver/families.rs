//! Keyword rules for furniture families whose catalog ids follow a fixed layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::AliasIndex;
use crate::errors::DomainError;
use crate::resolver::{
    build_family_line, Assumption, LineInput, ResolutionContext, ResolutionReason, StrategyHit,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedSize {
    King,
    Queen,
    Full,
    Twin,
}

impl BedSize {
    /// Priority order used when sizes tie in the batch tally.
    pub const ALL: [BedSize; 4] = [Self::King, Self::Queen, Self::Full, Self::Twin];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::King => "king",
            Self::Queen => "queen",
            Self::Full => "full",
            Self::Twin => "twin",
        }
    }

    fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::King => &["king", "cal king", "california"],
            Self::Queen => &["queen"],
            Self::Full => &["full", "double"],
            Self::Twin => &["twin", "single"],
        }
    }

    fn mentioned_in(self, tokens: &[String]) -> bool {
        self.synonyms().iter().any(|phrase| contains_phrase(tokens, phrase))
    }

    pub fn mattress_id(self) -> String {
        format!("bed_{}_mattress", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BedPart {
    Headboard,
    Frame,
    BoxSpring,
}

fn bed_part_target(part: BedPart, size: BedSize) -> &'static str {
    match (part, size) {
        (BedPart::Headboard, BedSize::King) => "bed_king_headboard",
        (BedPart::Headboard, BedSize::Queen) => "bed_queen_headboard",
        (BedPart::Headboard, BedSize::Full) => "bed_full_headboard",
        (BedPart::Headboard, BedSize::Twin) => "bed_headboard",
        (BedPart::Frame, BedSize::King) => "bed_king_frame",
        (BedPart::Frame, BedSize::Queen) => "bed_queen_frame",
        (BedPart::Frame, BedSize::Full) => "bed_double_full_frame",
        (BedPart::Frame, BedSize::Twin) => "bed_twin_single_frame",
        (BedPart::BoxSpring, BedSize::King) => "bed_king_box_spring",
        (BedPart::BoxSpring, BedSize::Queen) => "bed_queen_box_spring",
        (BedPart::BoxSpring, BedSize::Full) => "bed_double_full_box_spring",
        (BedPart::BoxSpring, BedSize::Twin) => "bed_twin_single_box_spring",
    }
}

const DRESSER_KEYWORDS: &[(&str, &str)] = &[
    ("tall", "dresser_tall"),
    ("highboy", "dresser_tall"),
    ("chest", "dresser_tall"),
    ("double", "dresser_double"),
    ("lowboy", "dresser_double"),
    ("wide", "dresser_double"),
];

const MATTRESS_TOKENS: [&str; 2] = ["mattress", "mattres"];

/// True when the words of `phrase` appear consecutively in `tokens`.
fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return false;
    }
    tokens.windows(words.len()).any(|window| window.iter().zip(&words).all(|(t, w)| t == w))
}

fn has_token(tokens: &[String], word: &str) -> bool {
    tokens.iter().any(|token| token == word)
}

/// Majority mattress size across the batch. Each mattress line votes its quantity for
/// every size it mentions; ties keep king > queen > full > twin.
pub fn majority_bed_size<'a>(
    lines: impl IntoIterator<Item = (&'a [String], u32)>,
) -> Option<BedSize> {
    let mut votes: BTreeMap<BedSize, u64> = BTreeMap::new();
    for (tokens, quantity) in lines {
        if !MATTRESS_TOKENS.iter().any(|word| has_token(tokens, word)) {
            continue;
        }
        for size in BedSize::ALL {
            if size.mentioned_in(tokens) {
                *votes.entry(size).or_insert(0) += u64::from(quantity);
            }
        }
    }

    let mut best: Option<(BedSize, u64)> = None;
    for size in BedSize::ALL {
        let count = votes.get(&size).copied().unwrap_or(0);
        if count > best.map_or(0, |(_, best_count)| best_count) {
            best = Some((size, count));
        }
    }
    best.map(|(size, _)| size)
}

fn present<'a>(index: &AliasIndex, item_id: &'a str) -> Option<&'a str> {
    index.get(item_id).map(|_| item_id)
}

/// Headboards, frames and box springs inherit the batch's majority mattress size.
pub(crate) fn bed_family(
    context: &ResolutionContext<'_>,
    line: &LineInput<'_>,
) -> Result<Option<StrategyHit>, DomainError> {
    let Some(size) = context.bed_size else {
        return Ok(None);
    };

    let tokens = line.tokens;
    let mut parts = Vec::new();
    if has_token(tokens, "headboard") {
        parts.push(BedPart::Headboard);
    }
    if has_token(tokens, "frame") {
        parts.push(BedPart::Frame);
    }
    if has_token(tokens, "box") && has_token(tokens, "spring") {
        parts.push(BedPart::BoxSpring);
    }

    for part in parts {
        if let Some(item_id) = present(context.index, bed_part_target(part, size)) {
            let resolved = build_family_line(
                context.index,
                line.raw,
                line.quantity,
                item_id,
                0.9,
                ResolutionReason::FamilyBed,
            )?;
            return Ok(Some(StrategyHit {
                lines: vec![resolved],
                assumptions: Vec::new(),
                inherited_size: Some(size),
            }));
        }
    }
    Ok(None)
}

pub(crate) fn dresser_family(
    context: &ResolutionContext<'_>,
    line: &LineInput<'_>,
) -> Result<Option<StrategyHit>, DomainError> {
    for token in line.tokens {
        let keyword_target = DRESSER_KEYWORDS
            .iter()
            .find(|(keyword, _)| keyword == token)
            .and_then(|(_, item_id)| present(context.index, item_id));
        if let Some(item_id) = keyword_target {
            return family_hit(context, line, item_id, 0.85);
        }
    }

    if has_token(line.tokens, "dresser") || has_token(line.tokens, "bureau") {
        if let Some(item_id) = present(context.index, "dresser_standard") {
            return family_hit(context, line, item_id, 0.82);
        }
    }
    Ok(None)
}

fn family_hit(
    context: &ResolutionContext<'_>,
    line: &LineInput<'_>,
    item_id: &str,
    confidence: f64,
) -> Result<Option<StrategyHit>, DomainError> {
    let resolved = build_family_line(
        context.index,
        line.raw,
        line.quantity,
        item_id,
        confidence,
        ResolutionReason::FamilyDresser,
    )?;
    Ok(Some(StrategyHit { lines: vec![resolved], ..StrategyHit::default() }))
}

/// Grand or upright by keyword, plus a bench line when the label mentions one.
pub(crate) fn piano_family(
    context: &ResolutionContext<'_>,
    line: &LineInput<'_>,
) -> Result<Option<StrategyHit>, DomainError> {
    if !has_token(line.tokens, "piano") {
        return Ok(None);
    }

    let grand = has_token(line.tokens, "grand") || contains_phrase(line.tokens, "baby grand");
    let (piano_id, confidence) =
        if grand { ("piano_grand", 0.9) } else { ("piano_upright", 0.85) };

    let mut hit = StrategyHit::default();
    if let Some(item_id) = present(context.index, piano_id) {
        hit.lines.push(build_family_line(
            context.index,
            line.raw,
            line.quantity,
            item_id,
            confidence,
            ResolutionReason::FamilyPiano,
        )?);
    }

    if has_token(line.tokens, "bench") {
        if let Some(item_id) = present(context.index, "bench_piano") {
            let bench_raw = format!("{} (bench)", line.raw);
            hit.lines.push(build_family_line(
                context.index,
                &bench_raw,
                line.quantity,
                item_id,
                0.8,
                ResolutionReason::FamilyPiano,
            )?);
            hit.assumptions.push(Assumption::BestMatch {
                raw: bench_raw,
                chosen_id: item_id.to_string(),
                confidence: 0.8,
                alternates: Vec::new(),
                resolver: ResolutionReason::FamilyPiano.as_str().to_string(),
            });
        }
    }

    Ok((!hit.lines.is_empty()).then_some(hit))
}
