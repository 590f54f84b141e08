use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::catalog::{AliasIndex, AliasPriority, AliasRecord};
use crate::text::{cosine_similarity, sequence_ratio, TrigramVector};

/// Word → category hints; the first query token with an entry decides.
const CATEGORY_TOKENS: &[(&str, &str)] = &[
    ("dresser", "dresser"),
    ("bureau", "dresser"),
    ("armoire", "wardrobe"),
    ("wardrobe", "wardrobe"),
    ("cabinet", "cabinet"),
    ("bench", "bench"),
    ("lamp", "lamp"),
    ("sofa", "sofa"),
    ("couch", "sofa"),
    ("sectional", "sofa"),
    ("table", "table"),
    ("chair", "chair"),
    ("stool", "chair"),
    ("piano", "piano"),
    ("rug", "rug"),
    ("bed", "bed"),
    ("mattres", "bed"),
    ("mattress", "bed"),
    ("tv", "television"),
    ("television", "television"),
    ("mirror", "mirror"),
    ("desk", "desk"),
    ("appliance", "appliance"),
    ("refrigerator", "appliance"),
    ("fridge", "appliance"),
    ("freezer", "appliance"),
    ("box", "carton"),
    ("carton", "carton"),
];

pub const FALLBACK_CATEGORY: &str = "misc";

pub fn infer_category<S: AsRef<str>>(tokens: &[S]) -> &'static str {
    tokens
        .iter()
        .find_map(|token| {
            CATEGORY_TOKENS
                .iter()
                .find(|(word, _)| *word == token.as_ref())
                .map(|(_, category)| *category)
        })
        .unwrap_or(FALLBACK_CATEGORY)
}

/// Overlap of distinct words; two single words compare character-wise instead.
pub fn token_set_ratio(left: &str, right: &str) -> f64 {
    let left_words: BTreeSet<&str> = left.split_whitespace().collect();
    let right_words: BTreeSet<&str> = right.split_whitespace().collect();
    if left_words.is_empty() || right_words.is_empty() {
        return 0.0;
    }
    if left_words.len() == 1 && right_words.len() == 1 {
        return sequence_ratio(left.trim(), right.trim());
    }

    let overlap = left_words.intersection(&right_words).count();
    2.0 * overlap as f64 / (left_words.len() + right_words.len()) as f64
}

pub fn partial_ratio(left: &str, right: &str) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    sequence_ratio(left, right)
}

/// Mean of word overlap, character sequence similarity and trigram cosine.
pub fn combined_score(query: &str, query_vector: &TrigramVector, record: &AliasRecord) -> f64 {
    let token_set = token_set_ratio(query, &record.normalized);
    let partial = partial_ratio(query, &record.normalized);
    let cosine = cosine_similarity(query_vector, &record.vector);
    (token_set + partial + cosine) / 3.0
}

#[derive(Clone, Debug)]
pub struct Candidate<'a> {
    pub position: usize,
    pub record: &'a AliasRecord,
    pub score: f64,
    pub coverage: usize,
    pub category: &'a str,
    pub weight_lbs: f64,
}

/// Every alias scoring at or above `floor`, in registration order.
pub fn collect_candidates<'a>(
    index: &'a AliasIndex,
    query: &str,
    query_vector: &TrigramVector,
    floor: f64,
) -> Vec<Candidate<'a>> {
    let query_words: Vec<&str> = query.split_whitespace().collect();

    index
        .alias_records()
        .iter()
        .enumerate()
        .filter_map(|(position, record)| {
            let score = combined_score(query, query_vector, record);
            if score < floor {
                return None;
            }
            let item = index.get(&record.item_id)?;
            let coverage =
                query_words.iter().filter(|word| record.tokens.iter().any(|t| t == *word)).count();
            Some(Candidate {
                position,
                record,
                score,
                coverage,
                category: item.category.as_str(),
                weight_lbs: item.weight_lbs,
            })
        })
        .collect()
}

/// Ranking used to pick the fuzzy winner: more covered query words, higher score, the
/// hinted category, weight nearest the category medoid, stronger alias, then item id.
pub fn compare_candidates(
    left: &Candidate<'_>,
    right: &Candidate<'_>,
    hint: &str,
    index: &AliasIndex,
) -> Ordering {
    right
        .coverage
        .cmp(&left.coverage)
        .then_with(|| right.score.total_cmp(&left.score))
        .then_with(|| category_rank(left, hint).cmp(&category_rank(right, hint)))
        .then_with(|| medoid_distance(left, index).total_cmp(&medoid_distance(right, index)))
        .then_with(|| priority_rank(left.record.priority).cmp(&priority_rank(right.record.priority)))
        .then_with(|| left.record.item_id.cmp(&right.record.item_id))
}

fn category_rank(candidate: &Candidate<'_>, hint: &str) -> u8 {
    u8::from(candidate.category != hint)
}

fn priority_rank(priority: AliasPriority) -> u8 {
    priority as u8
}

fn medoid_distance(candidate: &Candidate<'_>, index: &AliasIndex) -> f64 {
    let medoid_weight = index
        .category_medoid(candidate.category)
        .and_then(|item_id| index.get(item_id))
        .map_or(0.0, |item| item.weight_lbs);
    (candidate.weight_lbs - medoid_weight).abs()
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::{infer_category, partial_ratio, round4, token_set_ratio};

    #[test]
    fn category_hint_uses_first_known_token() {
        assert_eq!(infer_category(&["old", "couch", "table"]), "sofa");
        assert_eq!(infer_category(&["mattres"]), "bed");
        assert_eq!(infer_category(&["kayak"]), "misc");
        assert_eq!(infer_category::<&str>(&[]), "misc");
    }

    #[test]
    fn token_set_ratio_counts_shared_words() {
        assert_eq!(token_set_ratio("dining table", "table dining"), 1.0);
        assert_eq!(token_set_ratio("coffee table", "end table"), 0.5);
        assert!((token_set_ratio("dreser", "dresser") - 12.0 / 13.0).abs() < 1e-12);
        assert_eq!(token_set_ratio("", "sofa"), 0.0);
    }

    #[test]
    fn partial_ratio_is_zero_for_empty_input() {
        assert_eq!(partial_ratio("", "sofa"), 0.0);
        assert_eq!(partial_ratio("sofa", "sofa"), 1.0);
    }

    #[test]
    fn scores_round_to_four_places() {
        assert_eq!(round4(0.871_549_9), 0.8715);
        assert_eq!(round4(0.5), 0.5);
    }
}
