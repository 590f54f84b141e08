//! Catalog items and the alias index that maps free-form labels onto them.

pub mod overrides;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::text::{cosine_similarity, generate_tokens, normalize_label, trigram_vector, TrigramVector};

pub const DEFAULT_CATEGORY: &str = "misc";
pub const DEFAULT_SUGGEST_LIMIT: usize = 5;

const SIZE_SUFFIXES: [&str; 3] = ["small", "medium", "large"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub volume_cuft: f64,
    #[serde(default)]
    pub weight_lbs: f64,
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Where an alias came from. Lower values win when two sources normalize to the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasPriority {
    Canonical = 0,
    Authored = 1,
    Variant = 2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AliasRecord {
    pub item_id: String,
    pub alias: String,
    pub normalized: String,
    pub tokens: Vec<String>,
    pub vector: TrigramVector,
    pub priority: AliasPriority,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub item: CatalogItem,
    pub alias: String,
    pub normalized: String,
    pub similarity: f64,
    pub approximate: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub item_id: String,
    pub alias: String,
    pub score: f64,
}

/// Immutable after construction; share behind an `Arc`.
#[derive(Clone, Debug, Default)]
pub struct AliasIndex {
    items: Vec<CatalogItem>,
    item_positions: HashMap<String, usize>,
    records: Vec<AliasRecord>,
    record_positions: HashMap<String, usize>,
    medoids: BTreeMap<String, String>,
}

impl AliasIndex {
    pub fn build(catalog: impl IntoIterator<Item = CatalogItem>) -> Self {
        let mut index = Self::default();

        for item in catalog.into_iter().chain(overrides::override_items()) {
            index.register_item(item);
        }
        for (phrase, item_id) in overrides::MANUAL_ALIASES {
            if index.item_positions.contains_key(*item_id) {
                index.register_alias(item_id, phrase, AliasPriority::Canonical);
            }
        }
        index.medoids = compute_medoids(&index.items);

        debug!(
            event_name = "catalog.index_built",
            items = index.items.len(),
            aliases = index.records.len(),
            categories = index.medoids.len(),
            "alias index built"
        );
        index
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let items: Vec<CatalogItem> = serde_json::from_str(raw)?;
        Ok(Self::build(items))
    }

    fn register_item(&mut self, item: CatalogItem) {
        let item_id = item.id.clone();
        let name = item.name.clone();
        let aliases = item.aliases.clone();

        match self.item_positions.get(&item_id) {
            Some(position) => self.items[*position] = item,
            None => {
                self.item_positions.insert(item_id.clone(), self.items.len());
                self.items.push(item);
            }
        }

        self.register_alias(&item_id, &name, AliasPriority::Canonical);
        for alias in &aliases {
            self.register_alias(&item_id, alias, AliasPriority::Authored);
        }
        for variant in name_variants(&name) {
            self.register_alias(&item_id, &variant, AliasPriority::Variant);
        }
    }

    fn register_alias(&mut self, item_id: &str, alias: &str, priority: AliasPriority) {
        let normalized = normalize_label(alias);
        if normalized.is_empty() {
            return;
        }

        let record = AliasRecord {
            item_id: item_id.to_string(),
            alias: alias.to_string(),
            tokens: generate_tokens(&normalized),
            vector: trigram_vector(&normalized),
            normalized: normalized.clone(),
            priority,
        };

        match self.record_positions.get(&normalized) {
            Some(position) => {
                let existing = &mut self.records[*position];
                if priority < existing.priority {
                    *existing = record;
                }
            }
            None => {
                self.record_positions.insert(normalized, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, item_id: &str) -> Option<&CatalogItem> {
        self.item_positions.get(item_id).map(|position| &self.items[*position])
    }

    pub fn exact(&self, normalized: &str) -> Option<&AliasRecord> {
        self.record_positions.get(normalized).map(|position| &self.records[*position])
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Alias records in registration order.
    pub fn alias_records(&self) -> &[AliasRecord] {
        &self.records
    }

    /// Exact normalized hit, else the best trigram cosine if it clears `threshold`.
    pub fn match_label(&self, raw: &str, threshold: f64) -> Option<MatchResult> {
        let normalized = normalize_label(raw);
        if normalized.is_empty() {
            return None;
        }

        if let Some(record) = self.exact(&normalized) {
            return self.match_result(record, normalized.clone(), 1.0, false);
        }

        let query = trigram_vector(&normalized);
        let mut best: Option<(&AliasRecord, f64)> = None;
        for record in &self.records {
            let score = cosine_similarity(&query, &record.vector);
            if score > best.map_or(0.0, |(_, best_score)| best_score) {
                best = Some((record, score));
            }
        }

        let (record, score) = best?;
        if score < threshold {
            return None;
        }
        self.match_result(record, record.normalized.clone(), score, true)
    }

    fn match_result(
        &self,
        record: &AliasRecord,
        normalized: String,
        similarity: f64,
        approximate: bool,
    ) -> Option<MatchResult> {
        let item = self.get(&record.item_id)?.clone();
        Some(MatchResult { item, alias: record.alias.clone(), normalized, similarity, approximate })
    }

    /// Highest-scoring aliases by trigram cosine. Equal scores keep registration order.
    pub fn suggest(&self, raw: &str, limit: usize) -> Vec<Suggestion> {
        let query = trigram_vector(&normalize_label(raw));
        let mut scored: Vec<(&AliasRecord, f64)> = self
            .records
            .iter()
            .map(|record| (record, cosine_similarity(&query, &record.vector)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|left, right| right.1.total_cmp(&left.1));

        scored
            .into_iter()
            .take(limit)
            .map(|(record, score)| Suggestion {
                item_id: record.item_id.clone(),
                alias: record.alias.clone(),
                score,
            })
            .collect()
    }

    pub fn category_medoid(&self, category: &str) -> Option<&str> {
        self.medoids.get(category).map(String::as_str)
    }

    /// Category to representative item id, ordered by category name.
    pub fn medoids(&self) -> &BTreeMap<String, String> {
        &self.medoids
    }
}

fn name_variants(name: &str) -> Vec<String> {
    let normalized = normalize_label(name);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let mut variants = Vec::new();

    if tokens.len() == 2 {
        variants.push(format!("{} {}", tokens[1], tokens[0]));
    }
    variants.push(tokens.join("_"));
    variants.push(tokens.join("-"));

    if let Some((last, rest)) = tokens.split_last() {
        if SIZE_SUFFIXES.contains(last) && !rest.is_empty() {
            variants.push(rest.join(" "));
            if rest.len() == 2 {
                variants.push(format!("{} {}", rest[1], rest[0]));
            }
        }
    }

    variants
}

/// Per category: order by (weight, id), take the middle entry's weight, then pick the
/// item closest to it with ties going to the smaller id.
fn compute_medoids(items: &[CatalogItem]) -> BTreeMap<String, String> {
    let mut by_category: BTreeMap<&str, Vec<&CatalogItem>> = BTreeMap::new();
    for item in items {
        by_category.entry(item.category.as_str()).or_default().push(item);
    }

    let mut medoids = BTreeMap::new();
    for (category, mut members) in by_category {
        members.sort_by(|left, right| {
            left.weight_lbs.total_cmp(&right.weight_lbs).then_with(|| left.id.cmp(&right.id))
        });
        let target = members[members.len() / 2].weight_lbs;
        let chosen = members.iter().min_by(|left, right| {
            (left.weight_lbs - target)
                .abs()
                .total_cmp(&(right.weight_lbs - target).abs())
                .then_with(|| left.id.cmp(&right.id))
        });
        if let Some(chosen) = chosen {
            medoids.insert(category.to_string(), chosen.id.clone());
        }
    }
    medoids
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{AliasIndex, AliasPriority, CatalogItem};

    pub(crate) const CATALOG_JSON: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/catalog.json"));

    pub(crate) fn shipped_index() -> AliasIndex {
        match AliasIndex::from_json(CATALOG_JSON) {
            Ok(index) => index,
            Err(error) => panic!("shipped catalog should parse: {error}"),
        }
    }

    fn item(id: &str, name: &str, category: &str, weight: f64) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            volume_cuft: 1.0,
            weight_lbs: weight,
            aliases: Vec::new(),
        }
    }

    #[test]
    fn spellings_of_dining_table_hit_the_same_record() {
        let index = shipped_index();

        for raw in ["Dining_Table", "dining table", "table - dining"] {
            let matched = index.match_label(raw, 0.92).expect("dining table should match");
            assert_eq!(matched.item.id, "dining_table_medium", "{raw}");
            assert_eq!(matched.similarity, 1.0);
            assert!(!matched.approximate);
        }
    }

    #[test]
    fn misspelled_fridge_falls_short_of_match_but_leads_suggestions() {
        let index = shipped_index();

        assert!(index.match_label("fridgee", 0.92).is_none());

        let suggestions = index.suggest("fridgee", 5);
        assert_eq!(suggestions[0].item_id, "refrigerator_standard");
        assert!(suggestions.len() <= 5);
        assert!(suggestions.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn approximate_match_reports_cosine_similarity() {
        let index = shipped_index();

        let matched = index.match_label("fridgee", 0.5).expect("lower threshold should match");
        assert_eq!(matched.item.id, "refrigerator_standard");
        assert!(matched.approximate);
        assert!(matched.similarity < 1.0 && matched.similarity >= 0.5);
    }

    #[test]
    fn empty_label_neither_matches_nor_suggests() {
        let index = shipped_index();

        assert!(index.match_label("  ", 0.0).is_none());
        assert!(index.suggest("", 5).is_empty());
    }

    #[test]
    fn overrides_replace_catalog_items_with_the_same_id() {
        let index = AliasIndex::build(vec![item("sofa_three_seat", "Old Sofa", "misc", 10.0)]);

        let sofa = index.get("sofa_three_seat").expect("override sofa");
        assert_eq!(sofa.name, "Sofa");
        assert_eq!(sofa.weight_lbs, 210.0);
        assert_eq!(index.items().iter().filter(|item| item.id == "sofa_three_seat").count(), 1);
    }

    #[test]
    fn lower_priority_value_replaces_existing_alias() {
        // "Chest Freezer" authors "freezer"; a later canonical "Freezer" takes the key over
        let mut chest = item("freezer_chest", "Chest Freezer", "appliance", 150.0);
        chest.aliases = vec!["freezer".to_string()];
        let upright = item("freezer_upright", "Freezer", "appliance", 180.0);

        let index = AliasIndex::build(vec![chest, upright]);

        let record = index.exact("freezer").expect("freezer alias");
        assert_eq!(record.item_id, "freezer_upright");
        assert_eq!(record.priority, AliasPriority::Canonical);
    }

    #[test]
    fn first_registration_wins_at_equal_priority() {
        let mut first = item("lamp_floor", "Floor Lamp", "lamp", 10.0);
        first.aliases = vec!["lamp".to_string()];
        let mut second = item("lamp_table", "Table Lamp", "lamp", 6.0);
        second.aliases = vec!["lamp".to_string()];

        let index = AliasIndex::build(vec![first, second]);

        assert_eq!(index.exact("lamp").map(|record| record.item_id.as_str()), Some("lamp_floor"));
    }

    #[test]
    fn generated_variants_cover_reversed_and_trimmed_names() {
        let index = AliasIndex::build(vec![item("bench_piano", "Piano Bench", "bench", 25.0)]);
        let reversed = index.exact("bench piano").expect("reversed variant");
        assert_eq!(reversed.item_id, "bench_piano");
        assert_eq!(reversed.priority, AliasPriority::Variant);

        let index = AliasIndex::build(vec![item(
            "dining_table_large",
            "Dining Table Large",
            "table",
            220.0,
        )]);
        let trimmed = index.exact("dining table").expect("trimmed variant");
        assert_eq!(trimmed.item_id, "dining_table_large");
        assert_eq!(trimmed.priority, AliasPriority::Variant);
        assert_eq!(
            index.exact("table dining").map(|record| record.item_id.as_str()),
            Some("dining_table_large")
        );
    }

    #[test]
    fn manual_aliases_skip_missing_targets() {
        let index = AliasIndex::build(Vec::new());

        // dining_table_medium only exists in the vendor catalog
        assert!(index.get("dining_table_medium").is_none());
        assert!(index.exact("table dining").is_none());
        assert_eq!(
            index.exact("fridge").map(|record| record.item_id.as_str()),
            Some("refrigerator_standard")
        );
    }

    #[test]
    fn medoid_is_closest_to_middle_weight_with_id_tiebreak() {
        let index = AliasIndex::build(vec![
            item("c_heavy", "C Heavy", "crate", 90.0),
            item("b_mid", "B Mid", "crate", 50.0),
            item("a_mid", "A Mid", "crate", 50.0),
            item("d_light", "D Light", "crate", 10.0),
        ]);

        // sorted: d_light(10), a_mid(50), b_mid(50), c_heavy(90); middle index 2 -> 50
        assert_eq!(index.category_medoid("crate"), Some("a_mid"));
        assert!(index.category_medoid("unknown").is_none());
    }

    #[test]
    fn shipped_catalog_medoids_are_deterministic() {
        let index = shipped_index();

        assert_eq!(index.category_medoid("dresser"), Some("dresser_tall"));
        assert_eq!(index.category_medoid("carton"), Some("carton_box_large_4_5"));
        assert_eq!(index.medoids().keys().next().map(String::as_str), Some("appliance"));
    }

    #[test]
    fn equal_similarity_keeps_the_first_registered_alias() {
        let index = AliasIndex::build(vec![
            item("first_item", "Qwe Rtz", "crate", 10.0),
            item("second_item", "Qwe Rty", "crate", 10.0),
        ]);

        // "qwe rt" shares five of seven trigrams with both names.
        let matched = index.match_label("qwe rt", 0.7).expect("approximate match expected");
        assert!(matched.approximate);
        assert_eq!(matched.item.id, "first_item");
        assert_eq!(matched.alias, "Qwe Rtz");

        let suggestions = index.suggest("qwe rt", 2);
        let ids: Vec<&str> = suggestions.iter().map(|entry| entry.item_id.as_str()).collect();
        assert_eq!(ids, vec!["first_item", "second_item"]);
        assert_eq!(suggestions[0].score, suggestions[1].score);
    }
}
