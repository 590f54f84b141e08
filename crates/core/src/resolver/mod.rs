//! Turns a tally of free-form item labels into catalog lines with an audit trail.
//!
//! Each distinct label runs through an ordered chain of strategies and the first one
//! that produces lines wins. Bed sizes are settled for the whole batch before any line
//! is resolved, so a bare "headboard" follows the batch's mattresses.

pub mod boxes;
pub mod families;
pub mod scoring;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{AliasIndex, CatalogItem, MatchResult};
use crate::errors::{DomainError, InputError};
use crate::text::{normalize_label, trigram_vector};

use self::boxes::{allocate_boxes, DEFAULT_BOX_POLICY};
use self::families::{majority_bed_size, BedSize};
use self::scoring::{collect_candidates, compare_candidates, infer_category, round4};

pub const DEFAULT_RESOLVER_POLICY: &str = "best_match_no_fail";
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.65;
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.75;
pub const BACKSTOP_CONFIDENCE: f64 = 0.5;

/// Labels and quantities in first-seen order. Repeated labels accumulate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTally {
    entries: Vec<(String, u32)>,
}

impl ItemTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: impl Into<String>, quantity: u32) {
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, count)) => *count = count.saturating_add(quantity),
            None => self.entries.push((label, quantity)),
        }
    }

    pub fn scale(&mut self, factor: u32) {
        for (_, count) in &mut self.entries {
            *count = count.saturating_mul(factor);
        }
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.entries.iter().find(|(existing, _)| existing == label).map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.entries.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has a positive quantity.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, count)| *count == 0)
    }

    /// Parses `"sofa:2, lamp, box:10"`. Entries without a quantity count once.
    pub fn parse_listing(listing: &str) -> Result<Self, InputError> {
        let mut tally = Self::new();
        for piece in listing.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            match piece.rsplit_once(':') {
                Some((label, quantity)) => {
                    let label = label.trim();
                    let quantity = quantity.trim().parse::<u32>().map_err(|_| {
                        InputError::InvalidQuantity {
                            label: label.to_string(),
                            value: quantity.trim().to_string(),
                        }
                    })?;
                    if !label.is_empty() {
                        tally.add(label, quantity);
                    }
                }
                None => tally.add(piece, 1),
            }
        }
        Ok(tally)
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for ItemTally {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut tally = Self::new();
        for (label, quantity) in iter {
            tally.add(label, quantity);
        }
        tally
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolverOptions {
    pub resolver_policy: String,
    pub box_allocation_policy: String,
    pub confidence_floor: f64,
    pub assumptions_public: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            resolver_policy: DEFAULT_RESOLVER_POLICY.to_string(),
            box_allocation_policy: DEFAULT_BOX_POLICY.to_string(),
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            assumptions_public: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionReason {
    BoxDistribution,
    ExactId,
    AliasExact,
    FamilyBed,
    FamilyDresser,
    FamilyPiano,
    FuzzyMatch,
    CategoryBackstop,
}

impl ResolutionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BoxDistribution => "box_distribution",
            Self::ExactId => "exact_id",
            Self::AliasExact => "alias_exact",
            Self::FamilyBed => "family_bed",
            Self::FamilyDresser => "family_dresser",
            Self::FamilyPiano => "family_piano",
            Self::FuzzyMatch => "fuzzy_match",
            Self::CategoryBackstop => "category_backstop",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alternate {
    pub item_id: String,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLine {
    pub raw: String,
    pub quantity: u32,
    #[serde(rename = "match")]
    pub matched: MatchResult,
    pub confidence: f64,
    pub reason: ResolutionReason,
    pub alternates: Vec<Alternate>,
}

impl ResolvedLine {
    pub fn item(&self) -> &CatalogItem {
        &self.matched.item
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assumption {
    BoxDistribution {
        total_boxes: u32,
        policy: String,
        result: BTreeMap<String, u32>,
    },
    SizeInheritance {
        from: String,
        applied_to: Vec<String>,
    },
    BestMatch {
        raw: String,
        chosen_id: String,
        confidence: f64,
        alternates: Vec<Alternate>,
        resolver: String,
    },
    CategoryBackstop {
        category: String,
        chosen_id: String,
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub resolved_pct: u8,
    pub low_confidence_count: usize,
    pub resolver_policy: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolverResult {
    pub lines: Vec<ResolvedLine>,
    pub assumptions: Vec<Assumption>,
    pub match_summary: MatchSummary,
}

pub trait InventoryResolver: Send + Sync {
    fn resolve(
        &self,
        tally: &ItemTally,
        index: &AliasIndex,
        options: &ResolverOptions,
    ) -> Result<ResolverResult, DomainError>;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicInventoryResolver;

impl InventoryResolver for DeterministicInventoryResolver {
    fn resolve(
        &self,
        tally: &ItemTally,
        index: &AliasIndex,
        options: &ResolverOptions,
    ) -> Result<ResolverResult, DomainError> {
        resolve_inventory(tally, index, options)
    }
}

pub(crate) struct ResolutionContext<'a> {
    pub index: &'a AliasIndex,
    pub options: &'a ResolverOptions,
    pub bed_size: Option<BedSize>,
}

pub(crate) struct LineInput<'a> {
    pub raw: &'a str,
    pub normalized: &'a str,
    pub tokens: &'a [String],
    pub quantity: u32,
}

#[derive(Debug, Default)]
pub(crate) struct StrategyHit {
    pub lines: Vec<ResolvedLine>,
    pub assumptions: Vec<Assumption>,
    pub inherited_size: Option<BedSize>,
}

type Strategy =
    fn(&ResolutionContext<'_>, &LineInput<'_>) -> Result<Option<StrategyHit>, DomainError>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("box_keyword", box_keyword),
    ("exact_id", exact_id),
    ("alias_exact", alias_exact),
    ("family_bed", families::bed_family),
    ("family_dresser", families::dresser_family),
    ("family_piano", families::piano_family),
    ("fuzzy_match", fuzzy_match),
];

struct PreparedLine<'a> {
    raw: &'a str,
    normalized: String,
    tokens: Vec<String>,
    quantity: u32,
}

pub fn resolve_inventory(
    tally: &ItemTally,
    index: &AliasIndex,
    options: &ResolverOptions,
) -> Result<ResolverResult, DomainError> {
    let prepared: Vec<PreparedLine<'_>> = tally
        .iter()
        .filter(|(_, quantity)| *quantity > 0)
        .filter_map(|(raw, quantity)| {
            let normalized = normalize_label(raw);
            if normalized.is_empty() {
                return None;
            }
            let tokens = normalized.split_whitespace().map(str::to_string).collect();
            Some(PreparedLine { raw, normalized, tokens, quantity })
        })
        .collect();

    let bed_size =
        majority_bed_size(prepared.iter().map(|line| (line.tokens.as_slice(), line.quantity)));
    let context = ResolutionContext { index, options, bed_size };

    let mut lines = Vec::new();
    let mut assumptions = Vec::new();
    let mut inherited: BTreeSet<String> = BTreeSet::new();

    for line in &prepared {
        let input = LineInput {
            raw: line.raw,
            normalized: &line.normalized,
            tokens: &line.tokens,
            quantity: line.quantity,
        };

        let mut outcome = None;
        for (name, strategy) in STRATEGIES {
            if let Some(hit) = strategy(&context, &input)? {
                debug!(
                    event_name = "resolver.strategy_hit",
                    strategy = *name,
                    raw = line.raw,
                    "label resolved"
                );
                outcome = Some(hit);
                break;
            }
        }
        let hit = match outcome {
            Some(hit) => hit,
            None => category_backstop(&context, &input)?,
        };

        if hit.inherited_size.is_some() {
            inherited.insert(line.raw.to_string());
        }
        lines.extend(hit.lines);
        assumptions.extend(hit.assumptions);
    }

    if let Some(size) = bed_size.filter(|_| !inherited.is_empty()) {
        assumptions.push(Assumption::SizeInheritance {
            from: size.mattress_id(),
            applied_to: inherited.into_iter().collect(),
        });
    }

    let mut recorded: HashSet<(String, String)> = assumptions
        .iter()
        .filter_map(|assumption| match assumption {
            Assumption::BestMatch { raw, chosen_id, .. } => Some((raw.clone(), chosen_id.clone())),
            _ => None,
        })
        .collect();
    for line in &lines {
        let key = (line.raw.clone(), line.matched.item.id.clone());
        if recorded.insert(key) {
            assumptions.push(Assumption::BestMatch {
                raw: line.raw.clone(),
                chosen_id: line.matched.item.id.clone(),
                confidence: round4(line.confidence),
                alternates: line.alternates.clone(),
                resolver: line.reason.as_str().to_string(),
            });
        }
    }

    let low_confidence_count =
        lines.iter().filter(|line| line.confidence < LOW_CONFIDENCE_THRESHOLD).count();

    Ok(ResolverResult {
        lines,
        assumptions,
        match_summary: MatchSummary {
            resolved_pct: 100,
            low_confidence_count,
            resolver_policy: options.resolver_policy.clone(),
        },
    })
}

/// A line pinned to `item_id` by a keyword rule rather than by text similarity.
pub(crate) fn build_family_line(
    index: &AliasIndex,
    raw: &str,
    quantity: u32,
    item_id: &str,
    confidence: f64,
    reason: ResolutionReason,
) -> Result<ResolvedLine, DomainError> {
    let item = index
        .get(item_id)
        .ok_or_else(|| DomainError::MissingFamilyTarget { item_id: item_id.to_string() })?;
    Ok(ResolvedLine {
        raw: raw.to_string(),
        quantity,
        matched: MatchResult {
            item: item.clone(),
            alias: item.name.clone(),
            normalized: normalize_label(&item.name),
            similarity: confidence,
            approximate: true,
        },
        confidence,
        reason,
        alternates: Vec::new(),
    })
}

fn box_keyword(
    context: &ResolutionContext<'_>,
    line: &LineInput<'_>,
) -> Result<Option<StrategyHit>, DomainError> {
    if line.normalized != "box" {
        return Ok(None);
    }

    let policy = &context.options.box_allocation_policy;
    let allocation = allocate_boxes(i64::from(line.quantity), policy);
    let mut hit = StrategyHit::default();

    for (size, item_id, count) in allocation.iter() {
        if count == 0 {
            continue;
        }
        let Some(item) = context.index.get(item_id) else {
            continue;
        };
        hit.lines.push(ResolvedLine {
            raw: format!("{} ({size})", line.raw),
            quantity: count,
            matched: MatchResult {
                item: item.clone(),
                alias: item.name.clone(),
                normalized: normalize_label(&item.name),
                similarity: 0.9,
                approximate: false,
            },
            confidence: 0.9,
            reason: ResolutionReason::BoxDistribution,
            alternates: Vec::new(),
        });
    }

    hit.assumptions.push(Assumption::BoxDistribution {
        total_boxes: line.quantity,
        policy: policy.clone(),
        result: allocation.to_map(),
    });
    Ok(Some(hit))
}

fn exact_id(
    context: &ResolutionContext<'_>,
    line: &LineInput<'_>,
) -> Result<Option<StrategyHit>, DomainError> {
    let Some(item) = context.index.get(line.raw) else {
        return Ok(None);
    };
    let resolved = ResolvedLine {
        raw: line.raw.to_string(),
        quantity: line.quantity,
        matched: MatchResult {
            item: item.clone(),
            alias: item.name.clone(),
            normalized: normalize_label(&item.name),
            similarity: 1.0,
            approximate: false,
        },
        confidence: 1.0,
        reason: ResolutionReason::ExactId,
        alternates: Vec::new(),
    };
    Ok(Some(StrategyHit { lines: vec![resolved], ..StrategyHit::default() }))
}

fn alias_exact(
    context: &ResolutionContext<'_>,
    line: &LineInput<'_>,
) -> Result<Option<StrategyHit>, DomainError> {
    let Some(record) = context.index.exact(line.normalized) else {
        return Ok(None);
    };
    let Some(item) = context.index.get(&record.item_id) else {
        return Ok(None);
    };
    let resolved = ResolvedLine {
        raw: line.raw.to_string(),
        quantity: line.quantity,
        matched: MatchResult {
            item: item.clone(),
            alias: record.alias.clone(),
            normalized: line.normalized.to_string(),
            similarity: 0.98,
            approximate: false,
        },
        confidence: 0.98,
        reason: ResolutionReason::AliasExact,
        alternates: Vec::new(),
    };
    Ok(Some(StrategyHit { lines: vec![resolved], ..StrategyHit::default() }))
}

fn fuzzy_match(
    context: &ResolutionContext<'_>,
    line: &LineInput<'_>,
) -> Result<Option<StrategyHit>, DomainError> {
    let query_vector = trigram_vector(line.normalized);
    let candidates = collect_candidates(
        context.index,
        line.normalized,
        &query_vector,
        context.options.confidence_floor,
    );
    if candidates.is_empty() {
        return Ok(None);
    }

    let hint = infer_category(line.tokens);
    let Some(best) = candidates
        .iter()
        .min_by(|left, right| compare_candidates(left, right, hint, context.index))
    else {
        return Ok(None);
    };
    let Some(item) = context.index.get(&best.record.item_id) else {
        return Ok(None);
    };

    let mut by_score: Vec<_> = candidates.iter().collect();
    by_score.sort_by(|left, right| right.score.total_cmp(&left.score));
    let alternates: Vec<Alternate> = by_score
        .into_iter()
        .filter(|candidate| candidate.position != best.position)
        .take(2)
        .map(|candidate| Alternate {
            item_id: candidate.record.item_id.clone(),
            score: round4(candidate.score),
        })
        .collect();

    let resolved = ResolvedLine {
        raw: line.raw.to_string(),
        quantity: line.quantity,
        matched: MatchResult {
            item: item.clone(),
            alias: best.record.alias.clone(),
            normalized: best.record.normalized.clone(),
            similarity: best.score,
            approximate: true,
        },
        confidence: best.score,
        reason: ResolutionReason::FuzzyMatch,
        alternates: alternates.clone(),
    };
    let assumption = Assumption::BestMatch {
        raw: line.raw.to_string(),
        chosen_id: item.id.clone(),
        confidence: round4(best.score),
        alternates,
        resolver: "fuzzy".to_string(),
    };
    Ok(Some(StrategyHit {
        lines: vec![resolved],
        assumptions: vec![assumption],
        inherited_size: None,
    }))
}

/// Last resort: the representative item of the label's inferred category.
fn category_backstop(
    context: &ResolutionContext<'_>,
    line: &LineInput<'_>,
) -> Result<StrategyHit, DomainError> {
    let category = infer_category(line.tokens);
    let item_id = context
        .index
        .category_medoid(category)
        .or_else(|| context.index.medoids().values().next().map(String::as_str))
        .ok_or(DomainError::MissingMedoids)?;
    let resolved = build_family_line(
        context.index,
        line.raw,
        line.quantity,
        item_id,
        BACKSTOP_CONFIDENCE,
        ResolutionReason::CategoryBackstop,
    )?;

    debug!(
        event_name = "resolver.category_backstop",
        raw = line.raw,
        category,
        chosen_id = item_id,
        "no candidate cleared the confidence floor"
    );

    let assumptions = vec![
        Assumption::CategoryBackstop {
            category: category.to_string(),
            chosen_id: item_id.to_string(),
            reason: "no candidate >= floor".to_string(),
        },
        Assumption::BestMatch {
            raw: line.raw.to_string(),
            chosen_id: item_id.to_string(),
            confidence: BACKSTOP_CONFIDENCE,
            alternates: Vec::new(),
            resolver: ResolutionReason::CategoryBackstop.as_str().to_string(),
        },
    ];
    Ok(StrategyHit { lines: vec![resolved], assumptions, inherited_size: None })
}

#[cfg(test)]
mod tests {
    use super::{
        resolve_inventory, Assumption, DeterministicInventoryResolver, InventoryResolver,
        ItemTally, ResolutionReason, ResolverOptions, ResolverResult,
    };
    use crate::catalog::tests::shipped_index;
    use crate::catalog::AliasIndex;
    use crate::errors::{DomainError, InputError};

    fn resolve(pairs: &[(&str, u32)], options: &ResolverOptions) -> ResolverResult {
        let tally: ItemTally = pairs.iter().map(|(label, qty)| (*label, *qty)).collect();
        resolve_inventory(&tally, &shipped_index(), options).expect("resolution should succeed")
    }

    fn line_ids(result: &ResolverResult) -> Vec<(&str, &str, u32)> {
        result
            .lines
            .iter()
            .map(|line| (line.raw.as_str(), line.matched.item.id.as_str(), line.quantity))
            .collect()
    }

    #[test]
    fn identical_inputs_resolve_identically() {
        let pairs = [("dreser", 1), ("box", 7), ("queen mattress", 1), ("headboard", 1)];
        let options = ResolverOptions::default();

        let first = resolve(&pairs, &options);
        let second = resolve(&pairs, &options);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).expect("serialize"),
            serde_json::to_string(&second).expect("serialize")
        );
    }

    #[test]
    fn bed_parts_inherit_the_majority_mattress_size() {
        let result = resolve(
            &[("bed_king_mattress", 1), ("headboard", 1), ("bed frame", 1), ("box spring", 1)],
            &ResolverOptions::default(),
        );

        assert_eq!(
            line_ids(&result),
            vec![
                ("bed_king_mattress", "bed_king_mattress", 1),
                ("headboard", "bed_king_headboard", 1),
                ("bed frame", "bed_king_frame", 1),
                ("box spring", "bed_king_box_spring", 1),
            ]
        );
        assert_eq!(result.lines[0].reason, ResolutionReason::ExactId);
        assert!(result.lines[1..].iter().all(|line| line.reason == ResolutionReason::FamilyBed));
        assert!(result.lines[1..].iter().all(|line| line.confidence == 0.9));

        let inheritance: Vec<&Assumption> = result
            .assumptions
            .iter()
            .filter(|assumption| matches!(assumption, Assumption::SizeInheritance { .. }))
            .collect();
        assert_eq!(
            inheritance,
            vec![&Assumption::SizeInheritance {
                from: "bed_king_mattress".to_string(),
                applied_to: vec![
                    "bed frame".to_string(),
                    "box spring".to_string(),
                    "headboard".to_string()
                ],
            }]
        );
    }

    #[test]
    fn bed_parts_without_mattresses_fall_through_to_fuzzy_matching() {
        let result = resolve(&[("headboard", 1)], &ResolverOptions::default());

        assert_ne!(result.lines[0].reason, ResolutionReason::FamilyBed);
        assert!(!result
            .assumptions
            .iter()
            .any(|assumption| matches!(assumption, Assumption::SizeInheritance { .. })));
    }

    #[test]
    fn ten_boxes_split_by_default_policy() {
        let result = resolve(&[("box", 10)], &ResolverOptions::default());

        assert_eq!(
            line_ids(&result),
            vec![
                ("box (1.5)", "carton_box_small_1_5", 5),
                ("box (3.0)", "carton_box_medium_3_0", 3),
                ("box (4.5)", "carton_box_large_4_5", 1),
                ("box (6.0)", "carton_box_xl_6_0", 1),
            ]
        );
        assert!(result.lines.iter().all(|line| line.reason == ResolutionReason::BoxDistribution));

        let Some(Assumption::BoxDistribution { total_boxes, policy, result: split }) =
            result.assumptions.first()
        else {
            panic!("first assumption should describe the box split");
        };
        assert_eq!(*total_boxes, 10);
        assert_eq!(policy, "50/35/10/5");
        assert_eq!(split.get("1.5"), Some(&5));
    }

    #[test]
    fn box_policy_override_changes_the_split() {
        let options = ResolverOptions {
            box_allocation_policy: "0/0/0/100".to_string(),
            ..ResolverOptions::default()
        };

        let result = resolve(&[("Boxes", 4)], &options);

        assert_eq!(line_ids(&result), vec![("Boxes (6.0)", "carton_box_xl_6_0", 4)]);
    }

    #[test]
    fn misspelling_resolves_by_fuzzy_score() {
        let result = resolve(&[("dreser", 2)], &ResolverOptions::default());

        let line = &result.lines[0];
        assert_eq!(line.matched.item.id, "dresser_standard");
        assert_eq!(line.reason, ResolutionReason::FuzzyMatch);
        assert_eq!(line.quantity, 2);
        assert!((line.confidence - 0.8726).abs() < 1e-4);
        assert!(line.matched.approximate);

        assert_eq!(
            result.assumptions,
            vec![Assumption::BestMatch {
                raw: "dreser".to_string(),
                chosen_id: "dresser_standard".to_string(),
                confidence: 0.8726,
                alternates: Vec::new(),
                resolver: "fuzzy".to_string(),
            }]
        );
    }

    #[test]
    fn strict_floor_forces_category_backstop() {
        let options = ResolverOptions { confidence_floor: 0.99, ..ResolverOptions::default() };

        let result = resolve(&[("dreser", 1)], &options);

        let line = &result.lines[0];
        assert_eq!(line.reason, ResolutionReason::CategoryBackstop);
        assert_eq!(line.confidence, 0.5);
        assert_eq!(line.matched.item.id, "grill_bbq");
        assert_eq!(result.match_summary.low_confidence_count, 1);
        assert_eq!(
            result.assumptions[0],
            Assumption::CategoryBackstop {
                category: "misc".to_string(),
                chosen_id: "grill_bbq".to_string(),
                reason: "no candidate >= floor".to_string(),
            }
        );
        assert!(matches!(
            &result.assumptions[1],
            Assumption::BestMatch { resolver, .. } if resolver == "category_backstop"
        ));
    }

    #[test]
    fn backstop_uses_the_inferred_category() {
        let options = ResolverOptions { confidence_floor: 0.99, ..ResolverOptions::default() };

        let result = resolve(&[("wobbly old stool", 1)], &options);

        assert_eq!(result.lines[0].matched.item.id, "office_chair");
    }

    #[test]
    fn dresser_keywords_pick_the_variant() {
        let result =
            resolve(&[("old highboy", 1), ("oak bureau", 1)], &ResolverOptions::default());

        assert_eq!(
            line_ids(&result),
            vec![("old highboy", "dresser_tall", 1), ("oak bureau", "dresser_standard", 1)]
        );
        assert_eq!(result.lines[0].confidence, 0.85);
        assert_eq!(result.lines[1].confidence, 0.82);
        assert!(result.lines.iter().all(|line| line.reason == ResolutionReason::FamilyDresser));
    }

    #[test]
    fn piano_with_bench_yields_two_lines() {
        let result = resolve(&[("baby grand piano with bench", 1)], &ResolverOptions::default());

        assert_eq!(
            line_ids(&result),
            vec![
                ("baby grand piano with bench", "piano_grand", 1),
                ("baby grand piano with bench (bench)", "bench_piano", 1),
            ]
        );
        assert_eq!(result.lines[0].confidence, 0.9);
        assert_eq!(result.lines[1].confidence, 0.8);
        assert!(matches!(
            &result.assumptions[0],
            Assumption::BestMatch { raw, resolver, .. }
                if raw == "baby grand piano with bench (bench)" && resolver == "family_piano"
        ));
    }

    #[test]
    fn every_line_has_a_best_match_entry() {
        let result = resolve(
            &[("sofa", 1), ("bed_king_mattress", 1), ("old highboy", 1), ("box", 3)],
            &ResolverOptions::default(),
        );

        for line in &result.lines {
            let recorded = result.assumptions.iter().any(|assumption| {
                matches!(
                    assumption,
                    Assumption::BestMatch { raw, chosen_id, .. }
                        if *raw == line.raw && *chosen_id == line.matched.item.id
                )
            });
            assert!(recorded, "missing best_match for {}", line.raw);
        }
        assert_eq!(result.match_summary.resolved_pct, 100);
        assert_eq!(result.match_summary.resolver_policy, "best_match_no_fail");
    }

    #[test]
    fn alias_hits_report_the_alias_text() {
        let result = resolve(&[("Couch", 2)], &ResolverOptions::default());

        let line = &result.lines[0];
        assert_eq!(line.reason, ResolutionReason::AliasExact);
        assert_eq!(line.matched.item.id, "sofa_three_seat");
        assert_eq!(line.matched.alias, "couch");
        assert_eq!(line.confidence, 0.98);
    }

    #[test]
    fn ches_plural_is_not_stripped_and_falls_to_fuzzy() {
        // "couches" singularizes to "couche", which is not a registered alias.
        let result = resolve(&[("Couches", 2)], &ResolverOptions::default());

        let line = &result.lines[0];
        assert_eq!(line.reason, ResolutionReason::FuzzyMatch);
        assert_eq!(line.matched.item.id, "sofa_three_seat");
        assert!((line.confidence - 0.85).abs() < 0.01, "confidence {}", line.confidence);
    }

    #[test]
    fn zero_quantities_and_blank_labels_are_skipped() {
        let result = resolve(&[("sofa", 0), ("---", 3), ("lamp", 1)], &ResolverOptions::default());

        assert_eq!(line_ids(&result), vec![("lamp", "lamp_floor", 1)]);
    }

    #[test]
    fn catalog_without_medoids_is_an_integrity_error() {
        let tally: ItemTally = [("kayak", 1)].into_iter().collect();

        let error = DeterministicInventoryResolver
            .resolve(&tally, &AliasIndex::default(), &ResolverOptions::default())
            .expect_err("empty catalog cannot back-stop");

        assert_eq!(error, DomainError::MissingMedoids);
    }

    #[test]
    fn listing_parser_accumulates_and_validates() {
        let tally = ItemTally::parse_listing("sofa:2, lamp, sofa:1, , box:10").expect("listing");

        assert_eq!(tally.get("sofa"), Some(3));
        assert_eq!(tally.get("lamp"), Some(1));
        assert_eq!(tally.get("box"), Some(10));
        assert_eq!(tally.len(), 3);

        assert_eq!(
            ItemTally::parse_listing("sofa:-1"),
            Err(InputError::InvalidQuantity { label: "sofa".to_string(), value: "-1".to_string() })
        );
    }
}
