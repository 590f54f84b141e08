//! Carton prices and packing labor.
//!
//! The packing catalog merges two sources. The optional tab-separated rate table is read first,
//! then `boxAndPackingCosts.purchase` entries from the rules document replace rows with the same
//! carton code, and `boxAndPackingCosts.rental` entries only fill codes nobody else priced.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pricing::rules::RulesError;

/// Canonical carton codes accepted in a packing request.
pub const CARTON_CODES: [&str; 7] = ["1.5", "3.0", "4.5", "6.0", "wardrobe", "tv", "mirror"];

const CARTON_SYNONYMS: &[(&str, &str)] = &[
    ("small box", "1.5"),
    ("medium box", "3.0"),
    ("large box", "4.5"),
    ("xl box", "6.0"),
    ("extra large box", "6.0"),
    ("wardrobe box", "wardrobe"),
    ("tv box", "tv"),
    ("flat screen", "tv"),
    ("mirror box", "mirror"),
];

/// Substrings that identify a carton code inside a free-form box description, checked in order.
const CODE_MARKERS: &[(&str, &str)] = &[
    ("1.5", "1.5"),
    ("3.0", "3.0"),
    ("4.5", "4.5"),
    ("6.0", "6.0"),
    ("wardrobe", "wardrobe"),
    ("flat screen tv", "tv"),
    ("tv", "tv"),
    ("mirror", "mirror"),
];

/// Maps a request carton key onto its canonical code.
pub fn normalize_carton_key(raw: &str) -> Option<&'static str> {
    let key = raw.trim().to_lowercase();
    CARTON_CODES.iter().copied().find(|code| *code == key).or_else(|| {
        CARTON_SYNONYMS.iter().find(|(synonym, _)| *synonym == key).map(|(_, code)| *code)
    })
}

/// Carton code for a box description such as `"1.5 cu ft box rental"`.
pub fn derive_code(label: &str) -> Option<String> {
    let lowered = label.to_lowercase();
    if let Some((_, code)) = CODE_MARKERS.iter().find(|(marker, _)| lowered.contains(marker)) {
        return Some((*code).to_string());
    }
    numeric_literals(&lowered).into_iter().next().map(|(literal, _)| literal)
}

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("numeric pattern is valid"))
}

/// Every `digits[.digits]` run in `text`, with its parsed value.
fn numeric_literals(text: &str) -> Vec<(String, f64)> {
    numeric_pattern()
        .find_iter(text)
        .filter_map(|found| {
            let literal = found.as_str();
            literal.parse::<f64>().ok().map(|value| (literal.to_string(), value))
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackingSku {
    pub code: String,
    pub name: String,
    pub box_rate: f64,
    pub labor_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackingCatalog {
    skus: BTreeMap<String, PackingSku>,
}

impl PackingCatalog {
    pub fn from_sources(table: Option<&str>, rules_json: &str) -> Result<Self, RulesError> {
        let mut catalog = Self::default();
        if let Some(table) = table {
            for sku in parse_rate_table(table) {
                catalog.skus.insert(sku.code.clone(), sku);
            }
        }

        let document: PackingDocument = serde_json::from_str(rules_json)?;
        let costs = document.moving_quoter_context.box_and_packing_costs;
        for entry in costs.purchase {
            let Some(code) = derive_code(&entry.box_type) else {
                continue;
            };
            catalog.skus.insert(
                code.clone(),
                PackingSku {
                    code,
                    name: entry.box_type,
                    box_rate: entry.box_rate,
                    labor_rate: entry.labor_rate,
                },
            );
        }
        for entry in costs.rental {
            let Some(code) = derive_code(&entry.box_type) else {
                continue;
            };
            catalog.skus.entry(code.clone()).or_insert(PackingSku {
                code,
                name: entry.box_type,
                box_rate: entry.rental_rate,
                labor_rate: entry.labor_rate,
            });
        }

        for sku in catalog.skus.values() {
            if !(sku.box_rate.is_finite() && sku.box_rate >= 0.0)
                || !(sku.labor_rate.is_finite() && sku.labor_rate >= 0.0)
            {
                return Err(RulesError::InvalidValue(format!(
                    "packing rates for `{}` must be non-negative",
                    sku.code
                )));
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, code: &str) -> Option<&PackingSku> {
        self.skus.get(code)
    }

    pub fn skus(&self) -> impl Iterator<Item = &PackingSku> {
        self.skus.values()
    }

    pub fn len(&self) -> usize {
        self.skus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skus.is_empty()
    }
}

/// Rows need at least three numbers; the last two are the box and labor rates. The header line
/// and placeholder rows containing `...` are skipped.
fn parse_rate_table(raw: &str) -> Vec<PackingSku> {
    raw.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty() && !line.contains("..."))
        .filter_map(|line| {
            let numbers = numeric_literals(line);
            if numbers.len() < 3 {
                return None;
            }
            let name = line.split('\t').next().unwrap_or(line).trim().to_string();
            let code = derive_code(&name)?;
            Some(PackingSku {
                code,
                name,
                box_rate: numbers[numbers.len() - 2].1,
                labor_rate: numbers[numbers.len() - 1].1,
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackingDocument {
    moving_quoter_context: PackingContextDocument,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackingContextDocument {
    #[serde(default)]
    box_and_packing_costs: BoxCostsDocument,
}

#[derive(Debug, Default, Deserialize)]
struct BoxCostsDocument {
    #[serde(default)]
    purchase: Vec<PurchaseEntry>,
    #[serde(default)]
    rental: Vec<RentalEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseEntry {
    box_type: String,
    #[serde(default)]
    box_rate: f64,
    #[serde(default)]
    labor_rate: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentalEntry {
    box_type: String,
    #[serde(default)]
    rental_rate: f64,
    #[serde(default)]
    labor_rate: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackingTier {
    #[default]
    None,
    MaterialsOnly,
    FullService,
}

impl PackingTier {
    /// `none` (or blank) skips packing, `cp` is full service, anything else buys cartons only.
    pub fn parse(service: &str) -> Self {
        match service.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Self::None,
            "cp" | "full" | "full_service" => Self::FullService,
            _ => Self::MaterialsOnly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::MaterialsOnly => "materials_only",
            Self::FullService => "full_service",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PackingRequest {
    pub tier: PackingTier,
    pub cartons: BTreeMap<String, u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PackingCost {
    pub cost: f64,
    pub hours: f64,
}

/// Full service charges boxes and labor and turns the labor into crew hours at `mover_rate`.
pub fn compute_packing(
    request: &PackingRequest,
    catalog: &PackingCatalog,
    mover_rate: f64,
) -> PackingCost {
    if request.tier == PackingTier::None {
        return PackingCost::default();
    }

    let mut box_cost = 0.0;
    let mut labor_cost = 0.0;
    for (code, quantity) in &request.cartons {
        if *quantity == 0 {
            continue;
        }
        let Some(sku) = catalog.get(code) else {
            continue;
        };
        let quantity = f64::from(*quantity);
        box_cost += sku.box_rate * quantity;
        labor_cost += sku.labor_rate * quantity;
    }

    match request.tier {
        PackingTier::FullService => {
            let hours = if mover_rate > 0.0 { labor_cost / mover_rate } else { 0.0 };
            PackingCost { cost: box_cost + labor_cost, hours }
        }
        _ => PackingCost { cost: box_cost, hours: 0.0 },
    }
}
