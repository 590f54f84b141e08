//! Per-request estimate input.
//!
//! Callers send items in several shapes: a `{label: qty}` object, an array of strings, an array
//! of `{item|name, quantity}` objects, or a `"sofa:2, lamp"` string. All of them collapse into an
//! [`ItemTally`] before anything is resolved.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::InputError;
use crate::pricing::optimizer::{OptimizeFor, QuoteOptions};
use crate::pricing::packing::{normalize_carton_key, PackingRequest, PackingTier};
use crate::pricing::quick::LocationProfile;
use crate::pricing::rules::LocationDescriptor;
use crate::resolver::boxes::validate_box_policy;
use crate::resolver::{ItemTally, ResolverOptions};

const NAME_KEYS: [&str; 2] = ["item", "name"];
const QUANTITY_KEYS: [&str; 3] = ["quantity", "Qty", "qty"];

#[derive(Clone, Debug, PartialEq)]
pub struct EstimateRequest {
    pub items: ItemTally,
    pub distance_miles: f64,
    pub move_date: NaiveDate,
    pub origin: LocationDescriptor,
    pub destination: LocationDescriptor,
    pub packing: PackingRequest,
    pub options: RequestOptions,
    pub idempotency_key: Option<String>,
}

/// Quote options plus optional per-request resolver overrides.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    pub quote: QuoteOptions,
    pub resolver_policy: Option<String>,
    pub box_allocation_policy: Option<String>,
    pub confidence_floor: Option<f64>,
    pub assumptions_public: Option<bool>,
}

impl RequestOptions {
    /// Applies the overrides on top of the configured resolver defaults.
    pub fn resolver_options(
        &self,
        defaults: &ResolverOptions,
    ) -> Result<ResolverOptions, InputError> {
        let mut options = defaults.clone();
        if let Some(policy) = non_blank(self.resolver_policy.as_deref()) {
            options.resolver_policy = policy.to_string();
        }
        if let Some(policy) = non_blank(self.box_allocation_policy.as_deref()) {
            validate_box_policy(policy)?;
            options.box_allocation_policy = policy.to_string();
        }
        if let Some(floor) = self.confidence_floor {
            if !(0.0..=1.0).contains(&floor) {
                return Err(InputError::InvalidConfidenceFloor(floor.to_string()));
            }
            options.confidence_floor = floor;
        }
        if let Some(public) = self.assumptions_public {
            options.assumptions_public = public;
        }
        Ok(options)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(default)]
    items: Value,
    #[serde(rename = "Qty", default)]
    qty_multiplier: Value,
    distance_miles: f64,
    move_date: String,
    #[serde(default)]
    origin: LocationDescriptor,
    #[serde(default)]
    destination: LocationDescriptor,
    #[serde(default)]
    packing: RawPacking,
    #[serde(default)]
    options: RawOptions,
    #[serde(default)]
    idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPacking {
    service: String,
    cartons: Map<String, Value>,
}

impl Default for RawPacking {
    fn default() -> Self {
        Self { service: "none".to_string(), cartons: Map::new() }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOptions {
    optimize_for: OptimizeFor,
    not_to_exceed: bool,
    seasonality: Option<String>,
    resolver_policy: Option<String>,
    box_allocation_policy: Option<String>,
    confidence_floor: Option<f64>,
    assumptions_public: Option<bool>,
}

impl EstimateRequest {
    pub fn from_json(raw: &str) -> Result<Self, InputError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|error| InputError::MalformedBody(error.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, InputError> {
        if !value.is_object() {
            return Err(InputError::MalformedBody("body must be a JSON object".to_string()));
        }
        let raw: RawRequest = serde_json::from_value(value)
            .map_err(|error| InputError::MalformedBody(error.to_string()))?;

        let mut items = parse_items(&raw.items)?;
        if let Some(multiplier) = raw.qty_multiplier.as_u64().filter(|factor| *factor > 1) {
            items.scale(u32::try_from(multiplier).unwrap_or(u32::MAX));
        }
        if items.is_empty() {
            return Err(InputError::NoItems);
        }

        if !(raw.distance_miles.is_finite() && raw.distance_miles >= 0.0) {
            return Err(InputError::InvalidDistance(raw.distance_miles.to_string()));
        }
        let move_date = parse_move_date(&raw.move_date)?;

        let mut cartons = BTreeMap::new();
        for (key, quantity) in &raw.packing.cartons {
            let Some(code) = normalize_carton_key(key) else {
                continue;
            };
            cartons.insert(code.to_string(), parse_quantity(key, quantity)?);
        }

        let quote = QuoteOptions {
            optimize_for: raw.options.optimize_for,
            not_to_exceed: raw.options.not_to_exceed,
            seasonality: raw.options.seasonality.unwrap_or_else(|| "auto".to_string()),
        };

        Ok(Self {
            items,
            distance_miles: raw.distance_miles,
            move_date,
            origin: raw.origin,
            destination: raw.destination,
            packing: PackingRequest { tier: PackingTier::parse(&raw.packing.service), cartons },
            options: RequestOptions {
                quote,
                resolver_policy: raw.options.resolver_policy,
                box_allocation_policy: raw.options.box_allocation_policy,
                confidence_floor: raw.options.confidence_floor,
                assumptions_public: raw.options.assumptions_public,
            },
            idempotency_key: raw.idempotency_key,
        })
    }
}

/// Body of a weight-only quick quote. Items take the same shapes as a full estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct QuickQuoteRequest {
    pub items: ItemTally,
    pub distance_miles: f64,
    pub move_date: NaiveDate,
    pub location_profile: LocationProfile,
}

#[derive(Debug, Deserialize)]
struct RawQuickQuoteRequest {
    #[serde(default)]
    items: Value,
    distance_miles: f64,
    move_date: String,
    #[serde(default)]
    location_profile: LocationProfile,
}

impl QuickQuoteRequest {
    pub fn from_json(raw: &str) -> Result<Self, InputError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|error| InputError::MalformedBody(error.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, InputError> {
        if !value.is_object() {
            return Err(InputError::MalformedBody("body must be a JSON object".to_string()));
        }
        let raw: RawQuickQuoteRequest = serde_json::from_value(value)
            .map_err(|error| InputError::MalformedBody(error.to_string()))?;

        let items = parse_items(&raw.items)?;
        if items.is_empty() {
            return Err(InputError::NoItems);
        }
        if !(raw.distance_miles.is_finite() && raw.distance_miles >= 0.0) {
            return Err(InputError::InvalidDistance(raw.distance_miles.to_string()));
        }

        Ok(Self {
            items,
            distance_miles: raw.distance_miles,
            move_date: parse_move_date(&raw.move_date)?,
            location_profile: raw.location_profile,
        })
    }
}

/// Accepts `YYYY-MM-DD` or `YYYY/MM/DD`.
pub fn parse_move_date(raw: &str) -> Result<NaiveDate, InputError> {
    let candidate = raw.trim().replace('/', "-");
    NaiveDate::parse_from_str(&candidate, "%Y-%m-%d")
        .map_err(|_| InputError::InvalidMoveDate(raw.to_string()))
}

pub fn parse_items(items: &Value) -> Result<ItemTally, InputError> {
    match items {
        Value::Null => Ok(ItemTally::new()),
        Value::String(listing) => ItemTally::parse_listing(listing),
        Value::Object(entries) => {
            let mut tally = ItemTally::new();
            for (label, quantity) in entries {
                tally.add(label.as_str(), parse_quantity(label, quantity)?);
            }
            Ok(tally)
        }
        Value::Array(elements) => {
            let mut tally = ItemTally::new();
            for (index, element) in elements.iter().enumerate() {
                match element {
                    Value::String(label) => tally.add(label.as_str(), 1),
                    Value::Object(fields) => {
                        let label = NAME_KEYS
                            .iter()
                            .find_map(|key| fields.get(*key).and_then(Value::as_str))
                            .map(str::trim)
                            .filter(|label| !label.is_empty())
                            .ok_or(InputError::MalformedItem { index })?;
                        let quantity = QUANTITY_KEYS
                            .iter()
                            .find_map(|key| fields.get(*key).filter(|value| !value.is_null()))
                            .map(|value| parse_quantity(label, value))
                            .transpose()?
                            .unwrap_or(1);
                        tally.add(label, quantity);
                    }
                    _ => return Err(InputError::MalformedItem { index }),
                }
            }
            Ok(tally)
        }
        _ => Err(InputError::UnsupportedItemsShape),
    }
}

/// Non-negative integers, given as JSON numbers (`2`, `2.0`) or numeric strings (`"2"`).
fn parse_quantity(label: &str, value: &Value) -> Result<u32, InputError> {
    let invalid = || InputError::InvalidQuantity {
        label: label.to_string(),
        value: match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    };

    let parsed = match value {
        Value::Number(number) => match number.as_u64() {
            Some(whole) => Some(whole),
            None => number
                .as_f64()
                .filter(|float| float.is_finite() && *float >= 0.0 && float.fract() == 0.0)
                .map(|float| float as u64),
        },
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.and_then(|whole| u32::try_from(whole).ok()).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::{parse_items, parse_move_date, EstimateRequest, QuickQuoteRequest, RequestOptions};
    use crate::errors::InputError;
    use crate::pricing::packing::PackingTier;
    use crate::pricing::quick::LocationProfile;
    use crate::resolver::ResolverOptions;

    fn request(value: serde_json::Value) -> Result<EstimateRequest, InputError> {
        EstimateRequest::from_value(value)
    }

    fn base(items: serde_json::Value) -> serde_json::Value {
        json!({ "items": items, "distance_miles": 12.5, "move_date": "2025-11-06" })
    }

    fn pairs(request: &EstimateRequest) -> Vec<(String, u32)> {
        request.items.iter().map(|(label, qty)| (label.to_string(), qty)).collect()
    }

    #[test]
    fn object_items_keep_their_order() {
        let parsed = request(base(json!({ "sofa": 2, "lamp": 1, "box": "10" }))).expect("request");

        assert_eq!(
            pairs(&parsed),
            vec![("sofa".to_string(), 2), ("lamp".to_string(), 1), ("box".to_string(), 10)]
        );
    }

    #[test]
    fn string_arrays_count_each_occurrence() {
        let parsed = request(base(json!(["chair", "sofa", "chair"]))).expect("request");

        assert_eq!(pairs(&parsed), vec![("chair".to_string(), 2), ("sofa".to_string(), 1)]);
    }

    #[test]
    fn object_arrays_accept_item_or_name_keys() {
        let parsed = request(base(json!([
            { "item": "sofa", "quantity": 2 },
            { "name": "lamp" },
            { "name": "sofa", "Qty": 1 },
            "rug"
        ])))
        .expect("request");

        assert_eq!(
            pairs(&parsed),
            vec![("sofa".to_string(), 3), ("lamp".to_string(), 1), ("rug".to_string(), 1)]
        );
    }

    #[test]
    fn listing_strings_are_parsed() {
        let parsed = request(base(json!("sofa:2, lamp, box:10"))).expect("request");

        assert_eq!(parsed.items.get("box"), Some(10));
        assert_eq!(parsed.items.get("lamp"), Some(1));
    }

    #[test]
    fn top_level_multiplier_scales_every_count() {
        let mut body = base(json!({ "sofa": 1, "chair": 2 }));
        body["Qty"] = json!(3);

        let parsed = request(body).expect("request");

        assert_eq!(parsed.items.get("sofa"), Some(3));
        assert_eq!(parsed.items.get("chair"), Some(6));
    }

    #[test]
    fn bad_quantities_are_rejected() {
        assert_eq!(
            parse_items(&json!({ "sofa": -1 })),
            Err(InputError::InvalidQuantity { label: "sofa".to_string(), value: "-1".to_string() })
        );
        assert_eq!(
            parse_items(&json!({ "sofa": 1.5 })),
            Err(InputError::InvalidQuantity { label: "sofa".to_string(), value: "1.5".to_string() })
        );
        assert_eq!(
            parse_items(&json!([{ "item": "lamp", "quantity": "two" }])),
            Err(InputError::InvalidQuantity { label: "lamp".to_string(), value: "two".to_string() })
        );
        assert_eq!(parse_items(&json!({ "sofa": 2.0 })).map(|t| t.get("sofa")), Ok(Some(2)));
    }

    #[test]
    fn malformed_elements_and_shapes_are_rejected() {
        assert_eq!(parse_items(&json!(["sofa", 7])), Err(InputError::MalformedItem { index: 1 }));
        assert_eq!(
            parse_items(&json!([{ "quantity": 2 }])),
            Err(InputError::MalformedItem { index: 0 })
        );
        assert_eq!(parse_items(&json!(42)), Err(InputError::UnsupportedItemsShape));
    }

    #[test]
    fn empty_tallies_are_rejected() {
        assert_eq!(request(base(json!({}))), Err(InputError::NoItems));
        assert_eq!(request(base(json!({ "sofa": 0 }))), Err(InputError::NoItems));
        assert_eq!(
            request(json!({ "distance_miles": 1.0, "move_date": "2025-11-06" })),
            Err(InputError::NoItems)
        );
    }

    #[test]
    fn dates_accept_slashes() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 7).expect("date");

        assert_eq!(parse_move_date("2025/11/07"), Ok(expected));
        assert_eq!(parse_move_date(" 2025-11-07 "), Ok(expected));
        assert_eq!(
            parse_move_date("11/07/2025"),
            Err(InputError::InvalidMoveDate("11/07/2025".to_string()))
        );
    }

    #[test]
    fn negative_distance_is_rejected() {
        let mut body = base(json!(["sofa"]));
        body["distance_miles"] = json!(-3.0);

        assert_eq!(request(body), Err(InputError::InvalidDistance("-3".to_string())));
    }

    #[test]
    fn non_object_bodies_are_malformed() {
        assert!(matches!(request(json!(["sofa"])), Err(InputError::MalformedBody(_))));
        assert!(matches!(
            EstimateRequest::from_json("{\"items\": "),
            Err(InputError::MalformedBody(_))
        ));
    }

    #[test]
    fn defaults_fill_locations_packing_and_options() {
        let parsed = request(base(json!(["sofa"]))).expect("request");

        assert_eq!(parsed.origin.location_type, "house");
        assert_eq!(parsed.destination.floor, 1);
        assert_eq!(parsed.packing.tier, PackingTier::None);
        assert!(parsed.packing.cartons.is_empty());
        assert!(!parsed.options.quote.not_to_exceed);
        assert_eq!(parsed.options.quote.seasonality, "auto");
    }

    #[test]
    fn carton_keys_are_normalized() {
        let mut body = base(json!(["sofa"]));
        body["packing"] = json!({
            "service": "CP",
            "cartons": { "Small Box": 4, "wardrobe": 2, "crate": 9, "flat screen": 1 }
        });

        let parsed = request(body).expect("request");

        assert_eq!(parsed.packing.tier, PackingTier::FullService);
        assert_eq!(parsed.packing.cartons.get("1.5"), Some(&4));
        assert_eq!(parsed.packing.cartons.get("wardrobe"), Some(&2));
        assert_eq!(parsed.packing.cartons.get("tv"), Some(&1));
        assert_eq!(parsed.packing.cartons.len(), 3);
    }

    #[test]
    fn resolver_overrides_are_validated() {
        let defaults = ResolverOptions::default();

        let options = RequestOptions {
            confidence_floor: Some(0.8),
            box_allocation_policy: Some("25/25/25/25".to_string()),
            assumptions_public: Some(false),
            ..RequestOptions::default()
        };
        let merged = options.resolver_options(&defaults).expect("valid overrides");
        assert_eq!(merged.confidence_floor, 0.8);
        assert_eq!(merged.box_allocation_policy, "25/25/25/25");
        assert!(!merged.assumptions_public);
        assert_eq!(merged.resolver_policy, defaults.resolver_policy);

        let floor = RequestOptions { confidence_floor: Some(1.5), ..RequestOptions::default() };
        assert_eq!(
            floor.resolver_options(&defaults),
            Err(InputError::InvalidConfidenceFloor("1.5".to_string()))
        );

        let policy = RequestOptions {
            box_allocation_policy: Some("50/50".to_string()),
            ..RequestOptions::default()
        };
        assert!(matches!(policy.resolver_options(&defaults), Err(InputError::InvalidBoxPolicy(_))));
    }

    #[test]
    fn quick_quote_requests_default_to_the_multi_floor_profile() {
        let parsed = QuickQuoteRequest::from_value(base(json!({ "couch": 2, "lamp": 0 })))
            .expect("quick request");

        assert_eq!(parsed.location_profile, LocationProfile::MultiFloor);
        assert_eq!(parsed.items.get("couch"), Some(2));
        assert_eq!(parsed.items.get("lamp"), Some(0));

        let mut body = base(json!(["sofa"]));
        body["location_profile"] = json!("easy");
        let easy = QuickQuoteRequest::from_value(body).expect("quick request");
        assert_eq!(easy.location_profile, LocationProfile::Easy);
    }

    #[test]
    fn quick_quote_requests_share_estimate_validation() {
        assert_eq!(
            QuickQuoteRequest::from_value(base(json!({ "sofa": 0 }))),
            Err(InputError::NoItems)
        );

        let mut body = base(json!(["sofa"]));
        body["distance_miles"] = json!(-1.0);
        assert_eq!(
            QuickQuoteRequest::from_value(body),
            Err(InputError::InvalidDistance("-1".to_string()))
        );

        let mut body = base(json!(["sofa"]));
        body["location_profile"] = json!("penthouse");
        assert!(matches!(QuickQuoteRequest::from_value(body), Err(InputError::MalformedBody(_))));
    }
}
