//! Access productivity rates, hourly rate cards and the operational constants read
//! from the moving rules document.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Moves shorter than this are billed on local rate cards.
pub const LOCAL_DISTANCE_THRESHOLD_MILES: f64 = 30.0;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("rules document is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rules document has no access rule `{0}`")]
    MissingAccessRule(&'static str),
    #[error("rules document has no `{bucket}` rate card for `{move_type}`")]
    MissingRateCard { move_type: &'static str, bucket: &'static str },
    #[error("rules document value is invalid: {0}")]
    InvalidValue(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccessCode {
    #[serde(rename = "1A")]
    MultiFloor,
    #[serde(rename = "1B")]
    WalkUp,
    #[serde(rename = "1C")]
    GroundFloor,
    #[serde(rename = "1D")]
    Storage,
    #[serde(rename = "1E")]
    Dock,
}

impl AccessCode {
    pub const ALL: [AccessCode; 5] =
        [Self::MultiFloor, Self::WalkUp, Self::GroundFloor, Self::Storage, Self::Dock];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MultiFloor => "1A",
            Self::WalkUp => "1B",
            Self::GroundFloor => "1C",
            Self::Storage => "1D",
            Self::Dock => "1E",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessRule {
    pub code: AccessCode,
    pub lbs_per_mover_hour: f64,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    pub mover_rate_per_hour: f64,
    pub truck_rate_per_hour: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    Local,
    Intrastate,
}

impl MoveType {
    pub fn for_distance(distance_miles: f64) -> Self {
        if distance_miles < LOCAL_DISTANCE_THRESHOLD_MILES {
            Self::Local
        } else {
            Self::Intrastate
        }
    }

    fn document_key(self) -> &'static str {
        match self {
            Self::Local => "localMoves",
            Self::Intrastate => "intrastateMoves",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayBucket {
    MondayToThursday,
    FridayToSaturday,
}

impl DayBucket {
    /// Friday and Saturday use the weekend card; every other day uses the weekday card.
    pub fn for_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Fri | Weekday::Sat => Self::FridayToSaturday,
            _ => Self::MondayToThursday,
        }
    }

    fn document_key(self) -> &'static str {
        match self {
            Self::MondayToThursday => "ratesMondayToThursday",
            Self::FridayToSaturday => "ratesFridayToSaturday",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConstants {
    pub truck_capacity_lbs: f64,
    pub baseline_mover_threshold_lbs: f64,
    pub additional_mover_step_lbs: f64,
    pub min_movers: u32,
    pub max_movers: u32,
    pub max_trucks: u32,
    pub travel_charge_hours: f64,
    pub min_billable_hours: f64,
    pub local_extra_minutes_under_30_miles: f64,
    pub stairs_minutes_per_flight: f64,
    pub long_carry_minutes_per_50ft: f64,
    pub elevator_minutes: f64,
    pub mileage_rate: f64,
    pub base_fee: f64,
    pub nte_buffer_percent: f64,
    pub protective_materials_rate_per_1000_lbs: f64,
}

impl Default for RuleConstants {
    fn default() -> Self {
        Self {
            truck_capacity_lbs: 8000.0,
            baseline_mover_threshold_lbs: 4000.0,
            additional_mover_step_lbs: 2500.0,
            min_movers: 2,
            max_movers: 6,
            max_trucks: 3,
            travel_charge_hours: 1.0,
            min_billable_hours: 3.0,
            local_extra_minutes_under_30_miles: 20.0,
            stairs_minutes_per_flight: 6.0,
            long_carry_minutes_per_50ft: 5.0,
            elevator_minutes: 10.0,
            mileage_rate: 2.25,
            base_fee: 45.0,
            nte_buffer_percent: 0.15,
            protective_materials_rate_per_1000_lbs: 5.0,
        }
    }
}

impl RuleConstants {
    fn validate(&self) -> Result<(), RulesError> {
        let invalid = |message: &str| Err(RulesError::InvalidValue(message.to_string()));
        if self.min_movers == 0 {
            return invalid("min_movers must be at least 1");
        }
        if self.max_movers < self.min_movers {
            return invalid("max_movers must be greater than or equal to min_movers");
        }
        if self.max_trucks == 0 {
            return invalid("max_trucks must be at least 1");
        }
        if !positive(self.truck_capacity_lbs) {
            return invalid("truck_capacity_lbs must be positive");
        }
        if !positive(self.additional_mover_step_lbs) {
            return invalid("additional_mover_step_lbs must be positive");
        }
        let non_negative = [
            ("baseline_mover_threshold_lbs", self.baseline_mover_threshold_lbs),
            ("travel_charge_hours", self.travel_charge_hours),
            ("min_billable_hours", self.min_billable_hours),
            ("local_extra_minutes_under_30_miles", self.local_extra_minutes_under_30_miles),
            ("stairs_minutes_per_flight", self.stairs_minutes_per_flight),
            ("long_carry_minutes_per_50ft", self.long_carry_minutes_per_50ft),
            ("elevator_minutes", self.elevator_minutes),
            ("mileage_rate", self.mileage_rate),
            ("base_fee", self.base_fee),
            ("nte_buffer_percent", self.nte_buffer_percent),
            (
                "protective_materials_rate_per_1000_lbs",
                self.protective_materials_rate_per_1000_lbs,
            ),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RulesError::InvalidValue(format!("{name} must be non-negative")));
            }
        }
        Ok(())
    }
}

/// Where goods are picked up or dropped off.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationDescriptor {
    pub location_type: String,
    pub floor: u32,
    pub elevator: bool,
    pub stairs_flights: u32,
    pub long_carry_feet: u32,
}

impl Default for LocationDescriptor {
    fn default() -> Self {
        Self {
            location_type: "house".to_string(),
            floor: 1,
            elevator: false,
            stairs_flights: 0,
            long_carry_feet: 0,
        }
    }
}

/// One productivity rule per access code.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessTable {
    multi_floor: AccessRule,
    walk_up: AccessRule,
    ground_floor: AccessRule,
    storage: AccessRule,
    dock: AccessRule,
}

impl AccessTable {
    /// Files each rule under its own `code`. Every code must be present; a repeated code keeps
    /// the first rule.
    pub fn from_rules(rules: impl IntoIterator<Item = AccessRule>) -> Result<Self, RulesError> {
        let mut by_code: BTreeMap<AccessCode, AccessRule> = BTreeMap::new();
        for rule in rules {
            by_code.entry(rule.code).or_insert(rule);
        }
        let mut take = |code: AccessCode| {
            by_code.remove(&code).ok_or(RulesError::MissingAccessRule(code.as_str()))
        };

        Ok(Self {
            multi_floor: take(AccessCode::MultiFloor)?,
            walk_up: take(AccessCode::WalkUp)?,
            ground_floor: take(AccessCode::GroundFloor)?,
            storage: take(AccessCode::Storage)?,
            dock: take(AccessCode::Dock)?,
        })
    }

    pub fn get(&self, code: AccessCode) -> &AccessRule {
        match code {
            AccessCode::MultiFloor => &self.multi_floor,
            AccessCode::WalkUp => &self.walk_up,
            AccessCode::GroundFloor => &self.ground_floor,
            AccessCode::Storage => &self.storage,
            AccessCode::Dock => &self.dock,
        }
    }
}

/// Hourly rate cards keyed by move type and day bucket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateCards {
    pub local_weekday: RateCard,
    pub local_weekend: RateCard,
    pub intrastate_weekday: RateCard,
    pub intrastate_weekend: RateCard,
}

impl RateCards {
    pub fn get(&self, move_type: MoveType, bucket: DayBucket) -> &RateCard {
        match (move_type, bucket) {
            (MoveType::Local, DayBucket::MondayToThursday) => &self.local_weekday,
            (MoveType::Local, DayBucket::FridayToSaturday) => &self.local_weekend,
            (MoveType::Intrastate, DayBucket::MondayToThursday) => &self.intrastate_weekday,
            (MoveType::Intrastate, DayBucket::FridayToSaturday) => &self.intrastate_weekend,
        }
    }
}

/// Validated rules: every access code and every rate card is present.
#[derive(Clone, Debug, PartialEq)]
pub struct MovingRules {
    access: AccessTable,
    rate_cards: RateCards,
    pub constants: RuleConstants,
}

impl MovingRules {
    pub fn new(
        access: AccessTable,
        rate_cards: RateCards,
        constants: RuleConstants,
    ) -> Result<Self, RulesError> {
        constants.validate()?;
        Ok(Self { access, rate_cards, constants })
    }

    pub fn from_json(raw: &str) -> Result<Self, RulesError> {
        let document: RulesDocument = serde_json::from_str(raw)?;
        let context = document.moving_quoter_context;

        let mut by_code: BTreeMap<String, &SubruleDocument> = BTreeMap::new();
        for group in &context.rules {
            for subrule in &group.subrules {
                by_code.entry(subrule.subrule.trim().to_ascii_uppercase()).or_insert(subrule);
            }
        }

        let mut access_rules = Vec::with_capacity(AccessCode::ALL.len());
        for code in AccessCode::ALL {
            let subrule =
                by_code.get(code.as_str()).ok_or(RulesError::MissingAccessRule(code.as_str()))?;
            if !positive(subrule.rate_of_movement) {
                return Err(RulesError::InvalidValue(format!(
                    "access rule {} must have a positive rateOfMovement",
                    code.as_str()
                )));
            }
            access_rules.push(AccessRule {
                code,
                lbs_per_mover_hour: subrule.rate_of_movement,
                description: subrule.condition.clone(),
            });
        }

        let card = |move_type: MoveType, bucket: DayBucket| {
            read_rate_card(&context.pricing, move_type, bucket)
        };
        let rate_cards = RateCards {
            local_weekday: card(MoveType::Local, DayBucket::MondayToThursday)?,
            local_weekend: card(MoveType::Local, DayBucket::FridayToSaturday)?,
            intrastate_weekday: card(MoveType::Intrastate, DayBucket::MondayToThursday)?,
            intrastate_weekend: card(MoveType::Intrastate, DayBucket::FridayToSaturday)?,
        };

        Self::new(AccessTable::from_rules(access_rules)?, rate_cards, context.constants)
    }

    pub fn access_rule(&self, code: AccessCode) -> &AccessRule {
        self.access.get(code)
    }

    pub fn access_for_location(&self, location: &LocationDescriptor) -> &AccessRule {
        self.access_rule(access_code_for(location))
    }

    pub fn rate_card(&self, move_type: MoveType, bucket: DayBucket) -> &RateCard {
        self.rate_cards.get(move_type, bucket)
    }

    pub fn rate_card_for(&self, move_date: NaiveDate, is_local: bool) -> &RateCard {
        let move_type = if is_local { MoveType::Local } else { MoveType::Intrastate };
        self.rate_card(move_type, DayBucket::for_date(move_date))
    }
}

fn read_rate_card(
    pricing: &BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    move_type: MoveType,
    bucket: DayBucket,
) -> Result<RateCard, RulesError> {
    let value = pricing
        .get(move_type.document_key())
        .and_then(|group| group.get(bucket.document_key()))
        .ok_or(RulesError::MissingRateCard {
            move_type: move_type.document_key(),
            bucket: bucket.document_key(),
        })?;
    let card: RateCardDocument = serde_json::from_value(value.clone())?;
    if !(positive(card.mover_rate_per_hour) && positive(card.truck_rate_per_hour)) {
        return Err(RulesError::InvalidValue(format!(
            "{}.{} rates must be positive",
            move_type.document_key(),
            bucket.document_key()
        )));
    }
    Ok(RateCard {
        mover_rate_per_hour: card.mover_rate_per_hour,
        truck_rate_per_hour: card.truck_rate_per_hour,
    })
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub fn access_code_for(location: &LocationDescriptor) -> AccessCode {
    let floor = location.floor.max(1);
    match location.location_type.trim().to_ascii_lowercase().as_str() {
        "dock" => AccessCode::Dock,
        "storage" => AccessCode::Storage,
        "house" | "townhouse" if location.stairs_flights > 0 => AccessCode::MultiFloor,
        "house" | "townhouse" => AccessCode::GroundFloor,
        "apartment" | "condo" if floor > 1 && !location.elevator => AccessCode::WalkUp,
        "apartment" | "condo" if floor > 1 => AccessCode::MultiFloor,
        _ => AccessCode::GroundFloor,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RulesDocument {
    moving_quoter_context: QuoterContextDocument,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoterContextDocument {
    #[serde(default)]
    rules: Vec<RuleGroupDocument>,
    #[serde(default)]
    pricing: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    constants: RuleConstants,
}

#[derive(Debug, Deserialize)]
struct RuleGroupDocument {
    #[serde(default)]
    subrules: Vec<SubruleDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubruleDocument {
    subrule: String,
    rate_of_movement: f64,
    #[serde(default)]
    condition: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateCardDocument {
    mover_rate_per_hour: f64,
    truck_rate_per_hour: f64,
}
