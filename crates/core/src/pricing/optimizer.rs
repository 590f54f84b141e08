use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::CatalogItem;
use crate::errors::DomainError;
use crate::pricing::packing::{compute_packing, PackingCatalog, PackingRequest};
use crate::pricing::rules::{
    AccessRule, LocationDescriptor, MovingRules, RuleConstants, LOCAL_DISTANCE_THRESHOLD_MILES,
};

pub const PROTECTIVE_MATERIALS: &str = "protective_materials";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemAllocation {
    pub item: CatalogItem,
    pub quantity: u32,
}

impl ItemAllocation {
    pub fn total_weight(&self) -> f64 {
        self.item.weight_lbs * f64::from(self.quantity)
    }

    pub fn total_volume(&self) -> f64 {
        self.item.volume_cuft * f64::from(self.quantity)
    }
}

/// A pickup or drop-off site together with the access rule it was classified under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationContext {
    pub descriptor: LocationDescriptor,
    pub access_rule: AccessRule,
}

impl LocationContext {
    pub fn classify(descriptor: LocationDescriptor, rules: &MovingRules) -> Self {
        let access_rule = rules.access_for_location(&descriptor).clone();
        Self { descriptor, access_rule }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeFor {
    #[default]
    LowestPrice,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteOptions {
    pub optimize_for: OptimizeFor,
    pub not_to_exceed: bool,
    pub seasonality: String,
}

impl Default for QuoteOptions {
    fn default() -> Self {
        Self {
            optimize_for: OptimizeFor::LowestPrice,
            not_to_exceed: false,
            seasonality: "auto".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuoteContext<'a> {
    pub move_date: NaiveDate,
    pub distance_miles: f64,
    pub origin: LocationContext,
    pub destination: LocationContext,
    pub allocations: Vec<ItemAllocation>,
    pub rules: &'a MovingRules,
    pub packing_catalog: &'a PackingCatalog,
    pub packing_request: PackingRequest,
    pub options: QuoteOptions,
}

impl QuoteContext<'_> {
    pub fn total_weight(&self) -> f64 {
        self.allocations.iter().map(ItemAllocation::total_weight).sum()
    }

    pub fn total_volume(&self) -> f64 {
        self.allocations.iter().map(ItemAllocation::total_volume).sum()
    }

    pub fn is_local(&self) -> bool {
        self.distance_miles < LOCAL_DISTANCE_THRESHOLD_MILES
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteTraceStep {
    pub stage: String,
    pub detail: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub movers: u32,
    pub trucks: u32,
    pub billable_hours: f64,
    pub labor_cost: f64,
    pub mileage_cost: f64,
    pub packing_cost: f64,
    pub travel_hours: f64,
    pub work_hours: f64,
    pub packing_hours: f64,
    pub base_fee: f64,
    pub surcharges: Vec<Adjustment>,
    pub discounts: Vec<Adjustment>,
    pub total_price: f64,
    pub trace: Vec<QuoteTraceStep>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewBounds {
    pub min_movers: u32,
    pub max_movers: u32,
    pub min_trucks: u32,
    pub max_trucks: u32,
}

impl CrewBounds {
    pub fn for_weight(total_weight: f64, constants: &RuleConstants) -> Self {
        let min_trucks = minimum_trucks(total_weight, constants);
        Self {
            min_movers: minimum_movers(total_weight, constants),
            max_movers: constants.max_movers,
            min_trucks,
            max_trucks: constants.max_trucks.max(min_trucks),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_movers > self.max_movers || self.min_trucks > self.max_trucks
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizedQuote {
    pub quote: QuoteResult,
    pub candidates_evaluated: usize,
    pub bounds: CrewBounds,
}

/// One extra mover per started step above the baseline weight, never more than the crew cap.
pub fn minimum_movers(total_weight: f64, constants: &RuleConstants) -> u32 {
    let mut movers = constants.min_movers;
    if total_weight > constants.baseline_mover_threshold_lbs {
        let extra = total_weight - constants.baseline_mover_threshold_lbs;
        let steps = (extra / constants.additional_mover_step_lbs).ceil();
        movers = movers.saturating_add(steps as u32);
    }
    movers.max(constants.min_movers).min(constants.max_movers)
}

pub fn minimum_trucks(total_weight: f64, constants: &RuleConstants) -> u32 {
    let needed = (total_weight.max(0.0) / constants.truck_capacity_lbs).ceil() as u32;
    needed.max(1)
}

/// Load and unload legs, each at its site's pounds per mover-hour.
pub fn productivity_hours(
    total_weight: f64,
    movers: u32,
    origin: &AccessRule,
    destination: &AccessRule,
) -> f64 {
    if movers == 0 {
        return 0.0;
    }
    let crew = f64::from(movers);
    total_weight / (crew * origin.lbs_per_mover_hour)
        + total_weight / (crew * destination.lbs_per_mover_hour)
}

pub fn travel_hours(distance_miles: f64, constants: &RuleConstants) -> f64 {
    if distance_miles < LOCAL_DISTANCE_THRESHOLD_MILES {
        constants.travel_charge_hours + constants.local_extra_minutes_under_30_miles / 60.0
    } else {
        constants.travel_charge_hours + (distance_miles / 30.0).max(0.5)
    }
}

/// Stairs, long carries (per started 50 ft) and elevator waits at one site.
pub fn site_adjustment_minutes(location: &LocationDescriptor, constants: &RuleConstants) -> f64 {
    let mut minutes = f64::from(location.stairs_flights) * constants.stairs_minutes_per_flight;
    if location.long_carry_feet > 0 && constants.long_carry_minutes_per_50ft != 0.0 {
        let blocks = (f64::from(location.long_carry_feet) / 50.0).ceil();
        minutes += blocks * constants.long_carry_minutes_per_50ft;
    }
    if location.elevator {
        minutes += constants.elevator_minutes;
    }
    minutes
}

pub fn protective_materials_charge(total_weight: f64, constants: &RuleConstants) -> f64 {
    if total_weight <= 0.0 {
        return 0.0;
    }
    let units = (total_weight / 1000.0).ceil();
    round2(units * constants.protective_materials_rate_per_1000_lbs)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn step(stage: &str, detail: &str, value: f64) -> QuoteTraceStep {
    QuoteTraceStep { stage: stage.to_string(), detail: detail.to_string(), value }
}

pub fn evaluate_candidate(movers: u32, trucks: u32, context: &QuoteContext<'_>) -> QuoteResult {
    let constants = &context.rules.constants;
    let total_weight = context.total_weight();

    let work_hours = productivity_hours(
        total_weight,
        movers,
        &context.origin.access_rule,
        &context.destination.access_rule,
    );
    let travel_hours = travel_hours(context.distance_miles, constants);
    let rate_card = context.rules.rate_card_for(context.move_date, context.is_local());
    let adjustment_minutes = site_adjustment_minutes(&context.origin.descriptor, constants)
        + site_adjustment_minutes(&context.destination.descriptor, constants);
    let packing = compute_packing(
        &context.packing_request,
        context.packing_catalog,
        rate_card.mover_rate_per_hour,
    );

    let total_hours = work_hours + travel_hours + adjustment_minutes / 60.0 + packing.hours;
    let billable_hours = constants.min_billable_hours.max(total_hours);
    let labor_hourly = rate_card.mover_rate_per_hour * f64::from(movers)
        + rate_card.truck_rate_per_hour * f64::from(trucks);
    let labor_cost = labor_hourly * billable_hours;
    let mileage_cost = context.distance_miles * constants.mileage_rate;

    let mut surcharges = Vec::new();
    let protective = protective_materials_charge(total_weight, constants);
    if protective != 0.0 {
        surcharges.push(Adjustment { kind: PROTECTIVE_MATERIALS.to_string(), amount: protective });
    }
    let discounts = Vec::new();

    let surcharge_total: f64 = surcharges.iter().map(|surcharge| surcharge.amount).sum();
    let subtotal = labor_cost + mileage_cost + packing.cost + surcharge_total;
    let mut total_price = subtotal + constants.base_fee;
    if context.options.not_to_exceed {
        total_price *= 1.0 + constants.nte_buffer_percent;
    }

    let trace = vec![
        step(
            "work_hours",
            "weight / (movers * origin rate) + weight / (movers * destination rate)",
            work_hours,
        ),
        step("travel_hours", "travel charge plus distance allowance", travel_hours),
        step("adjustment_minutes", "stairs, long carry, elevator at both sites", adjustment_minutes),
        step("packing_time_hours", "full-service packing labor / mover rate", packing.hours),
        step("labor_hourly", "mover rate * movers + truck rate * trucks", labor_hourly),
        step("billable_hours", "max(minimum billable, total hours)", billable_hours),
        step("total", "labor + mileage + packing + surcharges + base fee", total_price),
    ];

    QuoteResult {
        movers,
        trucks,
        billable_hours,
        labor_cost,
        mileage_cost,
        packing_cost: packing.cost,
        travel_hours,
        work_hours,
        packing_hours: packing.hours,
        base_fee: constants.base_fee,
        surcharges,
        discounts,
        total_price,
        trace,
    }
}

pub trait QuoteOptimizer: Send + Sync {
    fn optimize(&self, context: &QuoteContext<'_>) -> Result<OptimizedQuote, DomainError>;
}

/// Walks every (movers, trucks) pair in ascending order; the first strictly cheaper candidate wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridSearchOptimizer;

impl QuoteOptimizer for GridSearchOptimizer {
    fn optimize(&self, context: &QuoteContext<'_>) -> Result<OptimizedQuote, DomainError> {
        let bounds = CrewBounds::for_weight(context.total_weight(), &context.rules.constants);

        let mut best: Option<QuoteResult> = None;
        let mut candidates_evaluated = 0usize;
        for movers in bounds.min_movers..=bounds.max_movers {
            for trucks in bounds.min_trucks..=bounds.max_trucks {
                candidates_evaluated += 1;
                let candidate = evaluate_candidate(movers, trucks, context);
                let cheaper =
                    best.as_ref().map_or(true, |current| candidate.total_price < current.total_price);
                if cheaper {
                    best = Some(candidate);
                }
            }
        }

        let Some(quote) = best else {
            return Err(DomainError::EmptyCandidateGrid {
                min_movers: bounds.min_movers,
                max_movers: bounds.max_movers,
                min_trucks: bounds.min_trucks,
                max_trucks: bounds.max_trucks,
            });
        };

        debug!(
            event_name = "pricing.optimized",
            optimize_for = ?context.options.optimize_for,
            min_movers = bounds.min_movers,
            max_movers = bounds.max_movers,
            min_trucks = bounds.min_trucks,
            max_trucks = bounds.max_trucks,
            candidates_evaluated,
            movers = quote.movers,
            trucks = quote.trucks,
            total_price = quote.total_price,
            "quote optimized"
        );

        Ok(OptimizedQuote { quote, candidates_evaluated, bounds })
    }
}
