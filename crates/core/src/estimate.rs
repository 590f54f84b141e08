//! Request-level orchestration: resolve the inventory, price it, and shape the public estimate.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::catalog::AliasIndex;
use crate::data::DataBundle;
use crate::errors::{ApplicationError, InputError};
use crate::pricing::optimizer::{
    Adjustment, CrewBounds, GridSearchOptimizer, ItemAllocation, LocationContext, QuoteContext,
    QuoteOptimizer, QuoteTraceStep,
};
use crate::pricing::quick::{drive_minutes, price_quick_quote, LocationProfile, QuickQuoteSpec};
use crate::pricing::rules::{DayBucket, MoveType};
use crate::request::{EstimateRequest, QuickQuoteRequest};
use crate::resolver::{
    Alternate, Assumption, DeterministicInventoryResolver, InventoryResolver, MatchSummary,
    ResolvedLine, ResolverOptions, ResolverResult, LOW_CONFIDENCE_THRESHOLD,
};

pub const CURRENCY: &str = "USD";

/// Quick quotes accept only close spellings; anything weaker is an unknown item.
pub const QUICK_MATCH_THRESHOLD: f64 = 0.85;

/// Rounds to cents; non-finite values become zero.
pub fn money(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).map(|amount| amount.round_dp(2)).unwrap_or(Decimal::ZERO)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryLine {
    pub item_id: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub weight_each_lbs: f64,
    pub weight_total_lbs: f64,
    pub volume_total_cuft: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoneyAdjustment {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: Decimal,
}

impl From<&Adjustment> for MoneyAdjustment {
    fn from(adjustment: &Adjustment) -> Self {
        Self { kind: adjustment.kind.clone(), amount: money(adjustment.amount) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessSummary {
    pub origin: String,
    pub destination: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimateBreakdown {
    pub movers: u32,
    pub trucks: u32,
    pub labor_hours_billed: Decimal,
    pub work_hours: Decimal,
    pub travel_hours: Decimal,
    pub packing_hours: Decimal,
    pub labor_cost: Decimal,
    pub mileage_cost: Decimal,
    pub packing_cost: Decimal,
    pub base_fee: Decimal,
    pub surcharges: Vec<MoneyAdjustment>,
    pub discounts: Vec<MoneyAdjustment>,
    pub total_weight_lbs: Decimal,
    pub total_volume_cuft: Decimal,
    pub access: AccessSummary,
    pub move_type: MoveType,
    pub day_bucket: DayBucket,
    pub candidates_evaluated: usize,
    pub seasonality: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClarificationItem {
    pub raw: String,
    pub chosen_id: String,
    pub confidence: f64,
    pub alternates: Vec<Alternate>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationLogic {
    pub steps: Vec<QuoteTraceStep>,
    pub bounds: CrewBounds,
    pub resolution: Vec<ResolvedLine>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub quote_id: Uuid,
    pub final_price: Decimal,
    pub currency: String,
    pub breakdown: EstimateBreakdown,
    pub line_items: Vec<InventoryLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Vec<Assumption>>,
    pub match_summary: MatchSummary,
    pub needs_clarification: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clarification_items: Vec<ClarificationItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_logic: Option<CalculationLogic>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuickQuote {
    pub quote_id: Uuid,
    pub total_price: Decimal,
    pub currency: String,
    pub labor_cost: Decimal,
    pub mileage_cost: Decimal,
    pub protective_materials: Decimal,
    pub base_fee: Decimal,
    pub billable_hours: Decimal,
    pub work_hours: Decimal,
    pub travel_hours: Decimal,
    pub movers: u32,
    pub trucks: u32,
    pub location_profile: LocationProfile,
    pub move_type: MoveType,
    pub day_bucket: DayBucket,
    pub total_weight_lbs: Decimal,
    pub inventory_breakdown: Vec<InventoryLine>,
}

/// Holds the shared static data and the two engines. Cheap to share across threads.
pub struct Estimator<R = DeterministicInventoryResolver, Q = GridSearchOptimizer> {
    data: DataBundle,
    defaults: ResolverOptions,
    resolver: R,
    optimizer: Q,
}

impl Estimator {
    pub fn new(data: DataBundle, defaults: ResolverOptions) -> Self {
        Self::with_engines(data, defaults, DeterministicInventoryResolver, GridSearchOptimizer)
    }
}

impl<R, Q> Estimator<R, Q> {
    pub fn with_engines(
        data: DataBundle,
        defaults: ResolverOptions,
        resolver: R,
        optimizer: Q,
    ) -> Self {
        Self { data, defaults, resolver, optimizer }
    }

    pub fn data(&self) -> &DataBundle {
        &self.data
    }

    pub fn defaults(&self) -> &ResolverOptions {
        &self.defaults
    }
}

impl<R, Q> Estimator<R, Q>
where
    R: InventoryResolver,
    Q: QuoteOptimizer,
{
    pub fn resolve(
        &self,
        request: &EstimateRequest,
    ) -> Result<(ResolverResult, ResolverOptions), ApplicationError> {
        let options = request.options.resolver_options(&self.defaults)?;
        let resolution = self.resolver.resolve(&request.items, &self.data.index, &options)?;
        if resolution.lines.is_empty() {
            return Err(InputError::NoResolvableItems.into());
        }
        Ok((resolution, options))
    }

    pub fn estimate(
        &self,
        request: &EstimateRequest,
        include_trace: bool,
        correlation_id: &str,
    ) -> Result<Estimate, ApplicationError> {
        let (resolution, options) = self.resolve(request)?;
        let allocations = allocate(&resolution.lines);

        let rules = self.data.rules.as_ref();
        let context = QuoteContext {
            move_date: request.move_date,
            distance_miles: request.distance_miles,
            origin: LocationContext::classify(request.origin.clone(), rules),
            destination: LocationContext::classify(request.destination.clone(), rules),
            allocations,
            rules,
            packing_catalog: self.data.packing.as_ref(),
            packing_request: request.packing.clone(),
            options: request.options.quote.clone(),
        };
        let optimized = self.optimizer.optimize(&context)?;
        let quote = &optimized.quote;

        let mut line_items: Vec<InventoryLine> = context
            .allocations
            .iter()
            .map(|allocation| InventoryLine {
                item_id: allocation.item.id.clone(),
                name: allocation.item.name.clone(),
                category: allocation.item.category.clone(),
                quantity: allocation.quantity,
                weight_each_lbs: allocation.item.weight_lbs,
                weight_total_lbs: allocation.total_weight(),
                volume_total_cuft: allocation.total_volume(),
            })
            .collect();
        line_items.sort_by_key(|line| line.name.to_lowercase());

        let clarification_items: Vec<ClarificationItem> = resolution
            .lines
            .iter()
            .filter(|line| line.confidence < LOW_CONFIDENCE_THRESHOLD)
            .map(|line| ClarificationItem {
                raw: line.raw.clone(),
                chosen_id: line.matched.item.id.clone(),
                confidence: line.confidence,
                alternates: line.alternates.clone(),
            })
            .collect();

        let breakdown = EstimateBreakdown {
            movers: quote.movers,
            trucks: quote.trucks,
            labor_hours_billed: money(quote.billable_hours),
            work_hours: money(quote.work_hours),
            travel_hours: money(quote.travel_hours),
            packing_hours: money(quote.packing_hours),
            labor_cost: money(quote.labor_cost),
            mileage_cost: money(quote.mileage_cost),
            packing_cost: money(quote.packing_cost),
            base_fee: money(quote.base_fee),
            surcharges: quote.surcharges.iter().map(MoneyAdjustment::from).collect(),
            discounts: quote.discounts.iter().map(MoneyAdjustment::from).collect(),
            total_weight_lbs: money(context.total_weight()),
            total_volume_cuft: money(context.total_volume()),
            access: AccessSummary {
                origin: context.origin.access_rule.code.as_str().to_string(),
                destination: context.destination.access_rule.code.as_str().to_string(),
            },
            move_type: MoveType::for_distance(request.distance_miles),
            day_bucket: DayBucket::for_date(request.move_date),
            candidates_evaluated: optimized.candidates_evaluated,
            seasonality: request.options.quote.seasonality.clone(),
        };

        let calculation_logic = include_trace.then(|| CalculationLogic {
            steps: quote.trace.clone(),
            bounds: optimized.bounds,
            resolution: resolution.lines.clone(),
        });

        let estimate = Estimate {
            quote_id: Uuid::new_v4(),
            final_price: money(quote.total_price),
            currency: CURRENCY.to_string(),
            breakdown,
            line_items,
            assumptions: options.assumptions_public.then(|| resolution.assumptions.clone()),
            match_summary: resolution.match_summary.clone(),
            needs_clarification: !clarification_items.is_empty(),
            clarification_items,
            calculation_logic,
        };

        info!(
            event_name = "estimate.completed",
            correlation_id,
            quote_id = %estimate.quote_id,
            idempotency_key = request.idempotency_key.as_deref().unwrap_or(""),
            lines = resolution.lines.len(),
            low_confidence = resolution.match_summary.low_confidence_count,
            movers = quote.movers,
            trucks = quote.trucks,
            final_price = %estimate.final_price,
            needs_clarification = estimate.needs_clarification,
            "estimate completed"
        );

        Ok(estimate)
    }
}

/// Quick quotes: match each label directly against the catalog, sum the weight, price it.
impl<R, Q> Estimator<R, Q> {
    pub fn quick_quote(
        &self,
        request: &QuickQuoteRequest,
        correlation_id: &str,
    ) -> Result<QuickQuote, ApplicationError> {
        let inventory = weigh_inventory(&self.data.index, request)?;
        let total_weight = round2(inventory.iter().map(|line| line.weight_total_lbs).sum());

        let spec = QuickQuoteSpec {
            total_weight_lbs: total_weight,
            location_profile: request.location_profile,
            move_type: MoveType::for_distance(request.distance_miles),
            day_bucket: DayBucket::for_date(request.move_date),
            drive_minutes: drive_minutes(request.distance_miles),
            distance_miles: request.distance_miles,
        };
        let result = price_quick_quote(&spec, self.data.rules.as_ref());

        let quote = QuickQuote {
            quote_id: Uuid::new_v4(),
            total_price: money(result.total_price),
            currency: CURRENCY.to_string(),
            labor_cost: money(result.labor_cost),
            mileage_cost: money(result.mileage_cost),
            protective_materials: money(result.protective_materials),
            base_fee: money(result.base_fee),
            billable_hours: money(result.billable_hours),
            work_hours: money(result.work_hours),
            travel_hours: money(result.travel_hours),
            movers: result.movers,
            trucks: result.trucks,
            location_profile: spec.location_profile,
            move_type: spec.move_type,
            day_bucket: spec.day_bucket,
            total_weight_lbs: money(total_weight),
            inventory_breakdown: inventory,
        };

        info!(
            event_name = "estimate.quick_completed",
            correlation_id,
            quote_id = %quote.quote_id,
            lines = quote.inventory_breakdown.len(),
            total_weight_lbs = total_weight,
            movers = quote.movers,
            trucks = quote.trucks,
            total_price = %quote.total_price,
            "quick quote completed"
        );

        Ok(quote)
    }
}

/// One line per requested label with a positive quantity, sorted by name.
fn weigh_inventory(
    index: &AliasIndex,
    request: &QuickQuoteRequest,
) -> Result<Vec<InventoryLine>, InputError> {
    let mut lines = Vec::new();
    for (label, quantity) in request.items.iter() {
        if quantity == 0 {
            continue;
        }
        let matched = index
            .match_label(label, QUICK_MATCH_THRESHOLD)
            .ok_or_else(|| InputError::UnknownItem(label.to_string()))?;
        let item = matched.item;
        lines.push(InventoryLine {
            weight_each_lbs: item.weight_lbs,
            weight_total_lbs: round2(item.weight_lbs * f64::from(quantity)),
            volume_total_cuft: item.volume_cuft * f64::from(quantity),
            item_id: item.id,
            name: item.name,
            category: item.category,
            quantity,
        });
    }
    lines.sort_by_key(|line| line.name.to_lowercase());
    Ok(lines)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One allocation per catalog item, quantities summed, in first-resolved order.
fn allocate(lines: &[ResolvedLine]) -> Vec<ItemAllocation> {
    let mut allocations: Vec<ItemAllocation> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for line in lines {
        match positions.get(&line.matched.item.id) {
            Some(position) => {
                let allocation = &mut allocations[*position];
                allocation.quantity = allocation.quantity.saturating_add(line.quantity);
            }
            None => {
                positions.insert(line.matched.item.id.clone(), allocations.len());
                let item = line.matched.item.clone();
                allocations.push(ItemAllocation { item, quantity: line.quantity });
            }
        }
    }
    allocations
}
