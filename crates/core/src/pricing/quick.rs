//! Weight-only quotes. No inventory resolution and no crew search: the crew follows from the
//! weight, and both ends of the move share one location profile.

use serde::{Deserialize, Serialize};

use crate::pricing::optimizer::{
    minimum_movers, minimum_trucks, productivity_hours, protective_materials_charge,
};
use crate::pricing::rules::{AccessCode, DayBucket, MoveType, MovingRules};

/// Drive time never bills below this many minutes.
pub const MIN_DRIVE_MINUTES: f64 = 20.0;
pub const DRIVE_MINUTES_PER_MILE: f64 = 1.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationProfile {
    Easy,
    #[default]
    MultiFloor,
}

impl LocationProfile {
    pub fn access_code(self) -> AccessCode {
        match self {
            Self::Easy => AccessCode::GroundFloor,
            Self::MultiFloor => AccessCode::MultiFloor,
        }
    }
}

pub fn drive_minutes(distance_miles: f64) -> f64 {
    (distance_miles * DRIVE_MINUTES_PER_MILE).max(MIN_DRIVE_MINUTES)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuickQuoteSpec {
    pub total_weight_lbs: f64,
    pub location_profile: LocationProfile,
    pub move_type: MoveType,
    pub day_bucket: DayBucket,
    pub drive_minutes: f64,
    pub distance_miles: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuickQuoteResult {
    pub movers: u32,
    pub trucks: u32,
    pub work_hours: f64,
    pub travel_hours: f64,
    pub billable_hours: f64,
    pub labor_cost: f64,
    pub mileage_cost: f64,
    pub protective_materials: f64,
    pub base_fee: f64,
    pub total_price: f64,
}

pub fn price_quick_quote(spec: &QuickQuoteSpec, rules: &MovingRules) -> QuickQuoteResult {
    let constants = &rules.constants;
    let access = rules.access_rule(spec.location_profile.access_code());
    let rate_card = rules.rate_card(spec.move_type, spec.day_bucket);

    let movers = minimum_movers(spec.total_weight_lbs, constants);
    let trucks = minimum_trucks(spec.total_weight_lbs, constants);
    let work_hours = productivity_hours(spec.total_weight_lbs, movers, access, access);
    let travel_hours = spec.drive_minutes / 60.0;
    let billable_hours = constants.min_billable_hours.max(work_hours + travel_hours);

    let labor_cost = billable_hours
        * (rate_card.mover_rate_per_hour * f64::from(movers)
            + rate_card.truck_rate_per_hour * f64::from(trucks));
    let mileage_cost = spec.distance_miles * constants.mileage_rate;
    let protective_materials = protective_materials_charge(spec.total_weight_lbs, constants);

    QuickQuoteResult {
        movers,
        trucks,
        work_hours,
        travel_hours,
        billable_hours,
        labor_cost,
        mileage_cost,
        protective_materials,
        base_fee: constants.base_fee,
        total_price: labor_cost + mileage_cost + protective_materials + constants.base_fee,
    }
}

#[cfg(test)]
mod tests {
    use super::{drive_minutes, price_quick_quote, LocationProfile, QuickQuoteSpec};
    use crate::pricing::rules::tests::shipped_rules;
    use crate::pricing::rules::{AccessCode, DayBucket, MoveType};

    fn spec(weight: f64, profile: LocationProfile, distance: f64) -> QuickQuoteSpec {
        QuickQuoteSpec {
            total_weight_lbs: weight,
            location_profile: profile,
            move_type: MoveType::for_distance(distance),
            day_bucket: DayBucket::MondayToThursday,
            drive_minutes: drive_minutes(distance),
            distance_miles: distance,
        }
    }

    #[test]
    fn short_drives_bill_twenty_minutes() {
        assert_eq!(drive_minutes(0.0), 20.0);
        assert_eq!(drive_minutes(5.0), 20.0);
        assert_eq!(drive_minutes(40.0), 60.0);
    }

    #[test]
    fn profiles_pick_their_access_codes() {
        assert_eq!(LocationProfile::Easy.access_code(), AccessCode::GroundFloor);
        assert_eq!(LocationProfile::MultiFloor.access_code(), AccessCode::MultiFloor);
        assert_eq!(LocationProfile::default(), LocationProfile::MultiFloor);
    }

    #[test]
    fn light_local_move_bills_the_minimum_hours() {
        let rules = shipped_rules();
        let result = price_quick_quote(&spec(430.0, LocationProfile::MultiFloor, 5.0), &rules);

        // 430 lbs at 220 lbs/mover-hour on both legs plus 20 minutes of driving.
        assert!((result.work_hours - 430.0 / 220.0).abs() < 1e-9);
        assert!((result.travel_hours - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!((result.movers, result.trucks), (2, 1));
        assert_eq!(result.billable_hours, 3.0);
        assert_eq!(result.labor_cost, 450.0);
        assert_eq!(result.mileage_cost, 11.25);
        assert_eq!(result.protective_materials, 5.0);
        assert_eq!(result.total_price, 511.25);
    }

    #[test]
    fn easy_profile_moves_faster() {
        let rules = shipped_rules();
        let easy = price_quick_quote(&spec(3000.0, LocationProfile::Easy, 5.0), &rules);
        let stairs = price_quick_quote(&spec(3000.0, LocationProfile::MultiFloor, 5.0), &rules);

        assert!((easy.work_hours - 3000.0 / 300.0).abs() < 1e-9);
        assert!(easy.work_hours < stairs.work_hours);
        assert!(easy.total_price < stairs.total_price);
    }

    #[test]
    fn heavy_loads_add_movers_and_trucks() {
        let rules = shipped_rules();
        let result = price_quick_quote(&spec(9000.0, LocationProfile::Easy, 5.0), &rules);

        // 5000 lbs over the baseline is two started 2500 lb steps.
        assert_eq!(result.movers, 4);
        assert_eq!(result.trucks, 2);
        assert_eq!(result.protective_materials, 45.0);
    }
}
