use std::collections::BTreeMap;

use crate::errors::InputError;

pub const BOX_SIZES: [&str; 4] = ["1.5", "3.0", "4.5", "6.0"];
pub const BOX_ITEM_IDS: [&str; 4] = [
    "carton_box_small_1_5",
    "carton_box_medium_3_0",
    "carton_box_large_4_5",
    "carton_box_xl_6_0",
];
pub const DEFAULT_BOX_POLICY: &str = "50/35/10/5";

/// Per-size carton counts, indexed like [`BOX_SIZES`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoxAllocation {
    counts: [u32; 4],
}

impl BoxAllocation {
    pub fn count(&self, size: &str) -> u32 {
        BOX_SIZES.iter().position(|candidate| *candidate == size).map_or(0, |idx| self.counts[idx])
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|count| u64::from(*count)).sum()
    }

    /// `(size, item id, count)` for every size, smallest first.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str, u32)> + '_ {
        BOX_SIZES.iter().zip(BOX_ITEM_IDS.iter()).zip(self.counts.iter()).map(
            |((size, item_id), count)| (*size, *item_id, *count),
        )
    }

    pub fn to_map(&self) -> BTreeMap<String, u32> {
        self.iter().map(|(size, _, count)| (size.to_string(), count)).collect()
    }
}

/// Reads `p1/p2/p3/p4` percentages. Unparseable or missing chunks count as zero and
/// chunks past the fourth are ignored.
pub fn parse_box_policy(policy: &str) -> [f64; 4] {
    let mut ratios = [0.0; 4];
    for (slot, chunk) in ratios.iter_mut().zip(policy.split('/')) {
        *slot = chunk
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value > 0.0)
            .map_or(0.0, |value| value / 100.0);
    }
    ratios
}

/// Strict form used for configuration and per-request overrides.
pub fn validate_box_policy(policy: &str) -> Result<(), InputError> {
    let invalid = || InputError::InvalidBoxPolicy(policy.to_string());
    let chunks: Vec<&str> = policy.split('/').collect();
    if chunks.len() != 4 {
        return Err(invalid());
    }

    let mut sum = 0.0;
    for chunk in chunks {
        let value = chunk.trim().parse::<f64>().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }
        sum += value;
    }

    if (sum - 100.0).abs() > 1e-6 {
        return Err(invalid());
    }
    Ok(())
}

/// Splits `total` cartons across the four sizes. Each size gets the floor of its share,
/// then leftover units go one at a time to the largest fractional shares. Equal
/// fractions favour the larger size.
pub fn allocate_boxes(total: i64, policy: &str) -> BoxAllocation {
    let mut allocation = BoxAllocation::default();
    let Ok(total) = u32::try_from(total) else {
        return allocation;
    };
    if total == 0 {
        return allocation;
    }

    let ratios = parse_box_policy(policy);
    let mut fractions = [0.0; 4];
    let mut assigned: u64 = 0;
    for (idx, ratio) in ratios.iter().enumerate() {
        let target = f64::from(total) * ratio;
        let floor = target.floor();
        // an oversubscribed policy is cut off once the total is spent
        let budget = u64::from(total) - assigned;
        allocation.counts[idx] = (floor as u64).min(budget) as u32;
        fractions[idx] = target - floor;
        assigned += u64::from(allocation.counts[idx]);
    }

    let mut order = [0usize, 1, 2, 3];
    order.sort_by(|left, right| {
        fractions[*right].total_cmp(&fractions[*left]).then_with(|| right.cmp(left))
    });

    let mut remainder = u64::from(total).saturating_sub(assigned);
    for idx in order.iter().cycle() {
        if remainder == 0 {
            break;
        }
        allocation.counts[*idx] += 1;
        remainder -= 1;
    }

    allocation
}

#[cfg(test)]
mod tests {
    use super::{allocate_boxes, parse_box_policy, validate_box_policy, DEFAULT_BOX_POLICY};

    #[test]
    fn ten_boxes_follow_default_policy() {
        let allocation = allocate_boxes(10, DEFAULT_BOX_POLICY);

        assert_eq!(allocation.count("1.5"), 5);
        assert_eq!(allocation.count("3.0"), 3);
        assert_eq!(allocation.count("4.5"), 1);
        assert_eq!(allocation.count("6.0"), 1);
    }

    #[test]
    fn allocation_always_sums_to_total() {
        for policy in [DEFAULT_BOX_POLICY, "25/25/25/25", "33/33/33/1", "100/0/0/0", "0/0/0/0"] {
            for total in 0..=250 {
                let allocation = allocate_boxes(total, policy);
                assert_eq!(allocation.total(), total as u64, "policy {policy} total {total}");
            }
        }
    }

    #[test]
    fn oversubscribed_policy_never_exceeds_total() {
        for total in 0..=50 {
            let allocation = allocate_boxes(total, "100/100/0/0");
            assert_eq!(allocation.total(), total as u64, "total {total}");
            assert_eq!(allocation.count("1.5"), total as u32);
        }

        let allocation = allocate_boxes(9, "80/80/80/80");
        assert_eq!(allocation.total(), 9);
    }

    #[test]
    fn non_positive_totals_allocate_nothing() {
        assert_eq!(allocate_boxes(0, DEFAULT_BOX_POLICY).total(), 0);
        assert_eq!(allocate_boxes(-4, DEFAULT_BOX_POLICY).total(), 0);
    }

    #[test]
    fn malformed_chunks_count_as_zero() {
        assert_eq!(parse_box_policy("50/abc/50"), [0.5, 0.0, 0.5, 0.0]);
        assert_eq!(parse_box_policy("10/20/30/40/99"), [0.1, 0.2, 0.3, 0.4]);

        let allocation = allocate_boxes(4, "50/abc/50");
        assert_eq!(allocation.count("1.5"), 2);
        assert_eq!(allocation.count("3.0"), 0);
        assert_eq!(allocation.count("4.5"), 2);
    }

    #[test]
    fn strict_validation_requires_four_chunks_summing_to_100() {
        assert!(validate_box_policy(DEFAULT_BOX_POLICY).is_ok());
        assert!(validate_box_policy("25 / 25 / 25 / 25").is_ok());
        assert!(validate_box_policy("50/50").is_err());
        assert!(validate_box_policy("50/35/10/x").is_err());
        assert!(validate_box_policy("60/35/10/5").is_err());
        assert!(validate_box_policy("-5/55/45/5").is_err());
    }

    #[test]
    fn map_form_lists_every_size() {
        let map = allocate_boxes(3, DEFAULT_BOX_POLICY).to_map();

        assert_eq!(map.len(), 4);
        assert_eq!(map.values().sum::<u32>(), 3);
    }
}
