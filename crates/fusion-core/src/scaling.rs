//! # Scaling Functions
//!
//! Per-level point cost and per-level stat bonus.
//!
//! The bonus curve is `base × (1 + factor × (level − 1) / (level + 20))`:
//! exactly `base` at level 1, with diminishing returns per level and a
//! ceiling of `base × (1 + factor)` that grows with rarity. Values must
//! match existing reference data to the cent, including rounding.

use crate::Rarity;

/// Growth factor for Common nodes.
pub const COMMON_FACTOR: f64 = 2.78;

/// Growth factor for Rare nodes.
pub const RARE_FACTOR: f64 = 4.46;

/// Growth factor for Legendary nodes.
pub const LEGENDARY_FACTOR: f64 = 5.14;

/// Level offset in the denominator of the growth curve.
const LEVEL_OFFSET: f64 = 20.0;

/// Points consumed by one level of a node.
#[must_use]
pub const fn cost_per_level(rarity: Rarity) -> u32 {
    match rarity {
        Rarity::Common => 1,
        Rarity::Rare => 2,
        Rarity::Legendary => 3,
    }
}

/// Growth factor of the bonus curve for a rarity.
#[must_use]
pub const fn growth_factor(rarity: Rarity) -> f64 {
    match rarity {
        Rarity::Common => COMMON_FACTOR,
        Rarity::Rare => RARE_FACTOR,
        Rarity::Legendary => LEGENDARY_FACTOR,
    }
}

/// Unrounded bonus multiplier. Zero below level 1.
#[must_use]
pub fn level_multiplier(level: u32, rarity: Rarity) -> f64 {
    if level < 1 {
        return 0.0;
    }
    let level = f64::from(level);
    1.0 + (growth_factor(rarity) * (level - 1.0)) / (level + LEVEL_OFFSET)
}

/// Unrounded stat bonus; summed by aggregation before the single rounding.
#[must_use]
pub fn raw_level_bonus(base_value: f64, level: u32, rarity: Rarity) -> f64 {
    base_value * level_multiplier(level, rarity)
}

/// Stat bonus of a node at `level`, rounded to two decimals.
#[must_use]
pub fn level_bonus(base_value: f64, level: u32, rarity: Rarity) -> f64 {
    if level < 1 {
        return 0.0;
    }
    round_stat(raw_level_bonus(base_value, level, rarity))
}

/// Round to two decimals, half away from zero.
///
/// `f64::EPSILON` is added first so values like `1.005` (stored as
/// `1.00499…`) round up as written.
#[must_use]
pub fn round_stat(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_strictly_increases_with_rarity() {
        assert_eq!(cost_per_level(Rarity::Common), 1);
        assert_eq!(cost_per_level(Rarity::Rare), 2);
        assert_eq!(cost_per_level(Rarity::Legendary), 3);
    }

    #[test]
    fn level_zero_gives_no_bonus() {
        for rarity in Rarity::ALL {
            assert_eq!(level_bonus(10.0, 0, rarity), 0.0);
            assert_eq!(level_bonus(-3.5, 0, rarity), 0.0);
        }
    }

    #[test]
    fn level_one_is_exactly_base() {
        assert_eq!(level_bonus(10.0, 1, Rarity::Common), 10.0);
        assert_eq!(level_bonus(10.0, 1, Rarity::Legendary), 10.0);
    }

    #[test]
    fn legendary_level_21_matches_reference() {
        // 1 + 5.14 × 20 / 41 = 3.50731…
        assert_eq!(level_bonus(10.0, 21, Rarity::Legendary), 35.07);
    }

    #[test]
    fn common_level_2_rounds_to_cents() {
        // 1 + 2.78 / 22 = 1.12636…
        assert_eq!(level_bonus(1.0, 2, Rarity::Common), 1.13);
        assert_eq!(level_bonus(100.0, 2, Rarity::Common), 112.64);
    }

    #[test]
    fn rare_curve_matches_formula() {
        // 1 + 4.46 × 9 / 30 = 2.338
        assert_eq!(level_bonus(5.0, 10, Rarity::Rare), 11.69);
    }

    #[test]
    fn round_stat_counters_representation_error() {
        assert_eq!(round_stat(1.005), 1.01);
        assert_eq!(round_stat(-0.4), -0.4);
        assert_eq!(round_stat(35.073_17), 35.07);
    }

    #[test]
    fn higher_rarity_has_higher_ceiling() {
        let level = 500;
        assert!(level_multiplier(level, Rarity::Common) < level_multiplier(level, Rarity::Rare));
        assert!(
            level_multiplier(level, Rarity::Rare) < level_multiplier(level, Rarity::Legendary)
        );
        assert!(level_multiplier(level, Rarity::Legendary) < 1.0 + LEGENDARY_FACTOR);
    }
}
