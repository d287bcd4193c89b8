//! Capacity planner: decides how many members to add or remove.
//!
//! # Algorithm
//!
//! ```text
//! expected = borrowed + pending_delta
//! k        = smallest step so that utilization(expected, size + k) < target
//!
//! k > 0:  min(k, max_size - size, ceil(size * scale_cap))   // cap skipped for Unlimited
//! k <= 0: max(k, min_size - size, -floor(size * scale_cap))
//! ```
//!
//! `k` is found by growing from zero while the projected utilization is at
//! or above the target, then walking back down while one member fewer
//! would still stay below it. Utilization is rounded to two decimals, so
//! boundary ties depend on that rounding.

use crate::config::{PoolConfig, ScalingPolicy};

/// Pool occupancy as seen by the planner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Occupancy {
    /// Idle plus borrowed members.
    pub size: usize,
    /// Members currently lent out.
    pub borrowed: usize,
}

/// Fraction of `total` taken by `usage`, rounded to two decimals; 0 when `total` is 0.
pub fn utilization(usage: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(usage as f64 / total as f64)
}

/// Round to two decimal places, half to even on the exact binary value
/// (5/8 becomes 0.62, while 1/40, stored slightly above 0.025, becomes 0.03).
fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Signed number of members to add (positive) or remove (negative) so the
/// pool can absorb `pending_delta` more borrowers.
pub fn plan(config: &PoolConfig, occupancy: Occupancy, pending_delta: i64) -> i64 {
    if config.policy == ScalingPolicy::Fixed {
        return 0;
    }

    let size = occupancy.size as i64;
    let max_size = config.max_size as i64;
    let min_size = config.min_size as i64;
    let expected = occupancy.borrowed as i64 + pending_delta;
    let target = config.target_utilization;

    let mut k: i64 = 0;
    // Growth past max_size would be clamped away; stopping there also keeps
    // a zero target from searching forever.
    while size + k < max_size && utilization(expected, size + k) >= target {
        k += 1;
    }
    while size + k - 1 > 0 && utilization(expected, size + k - 1) < target {
        k -= 1;
    }

    if k > 0 {
        k = k.min(max_size - size);
        if config.policy != ScalingPolicy::Unlimited {
            k = k.min((size as f64 * config.scale_cap).ceil() as i64);
        }
        k.max(0)
    } else {
        let step_cap = -((size as f64 * config.scale_cap).floor() as i64);
        k.max(min_size - size).max(step_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupancy(size: usize, borrowed: usize) -> Occupancy {
        Occupancy { size, borrowed }
    }

    fn adaptive() -> PoolConfig {
        PoolConfig::default()
    }

    // ── utilization ─────────────────────────────────────────────────

    #[test]
    fn utilization_of_empty_pool_is_zero() {
        assert_eq!(utilization(0, 0), 0.0);
        assert_eq!(utilization(4, 0), 0.0);
    }

    #[test]
    fn utilization_rounds_to_two_decimals() {
        assert_eq!(utilization(1, 3), 0.33);
        assert_eq!(utilization(2, 3), 0.67);
        assert_eq!(utilization(3, 5), 0.6);
        assert_eq!(utilization(7, 11), 0.64);
        assert_eq!(utilization(5, 5), 1.0);
    }

    #[test]
    fn utilization_ties_follow_binary_value() {
        // 0.625 is exact: ties go to even.
        assert_eq!(utilization(5, 8), 0.62);
        assert_eq!(utilization(1, 8), 0.12);
        // 0.025 is stored as 0.025000000000000001: rounds up.
        assert_eq!(utilization(1, 40), 0.03);
        assert_eq!(utilization(7, 40), 0.17);
    }

    #[test]
    fn utilization_of_negative_usage() {
        assert_eq!(utilization(-1, 4), -0.25);
    }

    // ── plan ────────────────────────────────────────────────────────

    #[test]
    fn fixed_policy_never_scales() {
        let config = adaptive().with_policy(ScalingPolicy::Fixed);
        assert_eq!(plan(&config, occupancy(5, 5), 1), 0);
        assert_eq!(plan(&config, occupancy(0, 0), 1), 0);
        assert_eq!(plan(&config, occupancy(10, 0), -1), 0);
    }

    #[test]
    fn empty_pool_grows_to_min_size() {
        assert_eq!(plan(&adaptive(), occupancy(0, 0), 1), 3);
    }

    #[test]
    fn idle_pool_shrinks_within_scale_cap() {
        // 1/5 = 0.2 wants to shrink to 1, the cap allows floor(5 * 0.3) = 1.
        assert_eq!(plan(&adaptive(), occupancy(5, 0), 1), -1);
        // 1/10 wants 1 member, min_size allows -7, the cap -3.
        assert_eq!(plan(&adaptive(), occupancy(10, 0), 1), -3);
    }

    #[test]
    fn shrink_never_goes_below_min_size() {
        let config = adaptive().with_scale_cap(1.0);
        assert_eq!(plan(&config, occupancy(10, 0), 1), -7);
    }

    #[test]
    fn grow_until_below_target() {
        // 3/3 -> needs 5 members (0.6), capped at ceil(3 * 0.3) = 1.
        assert_eq!(plan(&adaptive(), occupancy(3, 2), 1), 1);
        let config = adaptive().with_scale_cap(1.0);
        assert_eq!(plan(&config, occupancy(3, 2), 1), 2);
    }

    #[test]
    fn boundary_at_exact_target_still_grows() {
        // 7/10 == 0.7 is not below 0.7.
        let config = adaptive().with_sizes(5, 3, 20);
        assert_eq!(plan(&config, occupancy(10, 6), 1), 1);
        // 7/11 = 0.64 is below: one step back would be 0.7.
        let config = config.with_scale_cap(1.0);
        assert_eq!(plan(&config, occupancy(9, 6), 1), 2);
    }

    #[test]
    fn growth_never_exceeds_max_size() {
        assert_eq!(plan(&adaptive(), occupancy(10, 10), 1), 0);
        let config = adaptive().with_policy(ScalingPolicy::Unlimited);
        assert_eq!(plan(&config, occupancy(9, 8), 1), 1);
    }

    #[test]
    fn scale_cap_limits_single_growth_step() {
        let config = adaptive().with_scale_cap(0.5).with_sizes(10, 0, 40);
        // 11 borrowers need 16 members (0.69), the cap allows ceil(10 * 0.5) = 5.
        assert_eq!(plan(&config, occupancy(10, 10), 1), 5);
    }

    #[test]
    fn unlimited_policy_ignores_scale_cap_for_growth() {
        let config = adaptive()
            .with_policy(ScalingPolicy::Unlimited)
            .with_scale_cap(0.5)
            .with_sizes(10, 0, 40);
        assert_eq!(plan(&config, occupancy(10, 10), 1), 6);
    }

    #[test]
    fn unlimited_policy_still_caps_shrink() {
        let config = adaptive().with_policy(ScalingPolicy::Unlimited);
        assert_eq!(plan(&config, occupancy(10, 0), 1), -3);
    }

    #[test]
    fn zero_scale_cap_is_a_noop() {
        let config = adaptive().with_scale_cap(0.0).with_sizes(5, 0, 10);
        assert_eq!(plan(&config, occupancy(5, 5), 1), 0);
        assert_eq!(plan(&config, occupancy(5, 0), 1), 0);
    }

    #[test]
    fn zero_target_terminates_at_max_size() {
        let config = adaptive()
            .with_policy(ScalingPolicy::Unlimited)
            .with_target_utilization(0.0);
        assert_eq!(plan(&config, occupancy(4, 0), 1), 6);
    }

    #[test]
    fn remand_projection_trims_capacity() {
        // Returning 1 of 1 borrowed at size 10: shrink by the cap.
        assert_eq!(plan(&adaptive(), occupancy(10, 1), -1), -3);
    }

    #[test]
    fn pool_below_min_size_grows_back() {
        let config = adaptive().with_sizes(5, 4, 10);
        assert_eq!(plan(&config, occupancy(1, 0), -1), 3);
    }
}
