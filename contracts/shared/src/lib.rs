//! Shared lock tiers, constants and fixed-point helpers used by the Bondlock contracts.
//! Everything here is pure: no storage, no environment access.
#![no_std]
use soroban_sdk::contracttype;

// ============================================================================
// Constants
// ============================================================================

/// Basis points representing 100% (10000 basis points = 100%)
pub const MAX_BASIS_POINTS: i128 = 10000;

/// Seconds in a day
pub const SECONDS_PER_DAY: u64 = 86400;

/// Seconds in a year (365 days)
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Longest reward period that may be configured (5 years)
pub const MAX_REWARDS_DURATION: u64 = 5 * SECONDS_PER_YEAR;

/// Fixed-point scale of the reward-per-boosted-unit accumulator (18 decimals)
pub const REWARD_SCALE: i128 = 1_000_000_000_000_000_000;

// ============================================================================
// Lock / Boost Policy
// ============================================================================

/// Cooldown and boost granted by one lock tier.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LockPolicy {
    pub cooldown: u64,  // Seconds between unbond and unstake
    pub boost_bps: i128, // Extra weight on top of principal, in basis points
}

/// Lock tiers, indexed by tier number. Cooldowns must stay non-zero: a zero
/// `unbond_ready_at` is how a position records that it is not unbonding.
pub const LOCK_POLICIES: [LockPolicy; 5] = [
    LockPolicy { cooldown: SECONDS_PER_DAY, boost_bps: 0 },
    LockPolicy { cooldown: 7 * SECONDS_PER_DAY, boost_bps: 1_000 },
    LockPolicy { cooldown: 30 * SECONDS_PER_DAY, boost_bps: 2_500 },
    LockPolicy { cooldown: 90 * SECONDS_PER_DAY, boost_bps: 5_000 },
    LockPolicy { cooldown: 180 * SECONDS_PER_DAY, boost_bps: 10_000 },
];

/// Look up the policy for `tier`, `None` for an unknown tier.
pub fn lock_policy(tier: u32) -> Option<LockPolicy> {
    LOCK_POLICIES.get(tier as usize).copied()
}

impl LockPolicy {
    /// `principal + principal * boost`, rounded down. `None` on overflow.
    pub fn boosted(&self, principal: i128) -> Option<i128> {
        let bonus = mul_div_floor(principal, self.boost_bps, MAX_BASIS_POINTS)?;
        principal.checked_add(bonus)
    }
}

// ============================================================================
// Fixed-point Helpers
// ============================================================================

/// `a * b / denominator`, truncating toward zero. All ledger quantities are
/// non-negative, so truncation always rounds in the protocol's favour.
pub fn mul_div_floor(a: i128, b: i128, denominator: i128) -> Option<i128> {
    if denominator <= 0 {
        return None;
    }
    a.checked_mul(b)?.checked_div(denominator)
}

/// `a * b / REWARD_SCALE` for non-negative operands, rounded down.
///
/// Both operands are split at `REWARD_SCALE` so the full product never has
/// to fit in an `i128`; only the result does.
pub fn mul_scaled_floor(a: i128, b: i128) -> Option<i128> {
    if a < 0 || b < 0 {
        return None;
    }
    let (a_hi, a_lo) = (a / REWARD_SCALE, a % REWARD_SCALE);
    let (b_hi, b_lo) = (b / REWARD_SCALE, b % REWARD_SCALE);

    a_hi.checked_mul(b_hi)?
        .checked_mul(REWARD_SCALE)?
        .checked_add(a_hi.checked_mul(b_lo)?)?
        .checked_add(a_lo.checked_mul(b_hi)?)?
        .checked_add(a_lo * b_lo / REWARD_SCALE)
}

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: i128) -> bool {
    amount > 0
}

/// Validate that a reward period length can be configured
pub fn validate_rewards_duration(duration: u64) -> bool {
    duration > 0 && duration <= MAX_REWARDS_DURATION
}

/// Whether `rate` tokens per second can be pushed through the accumulator
/// update for the longest configurable period without overflowing.
pub fn rate_fits_accumulator(rate: i128) -> bool {
    rate.checked_mul(MAX_REWARDS_DURATION as i128)
        .and_then(|emitted| emitted.checked_mul(REWARD_SCALE))
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tier_has_no_policy() {
        assert!(lock_policy(0).is_some());
        assert!(lock_policy(LOCK_POLICIES.len() as u32).is_none());
        assert!(lock_policy(u32::MAX).is_none());
    }

    #[test]
    fn every_tier_has_a_cooldown() {
        for policy in LOCK_POLICIES.iter() {
            assert!(policy.cooldown > 0);
            assert!(policy.boost_bps >= 0);
        }
    }

    #[test]
    fn boost_rounds_down() {
        let policy = lock_policy(1).unwrap(); // +10%
        assert_eq!(policy.boosted(100), Some(110));
        assert_eq!(policy.boosted(9), Some(9)); // 0.9 bonus truncates to 0
        assert_eq!(policy.boosted(19), Some(20));

        let doubled = lock_policy(4).unwrap();
        assert_eq!(doubled.boosted(12_345), Some(24_690));
        assert_eq!(lock_policy(0).unwrap().boosted(777), Some(777));
    }

    #[test]
    fn boost_overflow_is_reported() {
        assert_eq!(lock_policy(4).unwrap().boosted(i128::MAX), None);
    }

    #[test]
    fn mul_div_floor_truncates() {
        assert_eq!(mul_div_floor(10, 10, 3), Some(33));
        assert_eq!(mul_div_floor(1, 1, 2), Some(0));
        assert_eq!(mul_div_floor(5, 5, 0), None);
        assert_eq!(mul_div_floor(i128::MAX, 2, 1), None);
    }

    #[test]
    fn mul_scaled_floor_matches_direct_product() {
        assert_eq!(mul_scaled_floor(3, REWARD_SCALE / 2), Some(1));
        assert_eq!(mul_scaled_floor(7, 3 * REWARD_SCALE), Some(21));
        assert_eq!(
            mul_scaled_floor(123_456_789, 987_654_321_000),
            mul_div_floor(123_456_789, 987_654_321_000, REWARD_SCALE)
        );
        assert_eq!(
            mul_scaled_floor(REWARD_SCALE + 5, 2 * REWARD_SCALE + 7),
            Some(2 * REWARD_SCALE + 17)
        );
        assert_eq!(mul_scaled_floor(-1, 1), None);
    }

    #[test]
    fn mul_scaled_floor_survives_wide_products() {
        // 1e3 * 3.4e35 does not fit in an i128, the scaled result does
        let delta = 340_000_000_000_000_000_000_000_000_000_000_000i128;
        assert_eq!(mul_div_floor(1_000, delta, REWARD_SCALE), None);
        assert_eq!(
            mul_scaled_floor(1_000, delta),
            Some(340_000_000_000_000_000_000)
        );
        assert_eq!(mul_scaled_floor(i128::MAX, i128::MAX), None);
    }

    #[test]
    fn accumulator_rate_bound() {
        assert!(rate_fits_accumulator(1_000_000_000));
        assert!(!rate_fits_accumulator(i128::MAX / REWARD_SCALE));
    }

    #[test]
    fn duration_bounds() {
        assert!(!validate_rewards_duration(0));
        assert!(validate_rewards_duration(7 * SECONDS_PER_DAY));
        assert!(validate_rewards_duration(MAX_REWARDS_DURATION));
        assert!(!validate_rewards_duration(MAX_REWARDS_DURATION + 1));
    }
}
