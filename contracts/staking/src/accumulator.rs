use bondlock_shared::{
    mul_div_floor, rate_fits_accumulator, validate_positive_amount, REWARD_SCALE,
};
use soroban_sdk::contracttype;

use crate::error::BondingError;
use crate::position::Position;

/// What happens to the reward pool once the program is terminated.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RewardDisposition {
    Claimable,
    Swept,
}

/// Lifecycle of the whole program. `Terminated` is terminal.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgramPhase {
    Running,
    Paused,
    Terminated(RewardDisposition),
}

impl ProgramPhase {
    /// Gate for every user-facing mutation.
    pub fn require_running(&self) -> Result<(), BondingError> {
        match self {
            ProgramPhase::Running => Ok(()),
            ProgramPhase::Paused => Err(BondingError::ContractPaused),
            ProgramPhase::Terminated(_) => Err(BondingError::ProgramTerminated),
        }
    }

    /// Gate for the emergency exit paths.
    pub fn require_terminated(&self) -> Result<RewardDisposition, BondingError> {
        match self {
            ProgramPhase::Terminated(disposition) => Ok(*disposition),
            _ => Err(BondingError::ProgramNotTerminated),
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, ProgramPhase::Terminated(_))
    }
}

/// Process-wide reward accounting. Every mutation of the totals or the
/// accumulator goes through the methods below so the invariants are checked
/// in one place.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GlobalState {
    pub total_principal: i128,
    pub total_boosted_principal: i128,
    pub reward_rate: i128, // Reward units per second until `period_end`
    pub reward_per_boosted_unit: i128, // Scaled by REWARD_SCALE, never decreases
    pub last_settlement_time: u64,
    pub period_end: u64,
    pub undistributed_rewards: i128, // Deferred into the next funding
    pub total_funded: i128,
    pub total_credited: i128, // Settled into positions
    pub total_paid: i128,
    pub phase: ProgramPhase,
}

impl GlobalState {
    pub fn new(now: u64) -> Self {
        Self {
            total_principal: 0,
            total_boosted_principal: 0,
            reward_rate: 0,
            reward_per_boosted_unit: 0,
            last_settlement_time: now,
            period_end: 0,
            undistributed_rewards: 0,
            total_funded: 0,
            total_credited: 0,
            total_paid: 0,
            phase: ProgramPhase::Running,
        }
    }

    pub fn last_time_reward_applicable(&self, now: u64) -> u64 {
        now.min(self.period_end)
    }

    /// Whether a funded period still has time left to earn in.
    pub fn has_active_period(&self, now: u64) -> bool {
        self.reward_rate > 0 && now <= self.period_end
    }

    /// Catch the accumulator up to `now`.
    ///
    /// Emission during an interval with no boosted principal is parked in
    /// `undistributed_rewards` and folded into the next funding instead of
    /// being handed out retroactively.
    pub fn settle(&mut self, now: u64) -> Result<(), BondingError> {
        let effective = self.last_time_reward_applicable(now);
        if effective <= self.last_settlement_time {
            return Ok(());
        }

        let elapsed = (effective - self.last_settlement_time) as i128;
        let emitted = elapsed
            .checked_mul(self.reward_rate)
            .ok_or(BondingError::NumericOverflow)?;

        if self.total_boosted_principal > 0 {
            let increment = mul_div_floor(emitted, REWARD_SCALE, self.total_boosted_principal)
                .ok_or(BondingError::NumericOverflow)?;
            self.reward_per_boosted_unit = self
                .reward_per_boosted_unit
                .checked_add(increment)
                .ok_or(BondingError::NumericOverflow)?;
        } else {
            self.undistributed_rewards = self
                .undistributed_rewards
                .checked_add(emitted)
                .ok_or(BondingError::NumericOverflow)?;
        }

        self.last_settlement_time = effective;
        Ok(())
    }

    /// Start a new period of `duration` seconds funded with `amount`.
    ///
    /// Whatever the running period had not yet emitted, plus the deferred
    /// bucket, is rolled into the new rate. The remainder of the integer
    /// division goes back into the bucket. Returns the new rate.
    pub fn schedule_funding(
        &mut self,
        amount: i128,
        duration: u64,
        now: u64,
    ) -> Result<i128, BondingError> {
        if !validate_positive_amount(amount) {
            return Err(BondingError::InvalidAmount);
        }
        if duration == 0 {
            return Err(BondingError::InvalidDuration);
        }
        if amount < duration as i128 {
            return Err(BondingError::RewardTooSmall);
        }

        self.settle(now)?;

        let mut pool = amount
            .checked_add(self.undistributed_rewards)
            .ok_or(BondingError::NumericOverflow)?;
        if now < self.period_end {
            let leftover = ((self.period_end - now) as i128)
                .checked_mul(self.reward_rate)
                .ok_or(BondingError::NumericOverflow)?;
            pool = pool.checked_add(leftover).ok_or(BondingError::NumericOverflow)?;
        }

        let rate = pool / duration as i128;
        if !rate_fits_accumulator(rate) {
            return Err(BondingError::RewardRateTooHigh);
        }
        let scheduled = rate
            .checked_mul(duration as i128)
            .ok_or(BondingError::NumericOverflow)?;

        self.undistributed_rewards = pool - scheduled;
        self.reward_rate = rate;
        self.last_settlement_time = now;
        self.period_end = now
            .checked_add(duration)
            .ok_or(BondingError::NumericOverflow)?;
        self.total_funded = self
            .total_funded
            .checked_add(amount)
            .ok_or(BondingError::NumericOverflow)?;

        Ok(rate)
    }

    /// Settle up to `now` and stop all further accrual. Emission that the
    /// cut-off period will never make is moved to the deferred bucket.
    pub fn freeze(&mut self, now: u64) -> Result<(), BondingError> {
        self.settle(now)?;
        if now < self.period_end {
            let unemitted = ((self.period_end - now) as i128)
                .checked_mul(self.reward_rate)
                .ok_or(BondingError::NumericOverflow)?;
            self.undistributed_rewards = self
                .undistributed_rewards
                .checked_add(unemitted)
                .ok_or(BondingError::NumericOverflow)?;
            self.period_end = now;
        }
        Ok(())
    }

    /// A settled copy for read-only queries.
    pub fn preview(&self, now: u64) -> Result<GlobalState, BondingError> {
        let mut state = self.clone();
        state.settle(now)?;
        Ok(state)
    }

    pub fn reward_for_duration(&self, duration: u64) -> Result<i128, BondingError> {
        self.reward_rate
            .checked_mul(duration as i128)
            .ok_or(BondingError::NumericOverflow)
    }

    /// Bring `position` up to the current accumulator and book what it earned.
    pub fn settle_position(&mut self, position: &mut Position) -> Result<i128, BondingError> {
        let earned = position.accrue(self.reward_per_boosted_unit)?;
        self.total_credited = self
            .total_credited
            .checked_add(earned)
            .ok_or(BondingError::NumericOverflow)?;
        if self.total_credited > self.total_funded {
            return Err(BondingError::RewardsExceedFunding);
        }
        Ok(earned)
    }

    pub fn record_payout(&mut self, amount: i128) -> Result<(), BondingError> {
        self.total_paid = self
            .total_paid
            .checked_add(amount)
            .ok_or(BondingError::NumericOverflow)?;
        if self.total_paid > self.total_credited {
            return Err(BondingError::RewardsExceedFunding);
        }
        Ok(())
    }

    pub fn credit(&mut self, principal: i128, boosted: i128) -> Result<(), BondingError> {
        self.total_principal = self
            .total_principal
            .checked_add(principal)
            .ok_or(BondingError::NumericOverflow)?;
        self.total_boosted_principal = self
            .total_boosted_principal
            .checked_add(boosted)
            .ok_or(BondingError::NumericOverflow)?;
        self.check_totals()
    }

    pub fn debit(&mut self, principal: i128, boosted: i128) -> Result<(), BondingError> {
        if principal > self.total_principal || boosted > self.total_boosted_principal {
            return Err(BondingError::BoostUnderflow);
        }
        self.total_principal -= principal;
        self.total_boosted_principal -= boosted;
        self.check_totals()
    }

    /// Remove `delta` of boost weight, never more than was ever credited.
    pub fn strip_boost(&mut self, delta: i128) -> Result<(), BondingError> {
        let boost_outstanding = self.total_boosted_principal - self.total_principal;
        if delta < 0 || delta > boost_outstanding {
            return Err(BondingError::BoostUnderflow);
        }
        self.total_boosted_principal -= delta;
        self.check_totals()
    }

    pub fn restore_boost(&mut self, delta: i128) -> Result<(), BondingError> {
        if delta < 0 {
            return Err(BondingError::BoostUnderflow);
        }
        self.total_boosted_principal = self
            .total_boosted_principal
            .checked_add(delta)
            .ok_or(BondingError::NumericOverflow)?;
        self.check_totals()
    }

    fn check_totals(&self) -> Result<(), BondingError> {
        let empty_mismatch = (self.total_principal == 0) != (self.total_boosted_principal == 0);
        if empty_mismatch
            || self.total_principal < 0
            || self.total_boosted_principal < self.total_principal
        {
            return Err(BondingError::BoostedPrincipalMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;
    const WEEK: u64 = 7 * DAY;

    fn funded(amount: i128, now: u64) -> GlobalState {
        let mut state = GlobalState::new(now);
        state.schedule_funding(amount, WEEK, now).unwrap();
        state
    }

    #[test]
    fn funding_sets_rate_and_period() {
        let state = funded(WEEK as i128 * 1_000, 100);
        assert_eq!(state.reward_rate, 1_000);
        assert_eq!(state.period_end, 100 + WEEK);
        assert_eq!(state.last_settlement_time, 100);
        assert_eq!(state.undistributed_rewards, 0);
        assert_eq!(state.total_funded, WEEK as i128 * 1_000);
    }

    #[test]
    fn funding_remainder_is_deferred() {
        let state = funded(WEEK as i128 * 10 + 7, 0);
        assert_eq!(state.reward_rate, 10);
        assert_eq!(state.undistributed_rewards, 7);
    }

    #[test]
    fn funding_rejects_small_and_oversized_amounts() {
        let mut state = GlobalState::new(0);
        assert_eq!(state.schedule_funding(0, WEEK, 0), Err(BondingError::InvalidAmount));
        assert_eq!(
            state.schedule_funding(WEEK as i128 - 1, WEEK, 0),
            Err(BondingError::RewardTooSmall)
        );
        assert_eq!(
            state.schedule_funding(i128::MAX / 2, WEEK, 0),
            Err(BondingError::RewardRateTooHigh)
        );
        assert_eq!(state, GlobalState::new(0));
    }

    #[test]
    fn mid_period_top_up_rolls_leftover_into_rate() {
        let mut state = funded(WEEK as i128 * 1_000, 0);
        state.credit(10, 10).unwrap();
        let rate = state.schedule_funding(WEEK as i128 * 1_000, WEEK, WEEK / 2).unwrap();
        assert_eq!(rate, 1_500);
        assert_eq!(state.period_end, WEEK / 2 + WEEK);
    }

    #[test]
    fn settle_divides_emission_by_boosted_total() {
        let mut state = funded(WEEK as i128 * 1_000, 0);
        state.credit(500, 1_000).unwrap();
        state.settle(10).unwrap();
        // 10s * 1000/s spread over 1000 boosted units
        assert_eq!(state.reward_per_boosted_unit, 10 * REWARD_SCALE);
        assert_eq!(state.last_settlement_time, 10);
    }

    #[test]
    fn settle_stops_at_period_end() {
        let mut state = funded(WEEK as i128, 0);
        state.credit(1, 1).unwrap();
        state.settle(WEEK * 3).unwrap();
        assert_eq!(state.last_settlement_time, WEEK);
        assert_eq!(state.reward_per_boosted_unit, WEEK as i128 * REWARD_SCALE);

        let before = state.clone();
        state.settle(WEEK * 4).unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn idle_emission_is_deferred_to_next_funding() {
        let mut state = funded(WEEK as i128 * 100, 0);
        state.settle(WEEK / 2).unwrap();
        assert_eq!(state.reward_per_boosted_unit, 0);
        assert_eq!(state.undistributed_rewards, (WEEK / 2) as i128 * 100);

        state.settle(WEEK).unwrap();
        let rate = state.schedule_funding(WEEK as i128 * 100, WEEK, WEEK).unwrap();
        assert_eq!(rate, 200);
        assert_eq!(state.undistributed_rewards, 0);
    }

    #[test]
    fn accumulator_never_decreases() {
        let mut state = funded(WEEK as i128 * 1_000, 0);
        let mut last = state.reward_per_boosted_unit;
        let steps: [(u64, i128, i128); 5] = [
            (10, 100, 150),
            (50, 1, 1),
            (400, 7_000, 9_000),
            (WEEK - 1, 3, 3),
            (WEEK + 50, 0, 0),
        ];
        for (now, principal, boosted) in steps.iter() {
            state.settle(*now).unwrap();
            assert!(state.reward_per_boosted_unit >= last);
            last = state.reward_per_boosted_unit;
            state.credit(*principal, *boosted).unwrap();
        }
    }

    #[test]
    fn freeze_stops_accrual_and_defers_unemitted() {
        let mut state = funded(WEEK as i128 * 10, 0);
        state.credit(1, 1).unwrap();
        state.freeze(WEEK / 2).unwrap();
        assert_eq!(state.period_end, WEEK / 2);
        assert_eq!(state.undistributed_rewards, (WEEK / 2) as i128 * 10);

        let frozen = state.reward_per_boosted_unit;
        state.settle(WEEK).unwrap();
        assert_eq!(state.reward_per_boosted_unit, frozen);
    }

    #[test]
    fn totals_reject_mismatched_boost() {
        let mut state = GlobalState::new(0);
        assert_eq!(state.credit(0, 5), Err(BondingError::BoostedPrincipalMismatch));

        let mut state = GlobalState::new(0);
        state.credit(100, 150).unwrap();
        assert_eq!(state.strip_boost(51), Err(BondingError::BoostUnderflow));
        state.strip_boost(50).unwrap();
        assert_eq!(state.total_boosted_principal, 100);
        state.restore_boost(50).unwrap();
        assert_eq!(state.debit(101, 150), Err(BondingError::BoostUnderflow));
        state.debit(100, 150).unwrap();
        assert_eq!(state.total_principal, 0);
        assert_eq!(state.total_boosted_principal, 0);
    }

    #[test]
    fn payouts_cannot_exceed_credited_rewards() {
        let mut state = funded(WEEK as i128, 0);
        state.total_credited = 10;
        state.record_payout(10).unwrap();
        assert_eq!(state.record_payout(1), Err(BondingError::RewardsExceedFunding));
    }

    #[test]
    fn phase_gates() {
        assert_eq!(ProgramPhase::Running.require_running(), Ok(()));
        assert_eq!(ProgramPhase::Paused.require_running(), Err(BondingError::ContractPaused));
        let terminated = ProgramPhase::Terminated(RewardDisposition::Swept);
        assert_eq!(terminated.require_running(), Err(BondingError::ProgramTerminated));
        assert_eq!(terminated.require_terminated(), Ok(RewardDisposition::Swept));
        assert_eq!(
            ProgramPhase::Paused.require_terminated(),
            Err(BondingError::ProgramNotTerminated)
        );
        assert!(terminated.is_terminated());
    }
}
