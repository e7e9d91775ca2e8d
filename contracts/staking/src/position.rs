use bondlock_shared::{lock_policy, mul_scaled_floor, LockPolicy};
use soroban_sdk::contracttype;

use crate::error::BondingError;

/// One deposit. Lives under (depositor, position id) and is never shared.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Position {
    pub principal: i128,
    pub boosted_principal: i128,
    pub reward_snapshot: i128, // Accumulator value at the last settlement
    pub unclaimed_reward: i128,
    pub unbond_ready_at: u64, // 0 while locked
    pub lock_tier: u32,
    pub opened_at: u64,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PositionState {
    Locked,
    Unbonding,
    Withdrawable,
    Closed,
}

impl Position {
    /// A fresh locked position with the tier's boost applied.
    pub fn open(
        principal: i128,
        lock_tier: u32,
        reward_per_boosted_unit: i128,
        now: u64,
    ) -> Result<Position, BondingError> {
        let policy = lock_policy(lock_tier).ok_or(BondingError::InvalidLockTier)?;
        let boosted_principal = policy
            .boosted(principal)
            .ok_or(BondingError::NumericOverflow)?;

        Ok(Position {
            principal,
            boosted_principal,
            reward_snapshot: reward_per_boosted_unit,
            unclaimed_reward: 0,
            unbond_ready_at: 0,
            lock_tier,
            opened_at: now,
        })
    }

    pub fn policy(&self) -> Result<LockPolicy, BondingError> {
        lock_policy(self.lock_tier).ok_or(BondingError::InvalidLockTier)
    }

    pub fn is_closed(&self) -> bool {
        self.principal == 0 && self.boosted_principal == 0
    }

    pub fn state(&self, now: u64) -> PositionState {
        if self.is_closed() {
            PositionState::Closed
        } else if self.unbond_ready_at == 0 {
            PositionState::Locked
        } else if now < self.unbond_ready_at {
            PositionState::Unbonding
        } else {
            PositionState::Withdrawable
        }
    }

    /// Credit what the boosted principal earned since the last snapshot.
    pub fn accrue(&mut self, reward_per_boosted_unit: i128) -> Result<i128, BondingError> {
        let delta = reward_per_boosted_unit
            .checked_sub(self.reward_snapshot)
            .filter(|delta| *delta >= 0)
            .ok_or(BondingError::NumericOverflow)?;
        let earned = mul_scaled_floor(self.boosted_principal, delta)
            .ok_or(BondingError::NumericOverflow)?;

        self.unclaimed_reward = self
            .unclaimed_reward
            .checked_add(earned)
            .ok_or(BondingError::NumericOverflow)?;
        self.reward_snapshot = reward_per_boosted_unit;
        Ok(earned)
    }

    /// Locked -> Unbonding. Strips the boost and returns the weight removed.
    pub fn begin_unbonding(&mut self, now: u64) -> Result<i128, BondingError> {
        if self.is_closed() {
            return Err(BondingError::PositionClosed);
        }
        if self.unbond_ready_at != 0 {
            return Err(BondingError::AlreadyUnbonding);
        }
        let policy = self.policy()?;

        let stripped = self.boosted_principal - self.principal;
        if stripped < 0 {
            return Err(BondingError::BoostedPrincipalMismatch);
        }
        self.boosted_principal = self.principal;
        self.unbond_ready_at = now
            .checked_add(policy.cooldown)
            .ok_or(BondingError::NumericOverflow)?;
        Ok(stripped)
    }

    /// Unbonding/Withdrawable -> Locked. Reinstates the boost from the
    /// original tier and returns the weight added back.
    pub fn cancel_unbonding(&mut self) -> Result<i128, BondingError> {
        if self.is_closed() {
            return Err(BondingError::PositionClosed);
        }
        if self.unbond_ready_at == 0 {
            return Err(BondingError::NotUnbonding);
        }
        let boosted = self
            .policy()?
            .boosted(self.principal)
            .ok_or(BondingError::NumericOverflow)?;

        let restored = boosted - self.boosted_principal;
        self.boosted_principal = boosted;
        self.unbond_ready_at = 0;
        Ok(restored)
    }

    /// Withdrawable -> Closed. Returns the (principal, boosted) removed.
    pub fn close(&mut self, now: u64) -> Result<(i128, i128), BondingError> {
        if self.is_closed() {
            return Err(BondingError::PositionClosed);
        }
        if self.unbond_ready_at == 0 {
            return Err(BondingError::PositionLocked);
        }
        if now < self.unbond_ready_at {
            return Err(BondingError::CooldownActive);
        }
        Ok(self.force_close())
    }

    /// Close from any state, ignoring lock and cooldown.
    pub fn force_close(&mut self) -> (i128, i128) {
        let removed = (self.principal, self.boosted_principal);
        self.principal = 0;
        self.boosted_principal = 0;
        removed
    }

    pub fn take_reward(&mut self) -> i128 {
        core::mem::take(&mut self.unclaimed_reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondlock_shared::{REWARD_SCALE, SECONDS_PER_DAY};

    #[test]
    fn open_applies_tier_boost() {
        let position = Position::open(1_000, 3, 42, 7).unwrap();
        assert_eq!(position.boosted_principal, 1_500);
        assert_eq!(position.reward_snapshot, 42);
        assert_eq!(position.opened_at, 7);
        assert_eq!(position.state(7), PositionState::Locked);

        assert_eq!(Position::open(1_000, 99, 0, 0), Err(BondingError::InvalidLockTier));
    }

    #[test]
    fn accrue_uses_boosted_principal() {
        let mut position = Position::open(100, 4, 0, 0).unwrap(); // 200 boosted
        let earned = position.accrue(3 * REWARD_SCALE).unwrap();
        assert_eq!(earned, 600);
        assert_eq!(position.unclaimed_reward, 600);
        assert_eq!(position.accrue(3 * REWARD_SCALE).unwrap(), 0);
        assert_eq!(position.take_reward(), 600);
        assert_eq!(position.unclaimed_reward, 0);
    }

    #[test]
    fn accrue_rounds_down() {
        let mut position = Position::open(3, 0, 0, 0).unwrap();
        // 3 * 0.5 = 1.5 -> 1
        assert_eq!(position.accrue(REWARD_SCALE / 2).unwrap(), 1);
    }

    #[test]
    fn accrue_handles_deltas_wider_than_one_period() {
        // boosted * delta alone would overflow an i128
        let mut position = Position::open(1_000, 0, 0, 0).unwrap();
        let delta = i128::MAX / 500;
        let earned = position.accrue(delta).unwrap();
        assert_eq!(earned, 1_000 * (delta / REWARD_SCALE) + 1_000 * (delta % REWARD_SCALE) / REWARD_SCALE);
        assert_eq!(position.reward_snapshot, delta);
    }

    #[test]
    fn accrue_rejects_accumulator_going_backwards() {
        let mut position = Position::open(3, 0, 10, 0).unwrap();
        assert_eq!(position.accrue(9), Err(BondingError::NumericOverflow));
    }

    #[test]
    fn unbond_then_cancel_is_symmetric() {
        let mut position = Position::open(1_000, 2, 0, 0).unwrap();
        let stripped = position.begin_unbonding(100).unwrap();
        assert_eq!(stripped, 250);
        assert_eq!(position.boosted_principal, 1_000);
        assert_eq!(position.unbond_ready_at, 100 + 30 * SECONDS_PER_DAY);
        assert_eq!(position.state(101), PositionState::Unbonding);
        assert_eq!(position.begin_unbonding(101), Err(BondingError::AlreadyUnbonding));

        let restored = position.cancel_unbonding().unwrap();
        assert_eq!(restored, 250);
        assert_eq!(position.boosted_principal, 1_250);
        assert_eq!(position.unbond_ready_at, 0);
        assert_eq!(position.cancel_unbonding(), Err(BondingError::NotUnbonding));
    }

    #[test]
    fn close_requires_elapsed_cooldown() {
        let mut position = Position::open(500, 0, 0, 0).unwrap();
        assert_eq!(position.close(0), Err(BondingError::PositionLocked));

        position.begin_unbonding(10).unwrap();
        let ready = 10 + SECONDS_PER_DAY;
        assert_eq!(position.close(ready - 1), Err(BondingError::CooldownActive));
        assert_eq!(position.state(ready), PositionState::Withdrawable);

        assert_eq!(position.close(ready), Ok((500, 500)));
        assert_eq!(position.state(ready), PositionState::Closed);
        assert_eq!(position.close(ready), Err(BondingError::PositionClosed));
        assert_eq!(position.begin_unbonding(ready), Err(BondingError::PositionClosed));
    }

    #[test]
    fn force_close_ignores_lock() {
        let mut position = Position::open(800, 4, 0, 0).unwrap();
        assert_eq!(position.force_close(), (800, 1_600));
        assert!(position.is_closed());
        assert_eq!(position.force_close(), (0, 0));
    }
}
