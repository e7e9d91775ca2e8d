#![no_std]
use bondlock_shared::{
    self as shared, validate_positive_amount, validate_rewards_duration, LockPolicy,
};
use soroban_sdk::{contract, contractimpl, contracttype, log, token, Address, Env, Vec};

mod accumulator;
mod error;
mod events;
mod position;
mod storage;

pub use accumulator::{GlobalState, ProgramPhase, RewardDisposition};
pub use error::{BondingError, ErrorClass};
pub use events::{
    ClaimedEvent, EmergencyEvent, RewardsFundedEvent, StakedEvent, TerminatedEvent,
    UnbondCancelledEvent, UnbondEvent, UnstakedEvent,
};
pub use position::{Position, PositionState};

use error::Reported;

// Data Types
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BondingConfig {
    pub admin: Address,
    pub reward_distributor: Address,
    pub stake_token: Address,
    pub reward_token: Address,
    pub rewards_duration: u64, // Length of the next funded period, in seconds
    pub minimum_deposit: i128,
}

#[contract]
pub struct BondingContract;

#[contractimpl]
impl BondingContract {
    /// Initialize the bonding contract
    pub fn initialize(
        env: Env,
        admin: Address,
        stake_token: Address,
        reward_token: Address,
        rewards_duration: u64,
        minimum_deposit: i128,
    ) -> Result<(), BondingError> {
        if storage::is_initialized(&env) {
            return Err(BondingError::AlreadyInitialized);
        }

        admin.require_auth();

        if !validate_rewards_duration(rewards_duration) {
            return Err(BondingError::InvalidDuration);
        }
        if minimum_deposit < 0 {
            return Err(BondingError::InvalidConfiguration);
        }

        let config = BondingConfig {
            admin: admin.clone(),
            reward_distributor: admin.clone(),
            stake_token,
            reward_token,
            rewards_duration,
            minimum_deposit,
        };

        storage::write_config(&env, &config);
        storage::write_state(&env, &GlobalState::new(env.ledger().timestamp()));
        storage::write_version(&env);

        log!(&env, "Bonding contract initialized by admin: {}", admin);

        Ok(())
    }

    // Bonding

    /// Open a new locked position. Returns the position id.
    pub fn stake(
        env: Env,
        user: Address,
        amount: i128,
        lock_tier: u32,
    ) -> Result<u32, BondingError> {
        user.require_auth();

        let (config, mut state, now) = Self::settled(&env)?;
        state.phase.require_running()?;

        if !validate_positive_amount(amount) {
            return Err(BondingError::InvalidAmount);
        }
        if amount < config.minimum_deposit {
            log!(&env, "Deposit {} is below the minimum of {}", amount, config.minimum_deposit);
            return Err(BondingError::BelowMinimumDeposit);
        }

        let position =
            Position::open(amount, lock_tier, state.reward_per_boosted_unit, now).reported(&env)?;

        if !state.has_active_period(now) {
            return Err(BondingError::NoActiveRewardPeriod);
        }

        state
            .credit(position.principal, position.boosted_principal)
            .reported(&env)?;
        let position_id = storage::append_position(&env, &user, &position)?;
        storage::write_state(&env, &state);

        token::Client::new(&env, &config.stake_token).transfer(
            &user,
            &env.current_contract_address(),
            &amount,
        );

        events::staked(
            &env,
            StakedEvent {
                user: user.clone(),
                position_id,
                amount,
                boosted_amount: position.boosted_principal,
                lock_tier,
                timestamp: now,
            },
        );

        log!(&env, "User {} staked {} in tier {} as position {}", user, amount, lock_tier, position_id);

        Ok(position_id)
    }

    /// Start the cooldown on a locked position and drop its boost.
    pub fn unbond(env: Env, user: Address, position_id: u32) -> Result<(), BondingError> {
        user.require_auth();

        let (_, mut state, now) = Self::settled(&env)?;
        state.phase.require_running()?;

        let mut position = storage::read_position(&env, &user, position_id)?;
        let ready_at = Self::unbond_position(&env, &mut state, &mut position, now)?;

        storage::write_position(&env, &user, position_id, &position);
        storage::write_state(&env, &state);

        events::unbond_started(&env, user.clone(), position_id, ready_at);
        log!(&env, "User {} unbonding position {} until {}", user, position_id, ready_at);

        Ok(())
    }

    /// Unbond every locked position of `user`. Returns how many were unbonded.
    pub fn unbond_all(env: Env, user: Address) -> Result<u32, BondingError> {
        user.require_auth();

        let (_, mut state, now) = Self::settled(&env)?;
        state.phase.require_running()?;

        let mut unbonded = 0u32;
        for position_id in 0..storage::position_count(&env, &user) {
            let mut position = storage::read_position(&env, &user, position_id)?;
            if position.state(now) != PositionState::Locked {
                continue;
            }

            let ready_at = Self::unbond_position(&env, &mut state, &mut position, now)?;
            storage::write_position(&env, &user, position_id, &position);
            events::unbond_started(&env, user.clone(), position_id, ready_at);
            unbonded += 1;
        }

        storage::write_state(&env, &state);
        log!(&env, "User {} started unbonding {} positions", user, unbonded);

        Ok(unbonded)
    }

    /// Return an unbonding position to the locked state with its boost restored.
    pub fn cancel_unbonding(env: Env, user: Address, position_id: u32) -> Result<(), BondingError> {
        user.require_auth();

        let (_, mut state, _) = Self::settled(&env)?;
        state.phase.require_running()?;

        let mut position = storage::read_position(&env, &user, position_id)?;
        Self::rebond_position(&env, &mut state, &mut position)?;

        storage::write_position(&env, &user, position_id, &position);
        storage::write_state(&env, &state);

        events::unbond_cancelled(&env, user.clone(), position_id, position.boosted_principal);
        log!(&env, "User {} cancelled unbonding of position {}", user, position_id);

        Ok(())
    }

    /// Cancel unbonding on every position of `user` that is unbonding.
    pub fn cancel_unbonding_all(env: Env, user: Address) -> Result<u32, BondingError> {
        user.require_auth();

        let (_, mut state, now) = Self::settled(&env)?;
        state.phase.require_running()?;

        let mut rebonded = 0u32;
        for position_id in 0..storage::position_count(&env, &user) {
            let mut position = storage::read_position(&env, &user, position_id)?;
            match position.state(now) {
                PositionState::Unbonding | PositionState::Withdrawable => {}
                _ => continue,
            }

            Self::rebond_position(&env, &mut state, &mut position)?;
            storage::write_position(&env, &user, position_id, &position);
            events::unbond_cancelled(&env, user.clone(), position_id, position.boosted_principal);
            rebonded += 1;
        }

        storage::write_state(&env, &state);
        log!(&env, "User {} cancelled unbonding on {} positions", user, rebonded);

        Ok(rebonded)
    }

    /// Close a position whose cooldown has elapsed, returning principal and
    /// reward. Returns the reward paid.
    pub fn unstake(env: Env, user: Address, position_id: u32) -> Result<i128, BondingError> {
        user.require_auth();

        let (config, mut state, now) = Self::settled(&env)?;
        state.phase.require_running()?;

        let mut position = storage::read_position(&env, &user, position_id)?;
        if position.state(now) == PositionState::Unbonding {
            log!(&env, "Position {} unlocks at {}", position_id, position.unbond_ready_at);
        }
        let (principal, reward) = Self::unstake_position(&env, &mut state, &mut position, now)?;

        storage::write_position(&env, &user, position_id, &position);
        storage::write_state(&env, &state);

        Self::pay_out(&env, &config.stake_token, &user, principal);
        Self::pay_out(&env, &config.reward_token, &user, reward);

        events::unstaked(&env, user.clone(), position_id, principal, reward);
        log!(&env, "User {} unstaked {} with {} reward", user, principal, reward);

        Ok(reward)
    }

    /// Close every withdrawable position of `user`. Returns the total reward paid.
    pub fn unstake_all(env: Env, user: Address) -> Result<i128, BondingError> {
        user.require_auth();

        let (config, mut state, now) = Self::settled(&env)?;
        state.phase.require_running()?;

        let mut total_principal = 0i128;
        let mut total_reward = 0i128;
        for position_id in 0..storage::position_count(&env, &user) {
            let mut position = storage::read_position(&env, &user, position_id)?;
            if position.state(now) != PositionState::Withdrawable {
                continue;
            }

            let (principal, reward) =
                Self::unstake_position(&env, &mut state, &mut position, now)?;
            storage::write_position(&env, &user, position_id, &position);
            events::unstaked(&env, user.clone(), position_id, principal, reward);

            total_principal = total_principal
                .checked_add(principal)
                .ok_or(BondingError::NumericOverflow)?;
            total_reward = total_reward
                .checked_add(reward)
                .ok_or(BondingError::NumericOverflow)?;
        }

        storage::write_state(&env, &state);

        Self::pay_out(&env, &config.stake_token, &user, total_principal);
        Self::pay_out(&env, &config.reward_token, &user, total_reward);

        log!(&env, "User {} unstaked {} with {} reward", user, total_principal, total_reward);

        Ok(total_reward)
    }

    // Rewards

    /// Pay out the reward accrued by one position without touching its principal.
    pub fn claim(env: Env, user: Address, position_id: u32) -> Result<i128, BondingError> {
        user.require_auth();

        let (config, mut state, _) = Self::settled(&env)?;
        state.phase.require_running()?;

        let mut position = storage::read_position(&env, &user, position_id)?;
        if position.is_closed() {
            return Err(BondingError::PositionClosed);
        }
        let reward = Self::claim_position(&env, &mut state, &mut position)?;

        storage::write_position(&env, &user, position_id, &position);
        storage::write_state(&env, &state);

        Self::pay_out(&env, &config.reward_token, &user, reward);

        events::claimed(&env, user.clone(), position_id, reward);
        log!(&env, "User {} claimed {} from position {}", user, reward, position_id);

        Ok(reward)
    }

    /// Claim across every open position of `user`.
    pub fn claim_all(env: Env, user: Address) -> Result<i128, BondingError> {
        user.require_auth();

        let (config, mut state, _) = Self::settled(&env)?;
        state.phase.require_running()?;

        let mut total_reward = 0i128;
        for position_id in 0..storage::position_count(&env, &user) {
            let mut position = storage::read_position(&env, &user, position_id)?;
            if position.is_closed() {
                continue;
            }

            let reward = Self::claim_position(&env, &mut state, &mut position)?;
            storage::write_position(&env, &user, position_id, &position);
            if reward > 0 {
                events::claimed(&env, user.clone(), position_id, reward);
            }
            total_reward = total_reward
                .checked_add(reward)
                .ok_or(BondingError::NumericOverflow)?;
        }

        storage::write_state(&env, &state);

        Self::pay_out(&env, &config.reward_token, &user, total_reward);
        log!(&env, "User {} claimed {} in total", user, total_reward);

        Ok(total_reward)
    }

    /// Start, extend or top up a reward period (admin or distributor only).
    pub fn fund_rewards(env: Env, caller: Address, amount: i128) -> Result<(), BondingError> {
        caller.require_auth();

        let (config, mut state, now) = Self::settled(&env)?;
        if caller != config.admin && caller != config.reward_distributor {
            return Err(BondingError::Unauthorized);
        }
        if state.phase.is_terminated() {
            return Err(BondingError::ProgramTerminated);
        }

        let reward_rate = match state.schedule_funding(amount, config.rewards_duration, now) {
            Ok(rate) => rate,
            Err(BondingError::RewardTooSmall) => {
                log!(
                    &env,
                    "Reward {} must be at least the period length {}",
                    amount,
                    config.rewards_duration
                );
                return Err(BondingError::RewardTooSmall);
            }
            Err(err) => return Err::<(), _>(err).reported(&env),
        };

        storage::write_state(&env, &state);

        token::Client::new(&env, &config.reward_token).transfer(
            &caller,
            &env.current_contract_address(),
            &amount,
        );

        events::rewards_funded(&env, caller.clone(), amount, reward_rate, state.period_end);
        log!(&env, "Rewards funded with {} by {}, rate {} until {}", amount, caller, reward_rate, state.period_end);

        Ok(())
    }

    // Admin

    /// Set the length of the next funded period. Only between periods.
    pub fn set_rewards_duration(env: Env, admin: Address, duration: u64) -> Result<(), BondingError> {
        admin.require_auth();

        let mut config = storage::read_config(&env)?;
        Self::require_admin(&config, &admin)?;

        let state = storage::read_state(&env)?;
        if env.ledger().timestamp() < state.period_end {
            log!(&env, "Reward period still running until {}", state.period_end);
            return Err(BondingError::RewardPeriodActive);
        }
        if !validate_rewards_duration(duration) {
            return Err(BondingError::InvalidDuration);
        }

        config.rewards_duration = duration;
        storage::write_config(&env, &config);

        events::rewards_duration_set(&env, admin, duration);
        log!(&env, "Rewards duration set to: {}", duration);

        Ok(())
    }

    /// Update the floor for new deposits. Existing positions are unaffected.
    pub fn set_minimum_deposit(env: Env, admin: Address, amount: i128) -> Result<(), BondingError> {
        admin.require_auth();

        let mut config = storage::read_config(&env)?;
        Self::require_admin(&config, &admin)?;

        if amount < 0 {
            return Err(BondingError::InvalidAmount);
        }

        config.minimum_deposit = amount;
        storage::write_config(&env, &config);

        events::minimum_deposit_set(&env, admin, amount);
        log!(&env, "Minimum deposit set to: {}", amount);

        Ok(())
    }

    /// Allow `distributor` to fund rewards alongside the admin.
    pub fn set_reward_distributor(
        env: Env,
        admin: Address,
        distributor: Address,
    ) -> Result<(), BondingError> {
        admin.require_auth();

        let mut config = storage::read_config(&env)?;
        Self::require_admin(&config, &admin)?;

        config.reward_distributor = distributor.clone();
        storage::write_config(&env, &config);

        events::distributor_set(&env, admin, distributor.clone());
        log!(&env, "Reward distributor set to: {}", distributor);

        Ok(())
    }

    /// Admin function to pause/unpause user operations
    pub fn set_paused(env: Env, admin: Address, paused: bool) -> Result<(), BondingError> {
        admin.require_auth();

        let config = storage::read_config(&env)?;
        Self::require_admin(&config, &admin)?;

        let mut state = storage::read_state(&env)?;
        if state.phase.is_terminated() {
            return Err(BondingError::ProgramTerminated);
        }

        state.phase = if paused {
            ProgramPhase::Paused
        } else {
            ProgramPhase::Running
        };
        storage::write_state(&env, &state);

        events::paused(&env, admin, paused);
        log!(&env, "Pause set to: {}", paused);

        Ok(())
    }

    /// End the program for good. Accrual stops now. Rewards not yet earned
    /// go back to the admin; unless rewards stay claimable, so does
    /// everything else in the reward balance.
    pub fn terminate(env: Env, admin: Address, rewards_claimable: bool) -> Result<(), BondingError> {
        admin.require_auth();

        let (config, mut state, now) = Self::settled(&env)?;
        Self::require_admin(&config, &admin)?;
        if state.phase.is_terminated() {
            return Err(BondingError::ProgramTerminated);
        }

        state.freeze(now).reported(&env)?;
        let disposition = if rewards_claimable {
            RewardDisposition::Claimable
        } else {
            RewardDisposition::Swept
        };
        state.phase = ProgramPhase::Terminated(disposition);

        // Deferred rewards are returned under both dispositions
        let swept = match disposition {
            RewardDisposition::Claimable => core::mem::take(&mut state.undistributed_rewards),
            RewardDisposition::Swept => {
                let balance = token::Client::new(&env, &config.reward_token)
                    .balance(&env.current_contract_address());
                // Staked principal is not the admin's to take when both tokens coincide
                let reserved = if config.reward_token == config.stake_token {
                    state.total_principal
                } else {
                    0
                };
                state.undistributed_rewards = 0;
                (balance - reserved).max(0)
            }
        };
        storage::write_state(&env, &state);

        Self::pay_out(&env, &config.reward_token, &admin, swept);

        events::terminated(
            &env,
            TerminatedEvent {
                admin: admin.clone(),
                disposition,
                swept,
                timestamp: now,
            },
        );
        log!(&env, "Program terminated by {}, rewards claimable: {}, swept {}", admin, rewards_claimable, swept);

        Ok(())
    }

    // Emergency exits (terminated programs only)

    /// Return the principal of one position regardless of lock or cooldown.
    pub fn emergency_withdraw(env: Env, user: Address, position_id: u32) -> Result<i128, BondingError> {
        user.require_auth();

        let (config, mut state, _) = Self::settled(&env)?;
        state.phase.require_terminated()?;

        let mut position = storage::read_position(&env, &user, position_id)?;
        if position.is_closed() {
            return Err(BondingError::PositionClosed);
        }
        let principal = Self::evacuate_position(&env, &mut state, &mut position)?;

        storage::write_position(&env, &user, position_id, &position);
        storage::write_state(&env, &state);

        Self::pay_out(&env, &config.stake_token, &user, principal);

        events::emergency_withdrawn(&env, user.clone(), position_id, principal);
        log!(&env, "User {} emergency withdrew {} from position {}", user, principal, position_id);

        Ok(principal)
    }

    /// Return the principal of every open position of `user`.
    pub fn emergency_withdraw_all(env: Env, user: Address) -> Result<i128, BondingError> {
        user.require_auth();

        let (config, mut state, _) = Self::settled(&env)?;
        state.phase.require_terminated()?;

        let mut total_principal = 0i128;
        for position_id in 0..storage::position_count(&env, &user) {
            let mut position = storage::read_position(&env, &user, position_id)?;
            if position.is_closed() {
                continue;
            }

            let principal = Self::evacuate_position(&env, &mut state, &mut position)?;
            storage::write_position(&env, &user, position_id, &position);
            events::emergency_withdrawn(&env, user.clone(), position_id, principal);
            total_principal = total_principal
                .checked_add(principal)
                .ok_or(BondingError::NumericOverflow)?;
        }

        storage::write_state(&env, &state);

        Self::pay_out(&env, &config.stake_token, &user, total_principal);

        log!(&env, "User {} emergency withdrew {}", user, total_principal);

        Ok(total_principal)
    }

    /// Pay out every reward `user` had earned when the program was terminated.
    pub fn emergency_claim(env: Env, user: Address) -> Result<i128, BondingError> {
        user.require_auth();

        let (config, mut state, _) = Self::settled(&env)?;
        if state.phase.require_terminated()? != RewardDisposition::Claimable {
            return Err(BondingError::RewardsNotClaimable);
        }

        let mut total_reward = 0i128;
        for position_id in 0..storage::position_count(&env, &user) {
            let mut position = storage::read_position(&env, &user, position_id)?;
            let reward = Self::claim_position(&env, &mut state, &mut position)?;
            storage::write_position(&env, &user, position_id, &position);
            if reward > 0 {
                events::emergency_claimed(&env, user.clone(), position_id, reward);
            }
            total_reward = total_reward
                .checked_add(reward)
                .ok_or(BondingError::NumericOverflow)?;
        }

        storage::write_state(&env, &state);

        Self::pay_out(&env, &config.reward_token, &user, total_reward);

        log!(&env, "User {} emergency claimed {}", user, total_reward);

        Ok(total_reward)
    }

    // Queries

    pub fn get_config(env: Env) -> Result<BondingConfig, BondingError> {
        storage::read_config(&env)
    }

    /// Global ledger as of the last settlement.
    pub fn get_global_state(env: Env) -> Result<GlobalState, BondingError> {
        storage::read_state(&env)
    }

    pub fn get_phase(env: Env) -> Result<ProgramPhase, BondingError> {
        Ok(storage::read_state(&env)?.phase)
    }

    pub fn version(env: Env) -> u32 {
        storage::read_version(&env)
    }

    pub fn get_position(env: Env, user: Address, position_id: u32) -> Result<Position, BondingError> {
        storage::read_position(&env, &user, position_id)
    }

    pub fn get_positions(env: Env, user: Address) -> Vec<Position> {
        let mut positions = Vec::new(&env);
        for position_id in 0..storage::position_count(&env, &user) {
            if let Ok(position) = storage::read_position(&env, &user, position_id) {
                positions.push_back(position);
            }
        }
        positions
    }

    pub fn position_count(env: Env, user: Address) -> u32 {
        storage::position_count(&env, &user)
    }

    pub fn position_state(
        env: Env,
        user: Address,
        position_id: u32,
    ) -> Result<PositionState, BondingError> {
        let position = storage::read_position(&env, &user, position_id)?;
        Ok(position.state(env.ledger().timestamp()))
    }

    /// Reward a position would receive if claimed now.
    pub fn pending_reward(env: Env, user: Address, position_id: u32) -> Result<i128, BondingError> {
        let state = storage::read_state(&env)?.preview(env.ledger().timestamp())?;
        let mut position = storage::read_position(&env, &user, position_id)?;
        position.accrue(state.reward_per_boosted_unit)?;
        Ok(position.unclaimed_reward)
    }

    pub fn pending_rewards(env: Env, user: Address) -> Result<i128, BondingError> {
        let state = storage::read_state(&env)?.preview(env.ledger().timestamp())?;
        let mut total = 0i128;
        for position_id in 0..storage::position_count(&env, &user) {
            let mut position = storage::read_position(&env, &user, position_id)?;
            position.accrue(state.reward_per_boosted_unit)?;
            total = total
                .checked_add(position.unclaimed_reward)
                .ok_or(BondingError::NumericOverflow)?;
        }
        Ok(total)
    }

    pub fn reward_per_boosted_unit(env: Env) -> Result<i128, BondingError> {
        let state = storage::read_state(&env)?.preview(env.ledger().timestamp())?;
        Ok(state.reward_per_boosted_unit)
    }

    pub fn last_time_reward_applicable(env: Env) -> Result<u64, BondingError> {
        let state = storage::read_state(&env)?;
        Ok(state.last_time_reward_applicable(env.ledger().timestamp()))
    }

    /// Total emission of a full period at the current rate.
    pub fn reward_for_duration(env: Env) -> Result<i128, BondingError> {
        let config = storage::read_config(&env)?;
        storage::read_state(&env)?.reward_for_duration(config.rewards_duration)
    }

    pub fn total_principal(env: Env) -> i128 {
        storage::read_state(&env)
            .map(|state| state.total_principal)
            .unwrap_or(0)
    }

    pub fn total_boosted_principal(env: Env) -> i128 {
        storage::read_state(&env)
            .map(|state| state.total_boosted_principal)
            .unwrap_or(0)
    }

    pub fn lock_policy(_env: Env, lock_tier: u32) -> Result<LockPolicy, BondingError> {
        shared::lock_policy(lock_tier).ok_or(BondingError::InvalidLockTier)
    }

    pub fn lock_policies(env: Env) -> Vec<LockPolicy> {
        let mut policies = Vec::new(&env);
        for policy in shared::LOCK_POLICIES.iter() {
            policies.push_back(*policy);
        }
        policies
    }

    // Internal helper functions

    /// Load the ledger and catch the accumulator up to the current time.
    /// Every mutating entry point starts here.
    fn settled(env: &Env) -> Result<(BondingConfig, GlobalState, u64), BondingError> {
        let config = storage::read_config(env)?;
        let mut state = storage::read_state(env)?;
        let now = env.ledger().timestamp();
        state.settle(now).reported(env)?;
        Ok((config, state, now))
    }

    fn require_admin(config: &BondingConfig, caller: &Address) -> Result<(), BondingError> {
        if config.admin != *caller {
            return Err(BondingError::Unauthorized);
        }
        Ok(())
    }

    fn unbond_position(
        env: &Env,
        state: &mut GlobalState,
        position: &mut Position,
        now: u64,
    ) -> Result<u64, BondingError> {
        state.settle_position(position).reported(env)?;
        let stripped = position.begin_unbonding(now).reported(env)?;
        state.strip_boost(stripped).reported(env)?;
        Ok(position.unbond_ready_at)
    }

    fn rebond_position(
        env: &Env,
        state: &mut GlobalState,
        position: &mut Position,
    ) -> Result<(), BondingError> {
        state.settle_position(position).reported(env)?;
        let restored = position.cancel_unbonding().reported(env)?;
        state.restore_boost(restored).reported(env)
    }

    fn unstake_position(
        env: &Env,
        state: &mut GlobalState,
        position: &mut Position,
        now: u64,
    ) -> Result<(i128, i128), BondingError> {
        state.settle_position(position).reported(env)?;
        let (principal, boosted) = position.close(now)?;
        state.debit(principal, boosted).reported(env)?;
        let reward = position.take_reward();
        state.record_payout(reward).reported(env)?;
        Ok((principal, reward))
    }

    fn claim_position(
        env: &Env,
        state: &mut GlobalState,
        position: &mut Position,
    ) -> Result<i128, BondingError> {
        state.settle_position(position).reported(env)?;
        let reward = position.take_reward();
        state.record_payout(reward).reported(env)?;
        Ok(reward)
    }

    /// Close a position without letting reward settlement block the exit.
    /// If settling fails, the position keeps what it had already been
    /// credited and forfeits the rest.
    fn evacuate_position(
        env: &Env,
        state: &mut GlobalState,
        position: &mut Position,
    ) -> Result<i128, BondingError> {
        let mut settled_state = state.clone();
        let mut settled_position = position.clone();
        match settled_state
            .settle_position(&mut settled_position)
            .reported(env)
        {
            Ok(_) => {
                *state = settled_state;
                *position = settled_position;
            }
            Err(err) => {
                let code = err as u32;
                log!(env, "Reward settlement skipped on emergency exit: error code {}", code);
                position.reward_snapshot = state.reward_per_boosted_unit;
            }
        }

        let (principal, boosted) = position.force_close();
        state.debit(principal, boosted).reported(env)?;
        Ok(principal)
    }

    /// Transfer `amount` of `token` out of the contract. Always the last step
    /// of an operation, after the ledger has been written.
    fn pay_out(env: &Env, asset: &Address, to: &Address, amount: i128) {
        if amount > 0 {
            token::Client::new(env, asset).transfer(&env.current_contract_address(), to, &amount);
        }
    }
}
