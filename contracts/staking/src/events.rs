use soroban_sdk::{contracttype, symbol_short, Address, Env};

use crate::accumulator::RewardDisposition;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RewardsFundedEvent {
    pub funder: Address,
    pub amount: i128,
    pub reward_rate: i128,
    pub period_end: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakedEvent {
    pub user: Address,
    pub position_id: u32,
    pub amount: i128,
    pub boosted_amount: i128,
    pub lock_tier: u32,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnbondEvent {
    pub user: Address,
    pub position_id: u32,
    pub ready_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnbondCancelledEvent {
    pub user: Address,
    pub position_id: u32,
    pub boosted_amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnstakedEvent {
    pub user: Address,
    pub position_id: u32,
    pub principal: i128,
    pub reward: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimedEvent {
    pub user: Address,
    pub position_id: u32,
    pub reward: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TerminatedEvent {
    pub admin: Address,
    pub disposition: RewardDisposition,
    pub swept: i128,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmergencyEvent {
    pub user: Address,
    pub position_id: u32,
    pub amount: i128,
}

pub fn rewards_funded(env: &Env, funder: Address, amount: i128, reward_rate: i128, period_end: u64) {
    let event = RewardsFundedEvent {
        funder: funder.clone(),
        amount,
        reward_rate,
        period_end,
    };
    env.events().publish((symbol_short!("funded"), funder), event);
}

pub fn staked(env: &Env, event: StakedEvent) {
    env.events()
        .publish((symbol_short!("staked"), event.user.clone()), event);
}

pub fn unbond_started(env: &Env, user: Address, position_id: u32, ready_at: u64) {
    let event = UnbondEvent {
        user: user.clone(),
        position_id,
        ready_at,
    };
    env.events().publish((symbol_short!("unbond"), user), event);
}

pub fn unbond_cancelled(env: &Env, user: Address, position_id: u32, boosted_amount: i128) {
    let event = UnbondCancelledEvent {
        user: user.clone(),
        position_id,
        boosted_amount,
    };
    env.events().publish((symbol_short!("rebond"), user), event);
}

pub fn unstaked(env: &Env, user: Address, position_id: u32, principal: i128, reward: i128) {
    let event = UnstakedEvent {
        user: user.clone(),
        position_id,
        principal,
        reward,
    };
    env.events().publish((symbol_short!("unstaked"), user), event);
}

pub fn claimed(env: &Env, user: Address, position_id: u32, reward: i128) {
    let event = ClaimedEvent {
        user: user.clone(),
        position_id,
        reward,
    };
    env.events().publish((symbol_short!("claimed"), user), event);
}

pub fn paused(env: &Env, admin: Address, paused: bool) {
    env.events().publish((symbol_short!("paused"), admin), paused);
}

pub fn terminated(env: &Env, event: TerminatedEvent) {
    env.events()
        .publish((symbol_short!("terminate"), event.admin.clone()), event);
}

pub fn emergency_withdrawn(env: &Env, user: Address, position_id: u32, amount: i128) {
    let event = EmergencyEvent {
        user: user.clone(),
        position_id,
        amount,
    };
    env.events().publish((symbol_short!("emrg_wd"), user), event);
}

pub fn emergency_claimed(env: &Env, user: Address, position_id: u32, amount: i128) {
    let event = EmergencyEvent {
        user: user.clone(),
        position_id,
        amount,
    };
    env.events().publish((symbol_short!("emrg_clm"), user), event);
}

pub fn rewards_duration_set(env: &Env, admin: Address, duration: u64) {
    env.events().publish((symbol_short!("duration"), admin), duration);
}

pub fn minimum_deposit_set(env: &Env, admin: Address, amount: i128) {
    env.events().publish((symbol_short!("min_dep"), admin), amount);
}

pub fn distributor_set(env: &Env, admin: Address, distributor: Address) {
    env.events().publish((symbol_short!("distrib"), admin), distributor);
}
