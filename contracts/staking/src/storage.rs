use soroban_sdk::{contracttype, Address, Env};

use crate::accumulator::GlobalState;
use crate::error::BondingError;
use crate::position::Position;
use crate::BondingConfig;

pub const CONTRACT_VERSION: u32 = 1;

// Storage Keys
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Config,
    GlobalState,
    ContractVersion,
    PositionCount(Address),
    Position(Address, u32),
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn read_config(env: &Env) -> Result<BondingConfig, BondingError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(BondingError::NotInitialized)
}

pub fn write_config(env: &Env, config: &BondingConfig) {
    env.storage().instance().set(&DataKey::Config, config);
}

pub fn read_state(env: &Env) -> Result<GlobalState, BondingError> {
    env.storage()
        .instance()
        .get(&DataKey::GlobalState)
        .ok_or(BondingError::NotInitialized)
}

pub fn write_state(env: &Env, state: &GlobalState) {
    env.storage().instance().set(&DataKey::GlobalState, state);
}

pub fn write_version(env: &Env) {
    env.storage()
        .instance()
        .set(&DataKey::ContractVersion, &CONTRACT_VERSION);
}

pub fn read_version(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&DataKey::ContractVersion)
        .unwrap_or(0)
}

/// Number of positions `user` ever opened; ids run from 0 to count - 1.
pub fn position_count(env: &Env, user: &Address) -> u32 {
    env.storage()
        .persistent()
        .get(&DataKey::PositionCount(user.clone()))
        .unwrap_or(0)
}

pub fn read_position(env: &Env, user: &Address, id: u32) -> Result<Position, BondingError> {
    env.storage()
        .persistent()
        .get(&DataKey::Position(user.clone(), id))
        .ok_or(BondingError::PositionNotFound)
}

pub fn write_position(env: &Env, user: &Address, id: u32, position: &Position) {
    env.storage()
        .persistent()
        .set(&DataKey::Position(user.clone(), id), position);
}

/// Store `position` under the next id for `user` and return that id.
pub fn append_position(
    env: &Env,
    user: &Address,
    position: &Position,
) -> Result<u32, BondingError> {
    let id = position_count(env, user);
    let next = id.checked_add(1).ok_or(BondingError::NumericOverflow)?;
    write_position(env, user, id, position);
    env.storage()
        .persistent()
        .set(&DataKey::PositionCount(user.clone()), &next);
    Ok(id)
}
