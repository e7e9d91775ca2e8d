use soroban_sdk::{contracterror, log, Env};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum BondingError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,

    // Caller-correctable input
    InvalidAmount = 4,
    BelowMinimumDeposit = 5,
    InvalidLockTier = 6,
    PositionNotFound = 7,
    PositionClosed = 8,
    AlreadyUnbonding = 9,
    NotUnbonding = 10,
    PositionLocked = 11,
    CooldownActive = 12,
    RewardTooSmall = 13,
    RewardRateTooHigh = 14,
    InvalidDuration = 15,
    InvalidConfiguration = 16,

    // Blocked by the current program phase
    ContractPaused = 20,
    ProgramTerminated = 21,
    ProgramNotTerminated = 22,
    RewardsNotClaimable = 23,
    NoActiveRewardPeriod = 24,
    RewardPeriodActive = 25,

    // Ledger invariants; any of these means the books cannot be trusted
    NumericOverflow = 30,
    BoostedPrincipalMismatch = 31,
    BoostUnderflow = 32,
    RewardsExceedFunding = 33,
}

/// Which tier of failure an error belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Input,
    State,
    Invariant,
}

impl BondingError {
    pub fn class(&self) -> ErrorClass {
        match *self as u32 {
            0..=19 => ErrorClass::Input,
            20..=29 => ErrorClass::State,
            _ => ErrorClass::Invariant,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        self.class() == ErrorClass::Invariant
    }
}

/// Propagate a ledger result, logging invariant violations under their own
/// prefix so they can be told apart from ordinary rejections.
pub trait Reported<T> {
    fn reported(self, env: &Env) -> Result<T, BondingError>;
}

impl<T> Reported<T> for Result<T, BondingError> {
    fn reported(self, env: &Env) -> Result<T, BondingError> {
        if let Err(err) = &self {
            if err.is_invariant_violation() {
                let code = *err as u32;
                log!(env, "ledger invariant violated: error code {}", code);
            }
        }
        self
    }
}
