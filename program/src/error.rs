// Raffle Lottery Program - Errors
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

use crate::state::UpkeepStatus;

/// Errors that may be returned by the lottery program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction,

    #[error("Lottery already initialized")]
    AlreadyInitialized,

    #[error("Lottery not initialized")]
    NotInitialized,

    /// Entrance fee, interval and player capacity must all be positive
    #[error("Invalid lottery configuration")]
    InvalidConfig,

    /// Paid amount is below the entrance fee
    #[error("Not enough lamports entered")]
    InsufficientPayment,

    /// Entries are only accepted while the lottery is open
    #[error("Lottery is not open")]
    NotOpen,

    /// Upkeep was requested while at least one condition was false
    #[error(
        "Upkeep not needed: open={}, time_passed={}, has_players={}, has_balance={}",
        .0.is_open,
        .0.time_passed,
        .0.has_players,
        .0.has_balance
    )]
    UpkeepNotNeeded(UpkeepStatus),

    /// Fulfillment does not match the pending randomness request
    #[error("Nonexistent randomness request")]
    UnknownRequest,

    /// The winner could not receive the pot
    #[error("Transfer to winner failed")]
    PayoutFailed,

    #[error("Player capacity reached")]
    PlayerCapacityReached,

    /// Only the configured coordinator may deliver random words
    #[error("Only the coordinator can fulfill")]
    UnauthorizedCoordinator,

    #[error("Amount overflow")]
    AmountOverflow,

    /// The randomness request could not be issued
    #[error("Randomness oracle unavailable")]
    OracleUnavailable,
}

impl LotteryError {
    /// Stable custom error code reported through `ProgramError::Custom`
    pub fn code(&self) -> u32 {
        match self {
            LotteryError::InvalidInstruction => 0,
            LotteryError::AlreadyInitialized => 1,
            LotteryError::NotInitialized => 2,
            LotteryError::InvalidConfig => 3,
            LotteryError::InsufficientPayment => 4,
            LotteryError::NotOpen => 5,
            LotteryError::UpkeepNotNeeded(_) => 6,
            LotteryError::UnknownRequest => 7,
            LotteryError::PayoutFailed => 8,
            LotteryError::PlayerCapacityReached => 9,
            LotteryError::UnauthorizedCoordinator => 10,
            LotteryError::AmountOverflow => 11,
            LotteryError::OracleUnavailable => 12,
        }
    }
}

impl From<LotteryError> for ProgramError {
    fn from(e: LotteryError) -> Self {
        ProgramError::Custom(e.code())
    }
}

impl<T> DecodeError<T> for LotteryError {
    fn type_of() -> &'static str {
        "Lottery Error"
    }
}

impl PrintProgramError for LotteryError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
