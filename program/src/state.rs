// Raffle Lottery Program - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey,
};

use crate::{
    error::LotteryError,
    events::LotteryEvent,
    oracle::{self, RandomnessOracle, RandomnessRequest},
};

/// Default number of block confirmations the coordinator waits before answering
pub const DEFAULT_REQUEST_CONFIRMATIONS: u16 = 3;
/// Default compute budget reserved for the fulfillment callback
pub const DEFAULT_CALLBACK_COMPUTE_LIMIT: u32 = 500_000;

/// Phase of the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LotteryState {
    /// Entries are accepted
    Open,
    /// A randomness request is outstanding, entries are closed
    Calculating,
}

/// Randomness coordinator settings, fixed at creation
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OracleConfig {
    /// The only key allowed to deliver random words
    pub coordinator: Pubkey,
    /// Oracle key hash (gas lane) selecting the proving key
    pub key_hash: [u8; 32],
    /// Subscription paying for the requests
    pub subscription_id: u64,
    /// Confirmations the coordinator waits before answering
    pub request_confirmations: u16,
    /// Compute units reserved for the fulfillment callback
    pub callback_compute_limit: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            coordinator: Pubkey::default(),
            key_hash: [0u8; 32],
            subscription_id: 0,
            request_confirmations: DEFAULT_REQUEST_CONFIRMATIONS,
            callback_compute_limit: DEFAULT_CALLBACK_COMPUTE_LIMIT,
        }
    }
}

impl OracleConfig {
    /// Build the request sent to the coordinator for one round
    pub fn request(&self) -> RandomnessRequest {
        RandomnessRequest {
            key_hash: self.key_hash,
            subscription_id: self.subscription_id,
            request_confirmations: self.request_confirmations,
            callback_compute_limit: self.callback_compute_limit,
            num_words: oracle::NUM_WORDS,
        }
    }
}

/// Constructor arguments of a lottery
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LotteryConfig {
    /// Minimum payment per entry in lamports
    pub entrance_fee: u64,
    /// Minimum number of seconds between settlements
    pub interval: u64,
    /// Capacity of the player list
    pub max_players: u32,
    pub oracle: OracleConfig,
}

/// Outcome of an upkeep check, one flag per condition
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepStatus {
    pub is_open: bool,
    pub time_passed: bool,
    pub has_players: bool,
    pub has_balance: bool,
}

impl UpkeepStatus {
    pub fn upkeep_needed(&self) -> bool {
        self.is_open && self.time_passed && self.has_players && self.has_balance
    }
}

/// Lottery account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Lottery {
    /// Is the account initialized
    pub is_initialized: bool,
    state: LotteryState,
    entrance_fee: u64,
    interval: u64,
    /// Creation time or time of the last settlement
    last_timestamp: UnixTimestamp,
    /// Lamports paid in through entries during the current round
    balance: u64,
    recent_winner: Option<Pubkey>,
    /// Present only while calculating
    pending_request_id: Option<u64>,
    requests_issued: u64,
    max_players: u32,
    oracle: OracleConfig,
    /// PDA bump seed
    pub bump: u8,
    players: Vec<Pubkey>,
}

impl Lottery {
    /// Serialized size of everything except the player entries
    pub const FIXED_LEN: usize = 1 // is_initialized
        + 1 // state
        + 8 // entrance_fee
        + 8 // interval
        + 8 // last_timestamp
        + 8 // balance
        + 33 // recent_winner
        + 9 // pending_request_id
        + 8 // requests_issued
        + 4 // max_players
        + 32 + 32 + 8 + 2 + 4 // oracle
        + 1 // bump
        + 4; // players length prefix

    /// Account size needed to hold `max_players` entries
    pub fn space(max_players: u32) -> usize {
        Self::FIXED_LEN + max_players as usize * 32
    }

    /// Create a new lottery in the open state
    pub fn new(
        config: LotteryConfig,
        now: UnixTimestamp,
        bump: u8,
    ) -> Result<Self, LotteryError> {
        if config.entrance_fee == 0 || config.interval == 0 || config.max_players == 0 {
            msg!("Entrance fee, interval and player capacity must be positive");
            return Err(LotteryError::InvalidConfig);
        }

        Ok(Self {
            is_initialized: true,
            state: LotteryState::Open,
            entrance_fee: config.entrance_fee,
            interval: config.interval,
            last_timestamp: now,
            balance: 0,
            recent_winner: None,
            pending_request_id: None,
            requests_issued: 0,
            max_players: config.max_players,
            oracle: config.oracle,
            bump,
            players: Vec::new(),
        })
    }

    /// Load an initialized lottery from account data
    pub fn unpack(src: &[u8]) -> Result<Self, ProgramError> {
        let lottery = Self::deserialize(&mut &src[..])
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if !lottery.is_initialized {
            return Err(LotteryError::NotInitialized.into());
        }
        Ok(lottery)
    }

    /// Store the lottery into account data, zeroing the unused tail
    pub fn pack_into(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let bytes = self
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if bytes.len() > dst.len() {
            return Err(ProgramError::AccountDataTooSmall);
        }
        let (data, tail) = dst.split_at_mut(bytes.len());
        data.copy_from_slice(&bytes);
        tail.fill(0);
        Ok(())
    }

    /// Record a paid entry
    pub fn enter(&mut self, player: Pubkey, paid_amount: u64) -> Result<LotteryEvent, LotteryError> {
        if paid_amount < self.entrance_fee {
            msg!(
                "Paid {} lamports, entrance fee is {} lamports",
                paid_amount,
                self.entrance_fee
            );
            return Err(LotteryError::InsufficientPayment);
        }
        if self.state != LotteryState::Open {
            return Err(LotteryError::NotOpen);
        }
        if self.players.len() >= self.max_players as usize {
            return Err(LotteryError::PlayerCapacityReached);
        }

        let balance = self
            .balance
            .checked_add(paid_amount)
            .ok_or(LotteryError::AmountOverflow)?;

        self.balance = balance;
        self.players.push(player);
        Ok(LotteryEvent::RaffleEnter { player })
    }

    /// Evaluate the upkeep conditions without touching state
    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepStatus {
        let elapsed = now.saturating_sub(self.last_timestamp).max(0) as u64;
        UpkeepStatus {
            is_open: self.state == LotteryState::Open,
            time_passed: elapsed >= self.interval,
            has_players: !self.players.is_empty(),
            has_balance: self.balance > 0,
        }
    }

    /// Close the round and ask the oracle for a random word.
    ///
    /// Fails with `UpkeepNotNeeded` unless every upkeep condition holds, so a
    /// second call while a request is outstanding is rejected.
    pub fn perform_upkeep<O: RandomnessOracle>(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut O,
    ) -> Result<LotteryEvent, LotteryError> {
        let status = self.check_upkeep(now);
        if !status.upkeep_needed() {
            msg!("Upkeep not needed: {:?}", status);
            return Err(LotteryError::UpkeepNotNeeded(status));
        }

        let request_id = oracle.request_random_words(&self.oracle.request())?;
        if request_id == 0 {
            msg!("Oracle returned a zero request id");
            return Err(LotteryError::UnknownRequest);
        }

        self.state = LotteryState::Calculating;
        self.pending_request_id = Some(request_id);
        self.requests_issued = self.requests_issued.saturating_add(1);
        Ok(LotteryEvent::RequestedRaffleWinner { request_id })
    }

    /// Settle the round with the delivered random word.
    ///
    /// `payout` moves the pot to the winner. State is only committed once it
    /// succeeds; on failure the round stays calculating with the same request
    /// pending.
    pub fn fulfill_random_words<F>(
        &mut self,
        request_id: u64,
        random_word: &[u8; 32],
        now: UnixTimestamp,
        payout: F,
    ) -> Result<LotteryEvent, LotteryError>
    where
        F: FnOnce(&Pubkey, u64) -> Result<(), ProgramError>,
    {
        if self.state != LotteryState::Calculating || self.pending_request_id != Some(request_id) {
            msg!(
                "Request {} does not match pending request {:?}",
                request_id,
                self.pending_request_id
            );
            return Err(LotteryError::UnknownRequest);
        }

        let winner_index = oracle::winner_index(random_word, self.players.len());
        let winner = *self
            .players
            .get(winner_index)
            .ok_or(LotteryError::PayoutFailed)?;
        let prize = self.balance;

        payout(&winner, prize).map_err(|err| {
            msg!("Payout of {} lamports to {} failed: {}", prize, winner, err);
            LotteryError::PayoutFailed
        })?;

        self.recent_winner = Some(winner);
        self.players.clear();
        self.balance = 0;
        self.last_timestamp = now;
        self.state = LotteryState::Open;
        self.pending_request_id = None;
        Ok(LotteryEvent::WinnerPicked { winner, prize })
    }

    pub fn state(&self) -> LotteryState {
        self.state
    }

    pub fn entrance_fee(&self) -> u64 {
        self.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn player(&self, index: usize) -> Option<&Pubkey> {
        self.players.get(index)
    }

    pub fn players(&self) -> &[Pubkey] {
        &self.players
    }

    pub fn number_of_players(&self) -> usize {
        self.players.len()
    }

    pub fn max_players(&self) -> u32 {
        self.max_players
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn pending_request_id(&self) -> Option<u64> {
        self.pending_request_id
    }

    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    pub fn oracle_config(&self) -> &OracleConfig {
        &self.oracle
    }

    pub fn request_confirmations(&self) -> u16 {
        self.oracle.request_confirmations
    }

    pub fn num_words(&self) -> u32 {
        oracle::NUM_WORDS
    }
}
