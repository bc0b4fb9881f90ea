// Randomness coordinator integration for the raffle lottery program
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, log::sol_log_data, msg,
    program_error::ProgramError, pubkey::Pubkey,
};

use crate::{error::LotteryError, state::OracleConfig};

/// Random words requested per round
pub const NUM_WORDS: u32 = 1;

/// Parameters of a randomness request, published for the coordinator
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_compute_limit: u32,
    pub num_words: u32,
}

/// Source of verifiable randomness.
///
/// A request returns immediately with a nonzero request id; the random word
/// arrives later through a separate fulfillment carrying the same id.
pub trait RandomnessOracle {
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, LotteryError>;
}

/// Issues requests to the off-chain coordinator through the program log.
///
/// Request ids are sequential per lottery, starting at 1.
pub struct CoordinatorOracle<'a> {
    lottery: &'a Pubkey,
    requests_issued: u64,
}

impl<'a> CoordinatorOracle<'a> {
    pub fn new(lottery: &'a Pubkey, requests_issued: u64) -> Self {
        Self {
            lottery,
            requests_issued,
        }
    }
}

impl RandomnessOracle for CoordinatorOracle<'_> {
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, LotteryError> {
        let request_id = self
            .requests_issued
            .checked_add(1)
            .ok_or(LotteryError::AmountOverflow)?;
        let payload = request
            .try_to_vec()
            .map_err(|_| LotteryError::OracleUnavailable)?;

        sol_log_data(&[
            b"randomness_request",
            self.lottery.as_ref(),
            &request_id.to_le_bytes(),
            &payload,
        ]);
        msg!(
            "Randomness requested: id={}, subscription={}, confirmations={}",
            request_id,
            request.subscription_id,
            request.request_confirmations
        );

        self.requests_issued = request_id;
        Ok(request_id)
    }
}

/// Check that the fulfillment was signed by the configured coordinator
pub fn verify_coordinator(coordinator_info: &AccountInfo, config: &OracleConfig) -> ProgramResult {
    if !coordinator_info.is_signer {
        msg!("Coordinator must sign the fulfillment");
        return Err(ProgramError::MissingRequiredSignature);
    }
    if *coordinator_info.key != config.coordinator {
        msg!(
            "Fulfillment from {} but coordinator is {}",
            coordinator_info.key,
            config.coordinator
        );
        return Err(LotteryError::UnauthorizedCoordinator.into());
    }
    Ok(())
}

/// Index of the winning player: the random word, read as a big-endian
/// 256-bit integer, modulo the number of players
pub fn winner_index(random_word: &[u8; 32], players: usize) -> usize {
    if players == 0 {
        return 0;
    }

    let modulus = players as u128;
    random_word
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % modulus) as usize
}

/// Random word holding `value` in its low-order bytes
pub fn random_word_from_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_index_is_word_modulo_players() {
        assert_eq!(winner_index(&random_word_from_u64(10), 4), 2);
        assert_eq!(winner_index(&random_word_from_u64(3), 4), 3);
        assert_eq!(winner_index(&random_word_from_u64(u64::MAX), 7), (u64::MAX % 7) as usize);
        assert_eq!(winner_index(&random_word_from_u64(42), 1), 0);
        assert_eq!(winner_index(&random_word_from_u64(42), 0), 0);
    }

    #[test]
    fn winner_index_uses_the_full_word() {
        // 2^255 mod 3 == 2
        let mut word = [0u8; 32];
        word[0] = 0x80;
        assert_eq!(winner_index(&word, 3), 2);
        // 2^256 - 1 mod 5 == 0
        assert_eq!(winner_index(&[0xff; 32], 5), 0);
    }

    #[test]
    fn coordinator_issues_sequential_ids() {
        let lottery = Pubkey::new_unique();
        let request = OracleConfig::default().request();
        let mut oracle = CoordinatorOracle::new(&lottery, 0);

        assert_eq!(oracle.request_random_words(&request), Ok(1));
        assert_eq!(oracle.request_random_words(&request), Ok(2));

        let mut resumed = CoordinatorOracle::new(&lottery, 41);
        assert_eq!(resumed.request_random_words(&request), Ok(42));
    }

    #[test]
    fn verify_coordinator_checks_key_and_signature() {
        let coordinator = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let config = OracleConfig {
            coordinator,
            ..OracleConfig::default()
        };
        let mut lamports = 0;
        let mut data: [u8; 0] = [];

        let signed = AccountInfo::new(&coordinator, true, false, &mut lamports, &mut data, &owner, false, 0);
        assert_eq!(verify_coordinator(&signed, &config), Ok(()));

        let mut lamports = 0;
        let mut data: [u8; 0] = [];
        let unsigned = AccountInfo::new(&coordinator, false, false, &mut lamports, &mut data, &owner, false, 0);
        assert_eq!(
            verify_coordinator(&unsigned, &config),
            Err(ProgramError::MissingRequiredSignature)
        );

        let impostor = Pubkey::new_unique();
        let mut lamports = 0;
        let mut data: [u8; 0] = [];
        let other = AccountInfo::new(&impostor, true, false, &mut lamports, &mut data, &owner, false, 0);
        assert_eq!(
            verify_coordinator(&other, &config),
            Err(ProgramError::from(LotteryError::UnauthorizedCoordinator))
        );
    }
}
