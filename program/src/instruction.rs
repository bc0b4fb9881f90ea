use arrayref::array_ref;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{
    error::LotteryError,
    state::{LotteryConfig, OracleConfig},
    utils::find_lottery_address,
};

#[derive(Clone, Debug, PartialEq)]
pub enum LotteryInstruction {
    /// Create the lottery account and open the first round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The payer funding the lottery account
    /// 1. `[writable]` The lottery account (PDA)
    /// 2. `[]` The system program
    InitializeLottery {
        /// Minimum payment per entry in lamports
        entrance_fee: u64,
        /// Minimum seconds between settlements
        interval: u64,
        /// Capacity of the player list, sizes the account
        max_players: u32,
        oracle: OracleConfig,
    },

    /// Pay into the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player
    /// 1. `[writable]` The lottery account
    /// 2. `[]` The system program
    EnterLottery {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Evaluate the upkeep conditions, returned as program return data
    ///
    /// Accounts expected:
    /// 0. `[]` The lottery account
    CheckUpkeep,

    /// Close the round and request randomness (anyone can call)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The caller
    /// 1. `[writable]` The lottery account
    PerformUpkeep,

    /// Deliver the random word for the pending request and settle the round
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator
    /// 1. `[writable]` The lottery account
    /// 2.. `[writable]` Prize recipient candidates, must include the winner
    FulfillRandomWords {
        request_id: u64,
        random_word: [u8; 32],
    },
}

impl LotteryInstruction {
    /// Unpacks a byte buffer into a LotteryInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(LotteryError::InvalidInstruction)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_u64(rest)?;
                let (max_players, rest) = Self::unpack_u32(rest)?;
                let (key_hash, rest) = Self::unpack_bytes32(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (request_confirmations, rest) = Self::unpack_u16(rest)?;
                let (callback_compute_limit, rest) = Self::unpack_u32(rest)?;
                let (coordinator, _) = Self::unpack_bytes32(rest)?;
                Self::InitializeLottery {
                    entrance_fee,
                    interval,
                    max_players,
                    oracle: OracleConfig {
                        coordinator: Pubkey::new_from_array(coordinator),
                        key_hash,
                        subscription_id,
                        request_confirmations,
                        callback_compute_limit,
                    },
                }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterLottery { amount }
            }
            2 => Self::CheckUpkeep,
            3 => Self::PerformUpkeep,
            4 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (random_word, _) = Self::unpack_bytes32(rest)?;
                Self::FulfillRandomWords {
                    request_id,
                    random_word,
                }
            }
            _ => return Err(LotteryError::InvalidInstruction.into()),
        })
    }

    /// Packs a LotteryInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::InitializeLottery {
                entrance_fee,
                interval,
                max_players,
                oracle,
            } => {
                buf.push(0);
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(&max_players.to_le_bytes());
                buf.extend_from_slice(&oracle.key_hash);
                buf.extend_from_slice(&oracle.subscription_id.to_le_bytes());
                buf.extend_from_slice(&oracle.request_confirmations.to_le_bytes());
                buf.extend_from_slice(&oracle.callback_compute_limit.to_le_bytes());
                buf.extend_from_slice(oracle.coordinator.as_ref());
            }
            Self::EnterLottery { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep => buf.push(2),
            Self::PerformUpkeep => buf.push(3),
            Self::FulfillRandomWords {
                request_id,
                random_word,
            } => {
                buf.push(4);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(random_word);
            }
        }
        buf
    }

    fn unpack_u16(input: &[u8]) -> Result<(u16, &[u8]), ProgramError> {
        if input.len() < 2 {
            return Err(LotteryError::InvalidInstruction.into());
        }
        let (bytes, rest) = input.split_at(2);
        Ok((u16::from_le_bytes(*array_ref![bytes, 0, 2]), rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        if input.len() < 4 {
            return Err(LotteryError::InvalidInstruction.into());
        }
        let (bytes, rest) = input.split_at(4);
        Ok((u32::from_le_bytes(*array_ref![bytes, 0, 4]), rest))
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        if input.len() < 8 {
            return Err(LotteryError::InvalidInstruction.into());
        }
        let (bytes, rest) = input.split_at(8);
        Ok((u64::from_le_bytes(*array_ref![bytes, 0, 8]), rest))
    }

    fn unpack_bytes32(input: &[u8]) -> Result<([u8; 32], &[u8]), ProgramError> {
        if input.len() < 32 {
            return Err(LotteryError::InvalidInstruction.into());
        }
        let (bytes, rest) = input.split_at(32);
        Ok((*array_ref![bytes, 0, 32], rest))
    }
}

/// Create initialize_lottery instruction
pub fn initialize_lottery(program_id: &Pubkey, payer: &Pubkey, config: LotteryConfig) -> Instruction {
    let (lottery, _) = find_lottery_address(program_id);
    let data = LotteryInstruction::InitializeLottery {
        entrance_fee: config.entrance_fee,
        interval: config.interval,
        max_players: config.max_players,
        oracle: config.oracle,
    }
    .pack();

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(lottery, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}

/// Create enter_lottery instruction
pub fn enter_lottery(program_id: &Pubkey, player: &Pubkey, amount: u64) -> Instruction {
    let (lottery, _) = find_lottery_address(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*player, true),
            AccountMeta::new(lottery, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: LotteryInstruction::EnterLottery { amount }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey) -> Instruction {
    let (lottery, _) = find_lottery_address(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(lottery, false)],
        data: LotteryInstruction::CheckUpkeep.pack(),
    }
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(program_id: &Pubkey, caller: &Pubkey) -> Instruction {
    let (lottery, _) = find_lottery_address(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*caller, true),
            AccountMeta::new(lottery, false),
        ],
        data: LotteryInstruction::PerformUpkeep.pack(),
    }
}

/// Create fulfill_random_words instruction
pub fn fulfill_random_words(
    program_id: &Pubkey,
    coordinator: &Pubkey,
    request_id: u64,
    random_word: [u8; 32],
    recipients: &[Pubkey],
) -> Instruction {
    let (lottery, _) = find_lottery_address(program_id);

    let mut accounts = vec![
        AccountMeta::new_readonly(*coordinator, true),
        AccountMeta::new(lottery, false),
    ];
    accounts.extend(recipients.iter().map(|key| AccountMeta::new(*key, false)));

    Instruction {
        program_id: *program_id,
        accounts,
        data: LotteryInstruction::FulfillRandomWords {
            request_id,
            random_word,
        }
        .pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_layout_is_fixed_width() {
        let oracle = OracleConfig {
            coordinator: Pubkey::new_unique(),
            key_hash: [7u8; 32],
            subscription_id: 18367,
            ..OracleConfig::default()
        };
        let instruction = LotteryInstruction::InitializeLottery {
            entrance_fee: 100_000_000,
            interval: 30,
            max_players: 64,
            oracle,
        };
        let data = instruction.pack();

        assert_eq!(data.len(), 1 + 8 + 8 + 4 + 32 + 8 + 2 + 4 + 32);
        assert_eq!(LotteryInstruction::unpack(&data).unwrap(), instruction);
    }

    #[test]
    fn fulfill_carries_request_id_and_word() {
        let mut word = [0u8; 32];
        word[31] = 9;
        let data = LotteryInstruction::FulfillRandomWords {
            request_id: 3,
            random_word: word,
        }
        .pack();

        assert_eq!(data[0], 4);
        assert_eq!(&data[1..9], &3u64.to_le_bytes());
        assert_eq!(
            LotteryInstruction::unpack(&data).unwrap(),
            LotteryInstruction::FulfillRandomWords {
                request_id: 3,
                random_word: word,
            }
        );
    }

    #[test]
    fn rejects_truncated_or_unknown_data() {
        let invalid = ProgramError::from(LotteryError::InvalidInstruction);
        assert_eq!(LotteryInstruction::unpack(&[]), Err(invalid.clone()));
        assert_eq!(LotteryInstruction::unpack(&[1, 0, 0, 0]), Err(invalid.clone()));
        assert_eq!(LotteryInstruction::unpack(&[4, 1, 0, 0, 0, 0, 0, 0, 0, 5]), Err(invalid.clone()));
        assert_eq!(LotteryInstruction::unpack(&[9]), Err(invalid));
    }

    #[test]
    fn fulfill_builder_appends_recipients_as_writable() {
        let program_id = Pubkey::new_unique();
        let coordinator = Pubkey::new_unique();
        let recipients = [Pubkey::new_unique(), Pubkey::new_unique()];

        let ix = fulfill_random_words(&program_id, &coordinator, 1, [0u8; 32], &recipients);

        assert_eq!(ix.accounts.len(), 4);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, find_lottery_address(&program_id).0);
        assert!(ix.accounts[2..].iter().all(|meta| meta.is_writable && !meta.is_signer));
    }
}
