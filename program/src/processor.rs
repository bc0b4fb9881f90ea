// Raffle Lottery Program - Instruction Processor
use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

use crate::{
    error::LotteryError,
    instruction::LotteryInstruction,
    oracle::{verify_coordinator, CoordinatorOracle},
    state::{Lottery, LotteryConfig},
    utils::{find_lottery_address, lamports_to_sol, LOTTERY_SEED},
};

/// Program state handler.
pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = LotteryInstruction::unpack(instruction_data)?;

        match instruction {
            LotteryInstruction::InitializeLottery {
                entrance_fee,
                interval,
                max_players,
                oracle,
            } => {
                msg!("Instruction: Initialize Lottery");
                let config = LotteryConfig {
                    entrance_fee,
                    interval,
                    max_players,
                    oracle,
                };
                Self::process_initialize_lottery(program_id, accounts, config)
            }
            LotteryInstruction::EnterLottery { amount } => {
                msg!("Instruction: Enter Lottery");
                Self::process_enter_lottery(program_id, accounts, amount)
            }
            LotteryInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            LotteryInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts)
            }
            LotteryInstruction::FulfillRandomWords {
                request_id,
                random_word,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, random_word)
            }
        }
    }

    /// Process InitializeLottery instruction
    ///
    /// Creates the lottery PDA sized for `max_players` entries
    fn process_initialize_lottery(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        config: LotteryConfig,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_lottery, bump_seed) = find_lottery_address(program_id);
        if *lottery_info.key != expected_lottery {
            msg!("Invalid lottery account address");
            return Err(ProgramError::InvalidArgument);
        }

        if lottery_info.owner == program_id {
            msg!("Lottery account is already initialized");
            return Err(LotteryError::AlreadyInitialized.into());
        }

        let clock = Clock::get()?;
        let lottery = Lottery::new(config, clock.unix_timestamp, bump_seed)?;

        let space = Lottery::space(config.max_players);
        let rent_lamports = Rent::get()?.minimum_balance(space);
        let bump = [bump_seed];
        let signer_seeds: &[&[u8]] = &[LOTTERY_SEED, &bump];

        if lottery_info.lamports() == 0 {
            invoke_signed(
                &system_instruction::create_account(
                    payer_info.key,
                    lottery_info.key,
                    rent_lamports,
                    space as u64,
                    program_id,
                ),
                &[
                    payer_info.clone(),
                    lottery_info.clone(),
                    system_program_info.clone(),
                ],
                &[signer_seeds],
            )?;
        } else {
            // create_account refuses an address that already holds lamports
            msg!("Lottery address prefunded with {} lamports", lottery_info.lamports());
            let top_up = rent_lamports.saturating_sub(lottery_info.lamports());
            if top_up > 0 {
                invoke(
                    &system_instruction::transfer(payer_info.key, lottery_info.key, top_up),
                    &[
                        payer_info.clone(),
                        lottery_info.clone(),
                        system_program_info.clone(),
                    ],
                )?;
            }
            invoke_signed(
                &system_instruction::allocate(lottery_info.key, space as u64),
                &[lottery_info.clone(), system_program_info.clone()],
                &[signer_seeds],
            )?;
            invoke_signed(
                &system_instruction::assign(lottery_info.key, program_id),
                &[lottery_info.clone(), system_program_info.clone()],
                &[signer_seeds],
            )?;
        }

        lottery.pack_into(&mut lottery_info.data.borrow_mut())?;

        msg!(
            "Lottery initialized: EntranceFee={} SOL, Interval={}s, MaxPlayers={}, Coordinator={}",
            lamports_to_sol(config.entrance_fee),
            config.interval,
            config.max_players,
            config.oracle.coordinator
        );
        Ok(())
    }

    fn process_enter_lottery(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut lottery = Self::load_lottery(program_id, lottery_info)?;
        let event = lottery.enter(*player_info.key, amount)?;

        if player_info.lamports() < amount {
            msg!(
                "Insufficient funds: needed {} lamports, had {} lamports",
                amount,
                player_info.lamports()
            );
            return Err(ProgramError::InsufficientFunds);
        }

        invoke(
            &system_instruction::transfer(player_info.key, lottery_info.key, amount),
            &[
                player_info.clone(),
                lottery_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        lottery.pack_into(&mut lottery_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    /// Read-only evaluation, the status is set as return data
    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let lottery_info = next_account_info(account_info_iter)?;

        let lottery = Self::load_lottery(program_id, lottery_info)?;
        let status = lottery.check_upkeep(Clock::get()?.unix_timestamp);

        msg!(
            "Upkeep needed: {} (open={}, time_passed={}, has_players={}, has_balance={})",
            status.upkeep_needed(),
            status.is_open,
            status.time_passed,
            status.has_players,
            status.has_balance
        );
        let payload = status
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        set_return_data(&payload);
        Ok(())
    }

    fn process_perform_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;

        // Anyone can trigger upkeep, the conditions gate it
        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut lottery = Self::load_lottery(program_id, lottery_info)?;
        let now = Clock::get()?.unix_timestamp;

        let mut oracle = CoordinatorOracle::new(lottery_info.key, lottery.requests_issued());
        let event = lottery.perform_upkeep(now, &mut oracle)?;

        lottery.pack_into(&mut lottery_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    /// Settle the round: pick the winner from the random word and pay the pot
    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_word: [u8; 32],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let recipients = account_info_iter.as_slice();

        let mut lottery = Self::load_lottery(program_id, lottery_info)?;
        verify_coordinator(coordinator_info, lottery.oracle_config())?;

        let now = Clock::get()?.unix_timestamp;
        let rent_minimum = Rent::get()?.minimum_balance(lottery_info.data_len());

        let event = lottery.fulfill_random_words(request_id, &random_word, now, |winner, prize| {
            let winner_info = recipients
                .iter()
                .find(|info| info.key == winner)
                .ok_or(ProgramError::NotEnoughAccountKeys)?;
            Self::pay_out(lottery_info, winner_info, prize, rent_minimum)
        })?;

        lottery.pack_into(&mut lottery_info.data.borrow_mut())?;
        event.emit();
        Ok(())
    }

    /// Move `prize` lamports out of the program-owned lottery account
    fn pay_out(
        lottery_info: &AccountInfo,
        winner_info: &AccountInfo,
        prize: u64,
        rent_minimum: u64,
    ) -> ProgramResult {
        if !winner_info.is_writable || winner_info.executable {
            msg!("Winner account {} cannot receive lamports", winner_info.key);
            return Err(ProgramError::InvalidArgument);
        }

        let lottery_lamports = lottery_info
            .lamports()
            .checked_sub(prize)
            .ok_or(ProgramError::InsufficientFunds)?;
        if lottery_lamports < rent_minimum {
            msg!("Payout would leave the lottery below its rent-exempt minimum");
            return Err(ProgramError::InsufficientFunds);
        }
        let winner_lamports = winner_info
            .lamports()
            .checked_add(prize)
            .ok_or(ProgramError::InvalidArgument)?;

        **lottery_info.try_borrow_mut_lamports()? = lottery_lamports;
        **winner_info.try_borrow_mut_lamports()? = winner_lamports;

        msg!(
            "Transferred {} SOL to winner {}",
            lamports_to_sol(prize),
            winner_info.key
        );
        Ok(())
    }

    fn load_lottery(program_id: &Pubkey, lottery_info: &AccountInfo) -> Result<Lottery, ProgramError> {
        if lottery_info.owner != program_id {
            msg!("Lottery account must be owned by the program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let lottery = Lottery::unpack(&lottery_info.data.borrow())?;
        Ok(lottery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENT_MINIMUM: u64 = 100_000;

    fn account<'a>(
        key: &'a Pubkey,
        is_writable: bool,
        executable: bool,
        lamports: &'a mut u64,
        owner: &'a Pubkey,
    ) -> AccountInfo<'a> {
        AccountInfo::new(key, false, is_writable, lamports, &mut [], owner, executable, 0)
    }

    #[test]
    fn pay_out_moves_prize_to_winner() {
        let (lottery_key, winner_key, owner) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let mut lottery_lamports = 1_000_000;
        let mut winner_lamports = 5;
        let lottery_info = account(&lottery_key, true, false, &mut lottery_lamports, &owner);
        let winner_info = account(&winner_key, true, false, &mut winner_lamports, &owner);

        assert_eq!(Processor::pay_out(&lottery_info, &winner_info, 900_000, RENT_MINIMUM), Ok(()));
        assert_eq!(lottery_info.lamports(), 100_000);
        assert_eq!(winner_info.lamports(), 900_005);
    }

    #[test]
    fn pay_out_rejects_read_only_or_executable_winner() {
        let (lottery_key, winner_key, owner) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        for (is_writable, executable) in [(false, false), (true, true)] {
            let mut lottery_lamports = 1_000_000;
            let mut winner_lamports = 5;
            let lottery_info = account(&lottery_key, true, false, &mut lottery_lamports, &owner);
            let winner_info = account(&winner_key, is_writable, executable, &mut winner_lamports, &owner);

            assert_eq!(
                Processor::pay_out(&lottery_info, &winner_info, 1_000, RENT_MINIMUM),
                Err(ProgramError::InvalidArgument)
            );
            assert_eq!(lottery_info.lamports(), 1_000_000);
            assert_eq!(winner_info.lamports(), 5);
        }
    }

    #[test]
    fn pay_out_keeps_lottery_rent_exempt() {
        let (lottery_key, winner_key, owner) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let mut lottery_lamports = 1_000_000;
        let mut winner_lamports = 5;
        let lottery_info = account(&lottery_key, true, false, &mut lottery_lamports, &owner);
        let winner_info = account(&winner_key, true, false, &mut winner_lamports, &owner);

        for prize in [950_000, 2_000_000] {
            assert_eq!(
                Processor::pay_out(&lottery_info, &winner_info, prize, RENT_MINIMUM),
                Err(ProgramError::InsufficientFunds)
            );
        }
        assert_eq!(lottery_info.lamports(), 1_000_000);
        assert_eq!(winner_info.lamports(), 5);
    }
}
