// Raffle Lottery Program - Events
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Tag prefixed to every event record in the program log
pub const EVENT_TAG: &[u8] = b"lottery_event";

/// Notifications emitted by the lottery state machine
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum LotteryEvent {
    /// A player paid and entered the current round
    RaffleEnter { player: Pubkey },
    /// The round closed and randomness was requested
    RequestedRaffleWinner { request_id: u64 },
    /// The round settled and the pot was paid out
    WinnerPicked { winner: Pubkey, prize: u64 },
}

impl LotteryEvent {
    /// Write the event to the program log, as text and as a borsh record
    pub fn emit(&self) {
        match self {
            LotteryEvent::RaffleEnter { player } => msg!("RaffleEnter: {}", player),
            LotteryEvent::RequestedRaffleWinner { request_id } => {
                msg!("RequestedRaffleWinner: {}", request_id)
            }
            LotteryEvent::WinnerPicked { winner, prize } => {
                msg!("WinnerPicked: {} won {} lamports", winner, prize)
            }
        }

        if let Ok(data) = self.try_to_vec() {
            sol_log_data(&[EVENT_TAG, &data]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_decode_back_to_the_event() {
        let event = LotteryEvent::WinnerPicked {
            winner: Pubkey::new_unique(),
            prize: 400_000_000,
        };
        let data = event.try_to_vec().unwrap();
        // variant tag, winner, prize
        assert_eq!(data.len(), 1 + 32 + 8);
        assert_eq!(data[0], 2);
        assert_eq!(LotteryEvent::try_from_slice(&data).unwrap(), event);
    }
}
