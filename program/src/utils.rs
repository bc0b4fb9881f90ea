// Raffle Lottery Program - Utility Functions
use solana_program::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};

/// Seed of the singleton lottery account
pub const LOTTERY_SEED: &[u8] = b"lottery";

/// Find the program derived address of the lottery
pub fn find_lottery_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LOTTERY_SEED], program_id)
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert SOL to lamports
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_fractional_sol() {
        assert_eq!(sol_to_lamports(0.1), 100_000_000);
        assert_eq!(sol_to_lamports(0.025), 25_000_000);
        assert_eq!(lamports_to_sol(250_000_000), 0.25);
    }

    #[test]
    fn lottery_address_is_stable() {
        let program_id = Pubkey::new_unique();
        assert_eq!(find_lottery_address(&program_id), find_lottery_address(&program_id));
    }
}
