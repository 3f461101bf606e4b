//! Slot machine mini-game behind the `slots` command.
//!
//! Three symbols drawn uniformly per spin; all three equal pays the jackpot
//! line. Stateless by design: no coins, no persistence, just the spin.

use rand::seq::SliceRandom;

/// Reel symbols, drawn uniformly with replacement.
pub const SYMBOLS: [&str; 5] = ["🍒", "🍋", "🔔", "⭐", "💎"];

/// Result of a spin for formatting by the caller.
#[derive(Debug, Clone)]
pub struct SpinOutcome {
    pub reels: [&'static str; 3],
    pub jackpot: bool,
}

impl SpinOutcome {
    /// The `a | b | c` reel line.
    pub fn line(&self) -> String {
        self.reels.join(" | ")
    }
}

/// Spin the three reels.
pub fn spin() -> SpinOutcome {
    let mut rng = rand::thread_rng();
    let mut reels = ["", "", ""];
    for reel in reels.iter_mut() {
        // SYMBOLS is non-empty, so choose always succeeds.
        *reel = SYMBOLS.choose(&mut rng).copied().unwrap_or(SYMBOLS[0]);
    }
    let jackpot = reels[0] == reels[1] && reels[1] == reels[2];
    SpinOutcome { reels, jackpot }
}
