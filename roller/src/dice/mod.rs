pub mod arc4;

use std::fmt;

use arc4::Arc4;

/// Dice offered as shortcuts by the console.
pub const PRESET_DICE: [u32; 7] = [4, 6, 8, 10, 12, 20, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    /// No seed has been fetched yet; `0` marks the empty slot.
    #[error("seed is not set yet")]
    SeedNotReady,
    #[error("a die needs at least one side")]
    InvalidSides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roll {
    pub sides: u32,
    pub value: u32,
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}: {}", self.sides, self.value)
    }
}

/// Roll one `sides`-sided die from `seed`.
///
/// The generator is keyed by the decimal string of the seed and only its
/// first draw is used, so the same `(seed, sides)` always gives the same
/// value in `1..=sides`.
pub fn roll(seed: u32, sides: u32) -> Result<Roll, DiceError> {
    if seed == 0 {
        return Err(DiceError::SeedNotReady);
    }
    if sides == 0 {
        return Err(DiceError::InvalidSides);
    }
    let draw = Arc4::from_seed_str(&seed.to_string()).next_unit();
    Ok(Roll {
        sides,
        value: face(draw, sides),
    })
}

/// Map a draw in `[0, 1)` onto `1..=sides`. A draw just below 1 can round
/// the product up to `sides` for very large dice, hence the clamp.
fn face(draw: f64, sides: u32) -> u32 {
    ((draw * sides as f64).floor() as u32).min(sides - 1) + 1
}
