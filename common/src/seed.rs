use serde::{Deserialize, Serialize};

/// Path of the seed endpoint on the seed server.
pub const SEED_PATH: &str = "/random-seed";

/// Body of a `GET /random-seed` response: `{ "seed": <u32> }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedResponse {
    pub seed: u32,
}

impl SeedResponse {
    /// Build a seed from four raw bytes, read as a little-endian `u32`.
    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self {
            seed: u32::from_le_bytes(bytes),
        }
    }
}
