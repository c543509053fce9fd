//! Opaque token generation.
//!
//! Tokens are lowercase hex strings drawn from the operating system CSPRNG.
//! With the default 6 random bytes (12 hex characters) the token space is
//! 2^48; see [`collision_probability`] to size it for a deployment.

use std::ops::RangeInclusive;

use rand::rngs::OsRng;
use rand::RngCore;

/// Default number of random bytes per token.
pub const DEFAULT_TOKEN_BYTES: usize = 6;

/// Smallest and largest supported token sizes, in random bytes.
pub const TOKEN_BYTES_RANGE: RangeInclusive<usize> = 4..=32;

/// Source of fresh tokens for a session mapping.
///
/// Implementations must keep producing new values; a session retries a draw
/// whenever it collides with a token already present in the same map.
pub trait TokenSource {
    fn next_token(&mut self) -> String;
}

/// Hex tokens backed by `OsRng`.
#[derive(Debug, Clone)]
pub struct RandomTokens {
    bytes: usize,
}

impl RandomTokens {
    /// Sizes outside [`TOKEN_BYTES_RANGE`] are clamped into it, so a map
    /// never runs out of distinct tokens.
    pub fn new(bytes: usize) -> Self {
        let bytes = bytes.clamp(*TOKEN_BYTES_RANGE.start(), *TOKEN_BYTES_RANGE.end());
        Self { bytes }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Default for RandomTokens {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BYTES)
    }
}

impl TokenSource for RandomTokens {
    fn next_token(&mut self) -> String {
        let mut buf = vec![0u8; self.bytes];
        OsRng.fill_bytes(&mut buf);
        hex::encode(buf)
    }
}

/// Birthday bound: probability that `count` tokens of `bytes` random bytes
/// contain at least one duplicate.
pub fn collision_probability(count: usize, bytes: usize) -> f64 {
    if count < 2 {
        return 0.0;
    }
    let space = 2f64.powi((bytes * 8) as i32);
    let n = count as f64;
    1.0 - (-(n * (n - 1.0)) / (2.0 * space)).exp()
}
