//! Non-cryptographic fallback digest.
//!
//! Four independent 32-bit rolling hashes, each rendered as 8 hex digits,
//! concatenated into a 32 character digest. Used only when no secure
//! primitive is reachable. It has no collision resistance.
//!
//! All arithmetic wraps at signed 32 bits and the input is walked as
//! UTF-16 code units, so the output matches a browser `charCodeAt`
//! implementation for any string.

use async_trait::async_trait;

use super::{DigestPath, Digester};
use crate::error::Result;

/// Length of a fallback digest in hex characters.
pub const FALLBACK_DIGEST_LEN: usize = 32;

const DJB2_SEED: i32 = 5381;

/// `h = h * 31 + c`, forward.
fn forward_hash(units: &[u16]) -> i32 {
    units.iter().fold(0i32, |h, &c| {
        (h << 5).wrapping_sub(h).wrapping_add(c as i32)
    })
}

/// `h = h * 127 + c * (i + 1)`, forward.
fn weighted_hash(units: &[u16]) -> i32 {
    units.iter().enumerate().fold(0i32, |h, (i, &c)| {
        let weight = (i as i32).wrapping_add(1);
        (h << 7)
            .wrapping_sub(h)
            .wrapping_add((c as i32).wrapping_mul(weight))
    })
}

/// `h = (h << 3) ^ h ^ (c * (i + 1))`, last unit first.
fn reverse_hash(units: &[u16]) -> i32 {
    units.iter().enumerate().rev().fold(0i32, |h, (i, &c)| {
        let weight = (i as i32).wrapping_add(1);
        (h << 3) ^ h ^ (c as i32).wrapping_mul(weight)
    })
}

/// DJB2: `h = h * 33 + c`, seeded with 5381.
fn djb2_hash(units: &[u16]) -> i32 {
    units.iter().fold(DJB2_SEED, |h, &c| {
        (h << 5).wrapping_add(h).wrapping_add(c as i32)
    })
}

/// Compute the 32 hex character fallback digest of `input`.
pub fn fallback_digest(input: &str) -> String {
    let units: Vec<u16> = input.encode_utf16().collect();

    [
        forward_hash(&units),
        weighted_hash(&units),
        reverse_hash(&units),
        djb2_hash(&units),
    ]
    .iter()
    .map(|h| format!("{:08x}", h.unsigned_abs()))
    .collect()
}

/// Always-available digester backed by [`fallback_digest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackDigester;

impl FallbackDigester {
    /// Synchronous form; the fallback path never suspends.
    pub fn digest_now(&self, input: &str) -> String {
        fallback_digest(input)
    }
}

#[async_trait(?Send)]
impl Digester for FallbackDigester {
    fn path(&self) -> DigestPath {
        DigestPath::Fallback
    }

    async fn digest(&self, input: &str) -> Result<String> {
        Ok(fallback_digest(input))
    }
}
