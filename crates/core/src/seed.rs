//! Seed resolution

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::Result;

/// Return the caller's seed, or draw a fresh 32-bit one from the OS.
///
/// The resolved seed is always logged so a run can be reproduced.
pub fn resolve_seed(seed: Option<u64>) -> Result<u64> {
    let seed = match seed {
        Some(seed) => seed,
        None => random_seed()?,
    };
    tracing::info!("Using seed: {}", seed);
    Ok(seed)
}

fn random_seed() -> Result<u64> {
    let mut bytes = [0u8; 4];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(u32::from_be_bytes(bytes) as u64)
}
