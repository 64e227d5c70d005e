pub(crate) mod whichever;

use std::env;

const SEED_ENV_VAR: &str = "IRMA_SEED";

/// Reads a reproducibility seed for [`crate::ops::random::Random`] from the
/// environment, the same variable and folding scheme the teacher repo uses
/// for its own seeded hash maps.
pub fn get_seed() -> Option<u64> {
    env::var(SEED_ENV_VAR).ok().map(|s| s.bytes().fold(0, |a, b| a ^ b) as u64)
}
