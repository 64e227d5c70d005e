//! The `Random` operation: drops a read with probability `1 - probability`.
//!
//! Seeded the same way as the rest of the crate's probabilistic paths: an
//! `IRMA_SEED`-style environment variable when present, OS randomness
//! otherwise (see `crate::utils::get_seed`), so runs are reproducible in
//! tests and CI without being reproducible by default in production use.

use crate::{
    ops::{ReadSelector, Status},
    record::ExtPair,
    stats::OpStat,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Mutex;

pub struct Random {
    pub probability: f64,
    pub label:       String,
    rng:             Mutex<Xoshiro256PlusPlus>,
}

impl Random {
    pub fn new(probability: f64, label: String) -> Self {
        let rng = match crate::utils::get_seed() {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_os_rng(),
        };
        Random { probability, label, rng: Mutex::new(rng) }
    }

    pub fn transform(&self, _pair: &mut ExtPair, _side: ReadSelector, _stats: &mut OpStat, _verbosity: u8) -> Status {
        let draw: f64 = self.rng.lock().expect("random rng mutex poisoned").random();
        if draw >= self.probability {
            return Status::Drop;
        }
        Status::Keep
    }
}
