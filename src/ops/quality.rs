//! The `Quality` operation: drops reads below a mean-quality threshold.

use crate::{
    ops::{ReadSelector, Status},
    record::ExtPair,
    stats::OpStat,
};

pub struct Quality {
    pub min_quality: i32,
    pub ascii_min:   i32,
    pub label:       String,
}

impl Quality {
    pub fn new(min_quality: i32, ascii_min: i32, label: String) -> Self {
        Quality { min_quality, ascii_min, label }
    }

    pub fn transform(&self, pair: &mut ExtPair, side: ReadSelector, _stats: &mut OpStat, _verbosity: u8) -> Status {
        if self.min_quality < 0 {
            return Status::Keep;
        }

        let qual = match side {
            ReadSelector::R1 => &pair.r1.qual,
            ReadSelector::R2 => &pair.r2.qual,
        };
        if qual.is_empty() {
            return Status::Keep;
        }

        let sum: i64 = qual.iter().map(|&q| (q as i32 - self.ascii_min) as i64).sum();
        let mean = sum as f64 / qual.len() as f64;

        if mean < self.min_quality as f64 {
            return Status::Drop;
        }

        Status::Keep
    }
}
