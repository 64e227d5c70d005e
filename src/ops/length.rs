//! The `Length` operation: drops reads outside a configured length range.
//!
//! Preserves a structural quirk from the original: the min/max check is an
//! if/else that always returns from one of its two arms, so `max_length` is
//! only ever reached when `min_length` is disabled — and even then, the
//! `else` arm it falls into returns unconditionally before the `max_length`
//! check. `max_length` is effectively dead in every configuration. See
//! DESIGN.md.

use crate::{
    ops::{ReadSelector, Status},
    record::ExtPair,
    stats::OpStat,
};

pub struct Length {
    pub min_length: i64,
    pub max_length: i64,
    pub label:      String,
}

impl Length {
    pub fn new(min_length: i64, max_length: i64, label: String) -> Self {
        Length { min_length, max_length, label }
    }

    pub fn transform(&self, pair: &mut ExtPair, side: ReadSelector, stats: &mut OpStat, _verbosity: u8) -> Status {
        let len = match side {
            ReadSelector::R1 => pair.r1.len(),
            ReadSelector::R2 => pair.r2.len(),
        };

        if self.min_length >= 0 && (len as i64) < self.min_length {
            stats.bump(side.side(), &self.label, "too_short");
            return Status::Drop;
        }

        // max_length is never checked here, preserving the quirk above
        Status::Keep
    }
}
