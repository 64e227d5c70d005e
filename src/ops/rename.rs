//! The `Rename` operation: rewrites read names around a dense renumbering.
//!
//! Declared not thread-safe: it runs once per pair in the writer stage, on
//! records already in final output order, and assigns a fresh counter
//! starting at 1 — separate from the pipeline's internal `id` — which is the
//! reason the coordinator must keep the pipeline ordered.

use crate::{
    ops::{ReadSelector, Status},
    record::{get_barcode, merge_barcode, ExtPair, Record},
    stats::OpStat,
};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Rename {
    pub new_name:     Vec<u8>,
    pub base36:       bool,
    pub keep_barcode: bool,
    pub merge_barcode: bool,
    pub all_reads:    bool,
    pub label:        String,
    /// An atomic (rather than a `Cell`) so `Operation` stays `Sync`; in
    /// practice this only ever runs serially on the writer stage's thread.
    counter:          AtomicU64,
}

impl Rename {
    pub fn new(new_name: Vec<u8>, base36: bool, keep_barcode: bool, merge_barcode: bool, all_reads: bool, label: String) -> Self {
        Rename { new_name, base36, keep_barcode, merge_barcode, all_reads, label, counter: AtomicU64::new(0) }
    }

    pub fn transform(&self, pair: &mut ExtPair, side: ReadSelector, _stats: &mut OpStat, _verbosity: u8) -> Status {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let formatted = if self.base36 { to_base36(id) } else { id.to_string() };

        if self.all_reads {
            self.rename_one(&mut pair.r1, &formatted);
            if pair.paired {
                self.rename_one(&mut pair.r2, &formatted);
            }
        } else {
            match side {
                ReadSelector::R1 => self.rename_one(&mut pair.r1, &formatted),
                ReadSelector::R2 => self.rename_one(&mut pair.r2, &formatted),
            }
        }

        Status::Keep
    }

    fn rename_one(&self, rec: &mut Record, formatted: &str) {
        let barcode = if self.keep_barcode {
            let b = get_barcode(&rec.name);
            if self.merge_barcode { merge_barcode(&b) } else { b }
        } else {
            Vec::new()
        };

        let mut name = self.new_name.clone();
        name.extend_from_slice(formatted.as_bytes());
        name.extend_from_slice(&barcode);
        rec.name = name;
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).expect("base36 digits are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> ExtPair {
        ExtPair::new(0, Record::new(b"orig#AAAA".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec()), Record::default(), false)
    }

    #[test]
    fn counter_starts_at_one_and_increments() {
        let op = Rename::new(b"read_".to_vec(), false, false, false, true, "rename".into());
        let mut stats = OpStat::new(10, 10, 33, false, "t".into(), None, None);
        let mut p1 = pair();
        op.transform(&mut p1, ReadSelector::R1, &mut stats, 0);
        assert_eq!(p1.r1.name, b"read_1");
        let mut p2 = pair();
        op.transform(&mut p2, ReadSelector::R1, &mut stats, 0);
        assert_eq!(p2.r1.name, b"read_2");
    }

    #[test]
    fn base36_formats_37_as_11() {
        assert_eq!(to_base36(37), "11");
    }

    #[test]
    fn keep_barcode_preserves_trailing_annotation() {
        let op = Rename::new(b"read_".to_vec(), false, true, false, true, "rename".into());
        let mut stats = OpStat::new(10, 10, 33, false, "t".into(), None, None);
        let mut p = pair();
        op.transform(&mut p, ReadSelector::R1, &mut stats, 0);
        assert_eq!(p.r1.name, b"read_1#AAAA");
    }
}
