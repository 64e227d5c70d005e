//! The `Demultiplex` operation: routes a read to one of several writer bins
//! based on a barcode identified either in the sequence or in the name.

use crate::{
    ops::{clip::Clip, ReadSelector, Status},
    record::{get_barcodes, ExtPair},
    stats::OpStat,
    trim::TrimSide,
};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct Demultiplex {
    pub barcodes:      Vec<Vec<u8>>,
    pub use_seq:       bool,
    pub end:           TrimSide,
    pub barcode_idx:   usize,
    pub max_mismatch:  usize,
    pub length_ligand: usize,
    pub label:         String,
    /// The writer-bin index of `"undetermined"`; every barcode occupies
    /// `base_index + 1 + i`. Written once by `get_dpx`, before workers start;
    /// an atomic (rather than a `Cell`) so `Operation` stays `Sync` and can be
    /// shared via `Arc` across worker threads.
    base_index: AtomicUsize,
}

impl Demultiplex {
    pub fn new(
        barcodes: Vec<Vec<u8>>,
        use_seq: bool,
        end: TrimSide,
        barcode_idx: usize,
        max_mismatch: usize,
        length_ligand: usize,
        label: String,
    ) -> Self {
        Demultiplex { barcodes, use_seq, end, barcode_idx, max_mismatch, length_ligand, label, base_index: AtomicUsize::new(0) }
    }

    pub fn get_dpx(&self, next_idx: usize) -> (Vec<String>, usize) {
        self.base_index.store(next_idx, Ordering::Relaxed);
        let mut names = vec!["undetermined".to_string()];
        names.extend(self.barcodes.iter().map(|bc| String::from_utf8_lossy(bc).into_owned()));
        let next = next_idx + names.len();
        (names, next)
    }

    pub fn transform(&self, pair: &mut ExtPair, side: ReadSelector, stats: &mut OpStat, verbosity: u8) -> Status {
        let rec = match side {
            ReadSelector::R1 => &pair.r1,
            ReadSelector::R2 => &pair.r2,
        };

        // extracted once: the fixed name segment used in name mode
        let name_barcode = (!self.use_seq).then(|| get_barcodes(&rec.name).into_iter().nth(self.barcode_idx)).flatten();

        let mut found_idx = None;
        for (i, bc) in self.barcodes.iter().enumerate() {
            // a barcode is only a candidate when the read actually has room
            // for it: strictly longer than the barcode in sequence mode
            // (there must be a read left over to keep), exactly as long in
            // name mode
            let mismatches = if self.use_seq {
                if rec.seq.len() <= bc.len() {
                    continue;
                }
                let window = extract_window(&rec.seq, bc.len(), self.end);
                hamming_with_padding(&window, bc)
            } else {
                match &name_barcode {
                    Some(nb) if nb.len() == bc.len() => hamming_with_padding(nb, bc),
                    _ => continue,
                }
            };

            if mismatches == 0 {
                found_idx = Some(i);
                break;
            } else if mismatches <= self.max_mismatch {
                found_idx = Some(i);
            }
        }

        let base = self.base_index.load(Ordering::Relaxed);
        match found_idx {
            Some(i) => {
                pair.wid = base + 1 + i;
                let bucket = String::from_utf8_lossy(&self.barcodes[i]).into_owned();
                stats.bump(side.side(), &self.label, &bucket);

                if self.use_seq {
                    let clip_len = self.barcodes[i].len() + self.length_ligand;
                    // always invoked, mirroring the original's unconditional
                    // call: a too-short remainder still bumps "{label}-clip"'s
                    // too_short bucket even though the returned Drop is
                    // discarded and the read is kept unclipped
                    let ligand_clip = Clip::new(self.end, clip_len, false, true, format!("{}-clip", self.label));
                    let _ = ligand_clip.transform(pair, side, stats, verbosity);
                }
            }
            None => {
                pair.wid = base;
                stats.bump(side.side(), &self.label, "undetermined");
            }
        }

        Status::Keep
    }
}

/// Extracts the `len`-byte window from the given end of `seq`. Callers must
/// only invoke this once `seq` is known to be strictly longer than `len`.
fn extract_window(seq: &[u8], len: usize, end: TrimSide) -> Vec<u8> {
    let n = len.min(seq.len());
    match end {
        TrimSide::Five => seq[..n].to_vec(),
        TrimSide::Three => seq[seq.len() - n..].to_vec(),
    }
}

/// Hamming distance over the overlapping prefix, plus one mismatch per byte
/// of length difference.
fn hamming_with_padding(a: &[u8], b: &[u8]) -> usize {
    let n = a.len().min(b.len());
    let direct = (0..n).filter(|&i| a[i] != b[i]).count();
    direct + a.len().abs_diff(b.len())
}
