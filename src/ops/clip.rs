//! The `Clip` operation: removes a fixed-length run from one end of a read.

use crate::{
    ops::{ReadSelector, Status},
    record::{join_two, ExtPair, Record},
    stats::OpStat,
    trim::TrimSide,
};

pub struct Clip {
    pub end:           TrimSide,
    pub length:        usize,
    pub add_clipped:   bool,
    pub add_separator: bool,
    pub label:         String,
}

impl Clip {
    pub fn new(end: TrimSide, length: usize, add_clipped: bool, add_separator: bool, label: String) -> Self {
        Clip { end, length, add_clipped, add_separator, label }
    }

    pub fn transform(&self, pair: &mut ExtPair, side: ReadSelector, stats: &mut OpStat, _verbosity: u8) -> Status {
        let too_short = match side {
            ReadSelector::R1 => pair.r1.len() < self.length,
            ReadSelector::R2 => pair.r2.len() < self.length,
        };
        if too_short {
            stats.bump(side.side(), &self.label, "too_short");
            return Status::Drop;
        }

        let clipped = match side {
            ReadSelector::R1 => self.apply(&mut pair.r1),
            ReadSelector::R2 => self.apply(&mut pair.r2),
        };

        // matches the original's behavior of annotating both mates'
        // names regardless of which side was actually clipped
        if self.add_clipped {
            join_two(&mut pair.r1.name, &clipped, self.add_separator);
            if pair.paired {
                join_two(&mut pair.r2.name, &clipped, self.add_separator);
            }
        }

        Status::Keep
    }

    /// Slices `self.length` bytes from the configured end of `rec`, returning
    /// the removed bytes. Shared with the internal ligand clip delegated to
    /// by `Demultiplex` and `Trim`.
    pub fn apply(&self, rec: &mut Record) -> Vec<u8> {
        let len = rec.len();
        let (keep_start, keep_end, clip_start, clip_end) = match self.end {
            TrimSide::Five => (self.length, len, 0, self.length),
            TrimSide::Three => (0, len - self.length, len - self.length, len),
        };
        let clipped_seq = rec.seq[clip_start..clip_end].to_vec();
        rec.seq = rec.seq[keep_start..keep_end].to_vec();
        rec.qual = rec.qual[keep_start..keep_end].to_vec();
        clipped_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::OpStat;

    fn pair(seq: &[u8]) -> ExtPair {
        ExtPair::new(0, Record::new(b"r1".to_vec(), seq.to_vec(), vec![b'I'; seq.len()]), Record::default(), false)
    }

    #[test]
    fn clips_five_prime() {
        let clip = Clip::new(TrimSide::Five, 3, false, true, "clip".into());
        let mut p = pair(b"ACGTAC");
        let mut stats = OpStat::new(100, 50, 33, false, "t".into(), None, None);
        let status = clip.transform(&mut p, ReadSelector::R1, &mut stats, 0);
        assert_eq!(status, Status::Keep);
        assert_eq!(p.r1.seq, b"TAC");
        assert_eq!(p.r1.qual, b"III");
    }

    #[test]
    fn too_short_drops_and_bumps_bucket() {
        let clip = Clip::new(TrimSide::Five, 10, false, true, "clip".into());
        let mut p = pair(b"ACGT");
        let mut stats = OpStat::new(100, 50, 33, false, "t".into(), None, None);
        let status = clip.transform(&mut p, ReadSelector::R1, &mut stats, 0);
        assert_eq!(status, Status::Drop);
        assert_eq!(stats.ops_r1["clip"]["too_short"], 1);
    }

    #[test]
    fn add_clipped_annotates_both_mates_when_paired() {
        let clip = Clip::new(TrimSide::Five, 3, true, true, "clip".into());
        let mut p = ExtPair::new(
            0,
            Record::new(b"r1".to_vec(), b"ACGTAC".to_vec(), vec![b'I'; 6]),
            Record::new(b"r1".to_vec(), b"GGGGGG".to_vec(), vec![b'I'; 6]),
            true,
        );
        let mut stats = OpStat::new(100, 50, 33, true, "t".into(), None, None);
        clip.transform(&mut p, ReadSelector::R1, &mut stats, 0);
        assert_eq!(p.r1.name, b"r1#ACG");
        assert_eq!(p.r2.name, b"r1#ACG");
    }
}
