//! The `Trim` operation: dispatches to one of six adapter/quality trimming
//! kernels and applies the shared outcome-filtering/name-annotation/ligand
//! handling described in SPEC_FULL.md §4.3.

use crate::{
    ops::{clip::Clip, ReadSelector, Status},
    record::{join_two, ExtPair, Record},
    stats::{OpStat, Side},
    trim::{
        align::align,
        bktrim::{Matrix, MatrixSide, Solution},
        position_match::position_match,
        quality_trim::quality_trim,
        search::search,
        TrimOutcome, TrimResult, TrimSide,
    },
};
use std::collections::HashSet;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TrimAlgo {
    Align,
    Bktrim,
    BktrimPaired,
    Search,
    Match,
    TrimQual,
}

pub struct Trim {
    pub algo:                 TrimAlgo,
    pub sequences:            Vec<Vec<u8>>,
    pub sequences_paired:     Vec<Vec<u8>>,
    pub end:                  TrimSide,
    pub min_sequence:         usize,
    pub min_score:            f32,
    pub position:             usize,
    pub keep:                 HashSet<String>,
    pub length_ligand:        usize,
    pub add_trimmed:          bool,
    pub add_trimmed_ref:      bool,
    pub add_separator:        bool,
    pub add_ligand:           bool,
    pub add_ligand_separator: bool,
    pub apply_trim_seq:       bool,
    pub window:               usize,
    pub unqualified_prop_max: f32,
    pub min_quality:          i32,
    pub ascii_min:            i32,
    pub epsilon:              f32,
    pub epsilon_indel:        f32,
    pub min_overlap:          usize,
    pub label:                String,

    matrix:       Option<Matrix>,
    matrix_pairs: Vec<Matrix>,
}

impl Trim {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        algo: TrimAlgo,
        sequences: Vec<Vec<u8>>,
        sequences_paired: Vec<Vec<u8>>,
        end: TrimSide,
        min_sequence: usize,
        min_score: f32,
        position: usize,
        keep: HashSet<String>,
        length_ligand: usize,
        add_trimmed: bool,
        add_trimmed_ref: bool,
        add_separator: bool,
        add_ligand: bool,
        add_ligand_separator: bool,
        apply_trim_seq: bool,
        window: usize,
        unqualified_prop_max: f32,
        min_quality: i32,
        ascii_min: i32,
        epsilon: f32,
        epsilon_indel: f32,
        min_overlap: usize,
        label: String,
    ) -> Self {
        let matrix = match algo {
            TrimAlgo::Bktrim => {
                let side = matrix_side(end);
                let mut m = Matrix::new(epsilon, epsilon_indel, min_overlap, ascii_min);
                for seq in &sequences {
                    m.add_adapter(seq, side, 0);
                }
                Some(m)
            }
            _ => None,
        };
        let matrix_pairs = match algo {
            // one matrix per matched (sequences[i], sequences_paired[i]) pair,
            // so the pair can never be scored against a mismatched adapter
            TrimAlgo::BktrimPaired => sequences
                .iter()
                .zip(sequences_paired.iter())
                .map(|(seq1, seq2)| {
                    let mut m = Matrix::new(epsilon, epsilon_indel, min_overlap, ascii_min);
                    m.add_adapter(seq1, MatrixSide::Tail, 0);
                    m.add_adapter(seq2, MatrixSide::Tail, 1);
                    m
                })
                .collect(),
            _ => Vec::new(),
        };

        Trim {
            algo,
            sequences,
            sequences_paired,
            end,
            min_sequence,
            min_score,
            position,
            keep,
            length_ligand,
            add_trimmed,
            add_trimmed_ref,
            add_separator,
            add_ligand,
            add_ligand_separator,
            apply_trim_seq,
            window,
            unqualified_prop_max,
            min_quality,
            ascii_min,
            epsilon,
            epsilon_indel,
            min_overlap,
            label,
            matrix,
            matrix_pairs,
        }
    }

    pub fn transform(&self, pair: &mut ExtPair, side: ReadSelector, stats: &mut OpStat, _verbosity: u8) -> Status {
        if self.algo == TrimAlgo::BktrimPaired {
            return self.transform_paired(pair, stats);
        }

        let result = match side {
            ReadSelector::R1 => self.run_kernel(&pair.r1.seq, &pair.r1.qual),
            ReadSelector::R2 => self.run_kernel(&pair.r2.seq, &pair.r2.qual),
        };

        self.finish(pair, side, &result, stats)
    }

    fn run_kernel(&self, seq: &[u8], qual: &[u8]) -> TrimResult {
        match self.algo {
            TrimAlgo::Align => align(seq, &self.sequences, self.end, self.min_sequence, self.min_score),
            TrimAlgo::Search => search(seq, &self.sequences, self.end, self.min_sequence, self.min_score),
            TrimAlgo::Match => position_match(seq, &self.sequences, self.end, self.position, self.min_score),
            TrimAlgo::TrimQual => quality_trim(seq, qual, self.end, self.window, self.unqualified_prop_max, self.min_quality, self.ascii_min),
            TrimAlgo::Bktrim => self.run_bktrim(seq, qual),
            TrimAlgo::BktrimPaired => unreachable!("handled by transform_paired"),
        }
    }

    fn run_bktrim(&self, seq: &[u8], qual: &[u8]) -> TrimResult {
        let Some(matrix) = &self.matrix else {
            return TrimResult::no_trim();
        };
        let (determined, sol) = matrix.find_adapter(seq, qual);
        if !determined {
            return TrimResult::no_trim();
        }
        if sol.pos <= 0 {
            return TrimResult { outcome: TrimOutcome::TrimTooShort, adapter_index: 0, score: sol.score, trim_start: 0, trim_end: 0, trimmed: seq.to_vec() };
        }

        let pos = (sol.pos as usize).min(seq.len());
        let (trim_start, trim_end, trimmed) = match self.end {
            TrimSide::Five => (pos, seq.len(), seq[..pos].to_vec()),
            TrimSide::Three => (0, pos, seq[pos..].to_vec()),
        };
        let exact_threshold = 10.0 * self.sequences.first().map_or(0, |s| s.len()) as f32;
        let outcome = if sol.score >= exact_threshold { TrimOutcome::TrimExact } else { TrimOutcome::TrimAlign };

        TrimResult { outcome, adapter_index: 0, score: sol.score, trim_start, trim_end, trimmed }
    }

    fn transform_paired(&self, pair: &mut ExtPair, stats: &mut OpStat) -> Status {
        // find the matched adapter pair with the best summed score across both
        // mates; each matrix holds exactly one (sequences[i], sequences_paired[i])
        // pair, so R1 and R2 can never be scored against mismatched adapters
        let mut found_any = false;
        let mut best_score = 0.0f32;
        let mut best_sols = (Solution::default(), Solution::default());
        let mut best_matrix: Option<&Matrix> = None;

        for m in &self.matrix_pairs {
            let (found, sol1, sol2) = m.find_adapter_with_pe(&pair.r1.seq, &pair.r1.qual, &pair.r2.seq, &pair.r2.qual);
            if !found {
                continue;
            }
            found_any = true;
            let score = sol1.score + sol2.score;
            if best_matrix.is_none() || best_score <= score {
                best_score = score;
                best_sols = (sol1, sol2);
                best_matrix = Some(m);
            }
        }

        let (sol1, sol2) = best_sols;
        let outcome = if !found_any {
            TrimOutcome::NoTrim
        } else if sol1.pos <= 0 || sol2.pos <= 0 {
            TrimOutcome::TrimTooShort
        } else {
            TrimOutcome::TrimAlign
        };

        stats.bump(Side::R1, &self.label, outcome.as_str());

        if !self.keep.contains(outcome.as_str()) {
            return Status::Drop;
        }
        if outcome == TrimOutcome::NoTrim {
            return Status::Keep;
        }

        // per SPEC_FULL §4.4: if combine_pair_seqs reports failure the trim is
        // not applied, but the outcome already recorded above still stands
        if self.apply_trim_seq {
            if let Some(m) = best_matrix {
                if let Some(_combined) = m.combine_pair_seqs(&pair.r1.seq, &pair.r2.seq, &sol1, &sol2) {
                    apply_solution(&mut pair.r1, &sol1);
                    apply_solution(&mut pair.r2, &sol2);
                }
            }
        }

        Status::Keep
    }

    /// Shared post-processing: outcome bucket, keep-set filtering, trim
    /// application, the internal ligand clip, and name annotation onto both
    /// mates.
    fn finish(&self, pair: &mut ExtPair, side: ReadSelector, result: &TrimResult, stats: &mut OpStat) -> Status {
        stats.bump(side.side(), &self.label, result.outcome.as_str());

        if !self.keep.contains(result.outcome.as_str()) {
            return Status::Drop;
        }
        if result.outcome == TrimOutcome::NoTrim {
            return Status::Keep;
        }

        let rec = match side {
            ReadSelector::R1 => &mut pair.r1,
            ReadSelector::R2 => &mut pair.r2,
        };
        result.apply(&mut rec.seq, &mut rec.qual, self.apply_trim_seq);

        let mut ligand_bytes = Vec::new();
        if self.length_ligand > 0 {
            if rec.len() < self.length_ligand {
                // mirrors Clip::transform's too-short path: an undersized
                // ligand remainder drops the whole pair, it doesn't just
                // skip the clip
                stats.bump(side.side(), &self.label, "too_short");
                return Status::Drop;
            }
            let ligand_clip = Clip::new(self.end, self.length_ligand, false, true, self.label.clone());
            ligand_bytes = ligand_clip.apply(rec);
        }

        if self.add_trimmed_ref {
            let reference = self.sequences.get(result.adapter_index).cloned().unwrap_or_default();
            join_two(&mut pair.r1.name, &reference, self.add_separator);
            if pair.paired {
                join_two(&mut pair.r2.name, &reference, self.add_separator);
            }
        }
        if self.add_trimmed {
            join_two(&mut pair.r1.name, &result.trimmed, self.add_separator);
            if pair.paired {
                join_two(&mut pair.r2.name, &result.trimmed, self.add_separator);
            }
        }
        if self.add_ligand && !ligand_bytes.is_empty() {
            join_two(&mut pair.r1.name, &ligand_bytes, self.add_ligand_separator);
            if pair.paired {
                join_two(&mut pair.r2.name, &ligand_bytes, self.add_ligand_separator);
            }
        }

        Status::Keep
    }
}

fn matrix_side(end: TrimSide) -> MatrixSide {
    match end {
        TrimSide::Five => MatrixSide::Head,
        TrimSide::Three => MatrixSide::Tail,
    }
}

fn apply_solution(rec: &mut Record, sol: &Solution) {
    let pos = (sol.pos.max(0) as usize).min(rec.len());
    match sol.side {
        Some(MatrixSide::Head) => {
            rec.seq = rec.seq[pos..].to_vec();
            rec.qual = rec.qual[pos..].to_vec();
        }
        _ => {
            rec.seq.truncate(pos);
            rec.qual.truncate(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn all_outcomes() -> HashSet<String> {
        ["no_trim", "trim_exact", "trim_align", "trim_too_short"].iter().map(|s| s.to_string()).collect()
    }

    fn pair(seq: &[u8]) -> ExtPair {
        ExtPair::new(0, Record::new(b"r".to_vec(), seq.to_vec(), vec![b'I'; seq.len()]), Record::default(), false)
    }

    #[test]
    fn search_trims_exact_adapter() {
        let op = Trim::new(
            TrimAlgo::Search,
            vec![b"ACG".to_vec()],
            vec![],
            TrimSide::Three,
            3,
            0.8,
            0,
            all_outcomes(),
            0,
            false,
            false,
            true,
            false,
            true,
            true,
            5,
            0.6,
            15,
            33,
            0.1,
            0.03,
            3,
            "trim".into(),
        );
        let mut stats = OpStat::new(100, 50, 33, false, "t".into(), None, None);
        let mut p = pair(b"AAAATTTACG");
        let status = op.transform(&mut p, ReadSelector::R1, &mut stats, 0);
        assert_eq!(status, Status::Keep);
        assert_eq!(p.r1.seq, b"AAAATTT");
        assert_eq!(stats.ops_r1["trim"]["trim_exact"], 1);
    }

    #[test]
    fn ligand_clip_shorter_than_remainder_drops_the_pair() {
        let op = Trim::new(
            TrimAlgo::Search,
            vec![b"ACG".to_vec()],
            vec![],
            TrimSide::Three,
            3,
            0.8,
            0,
            all_outcomes(),
            10, // remainder after trim is only 7 bytes long
            false,
            false,
            true,
            false,
            true,
            true,
            5,
            0.6,
            15,
            33,
            0.1,
            0.03,
            3,
            "trim".into(),
        );
        let mut stats = OpStat::new(100, 50, 33, false, "t".into(), None, None);
        let mut p = pair(b"AAAATTTACG");
        assert_eq!(op.transform(&mut p, ReadSelector::R1, &mut stats, 0), Status::Drop);
    }

    #[test]
    fn ligand_clip_annotates_name_when_it_fits() {
        let op = Trim::new(
            TrimAlgo::Search,
            vec![b"ACG".to_vec()],
            vec![],
            TrimSide::Three,
            3,
            0.8,
            0,
            all_outcomes(),
            2,
            false,
            false,
            true,
            true,
            true,
            true,
            5,
            0.6,
            15,
            33,
            0.1,
            0.03,
            3,
            "trim".into(),
        );
        let mut stats = OpStat::new(100, 50, 33, false, "t".into(), None, None);
        let mut p = pair(b"AAAATTTACG");
        let status = op.transform(&mut p, ReadSelector::R1, &mut stats, 0);
        assert_eq!(status, Status::Keep);
        assert_eq!(p.r1.seq, b"AAAAT");
        assert!(p.r1.name.ends_with(b"#TT"));
    }

    #[test]
    fn outcome_outside_keep_set_drops() {
        let mut keep = HashSet::new();
        keep.insert("trim_too_short".to_string());
        let op = Trim::new(
            TrimAlgo::Search,
            vec![b"ACG".to_vec()],
            vec![],
            TrimSide::Three,
            3,
            0.8,
            0,
            keep,
            0,
            false,
            false,
            true,
            false,
            true,
            true,
            5,
            0.6,
            15,
            33,
            0.1,
            0.03,
            3,
            "trim".into(),
        );
        let mut stats = OpStat::new(100, 50, 33, false, "t".into(), None, None);
        let mut p = pair(b"AAAATTTACG");
        assert_eq!(op.transform(&mut p, ReadSelector::R1, &mut stats, 0), Status::Drop);
    }

    #[test]
    fn bktrim_paired_does_not_cross_match_mismatched_adapter_pairs() {
        // two matched pairs: (AAAA, CCCC) and (GGGG, TTTT). R1 only matches the
        // first pair's adapter, R2 only matches the second pair's — neither
        // matched pair fully matches, so the outcome must not be trim_align.
        let op = Trim::new(
            TrimAlgo::BktrimPaired,
            vec![b"AAAA".to_vec(), b"GGGG".to_vec()],
            vec![b"CCCC".to_vec(), b"TTTT".to_vec()],
            TrimSide::Three,
            0,
            0.0,
            0,
            all_outcomes(),
            0,
            false,
            false,
            true,
            false,
            true,
            true,
            5,
            0.6,
            15,
            33,
            0.1,
            0.03,
            3,
            "trim".into(),
        );
        let mut stats = OpStat::new(100, 50, 33, false, "t".into(), None, None);
        let mut p = ExtPair::new(
            0,
            Record::new(b"r1".to_vec(), b"XXXXAAAA".to_vec(), vec![b'I'; 8]),
            Record::new(b"r2".to_vec(), b"YYYYTTTT".to_vec(), vec![b'I'; 8]),
            true,
        );
        let status = op.transform(&mut p, ReadSelector::R1, &mut stats, 0);
        assert_eq!(status, Status::Keep);
        assert_eq!(stats.ops_r1["trim"]["trim_too_short"], 1);
    }
}
