//! The "trimqual" kernel: slides a fixed-size window from one end, trimming
//! the contiguous run of windows whose unqualified-base fraction meets the
//! threshold, stopping at the first window that doesn't.

use super::{TrimOutcome, TrimResult, TrimSide};

pub fn quality_trim(
    seq: &[u8],
    qual: &[u8],
    side: TrimSide,
    window: usize,
    unqualified_prop_max: f32,
    min_quality: i32,
    ascii_min: i32,
) -> TrimResult {
    if window == 0 || seq.len() < window {
        return TrimResult::no_trim();
    }

    let mut outcome = TrimOutcome::NoTrim;
    let mut trim_start = 0usize;
    let mut trim_end = seq.len();
    let mut trim_score = 0.0f32;

    match side {
        TrimSide::Five => {
            let mut i = 0;
            while i + window <= seq.len() {
                let n_low = (i..i + window).filter(|&j| (qual[j] as i32 - ascii_min) < min_quality).count();
                let tmp_score = n_low as f32 / window as f32;
                if tmp_score >= unqualified_prop_max {
                    outcome = TrimOutcome::TrimExact;
                    trim_start = i + window;
                    trim_score = tmp_score;
                    i += 1;
                } else {
                    break;
                }
            }
        }
        TrimSide::Three => {
            let mut i = seq.len() - 1;
            loop {
                if i + 1 < window {
                    break;
                }
                let start = i + 1 - window;
                let n_low = (start..=i).filter(|&j| (qual[j] as i32 - ascii_min) < min_quality).count();
                let tmp_score = n_low as f32 / window as f32;
                if tmp_score >= unqualified_prop_max {
                    outcome = TrimOutcome::TrimExact;
                    trim_end = start;
                    trim_score = tmp_score;
                    if i == 0 {
                        break;
                    }
                    i -= 1;
                } else {
                    break;
                }
            }
        }
    }

    if outcome == TrimOutcome::NoTrim {
        return TrimResult::no_trim();
    }

    let trimmed = match side {
        TrimSide::Five => seq[..trim_start].to_vec(),
        TrimSide::Three => seq[trim_end..].to_vec(),
    };

    TrimResult { outcome, adapter_index: 0, score: trim_score, trim_start, trim_end, trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_leading_low_quality_prefix() {
        let seq = b"NNNNNACGTACGT";
        let qual = b"!!!!!IIIIIIII";
        let result = quality_trim(seq, qual, TrimSide::Five, 5, 0.6, 15, 33);
        assert_eq!(result.outcome, TrimOutcome::TrimExact);
        assert_eq!(result.trim_start, 5);
    }

    #[test]
    fn leaves_high_quality_reads_untouched() {
        let seq = b"ACGTACGTACGT";
        let qual = b"IIIIIIIIIIII";
        let result = quality_trim(seq, qual, TrimSide::Five, 5, 0.6, 15, 33);
        assert_eq!(result.outcome, TrimOutcome::NoTrim);
    }
}
