//! The "search" kernel: a decreasing-window, edge-aligned fuzzy match. Tries
//! progressively shorter suffixes (5') or prefixes (3') of the read against
//! each adapter, tail/head-aligned, accepting the first window per adapter
//! that clears either an exact match or the configured score threshold.

use super::{TrimOutcome, TrimResult, TrimSide};

pub fn search(seq: &[u8], adapters: &[Vec<u8>], side: TrimSide, min_adaptor: usize, min_score: f32) -> TrimResult {
    let mut best = TrimResult::no_trim();
    let mut trim_score = f32::MIN;

    for (ai, adapter) in adapters.iter().enumerate() {
        if adapter.is_empty() {
            continue;
        }

        match side {
            TrimSide::Five => {
                let mut i = seq.len();
                while i >= min_adaptor && i > 0 {
                    let subseq = &seq[..i];
                    let (n_match, n_mismatch) = tail_align_score(subseq, adapter);
                    let denom = (n_match + n_mismatch).max(1) as f32;
                    let tmp_score = n_match as f32 / denom;
                    if tmp_score > trim_score {
                        if n_mismatch == 0 {
                            trim_score = 1.0;
                            best = TrimResult {
                                outcome: TrimOutcome::TrimExact,
                                adapter_index: ai,
                                score: 1.0,
                                trim_start: i,
                                trim_end: seq.len(),
                                trimmed: seq[..i].to_vec(),
                            };
                            break;
                        } else if tmp_score >= min_score {
                            trim_score = tmp_score;
                            best = TrimResult {
                                outcome: TrimOutcome::TrimAlign,
                                adapter_index: ai,
                                score: tmp_score,
                                trim_start: i,
                                trim_end: seq.len(),
                                trimmed: seq[..i].to_vec(),
                            };
                            break;
                        }
                    }
                    if i == min_adaptor {
                        break;
                    }
                    i -= 1;
                }
            }
            TrimSide::Three => {
                let max_i = seq.len().saturating_sub(min_adaptor);
                let mut i = 0;
                while i <= max_i {
                    let subseq = &seq[i..];
                    let (n_match, n_mismatch) = head_align_score(subseq, adapter);
                    let denom = (n_match + n_mismatch).max(1) as f32;
                    let tmp_score = n_match as f32 / denom;
                    if tmp_score > trim_score {
                        if n_mismatch == 0 {
                            trim_score = 1.0;
                            best = TrimResult {
                                outcome: TrimOutcome::TrimExact,
                                adapter_index: ai,
                                score: 1.0,
                                trim_start: 0,
                                trim_end: i,
                                trimmed: seq[i..].to_vec(),
                            };
                            break;
                        } else if tmp_score >= min_score {
                            trim_score = tmp_score;
                            best = TrimResult {
                                outcome: TrimOutcome::TrimAlign,
                                adapter_index: ai,
                                score: tmp_score,
                                trim_start: 0,
                                trim_end: i,
                                trimmed: seq[i..].to_vec(),
                            };
                            break;
                        }
                    }
                    i += 1;
                }
            }
        }
    }

    best
}

/// Compares `subseq`'s tail against `adapter`'s tail, walking both backward.
fn tail_align_score(subseq: &[u8], adapter: &[u8]) -> (usize, usize) {
    let mut j = subseq.len();
    let mut k = adapter.len();
    let mut n_match = 0;
    let mut n_mismatch = 0;
    while j > 0 && k > 0 {
        j -= 1;
        k -= 1;
        if subseq[j] == adapter[k] {
            n_match += 1;
        } else {
            n_mismatch += 1;
        }
    }
    (n_match, n_mismatch)
}

/// Compares `subseq`'s head against `adapter`'s head, walking both forward.
fn head_align_score(subseq: &[u8], adapter: &[u8]) -> (usize, usize) {
    let n = subseq.len().min(adapter.len());
    let mut n_match = 0;
    let mut n_mismatch = 0;
    for i in 0..n {
        if subseq[i] == adapter[i] {
            n_match += 1;
        } else {
            n_mismatch += 1;
        }
    }
    (n_match, n_mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_prefix_match_is_trimmed_five_prime() {
        let seq = b"ACGTTTTAAAA";
        let result = search(seq, &[b"ACG".to_vec()], TrimSide::Five, 3, 0.8);
        assert_eq!(result.outcome, TrimOutcome::TrimExact);
        assert_eq!(result.trim_start, 3);
        assert_eq!(result.trim_end, seq.len());
    }

    #[test]
    fn exact_suffix_match_is_trimmed_three_prime() {
        let seq = b"AAAATTTACG";
        let result = search(seq, &[b"ACG".to_vec()], TrimSide::Three, 3, 0.8);
        assert_eq!(result.outcome, TrimOutcome::TrimExact);
        assert_eq!(result.trim_start, 0);
        assert_eq!(result.trim_end, 7);
    }

    #[test]
    fn no_match_below_min_adaptor_window() {
        let seq = b"AAAA";
        let result = search(seq, &[b"TTTTTTTT".to_vec()], TrimSide::Five, 4, 0.99);
        assert_eq!(result.outcome, TrimOutcome::NoTrim);
    }
}
