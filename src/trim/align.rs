//! The "align" kernel: tries an exact substring match first (scoring
//! `10 * len(adapter)` and overwriting unconditionally across adapters, last
//! exact match wins), then falls back to a free-end-gap Needleman-Wunsch
//! alignment, keeping the strictly highest-scoring accepted adapter.

use super::{count_gaps, TrimOutcome, TrimResult, TrimSide};

const MATCH: i32 = 5;
const MISMATCH: i32 = -10;
const GAP: i32 = -10;

pub fn align(seq: &[u8], adapters: &[Vec<u8>], side: TrimSide, min_adaptor: usize, min_score: f32) -> TrimResult {
    let mut best = TrimResult::no_trim();
    let mut trim_score = f32::MIN;
    let mut exact_best: Option<TrimResult> = None;

    for (ai, adapter) in adapters.iter().enumerate() {
        if adapter.is_empty() {
            continue;
        }

        if let Some(pos) = find_subslice(seq, adapter) {
            let (trim_start, trim_end) = match side {
                TrimSide::Five => (pos + adapter.len(), seq.len()),
                TrimSide::Three => (0, pos),
            };
            exact_best = Some(TrimResult {
                outcome: TrimOutcome::TrimExact,
                adapter_index: ai,
                score: 10.0 * adapter.len() as f32,
                trim_start,
                trim_end,
                trimmed: match side {
                    TrimSide::Five => seq[..trim_start].to_vec(),
                    TrimSide::Three => seq[trim_end..].to_vec(),
                },
            });
            continue;
        }

        let (aligned_seq, aligned_adapter, align_score) = needleman_wunsch_free_ends(seq, adapter, MATCH, MISMATCH, GAP);
        let Some((adaptor_index_aln, min_adaptor_ok)) =
            locate_adapter_in_alignment(&aligned_seq, &aligned_adapter, adapter, side, min_adaptor)
        else {
            continue;
        };

        // raw NW alignment score, on the same match=5/mismatch=-10/gap=-10
        // scale as `min_score` (e.g. the default `5 * len(sequences[0])`) —
        // not an identity fraction, which would never clear that threshold
        let score = align_score as f32;
        if !min_adaptor_ok || score < min_score || score <= trim_score {
            continue;
        }

        let (trim_start, trim_end) = match side {
            TrimSide::Five => {
                let gaps_before = count_gaps(&aligned_seq, adaptor_index_aln + 1);
                (adaptor_index_aln + 1 - gaps_before, seq.len())
            }
            TrimSide::Three => {
                let gaps_before = count_gaps(&aligned_seq, adaptor_index_aln);
                (0, adaptor_index_aln.saturating_sub(gaps_before))
            }
        };

        trim_score = score;
        best = TrimResult {
            outcome: TrimOutcome::TrimAlign,
            adapter_index: ai,
            score,
            trim_start,
            trim_end,
            trimmed: match side {
                TrimSide::Five => seq.get(..trim_start).unwrap_or(&[]).to_vec(),
                TrimSide::Three => seq.get(trim_end..).unwrap_or(&[]).to_vec(),
            },
        };
    }

    exact_best.unwrap_or(best)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Finds the alignment column at which the adapter's match region ends (5',
/// mirroring `lastIndexHomo`) or begins (3', mirroring `indexHomo`), and
/// whether the required `min_adaptor` bytes of overlap are byte-identical
/// between the aligned read and the aligned adapter there.
fn locate_adapter_in_alignment(
    aligned_seq: &[u8],
    aligned_adapter: &[u8],
    adapter: &[u8],
    side: TrimSide,
    min_adaptor: usize,
) -> Option<(usize, bool)> {
    // the last (5') or first (3') alignment column where the adapter
    // contributes a real (non-gap) byte
    let idx = match side {
        TrimSide::Five => aligned_adapter.len() - 1 - aligned_adapter.iter().rev().position(|&b| b != b'-')?,
        TrimSide::Three => aligned_adapter.iter().position(|&b| b != b'-')?,
    };

    if min_adaptor == 0 || adapter.len() < min_adaptor {
        return Some((idx, true));
    }

    // for 5', the adapter's own last `min_adaptor` bytes must match the
    // window ending at `idx`; for 3', its first `min_adaptor` bytes must
    // match the window starting at `idx`
    let window: Vec<u8> = match side {
        TrimSide::Five => {
            let start = idx + 1 - min_adaptor.min(idx + 1);
            aligned_seq.iter().skip(start).take(min_adaptor).copied().collect()
        }
        TrimSide::Three => aligned_seq.iter().skip(idx).take(min_adaptor).copied().collect(),
    };
    let required: Vec<u8> = match side {
        TrimSide::Five => adapter.iter().rev().take(min_adaptor).rev().copied().collect(),
        TrimSide::Three => adapter.iter().take(min_adaptor).copied().collect(),
    };

    Some((idx, window == required))
}

/// Global alignment where leading and trailing gaps in either sequence are
/// free (glocal): the DP boundary rows/columns start at zero and the
/// traceback begins at the best-scoring cell in the last row or column.
/// Returns the aligned byte strings plus the raw alignment score at the
/// traceback's starting cell (before the free trailing-gap extension, which
/// contributes no score) — the same quantity `nwalgo.AlignBytes` returns
/// upstream, on the same `match_score`/`mismatch`/`gap` scale as `min_score`.
pub(crate) fn needleman_wunsch_free_ends(a: &[u8], b: &[u8], match_score: i32, mismatch: i32, gap: i32) -> (Vec<u8>, Vec<u8>, i32) {
    let n = a.len();
    let m = b.len();
    let mut dp = vec![vec![0i32; m + 1]; n + 1];

    for i in 1..=n {
        for j in 1..=m {
            let diag = dp[i - 1][j - 1] + if a[i - 1] == b[j - 1] { match_score } else { mismatch };
            let up = dp[i - 1][j] + gap;
            let left = dp[i][j - 1] + gap;
            dp[i][j] = diag.max(up).max(left);
        }
    }

    let mut best_i = n;
    let mut best_j = m;
    let mut best_score = dp[n][m];
    for j in 0..=m {
        if dp[n][j] > best_score {
            best_score = dp[n][j];
            best_i = n;
            best_j = j;
        }
    }
    for i in 0..=n {
        if dp[i][m] > best_score {
            best_score = dp[i][m];
            best_i = i;
            best_j = m;
        }
    }

    let mut aligned_a = Vec::new();
    let mut aligned_b = Vec::new();
    let mut i = best_i;
    let mut j = best_j;
    while i > 0 && j > 0 {
        let diag = dp[i - 1][j - 1] + if a[i - 1] == b[j - 1] { match_score } else { mismatch };
        if dp[i][j] == diag {
            aligned_a.push(a[i - 1]);
            aligned_b.push(b[j - 1]);
            i -= 1;
            j -= 1;
        } else if dp[i][j] == dp[i - 1][j] + gap {
            aligned_a.push(a[i - 1]);
            aligned_b.push(b'-');
            i -= 1;
        } else {
            aligned_a.push(b'-');
            aligned_b.push(b[j - 1]);
            j -= 1;
        }
    }
    while i > 0 {
        aligned_a.push(a[i - 1]);
        aligned_b.push(b'-');
        i -= 1;
    }
    while j > 0 {
        aligned_a.push(b'-');
        aligned_b.push(b[j - 1]);
        j -= 1;
    }
    aligned_a.reverse();
    aligned_b.reverse();

    aligned_a.extend(&a[best_i..]);
    aligned_b.extend(std::iter::repeat(b'-').take(n - best_i));
    aligned_a.extend(std::iter::repeat(b'-').take(m - best_j));
    aligned_b.extend(&b[best_j..]);

    (aligned_a, aligned_b, best_score)
}
