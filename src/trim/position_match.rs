//! The "match" kernel: compares each adapter at a fixed read `position`,
//! accepting an immediate full-length exact match or, failing that, the
//! best-scoring adapter clearing `min_score`.

use super::{TrimOutcome, TrimResult, TrimSide};

pub fn position_match(seq: &[u8], adapters: &[Vec<u8>], side: TrimSide, position: usize, min_score: f32) -> TrimResult {
    let mut outcome = TrimOutcome::NoTrim;
    let mut trim_score = f32::MIN;
    let mut best_index = 0;

    for (ai, adapter) in adapters.iter().enumerate() {
        if adapter.is_empty() {
            continue;
        }
        let ad_len = adapter.len();
        let avail = seq.len().saturating_sub(position);
        let n = ad_len.min(avail);
        let n_match = (0..n).filter(|&i| adapter[i] == seq[position + i]).count();
        let tmp_score = n_match as f32 / ad_len as f32;

        if n_match == ad_len {
            outcome = TrimOutcome::TrimExact;
            trim_score = 1.0;
            best_index = ai;
            break;
        } else if tmp_score >= min_score && tmp_score > trim_score {
            outcome = TrimOutcome::TrimAlign;
            trim_score = tmp_score;
            best_index = ai;
        }
    }

    if outcome == TrimOutcome::NoTrim {
        return TrimResult::no_trim();
    }

    let adapter_len = adapters[best_index].len();
    let (trim_start, trim_end) = match side {
        TrimSide::Five => (position + adapter_len, seq.len()),
        TrimSide::Three => (0, position),
    };

    TrimResult {
        outcome,
        adapter_index: best_index,
        score: trim_score,
        trim_start,
        trim_end,
        trimmed: match side {
            TrimSide::Five => seq.get(..trim_start).unwrap_or(&[]).to_vec(),
            TrimSide::Three => seq.get(trim_end..).unwrap_or(&[]).to_vec(),
        },
    }
}
