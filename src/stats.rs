//! The statistics accumulator (C4): per-worker counters, per-position
//! quality/length histograms, and the final JSON report.

use crate::{
    error::Result,
    record::Record,
};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    fs::File,
    io::Write,
};

/// Which mate a count or bucket belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Side {
    R1,
    R2,
}

/// A sink for the plain-text quality/length histograms and any plots built
/// from them. Kept behind a trait so the accumulator is testable without a
/// plotting backend; the default implementation does nothing.
pub trait ReportSink {
    fn write_quality_histogram(&mut self, _path: &str, _rows: &[Vec<u64>]) -> Result<()> {
        Ok(())
    }

    fn write_length_histogram(&mut self, _path: &str, _lengths: &HashMap<usize, u64>) -> Result<()> {
        Ok(())
    }
}

/// A `ReportSink` that writes nothing, for tests and for runs with no
/// configured stats paths.
pub struct NullReportSink;

impl ReportSink for NullReportSink {}

/// A flat `max_len x max_qual` quality-position matrix, one row per read
/// position, tracking the count of each quality value observed there.
#[derive(Clone)]
struct QualMatrix {
    max_qual: usize,
    rows:     Vec<Vec<u64>>,
    max_len_observed: usize,
}

impl QualMatrix {
    fn new(max_read_length: usize, max_qual: usize) -> Self {
        QualMatrix { max_qual, rows: vec![vec![0u64; max_qual]; max_read_length], max_len_observed: 0 }
    }

    fn count(&mut self, qual: &[u8], ascii_min: i32) {
        self.max_len_observed = self.max_len_observed.max(qual.len());
        for (i, &q) in qual.iter().enumerate() {
            if i >= self.rows.len() {
                break;
            }
            let bin = (q as i32 - ascii_min).clamp(0, self.max_qual as i32 - 1) as usize;
            self.rows[i][bin] += 1;
        }
    }

    fn merge(&mut self, other: &QualMatrix) {
        for (row, other_row) in self.rows.iter_mut().zip(other.rows.iter()) {
            for (v, ov) in row.iter_mut().zip(other_row.iter()) {
                *v += ov;
            }
        }
        self.max_len_observed = self.max_len_observed.max(other.max_len_observed);
    }

    fn truncated_rows(&self) -> Vec<Vec<u64>> {
        self.rows[..self.max_len_observed.min(self.rows.len())].to_vec()
    }
}

/// Per-worker accumulator. One instance lives in each worker thread and is
/// folded into worker 0's instance once the pipeline drains.
pub struct OpStat {
    pub ops_r1: HashMap<String, HashMap<String, u64>>,
    pub ops_r2: HashMap<String, HashMap<String, u64>>,

    quals_in_r1:  Option<QualMatrix>,
    quals_in_r2:  Option<QualMatrix>,
    quals_out_r1: Option<QualMatrix>,
    quals_out_r2: Option<QualMatrix>,

    lengths_in_r1:  HashMap<usize, u64>,
    lengths_in_r2:  HashMap<usize, u64>,
    lengths_out_r1: HashMap<usize, u64>,
    lengths_out_r2: HashMap<usize, u64>,

    pub kept_pair:  u64,
    pub total_pair: u64,

    ascii_min: i32,
    paired:    bool,
    pub label: String,

    collect_in:  bool,
    collect_out: bool,
}

impl OpStat {
    pub fn new(
        max_read_length: usize,
        max_qual: usize,
        ascii_min: i32,
        paired: bool,
        label: String,
        stats_in_path: Option<&str>,
        stats_out_path: Option<&str>,
    ) -> Self {
        let collect_in = stats_in_path.is_some();
        let collect_out = stats_out_path.is_some();

        OpStat {
            ops_r1: HashMap::new(),
            ops_r2: HashMap::new(),
            quals_in_r1: collect_in.then(|| QualMatrix::new(max_read_length, max_qual)),
            quals_in_r2: collect_in.then(|| QualMatrix::new(max_read_length, max_qual)),
            quals_out_r1: collect_out.then(|| QualMatrix::new(max_read_length, max_qual)),
            quals_out_r2: collect_out.then(|| QualMatrix::new(max_read_length, max_qual)),
            lengths_in_r1: HashMap::new(),
            lengths_in_r2: HashMap::new(),
            lengths_out_r1: HashMap::new(),
            lengths_out_r2: HashMap::new(),
            kept_pair: 0,
            total_pair: 0,
            ascii_min,
            paired,
            label,
            collect_in,
            collect_out,
        }
    }

    /// Ensures a (possibly empty) bucket map exists for `label` on the given
    /// side, mirroring the upstream constructor that pre-registers every
    /// configured operation's label even if it never fires.
    pub fn register_label(&mut self, side: Side, label: &str) {
        let map = match side {
            Side::R1 => &mut self.ops_r1,
            Side::R2 => &mut self.ops_r2,
        };
        map.entry(label.to_string()).or_default();
    }

    pub fn bump(&mut self, side: Side, label: &str, bucket: &str) {
        let map = match side {
            Side::R1 => &mut self.ops_r1,
            Side::R2 => &mut self.ops_r2,
        };
        *map.entry(label.to_string()).or_default().entry(bucket.to_string()).or_insert(0) += 1;
    }

    pub fn count_in(&mut self, side: Side, record: &Record) {
        if !self.collect_in {
            return;
        }
        let (quals, lengths) = match side {
            Side::R1 => (&mut self.quals_in_r1, &mut self.lengths_in_r1),
            Side::R2 => (&mut self.quals_in_r2, &mut self.lengths_in_r2),
        };
        if let Some(m) = quals {
            m.count(&record.qual, self.ascii_min);
        }
        *lengths.entry(record.len()).or_insert(0) += 1;
    }

    pub fn count_out(&mut self, side: Side, record: &Record) {
        if !self.collect_out {
            return;
        }
        let (quals, lengths) = match side {
            Side::R1 => (&mut self.quals_out_r1, &mut self.lengths_out_r1),
            Side::R2 => (&mut self.quals_out_r2, &mut self.lengths_out_r2),
        };
        if let Some(m) = quals {
            m.count(&record.qual, self.ascii_min);
        }
        *lengths.entry(record.len()).or_insert(0) += 1;
    }

    /// Additively folds `other` into `self`.
    pub fn merge(&mut self, other: &OpStat) {
        merge_nested(&mut self.ops_r1, &other.ops_r1);
        merge_nested(&mut self.ops_r2, &other.ops_r2);

        merge_qual_opt(&mut self.quals_in_r1, &other.quals_in_r1);
        merge_qual_opt(&mut self.quals_in_r2, &other.quals_in_r2);
        merge_qual_opt(&mut self.quals_out_r1, &other.quals_out_r1);
        merge_qual_opt(&mut self.quals_out_r2, &other.quals_out_r2);

        merge_lengths(&mut self.lengths_in_r1, &other.lengths_in_r1);
        merge_lengths(&mut self.lengths_in_r2, &other.lengths_in_r2);
        merge_lengths(&mut self.lengths_out_r1, &other.lengths_out_r1);
        merge_lengths(&mut self.lengths_out_r2, &other.lengths_out_r2);

        self.kept_pair += other.kept_pair;
        self.total_pair += other.total_pair;
    }

    /// Writes the plain-text quality/length matrices (via `sink`) and the
    /// final JSON report to `report_path` (or stdout, if `"-"`).
    pub fn write(&self, report_path: &str, stats_in_path: Option<&str>, stats_out_path: Option<&str>, sink: &mut dyn ReportSink) -> Result<()> {
        if let Some(base) = stats_in_path {
            self.write_side_histograms(base, "in", &self.quals_in_r1, &self.lengths_in_r1, "r1", sink)?;
            if self.paired {
                self.write_side_histograms(base, "in", &self.quals_in_r2, &self.lengths_in_r2, "r2", sink)?;
            }
        }
        if let Some(base) = stats_out_path {
            self.write_side_histograms(base, "out", &self.quals_out_r1, &self.lengths_out_r1, "r1", sink)?;
            if self.paired {
                self.write_side_histograms(base, "out", &self.quals_out_r2, &self.lengths_out_r2, "r2", sink)?;
            }
        }

        let report = self.build_report();
        if report_path == "-" {
            println!("{}", serde_json::to_string_pretty(&report).expect("report serializes"));
        } else {
            let mut f = File::create(report_path).map_err(|e| crate::error::Error::io(report_path, e))?;
            let text = serde_json::to_string_pretty(&report).expect("report serializes");
            f.write_all(text.as_bytes()).map_err(|e| crate::error::Error::io(report_path, e))?;
        }
        Ok(())
    }

    fn write_side_histograms(
        &self,
        base: &str,
        direction: &str,
        quals: &Option<QualMatrix>,
        lengths: &HashMap<usize, u64>,
        side_name: &str,
        sink: &mut dyn ReportSink,
    ) -> Result<()> {
        if let Some(m) = quals {
            sink.write_quality_histogram(&format!("{base}_{side_name}_{direction}_qual.txt"), &m.truncated_rows())?;
        }
        sink.write_length_histogram(&format!("{base}_{side_name}_{direction}_length.txt"), lengths)?;
        Ok(())
    }

    fn build_report(&self) -> Value {
        let mut root = Map::new();
        root.insert("read1".to_string(), ops_to_json(&self.ops_r1));
        if self.paired {
            root.insert("read2".to_string(), ops_to_json(&self.ops_r2));
        }
        let mut pair = Map::new();
        let mut all = Map::new();
        all.insert("output".to_string(), Value::from(self.kept_pair));
        all.insert("input".to_string(), Value::from(self.total_pair));
        pair.insert("all".to_string(), Value::Object(all));
        root.insert("pair".to_string(), Value::Object(pair));
        Value::Object(root)
    }
}

fn ops_to_json(ops: &HashMap<String, HashMap<String, u64>>) -> Value {
    let mut out = Map::new();
    for (label, buckets) in ops {
        if buckets.is_empty() {
            continue;
        }
        let mut bmap = Map::new();
        for (bucket, count) in buckets {
            bmap.insert(bucket.clone(), Value::from(*count));
        }
        out.insert(label.clone(), Value::Object(bmap));
    }
    Value::Object(out)
}

fn merge_nested(dst: &mut HashMap<String, HashMap<String, u64>>, src: &HashMap<String, HashMap<String, u64>>) {
    for (label, buckets) in src {
        let dst_buckets = dst.entry(label.clone()).or_default();
        for (bucket, count) in buckets {
            *dst_buckets.entry(bucket.clone()).or_insert(0) += count;
        }
    }
}

fn merge_lengths(dst: &mut HashMap<usize, u64>, src: &HashMap<usize, u64>) {
    for (len, count) in src {
        *dst.entry(*len).or_insert(0) += count;
    }
}

fn merge_qual_opt(dst: &mut Option<QualMatrix>, src: &Option<QualMatrix>) {
    if let (Some(d), Some(s)) = (dst, src) {
        d.merge(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_registers_and_increments() {
        let mut stat = OpStat::new(100, 50, 33, false, "t".into(), None, None);
        stat.bump(Side::R1, "clip", "too_short");
        stat.bump(Side::R1, "clip", "too_short");
        assert_eq!(stat.ops_r1["clip"]["too_short"], 2);
    }

    #[test]
    fn merge_adds_kept_and_total() {
        let mut a = OpStat::new(10, 10, 33, false, "t".into(), None, None);
        let mut b = OpStat::new(10, 10, 33, false, "t".into(), None, None);
        a.kept_pair = 3;
        a.total_pair = 5;
        b.kept_pair = 1;
        b.total_pair = 2;
        a.merge(&b);
        assert_eq!(a.kept_pair, 4);
        assert_eq!(a.total_pair, 7);
    }

    #[test]
    fn count_in_skipped_without_stats_path() {
        let mut stat = OpStat::new(10, 10, 33, false, "t".into(), None, None);
        let rec = Record::new(b"r".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec());
        stat.count_in(Side::R1, &rec);
        assert!(stat.lengths_in_r1.is_empty());
    }

    #[test]
    fn count_in_collects_when_path_configured() {
        let mut stat = OpStat::new(10, 10, 33, false, "t".into(), Some("/tmp/x"), None);
        let rec = Record::new(b"r".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec());
        stat.count_in(Side::R1, &rec);
        assert_eq!(stat.lengths_in_r1[&4], 1);
    }
}
