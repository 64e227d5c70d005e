//! The pipeline coordinator (C5): reader, worker pool, reorder, writer.
//!
//! Four stages communicate over bounded `mpsc::sync_channel`s. Ordering is
//! preserved by `ExtPair::id`: workers may finish out of order, and the
//! reorder stage re-linearizes before the writer sees anything. The writer
//! runs on the caller's thread (mirroring the original's "main goroutine
//! drains the final channel"), and is the only place a non-thread-safe
//! operation is ever invoked.

use crate::{
    config,
    error::{Error, Result},
    fastq::{substitute_dpx, FastqReader, FastqWriter},
    ops::{Operation, ReadSelector, Status},
    record::{ExtPair, Record},
    stats::{NullReportSink, OpStat, Side},
};
use std::{
    collections::HashMap,
    path::Path,
    sync::{
        mpsc::{sync_channel, Receiver, SyncSender, TrySendError},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

/// Everything the coordinator needs to run one pass: file lists, output
/// templates, and the knobs listed in SPEC_FULL.md §6's CLI surface.
#[derive(Clone)]
pub struct RunConfig {
    pub fq_fnames_r1: Vec<String>,
    pub fq_fnames_r2: Vec<String>,
    pub paired: bool,
    pub fq_path_out: String,
    pub fq_fname_out_r1: String,
    pub fq_fname_out_r2: String,
    pub fq_command_in: Option<Vec<String>>,
    pub fq_command_out: Option<Vec<String>>,
    pub num_worker: usize,
    pub buf_size: usize,
    pub max_read_length: usize,
    pub max_quality: usize,
    pub ascii_min: i32,
    pub report_path: String,
    pub stats_in_path: Option<String>,
    pub stats_out_path: Option<String>,
    pub label: String,
    pub verbosity: u8,
}

/// Pair counts reported back to the CLI layer for the run summary.
pub struct PipelineSummary {
    pub total_pair: u64,
    pub kept_pair:  u64,
}

/// A shared fatal-error latch. The first stage to fail wins; every later
/// error is discarded rather than overwriting it.
#[derive(Clone)]
struct Cancel(Arc<Mutex<Option<Error>>>);

impl Cancel {
    fn new() -> Self {
        Cancel(Arc::new(Mutex::new(None)))
    }

    fn is_set(&self) -> bool {
        self.0.lock().expect("cancel mutex poisoned").is_some()
    }

    fn set(&self, err: Error) {
        let mut guard = self.0.lock().expect("cancel mutex poisoned");
        if guard.is_none() {
            *guard = Some(err);
        }
    }

    fn take(&self) -> Option<Error> {
        self.0.lock().expect("cancel mutex poisoned").take()
    }
}

/// Sends `item`, polling `cancel` between attempts instead of blocking
/// forever against a downstream stage that has already given up.
fn send_or_cancel<T>(tx: &SyncSender<T>, mut item: T, cancel: &Cancel) -> bool {
    loop {
        if cancel.is_set() {
            return false;
        }
        match tx.try_send(item) {
            Ok(()) => return true,
            Err(TrySendError::Full(returned)) => {
                item = returned;
                thread::sleep(Duration::from_millis(2));
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}

pub fn run(cfg: &RunConfig, ops_r1: Vec<Operation>, ops_r2: Vec<Operation>) -> Result<PipelineSummary> {
    config::check_single_non_thread_safe(&ops_r1, &ops_r2)?;

    let bin_names = resolve_writer_bins(&ops_r1, &ops_r2);
    let (mut writers_r1, mut writers_r2) = open_writers(cfg, &bin_names)?;

    let ops_r1: Arc<[Operation]> = ops_r1.into();
    let ops_r2: Arc<[Operation]> = ops_r2.into();

    let mut stats = OpStat::new(
        cfg.max_read_length,
        cfg.max_quality,
        cfg.ascii_min,
        cfg.paired,
        cfg.label.clone(),
        cfg.stats_in_path.as_deref(),
        cfg.stats_out_path.as_deref(),
    );
    config::register_labels(&mut stats, &ops_r1, &ops_r2);

    let cancel = Cancel::new();
    let num_worker = cfg.num_worker.max(1);

    let (pair_tx, pair_rx) = sync_channel::<ExtPair>(2 * num_worker);
    let (transit_tx, transit_rx) = sync_channel::<ExtPair>(num_worker);
    let (final_tx, final_rx) = sync_channel::<ExtPair>(10_000 * num_worker);

    let reader_handle = {
        let reader_cfg = cfg.clone();
        let reader_cancel = cancel.clone();
        thread::spawn(move || {
            if let Err(e) = run_reader(&reader_cfg, pair_tx, reader_cancel.clone()) {
                reader_cancel.set(e);
            }
        })
    };

    let pair_rx = Arc::new(Mutex::new(pair_rx));
    let mut worker_handles = Vec::with_capacity(num_worker);
    for _ in 0..num_worker {
        let rx = Arc::clone(&pair_rx);
        let tx = transit_tx.clone();
        let worker_ops_r1 = Arc::clone(&ops_r1);
        let worker_ops_r2 = Arc::clone(&ops_r2);
        let paired = cfg.paired;
        let verbosity = cfg.verbosity;
        let worker_cancel = cancel.clone();
        let worker_stats = OpStat::new(
            cfg.max_read_length,
            cfg.max_quality,
            cfg.ascii_min,
            cfg.paired,
            cfg.label.clone(),
            cfg.stats_in_path.as_deref(),
            cfg.stats_out_path.as_deref(),
        );
        worker_handles.push(thread::spawn(move || {
            run_worker(rx, tx, worker_ops_r1, worker_ops_r2, paired, worker_stats, verbosity, worker_cancel)
        }));
    }
    drop(transit_tx);

    let reorder_handle = {
        let reorder_cancel = cancel.clone();
        thread::spawn(move || run_reorder(transit_rx, final_tx, reorder_cancel))
    };

    run_writer(final_rx, &ops_r1, &ops_r2, &mut writers_r1, &mut writers_r2, cfg.paired, &mut stats, cfg.verbosity, &cancel);

    reader_handle.join().expect("reader thread panicked");
    reorder_handle.join().expect("reorder thread panicked");
    for handle in worker_handles {
        let worker_stats = handle.join().expect("worker thread panicked");
        stats.merge(&worker_stats);
    }

    let mut close_result: Result<()> = Ok(());
    for w in writers_r1 {
        if let Err(e) = w.close() {
            close_result = Err(e);
        }
    }
    for w in writers_r2 {
        if let Err(e) = w.close() {
            close_result = Err(e);
        }
    }

    if let Some(err) = cancel.take() {
        return Err(match close_result {
            Ok(()) => err,
            Err(close_err) => err.chain(close_err),
        });
    }
    close_result?;

    let mut sink = NullReportSink;
    stats.write(&cfg.report_path, cfg.stats_in_path.as_deref(), cfg.stats_out_path.as_deref(), &mut sink)?;

    Ok(PipelineSummary { total_pair: stats.total_pair, kept_pair: stats.kept_pair })
}

/// Runs every configured operation's `get_dpx` once, in R1-then-R2 order,
/// before any worker starts, assigning each demultiplex barcode a dense
/// writer-bin index. A configuration with no demultiplex operation gets one
/// implicit `"all"` bin.
fn resolve_writer_bins(ops_r1: &[Operation], ops_r2: &[Operation]) -> Vec<String> {
    let mut names = Vec::new();
    let mut next = 0;
    for op in ops_r1.iter().chain(ops_r2.iter()) {
        let (bin_names, advanced) = op.get_dpx(next);
        if !bin_names.is_empty() {
            names.extend(bin_names);
            next = advanced;
        }
    }
    if names.is_empty() {
        names.push("all".to_string());
    }
    names
}

fn open_writers(cfg: &RunConfig, bin_names: &[String]) -> Result<(Vec<FastqWriter>, Vec<FastqWriter>)> {
    let mut writers_r1 = Vec::with_capacity(bin_names.len());
    let mut writers_r2 = Vec::with_capacity(bin_names.len());

    for name in bin_names {
        let path_r1 = Path::new(&cfg.fq_path_out).join(substitute_dpx(&cfg.fq_fname_out_r1, name));
        writers_r1.push(FastqWriter::create(&path_r1.to_string_lossy(), cfg.fq_command_out.as_deref(), cfg.buf_size)?);

        if cfg.paired {
            let path_r2 = Path::new(&cfg.fq_path_out).join(substitute_dpx(&cfg.fq_fname_out_r2, name));
            writers_r2.push(FastqWriter::create(&path_r2.to_string_lossy(), cfg.fq_command_out.as_deref(), cfg.buf_size)?);
        }
    }

    Ok((writers_r1, writers_r2))
}

/// Reads the R1 (and, if paired, same-index R2) input file list in order,
/// concatenating them into one monotonically increasing `id` sequence.
fn run_reader(cfg: &RunConfig, tx: SyncSender<ExtPair>, cancel: Cancel) -> Result<()> {
    let mut id = 0u64;

    for (i, r1_path) in cfg.fq_fnames_r1.iter().enumerate() {
        if cancel.is_set() {
            return Ok(());
        }

        let mut reader1 = FastqReader::open(r1_path, cfg.fq_command_in.as_deref(), cfg.buf_size)?;
        let mut reader2 = if cfg.paired {
            Some(FastqReader::open(&cfg.fq_fnames_r2[i], cfg.fq_command_in.as_deref(), cfg.buf_size)?)
        } else {
            None
        };

        loop {
            if cancel.is_set() {
                return Ok(());
            }

            let rec1 = reader1.next_record()?;
            let rec2 = match &mut reader2 {
                Some(r2) => r2.next_record()?,
                None => None,
            };

            let pair = match (rec1, rec2) {
                (None, None) => break,
                (Some(r1), Some(r2)) => ExtPair::new(id, r1, r2, true),
                (Some(r1), None) if !cfg.paired => ExtPair::new(id, r1, Record::default(), false),
                _ => return Err(Error::config(format!("{r1_path}: R1 and R2 record counts do not match"))),
            };
            id += 1;

            if !send_or_cancel(&tx, pair, &cancel) {
                return Ok(());
            }
        }
    }

    Ok(())
}

/// Applies every thread-safe R1 op, then (if paired) every thread-safe R2 op,
/// short-circuiting a side on the first `Status::Drop`. The non-thread-safe
/// operation, if any, is skipped here — it runs once, serially, in the
/// writer stage.
fn run_worker(
    rx: Arc<Mutex<Receiver<ExtPair>>>,
    tx: SyncSender<ExtPair>,
    ops_r1: Arc<[Operation]>,
    ops_r2: Arc<[Operation]>,
    paired: bool,
    mut stats: OpStat,
    verbosity: u8,
    cancel: Cancel,
) -> OpStat {
    loop {
        let received = {
            let guard = rx.lock().expect("pair receiver mutex poisoned");
            guard.recv()
        };
        let mut pair = match received {
            Ok(p) => p,
            Err(_) => break,
        };

        stats.count_in(Side::R1, &pair.r1);
        if paired {
            stats.count_in(Side::R2, &pair.r2);
        }

        let mut ok = true;
        for op in ops_r1.iter().filter(|op| op.is_thread_safe()) {
            let status = op.transform(&mut pair, ReadSelector::R1, &mut stats, verbosity);
            trace_op(verbosity, op.name(), "r1", pair.id, status);
            if status == Status::Drop {
                ok = false;
                break;
            }
        }
        if ok && paired {
            for op in ops_r2.iter().filter(|op| op.is_thread_safe()) {
                let status = op.transform(&mut pair, ReadSelector::R2, &mut stats, verbosity);
                trace_op(verbosity, op.name(), "r2", pair.id, status);
                if status == Status::Drop {
                    ok = false;
                    break;
                }
            }
        }

        stats.total_pair += 1;
        if ok {
            stats.count_out(Side::R1, &pair.r1);
            if paired {
                stats.count_out(Side::R2, &pair.r2);
            }
            stats.kept_pair += 1;
        } else {
            pair.ok = false;
        }

        if !send_or_cancel(&tx, pair, &cancel) {
            break;
        }
    }
    stats
}

/// Re-linearizes by `id`: a pair that arrives out of order is held in
/// `pending` until every lower `id` has been forwarded.
fn run_reorder(rx: Receiver<ExtPair>, tx: SyncSender<ExtPair>, cancel: Cancel) {
    let mut pending: HashMap<u64, ExtPair> = HashMap::new();
    let mut next = 0u64;

    while let Ok(pair) = rx.recv() {
        if pair.id == next {
            if !send_or_cancel(&tx, pair, &cancel) {
                return;
            }
            next += 1;
            while let Some(p) = pending.remove(&next) {
                if !send_or_cancel(&tx, p, &cancel) {
                    return;
                }
                next += 1;
            }
        } else {
            pending.insert(pair.id, pair);
        }
    }

    let mut remaining: Vec<ExtPair> = pending.into_values().collect();
    remaining.sort_by_key(|p| p.id);
    for pair in remaining {
        if !send_or_cancel(&tx, pair, &cancel) {
            return;
        }
    }
}

/// Drains the final, ordered channel. Runs the non-thread-safe operation (if
/// configured) here, then writes each surviving pair to its demultiplexed
/// writer bin.
fn run_writer(
    rx: Receiver<ExtPair>,
    ops_r1: &[Operation],
    ops_r2: &[Operation],
    writers_r1: &mut [FastqWriter],
    writers_r2: &mut [FastqWriter],
    paired: bool,
    stats: &mut OpStat,
    verbosity: u8,
    cancel: &Cancel,
) {
    while let Ok(mut pair) = rx.recv() {
        if cancel.is_set() {
            break;
        }
        if !pair.ok {
            continue;
        }

        let mut ok = true;
        for op in ops_r1.iter().filter(|op| !op.is_thread_safe()) {
            let status = op.transform(&mut pair, ReadSelector::R1, stats, verbosity);
            trace_op(verbosity, op.name(), "r1", pair.id, status);
            if status == Status::Drop {
                ok = false;
            }
        }
        if paired {
            for op in ops_r2.iter().filter(|op| !op.is_thread_safe()) {
                let status = op.transform(&mut pair, ReadSelector::R2, stats, verbosity);
                trace_op(verbosity, op.name(), "r2", pair.id, status);
                if status == Status::Drop {
                    ok = false;
                }
            }
        }
        if !ok {
            continue;
        }

        let wid = pair.wid.min(writers_r1.len().saturating_sub(1));
        if let Err(e) = writers_r1[wid].write_record(&pair.r1) {
            cancel.set(e);
            break;
        }
        if paired {
            if let Err(e) = writers_r2[wid].write_record(&pair.r2) {
                cancel.set(e);
                break;
            }
        }
    }
}

/// Per-record operation tracing (verbose level > 2), gated the same way as
/// the rest of the crate's ambient logging: plain `eprintln!`, no structured
/// logging crate.
fn trace_op(verbosity: u8, op_name: &str, side: &str, id: u64, status: Status) {
    if verbosity > 2 {
        let verdict = if status == Status::Drop { "drop" } else { "keep" };
        eprintln!("id={id} side={side} op={op_name} -> {verdict}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{clip::Clip, Operation};
    use crate::trim::TrimSide;
    use std::{fs, io::Write as _};

    fn write_fastq(path: &Path, records: &[(&str, &str, &str)]) {
        let mut f = fs::File::create(path).unwrap();
        for (name, seq, qual) in records {
            writeln!(f, "@{name}\n{seq}\n+\n{qual}").unwrap();
        }
    }

    #[test]
    fn resolve_writer_bins_defaults_to_all() {
        assert_eq!(resolve_writer_bins(&[], &[]), vec!["all".to_string()]);
    }

    #[test]
    fn single_end_clip_runs_end_to_end() {
        let dir = std::env::temp_dir().join(format!("readknead-pipeline-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let in_path = dir.join("in.fastq");
        write_fastq(&in_path, &[("r1", "ACGTAC", "IIIIII")]);

        let cfg = RunConfig {
            fq_fnames_r1: vec![in_path.to_string_lossy().into_owned()],
            fq_fnames_r2: vec![],
            paired: false,
            fq_path_out: dir.to_string_lossy().into_owned(),
            fq_fname_out_r1: "out_[DPX]_R1.fastq".to_string(),
            fq_fname_out_r2: "out_[DPX]_R2.fastq".to_string(),
            fq_command_in: None,
            fq_command_out: None,
            num_worker: 1,
            buf_size: 4096,
            max_read_length: 100,
            max_quality: 50,
            ascii_min: 33,
            report_path: dir.join("report.json").to_string_lossy().into_owned(),
            stats_in_path: None,
            stats_out_path: None,
            label: "t".to_string(),
            verbosity: 0,
        };

        let ops_r1 = vec![Operation::Clip(Clip::new(TrimSide::Five, 3, false, true, "clip".to_string()))];
        let summary = run(&cfg, ops_r1, vec![]).unwrap();
        assert_eq!(summary.total_pair, 1);
        assert_eq!(summary.kept_pair, 1);

        let out = fs::read_to_string(dir.join("out_all_R1.fastq")).unwrap();
        assert_eq!(out, "@r1\nTAC\n+\nIII\n");

        fs::remove_dir_all(&dir).ok();
    }

    fn base_cfg(dir: &Path) -> RunConfig {
        RunConfig {
            fq_fnames_r1: vec![],
            fq_fnames_r2: vec![],
            paired: false,
            fq_path_out: dir.to_string_lossy().into_owned(),
            fq_fname_out_r1: "out_[DPX]_R1.fastq".to_string(),
            fq_fname_out_r2: "out_[DPX]_R2.fastq".to_string(),
            fq_command_in: None,
            fq_command_out: None,
            num_worker: 2,
            buf_size: 4096,
            max_read_length: 100,
            max_quality: 50,
            ascii_min: 33,
            report_path: dir.join("report.json").to_string_lossy().into_owned(),
            stats_in_path: None,
            stats_out_path: None,
            label: "t".to_string(),
            verbosity: 0,
        }
    }

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("readknead-pipeline-test-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn paired_end_three_prime_adapter_search_trims_only_r1() {
        let dir = scratch_dir("search-trim");
        let r1_path = dir.join("in_r1.fastq");
        let r2_path = dir.join("in_r2.fastq");
        write_fastq(&r1_path, &[("p1", "AAAATTTACG", "IIIIIIIIII")]);
        write_fastq(&r2_path, &[("p1", "CCCCGGG", "IIIIIII")]);

        let mut cfg = base_cfg(&dir);
        cfg.fq_fnames_r1 = vec![r1_path.to_string_lossy().into_owned()];
        cfg.fq_fnames_r2 = vec![r2_path.to_string_lossy().into_owned()];
        cfg.paired = true;
        cfg.num_worker = 1;

        let ops_r1 = config::load_ops(r#"[{"name":"trim","algo":"search","end":3,"sequence":"ACG","min_sequence":3}]"#, 33, true).unwrap();
        let summary = run(&cfg, ops_r1, vec![]).unwrap();
        assert_eq!(summary.total_pair, 1);
        assert_eq!(summary.kept_pair, 1);

        assert_eq!(fs::read_to_string(dir.join("out_all_R1.fastq")).unwrap(), "@p1\nAAAATTT\n+\nIIIIIII\n");
        assert_eq!(fs::read_to_string(dir.join("out_all_R2.fastq")).unwrap(), "@p1\nCCCCGGG\n+\nIIIIIII\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn demultiplex_routes_records_to_per_barcode_files() {
        use crate::ops::demultiplex::Demultiplex;

        let dir = scratch_dir("demux");
        let in_path = dir.join("in.fastq");
        write_fastq(&in_path, &[("a", "AAAATTTT", "IIIIIIII"), ("b", "CCCCTTTT", "IIIIIIII"), ("c", "GGGGTTTT", "IIIIIIII")]);

        let mut cfg = base_cfg(&dir);
        cfg.fq_fnames_r1 = vec![in_path.to_string_lossy().into_owned()];
        cfg.num_worker = 1;

        let ops_r1 = vec![Operation::Demultiplex(Demultiplex::new(
            vec![b"AAAA".to_vec(), b"CCCC".to_vec()],
            true,
            TrimSide::Five,
            0,
            0,
            0,
            "demux".to_string(),
        ))];
        let summary = run(&cfg, ops_r1, vec![]).unwrap();
        assert_eq!(summary.total_pair, 3);
        assert_eq!(summary.kept_pair, 3);

        assert_eq!(fs::read_to_string(dir.join("out_AAAA_R1.fastq")).unwrap(), "@a\nTTTT\n+\nIIII\n");
        assert_eq!(fs::read_to_string(dir.join("out_CCCC_R1.fastq")).unwrap(), "@b\nTTTT\n+\nIIII\n");
        assert_eq!(fs::read_to_string(dir.join("out_undetermined_R1.fastq")).unwrap(), "@c\nGGGGTTTT\n+\nIIIIIIII\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn length_filter_drops_short_reads() {
        use crate::ops::length::Length;

        let dir = scratch_dir("length");
        let in_path = dir.join("in.fastq");
        write_fastq(&in_path, &[("short", "AC", "II"), ("long", "ACGTACGT", "IIIIIIII")]);

        let mut cfg = base_cfg(&dir);
        cfg.fq_fnames_r1 = vec![in_path.to_string_lossy().into_owned()];

        let ops_r1 = vec![Operation::Length(Length::new(4, -1, "length".to_string()))];
        let summary = run(&cfg, ops_r1, vec![]).unwrap();
        assert_eq!(summary.total_pair, 2);
        assert_eq!(summary.kept_pair, 1);

        let out = fs::read_to_string(dir.join("out_all_R1.fastq")).unwrap();
        assert_eq!(out, "@long\nACGTACGT\n+\nIIIIIIII\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rename_base36_renumbers_every_pair() {
        use crate::ops::rename::Rename;

        let dir = scratch_dir("rename");
        let in_path = dir.join("in.fastq");
        write_fastq(&in_path, &[("one", "ACGT", "IIII"), ("two", "TTTT", "IIII")]);

        let mut cfg = base_cfg(&dir);
        cfg.fq_fnames_r1 = vec![in_path.to_string_lossy().into_owned()];
        cfg.num_worker = 1;

        let ops_r1 = vec![Operation::Rename(Rename::new(b"read_".to_vec(), true, false, false, true, "rename".to_string()))];
        run(&cfg, ops_r1, vec![]).unwrap();

        let out = fs::read_to_string(dir.join("out_all_R1.fastq")).unwrap();
        assert_eq!(out, "@read_1\nACGT\n+\nIIII\n@read_2\nTTTT\n+\nIIII\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn output_stays_ordered_across_multiple_workers() {
        let dir = scratch_dir("ordering");
        let in_path = dir.join("in.fastq");
        let records: Vec<(String, String, String)> =
            (0..200).map(|i| (format!("r{i}"), "ACGTACGTAC".to_string(), "IIIIIIIIII".to_string())).collect();
        let borrowed: Vec<(&str, &str, &str)> = records.iter().map(|(n, s, q)| (n.as_str(), s.as_str(), q.as_str())).collect();
        write_fastq(&in_path, &borrowed);

        let mut cfg = base_cfg(&dir);
        cfg.fq_fnames_r1 = vec![in_path.to_string_lossy().into_owned()];
        cfg.num_worker = 8;

        let ops_r1 = vec![Operation::Clip(Clip::new(TrimSide::Five, 1, false, true, "clip".to_string()))];
        let summary = run(&cfg, ops_r1, vec![]).unwrap();
        assert_eq!(summary.total_pair, 200);

        let out = fs::read_to_string(dir.join("out_all_R1.fastq")).unwrap();
        let names: Vec<&str> = out.lines().filter(|l| l.starts_with('@')).map(|l| &l[1..]).collect();
        let expected: Vec<String> = (0..200).map(|i| format!("r{i}")).collect();
        assert_eq!(names, expected);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn truncated_record_mid_file_is_a_fatal_error() {
        let dir = scratch_dir("truncated");
        let in_path = dir.join("in.fastq");
        fs::write(&in_path, "@ok\nACGT\n+\nIIII\n@broken\nACGT\n").unwrap();

        let mut cfg = base_cfg(&dir);
        cfg.fq_fnames_r1 = vec![in_path.to_string_lossy().into_owned()];
        cfg.num_worker = 1;

        let err = run(&cfg, vec![], vec![]).unwrap_err();
        assert!(matches!(err, Error::TruncatedRecord { .. }));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn two_non_thread_safe_ops_is_rejected_before_any_io() {
        use crate::ops::rename::Rename;
        let cfg = RunConfig {
            fq_fnames_r1: vec!["/nonexistent/in.fastq".to_string()],
            fq_fnames_r2: vec![],
            paired: false,
            fq_path_out: "/nonexistent/out".to_string(),
            fq_fname_out_r1: "out.fastq".to_string(),
            fq_fname_out_r2: "out_r2.fastq".to_string(),
            fq_command_in: None,
            fq_command_out: None,
            num_worker: 1,
            buf_size: 4096,
            max_read_length: 100,
            max_quality: 50,
            ascii_min: 33,
            report_path: "-".to_string(),
            stats_in_path: None,
            stats_out_path: None,
            label: "t".to_string(),
            verbosity: 0,
        };
        let ops_r1 = vec![Operation::Rename(Rename::new(b"a_".to_vec(), false, false, false, true, "rename".into()))];
        let ops_r2 = vec![Operation::Rename(Rename::new(b"b_".to_vec(), false, false, false, true, "rename".into()))];
        let err = run(&cfg, ops_r1, ops_r2).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
