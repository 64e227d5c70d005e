//! The `run` subcommand (C6-adjacent): parses CLI flags into a
//! [`pipeline::RunConfig`] plus two operation lists, then drives the
//! pipeline to completion.

use crate::{
    config,
    error::{Error, Result},
    fastq::{self, DEFAULT_BUF_SIZE},
    ops::Operation,
    pipeline::{self, RunConfig},
};
use clap::Args;
use indoc::writedoc;
use std::{
    fmt::Write as _,
    time::Instant,
};

/// Read FASTQ files, apply the configured operations, and write the
/// filtered/transformed reads back out.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Comma-separated list of R1 (or single-end) FASTQ input files.
    #[arg(long, value_delimiter = ',')]
    fq_fnames_r1: Vec<String>,

    /// Comma-separated list of R2 FASTQ input files. Omit for single-end data.
    #[arg(long, value_delimiter = ',')]
    fq_fnames_r2: Vec<String>,

    /// Directory to write output FASTQ files into. Must already exist.
    #[arg(long)]
    fq_path_out: String,

    /// R1 output filename template; `[DPX]` is substituted with the
    /// demultiplexed bin name (or `all` with no demultiplex operation).
    #[arg(long)]
    fq_fname_out_r1: Option<String>,

    /// R2 output filename template. See `--fq-fname-out-r1`.
    #[arg(long)]
    fq_fname_out_r2: Option<String>,

    /// Shell command (and arguments) used to open each input file, for
    /// reading from a compressed or otherwise piped source.
    #[arg(long, value_delimiter = ',')]
    fq_command_in: Option<Vec<String>>,

    /// Shell command (and arguments) used to open each output file.
    #[arg(long, value_delimiter = ',')]
    fq_command_out: Option<Vec<String>>,

    /// Inline JSON array of R1 operation descriptors.
    #[arg(long)]
    ops_r1: Option<String>,

    /// Inline JSON array of R2 operation descriptors.
    #[arg(long)]
    ops_r2: Option<String>,

    /// Path to a JSON file of R1 operation descriptors. Overrides `--ops-r1`.
    #[arg(long)]
    ops_r1_path: Option<String>,

    /// Path to a JSON file of R2 operation descriptors. Overrides `--ops-r2`.
    #[arg(long)]
    ops_r2_path: Option<String>,

    /// Worker thread count. Defaults to the number of logical CPUs.
    #[arg(long)]
    num_worker: Option<usize>,

    /// Reader/writer buffer size, in bytes.
    #[arg(long, default_value_t = DEFAULT_BUF_SIZE)]
    buf_size: usize,

    /// Upper bound used to size the length-distribution table in the report.
    #[arg(long, default_value_t = 500)]
    max_read_length: usize,

    /// Upper bound used to size the quality-distribution table in the report.
    #[arg(long, default_value_t = 43)]
    max_quality: usize,

    /// ASCII offset of the lowest representable quality score.
    #[arg(long, default_value_t = 33)]
    ascii_min: i32,

    /// Path to write the run's statistics report.
    #[arg(long)]
    report_path: String,

    /// Optional path to a prior report, merged in as a starting point
    /// ("in" half) of the written report.
    #[arg(long)]
    stats_in_path: Option<String>,

    /// Optional path to a prior report, merged in as a starting point
    /// ("out" half) of the written report.
    #[arg(long)]
    stats_out_path: Option<String>,

    /// Label recorded in the statistics report.
    #[arg(long, default_value = "readknead")]
    label: String,

    /// Verbosity level. Level > 2 traces per-record operation outcomes;
    /// level > 0 prints a run summary at the end.
    #[arg(long, default_value_t = 0)]
    verbose_level: u8,

    /// Shorthand for `--verbose-level 1`.
    #[arg(short, long)]
    verbose: bool,
}

pub fn run_process(args: RunArgs) -> Result<()> {
    let started = Instant::now();
    let verbosity = if args.verbose { args.verbose_level.max(1) } else { args.verbose_level };

    if args.fq_fnames_r1.is_empty() {
        return Err(Error::config("--fq-fnames-r1 must list at least one input file"));
    }
    let paired = !args.fq_fnames_r2.is_empty();
    if paired && args.fq_fnames_r2.len() != args.fq_fnames_r1.len() {
        return Err(Error::config("--fq-fnames-r1 and --fq-fnames-r2 must list the same number of files"));
    }

    let fq_fname_out_r1 = args
        .fq_fname_out_r1
        .unwrap_or_else(|| format!("[DPX]_{}", fastq::default_out_name(&args.fq_fnames_r1[0])));
    let fq_fname_out_r2 = if paired {
        args.fq_fname_out_r2
            .unwrap_or_else(|| format!("[DPX]_{}", fastq::default_out_name(&args.fq_fnames_r2[0])))
    } else {
        String::new()
    };

    let ops_r1 = load_side(args.ops_r1_path.as_deref(), args.ops_r1.as_deref(), args.ascii_min, paired)?;
    let ops_r2 = load_side(args.ops_r2_path.as_deref(), args.ops_r2.as_deref(), args.ascii_min, paired)?;

    let cfg = RunConfig {
        fq_fnames_r1: args.fq_fnames_r1,
        fq_fnames_r2: args.fq_fnames_r2,
        paired,
        fq_path_out: args.fq_path_out,
        fq_fname_out_r1,
        fq_fname_out_r2,
        fq_command_in: args.fq_command_in,
        fq_command_out: args.fq_command_out,
        num_worker: if cfg!(feature = "dev_no_threads") { 1 } else { args.num_worker.unwrap_or_else(num_cpus::get) },
        buf_size: args.buf_size,
        max_read_length: args.max_read_length,
        max_quality: args.max_quality,
        ascii_min: args.ascii_min,
        report_path: args.report_path,
        stats_in_path: args.stats_in_path,
        stats_out_path: args.stats_out_path,
        label: args.label,
        verbosity,
    };

    let summary = pipeline::run(&cfg, ops_r1, ops_r2)?;

    if verbosity > 0 {
        let elapsed = started.elapsed().as_secs_f64();
        let mut out = String::new();
        writedoc!(
            out,
            "
            TOTAL_PAIRS\t{total_pair}
            KEPT_PAIRS\t{kept_pair}
            ELAPSED_SECONDS\t{elapsed:.3}
            ",
            total_pair = summary.total_pair,
            kept_pair = summary.kept_pair,
        )
        .expect("writing to a String never fails");
        eprint!("{out}");
    }

    Ok(())
}

fn load_side(path: Option<&str>, inline: Option<&str>, ascii_min: i32, paired: bool) -> Result<Vec<Operation>> {
    match (path, inline) {
        (Some(path), _) => config::load_ops_from_path(path, ascii_min, paired),
        (None, Some(json)) => config::load_ops(json, ascii_min, paired),
        (None, None) => Ok(Vec::new()),
    }
}
