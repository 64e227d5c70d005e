//! The FASTQ codec (C1): four-line record parsing/emission over either a
//! plain buffered file or a piped external command, mirroring the two
//! back-ends the coordinator needs for `--fq-command-in`/`--fq-command-out`.

use crate::{
    error::{Error, Result},
    record::Record,
    utils::whichever::define_whichever,
};
use std::{
    io::{BufRead, BufReader, BufWriter, Read, Write},
    fs::File,
    path::Path,
    process::{Child, Command, Stdio},
};

pub const DEFAULT_BUF_SIZE: usize = 41_943_040;

define_whichever! {
    pub enum ReadBackend {
        File(BufReader<File>),
        Pipe(BufReader<std::process::ChildStdout>),
    }

    impl Read for ReadBackend {}
}

define_whichever! {
    pub enum WriteBackend {
        File(BufWriter<File>),
        Pipe(BufWriter<std::process::ChildStdin>),
    }

    impl Write for WriteBackend {}
}

/// Reads FASTQ records one at a time from a file, or from the standard
/// output of a spawned external command (e.g. a decompressor).
pub struct FastqReader {
    path:  String,
    inner: ReadBackend,
    child: Option<Child>,
    /// Set once the first line of a record hits end-of-stream; mirrors the
    /// upstream reader's `done` flag rather than signalling end-of-stream via
    /// a sentinel record.
    pub done: bool,
}

impl FastqReader {
    pub fn open(path: &str, cmd: Option<&[String]>, buf_size: usize) -> Result<Self> {
        let (inner, child) = match cmd {
            None => {
                let file = File::open(path).map_err(|e| Error::io(path, e))?;
                (ReadBackend::File(BufReader::with_capacity(buf_size, file)), None)
            }
            Some(cmd) => {
                let mut child = Command::new(&cmd[0])
                    .args(&cmd[1..])
                    .arg(path)
                    .stdout(Stdio::piped())
                    .spawn()
                    .map_err(|e| Error::io(path, e))?;
                let stdout = child.stdout.take().expect("piped stdout");
                (ReadBackend::Pipe(BufReader::with_capacity(buf_size, stdout)), Some(child))
            }
        };
        Ok(FastqReader { path: path.to_string(), inner, child, done: false })
    }

    /// Reads the next record. Returns `Ok(None)` at a clean end-of-stream
    /// (EOF on the name line); a truncated record (EOF partway through lines
    /// 2-4) is a hard [`Error::TruncatedRecord`].
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        let mut name_line = Vec::new();
        let n = self
            .inner
            .read_until(b'\n', &mut name_line)
            .map_err(|e| Error::io(self.path.clone(), e))?;
        if n == 0 {
            self.done = true;
            return Ok(None);
        }
        strip_trailing_newline(&mut name_line);
        if name_line.first() == Some(&b'@') {
            name_line.remove(0);
        }

        let mut seq = Vec::new();
        self.read_required_line(&mut seq)?;
        strip_trailing_newline(&mut seq);

        // the separator line's content is intentionally discarded
        let mut sep = Vec::new();
        self.read_required_line(&mut sep)?;

        let mut qual = Vec::new();
        self.read_required_line(&mut qual)?;
        strip_trailing_newline(&mut qual);

        Ok(Some(Record::new(name_line, seq, qual)))
    }

    fn read_required_line(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let n = self
            .inner
            .read_until(b'\n', buf)
            .map_err(|e| Error::io(self.path.clone(), e))?;
        if n == 0 {
            return Err(Error::truncated(self.path.clone()));
        }
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            child.wait().map_err(|e| Error::io(self.path.clone(), e))?;
        }
        Ok(())
    }
}

impl Drop for FastqReader {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// Writes FASTQ records to a file, or to the standard input of a spawned
/// external command (e.g. a compressor). The separator line is always
/// written bare (`+`), discarding whatever the original separator held.
pub struct FastqWriter {
    path:   String,
    inner:  Option<WriteBackend>,
    child:  Option<Child>,
}

impl FastqWriter {
    pub fn create(path: &str, cmd: Option<&[String]>, buf_size: usize) -> Result<Self> {
        let (inner, child) = match cmd {
            None => {
                let file = File::create(path).map_err(|e| Error::io(path, e))?;
                (WriteBackend::File(BufWriter::with_capacity(buf_size, file)), None)
            }
            Some(cmd) => {
                let mut child = Command::new(&cmd[0])
                    .args(&cmd[1..])
                    .arg(path)
                    .stdin(Stdio::piped())
                    .spawn()
                    .map_err(|e| Error::io(path, e))?;
                let stdin = child.stdin.take().expect("piped stdin");
                (WriteBackend::Pipe(BufWriter::with_capacity(buf_size, stdin)), Some(child))
            }
        };
        Ok(FastqWriter { path: path.to_string(), inner: Some(inner), child })
    }

    pub fn write_record(&mut self, r: &Record) -> Result<()> {
        let inner = self.inner.as_mut().expect("writer used after close");
        inner.write_all(b"@").map_err(|e| Error::io(self.path.clone(), e))?;
        inner.write_all(&r.name).map_err(|e| Error::io(self.path.clone(), e))?;
        inner.write_all(b"\n").map_err(|e| Error::io(self.path.clone(), e))?;
        inner.write_all(&r.seq).map_err(|e| Error::io(self.path.clone(), e))?;
        inner.write_all(b"\n+\n").map_err(|e| Error::io(self.path.clone(), e))?;
        inner.write_all(&r.qual).map_err(|e| Error::io(self.path.clone(), e))?;
        inner.write_all(b"\n").map_err(|e| Error::io(self.path.clone(), e))?;
        Ok(())
    }

    /// Flushes, drops the pipe end (if any), then reaps the child process so
    /// no zombie is left behind. Deferred errors chain onto the first one
    /// encountered rather than being silently dropped.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let mut result: Result<()> = Ok(());

        if let Some(mut inner) = self.inner.take() {
            if let Err(e) = inner.flush() {
                result = Err(Error::io(self.path.clone(), e));
            }
            // dropping `inner` here closes the pipe's write end, which is
            // required before the child will see end-of-input
        }

        if let Some(mut child) = self.child.take() {
            match (child.wait().map_err(|e| Error::io(self.path.clone(), e)), result) {
                (Ok(_), r) => result = r,
                (Err(e), Ok(())) => result = Err(e),
                (Err(e), Err(first)) => result = Err(first.chain(e)),
            }
        }

        result
    }
}

impl Drop for FastqWriter {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

fn strip_trailing_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

/// Substitutes the `[DPX]` template placeholder with `dpx` in a path
/// template, used when building per-barcode output filenames.
pub fn substitute_dpx(template: &str, dpx: &str) -> String {
    template.replace("[DPX]", dpx)
}

/// Derives a default output filename from the basename of `first_input` when
/// no explicit output filename template was given.
pub fn default_out_name(first_input: &str) -> String {
    Path::new(first_input)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| first_input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn round_trips_a_single_record() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("readknead-test-{}.fastq", std::process::id()));
        {
            let mut f = File::create(&path).unwrap();
            write!(f, "@read1\nACGT\n+ignored\nIIII\n").unwrap();
        }

        let mut reader = FastqReader::open(path.to_str().unwrap(), None, 4096).unwrap();
        let rec = reader.next_record().unwrap().unwrap();
        assert_eq!(rec.name, b"read1");
        assert_eq!(rec.seq, b"ACGT");
        assert_eq!(rec.qual, b"IIII");
        assert!(reader.next_record().unwrap().is_none());
        assert!(reader.done);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn truncated_record_is_an_error() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("readknead-test-trunc-{}.fastq", std::process::id()));
        {
            let mut f = File::create(&path).unwrap();
            write!(f, "@read1\nACGT\n").unwrap();
        }

        let mut reader = FastqReader::open(path.to_str().unwrap(), None, 4096).unwrap();
        let err = reader.next_record().unwrap_err();
        assert!(matches!(err, Error::TruncatedRecord { .. }));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn dpx_template_substitution() {
        assert_eq!(substitute_dpx("out_[DPX]_R1.fastq", "AAAA"), "out_AAAA_R1.fastq");
    }
}
