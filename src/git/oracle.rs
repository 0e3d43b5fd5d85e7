use crate::error::{FleetError, Result};
use crate::git::repo::GitRepo;
use crate::model::{FileChurn, RawChange, RepoDescriptor};
use chrono::{Days, NaiveDate};
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read, Split};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};

const RECORD_START: char = '\x1e';
const FIELD_SEP: char = '\x1f';
const HEADER_END: char = '\x1d';
const LOG_FORMAT: &str = "--format=%x1e%H%x1f%aI%x1f%an%x1f%ae%x1f%cn%x1f%ce%x1f%B%x1d";
const HEADER_FIELDS: usize = 7;
// covers the widest gap between an author offset and the local one (+14:00 vs -12:00)
const SINCE_SLACK_DAYS: u64 = 2;

/// Which fields each record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSpec {
    /// Timestamp, identities and message.
    Identity,
    /// Identity fields plus per-file line counts.
    WithChurn,
}

/// Which refs the oracle traverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scope {
    /// Every known ref.
    All,
    /// The currently checked-out line of history only.
    Head,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub since: Option<NaiveDate>,
    pub fields: FieldSpec,
    pub scope: Scope,
}

pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<RawChange>> + 'a>;

/// Source of change records for one repository.
///
/// Items that fail with [`FleetError::RecordParseFailure`] are recoverable; any
/// other error item is terminal for that repository and ends the stream.
pub trait HistoryOracle {
    fn fetch<'a>(&'a self, repo: &RepoDescriptor, query: &LogQuery) -> Result<RecordStream<'a>>;
}

/// The `git` command line as history oracle.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: OsString,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(binary: impl Into<OsString>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn binary(&self) -> &std::ffi::OsStr {
        &self.binary
    }

    fn log_command(&self, repo: &RepoDescriptor, query: &LogQuery) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-C").arg(&repo.path).args(["log", "--no-color"]);
        if query.scope == Scope::All {
            cmd.arg("--all");
        }
        cmd.arg(LOG_FORMAT);
        if query.fields == FieldSpec::WithChurn {
            cmd.arg("--numstat");
        }
        // git filters on committer date in local time; the scanner enforces the exact bound
        if let Some(since) = query.since {
            let slack = since.checked_sub_days(Days::new(SINCE_SLACK_DAYS)).unwrap_or(since);
            cmd.arg(format!("--since={} 00:00:00", slack.format("%Y-%m-%d")));
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }
}

impl HistoryOracle for GitCli {
    fn fetch<'a>(&'a self, repo: &RepoDescriptor, query: &LogQuery) -> Result<RecordStream<'a>> {
        if !repo.path.exists() {
            return Err(FleetError::unavailable(&repo.path, "path not found"));
        }
        GitRepo::open(&repo.path).map_err(|e| FleetError::unavailable(&repo.path, e))?;

        let mut child = self
            .log_command(repo, query)
            .spawn()
            .map_err(|e| FleetError::unavailable(&repo.path, format!("failed to spawn git log: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FleetError::unavailable(&repo.path, "git log has no stdout"))?;

        Ok(Box::new(LogStream {
            child,
            chunks: BufReader::new(stdout).split(RECORD_START as u8),
            path: repo.path.clone(),
            with_files: query.fields == FieldSpec::WithChurn,
            done: false,
        }))
    }
}

/// Lazily parsed output of one `git log` process.
pub struct LogStream {
    child: Child,
    chunks: Split<BufReader<ChildStdout>>,
    path: PathBuf,
    with_files: bool,
    done: bool,
}

impl LogStream {
    fn finish(&mut self) -> Result<()> {
        self.done = true;
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        let status = self
            .child
            .wait()
            .map_err(|e| FleetError::unavailable(&self.path, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(FleetError::unavailable(
                &self.path,
                format!("git log exited with {status}: {}", stderr.trim()),
            ))
        }
    }

    fn abort(&mut self) {
        self.done = true;
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Iterator for LogStream {
    type Item = Result<RawChange>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.chunks.next() {
                Some(Ok(chunk)) => {
                    // output starts with a separator, so the first chunk is empty
                    if chunk.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    let text = String::from_utf8_lossy(&chunk);
                    return Some(parse_record(&text, self.with_files));
                }
                Some(Err(e)) => {
                    self.abort();
                    return Some(Err(FleetError::unavailable(&self.path, e)));
                }
                None => return self.finish().err().map(Err),
            }
        }
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        if !self.done {
            self.abort();
        }
    }
}

/// Parse one record (without its leading separator).
pub fn parse_record(text: &str, with_files: bool) -> Result<RawChange> {
    let (header, stat) = text
        .split_once(HEADER_END)
        .ok_or_else(|| FleetError::RecordParseFailure("missing header terminator".to_string()))?;

    let fields: Vec<&str> = header.splitn(HEADER_FIELDS, FIELD_SEP).collect();
    if fields.len() < HEADER_FIELDS {
        return Err(FleetError::RecordParseFailure(format!(
            "expected {HEADER_FIELDS} fields, found {}",
            fields.len()
        )));
    }
    let hash = fields[0].trim();
    if hash.is_empty() {
        return Err(FleetError::RecordParseFailure("empty commit hash".to_string()));
    }

    let files = if with_files {
        stat.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| parse_numstat(l).map_err(|e| FleetError::RecordParseFailure(format!("{hash}: {e}"))))
            .collect::<Result<Vec<_>>>()?
    } else {
        Vec::new()
    };

    Ok(RawChange {
        hash: hash.to_string(),
        date: fields[1].trim().to_string(),
        author_name: fields[2].to_string(),
        author_email: fields[3].to_string(),
        committer_name: fields[4].to_string(),
        committer_email: fields[5].to_string(),
        message: fields[6].trim_end().to_string(),
        files,
    })
}

fn parse_numstat(line: &str) -> std::result::Result<FileChurn, String> {
    let mut parts = line.splitn(3, '\t');
    let (Some(added), Some(removed), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("malformed numstat line '{line}'"));
    };
    Ok(FileChurn {
        path: path.to_string(),
        added: parse_count(added)?,
        removed: parse_count(removed)?,
    })
}

fn parse_count(value: &str) -> std::result::Result<Option<u64>, String> {
    if value == "-" {
        return Ok(None);
    }
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|_| format!("invalid line count '{value}'"))
}
