use chrono::NaiveDate;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};

/// Column name holding the month in every streamgraph row.
pub const MONTH_COLUMN: &str = "date";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDescriptor {
    pub id: String,
    pub path: PathBuf,
}

impl RepoDescriptor {
    /// Describe a repository by its location; the id is the final path component.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let id = path
            .components()
            .next_back()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self { id, path }
    }
}

/// Inclusive lower bound for scanning one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForkBound {
    Since(NaiveDate),
    #[default]
    Unbounded,
}

impl ForkBound {
    pub fn since(&self) -> Option<NaiveDate> {
        match self {
            ForkBound::Since(date) => Some(*date),
            ForkBound::Unbounded => None,
        }
    }

    pub fn admits(&self, date: NaiveDate) -> bool {
        match self {
            ForkBound::Since(bound) => date >= *bound,
            ForkBound::Unbounded => true,
        }
    }
}

/// What the fork-point resolver concluded for one child repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForkResolution {
    SplitPoint { commit: String, date: NaiveDate },
    RootCommit { commit: String, date: NaiveDate },
    NotFound,
    Unbounded,
}

impl ForkResolution {
    pub fn bound(&self) -> ForkBound {
        match self {
            ForkResolution::SplitPoint { date, .. } | ForkResolution::RootCommit { date, .. } => {
                ForkBound::Since(*date)
            }
            ForkResolution::NotFound | ForkResolution::Unbounded => ForkBound::Unbounded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChurn {
    pub path: String,
    /// `None` when git reports the file as binary.
    pub added: Option<u64>,
    pub removed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub hash: String,
    pub date: String,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
    pub message: String,
    pub files: Vec<FileChurn>,
}

impl RawChange {
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    /// Text the contributor pattern is tested against.
    pub fn haystack(&self) -> String {
        [
            self.author_name.as_str(),
            self.author_email.as_str(),
            self.committer_name.as_str(),
            self.committer_email.as_str(),
            self.message.as_str(),
        ]
        .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributedChange {
    pub repo: String,
    pub commit: String,
    /// `YYYY-MM`; `None` when the timestamp could not be parsed.
    pub month: Option<String>,
    pub date: Option<NaiveDate>,
    pub weekday: String,
    pub normalized_message: String,
    pub message: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRow {
    pub month: String,
    /// One count per repository, in column order.
    pub counts: Vec<u64>,
}

/// Dense repository × month matrix, serialized as `[{"date": .., repo: count, ..}, ..]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MonthlyMatrix {
    pub repos: Vec<String>,
    pub rows: Vec<MonthRow>,
}

impl MonthlyMatrix {
    pub fn total(&self) -> u64 {
        self.rows.iter().flat_map(|r| r.counts.iter()).sum()
    }

    pub fn count(&self, month: &str, repo: &str) -> Option<u64> {
        let col = self.repos.iter().position(|r| r == repo)?;
        let row = self.rows.iter().find(|r| r.month == month)?;
        row.counts.get(col).copied()
    }
}

struct RowRef<'a> {
    repos: &'a [String],
    row: &'a MonthRow,
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.repos.len() + 1))?;
        map.serialize_entry(MONTH_COLUMN, &self.row.month)?;
        for (repo, count) in self.repos.iter().zip(&self.row.counts) {
            map.serialize_entry(repo, count)?;
        }
        map.end()
    }
}

impl Serialize for MonthlyMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RowRef { repos: &self.repos, row })?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCount {
    pub id: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_commits: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub most_productive_day: Option<String>,
    pub most_used_message: Option<String>,
    pub longest_streak_days: u32,
    pub least_productive_year: Option<i32>,
    pub teams: Vec<TeamCount>,
}
