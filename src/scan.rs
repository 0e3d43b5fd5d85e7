use crate::error::{FleetError, Result};
use crate::git::{FieldSpec, HistoryOracle, LogQuery, RecordStream, Scope};
use crate::model::{AttributedChange, ForkBound, RawChange, RepoDescriptor};
use crate::util::{month_key, parse_git_date, weekday_name, UNKNOWN};
use chrono::Datelike;
use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

/// Case-insensitive contributor pattern, matched anywhere in identities and message.
#[derive(Debug, Clone)]
pub struct ContributorPattern {
    regex: Regex,
}

impl ContributorPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Greedy: co-author trailers and quoted mentions count too.
    pub fn matches(&self, change: &RawChange) -> bool {
        self.regex.is_match(&change.haystack())
    }
}

fn issue_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]+-\d+[:\s-]*").expect("valid issue prefix regex"))
}

fn conventional_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z]+(\([a-z0-9-]+\))?!?:\s*").expect("valid conventional prefix regex")
    })
}

/// Strip a leading `PROJ-123` and then a leading `type(scope):`, trim and lowercase.
pub fn normalize_message(message: &str) -> String {
    let message = message.trim();
    let message = issue_prefix().replace(message, "");
    let message = conventional_prefix().replace(&message, "");
    message.trim().to_lowercase()
}

/// Reduce a matched record to the fields the aggregations need.
pub fn attribute(repo: &str, change: &RawChange) -> AttributedChange {
    let timestamp = parse_git_date(&change.date);
    let subject = change.subject();

    let (lines_added, lines_deleted) = change.files.iter().fold((0, 0), |(a, d), f| {
        (a + f.added.unwrap_or(0), d + f.removed.unwrap_or(0))
    });

    AttributedChange {
        repo: repo.to_string(),
        commit: change.hash.clone(),
        month: timestamp.as_ref().map(month_key),
        date: timestamp.as_ref().map(|ts| ts.date_naive()),
        weekday: timestamp
            .as_ref()
            .map(|ts| weekday_name(ts.weekday()).to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        normalized_message: normalize_message(subject),
        message: subject.to_string(),
        lines_added,
        lines_deleted,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub seen: usize,
    pub attributed: usize,
    pub dropped: usize,
    pub before_bound: usize,
    pub undated: usize,
}

/// Attributed changes of one repository, pulled lazily from the oracle.
///
/// Call [`Attributions::finish`] once drained: a terminal oracle failure only
/// surfaces there, and everything yielded before it must then be discarded.
pub struct Attributions<'a> {
    records: RecordStream<'a>,
    pattern: &'a ContributorPattern,
    repo: String,
    bound: ForkBound,
    stats: ScanStats,
    failure: Option<FleetError>,
}

impl Attributions<'_> {
    pub fn finish(self) -> Result<ScanStats> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.stats),
        }
    }
}

impl Iterator for Attributions<'_> {
    type Item = AttributedChange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failure.is_some() {
            return None;
        }
        loop {
            let raw = match self.records.next()? {
                Ok(raw) => raw,
                Err(FleetError::RecordParseFailure(reason)) => {
                    self.stats.dropped += 1;
                    log::debug!("{}: dropped record: {reason}", self.repo);
                    continue;
                }
                Err(e) => {
                    self.failure = Some(e);
                    return None;
                }
            };
            self.stats.seen += 1;

            if !self.pattern.matches(&raw) {
                continue;
            }
            let change = attribute(&self.repo, &raw);
            match change.date {
                Some(date) if !self.bound.admits(date) => {
                    self.stats.before_bound += 1;
                    continue;
                }
                Some(_) => {}
                None => {
                    self.stats.undated += 1;
                    log::warn!("{}: commit {} has unparseable date '{}'", self.repo, raw.hash, raw.date);
                }
            }
            self.stats.attributed += 1;
            return Some(change);
        }
    }
}

/// Start scanning `repo` from `bound` for changes matching `pattern`.
pub fn scan<'a>(
    oracle: &'a dyn HistoryOracle,
    repo: &RepoDescriptor,
    bound: ForkBound,
    pattern: &'a ContributorPattern,
    fields: FieldSpec,
    scope: Scope,
) -> Result<Attributions<'a>> {
    let query = LogQuery {
        since: bound.since(),
        fields,
        scope,
    };
    let records = oracle.fetch(repo, &query)?;
    Ok(Attributions {
        records,
        pattern,
        repo: repo.id.clone(),
        bound,
        stats: ScanStats::default(),
        failure: None,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn pattern() -> ContributorPattern {
        ContributorPattern::new("ada|lovelace").unwrap()
    }

    #[test]
    fn normalization_strips_known_prefixes() {
        assert_eq!(normalize_message("PROJ-123: fix bug"), "fix bug");
        assert_eq!(normalize_message("fix: fix bug"), "fix bug");
        assert_eq!(normalize_message("feat(parser)!: Add Thing"), "add thing");
        assert_eq!(normalize_message("OPS-9 chore: bump deps"), "bump deps");
        assert_eq!(normalize_message("  Fix the Bug  "), "fix the bug");
        assert_eq!(normalize_message("fix bug"), "fix bug");
    }

    #[test]
    fn co_author_trailer_is_attributed() {
        let change = raw(
            "c1",
            "2020-01-02T10:00:00+00:00",
            "Bob Builder",
            "Refactor\n\nCo-authored-by: Ada L <ada@example.com>",
        );
        assert!(pattern().matches(&change));
        assert!(!pattern().matches(&raw("c2", "2020-01-02T10:00:00+00:00", "Bob Builder", "Refactor")));
    }

    #[test]
    fn match_is_case_insensitive_over_committer_fields() {
        let mut change = raw("c1", "2020-01-02T10:00:00+00:00", "Bob", "msg");
        change.committer_email = "A.LOVELACE@corp.example".into();
        assert!(pattern().matches(&change));
    }

    #[test]
    fn attribute_sums_churn_and_ignores_binary() {
        let change = with_churn(
            raw("c1", "2020-01-31T23:30:00-05:00", "Ada", "JIRA-7: Tweak"),
            &[("a.rs", Some(10), Some(2)), ("logo.png", None, None), ("b.rs", Some(1), Some(0))],
        );
        let attributed = attribute("alpha", &change);
        assert_eq!(attributed.month.as_deref(), Some("2020-01"));
        assert_eq!(attributed.weekday, "Friday");
        assert_eq!(attributed.normalized_message, "tweak");
        assert_eq!(attributed.message, "JIRA-7: Tweak");
        assert_eq!((attributed.lines_added, attributed.lines_deleted), (11, 2));
    }

    #[test]
    fn unparseable_timestamp_has_no_month() {
        let attributed = attribute("alpha", &raw("c1", "yesterday-ish", "Ada", "x"));
        assert_eq!(attributed.month, None);
        assert_eq!(attributed.weekday, UNKNOWN);
    }

    #[test]
    fn scan_never_yields_changes_before_bound() {
        let oracle = FakeOracle::default().with(
            "/fleet/beta",
            vec![
                raw("new", "2021-07-03T09:00:00+00:00", "Ada", "later"),
                raw("edge", "2021-06-01T00:10:00+02:00", "Ada", "on the day"),
                raw("old", "2021-05-31T23:59:00+00:00", "Ada", "earlier"),
            ],
        );
        let repo = RepoDescriptor::from_path("/fleet/beta");
        let bound = ForkBound::Since(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap());
        let pattern = pattern();
        let mut changes = scan(&oracle, &repo, bound, &pattern, FieldSpec::Identity, Scope::All).unwrap();
        let commits: Vec<String> = changes.by_ref().map(|c| c.commit).collect();
        let stats = changes.finish().unwrap();
        assert_eq!(commits, vec!["new", "edge"]);
        assert_eq!(stats.before_bound, 1);
        assert_eq!(
            oracle.queries.borrow()[0].1.since,
            Some(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap())
        );
    }

    #[test]
    fn malformed_records_are_counted_and_skipped() {
        let oracle = FakeOracle::default().scripted(
            "/fleet/alpha",
            vec![
                Scripted::Malformed,
                Scripted::Record(raw("a", "2020-01-01T00:00:00+00:00", "Ada", "x")),
                Scripted::Malformed,
            ],
        );
        let repo = RepoDescriptor::from_path("/fleet/alpha");
        let pattern = pattern();
        let mut changes =
            scan(&oracle, &repo, ForkBound::Unbounded, &pattern, FieldSpec::Identity, Scope::Head).unwrap();
        assert_eq!(changes.by_ref().count(), 1);
        let stats = changes.finish().unwrap();
        assert_eq!(stats, ScanStats { seen: 1, attributed: 1, dropped: 2, before_bound: 0, undated: 0 });
    }

    #[test]
    fn terminal_failure_surfaces_on_finish() {
        let oracle = FakeOracle::default().scripted(
            "/fleet/alpha",
            vec![
                Scripted::Record(raw("a", "2020-01-01T00:00:00+00:00", "Ada", "x")),
                Scripted::Crash,
                Scripted::Record(raw("b", "2020-01-01T00:00:00+00:00", "Ada", "y")),
            ],
        );
        let repo = RepoDescriptor::from_path("/fleet/alpha");
        let pattern = pattern();
        let mut changes =
            scan(&oracle, &repo, ForkBound::Unbounded, &pattern, FieldSpec::Identity, Scope::All).unwrap();
        assert_eq!(changes.by_ref().count(), 1);
        assert!(matches!(changes.finish(), Err(FleetError::RepositoryUnavailable { .. })));
    }
}
