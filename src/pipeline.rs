use crate::config::FleetConfig;
use crate::git::{FieldSpec, HistoryOracle, Scope};
use crate::model::{AttributedChange, RepoDescriptor};
use crate::scan::{scan, ContributorPattern, ScanStats};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Everything one pipeline run needs, passed in explicitly.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub fleet: FleetConfig,
    pub pattern: ContributorPattern,
    pub scope: Scope,
    pub fields: FieldSpec,
    pub show_progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    Scanned(ScanStats),
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct RepoReport<A> {
    pub repo: RepoDescriptor,
    pub outcome: RepoOutcome,
    pub elapsed: Duration,
    /// Per-repository fold; left at its default when the repository was skipped.
    pub folded: A,
}

impl<A> RepoReport<A> {
    pub fn attributed(&self) -> usize {
        match &self.outcome {
            RepoOutcome::Scanned(stats) => stats.attributed,
            RepoOutcome::Unavailable(_) => 0,
        }
    }

    /// One-line description that keeps "skipped" apart from "nothing found".
    pub fn describe(&self) -> String {
        let elapsed = humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64));
        match &self.outcome {
            RepoOutcome::Scanned(stats) => {
                let mut line = format!(
                    "{}: {} attributed of {} scanned",
                    self.repo.id, stats.attributed, stats.seen
                );
                if stats.dropped > 0 {
                    line.push_str(&format!(", {} records dropped", stats.dropped));
                }
                if stats.undated > 0 {
                    line.push_str(&format!(", {} without a usable date", stats.undated));
                }
                format!("{line} ({elapsed})")
            }
            RepoOutcome::Unavailable(reason) => {
                format!("{}: skipped, unavailable: {reason}", self.repo.id)
            }
        }
    }
}

/// Scan every configured repository in order, folding its attributed changes into `A`.
///
/// A repository whose scan fails is reported as unavailable and its partial fold discarded.
pub fn run<A, F>(config: &RunConfig, oracle: &dyn HistoryOracle, mut fold: F) -> Vec<RepoReport<A>>
where
    A: Default,
    F: FnMut(&mut A, AttributedChange),
{
    log::info!(
        "scanning {} repositories for '{}'",
        config.fleet.entries.len(),
        config.pattern.as_str()
    );

    let mut reports = Vec::with_capacity(config.fleet.entries.len());
    for entry in &config.fleet.entries {
        let pb = spinner(config.show_progress, &entry.repo);
        let started = Instant::now();

        let mut folded = A::default();
        let result = scan(
            oracle,
            &entry.repo,
            entry.bound,
            &config.pattern,
            config.fields,
            config.scope,
        )
        .and_then(|mut changes| {
            for change in changes.by_ref() {
                fold(&mut folded, change);
                pb.inc(1);
            }
            changes.finish()
        });

        let outcome = match result {
            Ok(stats) => RepoOutcome::Scanned(stats),
            Err(e) if e.is_recoverable() => {
                folded = A::default();
                RepoOutcome::Unavailable(e.to_string())
            }
            Err(e) => {
                folded = A::default();
                RepoOutcome::Unavailable(format!("scan failed: {e}"))
            }
        };

        let report = RepoReport {
            repo: entry.repo.clone(),
            outcome,
            elapsed: started.elapsed(),
            folded,
        };
        match &report.outcome {
            RepoOutcome::Scanned(_) => log::info!("{}", report.describe()),
            RepoOutcome::Unavailable(_) => log::warn!("{}", report.describe()),
        }
        pb.finish_with_message(match &report.outcome {
            RepoOutcome::Scanned(_) => style(report.describe()).green().to_string(),
            RepoOutcome::Unavailable(_) => style(report.describe()).yellow().to_string(),
        });
        reports.push(report);
    }
    reports
}

fn spinner(visible: bool, repo: &RepoDescriptor) -> ProgressBar {
    let pb = if visible {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} {pos}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Scanning {}", repo.id));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ForkBound;
    use crate::scan::testing::*;
    use crate::util::parse_bound_date;

    fn run_config(fleet: FleetConfig) -> RunConfig {
        RunConfig {
            fleet,
            pattern: ContributorPattern::new("ada").unwrap(),
            scope: Scope::All,
            fields: FieldSpec::Identity,
            show_progress: false,
        }
    }

    #[test]
    fn unavailable_repository_does_not_abort_the_run() {
        let oracle = FakeOracle::default().with(
            "/fleet/alpha",
            vec![raw("a", "2020-01-05T10:00:00+00:00", "Ada", "x")],
        );
        let mut fleet = FleetConfig::default();
        fleet.push(RepoDescriptor::from_path("/fleet/gone"), ForkBound::Unbounded);
        fleet.push(RepoDescriptor::from_path("/fleet/alpha"), ForkBound::Unbounded);

        let reports = run(&run_config(fleet), &oracle, |n: &mut usize, _| *n += 1);
        assert!(matches!(reports[0].outcome, RepoOutcome::Unavailable(_)));
        assert!(reports[0].describe().contains("skipped"));
        assert_eq!(reports[1].folded, 1);
        assert_eq!(reports.iter().map(RepoReport::attributed).sum::<usize>(), 1);
    }

    #[test]
    fn partial_fold_is_discarded_on_failure() {
        let oracle = FakeOracle::default().scripted(
            "/fleet/alpha",
            vec![
                Scripted::Record(raw("a", "2020-01-05T10:00:00+00:00", "Ada", "x")),
                Scripted::Crash,
            ],
        );
        let mut fleet = FleetConfig::default();
        fleet.push(RepoDescriptor::from_path("/fleet/alpha"), ForkBound::Unbounded);

        let reports = run(&run_config(fleet), &oracle, |v: &mut Vec<AttributedChange>, c| v.push(c));
        assert!(reports[0].folded.is_empty());
        assert_eq!(reports[0].attributed(), 0);
        assert!(reports[0].describe().contains("exited with 128"));
    }

    #[test]
    fn zero_activity_is_reported_as_scanned() {
        let oracle = FakeOracle::default().with(
            "/fleet/beta",
            vec![raw("b", "2019-01-05T10:00:00+00:00", "Ada", "too old")],
        );
        let mut fleet = FleetConfig::default();
        fleet.push(
            RepoDescriptor::from_path("/fleet/beta"),
            ForkBound::Since(parse_bound_date("2021-06-01").unwrap()),
        );
        let reports = run(&run_config(fleet), &oracle, |n: &mut usize, _| *n += 1);
        assert_eq!(
            reports[0].outcome,
            RepoOutcome::Scanned(ScanStats { seen: 1, attributed: 0, dropped: 0, before_bound: 1, undated: 0 })
        );
        assert!(reports[0].describe().starts_with("beta: 0 attributed of 1 scanned"));
    }
}
