use crate::error::{FleetError, Result};
use crate::model::{AnalyticsSummary, AttributedChange, TeamCount};
use crate::util::{weekday_name, UNKNOWN, WEEKDAYS};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

/// Prefixes kept in the stored summary.
pub const TOP_TEAMS: usize = 15;

/// Counter that remembers first-seen order, so ties resolve to the earliest key.
#[derive(Debug, Default)]
struct OrderedCounter {
    index: HashMap<String, usize>,
    counts: Vec<(String, u64)>,
}

impl OrderedCounter {
    fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.counts.len());
                self.counts.push((key.to_string(), 1));
            }
        }
    }

    fn most_common(&self) -> Option<&str> {
        let mut best: Option<&(String, u64)> = None;
        for entry in &self.counts {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(key, _)| key.as_str())
    }

    fn ranked(self, limit: usize) -> Vec<(String, u64)> {
        let mut counts = self.counts;
        // stable: equal counts keep first-seen order
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(limit);
        counts
    }
}

fn issue_team() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]+)-\d+").expect("valid issue team regex"))
}

fn conventional_team() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z]+):").expect("valid prefix team regex"))
}

/// Classify a raw message by its issue key (`PROJ-12` → `PROJ`) or `type:` prefix.
pub fn team_prefix(message: &str) -> String {
    let message = message.trim_start();
    issue_team()
        .captures(message)
        .or_else(|| conventional_team().captures(message))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn most_productive_day(changes: &[AttributedChange]) -> Option<String> {
    let mut counts = [0u64; 7];
    for change in changes.iter().filter(|c| c.weekday != UNKNOWN) {
        if let Some(i) = WEEKDAYS.iter().position(|d| weekday_name(*d) == change.weekday) {
            counts[i] += 1;
        }
    }
    let mut best: Option<usize> = None;
    for (i, n) in counts.iter().enumerate() {
        if *n > 0 && best.map_or(true, |b| *n > counts[b]) {
            best = Some(i);
        }
    }
    best.map(|i| weekday_name(WEEKDAYS[i]).to_string())
}

/// Longest run of consecutive calendar days with at least one change.
fn longest_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for date in dates {
        current = match previous.and_then(|p| p.succ_opt()) {
            Some(next) if next == *date => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(*date);
    }
    longest
}

/// Active year with the fewest changes; the earliest wins a tie.
fn least_productive_year(dates: &[NaiveDate]) -> Option<i32> {
    let mut per_year: BTreeMap<i32, u64> = BTreeMap::new();
    for date in dates {
        *per_year.entry(date.year()).or_insert(0) += 1;
    }
    let mut best: Option<(i32, u64)> = None;
    for (year, n) in per_year {
        if best.map_or(true, |(_, b)| n < b) {
            best = Some((year, n));
        }
    }
    best.map(|(year, _)| year)
}

pub fn summarize(changes: &[AttributedChange], top_n: usize) -> Result<AnalyticsSummary> {
    if changes.is_empty() {
        return Err(FleetError::EmptyResultSet);
    }

    let mut messages = OrderedCounter::default();
    let mut teams = OrderedCounter::default();
    for change in changes {
        if !change.normalized_message.is_empty() {
            messages.add(&change.normalized_message);
        }
        teams.add(&team_prefix(&change.message));
    }

    let dates: Vec<NaiveDate> = changes.iter().filter_map(|c| c.date).collect();
    let distinct: BTreeSet<NaiveDate> = dates.iter().copied().collect();

    Ok(AnalyticsSummary {
        total_commits: changes.len() as u64,
        lines_added: changes.iter().map(|c| c.lines_added).sum(),
        lines_deleted: changes.iter().map(|c| c.lines_deleted).sum(),
        most_productive_day: most_productive_day(changes),
        most_used_message: messages.most_common().map(str::to_string),
        longest_streak_days: longest_streak(&distinct),
        least_productive_year: least_productive_year(&dates),
        teams: teams
            .ranked(top_n)
            .into_iter()
            .map(|(id, count)| TeamCount { id, count })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{attribute, testing::*};
    use pretty_assertions::assert_eq;

    fn change(date: &str, message: &str) -> AttributedChange {
        attribute("alpha", &raw("h", date, "Ada", message))
    }

    #[test]
    fn team_prefixes() {
        assert_eq!(team_prefix("PROJ-123: fix bug"), "PROJ");
        assert_eq!(team_prefix("feat: add"), "feat");
        assert_eq!(team_prefix("Merge branch 'x'"), UNKNOWN);
        assert_eq!(team_prefix("feat(ui): add"), UNKNOWN);
    }

    #[test]
    fn summary_counts_and_modes() {
        let mut changes = vec![
            // 2024-01-01 is a Monday
            change("2024-01-01T09:00:00+00:00", "PROJ-1: fix bug"),
            change("2024-01-02T09:00:00+00:00", "fix: fix bug"),
            change("2024-01-03T09:00:00+00:00", "feat: new thing"),
            change("2024-01-08T09:00:00+00:00", "PROJ-2 tidy"),
            change("2023-05-05T09:00:00+00:00", "Tidy"),
            change("garbage", "OPS-3: unknown day"),
        ];
        changes[0].lines_added = 10;
        changes[1].lines_deleted = 4;

        let summary = summarize(&changes, TOP_TEAMS).unwrap();
        assert_eq!(summary.total_commits, 6);
        assert_eq!((summary.lines_added, summary.lines_deleted), (10, 4));
        assert_eq!(summary.most_productive_day.as_deref(), Some("Monday"));
        // "fix bug" and "tidy" both appear twice; "fix bug" was seen first
        assert_eq!(summary.most_used_message.as_deref(), Some("fix bug"));
        assert_eq!(summary.longest_streak_days, 3);
        assert_eq!(summary.least_productive_year, Some(2023));
        assert_eq!(
            summary.teams,
            vec![
                TeamCount { id: "PROJ".into(), count: 2 },
                TeamCount { id: "fix".into(), count: 1 },
                TeamCount { id: "feat".into(), count: 1 },
                TeamCount { id: "Unknown".into(), count: 1 },
                TeamCount { id: "OPS".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn weekday_ties_follow_the_fixed_week_order() {
        let changes = vec![
            // Sunday then Tuesday, one each
            change("2024-01-07T09:00:00+00:00", "a"),
            change("2024-01-09T09:00:00+00:00", "b"),
        ];
        let summary = summarize(&changes, TOP_TEAMS).unwrap();
        assert_eq!(summary.most_productive_day.as_deref(), Some("Tuesday"));
    }

    #[test]
    fn undated_only_input_has_no_modes() {
        let changes = vec![change("???", "")];
        let summary = summarize(&changes, TOP_TEAMS).unwrap();
        assert_eq!(summary.most_productive_day, None);
        assert_eq!(summary.most_used_message, None);
        assert_eq!(summary.longest_streak_days, 0);
        assert_eq!(summary.least_productive_year, None);
    }

    #[test]
    fn teams_are_ranked_and_truncated() {
        let ids = ["AA", "BB", "CC", "DD", "EE", "FF", "GG", "HH"];
        let changes: Vec<_> = ids
            .iter()
            .enumerate()
            .flat_map(|(i, id)| {
                (0..ids.len() - i).map(move |_| change("2024-01-01T09:00:00+00:00", &format!("{id}-1: x")))
            })
            .collect();
        let summary = summarize(&changes, 6).unwrap();
        let ranked: Vec<&str> = summary.teams.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ranked, vec!["AA", "BB", "CC", "DD", "EE", "FF"]);
        assert_eq!(summary.teams[0].count, 8);
    }

    #[test]
    fn empty_input_is_an_empty_result_set() {
        assert!(matches!(summarize(&[], TOP_TEAMS), Err(FleetError::EmptyResultSet)));
    }
}
