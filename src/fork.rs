use crate::cli::CommonArgs;
use crate::config::FleetConfig;
use crate::error::{FleetError, Result};
use crate::git::{ForkOps, GitCli, TempRemote, ANCESTOR_REMOTE};
use crate::model::{ForkBound, ForkResolution, RepoDescriptor};
use crate::util::parse_bound_date;
use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

/// How hard the resolver tries before giving up on a split point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkPolicy {
    /// Ancestor branches tried after the one its HEAD points at.
    pub branches: Vec<String>,
    /// Try every branch fetched from the ancestor once the named ones fail.
    pub lenient_retry: bool,
    /// Fall back to the child's root commit when no split point exists.
    pub root_fallback: bool,
}

impl Default for ForkPolicy {
    fn default() -> Self {
        Self {
            branches: vec!["master".to_string(), "main".to_string()],
            lenient_retry: true,
            root_fallback: true,
        }
    }
}

pub struct ForkResolver<'a> {
    ops: &'a dyn ForkOps,
    policy: ForkPolicy,
}

impl<'a> ForkResolver<'a> {
    pub fn new(ops: &'a dyn ForkOps, policy: ForkPolicy) -> Self {
        Self { ops, policy }
    }

    /// Split point with the ancestor, else the child's root commit, else `NotFound`.
    pub fn resolve(&self, child: &Path, ancestor: &Path) -> Result<ForkResolution> {
        if same_location(child, ancestor) {
            return Ok(ForkResolution::Unbounded);
        }
        if !child.exists() {
            return Err(FleetError::unavailable(child, "path not found"));
        }

        if let Some(resolution) = self.split_point(child, ancestor) {
            return Ok(resolution);
        }
        log::info!(
            "{}",
            FleetError::NoSharedHistory(format!("{} and {}", child.display(), ancestor.display()))
        );

        if self.policy.root_fallback {
            if let Some(resolution) = self.root_commit(child) {
                return Ok(resolution);
            }
        }
        Ok(ForkResolution::NotFound)
    }

    fn split_point(&self, child: &Path, ancestor: &Path) -> Option<ForkResolution> {
        let remote = match TempRemote::acquire(self.ops, child, ANCESTOR_REMOTE, ancestor) {
            Ok(remote) => remote,
            Err(e) => {
                log::warn!("could not link {} to {}: {e}", child.display(), ancestor.display());
                return None;
            }
        };

        let mut tried: Vec<String> = Vec::new();
        let head = match self.ops.head_branch(ancestor) {
            Ok(head) => head,
            Err(e) => {
                log::debug!("cannot read HEAD of {}: {e}", ancestor.display());
                None
            }
        };
        let named = head.into_iter().chain(self.policy.branches.iter().cloned());

        for branch in named {
            if tried.contains(&branch) {
                continue;
            }
            if let Some(found) = self.try_branch(child, &remote, &branch) {
                return Some(found);
            }
            tried.push(branch);
        }

        if self.policy.lenient_retry {
            let fetched = self.ops.remote_branches(child, remote.name()).unwrap_or_default();
            for branch in fetched.iter().filter(|b| !tried.contains(*b)) {
                if let Some(found) = self.try_branch(child, &remote, branch) {
                    return Some(found);
                }
            }
        }
        // dropping `remote` removes the linkage
        None
    }

    fn try_branch(&self, child: &Path, remote: &TempRemote<'_>, branch: &str) -> Option<ForkResolution> {
        let target = remote.branch_ref(branch);
        let commit = match self.ops.merge_base(child, "HEAD", &target) {
            Ok(Some(commit)) => commit,
            Ok(None) => return None,
            Err(e) => {
                log::debug!("merge-base HEAD {target} failed: {e}");
                return None;
            }
        };
        let date = self.commit_day(child, &commit)?;
        log::debug!("{}: split point {commit} on {target}", child.display());
        Some(ForkResolution::SplitPoint { commit, date })
    }

    fn root_commit(&self, child: &Path) -> Option<ForkResolution> {
        let roots = match self.ops.root_commits(child) {
            Ok(roots) => roots,
            Err(e) => {
                log::debug!("no root commit for {}: {e}", child.display());
                return None;
            }
        };
        let commit = roots.into_iter().next()?;
        let date = self.commit_day(child, &commit)?;
        Some(ForkResolution::RootCommit { commit, date })
    }

    fn commit_day(&self, child: &Path, commit: &str) -> Option<chrono::NaiveDate> {
        let raw = match self.ops.commit_date(child, commit) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("cannot read date of {commit}: {e}");
                return None;
            }
        };
        match parse_bound_date(&raw) {
            Ok(date) => Some(date),
            Err(e) => {
                log::warn!("{}: commit {commit} has unusable date: {e}", child.display());
                None
            }
        }
    }
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Resolve a bound for every repository; the mother comes first and is always unbounded.
pub fn resolve_fleet(
    resolver: &ForkResolver<'_>,
    mother: &Path,
    repos: &[RepoDescriptor],
    show_progress: bool,
) -> FleetConfig {
    let mut config = FleetConfig::default();
    config.push(RepoDescriptor::from_path(mother), ForkBound::Unbounded);

    for repo in repos.iter().filter(|r| !same_location(&r.path, mother)) {
        let pb = if show_progress {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Resolving {}", repo.id));

        let (bound, note) = match resolver.resolve(&repo.path, mother) {
            Ok(resolution) => (resolution.bound(), describe(&resolution)),
            Err(e) => {
                log::warn!("{}: {e}", repo.id);
                (ForkBound::Unbounded, format!("unavailable ({e}), scanning full history"))
            }
        };
        pb.finish_with_message(format!("{}: {note}", style(&repo.id).bold()));
        config.push(repo.clone(), bound);
    }
    config
}

fn describe(resolution: &ForkResolution) -> String {
    fn short(commit: &str) -> &str {
        commit.get(..8).unwrap_or(commit)
    }
    match resolution {
        ForkResolution::SplitPoint { commit, date } => format!("split point {date} ({})", short(commit)),
        ForkResolution::RootCommit { commit, date } => {
            format!("no shared history, root commit {date} ({})", short(commit))
        }
        ForkResolution::NotFound => "no shared history found, scanning full history".to_string(),
        ForkResolution::Unbounded => "unbounded".to_string(),
    }
}

pub fn exec(
    common: CommonArgs,
    mother: PathBuf,
    policy: ForkPolicy,
    write: bool,
) -> anyhow::Result<()> {
    let current = FleetConfig::load(&common.config).context("Failed to load repository configuration")?;
    let repos: Vec<RepoDescriptor> = current.repos().cloned().collect();

    let git = GitCli::default();
    let resolver = ForkResolver::new(&git, policy);
    let resolved = resolve_fleet(&resolver, &mother, &repos, !common.quiet);
    resolved.validate().context("Resolved configuration is inconsistent")?;

    println!("{}", resolved.to_json()?);
    if write {
        resolved
            .store(&common.config)
            .with_context(|| format!("Failed to write {}", common.config.display()))?;
        eprintln!("Configuration saved to {}", style(common.config.display()).bold());
    }
    Ok(())
}
