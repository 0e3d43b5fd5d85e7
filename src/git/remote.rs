use crate::error::{FleetError, Result};
use crate::git::command::run_git;
use crate::git::oracle::GitCli;
use crate::git::repo::GitRepo;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Name of the remote temporarily linking a child to its ancestor.
pub const ANCESTOR_REMOTE: &str = "gitfleet-ancestor";

/// Repository operations the fork-point resolver needs.
pub trait ForkOps {
    fn add_remote(&self, repo: &Path, name: &str, url: &Path) -> Result<()>;
    fn remove_remote(&self, repo: &Path, name: &str) -> Result<()>;
    fn fetch_remote(&self, repo: &Path, name: &str) -> Result<()>;
    /// Branch the repository's HEAD points at, if any.
    fn head_branch(&self, repo: &Path) -> Result<Option<String>>;
    /// Branch names fetched from `remote`, without the remote prefix.
    fn remote_branches(&self, repo: &Path, remote: &str) -> Result<Vec<String>>;
    fn merge_base(&self, repo: &Path, left: &str, right: &str) -> Result<Option<String>>;
    /// Author date of `rev` in strict ISO 8601.
    fn commit_date(&self, repo: &Path, rev: &str) -> Result<String>;
    fn root_commits(&self, repo: &Path) -> Result<Vec<String>>;
}

/// A remote that exists for as long as the guard lives.
pub struct TempRemote<'a> {
    ops: &'a dyn ForkOps,
    repo: PathBuf,
    name: String,
}

impl<'a> TempRemote<'a> {
    /// Add `name -> url` to `repo` and fetch it. A stale remote of the same name is replaced.
    pub fn acquire(ops: &'a dyn ForkOps, repo: &Path, name: &str, url: &Path) -> Result<Self> {
        if ops.remove_remote(repo, name).is_ok() {
            log::debug!("removed stale remote {name} from {}", repo.display());
        }
        ops.add_remote(repo, name, url)?;

        // from here on the guard owns the remote, so an early fetch failure still cleans up
        let guard = Self {
            ops,
            repo: repo.to_path_buf(),
            name: name.to_string(),
        };
        ops.fetch_remote(repo, name)?;
        Ok(guard)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ref naming `branch` as seen through this remote.
    pub fn branch_ref(&self, branch: &str) -> String {
        format!("{}/{}", self.name, branch)
    }
}

impl Drop for TempRemote<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.ops.remove_remote(&self.repo, &self.name) {
            log::warn!(
                "failed to remove temporary remote {} from {}: {e}",
                self.name,
                self.repo.display()
            );
        }
    }
}

impl ForkOps for GitCli {
    fn add_remote(&self, repo: &Path, name: &str, url: &Path) -> Result<()> {
        run_git(self.binary(), repo, [OsStr::new("remote"), OsStr::new("add"), OsStr::new(name), url.as_os_str()])?;
        Ok(())
    }

    fn remove_remote(&self, repo: &Path, name: &str) -> Result<()> {
        run_git(self.binary(), repo, ["remote", "remove", name])?;
        Ok(())
    }

    fn fetch_remote(&self, repo: &Path, name: &str) -> Result<()> {
        run_git(self.binary(), repo, ["fetch", "--quiet", "--no-tags", name])?;
        Ok(())
    }

    fn head_branch(&self, repo: &Path) -> Result<Option<String>> {
        GitRepo::open(repo)?.head_branch()
    }

    fn remote_branches(&self, repo: &Path, remote: &str) -> Result<Vec<String>> {
        let prefix = format!("refs/remotes/{remote}/");
        let out = run_git(
            self.binary(),
            repo,
            ["for-each-ref", "--format=%(refname)", prefix.as_str()],
        )?;
        Ok(out
            .lines()
            .filter_map(|l| l.trim().strip_prefix(prefix.as_str()))
            .filter(|b| *b != "HEAD")
            .map(str::to_string)
            .collect())
    }

    fn merge_base(&self, repo: &Path, left: &str, right: &str) -> Result<Option<String>> {
        match run_git(self.binary(), repo, ["merge-base", left, right]) {
            Ok(hash) if !hash.is_empty() => Ok(Some(hash)),
            Ok(_) => Ok(None),
            // exit status 1 with no output: unrelated histories or unknown ref
            Err(FleetError::Git(reason)) => {
                log::debug!("merge-base {left} {right} in {}: {reason}", repo.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn commit_date(&self, repo: &Path, rev: &str) -> Result<String> {
        run_git(self.binary(), repo, ["show", "-s", "--format=%aI", rev])
    }

    fn root_commits(&self, repo: &Path) -> Result<Vec<String>> {
        let out = run_git(self.binary(), repo, ["rev-list", "--max-parents=0", "HEAD"])?;
        Ok(out.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
    }
}
