use crate::error::Result;
use gix::Repository;
use std::path::Path;

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open the repository rooted exactly at `path` (no upward discovery).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = gix::open(path.as_ref())?;
        Ok(Self { repo })
    }

    /// Short name of the branch HEAD points at, `None` when detached.
    pub fn head_branch(&self) -> Result<Option<String>> {
        let name = self.repo.head_name()?;
        Ok(name.map(|full| full.shorten().to_string()))
    }
}
