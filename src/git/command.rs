use crate::error::{FleetError, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run `git -C <repo> <args>` to completion and return trimmed stdout.
pub fn run_git<I, S>(binary: &OsStr, repo: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let rendered = args
        .iter()
        .map(|a| a.as_ref().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    log::debug!("git -C {} {rendered}", repo.display());

    let output = Command::new(binary)
        .arg("-C")
        .arg(repo)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| FleetError::Git(format!("failed to spawn git {rendered}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FleetError::Git(format!(
            "git {rendered} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
