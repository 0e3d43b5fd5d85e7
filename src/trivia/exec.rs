use crate::cli::CommonArgs;
use crate::config::FleetConfig;
use crate::error::FleetError;
use crate::git::{FieldSpec, GitCli, Scope};
use crate::model::AttributedChange;
use crate::pipeline::{self, RunConfig};
use crate::scan::ContributorPattern;
use super::{output_json, output_table, render_snippet, summarize};
use anyhow::Context;
use console::style;
use std::fs;
use std::path::Path;

pub fn exec(
    common: CommonArgs,
    author: &str,
    scope: Scope,
    json: bool,
    top: usize,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let fleet = FleetConfig::load(&common.config).context("Failed to load repository configuration")?;
    let config = RunConfig {
        fleet,
        pattern: ContributorPattern::new(author).context("Invalid contributor pattern")?,
        scope,
        fields: FieldSpec::WithChurn,
        show_progress: !common.quiet,
    };

    let reports = pipeline::run(&config, &GitCli::default(), |all: &mut Vec<AttributedChange>, c| {
        all.push(c)
    });
    let changes: Vec<AttributedChange> = reports.into_iter().flat_map(|r| r.folded).collect();

    let summary = match summarize(&changes, top) {
        Ok(summary) => summary,
        Err(FleetError::EmptyResultSet) => {
            eprintln!(
                "{}",
                style(format!("No commits found matching '{author}'. Check paths and start dates.")).yellow()
            );
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to summarize attributed changes"),
    };

    if json {
        output_json(&summary)?;
    } else {
        output_table(&summary)?;
    }

    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, render_snippet(&summary))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Front-end constants saved to {}", style(path.display()).bold());
    }

    Ok(())
}
