use crate::cli::CommonArgs;
use crate::config::FleetConfig;
use crate::error::FleetError;
use crate::git::{FieldSpec, GitCli, Scope};
use crate::pipeline::{self, RunConfig};
use crate::scan::ContributorPattern;
use super::{aggregate, count_month, output_table, write_json, MonthCounts};
use anyhow::Context;
use console::style;
use std::path::Path;

pub fn exec(common: CommonArgs, author: &str, scope: Scope, output: &Path, to_stdout: bool) -> anyhow::Result<()> {
    let fleet = FleetConfig::load(&common.config).context("Failed to load repository configuration")?;
    let config = RunConfig {
        fleet,
        pattern: ContributorPattern::new(author).context("Invalid contributor pattern")?,
        scope,
        fields: FieldSpec::Identity,
        show_progress: !common.quiet,
    };

    let reports = pipeline::run(&config, &GitCli::default(), count_month);
    let per_repo: Vec<(String, MonthCounts)> = reports
        .into_iter()
        .map(|report| (report.repo.id, report.folded))
        .collect();

    let matrix = match aggregate(&per_repo) {
        Ok(matrix) => matrix,
        Err(FleetError::EmptyResultSet) => {
            eprintln!(
                "{}",
                style(format!("No commits found matching '{author}'; nothing written.")).yellow()
            );
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to aggregate monthly counts"),
    };

    if to_stdout {
        super::output::output_json(&matrix)?;
    } else {
        write_json(&matrix, output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        output_table(&matrix)?;
        println!("\nData saved to {}", style(output.display()).bold());
    }

    Ok(())
}
