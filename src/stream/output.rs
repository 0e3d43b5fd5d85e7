use crate::error::Result;
use crate::model::MonthlyMatrix;
use console::style;
use std::fs;
use std::path::Path;

pub fn write_json(matrix: &MonthlyMatrix, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(matrix)? + "\n")?;
    Ok(())
}

pub fn output_json(matrix: &MonthlyMatrix) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(matrix)?);
    Ok(())
}

pub fn output_table(matrix: &MonthlyMatrix) -> anyhow::Result<()> {
    println!(
        "{:<32} {:>8} {:>8} {:>8}",
        style("Repository").bold(),
        style("Commits").bold(),
        style("First").bold(),
        style("Last").bold()
    );
    println!("{}", "─".repeat(59));

    for (col, repo) in matrix.repos.iter().enumerate() {
        let active: Vec<(&str, u64)> = matrix
            .rows
            .iter()
            .filter_map(|row| {
                let n = row.counts.get(col).copied().unwrap_or(0);
                (n > 0).then_some((row.month.as_str(), n))
            })
            .collect();
        let total: u64 = active.iter().map(|(_, n)| n).sum();
        let first = active.first().map(|(m, _)| *m).unwrap_or("-");
        let last = active.last().map(|(m, _)| *m).unwrap_or("-");
        let total = if total == 0 {
            style(total.to_string()).dim()
        } else {
            style(total.to_string()).cyan()
        };
        println!("{:<32} {:>8} {:>8} {:>8}", repo, total, first, last);
    }

    if let (Some(first), Some(last)) = (matrix.rows.first(), matrix.rows.last()) {
        println!(
            "\n{} commits across {} months ({} to {})",
            style(matrix.total()).green(),
            matrix.rows.len(),
            style(&first.month).dim(),
            style(&last.month).dim()
        );
    }
    Ok(())
}
