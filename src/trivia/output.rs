use crate::model::AnalyticsSummary;
use crate::util::{format_compact, group_thousands, UNKNOWN};
use console::style;
use std::fmt::Write as _;

/// Prefixes shown in display-ready output.
pub const DISPLAY_TEAMS: usize = 6;

const TEAM_COLORS: [&str; 8] = [
    "#00f2c3", "#00d2ff", "#bdc3c7", "#8e44ad", "#ff4757", "#ffa502", "#E63946", "#A8DADC",
];

fn day_label(summary: &AnalyticsSummary) -> &str {
    summary.most_productive_day.as_deref().unwrap_or(UNKNOWN)
}

fn message_label(summary: &AnalyticsSummary) -> &str {
    summary.most_used_message.as_deref().unwrap_or("none")
}

fn year_label(summary: &AnalyticsSummary) -> String {
    summary
        .least_productive_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub fn output_json(summary: &AnalyticsSummary) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

pub fn output_table(summary: &AnalyticsSummary) -> anyhow::Result<()> {
    println!("{}", style("Contribution Trivia").bold());
    println!("{}", "─".repeat(50));

    println!("Total commits: {}", style(group_thousands(summary.total_commits)).cyan());
    println!("Lines added: {}", style(format_compact(summary.lines_added)).green());
    println!("Lines deleted: {}", style(format_compact(summary.lines_deleted)).red());
    println!("Most productive day: {}", style(day_label(summary)).yellow());
    println!("Most used message: '{}'", style(message_label(summary)).yellow());
    println!("Longest streak: {} days", style(summary.longest_streak_days).yellow());
    println!("Least productive year: {}", style(year_label(summary)).yellow());

    if !summary.teams.is_empty() {
        println!("\n{}", style("Top prefixes").bold());
        for team in summary.teams.iter().take(DISPLAY_TEAMS) {
            println!("  {:<20} {:>8}", team.id, team.count);
        }
    }
    Ok(())
}

/// TypeScript constants consumed by the front end.
pub fn render_snippet(summary: &AnalyticsSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "const STATS = [");
    let _ = writeln!(
        out,
        "    {{ label: \"Total Commits\", value: {} }},",
        js_string(&group_thousands(summary.total_commits))
    );
    let _ = writeln!(
        out,
        "    {{ label: \"Lines Added\", value: {}, color: \"#daf6e6\" }},",
        js_string(&format_compact(summary.lines_added))
    );
    let _ = writeln!(
        out,
        "    {{ label: \"Lines Deleted\", value: {}, color: \"#ffdcd8\" }},",
        js_string(&format_compact(summary.lines_deleted))
    );
    let _ = writeln!(out, "];\n");

    let trivia = [
        ("Most Productive Day", day_label(summary).to_string()),
        ("Most Used Commit Msg", format!("'{}'", message_label(summary))),
        ("Longest Streak", format!("{} Days", summary.longest_streak_days)),
        ("Least Productive Year", year_label(summary)),
    ];
    let _ = writeln!(out, "const TRIVIA = [");
    for (question, answer) in &trivia {
        let _ = writeln!(
            out,
            "    {{ question: {}, answer: {} }},",
            js_string(question),
            js_string(answer)
        );
    }
    let _ = writeln!(out, "];\n");

    let _ = writeln!(out, "// Top {DISPLAY_TEAMS} Teams/Prefixes");
    let _ = writeln!(out, "const TEAM_DATA = [");
    for (i, team) in summary.teams.iter().take(DISPLAY_TEAMS).enumerate() {
        let _ = writeln!(
            out,
            "    {{ id: {}, value: {}, color: \"{}\" }},",
            js_string(&team.id),
            team.count,
            TEAM_COLORS[i % TEAM_COLORS.len()]
        );
    }
    let _ = writeln!(out, "];");
    out
}
