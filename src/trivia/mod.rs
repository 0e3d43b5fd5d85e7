pub mod analyze;
pub mod exec;
pub mod output;

pub use analyze::{summarize, team_prefix, TOP_TEAMS};
pub use exec::exec;
pub use output::{output_json, output_table, render_snippet, DISPLAY_TEAMS};
