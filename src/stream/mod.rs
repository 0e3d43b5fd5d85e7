pub mod aggregate;
pub mod exec;
pub mod output;

pub use aggregate::{aggregate, count_month, MonthCounts};
pub use exec::exec;
pub use output::{output_table, write_json};
