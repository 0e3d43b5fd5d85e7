use anyhow::Result;
use gitfleet::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();
    cli.execute()
}
