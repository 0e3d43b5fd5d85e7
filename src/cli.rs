use crate::config::DEFAULT_CONFIG_PATH;
use crate::fork::ForkPolicy;
use crate::git::Scope;
use crate::trivia::TOP_TEAMS;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitfleet")]
#[command(about = "Attribute a contributor's commits across a fleet of forked git repositories")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH, help = "Repository configuration (path -> start date or null)")]
    pub config: PathBuf,

    #[arg(short, long, global = true, conflicts_with = "quiet", help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Only log warnings and hide progress")]
    pub quiet: bool,
}

#[derive(Args, Clone)]
pub struct ScanArgs {
    #[arg(short, long, help = "Case-insensitive regex matched against identities and messages")]
    pub author: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the fork point of every configured repository against the mother repository
    Forks {
        #[arg(long, help = "Path to the mother repository")]
        mother: PathBuf,

        #[arg(long = "branch", default_values = ["master", "main"], help = "Fallback mother branch names, in order")]
        branches: Vec<String>,

        #[arg(long, help = "Only try the named branches, not every fetched one")]
        strict: bool,

        #[arg(long, help = "Do not fall back to the root commit date")]
        no_root_fallback: bool,

        #[arg(long, help = "Write the resolved configuration back to --config")]
        write: bool,
    },
    /// Build the repository x month matrix for the streamgraph
    Stream {
        #[clap(flatten)]
        scan: ScanArgs,

        #[arg(long, value_enum, default_value_t = Scope::All, help = "Refs to traverse")]
        scope: Scope,

        #[arg(long, default_value = "streamgraph_data.json", help = "Output file")]
        output: PathBuf,

        #[arg(long, help = "Print the matrix to stdout instead of writing a file")]
        stdout: bool,
    },
    /// Summarize productivity trivia over all attributed commits
    Trivia {
        #[clap(flatten)]
        scan: ScanArgs,

        #[arg(long, value_enum, default_value_t = Scope::Head, help = "Refs to traverse")]
        scope: Scope,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, default_value_t = TOP_TEAMS, help = "Prefixes kept in the summary")]
        top: usize,

        #[arg(long, help = "Also write the front-end constants to this file")]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn init_logging(&self) {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        if self.common.quiet {
            builder.filter_level(log::LevelFilter::Warn);
        } else if self.common.verbose {
            builder.filter_level(log::LevelFilter::Debug);
        }
        builder.target(env_logger::Target::Stderr).init();
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Forks { mother, branches, strict, no_root_fallback, write } => {
                let policy = ForkPolicy {
                    branches,
                    lenient_retry: !strict,
                    root_fallback: !no_root_fallback,
                };
                crate::fork::exec(self.common, mother, policy, write)
            }
            Commands::Stream { scan, scope, output, stdout } => {
                crate::stream::exec(self.common, &scan.author, scope, &output, stdout)
            }
            Commands::Trivia { scan, scope, json, top, output } => {
                crate::trivia::exec(self.common, &scan.author, scope, json, top, output.as_deref())
            }
        }
    }
}
