pub mod command;
pub mod oracle;
pub mod remote;
pub mod repo;

pub use oracle::{FieldSpec, GitCli, HistoryOracle, LogQuery, RecordStream, Scope};
pub use remote::{ForkOps, TempRemote, ANCESTOR_REMOTE};
pub use repo::GitRepo;
