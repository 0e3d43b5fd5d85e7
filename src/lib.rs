pub mod cli;
pub mod config;
pub mod error;
pub mod fork;
pub mod git;
pub mod model;
pub mod pipeline;
pub mod scan;
pub mod stream;
pub mod trivia;
pub mod util;
