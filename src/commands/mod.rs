//! Command implementations for the CLI

mod init;
mod ingest;
mod query;
mod status;

pub use init::*;
pub use ingest::*;
pub use query::*;
pub use status::*;
