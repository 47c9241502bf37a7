//! One module per `upass` subcommand.

pub mod audit_cmd;
pub mod completions;
pub mod export;
pub mod get;
pub mod import_cmd;
pub mod init;
pub mod key;
pub mod save;
pub mod serve;
pub mod status;
