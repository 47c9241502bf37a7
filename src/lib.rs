pub mod audit;
pub mod backend;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod dispatch;
pub mod errors;
pub mod lockout;
pub mod vault;
