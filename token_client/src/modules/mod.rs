pub mod actor;
pub mod chain;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod protocol;
pub mod rpc;
pub mod session;
pub mod units;
pub mod wallet;
