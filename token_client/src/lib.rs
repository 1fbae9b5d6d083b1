pub mod modules;

pub use modules::{actor, chain, config, error, orchestrator, protocol, rpc, session, units, wallet};
