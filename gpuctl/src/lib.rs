pub mod agent_rpc;
pub mod cli;
pub mod config;
pub mod error;
pub mod render;
pub mod request;
pub mod utils;
