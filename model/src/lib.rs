#[macro_use]
mod common;
mod readings;

pub mod event;
pub mod gpu;
pub mod gpu_watch;
pub mod topo;
pub mod trace;

pub use common::*;
pub use readings::*;
