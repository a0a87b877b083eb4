mod connection;
mod rpc;
mod stream;

#[cfg(test)]
pub mod fake;

pub use connection::*;
pub use rpc::*;
pub use stream::*;
