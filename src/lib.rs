pub mod cc;
pub mod conn;
pub mod error;
pub mod metrics;
pub mod net;
pub mod proto;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod topo;

pub use error::SimError;

#[cfg(test)]
mod test;
