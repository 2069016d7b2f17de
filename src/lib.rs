pub mod app;
pub mod config;
pub mod error;
pub mod lte;
pub mod mobility;
pub mod monitor;
pub mod net;
pub mod proto;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;
