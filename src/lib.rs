pub mod agents;
pub mod buffer;
pub mod config;
pub mod env;
pub mod recorder;
pub mod runner;
pub mod scenario;
pub mod scoring;
pub mod sim;
pub mod utils;

#[cfg(test)]
pub mod testing;
