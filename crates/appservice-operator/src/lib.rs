pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod client;
pub mod k8;
pub mod reconciler;
pub mod controller;
pub mod start;

pub use appservice_metadata as metadata;

const VERSION: &str = env!("CARGO_PKG_VERSION");
