pub mod config;
pub mod engine;
pub mod fetch;
pub mod format;
pub mod geo;
pub mod lines;
pub mod monitor;
pub mod relay;
pub mod session;
pub mod stations;
pub mod store;
