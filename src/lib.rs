pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod output;
pub mod ranking;
pub mod releases;
pub mod scout;
pub mod server;
pub mod upstream;
pub mod version;
