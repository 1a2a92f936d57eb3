pub mod compare;
pub mod config;
pub mod error;
pub mod loader;
pub mod network;
pub mod output;
pub mod pipeline;
pub mod region;
pub mod summary;
