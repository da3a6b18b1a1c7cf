pub mod classify;
pub mod cleanup;
pub mod config;
pub mod engines;
pub mod notify;
pub mod pipeline;
pub mod queue;
pub mod server;
pub mod store;
