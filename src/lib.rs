pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod http;
pub mod identifier;
pub mod logging;
pub mod mapping;
pub mod pipeline;
pub mod sanitize;
pub mod tracker;
pub mod types;
pub mod venue;
