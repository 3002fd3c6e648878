pub mod agent;
pub mod config;
pub mod errors;
pub mod mcp;
pub mod models;
pub mod providers;
pub mod session_log;
pub mod tools;
