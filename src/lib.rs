pub mod aggregate;
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod exit;
pub mod filter;
pub mod ingest;
pub mod logging;
pub mod session;
pub mod tui;
pub mod ui;
