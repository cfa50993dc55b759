// Source reconciliation commands
pub mod sources;

// Config file commands
pub mod config;
