pub mod api;
pub mod config;
pub mod humanize;
pub mod library;
pub mod observability;
pub mod presets;
pub mod queue;
pub mod status;
pub mod tools;
pub mod worker;
