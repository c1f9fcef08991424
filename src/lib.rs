pub mod app;
pub mod cli;
pub mod gcp;
pub mod progress;
pub mod projects;
pub mod report;
pub mod results;
pub mod types;
