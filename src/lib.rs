pub mod cli;
pub mod constants;
pub mod core;
pub mod maven;
pub mod models;
pub mod system;
