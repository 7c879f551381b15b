// src/core/mod.rs

pub mod action_loader;
pub mod actions;
pub mod commons;
pub mod config_loader;
pub mod context_builder;
pub mod graph_display;
pub mod interpolator;
pub mod json_path;
pub mod paths;
pub mod pipeline;
pub mod populators;
pub mod registrar;
pub mod scanner;
