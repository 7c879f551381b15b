// src/cli/handlers/mod.rs

pub mod command_list;
pub mod command_new;
pub mod run;
