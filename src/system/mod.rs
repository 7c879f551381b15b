//! # System Interaction Layer
//!
//! Abstractions over the operating system and the user's terminal. This is the
//! boundary between the pipeline logic and process management, persistent files
//! and interactive input.
//!
//! ## Modules
//!
//! - **`executor`**: spawns external processes with a deadline, capturing or
//!   redirecting their output (`cmd.exe` fallback on Windows).
//! - **`prompt`**: the `Prompter` seam used by `vars` questions, backed by dialoguer
//!   on a terminal and by scripted answers in tests.
//! - **`var_store`**: the YAML-backed role variable store.

pub mod executor;
pub mod prompt;
pub mod var_store;
