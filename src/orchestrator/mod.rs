//! Application-level orchestration utilities.
//!
//! This module owns the session lifecycle (submit/run/complete/restore) and post-run
//! processing such as saving the last result and exports. CLI layers call into this
//! module to keep responsibilities separated.

mod controller;
mod post_process;

pub use controller::SessionController;
pub use post_process::PostRunOptions;
