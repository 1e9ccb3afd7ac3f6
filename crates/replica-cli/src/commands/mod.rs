//! Command implementations for the replica CLI
//!
//! Each command lives in its own submodule.

mod analyze;
mod clone;
mod input;
mod prompt;
mod repair;

pub use analyze::execute as analyze;
pub use clone::{CloneArgs, execute as clone_page};
pub use prompt::execute as prompt;
pub use repair::execute as repair;
