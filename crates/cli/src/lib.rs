#![deny(missing_docs)]
//! Wiring for the `hornet` binary.

mod analyze;
pub use analyze::*;

mod json_dir;
pub use json_dir::*;

mod guard;
pub use guard::*;
