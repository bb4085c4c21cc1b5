#![deny(missing_docs)]
//! Hornet API contains the collaborator traits and the basic types shared
//! by the AS-path change analysis.
//!
//! The analysis itself lives in the hornet_core crate. This crate only
//! defines what a snapshot of probe paths looks like, how instants are
//! snapped onto a measurement grid, and the seams through which the core
//! reaches its durable cache and its source of traceroute-derived paths.

mod error;
pub use error::*;

mod timestamp;
pub use timestamp::*;

pub mod path;
pub use path::*;

pub mod boundary;
pub use boundary::*;

pub mod store;
pub use store::*;

pub mod source;
pub use source::*;
