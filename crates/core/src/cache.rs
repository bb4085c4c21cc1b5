//! The persistent cache underneath every expensive deterministic lookup.
//!
//! - [LogFile] is a durable single-file key/value log.
//! - [PersistentLru] bounds any [Backend] by recency and implements the
//!   [hornet_api::Store] contract on top of it.
//! - [Cached] wraps a pure function so that its results are memoized in a
//!   store, optionally behind a small in-memory [lru::LruCache].
//!
//! Values are stored as zlib-compressed JSON ([serial]).

mod backend;
pub use backend::*;

mod log_file;
pub use log_file::*;

mod persistent_lru;
pub use persistent_lru::*;

mod cached;
pub use cached::*;

pub mod serial;
