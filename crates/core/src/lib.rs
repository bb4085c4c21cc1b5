#![deny(missing_docs)]
//! Hornet measures how much a destination-side observer learns about a
//! vantage point whose upstream AS changes.
//!
//! Given periodic traceroute-derived AS paths for a population of probes,
//! it locates the narrowest window in which one probe's observed upstream
//! AS changed ([boundary_search]), compares observations under an
//! ambiguity-tolerant equality ([asn]), and measures the set of other
//! probes, prefixes and ASes indistinguishable from the changing probe
//! before and after the change ([Hornet]).
//!
//! Expensive lookups go through a durable, recency-bounded cache
//! ([cache]).

pub mod address;
pub mod asn;
pub mod boundary_search;
pub mod cache;
pub mod normalize;
pub mod resolve;

mod config;
pub use config::*;

mod source;
pub use source::*;

mod hornet;
pub use hornet::*;

mod anonymity;
pub use anonymity::*;

mod score;
pub use score::*;

mod report;
pub use report::*;

mod analysis;

mod sample;

mod summary;
pub use summary::*;
