//! sockmon - kernel socket statistics collector library.
//!
//! This library provides the core functionality behind `sockmond`:
//! - extracting named counters from `/proc/net/sockstat`
//! - republishing them as charts on a metrics sink
//! - publishing TCP memory thresholds as named host constants

pub mod charts;
pub mod collector;
pub mod config;
pub mod sink;
pub mod util;
