#![forbid(unsafe_code)]

//! `gdbridge` lets graph-drawing algorithms be written natively and declared to a table-based
//! layout host.
//!
//! The host-facing value contract lives in [`host`]; everything else is re-exported from
//! `gdbridge-core`. See [`demo`] for the smallest complete algorithm.

pub use gdbridge_core::*;
pub use gdbridge_host as host;

pub mod demo;
