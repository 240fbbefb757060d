//! Core types and trait definitions for Trackdéchets activity events.
//!
//! Rebuilds what a bordereau looked like at any past instant by folding its
//! append-only event stream, and freezes the result as a snapshot on
//! revision requests.
//!
//! No database dependencies: storage backends implement the traits in
//! [`store`].

// Store impls are written with native `async fn`.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod backfill;
pub mod bsd;
pub mod error;
pub mod event;
pub mod reducer;
pub mod revision;
pub mod snapshot;
pub mod store;
pub mod workflow;

pub use error::{Error, Result};
