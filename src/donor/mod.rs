//! Donor Management DB integration.
//!
//! Mirrors the donor DB's task collection through a read-through cache,
//! translates its status vocabulary into GTD terms, pushes status changes
//! back upstream, and audits the cached view against live state.

pub mod api_types;
pub mod cache;
pub mod client;
pub mod types;

#[cfg(test)]
pub mod testutil;

pub use cache::{DonorCache, UpdateOutcome};
pub use client::{DonorApi, DonorClient, TransportError};
