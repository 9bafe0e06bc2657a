//! Model routing for Turnpike.
//!
//! Vendor wire protocols are supplied by collaborators as
//! `turnpike_core::Provider` implementations; this crate decides which one
//! serves a given model spec.

pub mod router;
pub mod table;

pub use router::{ProviderRouter, ProviderRouterBuilder, ResolvedModel};
pub use table::{Route, RouteEntry, RoutingTable, classify};
