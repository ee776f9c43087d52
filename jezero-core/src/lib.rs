//! Core types and service wiring for the Jezero habitat waste-management system.

/// Material balance: recycling yields and manufacturing feasibility.
pub mod balance;
/// In-process document store with optional snapshot persistence.
pub mod memory;
/// Domain documents and identifiers.
pub mod model;
/// Traits describing the document-store backend.
pub mod ports;
/// Named-operation dispatch over JSON.
pub mod rpc;
/// Bundled fixtures for an empty database.
pub mod seed;
/// High-level service facade used by clients.
pub mod service;
/// Typed access to the habitat collections.
pub mod store;

pub use balance::{Availability, Catalogue, RecycleYield};
pub use memory::MemoryStore;
pub use model::*;
pub use ports::*;
pub use rpc::{Operation, Request, Response, dispatch};
pub use seed::{SeedReport, seed};
pub use service::*;
pub use store::HabitatStore;
