//!
//! Provenance graph store
//!
//! A persistent, typed, directed multigraph database specialized for
//! recording, querying, and access-controlled viewing of data-lineage
//! graphs. A provenance graph records how data artifacts were produced, by
//! whom, from what inputs, through which activities.
#![deny(missing_docs)]

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod factory;
pub mod logging;
pub mod model;
pub mod oid;
pub mod postprocess;
pub mod privilege;
pub mod store;
pub mod traversal;

pub use client::{Client, User};
pub use error::{GraphError, GraphResult};
pub use model::collection::{LineageDAG, ProvenanceCollection};
pub use store::GraphStore;
pub use traversal::TraversalSettings;
