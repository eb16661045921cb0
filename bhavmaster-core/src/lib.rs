//! Bhavmaster core — schemas, normalizer, record filters, append-merge
//! engine, and the per-entity master store.
//!
//! This crate is the data-model heart of the pipeline:
//! - Static per-asset-class contracts (columns, types, aliases, key tuples)
//! - One-pass schema normalization with explicit coercion policy
//! - Class-specific record filters with row accounting
//! - The last-write-wins append-merge engine
//! - A flat-CSV per-entity store with load-boundary re-validation
//!
//! Orchestration (file discovery, raw readers, per-class builders, fetching)
//! lives in `bhavmaster-pipeline`.

pub mod error;
pub mod filter;
pub mod merge;
pub mod normalize;
pub mod schema;
pub mod store;

pub use error::EtlError;
pub use merge::merge;
pub use normalize::{coerce_to_contract, normalize, NormalizeReport};
pub use schema::{AssetClass, ClassSpec, ColumnKind, ColumnSpec};
pub use store::MasterStore;
