//! Repository interfaces for the Folio analysis backend.
//!
//! This crate provides:
//! - Async repository traits for jobs, media, projects and portfolios
//! - An in-memory implementation backing tests and embedded deployments
//!
//! The engine only ever sees `Arc<dyn ...Store>`, so the concrete backend
//! (Firestore, Postgres, memory) is swappable without touching the
//! orchestration code.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use traits::{ImageStore, JobStore, PortfolioStore, ProjectStore, VideoStore};

#[cfg(feature = "mocks")]
pub use traits::{
    MockImageStore, MockJobStore, MockPortfolioStore, MockProjectStore, MockVideoStore,
};
