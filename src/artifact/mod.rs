//! Artifacts: structured, multi-file outputs the agent emits
//!
//! # Architecture
//!
//! ```text
//! raw JSON → builder::build_artifact ─┬─ normalize legacy shape
//!                                     ├─ defaults (version, render)
//!                                     ├─ validator::validate → score
//!                                     └─ id + checksum + status
//!                                              ↓
//!                                   registry::ArtifactRegistry
//! ```

pub mod builder;
pub mod registry;
pub mod schema;
pub mod validator;

pub use builder::{
    apply_patch, build_artifact, Artifact, ArtifactFile, ArtifactStatus, ArtifactSummary,
};
pub use registry::ArtifactRegistry;
pub use validator::{validate, ValidationResult};
