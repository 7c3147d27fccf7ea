//! Kernel module - server infrastructure and dependencies.

pub mod credentials;
pub mod deps;
pub mod evidence_store;
pub mod service;
pub mod test_dependencies;
pub mod traits;
pub mod vertex;

pub use credentials::{
    AccessToken, CachedCredentialProvider, CredentialError, CredentialProvider,
    GcloudCredentialProvider, StaticCredentialProvider,
};
pub use deps::ServerDeps;
pub use evidence_store::{NoopEvidenceStore, PostgresEvidenceStore};
pub use service::{bounded, ServiceFailure, ServiceResult};
pub use test_dependencies::TestDependencies;
pub use traits::*;
pub use vertex::{DistanceMeasure, GeminiAI, VertexEmbeddingService, VertexEvidenceIndex};
