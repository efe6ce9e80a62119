//! ragrank-core
//!
//! Shared domain types, collaborator traits, the error taxonomy and
//! configuration for the hybrid retrieval engine.

pub mod config;
pub mod corpus;
pub mod error;
pub mod settings;
pub mod traits;
pub mod types;

pub use corpus::InMemoryCorpus;
pub use error::{Result, RetrievalError};
pub use settings::{FusionPolicy, FusionStrategy, RetrievalConfig};
pub use types::{Candidate, Chunk, ChunkType, RetrievalMethod, RetrievedChunk, ScoredResult, SearchFilter};
