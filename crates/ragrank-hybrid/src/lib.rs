//! ragrank-hybrid
//!
//! The ranking half of the engine: normalization, fusion, the hybrid
//! retriever, cross-encoder reranking, query expansion, diversity-aware
//! selection, and the orchestrator that sequences them per request.

pub mod diversity;
pub mod expansion;
pub mod fusion;
pub mod hybrid;
pub mod local;
pub mod merge;
pub mod normalize;
pub mod orchestrator;
pub mod pipeline;
pub mod rerank;
pub mod session;

pub use diversity::DiversitySelector;
pub use expansion::GenerativeExpander;
pub use fusion::fuse;
pub use hybrid::{HybridRetriever, SourceLists};
pub use local::LocalIndex;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, RetrievalRequest, RetrievalResponse};
pub use pipeline::{PipelineReport, Stage};
pub use rerank::Reranker;
pub use session::{SessionContext, SessionPolicy, SessionStore};
