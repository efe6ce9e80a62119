//! ragrank-vector
//!
//! The vector side of retrieval: `VectorRetriever` adapts an external
//! embedding provider plus ANN store to the `Retriever` interface, and
//! `InMemoryVectorStore` is a brute-force cosine store for local use.

pub mod retriever;
pub mod store;

pub use retriever::VectorRetriever;
pub use store::InMemoryVectorStore;
