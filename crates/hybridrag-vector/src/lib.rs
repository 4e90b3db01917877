//! hybridrag-vector
//!
//! [`VectorStore`](hybridrag_core::traits::VectorStore) adapters: an in-memory
//! cosine index and, with the `lance` feature, a LanceDB table.

pub mod memory;
#[cfg(feature = "lance")]
pub mod lance;
#[cfg(feature = "lance")]
pub mod schema;

pub use memory::MemoryVectorStore;
#[cfg(feature = "lance")]
pub use lance::LanceVectorStore;
