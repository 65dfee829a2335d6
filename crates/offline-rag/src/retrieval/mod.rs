//! Vector retrieval: index gateway and store implementations

mod gateway;
mod memory;
mod qdrant;

pub use gateway::IndexGateway;
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;
