pub mod memory;
pub mod qdrant;

pub use memory::MemoryStore;
pub use qdrant::QdrantGateway;
