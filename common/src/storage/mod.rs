pub mod db;
pub mod indexes;
pub mod pinecone;
pub mod types;
pub mod vector_index;
