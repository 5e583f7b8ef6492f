pub mod chunk;
pub mod vector_query;
