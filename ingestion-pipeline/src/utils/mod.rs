pub mod acquisition;
pub mod chunking;
pub mod firecrawl;
pub mod url_text_retrieval;
