//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! Core pipeline components for answering questions over the indexed
//! textbook.
//!
//! # Module Structure
//!
//! - [`rag::chunker`](crate::rag::chunker) - Boundary-aware text chunking
//! - [`rag::cache`](crate::rag::cache) - Content-addressed embedding cache
//! - [`rag::embedding`](crate::rag::embedding) - Batching, caching, retrying embedding client
//! - [`rag::retriever`](crate::rag::retriever) - Query-side retrieval with relevance filtering
//! - [`rag::generator`](crate::rag::generator) - Grounded prompt assembly and answer generation
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are chunked and embedded
//! 2. **Storage** - Embeddings stored in the in-process vector index
//! 3. **Retrieval** - Query embedded, similar chunks retrieved and filtered
//! 4. **Generation** - Answer generated over the retrieved excerpts, with
//!    citations for exactly the excerpts used

pub mod cache;
pub mod chunker;
pub mod embedding;
pub mod generator;
pub mod retriever;
