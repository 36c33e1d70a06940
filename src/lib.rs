//! Grounds machine-generated report text in verifiable source material.
//!
//! Pages become content-addressed chunks ([`chunker`]), chunks and their
//! embeddings live in a deduplicating positional store ([`store`]), queries
//! come back relevance/diversity balanced ([`retriever`]), and generated
//! markdown is checked for citation coverage ([`validator`]). Embedding is
//! a seam: callers construct an [`semantic::EmbeddingProvider`] once and
//! pass it by reference.

pub mod chunker;
pub mod corpus;
pub mod error;
pub mod model;
pub mod retriever;
pub mod semantic;
pub mod store;
pub mod validator;

pub use error::{Error, Result};
