//! Retrieval index for Codewright.
//!
//! A per-repository store of file descriptions and their embeddings, kept in
//! a JSON-lines cache under the configured cache directory. Tools query it
//! to find the files relevant to a question.

pub mod backend;
pub mod cache;
pub mod index;
pub mod lock;
pub mod vector;
pub mod walker;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use backend::{ModelDescriber, ModelEmbedder};
pub use index::{BuildReport, RetrievalIndex};
pub use vector::cosine_similarity;
pub use walker::WalkOptions;
