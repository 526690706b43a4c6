//! Embedding index adapter.
//!
//! [`InMemoryEmbeddingIndex`] implements the
//! [`EmbeddingIndex`](mesh_application::EmbeddingIndex) port with a
//! feature-hashing embedder, over documents loaded from a JSONL corpus.

mod corpus;
mod embedder;
mod memory;

pub use corpus::{CorpusDocument, CorpusError, load_corpus, parse_corpus};
pub use embedder::{DEFAULT_DIMENSIONS, HashingEmbedder, cosine_similarity, tokenize};
pub use memory::{InMemoryEmbeddingIndex, SNIPPET_MAX_LEN};
