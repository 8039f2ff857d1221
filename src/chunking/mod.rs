//! Token-aware chunking of page text
//!
//! Page content is split on markdown headers (or blank-line paragraphs when
//! a page has none), greedily packed up to a token target and stitched
//! together with a trailing-token overlap.

mod chunker;
mod tokenizer;

pub use chunker::{chunk_text, Chunk, Chunker};
pub use tokenizer::{Cl100kTokenizer, Tokenizer, WordTokenizer};
