use crate::chunking::tokenizer::{Cl100kTokenizer, Tokenizer};
use crate::config::ChunkingConfig;
use crate::state::{content_hash, CrawledPage};
use crate::LeadError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A token-bounded slice of one stored page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub domain: String,
    pub source_url: String,
    pub title: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub depth: u32,
    pub content_hash: String,
    pub token_count: usize,
}

/// Chunker bound to a tokenizer and its size parameters
#[derive(Clone)]
pub struct Chunker {
    tokenizer: Arc<dyn Tokenizer>,
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, config: ChunkingConfig) -> Self {
        Self { tokenizer, config }
    }

    /// Chunker counting `cl100k_base` model tokens
    pub fn cl100k(config: ChunkingConfig) -> Result<Self, LeadError> {
        Ok(Self::new(Arc::new(Cl100kTokenizer::new()?), config))
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Splits raw text into chunk strings
    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.tokenizer.as_ref(), &self.config)
    }

    /// Chunks a stored page into records with ids `<domain>_page_<key>_chunk_<j>`
    ///
    /// `key` is the page's content-hash prefix, so ids do not move when other
    /// pages of the domain are added later.
    pub fn chunk_page(&self, page: &CrawledPage) -> Vec<Chunk> {
        let pieces = self.chunk(&page.content);
        let total = pieces.len();
        let key = page.content_hash.get(..16).unwrap_or(&page.content_hash);

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                chunk_id: format!("{}_page_{}_chunk_{}", page.domain, key, chunk_index),
                domain: page.domain.clone(),
                source_url: page.url.clone(),
                title: page.title.clone(),
                content_hash: content_hash(&content),
                token_count: self.tokenizer.count(&content),
                content,
                chunk_index,
                total_chunks: total,
                depth: page.depth,
            })
            .collect()
    }
}

/// Splits text into overlapping, token-bounded chunks
///
/// Sections come from markdown header lines; a text without headers is split
/// on blank-line paragraphs instead. Sections are packed greedily up to
/// `target_tokens`. Each new chunk starts with the trailing `overlap_tokens`
/// of the previous one, shrunk when needed so the chunk stays within the
/// target. Sections larger than the target are packed sentence by sentence.
/// Chunks under `min_tokens` are dropped.
///
/// Only a single sentence longer than the target can produce an oversized chunk.
pub fn chunk_text(text: &str, tokenizer: &dyn Tokenizer, config: &ChunkingConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut packer = Packer::new(tokenizer, config);
    for section in split_sections(text) {
        if tokenizer.count(&section) > config.target_tokens {
            for sentence in split_sentences(&section) {
                packer.push(sentence);
            }
        } else {
            packer.push(section);
        }
    }

    packer
        .finish()
        .into_iter()
        .filter(|chunk| tokenizer.count(chunk) >= config.min_tokens)
        .collect()
}

/// Header sections, or paragraphs when there is at most one section
fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if line.trim_start().starts_with('#') && !current.is_empty() {
            sections.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }
    if !current.is_empty() {
        sections.push(current.join("\n"));
    }

    if sections.len() <= 1 {
        return text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
    }

    sections
}

fn split_sentences(section: &str) -> Vec<String> {
    section
        .replace(". ", ".\n")
        .split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

struct Packer<'a> {
    tokenizer: &'a dyn Tokenizer,
    target: usize,
    overlap: usize,
    current: Vec<String>,
    chunks: Vec<String>,
}

impl<'a> Packer<'a> {
    fn new(tokenizer: &'a dyn Tokenizer, config: &ChunkingConfig) -> Self {
        Self {
            tokenizer,
            target: config.target_tokens,
            overlap: config.overlap_tokens,
            current: Vec::new(),
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, piece: String) {
        if self.current.is_empty() {
            self.current.push(piece);
            return;
        }

        let mut candidate = self.current.join("\n");
        candidate.push('\n');
        candidate.push_str(&piece);

        if self.tokenizer.count(&candidate) <= self.target {
            self.current.push(piece);
            return;
        }

        let closed = self.current.join("\n");
        let piece_tokens = self.tokenizer.count(&piece);
        let mut budget = self.overlap.min(self.target.saturating_sub(piece_tokens));
        let mut seed = self.tokenizer.tail(&closed, budget);

        // BPE merges across the joint can push the seeded chunk past the target
        while budget > 0 && self.tokenizer.count(&format!("{}\n{}", seed, piece)) > self.target {
            budget -= 1;
            seed = self.tokenizer.tail(&closed, budget);
        }

        self.chunks.push(closed);
        self.current.clear();
        if !seed.is_empty() {
            self.current.push(seed);
        }
        self.current.push(piece);
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() {
            self.chunks.push(self.current.join("\n"));
        }
        self.chunks
    }
}
