use crate::LeadError;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Token accounting used for chunk boundaries
///
/// Chunk boundaries depend on the tokenizer, so every implementation carries
/// a stable `id` that is recorded alongside embedded chunks.
pub trait Tokenizer: Send + Sync {
    /// Pinned identifier of the tokenization scheme
    fn id(&self) -> &str;

    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;

    /// Decoded text of the last `n` tokens of `text`
    fn tail(&self, text: &str, n: usize) -> String;
}

/// OpenAI `cl100k_base` byte-pair encoding, shared by GPT-4 and the
/// `text-embedding-3` models
#[derive(Clone)]
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    pub const ID: &'static str = "cl100k_base";

    pub fn new() -> Result<Self, LeadError> {
        let bpe = cl100k_base().map_err(|e| LeadError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn id(&self) -> &str {
        Self::ID
    }

    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn tail(&self, text: &str, n: usize) -> String {
        if n == 0 {
            return String::new();
        }
        let tokens = self.bpe.encode_ordinary(text);
        let mut start = tokens.len().saturating_sub(n);

        // A cut inside a multi-byte character does not decode; move past it
        while start < tokens.len() {
            if let Ok(decoded) = self.bpe.decode(tokens[start..].to_vec()) {
                return decoded;
            }
            start += 1;
        }
        String::new()
    }
}

/// Whitespace-delimited word tokenizer
///
/// Counts are easy to reason about, which makes it handy for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    pub const ID: &'static str = "word-v1";
}

impl Tokenizer for WordTokenizer {
    fn id(&self) -> &str {
        Self::ID
    }

    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn tail(&self, text: &str, n: usize) -> String {
        if n == 0 {
            return String::new();
        }
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= n {
            return words.join(" ");
        }
        words[words.len() - n..].join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_ignores_whitespace_runs() {
        assert_eq!(WordTokenizer.count("a  b\n\nc\t d"), 4);
        assert_eq!(WordTokenizer.count("   "), 0);
    }

    #[test]
    fn test_tail() {
        assert_eq!(WordTokenizer.tail("one two three four", 2), "three four");
        assert_eq!(WordTokenizer.tail("one two", 5), "one two");
        assert_eq!(WordTokenizer.tail("one two", 0), "");
    }

    #[test]
    fn test_id_is_pinned() {
        assert_eq!(WordTokenizer.id(), "word-v1");
        assert_eq!(Cl100kTokenizer::new().unwrap().id(), "cl100k_base");
    }

    #[test]
    fn test_cl100k_counts_model_tokens() {
        let tokenizer = Cl100kTokenizer::new().unwrap();
        assert_eq!(tokenizer.count("hello world"), 2);
        assert_eq!(tokenizer.count(""), 0);

        // Digits and punctuation split into more tokens than words
        let listing = "SKU-48213/XL, 12.5mm, $1,299.00";
        assert!(tokenizer.count(listing) > WordTokenizer.count(listing));
    }

    #[test]
    fn test_cl100k_tail() {
        let tokenizer = Cl100kTokenizer::new().unwrap();
        assert_eq!(tokenizer.tail("hello world", 1), " world");
        assert_eq!(tokenizer.tail("hello world", 10), "hello world");
        assert_eq!(tokenizer.tail("hello world", 0), "");
    }
}
