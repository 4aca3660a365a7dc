// Summarizer tokenizer: BART BPE via the tokenizers crate
use std::path::Path;
use tokenizers::tokenizer::Tokenizer;
use tracing::info;

use super::GenerationPolicy;
use crate::types::SummarizationError;

/// Token ids for a batch, right-padded to the longest row.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub batch: usize,
    pub seq_len: usize,
}

impl EncodedBatch {
    /// Pad rows with `pad_id`, truncating any row beyond `max_len` and
    /// keeping its final (end-of-sequence) token in place.
    pub fn from_rows(rows: Vec<Vec<u32>>, pad_id: u32, max_len: usize) -> Self {
        let rows: Vec<Vec<u32>> = rows
            .into_iter()
            .map(|mut ids| {
                if ids.len() > max_len && max_len > 0 {
                    let last = ids[ids.len() - 1];
                    ids.truncate(max_len);
                    ids[max_len - 1] = last;
                }
                ids
            })
            .collect();

        let batch = rows.len();
        let seq_len = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let mut input_ids = Vec::with_capacity(batch * seq_len);
        let mut attention_mask = Vec::with_capacity(batch * seq_len);

        for ids in &rows {
            for pos in 0..seq_len {
                match ids.get(pos) {
                    Some(&id) => {
                        input_ids.push(id as i64);
                        attention_mask.push(1);
                    }
                    None => {
                        input_ids.push(pad_id as i64);
                        attention_mask.push(0);
                    }
                }
            }
        }

        Self { input_ids, attention_mask, batch, seq_len }
    }
}

pub struct SummaryTokenizer {
    tokenizer: Tokenizer,
    pad_token_id: u32,
    max_input_tokens: usize,
}

impl SummaryTokenizer {
    pub fn from_file(path: &Path, policy: &GenerationPolicy) -> Result<Self, SummarizationError> {
        info!("📚 Loading tokenizer from {}", path.display());
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| SummarizationError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        info!("✅ Tokenizer loaded ({} tokens)", tokenizer.get_vocab_size(true));

        Ok(Self {
            tokenizer,
            pad_token_id: policy.pad_token_id,
            max_input_tokens: policy.max_input_tokens,
        })
    }

    pub fn encode_batch(&self, texts: &[&str]) -> Result<EncodedBatch, SummarizationError> {
        let mut rows = Vec::with_capacity(texts.len());
        for text in texts {
            let encoding = self
                .tokenizer
                .encode(*text, true)
                .map_err(|e| SummarizationError::Tokenizer(e.to_string()))?;
            rows.push(encoding.get_ids().to_vec());
        }
        Ok(EncodedBatch::from_rows(rows, self.pad_token_id, self.max_input_tokens))
    }

    pub fn decode_ids(&self, token_ids: &[u32]) -> Result<String, SummarizationError> {
        self.tokenizer
            .decode(token_ids, true)
            .map(|s| s.trim().to_string())
            .map_err(|e| SummarizationError::Tokenizer(e.to_string()))
    }
}
