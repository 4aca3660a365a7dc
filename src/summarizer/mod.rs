// Abstractive summarization engine shared by every request
pub mod device;
pub mod onnx;
pub mod tokenizer;

use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config::{AppConfig, GenerationConfig};
use crate::types::SummarizationError;

pub use device::{probe_device, Device};
pub use onnx::OnnxSeq2Seq;

/// Deterministic decoding settings. There is no sampling knob: the same
/// chunk always yields the same summary.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub no_repeat_ngram_size: usize,
    pub max_input_tokens: usize,
    pub decoder_start_token_id: u32,
    pub forced_bos_token_id: Option<u32>,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
}

impl From<&GenerationConfig> for GenerationPolicy {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            min_length: config.min_length,
            max_length: config.max_length.max(config.min_length + 1),
            no_repeat_ngram_size: config.no_repeat_ngram_size,
            max_input_tokens: config.max_input_tokens,
            decoder_start_token_id: config.decoder_start_token_id,
            forced_bos_token_id: config.forced_bos_token_id,
            eos_token_id: config.eos_token_id,
            pad_token_id: config.pad_token_id,
        }
    }
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl GenerationPolicy {
    /// Greedy choice of the next token for one sequence.
    ///
    /// `sequence` starts with the decoder start token. End-of-sequence is
    /// suppressed until `min_length` tokens exist, and any token that would
    /// repeat an n-gram already in the sequence is banned.
    pub fn next_token(&self, sequence: &[u32], logits: &[f32]) -> u32 {
        let generated = sequence.len().saturating_sub(1);
        if generated == 0 {
            if let Some(bos) = self.forced_bos_token_id {
                return bos;
            }
        }

        let mut banned = self.banned_ngram_tokens(sequence);
        if generated < self.min_length {
            banned.push(self.eos_token_id);
        }

        let mut best: Option<(usize, f32)> = None;
        for (idx, &score) in logits.iter().enumerate() {
            if score.is_nan() || banned.contains(&(idx as u32)) {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, _)| idx as u32).unwrap_or(self.eos_token_id)
    }

    fn banned_ngram_tokens(&self, sequence: &[u32]) -> Vec<u32> {
        let n = self.no_repeat_ngram_size;
        if n == 0 || sequence.len() + 1 < n {
            return Vec::new();
        }
        let prefix = &sequence[sequence.len() + 1 - n..];
        sequence
            .windows(n)
            .filter(|w| &w[..n - 1] == prefix)
            .map(|w| w[n - 1])
            .collect()
    }

    /// True once a sequence has ended or hit the length budget.
    pub fn is_finished(&self, sequence: &[u32]) -> bool {
        let generated = sequence.len().saturating_sub(1);
        generated >= self.max_length
            || (generated > 0 && sequence.last() == Some(&self.eos_token_id))
    }
}

/// A sequence-to-sequence model that can summarize a batch of texts.
pub trait Seq2SeqBackend: Send {
    /// One summary per input, in input order.
    fn generate(
        &mut self,
        batch: &[&str],
        policy: &GenerationPolicy,
    ) -> Result<Vec<String>, SummarizationError>;
}

/// Process-wide summarizer. Built once at startup and shared by reference;
/// the backend sits behind a mutex so only one inference call touches the
/// accelerator at a time.
pub struct SummarizationEngine {
    backend: Mutex<Box<dyn Seq2SeqBackend>>,
    device: Device,
    policy: GenerationPolicy,
}

impl SummarizationEngine {
    pub fn new(backend: Box<dyn Seq2SeqBackend>, device: Device, policy: GenerationPolicy) -> Self {
        Self {
            backend: Mutex::new(backend),
            device,
            policy,
        }
    }

    /// Probe the device and load the ONNX model, adapter and tokenizer.
    pub fn load(config: &AppConfig) -> Result<Self, SummarizationError> {
        let device = probe_device(config.model.device, config.model.cuda_device_id);
        let policy = GenerationPolicy::from(&config.generation);
        let backend = OnnxSeq2Seq::load(&config.model, device, &policy)?;
        Ok(Self::new(Box::new(backend), device, policy))
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn policy(&self) -> &GenerationPolicy {
        &self.policy
    }

    /// Summaries index-aligned with `chunks`. No chunks, no inference.
    pub fn summarize(&self, chunks: &[&str]) -> Result<Vec<String>, SummarizationError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let batch_size = self.device.batch_size();
        let mut summaries = Vec::with_capacity(chunks.len());

        // Backends keep no per-call state, so a poisoned lock is still usable.
        let mut backend = self.backend.lock().unwrap_or_else(PoisonError::into_inner);

        for (idx, batch) in chunks.chunks(batch_size).enumerate() {
            debug!("Summarizing batch {} ({} chunks)", idx, batch.len());
            let out = backend.generate(batch, &self.policy).map_err(|e| {
                error!("Summarization failed on batch {}: {}", idx, e);
                e
            })?;
            if out.len() != batch.len() {
                return Err(SummarizationError::Misaligned {
                    expected: batch.len(),
                    got: out.len(),
                });
            }
            summaries.extend(out);
        }

        info!(
            "Summarized {} chunks on {} in {:.2}s",
            chunks.len(),
            self.device,
            start.elapsed().as_secs_f64()
        );
        Ok(summaries)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Deterministic stand-in for the model: echoes a fingerprint of each chunk.
    pub(crate) struct EchoBackend {
        pub calls: Arc<AtomicUsize>,
        pub largest_batch: Arc<AtomicUsize>,
    }

    impl Seq2SeqBackend for EchoBackend {
        fn generate(
            &mut self,
            batch: &[&str],
            _policy: &GenerationPolicy,
        ) -> Result<Vec<String>, SummarizationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.largest_batch.fetch_max(batch.len(), Ordering::SeqCst);
            Ok(batch
                .iter()
                .map(|c| format!("summary of {} chars", c.chars().count()))
                .collect())
        }
    }

    struct FailingBackend;

    impl Seq2SeqBackend for FailingBackend {
        fn generate(
            &mut self,
            _batch: &[&str],
            _policy: &GenerationPolicy,
        ) -> Result<Vec<String>, SummarizationError> {
            Err(SummarizationError::from_runtime("CUDA error: out of memory"))
        }
    }

    struct ShortBackend;

    impl Seq2SeqBackend for ShortBackend {
        fn generate(
            &mut self,
            _batch: &[&str],
            _policy: &GenerationPolicy,
        ) -> Result<Vec<String>, SummarizationError> {
            Ok(vec![])
        }
    }

    fn echo_engine(device: Device) -> (SummarizationEngine, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let largest = Arc::new(AtomicUsize::new(0));
        let backend = EchoBackend {
            calls: calls.clone(),
            largest_batch: largest.clone(),
        };
        let engine = SummarizationEngine::new(Box::new(backend), device, GenerationPolicy::default());
        (engine, calls, largest)
    }

    #[test]
    fn test_empty_chunks_skip_backend() {
        let (engine, calls, _) = echo_engine(Device::Cpu);
        assert!(engine.summarize(&[]).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_batches_follow_device() {
        let chunks = ["a", "bb", "ccc", "dddd", "eeeee"];

        let (engine, calls, largest) = echo_engine(Device::Cpu);
        let out = engine.summarize(&chunks).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(largest.load(Ordering::SeqCst), 1);

        let (engine, calls, largest) = echo_engine(Device::Cuda { device_id: 0 });
        let out = engine.summarize(&chunks).unwrap();
        assert_eq!(out[2], "summary of 3 chars");
        assert_eq!(out[4], "summary of 5 chars");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(largest.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_repeat_runs_identical() {
        let (engine, _, _) = echo_engine(Device::Cpu);
        let chunks = ["The lessee shall pay rent.", "Whereas the lessor agrees."];
        assert_eq!(engine.summarize(&chunks).unwrap(), engine.summarize(&chunks).unwrap());
    }

    #[test]
    fn test_backend_errors_propagate() {
        let engine = SummarizationEngine::new(Box::new(FailingBackend), Device::Cpu, GenerationPolicy::default());
        let err = engine.summarize(&["text"]).unwrap_err();
        assert!(matches!(err, SummarizationError::OutOfMemory(_)));
        // The engine stays usable after a failure.
        assert!(engine.summarize(&[]).is_ok());
    }

    #[test]
    fn test_misaligned_output_rejected() {
        let engine = SummarizationEngine::new(Box::new(ShortBackend), Device::Cpu, GenerationPolicy::default());
        let err = engine.summarize(&["one"]).unwrap_err();
        assert!(matches!(err, SummarizationError::Misaligned { expected: 1, got: 0 }));
    }

    #[test]
    fn test_forced_bos_then_greedy() {
        let policy = GenerationPolicy {
            min_length: 0,
            ..GenerationPolicy::default()
        };
        let logits = [0.1, 0.0, 0.2, 0.9, 0.3];
        assert_eq!(policy.next_token(&[2], &logits), 0);
        assert_eq!(policy.next_token(&[2, 0], &logits), 3);
    }

    #[test]
    fn test_eos_suppressed_below_min_length() {
        let policy = GenerationPolicy {
            min_length: 3,
            no_repeat_ngram_size: 0,
            forced_bos_token_id: None,
            ..GenerationPolicy::default()
        };
        let logits = [0.0, 0.0, 5.0, 1.0];
        assert_eq!(policy.next_token(&[2, 3], &logits), 3);
        assert_eq!(policy.next_token(&[2, 3, 3, 3], &logits), 2);
    }

    #[test]
    fn test_repeated_trigram_banned() {
        let policy = GenerationPolicy {
            min_length: 0,
            forced_bos_token_id: None,
            ..GenerationPolicy::default()
        };
        // "7 8 9 ... 7 8" must not continue with 9 again.
        let sequence = [2, 7, 8, 9, 5, 7, 8];
        let mut logits = vec![0.0; 10];
        logits[9] = 4.0;
        logits[6] = 3.0;
        assert_eq!(policy.next_token(&sequence, &logits), 6);
    }

    #[test]
    fn test_finish_conditions() {
        let policy = GenerationPolicy {
            max_length: 3,
            ..GenerationPolicy::default()
        };
        assert!(!policy.is_finished(&[2]));
        assert!(policy.is_finished(&[2, 0, 2]));
        assert!(policy.is_finished(&[2, 0, 5, 6]));
        assert!(!policy.is_finished(&[2, 0, 5]));
    }
}
