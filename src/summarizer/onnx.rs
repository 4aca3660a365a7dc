// ONNX Runtime encoder/decoder summarizer (BART exported with optimum)
use ort::{
    adapter::Adapter,
    inputs,
    session::builder::GraphOptimizationLevel,
    session::{RunOptions, Session},
    value::{Tensor, Value},
};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::tokenizer::SummaryTokenizer;
use super::{Device, GenerationPolicy, Seq2SeqBackend};
use crate::config::ModelConfig;
use crate::types::SummarizationError;

fn load_error(path: &Path, e: impl std::fmt::Display) -> SummarizationError {
    SummarizationError::ModelLoad(format!("{}: {}", path.display(), e))
}

fn runtime_error(e: ort::Error) -> SummarizationError {
    SummarizationError::from_runtime(e.to_string())
}

fn build_session(path: &Path, device: &Device, threads: usize) -> Result<Session, SummarizationError> {
    if !path.exists() {
        return Err(load_error(path, "model file not found"));
    }
    Session::builder()
        .and_then(|b| b.with_execution_providers(device.execution_providers()))
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(threads))
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| load_error(path, e))
}

/// Per-call device scope. Holds the run options (arena shrinkage on the
/// active device, adapter overlay) and every transient tensor of one
/// inference call; dropping it on any exit path hands the device memory back.
struct DeviceWorkspace {
    options: RunOptions,
    /// Encoder output and its mask, built once and borrowed by every
    /// decoder step.
    encoder_states: Option<(Tensor<f32>, Tensor<i64>)>,
    device: Device,
    started: Instant,
}

impl DeviceWorkspace {
    fn acquire(device: Device, adapter: Option<&Adapter>) -> Result<Self, SummarizationError> {
        let mut options = RunOptions::new().map_err(runtime_error)?;
        options
            .add_config_entry("memory.enable_memory_arena_shrinkage", device.arena_spec())
            .map_err(runtime_error)?;
        if let Some(adapter) = adapter {
            options.add_adapter(adapter).map_err(runtime_error)?;
        }
        Ok(Self {
            options,
            encoder_states: None,
            device,
            started: Instant::now(),
        })
    }

    fn keep_encoder_states(
        &mut self,
        hidden_shape: Vec<usize>,
        hidden: Vec<f32>,
        mask_shape: [usize; 2],
        mask: Vec<i64>,
    ) -> Result<(), SummarizationError> {
        let hidden = Tensor::from_array((hidden_shape, hidden.into_boxed_slice())).map_err(runtime_error)?;
        let mask = Tensor::from_array((mask_shape, mask.into_boxed_slice())).map_err(runtime_error)?;
        self.encoder_states = Some((hidden, mask));
        Ok(())
    }

    fn encoder_states(&self) -> Result<(&Tensor<f32>, &Tensor<i64>), SummarizationError> {
        self.encoder_states
            .as_ref()
            .map(|(hidden, mask)| (hidden, mask))
            .ok_or_else(|| SummarizationError::Inference("decoder run before encoder".to_string()))
    }
}

impl Drop for DeviceWorkspace {
    fn drop(&mut self) {
        self.encoder_states = None;
        debug!(
            "Released {} workspace after {:.2}s",
            self.device,
            self.started.elapsed().as_secs_f64()
        );
    }
}

pub struct OnnxSeq2Seq {
    encoder: Session,
    decoder: Session,
    tokenizer: SummaryTokenizer,
    adapter: Option<Adapter>,
    device: Device,
}

impl OnnxSeq2Seq {
    pub fn load(
        config: &ModelConfig,
        device: Device,
        policy: &GenerationPolicy,
    ) -> Result<Self, SummarizationError> {
        info!("🚀 Loading summarization model from {}", config.dir.display());
        ort::init()
            .with_name("legalbrief")
            .commit()
            .map_err(|e| SummarizationError::ModelLoad(e.to_string()))?;

        let encoder_path = config.encoder_path();
        let encoder = build_session(&encoder_path, &device, config.intra_threads)?;
        info!("  ✅ Encoder loaded");

        let decoder_path = config.decoder_path();
        let decoder = build_session(&decoder_path, &device, config.intra_threads)?;
        info!("  ✅ Decoder loaded");

        let adapter = match config.adapter_path() {
            Some(path) if path.exists() => {
                let adapter = Adapter::from_file(&path, None).map_err(|e| load_error(&path, e))?;
                info!("  ✅ Adapter overlay loaded from {}", path.display());
                Some(adapter)
            }
            Some(path) => {
                warn!("  ⚠️ Adapter {} not found, using base model only", path.display());
                None
            }
            None => None,
        };

        let tokenizer = SummaryTokenizer::from_file(&config.tokenizer_path(), policy)?;

        Ok(Self { encoder, decoder, tokenizer, adapter, device })
    }

    fn run_encoder(
        &mut self,
        workspace: &mut DeviceWorkspace,
        input_ids: Vec<i64>,
        attention_mask: Vec<i64>,
        shape: [usize; 2],
    ) -> Result<(), SummarizationError> {
        let ids = Value::from_array((shape, input_ids.into_boxed_slice())).map_err(runtime_error)?;
        let mask = Value::from_array((shape, attention_mask.clone().into_boxed_slice())).map_err(runtime_error)?;

        let (hidden_shape, hidden) = {
            let outputs = self
                .encoder
                .run_with_options(inputs!["input_ids" => ids, "attention_mask" => mask], &workspace.options)
                .map_err(runtime_error)?;
            let (hidden_shape, hidden) = outputs[0].try_extract_tensor::<f32>().map_err(runtime_error)?;
            let hidden_shape: Vec<usize> = hidden_shape.iter().map(|&d| d as usize).collect();
            (hidden_shape, hidden.to_vec())
        };

        debug!("Encoder hidden states {:?}", hidden_shape);
        workspace.keep_encoder_states(hidden_shape, hidden, shape, attention_mask)
    }

    /// Logits of the last position for every row: `batch` slices of `vocab`.
    fn run_decoder_step(
        &mut self,
        workspace: &DeviceWorkspace,
        sequences: &[Vec<u32>],
    ) -> Result<Vec<Vec<f32>>, SummarizationError> {
        let batch = sequences.len();
        let cur_len = sequences[0].len();
        let flat: Vec<i64> = sequences.iter().flatten().map(|&t| t as i64).collect();

        let ids = Value::from_array(([batch, cur_len], flat.into_boxed_slice())).map_err(runtime_error)?;
        let (hidden, mask) = workspace.encoder_states()?;

        let outputs = self
            .decoder
            .run_with_options(
                inputs![
                    "input_ids" => ids,
                    "encoder_attention_mask" => mask,
                    "encoder_hidden_states" => hidden
                ],
                &workspace.options,
            )
            .map_err(runtime_error)?;

        let (logits_shape, logits) = outputs[0].try_extract_tensor::<f32>().map_err(runtime_error)?;
        let seq_len = logits_shape[1] as usize;
        let vocab = logits_shape[2] as usize;

        Ok((0..batch)
            .map(|row| {
                let start = (row * seq_len + seq_len - 1) * vocab;
                logits[start..start + vocab].to_vec()
            })
            .collect())
    }
}

impl Seq2SeqBackend for OnnxSeq2Seq {
    fn generate(
        &mut self,
        batch: &[&str],
        policy: &GenerationPolicy,
    ) -> Result<Vec<String>, SummarizationError> {
        let mut workspace = DeviceWorkspace::acquire(self.device, self.adapter.as_ref())?;

        let encoded = self.tokenizer.encode_batch(batch)?;
        let shape = [encoded.batch, encoded.seq_len];
        self.run_encoder(&mut workspace, encoded.input_ids, encoded.attention_mask, shape)?;

        // Every row advances in lockstep; finished rows keep emitting padding.
        let mut sequences = vec![vec![policy.decoder_start_token_id]; batch.len()];
        let mut finished = vec![false; batch.len()];

        for step in 0..policy.max_length {
            let logits = self.run_decoder_step(&workspace, &sequences)?;

            for (row, row_logits) in logits.iter().enumerate() {
                let next = if finished[row] {
                    policy.pad_token_id
                } else {
                    policy.next_token(&sequences[row], row_logits)
                };
                sequences[row].push(next);
                if !finished[row] && policy.is_finished(&sequences[row]) {
                    finished[row] = true;
                }
            }

            if finished.iter().all(|&f| f) {
                debug!("All {} rows finished at step {}", batch.len(), step);
                break;
            }
        }

        sequences
            .iter()
            .map(|seq| {
                let ids: Vec<u32> = seq
                    .iter()
                    .skip(1)
                    .copied()
                    .take_while(|&t| t != policy.eos_token_id)
                    .filter(|&t| t != policy.pad_token_id && Some(t) != policy.forced_bos_token_id)
                    .collect();
                self.tokenizer.decode_ids(&ids)
            })
            .collect()
    }
}
