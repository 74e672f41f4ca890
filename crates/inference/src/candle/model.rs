//! GGUF 量化模型
//!
//! 支持 `general.architecture` 为 `llama` 和 `qwen2` 的模型。

use crate::backend::{ChatTokenizer, FragmentStream, LanguageModel};
use crate::config::GenerationConfig;
use crate::decoder::TokenDecoder;
use crate::{InferenceError, Result};
use candle_core::quantized::gguf_file;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::{quantized_llama, quantized_qwen2};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// GGUF 元数据中用到的字段
#[derive(Debug, Clone, Default)]
pub struct GgufMetadata {
    pub architecture: String,
    pub chat_template: Option<String>,
    pub eos_token_id: Option<u32>,
}

impl GgufMetadata {
    fn from_content(content: &gguf_file::Content) -> Self {
        let string = |key: &str| {
            content
                .metadata
                .get(key)
                .and_then(|v| v.to_string().ok())
                .cloned()
        };

        Self {
            architecture: string("general.architecture").unwrap_or_default(),
            chat_template: string("tokenizer.chat_template"),
            eos_token_id: content
                .metadata
                .get("tokenizer.ggml.eos_token_id")
                .and_then(|v| v.to_u32().ok()),
        }
    }
}

/// 各架构的权重
enum Weights {
    Llama(quantized_llama::ModelWeights),
    Qwen2(quantized_qwen2::ModelWeights),
}

impl Weights {
    /// `index_pos` 为 0 时模型会丢弃之前的 KV 缓存
    fn forward(&mut self, input: &Tensor, index_pos: usize) -> candle_core::Result<Tensor> {
        match self {
            Weights::Llama(model) => model.forward(input, index_pos),
            Weights::Qwen2(model) => model.forward(input, index_pos),
        }
    }
}

/// 已加载的 GGUF 模型
///
/// KV 缓存属于权重内部状态，用互斥锁保证同一时刻只有一次生成在使用。
pub struct GgufModel {
    weights: Mutex<Weights>,
    device: Device,
    /// 生成到这些 token 时停止
    stop_tokens: Vec<u32>,
    config: GenerationConfig,
}

impl GgufModel {
    /// 从 GGUF 文件加载
    pub fn load(path: &Path, device: Device, config: GenerationConfig) -> Result<(Self, GgufMetadata)> {
        let mut file = std::fs::File::open(path)?;
        let content = gguf_file::Content::read(&mut file)?;
        let metadata = GgufMetadata::from_content(&content);

        tracing::info!(
            "加载 GGUF 模型: {} (架构: {}, 张量数: {})",
            path.display(),
            metadata.architecture,
            content.tensor_infos.len()
        );

        let weights = match metadata.architecture.as_str() {
            "llama" => Weights::Llama(quantized_llama::ModelWeights::from_gguf(
                content, &mut file, &device,
            )?),
            "qwen2" => Weights::Qwen2(quantized_qwen2::ModelWeights::from_gguf(
                content, &mut file, &device,
            )?),
            other => return Err(InferenceError::UnsupportedArchitecture(other.to_string())),
        };

        let model = Self {
            weights: Mutex::new(weights),
            device,
            stop_tokens: metadata.eos_token_id.into_iter().collect(),
            config,
        };

        Ok((model, metadata))
    }

    /// 追加停止 token（分词器的 EOS、模板的轮次结束标记）
    pub fn with_stop_tokens(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        for id in ids {
            if !self.stop_tokens.contains(&id) {
                self.stop_tokens.push(id);
            }
        }
        self
    }

    fn logits_processor(&self) -> LogitsProcessor {
        let temperature = self.config.temperature;
        let sampling = if temperature <= 0.0 {
            Sampling::ArgMax
        } else {
            match self.config.top_p {
                Some(p) => Sampling::TopP { p, temperature },
                None => Sampling::All { temperature },
            }
        };
        LogitsProcessor::from_sampling(self.config.seed, sampling)
    }
}

impl LanguageModel for GgufModel {
    fn stream_generate<'a>(
        &'a self,
        tokenizer: &'a dyn ChatTokenizer,
        prompt: &str,
        max_tokens: usize,
    ) -> Result<FragmentStream<'a>> {
        let tokens = tokenizer.encode(prompt)?;
        if tokens.is_empty() {
            return Err(InferenceError::Model("提示词为空".to_string()));
        }

        // 上一次生成中途 panic 也不影响：从位置 0 开始会重置缓存
        let weights = self.weights.lock().unwrap_or_else(PoisonError::into_inner);

        tracing::debug!("开始生成: 提示词 {} 个 token，上限 {}", tokens.len(), max_tokens);

        let sampler = GgufSampler {
            weights,
            model: self,
            logits_processor: self.logits_processor(),
        };
        Ok(Box::new(TokenStream::new(
            sampler,
            tokenizer,
            &self.stop_tokens,
            tokens,
            max_tokens,
        )))
    }
}

/// 根据上下文产生下一个 token
trait TokenSampler {
    /// `tokens[pending..]` 是尚未送入模型的部分
    fn next_token(&mut self, tokens: &[u32], pending: usize) -> Result<u32>;
}

/// 持有权重锁的采样器
struct GgufSampler<'a> {
    weights: MutexGuard<'a, Weights>,
    model: &'a GgufModel,
    logits_processor: LogitsProcessor,
}

impl TokenSampler for GgufSampler<'_> {
    fn next_token(&mut self, tokens: &[u32], pending: usize) -> Result<u32> {
        let input = Tensor::new(&tokens[pending..], &self.model.device)?.unsqueeze(0)?;
        let logits = self.weights.forward(&input, pending)?;
        let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;

        let config = &self.model.config;
        let logits = if config.repeat_penalty == 1.0 {
            logits
        } else {
            let start = tokens.len().saturating_sub(config.repeat_last_n);
            candle_transformers::utils::apply_repeat_penalty(
                &logits,
                config.repeat_penalty,
                &tokens[start..],
            )?
        };

        Ok(self.logits_processor.sample(&logits)?)
    }
}

/// 单步生成的结果
enum Step {
    Text(String),
    Pending,
    EndOfText,
}

/// 逐 token 生成的迭代器
///
/// 遇到停止 token 或达到 `max_tokens` 时结束，结束前输出解码器中剩余的文本。
struct TokenStream<'a, S> {
    sampler: S,
    tokenizer: &'a dyn ChatTokenizer,
    stop_tokens: &'a [u32],
    /// 提示词 + 已生成的 token
    tokens: Vec<u32>,
    /// 第一个尚未送入模型的 token 下标
    pending: usize,
    decoder: TokenDecoder,
    generated: usize,
    max_tokens: usize,
    finished: bool,
}

impl<'a, S: TokenSampler> TokenStream<'a, S> {
    fn new(
        sampler: S,
        tokenizer: &'a dyn ChatTokenizer,
        stop_tokens: &'a [u32],
        prompt: Vec<u32>,
        max_tokens: usize,
    ) -> Self {
        Self {
            sampler,
            tokenizer,
            stop_tokens,
            tokens: prompt,
            pending: 0,
            decoder: TokenDecoder::new(),
            generated: 0,
            max_tokens,
            finished: false,
        }
    }

    fn step(&mut self) -> Result<Step> {
        let next = self.sampler.next_token(&self.tokens, self.pending)?;
        self.pending = self.tokens.len();
        self.tokens.push(next);
        self.generated += 1;

        if self.stop_tokens.contains(&next) {
            return Ok(Step::EndOfText);
        }

        Ok(match self.decoder.push(self.tokenizer, next)? {
            Some(text) => Step::Text(text),
            None => Step::Pending,
        })
    }

    fn finish(&mut self) -> Option<Result<String>> {
        self.finished = true;
        tracing::debug!("生成结束: 共 {} 个 token", self.generated);
        self.decoder.flush(self.tokenizer).transpose()
    }
}

impl<S: TokenSampler> Iterator for TokenStream<'_, S> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if self.generated >= self.max_tokens {
                return self.finish();
            }

            match self.step() {
                Ok(Step::Text(text)) => return Some(Ok(text)),
                Ok(Step::Pending) => continue,
                Ok(Step::EndOfText) => return self.finish(),
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::ConversationTurn;

    /// 每个 token id 就是一个字符
    struct CharTokenizer;

    impl ChatTokenizer for CharTokenizer {
        fn apply_chat_template(&self, _turns: &[ConversationTurn], _add: bool) -> Result<String> {
            Ok(String::new())
        }

        fn encode(&self, text: &str) -> Result<Vec<u32>> {
            Ok(text.chars().map(u32::from).collect())
        }

        fn decode(&self, ids: &[u32]) -> Result<String> {
            Ok(ids.iter().filter_map(|id| char::from_u32(*id)).collect())
        }
    }

    /// 按顺序返回预设 token，并记录每次看到的未处理区间
    struct ScriptedSampler {
        script: Vec<Result<u32>>,
        seen: Vec<(usize, usize)>,
    }

    impl ScriptedSampler {
        fn new(text: &str) -> Self {
            Self {
                script: text.chars().map(|c| Ok(u32::from(c))).collect(),
                seen: Vec::new(),
            }
        }
    }

    impl TokenSampler for &mut ScriptedSampler {
        fn next_token(&mut self, tokens: &[u32], pending: usize) -> Result<u32> {
            self.seen.push((pending, tokens.len()));
            if self.script.is_empty() {
                return Err(InferenceError::Model("脚本已用完".to_string()));
            }
            self.script.remove(0)
        }
    }

    const STOP: u32 = '#' as u32;
    const EOT: u32 = '$' as u32;

    fn collect<S: TokenSampler>(stream: TokenStream<'_, S>) -> Vec<Result<String>> {
        stream.collect()
    }

    #[test]
    fn test_stops_on_any_stop_token() {
        let stops = [STOP, EOT];
        for script in ["ab#cd", "ab$cd"] {
            let mut sampler = ScriptedSampler::new(script);
            let stream = TokenStream::new(&mut sampler, &CharTokenizer, &stops, vec![1, 2], 512);
            let text: String = collect(stream).into_iter().map(|r| r.unwrap()).collect();
            assert_eq!(text, "ab");
        }
    }

    #[test]
    fn test_token_cap_ends_stream() {
        let mut sampler = ScriptedSampler::new("abcdef");
        let stream = TokenStream::new(&mut sampler, &CharTokenizer, &[STOP], vec![1], 3);
        let text: String = collect(stream).into_iter().map(|r| r.unwrap()).collect();

        assert_eq!(text, "abc");
        assert_eq!(sampler.script.len(), 3);
    }

    #[test]
    fn test_prompt_is_fed_once_then_one_token_at_a_time() {
        let mut sampler = ScriptedSampler::new("xy#");
        let stream = TokenStream::new(&mut sampler, &CharTokenizer, &[STOP], vec![1, 2, 3], 512);
        collect(stream);

        assert_eq!(sampler.seen, vec![(0, 3), (3, 4), (4, 5)]);
    }

    #[test]
    fn test_sampling_error_ends_stream_after_error() {
        let mut sampler = ScriptedSampler::new("ab");
        let mut stream = TokenStream::new(&mut sampler, &CharTokenizer, &[STOP], vec![1], 512);

        assert_eq!(stream.next().unwrap().unwrap(), "a");
        assert_eq!(stream.next().unwrap().unwrap(), "b");
        assert!(matches!(stream.next(), Some(Err(InferenceError::Model(_)))));
        assert!(stream.next().is_none());
    }
}
