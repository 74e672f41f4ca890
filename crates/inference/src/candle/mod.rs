//! candle 推理实现
//!
//! - [`model`] - GGUF 量化模型与逐 token 生成
//! - [`tokenizer`] - Hugging Face 分词器与 `tokenizer_config.json`
//! - [`template`] - 聊天模板渲染

pub mod model;
pub mod template;
pub mod tokenizer;

pub use model::{GgufMetadata, GgufModel};
pub use template::ChatTemplate;
pub use tokenizer::{HfTokenizer, TokenizerConfig};

use crate::backend::{ModelHandle, ModelLoader};
use crate::config::GenerationConfig;
use crate::source::ModelSource;
use crate::Result;
use candle_core::Device;
use std::sync::Arc;

/// 选择计算设备：CUDA、Metal 可用时优先，否则使用 CPU
pub fn select_device() -> Device {
    if candle_core::utils::cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => return device,
            Err(err) => tracing::warn!("CUDA 设备初始化失败，回退: {}", err),
        }
    }

    if candle_core::utils::metal_is_available() {
        match Device::new_metal(0) {
            Ok(device) => return device,
            Err(err) => tracing::warn!("Metal 设备初始化失败，回退: {}", err),
        }
    }

    Device::Cpu
}

/// 基于 candle 的模型加载器
#[derive(Debug, Clone, Default)]
pub struct CandleLoader {
    config: GenerationConfig,
}

impl CandleLoader {
    /// 创建加载器
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }
}

impl ModelLoader for CandleLoader {
    fn load(&self, identifier: &str) -> Result<ModelHandle> {
        let source = ModelSource::parse(identifier)?;
        let files = source.resolve()?;
        tracing::debug!("模型文件: {:?}", files);

        let device = select_device();
        tracing::info!("使用设备: {:?}", device);

        let (model, metadata) = GgufModel::load(&files.weights, device, self.config.clone())?;
        let tokenizer = HfTokenizer::load(
            &files.tokenizer,
            files.tokenizer_config.as_deref(),
            metadata.chat_template.as_deref(),
        )?;
        let model = model.with_stop_tokens(tokenizer.stop_token_ids());

        Ok(ModelHandle::new(
            identifier.trim(),
            Arc::new(model),
            Arc::new(tokenizer),
        ))
    }
}
