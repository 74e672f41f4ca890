//! 本地推理模块
//!
//! 定义聊天窗口与推理库之间的接口（模型加载、聊天模板、流式生成），
//! 并提供基于 candle 的 GGUF 量化模型实现。

use thiserror::Error;

pub mod backend;
pub mod candle;
pub mod config;
pub mod decoder;
pub mod source;
pub mod turn;

pub use backend::{ChatTokenizer, FragmentStream, LanguageModel, ModelHandle, ModelLoader};
pub use candle::CandleLoader;
pub use config::GenerationConfig;
pub use decoder::TokenDecoder;
pub use source::{ModelFiles, ModelSource};
pub use turn::{ConversationTurn, Role};

/// 推理相关错误
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("无效的模型标识: {0}")]
    InvalidIdentifier(String),

    #[error("找不到文件: {0}")]
    NotFound(String),

    #[error("模型仓库访问失败: {0}")]
    Hub(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("分词器错误: {0}")]
    Tokenizer(String),

    #[error("聊天模板错误: {0}")]
    Template(String),

    #[error("模型运行错误: {0}")]
    Model(String),

    #[error("不支持的模型架构: {0}")]
    UnsupportedArchitecture(String),
}

impl From<candle_core::Error> for InferenceError {
    fn from(err: candle_core::Error) -> Self {
        InferenceError::Model(err.to_string())
    }
}

impl From<hf_hub::api::sync::ApiError> for InferenceError {
    fn from(err: hf_hub::api::sync::ApiError) -> Self {
        InferenceError::Hub(err.to_string())
    }
}

impl From<minijinja::Error> for InferenceError {
    fn from(err: minijinja::Error) -> Self {
        InferenceError::Template(err.to_string())
    }
}

/// 推理结果类型
pub type Result<T> = std::result::Result<T, InferenceError>;
