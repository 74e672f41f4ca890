//! 应用配置

use inference::GenerationConfig;
use std::time::Duration;

/// 覆盖预设模型列表的环境变量（逗号分隔）
pub const PRESETS_ENV: &str = "LOCALCHAT_PRESETS";

/// 默认的预设模型
pub const DEFAULT_PRESETS: &[&str] = &[
    "Qwen/Qwen2.5-0.5B-Instruct-GGUF:qwen2.5-0.5b-instruct-q4_k_m.gguf@Qwen/Qwen2.5-0.5B-Instruct",
    "bartowski/Llama-3.2-1B-Instruct-GGUF:Llama-3.2-1B-Instruct-Q4_K_M.gguf@unsloth/Llama-3.2-1B-Instruct",
];

/// 聊天窗口配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 模型选择框中的预设标识
    pub presets: Vec<String>,

    /// 生成参数
    pub generation: GenerationConfig,

    /// 界面刷新间隔
    pub tick_rate: Duration,

    /// 事件通道容量
    pub event_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            presets: DEFAULT_PRESETS.iter().map(|s| s.to_string()).collect(),
            generation: GenerationConfig::default(),
            tick_rate: Duration::from_millis(250),
            event_capacity: 100,
        }
    }
}

impl AppConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 默认配置 + 环境变量覆盖
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(PRESETS_ENV) {
            Ok(value) => config.with_presets(parse_presets(&value)),
            Err(_) => config,
        }
    }

    /// 设置预设模型
    pub fn with_presets(mut self, presets: Vec<String>) -> Self {
        self.presets = presets;
        self
    }

    /// 设置生成参数
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// 设置刷新间隔
    pub fn with_tick_rate(mut self, tick_rate: Duration) -> Self {
        self.tick_rate = tick_rate;
        self
    }
}

/// 解析逗号分隔的模型标识，忽略空项
pub fn parse_presets(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
