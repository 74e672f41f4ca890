//! 生成参数配置

/// 默认最大生成 token 数
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// 生成参数
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// 单次回复最多生成的 token 数
    pub max_tokens: usize,

    /// 采样温度（<= 0 时贪心解码）
    pub temperature: f64,

    /// nucleus 采样阈值
    pub top_p: Option<f64>,

    /// 重复惩罚系数（1.0 表示关闭）
    pub repeat_penalty: f32,

    /// 重复惩罚回看的 token 数
    pub repeat_last_n: usize,

    /// 采样随机种子
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.7,
            top_p: Some(0.9),
            repeat_penalty: 1.1,
            repeat_last_n: 64,
            seed: 299_792_458,
        }
    }
}

impl GenerationConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置最大生成 token 数
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// 设置采样温度
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// 设置 top-p
    pub fn with_top_p(mut self, top_p: Option<f64>) -> Self {
        self.top_p = top_p;
        self
    }

    /// 设置重复惩罚
    pub fn with_repeat_penalty(mut self, penalty: f32, last_n: usize) -> Self {
        self.repeat_penalty = penalty;
        self.repeat_last_n = last_n;
        self
    }

    /// 设置随机种子
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
