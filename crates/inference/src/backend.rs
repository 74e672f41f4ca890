//! 推理接口
//!
//! 聊天窗口只通过这里的 trait 使用推理库：加载模型、套用聊天模板、流式生成。
//! 具体实现见 [`crate::candle`]，测试中可替换为脚本化的假实现。

use crate::turn::ConversationTurn;
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// 流式生成返回的片段序列
///
/// 惰性、有限、不可重启；任意一项都可能是错误。
pub type FragmentStream<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

/// 分词器（含聊天模板）
pub trait ChatTokenizer: Send + Sync {
    /// 按聊天模板把多轮对话格式化为提示词
    ///
    /// `add_generation_prompt` 为 true 时在末尾追加模型回复的起始标记。
    fn apply_chat_template(
        &self,
        turns: &[ConversationTurn],
        add_generation_prompt: bool,
    ) -> Result<String>;

    /// 文本编码为 token id
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// token id 解码为文本
    fn decode(&self, ids: &[u32]) -> Result<String>;
}

/// 语言模型
pub trait LanguageModel: Send + Sync {
    /// 流式生成，最多产生 `max_tokens` 个 token
    fn stream_generate<'a>(
        &'a self,
        tokenizer: &'a dyn ChatTokenizer,
        prompt: &str,
        max_tokens: usize,
    ) -> Result<FragmentStream<'a>>;
}

/// 模型加载器
pub trait ModelLoader: Send + Sync {
    /// 根据标识加载模型与分词器
    fn load(&self, identifier: &str) -> Result<ModelHandle>;
}

/// 已加载的模型句柄（模型 + 分词器）
///
/// 克隆只复制 `Arc`，生成线程持有自己的副本。
#[derive(Clone)]
pub struct ModelHandle {
    identifier: String,
    model: Arc<dyn LanguageModel>,
    tokenizer: Arc<dyn ChatTokenizer>,
}

impl ModelHandle {
    /// 创建模型句柄
    pub fn new(
        identifier: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        tokenizer: Arc<dyn ChatTokenizer>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            model,
            tokenizer,
        }
    }

    /// 加载时使用的标识
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn tokenizer(&self) -> &dyn ChatTokenizer {
        self.tokenizer.as_ref()
    }

    /// 套用聊天模板
    pub fn apply_chat_template(
        &self,
        turns: &[ConversationTurn],
        add_generation_prompt: bool,
    ) -> Result<String> {
        self.tokenizer.apply_chat_template(turns, add_generation_prompt)
    }

    /// 使用本句柄的模型和分词器流式生成
    pub fn stream_generate(&self, prompt: &str, max_tokens: usize) -> Result<FragmentStream<'_>> {
        self.model
            .stream_generate(self.tokenizer.as_ref(), prompt, max_tokens)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}
