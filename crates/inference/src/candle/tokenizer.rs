//! Hugging Face 分词器

use super::template::ChatTemplate;
use crate::backend::ChatTokenizer;
use crate::turn::ConversationTurn;
use crate::{InferenceError, Result};
use serde::Deserialize;
use std::path::Path;

/// 常见聊天模板的轮次结束标记
const END_OF_TURN_TOKENS: &[&str] = &[
    "<|im_end|>",
    "<|eot_id|>",
    "<|end|>",
    "<end_of_turn>",
    "<|endoftext|>",
    "<|end_of_text|>",
];

/// 模板中出现的轮次结束标记
pub fn end_of_turn_tokens(template: &str) -> Vec<&'static str> {
    END_OF_TURN_TOKENS
        .iter()
        .copied()
        .filter(|token| template.contains(token))
        .collect()
}

/// `tokenizer_config.json` 中用到的字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizerConfig {
    pub chat_template: Option<String>,
    pub bos_token: Option<String>,
    pub eos_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateField {
    Single(String),
    Named(Vec<NamedTemplate>),
}

#[derive(Deserialize)]
struct NamedTemplate {
    name: String,
    template: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenField {
    Plain(String),
    Added { content: String },
}

impl TokenField {
    fn into_content(self) -> String {
        match self {
            TokenField::Plain(content) | TokenField::Added { content } => content,
        }
    }
}

#[derive(Deserialize, Default)]
struct RawTokenizerConfig {
    #[serde(default)]
    chat_template: Option<TemplateField>,
    #[serde(default)]
    bos_token: Option<TokenField>,
    #[serde(default)]
    eos_token: Option<TokenField>,
}

impl TokenizerConfig {
    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawTokenizerConfig = serde_json::from_str(text)
            .map_err(|e| InferenceError::Tokenizer(format!("tokenizer_config.json 解析失败: {}", e)))?;

        // 多模板时取名为 default 的那个
        let chat_template = raw.chat_template.and_then(|field| match field {
            TemplateField::Single(template) => Some(template),
            TemplateField::Named(templates) => templates
                .into_iter()
                .find(|t| t.name == "default")
                .map(|t| t.template),
        });

        Ok(Self {
            chat_template,
            bos_token: raw.bos_token.map(TokenField::into_content),
            eos_token: raw.eos_token.map(TokenField::into_content),
        })
    }

    /// 从文件读取
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// 基于 `tokenizers` 的分词器
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    template: ChatTemplate,
    eos_token: Option<String>,
}

impl HfTokenizer {
    /// 加载分词器
    ///
    /// 聊天模板优先取 `tokenizer_config.json`，其次取 GGUF 元数据中的模板。
    pub fn load(
        tokenizer_path: &Path,
        config_path: Option<&Path>,
        fallback_template: Option<&str>,
    ) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(tokenizer_path)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;

        let config = match config_path {
            Some(path) => TokenizerConfig::from_file(path)?,
            None => TokenizerConfig::default(),
        };

        let source = config
            .chat_template
            .clone()
            .or_else(|| fallback_template.map(str::to_string))
            .ok_or_else(|| InferenceError::Template("模型没有提供聊天模板".to_string()))?;

        let template = ChatTemplate::new(source)
            .with_bos_token(config.bos_token.clone().unwrap_or_default())
            .with_eos_token(config.eos_token.clone().unwrap_or_default());

        Ok(Self {
            inner,
            template,
            eos_token: config.eos_token,
        })
    }

    /// 停止生成的 token id：EOS 标记 + 模板使用的轮次结束标记
    pub fn stop_token_ids(&self) -> Vec<u32> {
        let mut ids = Vec::new();
        let tokens = self
            .eos_token
            .as_deref()
            .into_iter()
            .chain(end_of_turn_tokens(self.template.source()));

        for token in tokens {
            if let Some(id) = self.inner.token_to_id(token) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

impl ChatTokenizer for HfTokenizer {
    fn apply_chat_template(
        &self,
        turns: &[ConversationTurn],
        add_generation_prompt: bool,
    ) -> Result<String> {
        self.template.render(turns, add_generation_prompt)
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        // 聊天模板已经包含特殊标记
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))
    }
}
