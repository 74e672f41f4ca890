//! 测试用的脚本化模型与分词器

use inference::{
    ChatTokenizer, ConversationTurn, FragmentStream, InferenceError, LanguageModel, ModelHandle,
    Result, Role,
};
use std::sync::{Arc, Mutex};

/// 一次流式生成调用
#[derive(Debug, Clone)]
pub struct Call {
    pub prompt: String,
    pub max_tokens: usize,
}

/// 预设的生成脚本
#[derive(Clone, Default)]
pub struct Script {
    fragments: Vec<String>,
    fail_at: Option<usize>,
    fail_on_start: bool,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Script {
    pub fn fragments(items: &[&str]) -> Self {
        Self {
            fragments: items.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// 第 `index` 个片段处失败
    pub fn fail_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// 启动生成时就失败
    pub fn fail_on_start(mut self) -> Self {
        self.fail_on_start = true;
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        self.calls.clone()
    }
}

struct ScriptedModel {
    script: Script,
}

impl LanguageModel for ScriptedModel {
    fn stream_generate<'a>(
        &'a self,
        _tokenizer: &'a dyn ChatTokenizer,
        prompt: &str,
        max_tokens: usize,
    ) -> Result<FragmentStream<'a>> {
        self.script.calls.lock().unwrap().push(Call {
            prompt: prompt.to_string(),
            max_tokens,
        });

        if self.script.fail_on_start {
            return Err(InferenceError::Model("启动失败".to_string()));
        }

        let fail_at = self.script.fail_at;
        Ok(Box::new(
            self.script
                .fragments
                .iter()
                .enumerate()
                .map(move |(index, fragment)| {
                    if Some(index) == fail_at {
                        Err(InferenceError::Model("中途失败".to_string()))
                    } else {
                        Ok(fragment.clone())
                    }
                }),
        ))
    }
}

/// 用尖括号标记角色的分词器
struct TagTokenizer;

impl ChatTokenizer for TagTokenizer {
    fn apply_chat_template(
        &self,
        turns: &[ConversationTurn],
        add_generation_prompt: bool,
    ) -> Result<String> {
        let mut prompt: String = turns
            .iter()
            .map(|turn| {
                let tag = match turn.role {
                    Role::User => "user",
                    Role::Model => "assistant",
                };
                format!("<{tag}>{}</{tag}>", turn.text)
            })
            .collect();
        if add_generation_prompt {
            prompt.push_str("<assistant>");
        }
        Ok(prompt)
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.chars().map(u32::from).collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        Ok(ids.iter().filter_map(|id| char::from_u32(*id)).collect())
    }
}

/// 按脚本生成的模型句柄
pub fn scripted_handle(script: Script) -> ModelHandle {
    ModelHandle::new("scripted/model", Arc::new(ScriptedModel { script }), Arc::new(TagTokenizer))
}
