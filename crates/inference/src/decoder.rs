//! 增量解码
//!
//! 逐 token 解码时，单个 token 可能只包含多字节字符的一部分，
//! 或者前导空格要结合上一个 token 才能正确还原。这里保留一个小窗口，
//! 只有当新增文本完整时才输出。

use crate::backend::ChatTokenizer;
use crate::Result;

/// 增量解码器
#[derive(Debug, Default)]
pub struct TokenDecoder {
    tokens: Vec<u32>,
    prev_index: usize,
    current_index: usize,
}

impl TokenDecoder {
    /// 创建新的解码器
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个 token，返回新产生的完整文本（如果有）
    pub fn push(&mut self, tokenizer: &dyn ChatTokenizer, token: u32) -> Result<Option<String>> {
        let prev_text = self.pending_prefix(tokenizer)?;
        self.tokens.push(token);
        let text = tokenizer.decode(&self.tokens[self.prev_index..])?;

        // 末尾是替换字符说明多字节字符还不完整，等下一个 token
        if text.len() <= prev_text.len() || text.ends_with('\u{FFFD}') {
            return Ok(None);
        }

        match text.get(prev_text.len()..) {
            Some(fragment) => {
                let fragment = fragment.to_string();
                self.prev_index = self.current_index;
                self.current_index = self.tokens.len();
                Ok(Some(fragment))
            }
            None => Ok(None),
        }
    }

    /// 输出窗口内剩余的文本
    pub fn flush(&mut self, tokenizer: &dyn ChatTokenizer) -> Result<Option<String>> {
        let prev_text = self.pending_prefix(tokenizer)?;
        let text = tokenizer.decode(&self.tokens[self.prev_index..])?;
        self.prev_index = self.tokens.len();
        self.current_index = self.tokens.len();

        if text.len() > prev_text.len() {
            Ok(text.get(prev_text.len()..).map(str::to_string))
        } else {
            Ok(None)
        }
    }

    fn pending_prefix(&self, tokenizer: &dyn ChatTokenizer) -> Result<String> {
        if self.prev_index == self.current_index {
            Ok(String::new())
        } else {
            tokenizer.decode(&self.tokens[self.prev_index..self.current_index])
        }
    }
}
