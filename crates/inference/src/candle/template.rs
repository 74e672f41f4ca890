//! 聊天模板渲染
//!
//! Hugging Face 的聊天模板是 Jinja 模板，使用 minijinja 渲染，
//! 并通过 pycompat 支持模板里常见的 Python 字符串方法。

use crate::turn::ConversationTurn;
use crate::Result;
use minijinja::{context, Environment, Error, ErrorKind};

/// 聊天模板
#[derive(Debug, Clone)]
pub struct ChatTemplate {
    source: String,
    bos_token: String,
    eos_token: String,
}

impl ChatTemplate {
    /// 创建聊天模板
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            bos_token: String::new(),
            eos_token: String::new(),
        }
    }

    /// 设置 BOS 标记文本
    pub fn with_bos_token(mut self, token: impl Into<String>) -> Self {
        self.bos_token = token.into();
        self
    }

    /// 设置 EOS 标记文本
    pub fn with_eos_token(mut self, token: impl Into<String>) -> Self {
        self.eos_token = token.into();
        self
    }

    /// 模板源码
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 渲染提示词
    pub fn render(&self, turns: &[ConversationTurn], add_generation_prompt: bool) -> Result<String> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_unknown_method_callback(minijinja_contrib::pycompat::unknown_method_callback);
        env.add_function("raise_exception", raise_exception);

        let template = env.template_from_str(&self.source)?;
        let prompt = template.render(context! {
            messages => turns,
            add_generation_prompt => add_generation_prompt,
            bos_token => &self.bos_token,
            eos_token => &self.eos_token,
        })?;

        Ok(prompt)
    }
}

fn raise_exception(message: String) -> std::result::Result<String, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InferenceError;

    const CHATML: &str = "{% for message in messages %}<|im_start|>{{ message.role }}\n{{ message.content }}<|im_end|>\n{% endfor %}{% if add_generation_prompt %}<|im_start|>assistant\n{% endif %}";

    #[test]
    fn test_render_with_generation_prompt() {
        let template = ChatTemplate::new(CHATML);
        let prompt = template
            .render(&[ConversationTurn::user("你好")], true)
            .unwrap();
        assert_eq!(
            prompt,
            "<|im_start|>user\n你好<|im_end|>\n<|im_start|>assistant\n"
        );
    }

    #[test]
    fn test_render_without_generation_prompt() {
        let template = ChatTemplate::new(CHATML);
        let prompt = template
            .render(&[ConversationTurn::user("hi")], false)
            .unwrap();
        assert_eq!(prompt, "<|im_start|>user\nhi<|im_end|>\n");
    }

    #[test]
    fn test_bos_token_and_python_methods() {
        let template = ChatTemplate::new(
            "{{ bos_token }}{% for m in messages %}[{{ m.role }}] {{ m.content.strip() }}{% endfor %}",
        )
        .with_bos_token("<s>");
        let prompt = template
            .render(&[ConversationTurn::user("  spaced  ")], true)
            .unwrap();
        assert_eq!(prompt, "<s>[user] spaced");
    }

    #[test]
    fn test_raise_exception_surfaces_as_template_error() {
        let template = ChatTemplate::new("{{ raise_exception('只支持 user 角色') }}");
        let err = template.render(&[], true).unwrap_err();
        assert!(matches!(err, InferenceError::Template(ref msg) if msg.contains("只支持 user 角色")));
    }
}
