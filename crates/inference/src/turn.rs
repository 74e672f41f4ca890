//! 对话轮次

use serde::Serialize;

/// 发言角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// 聊天模板中写作 `assistant`
    #[serde(rename = "assistant")]
    Model,
}

/// 一轮对话：角色 + 文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    #[serde(rename = "content")]
    pub text: String,
}

impl ConversationTurn {
    /// 创建用户轮次
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// 创建模型轮次
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serializes_as_template_message() {
        let value = serde_json::to_value(ConversationTurn::user("你好")).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "你好");

        let value = serde_json::to_value(ConversationTurn::model("hi")).unwrap();
        assert_eq!(value["role"], "assistant");
    }
}
