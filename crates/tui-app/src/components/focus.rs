//! 焦点切换
//!
//! 聊天窗口中可获得焦点的控件，按 Tab / Shift+Tab 循环切换。

/// 可获得焦点的控件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFocus {
    ModelSelector, // 预设模型
    ModelInput,    // 自定义模型标识
    Message,       // 消息输入框
}

impl AppFocus {
    pub fn title(&self) -> &str {
        match self {
            AppFocus::ModelSelector => "选择模型",
            AppFocus::ModelInput => "模型标识",
            AppFocus::Message => "消息",
        }
    }

    pub fn all() -> &'static [AppFocus] {
        &[AppFocus::ModelSelector, AppFocus::ModelInput, AppFocus::Message]
    }

    pub fn next(&self) -> Self {
        match self {
            AppFocus::ModelSelector => AppFocus::ModelInput,
            AppFocus::ModelInput => AppFocus::Message,
            AppFocus::Message => AppFocus::ModelSelector,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            AppFocus::ModelSelector => AppFocus::Message,
            AppFocus::ModelInput => AppFocus::ModelSelector,
            AppFocus::Message => AppFocus::ModelInput,
        }
    }

    /// 焦点所在控件是否是文本输入
    pub fn is_text_input(&self) -> bool {
        matches!(self, AppFocus::ModelInput | AppFocus::Message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_and_previous_cycle() {
        for focus in AppFocus::all() {
            assert_eq!(focus.next().previous(), *focus);
        }
        assert_eq!(AppFocus::Message.next(), AppFocus::ModelSelector);
        assert_eq!(AppFocus::ModelSelector.previous(), AppFocus::Message);
    }

    #[test]
    fn test_text_inputs() {
        assert!(!AppFocus::ModelSelector.is_text_input());
        assert!(AppFocus::ModelInput.is_text_input());
        assert!(AppFocus::Message.is_text_input());
    }
}
