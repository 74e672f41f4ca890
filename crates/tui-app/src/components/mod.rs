//! UI 组件模块
//!
//! 包含聊天窗口使用的各个组件。

pub mod chat_log;
pub mod dialog;
pub mod focus;
pub mod input;
pub mod model_selector;

pub use chat_log::{ChatLog, ChatLogView, LogEntry};
pub use dialog::{Dialog, DialogLevel, DialogView};
pub use focus::AppFocus;
pub use input::{InputBox, TextInput};
pub use model_selector::{ModelSelector, ModelSelectorState};
