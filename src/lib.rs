//! localchat
//!
//! 终端中的本地大模型聊天窗口。界面在 `tui_app`，推理在 `inference`。

pub mod logging;

pub use inference;
pub use tui_app;
