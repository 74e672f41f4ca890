//! TUI 应用模块
//!
//! 基于 Ratatui 的终端界面：Hello World 窗口和本地模型聊天窗口。

pub mod app;
pub mod components;
pub mod config;
pub mod event;
pub mod hello;
pub mod state;
pub mod terminal;
pub mod ui;
pub mod worker;

#[cfg(test)]
mod testing;

pub use app::ChatApp;
pub use config::AppConfig;
pub use event::{AppError, AppResult, Event, EventHandler, GenerationEvent};
pub use state::{ChatState, UserAction};
pub use worker::{GenerationId, GenerationWorker, WorkerState};

/// 运行聊天窗口的便捷函数
pub use app::run_chat;

/// 显示 Hello World 窗口的便捷函数
pub use hello::run_hello;
