//! 事件处理模块
//!
//! 键盘输入、生成线程的片段和模型加载结果都汇入同一个事件通道，
//! 由主循环在 UI 线程上依次处理。

use crate::worker::GenerationId;
use crossterm::event::{KeyEvent, KeyEventKind};
use futures::StreamExt;
use inference::{InferenceError, ModelHandle};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// 应用事件
#[derive(Debug)]
pub enum Event {
    /// 键盘输入事件
    Input(KeyEvent),
    /// 粘贴/输入法输入
    Paste(String),
    /// 终端尺寸变化
    Resize,
    /// 键盘输入流已结束，窗口无法再接收按键
    InputClosed,
    /// 生成线程事件
    Generation(GenerationEvent),
    /// 模型加载完成
    ModelLoaded {
        identifier: String,
        result: Result<ModelHandle, InferenceError>,
    },
    /// 定时刷新事件
    Tick,
}

/// 生成线程发回的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// 新生成的文本片段
    Fragment { id: GenerationId, text: String },
    /// 生成结束（每个生成线程恰好一次）
    Finished { id: GenerationId },
}

/// 事件处理器
pub struct EventHandler {
    /// 事件发送器
    pub tx: mpsc::Sender<Event>,
}

impl EventHandler {
    /// 创建新的事件处理器
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    /// 启动键盘输入监听
    pub async fn run_keyboard_listener(&self) -> AppResult<()> {
        let mut reader = crossterm::event::EventStream::new();

        while let Some(event) = reader.next().await {
            let event = match event {
                // 只处理按键按下事件，忽略重复和释放事件
                Ok(crossterm::event::Event::Key(key_event)) => {
                    if key_event.kind != KeyEventKind::Press {
                        continue;
                    }
                    Event::Input(key_event)
                }
                Ok(crossterm::event::Event::Paste(content)) => Event::Paste(content),
                Ok(crossterm::event::Event::Resize(_, _)) => Event::Resize,
                Ok(_) => continue,
                Err(err) => {
                    tracing::error!("键盘事件错误: {:?}", err);
                    return Err(AppError::Io(err));
                }
            };
            self.tx.send(event).await?;
        }

        Ok(())
    }

    /// 启动定时器
    pub async fn run_ticker(&self, tick_rate: Duration) -> AppResult<()> {
        let mut interval = tokio::time::interval(tick_rate);

        loop {
            interval.tick().await;
            self.tx.send(Event::Tick).await?;
        }
    }
}

/// 应用错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("发送错误: {0}")]
    Send(String),

    #[error("推理错误: {0}")]
    Inference(#[from] InferenceError),
}

impl From<mpsc::error::SendError<Event>> for AppError {
    fn from(err: mpsc::error::SendError<Event>) -> Self {
        AppError::Send(err.to_string())
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;
