//! TUI 应用主逻辑
//!
//! 管理主事件循环：绘制界面，把键盘输入、模型加载结果和生成片段
//! 依次应用到窗口状态上。

use crate::config::AppConfig;
use crate::event::{AppResult, Event, EventHandler};
use crate::state::{ChatState, UserAction};
use crate::terminal::{init_terminal, restore_terminal, AppTerminal};
use inference::{CandleLoader, InferenceError, ModelLoader};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;

/// 聊天应用
pub struct ChatApp {
    /// 窗口状态
    state: ChatState,
    /// 模型加载器
    loader: Arc<dyn ModelLoader>,
    /// 应用配置
    config: AppConfig,
    /// 运行状态
    running: bool,
}

impl ChatApp {
    /// 使用默认的 candle 加载器创建应用
    pub fn new(config: AppConfig) -> Self {
        let loader = Arc::new(CandleLoader::new(config.generation.clone()));
        Self::with_loader(config, loader)
    }

    /// 使用指定的加载器创建应用
    pub fn with_loader(config: AppConfig, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            state: ChatState::new(&config),
            loader,
            config,
            running: true,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// 运行应用
    pub async fn run(&mut self) -> AppResult<()> {
        let mut terminal = init_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(&mut self, terminal: &mut AppTerminal) -> AppResult<()> {
        // 创建事件通道
        let (event_tx, mut event_rx) = mpsc::channel(self.config.event_capacity);

        // 启动键盘监听
        let handler = EventHandler::new(event_tx.clone());
        tokio::spawn(async move {
            if let Err(err) = handler.run_keyboard_listener().await {
                tracing::error!("键盘监听退出: {}", err);
            }
            let _ = handler.tx.send(Event::InputClosed).await;
        });

        // 启动定时器
        let handler = EventHandler::new(event_tx.clone());
        let tick_rate = self.config.tick_rate;
        tokio::spawn(async move {
            let _ = handler.run_ticker(tick_rate).await;
        });

        tracing::info!("聊天窗口已启动");

        // 主事件循环
        while self.running {
            terminal.draw(|f| crate::ui::draw_ui(f, &self.state))?;

            match event_rx.recv().await {
                Some(event) => self.handle_event(event, &event_tx),
                None => break,
            }
        }

        tracing::info!("聊天窗口已关闭");
        Ok(())
    }

    /// 处理单个事件
    pub fn handle_event(&mut self, event: Event, events: &mpsc::Sender<Event>) {
        match event {
            Event::Input(key_event) => match self.state.handle_key(key_event) {
                UserAction::Quit => self.running = false,
                UserAction::LoadModel => self.load_model(events),
                UserAction::SendMessage => {
                    self.state.submit_message(events);
                }
                UserAction::None => {}
            },
            Event::Paste(content) => self.state.handle_paste(&content),
            Event::Generation(event) => self.state.on_generation_event(event),
            Event::ModelLoaded { identifier, result } => {
                self.state.finish_load(identifier, result)
            }
            Event::InputClosed => {
                tracing::warn!("键盘输入已结束，关闭窗口");
                self.running = false;
            }
            Event::Resize | Event::Tick => {}
        }
    }

    /// 在独立线程加载模型，结果通过事件通道返回
    ///
    /// 加载线程不归运行时管理，退出时不会等待下载或加载完成。
    fn load_model(&mut self, events: &mpsc::Sender<Event>) {
        let Some(identifier) = self.state.begin_load() else {
            return;
        };

        let loader = self.loader.clone();
        let events = events.clone();
        let id = identifier.clone();
        let spawned = thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| loader.load(&id)))
                    .unwrap_or_else(|_| Err(InferenceError::Model("加载线程异常退出".to_string())));

                if events
                    .blocking_send(Event::ModelLoaded { identifier: id, result })
                    .is_err()
                {
                    tracing::debug!("UI 已关闭，丢弃加载结果");
                }
            });

        if let Err(err) = spawned {
            tracing::error!("加载线程启动失败: {}", err);
            self.state.finish_load(identifier, Err(InferenceError::Io(err)));
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// 运行聊天窗口的便捷函数
pub async fn run_chat(config: AppConfig) -> AppResult<()> {
    ChatApp::new(config).run().await
}
