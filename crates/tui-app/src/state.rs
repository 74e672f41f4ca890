//! 聊天窗口状态
//!
//! 与终端无关的窗口逻辑：持有模型句柄，校验前置条件，
//! 启动生成线程，并把生成事件应用到聊天记录上。

use crate::components::{AppFocus, ChatLog, Dialog, ModelSelectorState, TextInput};
use crate::config::AppConfig;
use crate::event::{Event, GenerationEvent};
use crate::worker::{error_fragment, GenerationId, GenerationWorker};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use inference::{ConversationTurn, InferenceError, ModelHandle};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// 聊天记录滚动一页的行数
const PAGE_SCROLL: usize = 10;

/// 按键对应的需要主循环执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    None,
    Quit,
    LoadModel,
    SendMessage,
}

/// 聊天窗口状态
pub struct ChatState {
    /// 当前模型句柄（整体替换，不做部分修改）
    model: Option<ModelHandle>,
    /// 正在加载的模型标识
    loading: Option<String>,
    model_selector: ModelSelectorState,
    model_input: TextInput,
    message_input: TextInput,
    chat_log: ChatLog,
    focus: AppFocus,
    dialog: Option<Dialog>,
    /// 进行中的生成任务 -> 对应的模型回复下标
    in_flight: HashMap<GenerationId, usize>,
    next_generation: u64,
    max_tokens: usize,
}

impl ChatState {
    /// 创建新的窗口状态
    pub fn new(config: &AppConfig) -> Self {
        Self {
            model: None,
            loading: None,
            model_selector: ModelSelectorState::new(config.presets.clone()),
            model_input: TextInput::new(),
            message_input: TextInput::new(),
            chat_log: ChatLog::new(),
            focus: AppFocus::ModelSelector,
            dialog: None,
            in_flight: HashMap::new(),
            next_generation: 1,
            max_tokens: config.generation.max_tokens,
        }
    }

    /// 处理键盘事件
    pub fn handle_key(&mut self, key: KeyEvent) -> UserAction {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            return UserAction::Quit;
        }

        // 对话框显示时拦截所有按键
        if self.dialog.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.dismiss_dialog();
            }
            return UserAction::None;
        }

        match (self.focus, key.code) {
            (_, KeyCode::Tab) => self.focus = self.focus.next(),
            (_, KeyCode::BackTab) => self.focus = self.focus.previous(),

            (AppFocus::ModelSelector, KeyCode::Left | KeyCode::Up) => self.model_selector.previous(),
            (AppFocus::ModelSelector, KeyCode::Right | KeyCode::Down) => self.model_selector.next(),
            (AppFocus::ModelSelector, KeyCode::Char('q')) => return UserAction::Quit,
            (AppFocus::ModelSelector | AppFocus::ModelInput, KeyCode::Enter) => {
                return UserAction::LoadModel
            }

            (AppFocus::Message, KeyCode::Enter) => return UserAction::SendMessage,
            (AppFocus::Message, KeyCode::Up) => self.chat_log.scroll_up(1),
            (AppFocus::Message, KeyCode::Down) => self.chat_log.scroll_down(1),
            (_, KeyCode::PageUp) => self.chat_log.scroll_up(PAGE_SCROLL),
            (_, KeyCode::PageDown) => self.chat_log.scroll_down(PAGE_SCROLL),

            (focus, code) if focus.is_text_input() => {
                let input = self.focused_input_mut();
                match code {
                    KeyCode::Char(c) => input.insert_char(c),
                    KeyCode::Backspace => input.backspace(),
                    KeyCode::Delete => input.delete(),
                    KeyCode::Left => input.move_left(),
                    KeyCode::Right => input.move_right(),
                    KeyCode::Home => input.move_home(),
                    KeyCode::End => input.move_end(),
                    _ => {}
                }
            }
            _ => {}
        }

        UserAction::None
    }

    /// 处理粘贴/输入法输入
    pub fn handle_paste(&mut self, content: &str) {
        if self.dialog.is_none() && self.focus.is_text_input() {
            self.focused_input_mut().insert_str(content);
        }
    }

    fn focused_input_mut(&mut self) -> &mut TextInput {
        match self.focus {
            AppFocus::ModelInput => &mut self.model_input,
            _ => &mut self.message_input,
        }
    }

    /// 准备加载模型，返回要加载的标识
    ///
    /// 自定义标识非空时优先，否则使用选中的预设。已有加载在进行时返回 None。
    pub fn begin_load(&mut self) -> Option<String> {
        if let Some(ref identifier) = self.loading {
            tracing::info!("模型 {} 正在加载，忽略新的加载请求", identifier);
            return None;
        }

        let custom = self.model_input.value().trim();
        let identifier = if custom.is_empty() {
            self.model_selector.current().unwrap_or_default().trim()
        } else {
            custom
        };

        if identifier.is_empty() {
            self.dialog = Some(Dialog::warning("没有模型", "请选择或输入模型标识。"));
            return None;
        }

        let identifier = identifier.to_string();
        tracing::info!("开始加载模型: {}", identifier);
        self.loading = Some(identifier.clone());
        Some(identifier)
    }

    /// 应用加载结果
    ///
    /// 失败时保留原来的模型句柄。
    pub fn finish_load(&mut self, identifier: String, result: Result<ModelHandle, InferenceError>) {
        self.loading = None;

        match result {
            Ok(handle) => {
                tracing::info!("模型加载成功: {}", identifier);
                self.model = Some(handle);
                self.dialog = Some(Dialog::information(
                    "模型已加载",
                    format!("模型 '{}' 加载成功！", identifier),
                ));
                self.chat_log.push_notice(format!("已加载模型: {}", identifier));
                self.focus = AppFocus::Message;
            }
            Err(err) => {
                tracing::error!("模型 {} 加载失败: {}", identifier, err);
                self.dialog = Some(Dialog::critical(
                    "加载失败",
                    format!("模型加载失败: {}", err),
                ));
            }
        }
    }

    /// 发送输入框中的消息
    pub fn submit_message(&mut self, events: &mpsc::Sender<Event>) -> bool {
        let text = self.message_input.value().to_string();
        self.send_message(&text, events)
    }

    /// 发送消息并启动生成线程，启动成功返回 true
    pub fn send_message(&mut self, text: &str, events: &mpsc::Sender<Event>) -> bool {
        let Some(handle) = self.model.clone() else {
            self.dialog = Some(Dialog::warning("未加载模型", "请先加载模型。"));
            return false;
        };

        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        // 发送按钮禁用期间不接受新消息
        if !self.send_enabled() {
            tracing::debug!("生成进行中，忽略发送");
            return false;
        }

        self.chat_log.push_turn(ConversationTurn::user(text));
        self.message_input.clear();

        let id = GenerationId(self.next_generation);
        self.next_generation += 1;
        let index = self.chat_log.open_model_turn();
        self.in_flight.insert(id, index);

        let worker = GenerationWorker::new(id, handle, text.to_string(), self.max_tokens);
        tracing::debug!("启动生成任务 {} (回复下标 {})", worker.id(), index);
        if let Err(err) = worker.spawn(events.clone()) {
            tracing::error!("生成线程启动失败: {}", err);
            let err = InferenceError::Io(err);
            self.on_generation_event(GenerationEvent::Fragment {
                id,
                text: error_fragment(&err),
            });
            self.on_generation_event(GenerationEvent::Finished { id });
        }

        true
    }

    /// 应用生成线程发回的事件
    pub fn on_generation_event(&mut self, event: GenerationEvent) {
        match event {
            GenerationEvent::Fragment { id, text } => match self.in_flight.get(&id) {
                Some(&index) => {
                    self.chat_log.append(index, &text);
                }
                None => tracing::warn!("收到未知生成任务 {} 的片段", id),
            },
            GenerationEvent::Finished { id } => match self.in_flight.remove(&id) {
                Some(index) => {
                    self.chat_log.seal(index);
                    tracing::debug!("生成任务 {} 已结束", id);
                }
                None => tracing::warn!("收到未知生成任务 {} 的结束通知", id),
            },
        }
    }

    /// 发送按钮是否可用（没有进行中的生成）
    pub fn send_enabled(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// 加载按钮是否可用
    pub fn load_enabled(&self) -> bool {
        self.loading.is_none()
    }

    pub fn model(&self) -> Option<&ModelHandle> {
        self.model.as_ref()
    }

    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn dismiss_dialog(&mut self) {
        self.dialog = None;
    }

    pub fn focus(&self) -> AppFocus {
        self.focus
    }

    pub fn chat_log(&self) -> &ChatLog {
        &self.chat_log
    }

    pub fn model_selector(&self) -> &ModelSelectorState {
        &self.model_selector
    }

    pub fn model_input(&self) -> &TextInput {
        &self.model_input
    }

    pub fn message_input(&self) -> &TextInput {
        &self.message_input
    }
}
