//! 模型选择组件
//!
//! 在预设的模型标识之间循环切换。

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// 模型选择状态
#[derive(Debug, Clone, Default)]
pub struct ModelSelectorState {
    /// 预设模型标识
    presets: Vec<String>,
    /// 光标位置
    cursor: usize,
}

impl ModelSelectorState {
    /// 创建新的模型选择状态
    pub fn new(presets: Vec<String>) -> Self {
        Self { presets, cursor: 0 }
    }

    /// 选择上一个（循环）
    pub fn previous(&mut self) {
        if !self.presets.is_empty() {
            self.cursor = (self.cursor + self.presets.len() - 1) % self.presets.len();
        }
    }

    /// 选择下一个（循环）
    pub fn next(&mut self) {
        if !self.presets.is_empty() {
            self.cursor = (self.cursor + 1) % self.presets.len();
        }
    }

    /// 当前选中的模型标识
    pub fn current(&self) -> Option<&str> {
        self.presets.get(self.cursor).map(String::as_str)
    }

    pub fn presets(&self) -> &[String] {
        &self.presets
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// 模型选择组件
pub struct ModelSelector<'a> {
    pub state: &'a ModelSelectorState,
    pub title: String,
    pub border_style: Style,
    pub focused: bool,
}

impl<'a> ModelSelector<'a> {
    /// 创建新的模型选择组件
    pub fn new(state: &'a ModelSelectorState) -> Self {
        Self {
            state,
            title: "选择模型".to_string(),
            border_style: Style::default().fg(Color::DarkGray),
            focused: false,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn border_style(mut self, style: Style) -> Self {
        self.border_style = style;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl Widget for ModelSelector<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(
            "{} ({}/{})",
            self.title,
            (self.state.cursor() + 1).min(self.state.presets().len()),
            self.state.presets().len()
        );
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(self.border_style);

        let arrow_style = if self.focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let line = match self.state.current() {
            Some(current) => Line::from(vec![
                Span::styled("◀ ", arrow_style),
                Span::styled(
                    current.to_string(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::styled(" ▶", arrow_style),
            ]),
            None => Line::from(Span::styled("(无预设模型)", Style::default().fg(Color::Gray))),
        };

        Paragraph::new(line)
            .block(block)
            .alignment(Alignment::Left)
            .render(area, buf);
    }
}
