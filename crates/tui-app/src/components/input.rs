//! 单行输入框组件
//!
//! 光标按字符计数，中文等多字节字符可以正常编辑。

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthStr;

/// 输入框状态
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    /// 输入内容
    value: String,
    /// 光标位置（字符下标）
    cursor: usize,
}

impl TextInput {
    /// 创建新的输入框状态
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入字符
    pub fn insert_char(&mut self, c: char) {
        let index = self.byte_index();
        self.value.insert(index, c);
        self.cursor += 1;
    }

    /// 插入一段文本（粘贴），换行替换为空格
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '\r' => {}
                '\n' | '\t' => self.insert_char(' '),
                c => self.insert_char(c),
            }
        }
    }

    /// 处理退格键
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let index = self.byte_index();
            self.value.remove(index);
        }
    }

    /// 处理删除键
    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let index = self.byte_index();
            self.value.remove(index);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    /// 清空
    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// 获取内容（不清空）
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 光标前文本的显示宽度
    pub fn cursor_width(&self) -> usize {
        self.value[..self.byte_index()].width()
    }

    fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map(|(index, _)| index)
            .unwrap_or(self.value.len())
    }
}

/// 输入框组件
pub struct InputBox<'a> {
    pub state: &'a TextInput,
    pub title: String,
    pub placeholder: &'a str,
    pub border_style: Style,
    pub enabled: bool,
}

impl<'a> InputBox<'a> {
    /// 创建新的输入框
    pub fn new(state: &'a TextInput) -> Self {
        Self {
            state,
            title: String::new(),
            placeholder: "",
            border_style: Style::default().fg(Color::DarkGray),
            enabled: true,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn border_style(mut self, style: Style) -> Self {
        self.border_style = style;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// 内容超出宽度时从左侧截掉的显示宽度
    pub fn scroll_offset(state: &TextInput, inner_width: u16) -> usize {
        let width = usize::from(inner_width.max(1));
        (state.cursor_width() + 1).saturating_sub(width)
    }
}

impl Widget for InputBox<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(self.border_style);
        let inner = block.inner(area);

        let line = if self.state.value().is_empty() {
            Line::from(Span::styled(
                self.placeholder,
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            let style = if self.enabled {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(Span::styled(self.state.value(), style))
        };

        let offset = Self::scroll_offset(self.state, inner.width);
        Paragraph::new(line)
            .block(block)
            .scroll((0, offset as u16))
            .render(area, buf);
    }
}
