//! 聊天记录组件
//!
//! 按顺序显示对话轮次和提示信息。模型的回复在生成期间保持打开，
//! 片段直接追加到该轮次末尾；收到结束通知后封闭，之后不再修改。

use chrono::{DateTime, Local};
use inference::{ConversationTurn, Role};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use std::ops::Range;
use unicode_width::UnicodeWidthChar;

/// 生成中的回复末尾显示的光标
const STREAMING_CURSOR: &str = "▌";

/// 聊天记录条目
#[derive(Debug, Clone)]
pub enum LogEntry {
    /// 提示信息（如模型加载成功）
    Notice(String),
    /// 对话轮次
    Turn {
        turn: ConversationTurn,
        timestamp: DateTime<Local>,
        /// 是否仍在接收片段
        open: bool,
    },
}

/// 聊天记录状态
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Vec<LogEntry>,
    /// 从底部向上滚动的行数
    scroll_back: usize,
}

impl ChatLog {
    /// 创建新的聊天记录
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加提示信息
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.entries.push(LogEntry::Notice(text.into()));
    }

    /// 添加已完成的轮次，并滚动到底部
    pub fn push_turn(&mut self, turn: ConversationTurn) -> usize {
        self.entries.push(LogEntry::Turn {
            turn,
            timestamp: Local::now(),
            open: false,
        });
        self.scroll_to_bottom();
        self.entries.len() - 1
    }

    /// 打开一个空的模型回复，返回其下标
    pub fn open_model_turn(&mut self) -> usize {
        self.entries.push(LogEntry::Turn {
            turn: ConversationTurn::model(String::new()),
            timestamp: Local::now(),
            open: true,
        });
        self.entries.len() - 1
    }

    /// 向打开的轮次追加片段；已封闭或不存在时返回 false
    pub fn append(&mut self, index: usize, fragment: &str) -> bool {
        match self.entries.get_mut(index) {
            Some(LogEntry::Turn { turn, open: true, .. }) => {
                turn.text.push_str(fragment);
                true
            }
            _ => false,
        }
    }

    /// 封闭轮次
    pub fn seal(&mut self, index: usize) {
        if let Some(LogEntry::Turn { open, .. }) = self.entries.get_mut(index) {
            *open = false;
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 纯文本形式的记录（每条一行前缀）
    pub fn transcript(&self) -> String {
        self.entries
            .iter()
            .map(|entry| match entry {
                LogEntry::Notice(text) => format!("* {}", text),
                LogEntry::Turn { turn, .. } => format!("{}: {}", role_label(turn.role), turn.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }

    pub fn scroll_back(&self) -> usize {
        self.scroll_back
    }
}

/// 角色显示名
pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "你",
        Role::Model => "模型",
    }
}

/// 按显示宽度折行
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut row_width = 0;

    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if row_width + w > width && !row.is_empty() {
            rows.push(std::mem::take(&mut row));
            row_width = 0;
        }
        row.push(c);
        row_width += w;
    }
    rows.push(row);
    rows
}

/// 可见行的范围：底部对齐，向上滚动 `scroll_back` 行
pub fn visible_window(total: usize, height: usize, scroll_back: usize) -> Range<usize> {
    let max_scroll = total.saturating_sub(height);
    let top = max_scroll - scroll_back.min(max_scroll);
    top..(top + height).min(total)
}

/// 聊天记录组件
pub struct ChatLogView<'a> {
    pub log: &'a ChatLog,
    pub title: String,
    pub border_style: Style,
}

impl<'a> ChatLogView<'a> {
    /// 创建新的聊天记录组件
    pub fn new(log: &'a ChatLog) -> Self {
        Self {
            log,
            title: "对话".to_string(),
            border_style: Style::default().fg(Color::Gray),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// 把所有条目展开成折行后的行
    pub fn build_lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        for entry in self.log.entries() {
            match entry {
                LogEntry::Notice(text) => {
                    let style = Style::default()
                        .fg(Color::Gray)
                        .add_modifier(Modifier::ITALIC);
                    for row in text.split('\n').flat_map(|l| wrap_text(l, width)) {
                        lines.push(Line::from(Span::styled(row, style)));
                    }
                }
                LogEntry::Turn {
                    turn,
                    timestamp,
                    open,
                } => {
                    let label_style = match turn.role {
                        Role::User => Style::default().fg(Color::Cyan),
                        Role::Model => Style::default().fg(Color::Green),
                    }
                    .add_modifier(Modifier::BOLD);

                    let header = format!("{} {}: ", timestamp.format("%H:%M"), role_label(turn.role));
                    let mut body = turn.text.clone();
                    if *open {
                        body.push_str(STREAMING_CURSOR);
                    }

                    for (line_index, text_line) in body.split('\n').enumerate() {
                        let full = if line_index == 0 {
                            format!("{}{}", header, text_line)
                        } else {
                            text_line.to_string()
                        };

                        for (row_index, row) in wrap_text(&full, width).into_iter().enumerate() {
                            if line_index > 0 || row_index > 0 {
                                lines.push(Line::from(row));
                                continue;
                            }
                            // 窄到放不下前缀时整行按前缀样式显示
                            let line = match row.strip_prefix(header.as_str()) {
                                Some(rest) => Line::from(vec![
                                    Span::styled(header.clone(), label_style),
                                    Span::raw(rest.to_string()),
                                ]),
                                None => Line::from(Span::styled(row.clone(), label_style)),
                            };
                            lines.push(line);
                        }
                    }
                }
            }
            // 条目之间空一行
            lines.push(Line::from(""));
        }

        lines
    }
}

impl Widget for ChatLogView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title.clone())
            .borders(Borders::ALL)
            .border_style(self.border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        if self.log.is_empty() {
            // 没有消息时显示提示
            let text = vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled("💬 ", Style::default().fg(Color::Yellow)),
                    Span::styled(
                        "开始聊天",
                        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(""),
                Line::from(vec![
                    Span::styled("提示: ", Style::default().fg(Color::Gray)),
                    Span::styled(
                        "先加载模型，然后在下方输入消息",
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
            ];

            Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(inner, buf);
            return;
        }

        let lines = self.build_lines(usize::from(inner.width));
        let window = visible_window(lines.len(), usize::from(inner.height), self.log.scroll_back());

        let visible: Vec<Line<'static>> = lines
            .into_iter()
            .skip(window.start)
            .take(window.len())
            .collect();
        Paragraph::new(visible).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_append_in_order() {
        let mut log = ChatLog::new();
        log.push_turn(ConversationTurn::user("hi"));
        let index = log.open_model_turn();

        for fragment in ["f1", "f2", "f3"] {
            assert!(log.append(index, fragment));
        }
        log.seal(index);

        assert_eq!(log.transcript(), "你: hi\n模型: f1f2f3");
    }

    #[test]
    fn test_sealed_turn_is_immutable() {
        let mut log = ChatLog::new();
        let index = log.open_model_turn();
        log.append(index, "done");
        log.seal(index);

        assert!(!log.append(index, "late"));
        assert!(!log.append(index + 1, "nowhere"));
        assert_eq!(log.transcript(), "模型: done");
    }

    #[test]
    fn test_user_turns_are_closed() {
        let mut log = ChatLog::new();
        let index = log.push_turn(ConversationTurn::user("hi"));
        assert!(!log.append(index, "x"));
    }

    #[test]
    fn test_notice_in_transcript() {
        let mut log = ChatLog::new();
        log.push_notice("已加载模型: a/b");
        assert_eq!(log.transcript(), "* 已加载模型: a/b");
    }

    #[test]
    fn test_wrap_text_by_display_width() {
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_text("你好世界", 5), vec!["你好", "世界"]);
        assert_eq!(wrap_text("", 4), vec![""]);
    }

    #[test]
    fn test_scroll_operations() {
        let mut log = ChatLog::new();
        log.scroll_down(1);
        assert_eq!(log.scroll_back(), 0); // 不能越过底部
        log.scroll_up(3);
        assert_eq!(log.scroll_back(), 3);
        log.push_turn(ConversationTurn::user("x"));
        assert_eq!(log.scroll_back(), 0);
    }

    #[test]
    fn test_visible_window_anchors_to_bottom() {
        assert_eq!(visible_window(5, 10, 0), 0..5);
        assert_eq!(visible_window(30, 10, 0), 20..30);
        assert_eq!(visible_window(30, 10, 4), 16..26);
        assert_eq!(visible_window(30, 10, 100), 0..10);
    }

    #[test]
    fn test_visible_window_beyond_u16_lines() {
        assert_eq!(visible_window(70_000, 10, 0), 69_990..70_000);
        assert_eq!(visible_window(70_000, 10, 5), 69_985..69_995);
    }

    #[test]
    fn test_long_log_renders_last_lines() {
        use ratatui::{backend::TestBackend, Terminal};

        let mut log = ChatLog::new();
        for i in 0..40 {
            log.push_notice(format!("n{}", i));
        }

        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        terminal
            .draw(|f| f.render_widget(ChatLogView::new(&log), f.area()))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let screen: String = (0..buffer.area.height)
            .flat_map(|y| (0..buffer.area.width).map(move |x| (x, y)))
            .map(|pos| buffer[pos].symbol().to_string())
            .collect();
        assert!(screen.contains("n39"));
        assert!(!screen.contains("n30"));
    }

    #[test]
    fn test_open_turn_renders_streaming_cursor() {
        let mut log = ChatLog::new();
        let index = log.open_model_turn();
        log.append(index, "abc");

        let lines = ChatLogView::new(&log).build_lines(80);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(first.ends_with("模型: abc▌"));

        log.seal(index);
        let lines = ChatLogView::new(&log).build_lines(80);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(first.ends_with("模型: abc"));
    }
}
