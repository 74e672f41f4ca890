//! 模态对话框组件
//!
//! 显示时拦截所有按键，按 Enter / Esc 关闭。

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

/// 对话框级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogLevel {
    Information,
    Warning,
    Critical,
}

impl DialogLevel {
    pub fn color(&self) -> Color {
        match self {
            DialogLevel::Information => Color::Cyan,
            DialogLevel::Warning => Color::Yellow,
            DialogLevel::Critical => Color::Red,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            DialogLevel::Information => "ℹ",
            DialogLevel::Warning => "⚠",
            DialogLevel::Critical => "✖",
        }
    }
}

/// 对话框内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub level: DialogLevel,
    pub title: String,
    pub message: String,
}

impl Dialog {
    pub fn information(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DialogLevel::Information, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DialogLevel::Warning, title, message)
    }

    pub fn critical(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DialogLevel::Critical, title, message)
    }

    fn new(level: DialogLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// 计算居中区域
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height.min(area.height)),
            Constraint::Fill(1),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// 对话框组件
pub struct DialogView<'a> {
    pub dialog: &'a Dialog,
}

impl<'a> DialogView<'a> {
    pub fn new(dialog: &'a Dialog) -> Self {
        Self { dialog }
    }
}

impl Widget for DialogView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let color = self.dialog.level.color();
        let area = centered_rect(60, 9, area);

        // 清掉下层内容
        Clear.render(area, buf);

        let block = Block::default()
            .title(Span::styled(
                format!(" {} {} ", self.dialog.level.icon(), self.dialog.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));

        let text = vec![
            Line::from(""),
            Line::from(self.dialog.message.as_str()),
            Line::from(""),
            Line::from(Span::styled(
                "[Enter] 确定",
                Style::default().fg(Color::Gray),
            )),
        ];

        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_levels() {
        assert_eq!(Dialog::information("t", "m").level, DialogLevel::Information);
        assert_eq!(Dialog::warning("t", "m").level, DialogLevel::Warning);
        assert_eq!(Dialog::critical("t", "m").level, DialogLevel::Critical);
        assert_eq!(DialogLevel::Critical.color(), Color::Red);
    }

    #[test]
    fn test_centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(60, 9, area);
        assert_eq!(rect.height, 9);
        assert_eq!(rect.width, 60);
        assert!(rect.x >= 19 && rect.x <= 21);
        assert!(rect.y >= 15 && rect.y <= 16);
    }
}
