//! Hello World 窗口
//!
//! 居中显示一行 "Hello World!"，按 q / Esc / Ctrl+C 关闭。

use crate::event::AppResult;
use crate::terminal::{init_terminal, restore_terminal};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// 窗口标题
pub const HELLO_TITLE: &str = "Hello World";

/// 显示的文本
pub const HELLO_TEXT: &str = "Hello World!";

/// 绘制 Hello World 窗口
pub fn draw_hello(f: &mut Frame) {
    let area = f.area();
    let block = Block::default()
        .title(HELLO_TITLE)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .split(inner);

    let text = Paragraph::new(Line::from(HELLO_TEXT))
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(text, rows[1]);
}

/// 按键是否关闭窗口
pub fn is_close_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// 显示 Hello World 窗口，直到用户关闭
pub async fn run_hello() -> AppResult<()> {
    let mut terminal = init_terminal()?;
    tracing::info!("Hello World 窗口已打开");

    let mut reader = crossterm::event::EventStream::new();
    let result: AppResult<()> = async {
        loop {
            terminal.draw(draw_hello)?;

            match reader.next().await {
                Some(Ok(crossterm::event::Event::Key(key)))
                    if key.kind == KeyEventKind::Press && is_close_key(&key) =>
                {
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => break,
            }
        }
        Ok(())
    }
    .await;

    restore_terminal(&mut terminal)?;
    tracing::info!("Hello World 窗口已关闭");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn row_text(terminal: &Terminal<TestBackend>, y: u16) -> String {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.width)
            .map(|x| buffer[(x, y)].symbol())
            .collect()
    }

    #[test]
    fn test_hello_text_is_centered() {
        let mut terminal = Terminal::new(TestBackend::new(40, 9)).unwrap();
        terminal.draw(draw_hello).unwrap();

        assert!(row_text(&terminal, 0).contains(HELLO_TITLE));

        let middle = row_text(&terminal, 4);
        let content = middle.trim_matches('│');
        assert_eq!(content.trim(), HELLO_TEXT);
        let left = content.len() - content.trim_start().len();
        let right = content.len() - content.trim_end().len();
        assert!(left.abs_diff(right) <= 1);
    }

    #[test]
    fn test_close_keys() {
        assert!(is_close_key(&KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_close_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_close_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_close_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_close_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    }
}
