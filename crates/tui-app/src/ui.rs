//! UI 渲染模块
//!
//! 负责聊天窗口的渲染。

use crate::components::{AppFocus, ChatLogView, DialogView, InputBox, ModelSelector};
use crate::state::ChatState;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// 窗口标题
pub const CHAT_TITLE: &str = "AI 模型对话";

/// 按钮可用时的颜色
const BUTTON_COLOR: Color = Color::Rgb(0x6a, 0x11, 0xcb);
/// 按钮对应控件获得焦点时的颜色
const BUTTON_FOCUSED_COLOR: Color = Color::Rgb(0x25, 0x75, 0xfc);
const BUTTON_WIDTH: u16 = 12;

/// 绘制 UI
pub fn draw_ui(f: &mut Frame, state: &ChatState) {
    let size = f.area();

    // 主布局：header, 模型栏, 聊天记录, 消息栏, footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // 模型栏
            Constraint::Min(3),    // 聊天记录
            Constraint::Length(3), // 消息栏
            Constraint::Length(1), // Footer
        ])
        .split(size);

    draw_header(f, chunks[0], state);
    draw_model_bar(f, chunks[1], state);
    draw_chat_log(f, chunks[2], state);
    draw_message_bar(f, chunks[3], state);
    draw_footer(f, chunks[4], state);

    if let Some(dialog) = state.dialog() {
        f.render_widget(DialogView::new(dialog), size);
    }
}

/// 绘制 Header
fn draw_header(f: &mut Frame, area: Rect, state: &ChatState) {
    let model = match state.model() {
        Some(handle) => Span::styled(
            format!("模型: {}", handle.identifier()),
            Style::default().fg(Color::Green),
        ),
        None => Span::styled("未加载模型", Style::default().fg(Color::Gray)),
    };

    let mut spans = vec![
        Span::styled(
            CHAT_TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        model,
    ];

    if let Some(identifier) = state.loading() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("正在加载: {}", identifier),
            Style::default().fg(Color::Yellow),
        ));
    } else if !state.send_enabled() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled("生成中...", Style::default().fg(Color::Yellow)));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}

/// 绘制模型栏：预设选择、自定义标识、加载按钮
fn draw_model_bar(f: &mut Frame, area: Rect, state: &ChatState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Fill(1),
            Constraint::Length(BUTTON_WIDTH),
        ])
        .split(area);

    let focus = state.focus();

    let selector = ModelSelector::new(state.model_selector())
        .title(AppFocus::ModelSelector.title())
        .border_style(focus_border(focus == AppFocus::ModelSelector))
        .focused(focus == AppFocus::ModelSelector);
    f.render_widget(selector, chunks[0]);

    let input = InputBox::new(state.model_input())
        .title(AppFocus::ModelInput.title())
        .placeholder("或在此输入模型标识")
        .border_style(focus_border(focus == AppFocus::ModelInput));
    f.render_widget(input, chunks[1]);
    if focus == AppFocus::ModelInput {
        place_cursor(f, chunks[1], state.model_input());
    }

    let label = if state.loading().is_some() { "加载中" } else { "加载模型" };
    draw_button(
        f,
        chunks[2],
        label,
        state.load_enabled(),
        matches!(focus, AppFocus::ModelSelector | AppFocus::ModelInput),
    );
}

/// 绘制聊天记录
fn draw_chat_log(f: &mut Frame, area: Rect, state: &ChatState) {
    let title = if state.chat_log().scroll_back() > 0 {
        format!("对话 (已向上滚动 {} 行)", state.chat_log().scroll_back())
    } else {
        "对话".to_string()
    };

    f.render_widget(ChatLogView::new(state.chat_log()).title(title), area);
}

/// 绘制消息栏：输入框和发送按钮
fn draw_message_bar(f: &mut Frame, area: Rect, state: &ChatState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Fill(1), Constraint::Length(BUTTON_WIDTH)])
        .split(area);

    let focused = state.focus() == AppFocus::Message;

    let input = InputBox::new(state.message_input())
        .title(AppFocus::Message.title())
        .placeholder("输入消息...")
        .border_style(focus_border(focused))
        .enabled(state.send_enabled());
    f.render_widget(input, chunks[0]);
    if focused {
        place_cursor(f, chunks[0], state.message_input());
    }

    draw_button(f, chunks[1], "发送", state.send_enabled(), focused);
}

/// 绘制按钮
fn draw_button(f: &mut Frame, area: Rect, label: &str, enabled: bool, focused: bool) {
    let color = match (enabled, focused) {
        (false, _) => Color::DarkGray,
        (true, true) => BUTTON_FOCUSED_COLOR,
        (true, false) => BUTTON_COLOR,
    };
    let text_style = if enabled {
        Style::default().fg(Color::White).bg(color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let button = Paragraph::new(Line::from(Span::styled(label.to_string(), text_style)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .alignment(Alignment::Center);

    f.render_widget(button, area);
}

/// 把终端光标放到输入框中
fn place_cursor(f: &mut Frame, area: Rect, input: &crate::components::TextInput) {
    let inner_width = area.width.saturating_sub(2);
    let offset = InputBox::scroll_offset(input, inner_width);
    let x = input.cursor_width().saturating_sub(offset) as u16;
    f.set_cursor_position(Position::new(area.x + 1 + x, area.y + 1));
}

fn focus_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// 绘制 Footer
fn draw_footer(f: &mut Frame, area: Rect, state: &ChatState) {
    let help_keys = match state.focus() {
        AppFocus::ModelSelector => "[←→] 切换预设 [Enter] 加载 [q] 退出",
        AppFocus::ModelInput => "[输入文字] 模型标识 [Enter] 加载",
        AppFocus::Message => "[输入文字] 打字 [Enter] 发送 [↑↓/PgUp/PgDn] 滚动",
    };
    let help_text = format!(
        "[Tab] 切换焦点 | 当前焦点: {} | {} | [Ctrl+C] 退出",
        state.focus().title(),
        help_keys
    );

    let footer = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);

    f.render_widget(footer, area);
}
