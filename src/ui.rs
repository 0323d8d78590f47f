use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use grammar_chat::prompt::is_no_correction;
use grammar_chat::{Author, CorrectionState, Message};
use crate::app::{App, InputMode};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, status, input, footer
    let [header_area, chat_area, status_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_status(app, frame, status_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Grammar Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(" {} ", app.model), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" c ", key_style),
            Span::styled(" copy fix ", label_style),
            Span::styled(" o ", key_style),
            Span::styled(" copy original ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing
    app.chat_area = Some(area);
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Messages ");

    let chat = Paragraph::new(chat_text(app)).wrap(Wrap { trim: false });

    // Measure the wrapped height of exactly what gets drawn
    let total = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);
    app.set_chat_metrics(total, inner_height);

    let chat = chat.block(chat_block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn chat_text(app: &App) -> Text<'static> {
    if app.store.is_empty() {
        return Text::from(Span::styled(
            "Type a sentence and press Enter to have it corrected...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (idx, message) in app.store.iter_chronological().enumerate() {
        let selected = app.selected == Some(idx);
        push_message_lines(&mut lines, message, selected, app.animation_frame);
    }
    Text::from(lines)
}

fn push_message_lines(lines: &mut Vec<Line<'static>>, message: &Message, selected: bool, frame: u8) {
    let marker = if selected { "> " } else { "" };
    let timestamp = message.created_at().format("%H:%M").to_string();

    if message.author() == Author::System {
        lines.push(Line::from(Span::styled(
            format!("{}{}", marker, message.original_text()),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::default());
        return;
    }

    let label_style = if selected {
        Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    };
    lines.push(Line::from(vec![
        Span::styled(format!("{}You:", marker), label_style),
        Span::styled(format!(" {}", timestamp), Style::default().fg(Color::DarkGray)),
    ]));
    for line in message.original_text().lines() {
        lines.push(Line::from(line.to_string()));
    }

    match (message.corrected_text(), message.state()) {
        (Some(text), _) if is_no_correction(text) => lines.push(Line::from(Span::styled(
            "✓ No errors found",
            Style::default().fg(Color::Green),
        ))),
        (Some(text), _) => {
            // Spans can't carry newlines, so each line of the fix gets its own Line
            let mut fix_lines = text.lines();
            lines.push(Line::from(vec![
                Span::styled("Fix: ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::raw(fix_lines.next().unwrap_or_default().to_string()),
            ]));
            lines.extend(fix_lines.map(|line| Line::from(line.to_string())));
        }
        (None, CorrectionState::Failed(_)) => lines.push(Line::from(Span::styled(
            "✗ Could not correct this message",
            Style::default().fg(Color::Red),
        ))),
        (None, CorrectionState::Superseded) => lines.push(Line::from(Span::styled(
            "(replaced by a newer message)",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))),
        (None, _) => {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
    }
    lines.push(Line::default());
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let line = if let Some(err) = app.pipeline.last_error() {
        Line::from(Span::styled(format!(" {} ", err), Style::default().fg(Color::Red)))
    } else if app.pipeline.is_busy() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        Line::from(Span::styled(
            format!(" correcting{}", dots),
            Style::default().fg(Color::DarkGray),
        ))
    } else if let Some(flash) = &app.flash {
        Line::from(Span::styled(format!(" {} ", flash), Style::default().fg(Color::Green)))
    } else {
        Line::default()
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Type your message ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
