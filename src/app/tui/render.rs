use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Gauge, Padding, Paragraph, Row, Table, TableState,
    Wrap,
};

use crate::progress::WatchProgressRecord;

use super::super::format::{
    build_progress_gauge, describe_content_key, format_clock, format_last_watched_display,
    format_resume_text, truncate,
};
use super::{ListView, PendingNotice, PendingUnwatch, TuiAction};

const ACCENT: Color = Color::Rgb(240, 150, 90);
const MUTED: Color = Color::Rgb(185, 195, 210);

#[allow(clippy::too_many_arguments)]
pub(super) fn draw_tui(
    frame: &mut Frame,
    items: &[WatchProgressRecord],
    table_state: &mut TableState,
    view: ListView,
    action: TuiAction,
    status: &str,
    pending_unwatch: Option<&PendingUnwatch>,
    pending_notice: Option<&PendingNotice>,
    watched_threshold: u8,
) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let finished = items.iter().filter(|item| item.completed).count();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "WATCHMARK",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("{} entries", items.len()),
            Style::default().fg(MUTED),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(format!("{finished} finished"), Style::default().fg(MUTED)),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("watched above {watched_threshold}%"),
            Style::default().fg(MUTED),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(action.label(), Style::default().fg(Color::Yellow)),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block("Dashboard"));
    frame.render_widget(header, chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
        .split(chunks[1]);
    let details_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(body_chunks[1]);

    let rows: Vec<Row> = items
        .iter()
        .map(|item| {
            let pct = if item.completed {
                "done".to_string()
            } else {
                format!("{}%", item.percent_complete)
            };
            Row::new(vec![
                Cell::from(describe_content_key(&item.content_key)),
                Cell::from(format_clock(item.position_seconds)),
                Cell::from(pct),
                Cell::from(format_last_watched_display(&item.last_watched_at)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(46),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(18),
        ],
    )
    .header(
        Row::new(vec!["Title", "Position", "Pct", "Last Watched"])
            .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    )
    .block(panel_block(view.title()))
    .row_highlight_style(
        Style::default()
            .bg(ACCENT)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, body_chunks[0], table_state);

    let (selection_text, gauge) = match table_state.selected().and_then(|idx| items.get(idx)) {
        Some(item) => (
            format!(
                "Title\n{}\n\nKey\n{}\n\nProgress\n{}\n\nLast Watched\n{}",
                truncate(&describe_content_key(&item.content_key), 40),
                truncate(&item.content_key, 40),
                format_resume_text(item),
                format_last_watched_display(&item.last_watched_at),
            ),
            Some(build_progress_gauge(item)),
        ),
        None => (
            "Nothing here yet.\n\nPress c to switch lists or q to quit.".to_string(),
            None,
        ),
    };
    let selection = Paragraph::new(selection_text)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .block(panel_block("Selected"))
        .alignment(Alignment::Left);
    frame.render_widget(selection, details_chunks[0]);
    if let Some((ratio, label)) = gauge {
        let progress = Gauge::default()
            .block(panel_block("Progress"))
            .gauge_style(
                Style::default()
                    .fg(ACCENT)
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .label(label)
            .ratio(ratio);
        frame.render_widget(progress, details_chunks[1]);
    }

    let command_bar = Paragraph::new(action_selector_line(action))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(command_bar, chunks[2]);

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[3]);

    if let Some(confirm) = pending_unwatch {
        let popup_text = format!(
            "Mark as unwatched?\n\n{}\n\nThe saved position is removed as well.\n\n[y / Enter] Remove   [n / Esc] Cancel",
            truncate(&describe_content_key(&confirm.content_key), 56)
        );
        render_popup(frame, "Confirm Unwatch", &popup_text);
    } else if let Some(notice) = pending_notice {
        render_popup(frame, notice.title, &notice.message);
    }
}

fn render_popup(frame: &mut Frame, title: &'static str, text: &str) {
    let area = popup_rect_for_text(frame.area(), text);
    frame.render_widget(Clear, area);
    let popup = Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
                .title(title)
                .padding(Padding::new(2, 2, 1, 1)),
        );
    frame.render_widget(popup, area);
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn action_selector_line(current: TuiAction) -> Line<'static> {
    let pill = |action: TuiAction| {
        if action == current {
            Style::default()
                .bg(ACCENT)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .bg(Color::Rgb(72, 82, 96))
                .fg(Color::Rgb(230, 235, 242))
        }
    };
    let mut spans = Vec::new();
    for action in [TuiAction::Resume, TuiAction::Next, TuiAction::Previous] {
        spans.push(Span::styled(format!(" {} ", action.label()), pill(action)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(
        "  ↑/↓ move  ←/→ action  Enter run  c list  d unwatch  r reload  q quit",
        Style::default().fg(MUTED),
    ));
    Line::from(spans)
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Rgb(205, 165, 255))
    }
}

pub(crate) fn popup_rect_for_text(area: Rect, text: &str) -> Rect {
    let widest = text
        .lines()
        .map(|line| line.chars().count() as u16)
        .max()
        .unwrap_or(0);
    let line_count = text.lines().count() as u16;

    let available_width = area.width.saturating_sub(2).max(1);
    let width = widest
        .saturating_add(8)
        .clamp(40.min(available_width), 72.min(available_width));
    let available_height = area.height.saturating_sub(2).max(1);
    let height = line_count
        .saturating_add(4)
        .clamp(8.min(available_height), 18.min(available_height));

    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}
