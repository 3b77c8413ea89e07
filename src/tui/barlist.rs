use ratatui::prelude::*;

use crate::common::format::{format_size, truncate};
use crate::scanner::spacelens::SpaceLensNode;

/// Longest name column before names are truncated
const MAX_NAME_WIDTH: usize = 30;
/// Narrowest bar drawn, whatever the terminal width
const MIN_BAR_WIDTH: usize = 10;
/// Prefix, two gaps and the size column
const FIXED_COLUMNS: usize = 16;

fn display_name(node: &SpaceLensNode) -> String {
    if node.is_dir {
        format!("{}/", node.name)
    } else {
        node.name.clone()
    }
}

fn bar_color(ratio: f64) -> Color {
    if ratio >= 0.75 {
        Color::Red
    } else if ratio >= 0.40 {
        Color::Indexed(214)
    } else {
        Color::Green
    }
}

/// Render nodes as one bar per line, ncdu style.
///
/// Only rows `scroll..scroll + height` are built, so the cost follows the
/// window size rather than the number of nodes. When rows are hidden a
/// `[a-b of n]` indicator line is appended.
pub fn bar_list_lines(
    nodes: &[SpaceLensNode],
    width: usize,
    height: usize,
    cursor: usize,
    scroll: usize,
) -> Vec<Line<'static>> {
    if nodes.is_empty() {
        return vec![Line::from("  Empty directory.")];
    }

    let max_size = nodes.iter().map(|n| n.size).max().unwrap_or(0).max(1);
    let start = scroll.min(nodes.len());
    let end = (start + height).min(nodes.len());
    let window = &nodes[start..end];

    let name_width = window
        .iter()
        .map(|n| display_name(n).chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_NAME_WIDTH);
    let bar_width = width
        .saturating_sub(name_width + FIXED_COLUMNS)
        .max(MIN_BAR_WIDTH);

    let mut lines = Vec::with_capacity(window.len() + 1);
    for (offset, node) in window.iter().enumerate() {
        let index = start + offset;
        let ratio = node.size as f64 / max_size as f64;
        let mut filled = (ratio * bar_width as f64) as usize;
        if filled == 0 && node.size > 0 {
            filled = 1;
        }
        let empty = bar_width.saturating_sub(filled);

        let selected = index == cursor;
        let prefix = if selected { "> " } else { "  " };
        let name = truncate(&display_name(node), name_width);
        let text_style = if selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        lines.push(Line::from(vec![
            Span::styled(prefix, text_style),
            Span::styled("█".repeat(filled), Style::default().fg(bar_color(ratio))),
            Span::styled("░".repeat(empty), Style::default().fg(Color::DarkGray)),
            Span::styled(format!("  {:<width$}", name, width = name_width), text_style),
            Span::styled(format!(" {:>10}", format_size(node.size)), text_style),
        ]));
    }

    if nodes.len() > height {
        lines.push(Line::styled(
            format!("  [{}-{} of {}]", start + 1, end, nodes.len()),
            Style::default().fg(Color::DarkGray),
        ));
    }

    lines
}
