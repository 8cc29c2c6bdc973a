// Pure grid rendering function that depends only on GridRenderContext
// This is completely decoupled from the grid engine and the app loop

use crate::ui::render_context::{GridRenderContext, RenderedRow};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};

/// Widest a column gets regardless of content
const MAX_COLUMN_WIDTH: u16 = 40;
const ROW_NUMBER_WIDTH: u16 = 6;

/// Screen regions of one grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub filter: Option<Rect>,
    pub table: Rect,
    pub footer: Rect,
}

impl GridLayout {
    pub fn new(area: Rect, filterable: bool) -> Self {
        let mut constraints = Vec::with_capacity(3);
        if filterable {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(4));
        constraints.push(Constraint::Length(1));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        if filterable {
            Self {
                filter: Some(chunks[0]),
                table: chunks[1],
                footer: chunks[2],
            }
        } else {
            Self {
                filter: None,
                table: chunks[0],
                footer: chunks[1],
            }
        }
    }

    /// Data rows that fit inside the table (borders and header excluded)
    pub fn visible_rows(&self) -> usize {
        self.table.height.saturating_sub(3).max(1) as usize
    }

    /// Screen row of the header line
    pub fn header_y(&self) -> u16 {
        self.table.y + 1
    }

    /// Absolute row position under screen row `y`, if it is a data row
    pub fn row_at(&self, y: u16, scroll_offset: usize) -> Option<usize> {
        let first = self.table.y + 2;
        let last = self.table.y + self.table.height.saturating_sub(1);
        (y >= first && y < last).then(|| scroll_offset + (y - first) as usize)
    }
}

/// Render the grid: filter input, table and footer
pub fn render_grid(f: &mut Frame, area: Rect, ctx: &GridRenderContext) {
    let layout = GridLayout::new(area, ctx.filter.is_some());

    if let (Some(filter_area), Some(filter)) = (layout.filter, ctx.filter.as_ref()) {
        render_filter(f, filter_area, filter, ctx.filter_pending);
    }
    render_table(f, layout.table, ctx);
    render_footer(f, layout.footer, ctx);
}

fn render_filter(f: &mut Frame, area: Rect, text: &str, pending: bool) {
    let title = if pending { "Filter (typing…)" } else { "Filter" };
    let input = Paragraph::new(text.to_string())
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(input, area);
}

/// Render the table portion of the grid
pub fn render_table(f: &mut Frame, area: Rect, ctx: &GridRenderContext) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(ctx.title.clone());

    // Nothing resident yet
    if ctx.rows.is_empty() {
        let message = if ctx.loading {
            "Loading…"
        } else {
            "No rows"
        };
        let empty = Paragraph::new(message)
            .block(block)
            .style(Style::default().fg(Color::Yellow));
        f.render_widget(empty, area);
        return;
    }

    let header = build_header_row(ctx);
    let rows = build_data_rows(ctx);
    let widths: Vec<Constraint> = calculate_column_widths(ctx)
        .into_iter()
        .map(Constraint::Length)
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default().with_selected(ctx.focused_offset());
    f.render_stateful_widget(table, area, &mut state);
}

/// Build the header row with sort indicators and column selection
fn build_header_row(ctx: &GridRenderContext) -> Row<'static> {
    let mut header_cells: Vec<Cell> = Vec::new();

    // Add row number header if enabled
    if ctx.show_row_numbers {
        header_cells.push(
            Cell::from("#").style(
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
        );
    }

    for header in &ctx.headers {
        let mut style = if header.sortable {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        if header.selected {
            // Current column gets yellow text
            style = style.fg(Color::Yellow).add_modifier(Modifier::UNDERLINED);
        }

        header_cells.push(Cell::from(header.label()).style(style));
    }

    Row::new(header_cells)
}

/// Build the data rows, pending slots render as placeholders
fn build_data_rows(ctx: &GridRenderContext) -> Vec<Row<'static>> {
    ctx.rows
        .iter()
        .map(|row| {
            let mut cells: Vec<Cell> = Vec::new();

            if ctx.show_row_numbers {
                cells.push(
                    Cell::from((row.position() + 1).to_string())
                        .style(Style::default().fg(Color::DarkGray)),
                );
            }

            match row {
                RenderedRow::Loaded { cells: values, .. } => {
                    for (col_idx, value) in values.iter().enumerate() {
                        let mut cell = Cell::from(value.clone());
                        if col_idx == ctx.selected_column && !ctx.is_focused_row(row.position()) {
                            cell = cell.style(Style::default().bg(Color::Rgb(50, 50, 50)));
                        }
                        cells.push(cell);
                    }
                }
                RenderedRow::Pending { .. } => {
                    cells.extend(ctx.headers.iter().map(|_| {
                        Cell::from("…").style(Style::default().fg(Color::DarkGray))
                    }));
                }
            }

            Row::new(cells)
        })
        .collect()
}

/// Column widths from header and visible cell lengths, row numbers first
pub fn calculate_column_widths(ctx: &GridRenderContext) -> Vec<u16> {
    let mut widths: Vec<u16> = Vec::with_capacity(ctx.headers.len() + 1);
    if ctx.show_row_numbers {
        widths.push(ROW_NUMBER_WIDTH);
    }

    for (col_idx, header) in ctx.headers.iter().enumerate() {
        let widest_cell = ctx
            .rows
            .iter()
            .filter_map(|row| match row {
                RenderedRow::Loaded { cells, .. } => cells.get(col_idx),
                RenderedRow::Pending { .. } => None,
            })
            .map(|cell| cell.chars().count())
            .max()
            .unwrap_or(0);
        let width = widest_cell.max(header.label().chars().count()).max(3);
        widths.push((width as u16).min(MAX_COLUMN_WIDTH));
    }
    widths
}

/// Column index under screen column `x` of the header line
pub fn column_at(layout: &GridLayout, ctx: &GridRenderContext, x: u16) -> Option<usize> {
    let mut left = layout.table.x + 1;
    let widths = calculate_column_widths(ctx);
    let skip = usize::from(ctx.show_row_numbers);

    for (index, width) in widths.iter().enumerate() {
        let right = left + width;
        if x >= left && x < right {
            return index.checked_sub(skip);
        }
        left = right + 1;
    }
    None
}

fn render_footer(f: &mut Frame, area: Rect, ctx: &GridRenderContext) {
    let mut spans = vec![Span::styled(
        ctx.footer.clone(),
        Style::default().fg(Color::Green),
    )];

    if let Some(total) = ctx.known_total {
        spans.push(Span::raw(format!(" | {} total", total)));
    }
    if ctx.loading {
        spans.push(Span::styled(
            " | loading…",
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(status) = &ctx.status {
        spans.push(Span::styled(
            format!(" | {}", status),
            Style::default().fg(Color::Red),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::render_context::HeaderCell;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn context() -> GridRenderContext {
        GridRenderContext {
            title: "Items".to_string(),
            headers: vec![
                HeaderCell {
                    title: "Name".to_string(),
                    sortable: true,
                    sort_indicator: Some(" ▲"),
                    selected: true,
                },
                HeaderCell {
                    title: "Value".to_string(),
                    sortable: false,
                    sort_indicator: None,
                    selected: false,
                },
            ],
            rows: vec![
                RenderedRow::Loaded {
                    position: 0,
                    cells: vec!["Item 1".to_string(), "10".to_string()],
                },
                RenderedRow::Pending { position: 1 },
            ],
            focused_row: 0,
            selected_column: 0,
            footer: "1 rows loaded".to_string(),
            known_total: None,
            loading: true,
            filter: Some("Item".to_string()),
            filter_pending: false,
            status: None,
            show_row_numbers: false,
        }
    }

    fn render(ctx: &GridRenderContext) -> String {
        let backend = TestBackend::new(60, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| render_grid(f, f.area(), ctx))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|line| line.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_renders_headers_rows_and_footer() {
        let screen = render(&context());
        assert!(screen.contains("Items"));
        assert!(screen.contains("Name ▲"));
        assert!(screen.contains("Item 1"));
        assert!(screen.contains("1 rows loaded"));
        assert!(screen.contains("Filter"));
    }

    #[test]
    fn test_no_filter_input_when_not_filterable() {
        let mut ctx = context();
        ctx.filter = None;
        let screen = render(&ctx);
        assert!(!screen.contains("Filter"));
    }

    #[test]
    fn test_loading_placeholder() {
        let mut ctx = context();
        ctx.rows.clear();
        assert!(render(&ctx).contains("Loading"));
    }

    #[test]
    fn test_layout_rows_and_hit_testing() {
        let layout = GridLayout::new(Rect::new(0, 0, 60, 20), true);
        assert_eq!(layout.table, Rect::new(0, 3, 60, 16));
        assert_eq!(layout.visible_rows(), 13);
        assert_eq!(layout.header_y(), 4);
        assert_eq!(layout.row_at(5, 100), Some(100));
        assert_eq!(layout.row_at(4, 100), None);

        let ctx = context();
        // "Name ▲" is 6 wide and starts inside the left border
        assert_eq!(column_at(&layout, &ctx, 1), Some(0));
        assert_eq!(column_at(&layout, &ctx, 8), Some(1));
        assert_eq!(column_at(&layout, &ctx, 0), None);
    }
}
