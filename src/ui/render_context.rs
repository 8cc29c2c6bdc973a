// Grid rendering context that holds everything one frame needs
// The renderer reads only this, never the grid itself

use crate::config::config::DisplayConfig;
use crate::state::grid::Grid;

/// One header cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub title: String,
    pub sortable: bool,
    /// Sort glyph suffix when this column is the sort key
    pub sort_indicator: Option<&'static str>,
    pub selected: bool,
}

impl HeaderCell {
    pub fn label(&self) -> String {
        format!("{}{}", self.title, self.sort_indicator.unwrap_or(""))
    }
}

/// A row slot inside the visible window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedRow {
    Loaded { position: usize, cells: Vec<String> },
    /// Not fetched yet (or its batch failed and awaits a retry)
    Pending { position: usize },
}

impl RenderedRow {
    pub fn position(&self) -> usize {
        match self {
            RenderedRow::Loaded { position, .. } | RenderedRow::Pending { position } => *position,
        }
    }
}

/// All the data needed to render a grid, collected in one place
#[derive(Debug, Clone)]
pub struct GridRenderContext {
    pub title: String,
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<RenderedRow>,

    /// Absolute index of the focused row
    pub focused_row: usize,
    pub selected_column: usize,

    /// "<N> rows loaded"
    pub footer: String,
    pub known_total: Option<usize>,
    /// Fetches are outstanding
    pub loading: bool,

    /// Filter input text; `None` when the grid is not filterable
    pub filter: Option<String>,
    /// Typed filter text still waiting on the debounce
    pub filter_pending: bool,

    pub status: Option<String>,
    pub show_row_numbers: bool,
}

impl GridRenderContext {
    /// Snapshot the grid for one frame
    pub fn from_grid(grid: &Grid, display: &DisplayConfig) -> Self {
        let config = grid.config();
        let sort = grid.sort();

        let headers = config
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| HeaderCell {
                title: column.title.clone(),
                sortable: column.sortable,
                sort_indicator: sort
                    .filter(|key| key.key == column.name)
                    .map(|key| display.sort_indicator(key.direction)),
                selected: index == grid.selected_column(),
            })
            .collect();

        let rows = grid
            .viewport()
            .visible_range(grid.cache().extent())
            .map(|position| match grid.row(position) {
                Some(row) => RenderedRow::Loaded {
                    position,
                    cells: config
                        .columns
                        .iter()
                        .map(|column| row.cell_text(&column.name))
                        .collect(),
                },
                None => RenderedRow::Pending { position },
            })
            .collect();

        let filter_controller = grid.sort_filter();
        Self {
            title: config.title.clone(),
            headers,
            rows,
            focused_row: grid.focused_row(),
            selected_column: grid.selected_column(),
            footer: grid.footer_text(),
            known_total: grid.known_total(),
            loading: grid.cache().has_in_flight(),
            filter: config
                .filterable
                .then(|| filter_controller.input_text().to_string()),
            filter_pending: filter_controller.has_pending_filter(),
            status: grid.status().map(str::to_string),
            show_row_numbers: display.show_row_numbers,
        }
    }

    /// Check if a given row is the focused row
    pub fn is_focused_row(&self, position: usize) -> bool {
        position == self.focused_row
    }

    /// Index of the focused row within `rows`, if it is visible
    pub fn focused_offset(&self) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.position() == self.focused_row)
    }
}
