//! Table formatting for CLI output

use comfy_table::{Cell, Color, ContentArrangement, Table as ComfyTable};

/// Table builder for CLI output
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TableBuilder {
    pub fn headers(mut self, headers: &[&str]) -> Self {
        self.headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn add_row(mut self, row: &[&str]) -> Self {
        self.rows.push(row.iter().map(|s| Cell::new(s)).collect());
        self
    }

    /// Row whose last cell is coloured green when `ok`, red otherwise.
    pub fn add_status_row(mut self, row: &[&str], status: &str, ok: bool) -> Self {
        let mut cells: Vec<Cell> = row.iter().map(|s| Cell::new(s)).collect();
        cells.push(Cell::new(status).fg(if ok { Color::Green } else { Color::Red }));
        self.rows.push(cells);
        self
    }

    #[must_use]
    pub fn build(self) -> Table {
        let mut table = ComfyTable::new();
        table
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(&self.headers);
        for row in self.rows {
            table.add_row(row);
        }
        Table { inner: table }
    }
}

/// Table for CLI output
#[derive(Debug, Clone)]
pub struct Table {
    inner: ComfyTable,
}

impl Table {
    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_renders_headers_and_rows() {
        let table = Table::builder()
            .headers(&["Pod", "Ready"])
            .add_status_row(&["es-0"], "1/1", true)
            .build();
        let rendered = table.to_string();
        assert!(rendered.contains("Pod"));
        assert!(rendered.contains("es-0"));
    }
}
