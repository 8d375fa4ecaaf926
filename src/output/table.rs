//
//  bkt-cli
//  output/table.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Table rendering on top of `comfy-table`.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};

/// Rows that can be listed as a table.
pub trait TableOutput {
    /// Column headers.
    fn headers() -> Vec<&'static str>;

    /// One row, aligned with [`TableOutput::headers`].
    fn row(&self) -> Vec<String>;

    /// `(label, value)` pairs for a single-record view.
    fn fields(&self) -> Vec<(&'static str, String)> {
        Self::headers().into_iter().zip(self.row()).collect()
    }
}

/// Builder for a styled table.
pub struct TableBuilder {
    table: Table,
    color: bool,
}

impl TableBuilder {
    /// An empty table.
    pub fn new(color: bool) -> Self {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic);
        Self { table, color }
    }

    /// Sets the header row; cyan when color is on.
    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let color = self.color;
        let cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| {
                let cell = Cell::new(h.into());
                if color {
                    cell.fg(Color::Cyan)
                } else {
                    cell
                }
            })
            .collect();
        self.table.set_header(cells);
        self
    }

    /// Appends one row.
    pub fn row(mut self, cells: Vec<String>) -> Self {
        self.table.add_row(cells);
        self
    }

    /// Renders the table.
    pub fn render(self) -> String {
        self.table.to_string()
    }
}

/// Renders `records` as a table.
pub fn render_table<T: TableOutput>(records: &[T], color: bool) -> String {
    records
        .iter()
        .fold(TableBuilder::new(color).headers(T::headers()), |table, record| {
            table.row(record.row())
        })
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str, u32);

    impl TableOutput for Item {
        fn headers() -> Vec<&'static str> {
            vec!["NAME", "COUNT"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.0.to_string(), self.1.to_string()]
        }
    }

    #[test]
    fn test_render_table_contains_cells() {
        let rendered = render_table(&[Item("alpha", 1), Item("beta", 22)], false);
        assert!(rendered.contains("NAME"));
        assert!(rendered.contains("alpha"));
        assert!(rendered.contains("22"));
    }

    #[test]
    fn test_fields_zip_headers() {
        assert_eq!(
            Item("x", 3).fields(),
            vec![("NAME", "x".to_string()), ("COUNT", "3".to_string())]
        );
    }
}
