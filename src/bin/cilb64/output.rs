use comfy_table::{presets, ContentArrangement, Table};
use serde::Serialize;

/// Print `data` as JSON (if `json`) or call `display_fn` for human-readable output.
pub fn print_output<T: Serialize>(
    data: &T,
    json: bool,
    display_fn: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if json {
        let json = serde_json::to_string_pretty(data)?;
        println!("{json}");
    } else {
        display_fn(data);
    }
    Ok(())
}

/// Bordered grid table backed by `comfy-table`.
pub struct GridWriter {
    table: Table,
}

impl GridWriter {
    /// Create a new `GridWriter` with the given column headers.
    pub fn new(headers: &[&str]) -> Self {
        let mut table = Table::new();
        table
            .load_preset(presets::ASCII_FULL)
            .set_content_arrangement(ContentArrangement::Disabled)
            .set_header(headers.to_vec());

        Self { table }
    }

    /// Add a row. Values are given in column order.
    pub fn row(&mut self, values: Vec<String>) {
        self.table.add_row(values);
    }

    /// Render the table.
    pub fn render(&self) -> String {
        self.table.to_string()
    }

    /// Print the table to stdout.
    pub fn print(&self) {
        println!("{}", self.render());
    }
}
