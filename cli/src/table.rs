use core_types::{GridInfo, Row};
use serde_json::Value;
use service::renderer::GridRenderer;

/// Prints preview grids to stdout as plain text tables.
#[derive(Debug, Default)]
pub struct TextGridRenderer;

impl GridRenderer for TextGridRenderer {
    fn render(&self, sheet_index: usize, grid: &GridInfo) {
        println!("\nSheet {}:", sheet_index);
        print!("{}", format_table(grid));
    }

    fn clear(&self) {
        println!("\n(no preview available)");
    }
}

fn cell(row: &Row, name: &str) -> String {
    match row.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn format_table(grid: &GridInfo) -> String {
    let headers: Vec<String> = grid
        .fields
        .iter()
        .map(|f| format!("{} ({})", f.name, f.logical_type))
        .collect();
    let rows: Vec<Vec<String>> = grid
        .data
        .iter()
        .map(|row| grid.fields.iter().map(|f| cell(row, &f.name)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let line = |values: &[String]| {
        let cells: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect();
        format!("| {} |\n", cells.join(" | "))
    };
    let separator = format!(
        "+{}+\n",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut out = separator.clone();
    out.push_str(&line(&headers));
    out.push_str(&separator);
    for row in &rows {
        out.push_str(&line(row));
    }
    out.push_str(&separator);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::FieldDescriptor;
    use serde_json::json;

    #[test]
    fn test_format_table_aligns_columns() {
        let data = vec![
            json!({"name": "Alice", "age": 31}).as_object().cloned().unwrap(),
            json!({"name": "Bob", "age": null}).as_object().cloned().unwrap(),
        ];
        let fields = vec![
            FieldDescriptor {
                name: "name".to_string(),
                logical_type: "STRING".to_string(),
            },
            FieldDescriptor {
                name: "age".to_string(),
                logical_type: "INTEGER".to_string(),
            },
        ];

        let table = format_table(&GridInfo::new(data, fields));
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[1], "| name (STRING) | age (INTEGER) |");
        assert_eq!(lines[3], "| Alice         | 31            |");
        assert_eq!(lines[4], "| Bob           |               |");
        assert_eq!(lines.len(), 6);
    }
}
