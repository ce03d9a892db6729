//! Column-aligned table output

/// Render rows as a column-aligned table under `headers`.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let num_cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_line(headers.iter().copied(), &widths));
    for row in rows {
        lines.push(render_line(row.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

/// Print rows as a column-aligned table with headers.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", render_table(headers, rows));
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .enumerate()
        .map(|(i, cell)| {
            let w = widths.get(i).copied().unwrap_or(0);
            format!("{:<width$}", cell, width = w)
        })
        .collect();
    padded.join("  ").trim_end().to_string()
}
