use std::fmt::Write;

use unicode_width::UnicodeWidthStr;

/// Terminal columns taken by `text`; wide characters count as two.
pub fn text_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Left-aligned plain text table used by the human-readable summaries.
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    pub indent: usize,
    pub gap: usize,
}

impl TextTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            indent: 2,
            gap: 2,
        }
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Missing cells render empty, extra cells are dropped.
    pub fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_widths(&self) -> Vec<usize> {
        (0..self.headers.len())
            .map(|i| {
                self.rows
                    .iter()
                    .map(|r| text_width(&r[i]))
                    .chain(std::iter::once(text_width(&self.headers[i])))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let widths = self.column_widths();
        let mut out = String::new();

        self.write_line(&mut out, &self.headers, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        self.write_line(&mut out, &rule, &widths);
        for row in &self.rows {
            self.write_line(&mut out, row, &widths);
        }
        out
    }

    fn write_line(&self, out: &mut String, cells: &[String], widths: &[usize]) {
        let mut line = " ".repeat(self.indent);
        for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
            line.push_str(cell);
            if i + 1 < widths.len() {
                let pad = width - text_width(cell) + self.gap;
                line.push_str(&" ".repeat(pad));
            }
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_width() {
        assert_eq!(text_width("User"), 4);
    }

    #[test]
    fn test_wide_table_names() {
        assert_eq!(text_width("注文"), 4);
        assert_eq!(text_width("orders_注文"), 11);
        assert_eq!(text_width("café"), 4);
    }

    #[test]
    fn test_table_alignment() {
        let mut table = TextTable::new(["#", "Table", "Depends on"]);
        table.add_row(["1", "users", ""]);
        table.add_row(["2", "posts", "users"]);
        assert_eq!(
            table.render(),
            "  #  Table  Depends on\n  -  -----  ----------\n  1  users\n  2  posts  users\n"
        );
    }

    #[test]
    fn test_table_aligns_wide_characters() {
        let mut table = TextTable::new(["Name", "Type"]).with_indent(0);
        table.add_row(["ユーザー", "String"]);
        table.add_row(["id", "Integer"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[2], "ユーザー  String");
        assert_eq!(lines[3], "id        Integer");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = TextTable::new(["a", "b"]);
        table.add_row(["x"]);
        assert!(!table.is_empty());
        assert!(table.render().ends_with("  x\n"));
    }
}
