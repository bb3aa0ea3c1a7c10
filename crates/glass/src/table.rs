//! Tabular result decoration
//!
//! Commands that reshape backend output into rows hand the grid to a
//! [`TableDecorator`], which renders an HTML fragment through the
//! `templates/table.html` template. Cell and header text is escaped;
//! `headline`, `before` and `after` are trusted HTML fragments supplied by the
//! command itself.

use askama::Template;
use regex::Regex;

/// Highlight colors used as semantic signals (e.g. red for failed rows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Black,
}

impl Color {
    pub fn hex(&self) -> &'static str {
        match self {
            Self::White => "#FFFFFF",
            Self::Red => "#FF0000",
            Self::Green => "#00FF00",
            Self::Blue => "#0000FF",
            Self::Yellow => "#FFFF00",
            Self::Black => "#000000",
        }
    }
}

/// One table cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub value: String,
    pub color: Color,
}

impl Cell {
    pub fn new(value: impl Into<String>, color: Color) -> Self {
        Self {
            value: value.into(),
            color,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::new(value, Color::White)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::new(value, Color::White)
    }
}

impl<S: Into<String>> From<(S, Color)> for Cell {
    fn from((value, color): (S, Color)) -> Self {
        Self::new(value, color)
    }
}

/// Renders a grid of cells as an HTML table
#[derive(Debug, Clone, Default, Template)]
#[template(path = "table.html")]
pub struct TableDecorator {
    rows: Vec<Vec<Cell>>,
    header: Vec<String>,
    headline: Option<String>,
    before: Option<String>,
    after: Option<String>,
}

impl TableDecorator {
    pub fn new(rows: Vec<Vec<Cell>>, header: Vec<String>) -> Self {
        Self {
            rows,
            header,
            ..Default::default()
        }
    }

    /// Caption rendered above the table
    pub fn with_headline(mut self, headline: &str) -> Self {
        self.headline = Some(headline.to_string());
        self
    }

    /// HTML fragment placed before the table
    pub fn with_before(mut self, before: &str) -> Self {
        self.before = Some(before.to_string());
        self
    }

    /// HTML fragment placed after the table
    pub fn with_after(mut self, after: &str) -> Self {
        self.after = Some(after.to_string());
        self
    }

    pub fn decorate(&self) -> askama::Result<String> {
        self.render()
    }
}

/// Table from whitespace-separated output; the first non-empty line is the
/// header. Lines matching `highlight` are painted red.
pub fn columns_table(output: &str, highlight: Option<&Regex>) -> TableDecorator {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());

    let header: Vec<String> = lines
        .next()
        .map(|l| l.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let rows: Vec<Vec<Cell>> = lines
        .map(|line| {
            let color = match highlight {
                Some(re) if re.is_match(line) => Color::Red,
                _ => Color::White,
            };
            line.split_whitespace().map(|c| Cell::new(c, color)).collect()
        })
        .collect();

    TableDecorator::new(rows, header)
}
