use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::models::Table;

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static HEADER_CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());

/// Pull every `<table>` out of the markup as headers + row-major cells.
///
/// A malformed table (no rows at all) is logged and skipped; it never
/// aborts extraction of the surrounding tables.
pub fn extract(page_id: &str, markup: &str) -> Vec<Table> {
    if markup.trim().is_empty() {
        return Vec::new();
    }

    let document = Html::parse_document(markup);
    let mut tables = Vec::new();

    for table in document.select(&TABLE_SEL) {
        match parse_table(table) {
            Some(parsed) => tables.push(parsed),
            None => warn!("Skipping malformed table on page {}", page_id),
        }
    }

    tables
}

fn parse_table(table: ElementRef) -> Option<Table> {
    let rows: Vec<Vec<String>> = table
        .select(&ROW_SEL)
        .map(|row| row.select(&CELL_SEL).map(cell_text).collect())
        .collect();

    if rows.is_empty() {
        return None;
    }

    let first_row_is_header = table
        .select(&ROW_SEL)
        .next()
        .map(|row| row.select(&HEADER_CELL_SEL).next().is_some())
        .unwrap_or(false);

    let (headers, data) = if first_row_is_header {
        let mut iter = rows.into_iter();
        let headers = iter.next().unwrap_or_default();
        (headers, iter.collect::<Vec<_>>())
    } else {
        // No header row: positional column-index labels, sized by the
        // widest row so ragged data still gets a label per column.
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let headers = (0..width).map(|i| i.to_string()).collect();
        (headers, rows)
    };

    let shape = (data.len(), headers.len());
    Some(Table {
        headers,
        data,
        shape,
    })
}

fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
