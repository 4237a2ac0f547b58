use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::models::{Row, Table};
use crate::normalize::normalize_cell;

static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("hardcoded table selector is valid"));
static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("hardcoded row selector is valid"));

/// Parses the outer markup of one table into rows of normalized cells.
///
/// Rows keep document order and only rows owned by the outermost table are
/// read. Every `th`/`td` contributes a cell, empty ones included; rows
/// without any cell element are dropped. Blank input yields an empty table.
pub fn parse_table(markup: &str) -> Table {
    if markup.trim().is_empty() {
        return Vec::new();
    }

    // html5ever discards stray row/cell tags outside a table context.
    let document = if has_table_tag(markup) {
        Html::parse_fragment(markup)
    } else {
        Html::parse_fragment(&format!("<table>{markup}</table>"))
    };

    let Some(table) = document.select(&TABLE_SELECTOR).next() else {
        return Vec::new();
    };
    let table_id = table.id();

    table
        .select(&ROW_SELECTOR)
        .filter(|row| owning_table(*row).is_some_and(|owner| owner.id() == table_id))
        .filter_map(|row| {
            let cells = row_cells(row);
            (!cells.is_empty()).then_some(cells)
        })
        .collect()
}

/// Pads every row with empty cells up to the widest row.
pub fn into_rectangular(mut table: Table) -> Table {
    let width = column_count(&table);
    for row in &mut table {
        row.resize(width, String::new());
    }
    table
}

pub fn column_count(table: &[Row]) -> usize {
    table.iter().map(Vec::len).max().unwrap_or(0)
}

fn has_table_tag(markup: &str) -> bool {
    markup.to_ascii_lowercase().contains("<table")
}

fn owning_table(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}

fn row_cells(row: ElementRef<'_>) -> Row {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| normalize_cell(&cell.inner_html()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{column_count, into_rectangular, parse_table};

    #[test]
    fn bare_rows_parse_in_document_order() {
        let table = parse_table("<tr><td>A</td><td>B</td></tr><tr><td>C</td></tr>");
        assert_eq!(table, vec![vec!["A", "B"], vec!["C"]]);
    }

    #[test]
    fn rows_without_cells_are_dropped() {
        let table = parse_table("<table><tr></tr><tr><td>x</td></tr></table>");
        assert_eq!(table, vec![vec!["x"]]);
    }

    #[test]
    fn cells_carry_the_dom_serialization_of_entities() {
        let table =
            parse_table("<table><tr><td>&#233; &eacute; &quot;x&quot; &amp; &lt;b&gt;</td></tr></table>");
        assert_eq!(table, vec![vec!["é é \"x\" &amp; &lt;b&gt;"]]);
    }

    #[test]
    fn blank_input_is_empty_table() {
        assert!(parse_table("").is_empty());
        assert!(parse_table("   \n").is_empty());
    }

    #[test]
    fn pads_ragged_rows() {
        let table = vec![
            vec!["a".to_string()],
            vec!["b".to_string(), "c".to_string()],
        ];
        assert_eq!(column_count(&table), 2);
        let padded = into_rectangular(table);
        assert_eq!(padded, vec![vec!["a", ""], vec!["b", "c"]]);
    }
}
