use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::models::{Candidate, ResolvedBy, SelectedTable};

static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("hardcoded table selector is valid"));

/// Picks the first candidate whose visible text contains `marker`
/// (case-insensitive), falling back to the first candidate by position.
///
/// Returns `None` only for an empty candidate set.
pub fn select_table(candidates: &[Candidate], marker: &str) -> Option<SelectedTable> {
    let needle = marker.to_lowercase();

    let matched = candidates.iter().position(|candidate| {
        candidate
            .visible_text
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(&needle))
    });

    let (index, resolved_by) = match matched {
        Some(index) => (index, ResolvedBy::Marker),
        None if !candidates.is_empty() => (0, ResolvedBy::Fallback),
        None => return None,
    };

    Some(SelectedTable {
        index,
        outer_html: candidates[index].outer_html.clone(),
        resolved_by,
    })
}

/// Builds the candidate set from static page markup, one entry per `table`
/// element in document order.
pub fn candidates_from_html(html: &str) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    document
        .select(&TABLE_SELECTOR)
        .map(|table| {
            let text = table
                .text()
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Candidate::new(text, table.html())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{candidates_from_html, select_table};
    use crate::models::{Candidate, ResolvedBy};

    #[test]
    fn skips_unreadable_candidates() {
        let candidates = vec![
            Candidate::unreadable("<table id=\"a\"></table>"),
            Candidate::new("PAPEL", "<table id=\"b\"></table>"),
        ];
        let selected = select_table(&candidates, "papel").expect("selection");
        assert_eq!(selected.index, 1);
        assert_eq!(selected.resolved_by, ResolvedBy::Marker);
    }

    #[test]
    fn collects_tables_in_document_order() {
        let html = r"
            <html><body>
              <table id='menu'><tr><td>Home</td></tr></table>
              <div><table id='data'><tr><th>Papel</th></tr></table></div>
            </body></html>
        ";
        let candidates = candidates_from_html(html);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].visible_text.as_deref(), Some("Home"));
        assert_eq!(candidates[1].visible_text.as_deref(), Some("Papel"));
        assert!(candidates[1].outer_html.contains("id=\"data\""));
    }
}
