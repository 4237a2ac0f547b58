use pretty_assertions::assert_eq;

use table_sheet_sync::models::{Candidate, ResolvedBy};
use table_sheet_sync::{candidates_from_html, normalize_cell, parse_table, select_table};

#[test]
fn normalizer_output_never_has_markup_or_double_spaces() {
    let fragments = [
        "<b>Cotação</b>\n\n<small> (R$) </small>",
        "<div><p>a</p>   <p>b</p></div>",
        "x<<y>>z",
        "  <span\nclass='tip'>multi\nline</span>  ",
        "<>",
        "1 <  2 > 0",
        "\u{a0}nbsp\u{a0}\u{a0}run",
    ];

    for fragment in fragments {
        let cell = normalize_cell(fragment);
        assert!(!cell.contains('<') && !cell.contains('>'), "{fragment:?} -> {cell:?}");
        assert!(
            !cell.chars().zip(cell.chars().skip(1)).any(|(a, b)| a.is_whitespace() && b.is_whitespace()),
            "{fragment:?} -> {cell:?}"
        );
        assert_eq!(cell, cell.trim());
    }
}

#[test]
fn rows_and_cells_follow_document_order() {
    let table = parse_table("<tr><td>A</td><td>B</td></tr><tr><td>C</td></tr>");
    assert_eq!(table, vec![vec!["A", "B"], vec!["C"]]);
}

#[test]
fn empty_cells_are_kept_as_empty_strings() {
    let table = parse_table("<table><tr><td></td><td>x</td></tr><tr><td></td></tr></table>");
    assert_eq!(table, vec![vec!["", "x"], vec![""]]);
}

#[test]
fn header_and_data_cells_are_treated_alike() {
    let html = r##"
        <table id="resultado">
          <thead>
            <tr><th><a href="#" title="Código">Papel</a></th><th>Cotação</th></tr>
          </thead>
          <tbody>
            <tr>
              <td><span class="tips"><a href="detalhes.php?papel=ABCD11">ABCD11</a></span></td>
              <td>10,50</td>
            </tr>
            <tr></tr>
            <tr><td>EFGH3</td><td> 7,<b>01</b> </td></tr>
          </tbody>
        </table>
    "##;

    assert_eq!(
        parse_table(html),
        vec![
            vec!["Papel", "Cotação"],
            vec!["ABCD11", "10,50"],
            vec!["EFGH3", "7,01"],
        ]
    );
}

#[test]
fn row_count_matches_rows_with_cells() {
    let html = "<table>\
        <tr><td>1</td></tr>\
        <tr></tr>\
        <tr><th>2</th><td>3</td></tr>\
        <tr>   </tr>\
        <tr><td></td></tr>\
        </table>";
    assert_eq!(parse_table(html).len(), 3);
}

#[test]
fn nested_table_rows_stay_inside_their_cell() {
    let html = "<table>\
        <tr><td>outer</td><td><table><tr><td>inner</td></tr></table></td></tr>\
        </table>";
    assert_eq!(parse_table(html), vec![vec!["outer", "inner"]]);
}

#[test]
fn escaped_ampersand_survives_parsing_and_normalizing() {
    let html = "<table><tr><th>Empresa</th></tr><tr><td>Itaú &amp; Cia &#8211; ON</td></tr></table>";
    assert_eq!(
        parse_table(html),
        vec![vec!["Empresa"], vec!["Itaú &amp; Cia \u{2013} ON"]]
    );
}

#[test]
fn selector_prefers_marker_over_position() {
    let candidates = vec![
        Candidate::new("Foo bar", "<table id=\"x\"></table>"),
        Candidate::new("Papel coisa", "<table id=\"y\"></table>"),
    ];
    let selected = select_table(&candidates, "papel").expect("a table is selected");
    assert_eq!(selected.outer_html, "<table id=\"y\"></table>");
    assert_eq!(selected.index, 1);
    assert_eq!(selected.resolved_by, ResolvedBy::Marker);
}

#[test]
fn selector_falls_back_to_first_candidate() {
    let candidates = vec![
        Candidate::new("Menu", "<table id=\"first\"></table>"),
        Candidate::new("Rodapé", "<table id=\"second\"></table>"),
    ];
    let selected = select_table(&candidates, "papel").expect("fallback selection");
    assert_eq!(selected.outer_html, "<table id=\"first\"></table>");
    assert_eq!(selected.resolved_by, ResolvedBy::Fallback);
}

#[test]
fn selector_returns_none_for_empty_set() {
    assert_eq!(select_table(&[], "papel"), None);
}

#[test]
fn selector_match_is_case_insensitive_on_non_ascii() {
    let candidates = vec![
        Candidate::new("Nada", "<table id=\"a\"></table>"),
        Candidate::new("PREÇO ATUAL", "<table id=\"b\"></table>"),
    ];
    let selected = select_table(&candidates, "preço").expect("selection");
    assert_eq!(selected.index, 1);
}

#[test]
fn static_page_selection_and_parse_end_to_end() {
    let html = r"
        <html><body>
          <table class='menu'><tr><td>Início</td><td>Busca</td></tr></table>
          <table class='resultado'>
            <tr><th>Papel</th><th>Preço</th></tr>
            <tr><td>ABCD11</td><td>10,50</td></tr>
          </table>
        </body></html>
    ";

    let candidates = candidates_from_html(html);
    let selected = select_table(&candidates, "PAPEL").expect("selection");
    assert_eq!(selected.index, 1);
    assert_eq!(
        parse_table(&selected.outer_html),
        vec![vec!["Papel", "Preço"], vec!["ABCD11", "10,50"]]
    );
}
