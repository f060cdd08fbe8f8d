use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

use crate::{CalendarDocument, Cell, Row, Table};

macro_rules! selector {
    ($query:expr) => {{
        static SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse($query).unwrap());
        &SELECTOR
    }};
}

/// Reads the tables of a document published to the web, such as the
/// embedded view of a shared word-processing document.
///
/// Cells come out once per grid position they cover: `colspan` repeats a
/// cell across its columns and `rowspan` repeats it in the rows below, the
/// same way merged cells are read from `.docx` files.
pub fn read_html<S: AsRef<str>>(s: S) -> CalendarDocument {
    let html = Html::parse_document(s.as_ref());

    let tables = html
        .select(selector!("table"))
        .filter(|table| enclosing_table(*table).is_none())
        .map(parse_table)
        .collect();

    CalendarDocument { tables }
}

fn enclosing_table(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "table")
}

fn parse_table(table: ElementRef) -> Table {
    let mut spans = RowSpans::default();

    let rows = table
        .select(selector!("tr"))
        .filter(|row| enclosing_table(*row).map(|parent| parent.id()) == Some(table.id()))
        .map(|row| spans.parse_row(row))
        .collect();

    Table { rows }
}

// Browsers clamp spans to these limits.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

fn span(cell: ElementRef, attr: &str, max: usize) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, max)
}

/// Cells carried down from earlier rows by `rowspan`, indexed by column.
#[derive(Default)]
struct RowSpans {
    carried: Vec<Option<(String, usize)>>,
}

impl RowSpans {
    fn parse_row(&mut self, row: ElementRef) -> Row {
        let mut cells = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"));

        let mut texts = Vec::new();
        loop {
            let column = texts.len();
            if let Some(text) = self.take_carried(column) {
                texts.push(text);
                continue;
            }

            let Some(cell) = cells.next() else {
                if !self.carries_from(column) {
                    break;
                }
                // A gap left of a cell carried down from above.
                texts.push(String::new());
                continue;
            };

            let text = cell_text(cell);
            let colspan = span(cell, "colspan", MAX_COLSPAN);
            let rowspan = span(cell, "rowspan", MAX_ROWSPAN);

            for offset in 0..colspan {
                if rowspan > 1 {
                    self.carry(column + offset, text.clone(), rowspan - 1);
                }
                texts.push(text.clone());
            }
        }

        Row {
            cells: texts.into_iter().map(Cell::new).collect(),
        }
    }

    fn take_carried(&mut self, column: usize) -> Option<String> {
        let slot = self.carried.get_mut(column)?;
        let (text, remaining) = slot.as_mut()?;
        let text = text.clone();

        *remaining -= 1;
        if *remaining == 0 {
            *slot = None;
        }
        Some(text)
    }

    fn carries_from(&self, column: usize) -> bool {
        self.carried.iter().skip(column).any(Option::is_some)
    }

    fn carry(&mut self, column: usize, text: String, rows: usize) {
        if self.carried.len() <= column {
            self.carried.resize(column + 1, None);
        }
        self.carried[column] = Some((text, rows));
    }
}

/// Block children become lines, like paragraphs in a word-processor cell.
fn cell_text(cell: ElementRef) -> String {
    let blocks = cell
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| matches!(child.value().name(), "p" | "div" | "li"))
        .map(inline_text)
        .collect::<Vec<_>>();

    if blocks.is_empty() {
        inline_text(cell)
    } else {
        blocks.join("\n")
    }
}

fn inline_text(element: ElementRef) -> String {
    let mut text = String::new();

    for node in element.descendants() {
        match node.value() {
            Node::Text(fragment) => text.push_str(fragment),
            Node::Element(child) if child.name() == "br" => text.push('\n'),
            _ => {}
        }
    }

    text
}
