//! Plain-text extraction

use crate::document::{Document, Element};

/// Concatenated text of the body; every paragraph ends with a blank line
pub fn document_to_raw_text(document: &Document) -> String {
    let mut out = String::new();
    for element in &document.children {
        write_raw_text(element, &mut out);
    }
    out
}

fn write_raw_text(element: &Element, out: &mut String) {
    match element {
        Element::Text(value) => out.push_str(value),
        Element::Tab => out.push('\t'),
        other => {
            for child in other.children() {
                write_raw_text(child, out);
            }
            if matches!(other, Element::Paragraph(_)) {
                out.push_str("\n\n");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Paragraph, Run, Table, TableCell, TableRow};

    #[test]
    fn test_paragraphs_are_separated() {
        let document = Document {
            children: vec![
                Element::Paragraph(Paragraph::new(vec![Element::Run(Run::new(vec![
                    Element::text("one"),
                    Element::Tab,
                    Element::text("two"),
                ]))])),
                Element::Table(Table {
                    children: vec![Element::TableRow(TableRow {
                        children: vec![Element::TableCell(TableCell::new(vec![
                            Element::Paragraph(Paragraph::new(vec![Element::text("cell")])),
                        ]))],
                        is_header: false,
                    })],
                    style_id: None,
                    style_name: None,
                }),
            ],
            ..Document::default()
        };
        assert_eq!(document_to_raw_text(&document), "one\ttwo\n\ncell\n\n");
    }
}
