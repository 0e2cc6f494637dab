//! Footnotes and endnotes parts

use docxmill_ooxml::XmlElement;

use super::body::BodyReader;
use crate::document::{Note, NoteType};

/// Read every note of `note_type` from a notes part
///
/// Separator notes carry no content and are skipped.
pub fn read_notes(root: &XmlElement, note_type: NoteType, reader: &mut BodyReader<'_>) -> Vec<Note> {
    let tag = match note_type {
        NoteType::Footnote => "w:footnote",
        NoteType::Endnote => "w:endnote",
    };

    root.elements()
        .filter(|e| e.name == tag)
        .filter(|e| {
            !matches!(
                e.attribute("w:type"),
                Some("separator") | Some("continuationSeparator")
            )
        })
        .map(|e| Note {
            note_type,
            note_id: e.attribute("w:id").unwrap_or_default().to_string(),
            body: reader.read_elements(&e.children),
        })
        .collect()
}
