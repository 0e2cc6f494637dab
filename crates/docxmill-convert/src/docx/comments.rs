//! Comments part

use docxmill_ooxml::XmlElement;

use super::body::BodyReader;
use crate::document::Comment;

/// Read every `w:comment`; blank author fields become `None`
pub fn read_comments(root: &XmlElement, reader: &mut BodyReader<'_>) -> Vec<Comment> {
    root.elements()
        .filter(|e| e.name == "w:comment")
        .map(|e| {
            let optional = |name: &str| {
                e.attribute(name)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };
            Comment {
                comment_id: e.attribute("w:id").unwrap_or_default().to_string(),
                author_name: optional("w:author"),
                author_initials: optional("w:initials"),
                body: reader.read_elements(&e.children),
            }
        })
        .collect()
}
