//! Style definitions from `word/styles.xml`

use std::collections::HashMap;

use docxmill_ooxml::XmlElement;

/// A paragraph, character or table style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    pub style_id: String,
    pub name: Option<String>,
    /// Paragraph justification (`w:jc`)
    pub alignment: Option<String>,
}

/// A numbering style, which only points at a numbering instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingStyle {
    pub num_id: Option<String>,
}

/// Styles of a document, keyed by style id per style type
#[derive(Debug, Clone, Default)]
pub struct Styles {
    paragraph: HashMap<String, Style>,
    character: HashMap<String, Style>,
    table: HashMap<String, Style>,
    numbering: HashMap<String, NumberingStyle>,
}

impl Styles {
    /// Read every `w:style` of a styles part
    pub fn read(root: &XmlElement) -> Self {
        let mut styles = Styles::default();

        for element in root.elements_named("w:style") {
            let Some(style_id) = element.attribute("w:styleId") else {
                continue;
            };
            let style_type = element.attribute("w:type").unwrap_or_default();

            if style_type == "numbering" {
                let num_id = element
                    .first_or_empty("w:pPr")
                    .first_or_empty("w:numPr")
                    .first_or_empty("w:numId")
                    .attribute("w:val")
                    .map(str::to_string);
                styles
                    .numbering
                    .insert(style_id.to_string(), NumberingStyle { num_id });
                continue;
            }

            let style = Style {
                style_id: style_id.to_string(),
                name: element
                    .first("w:name")
                    .and_then(|n| n.attribute("w:val"))
                    .map(str::to_string),
                alignment: element
                    .first_or_empty("w:pPr")
                    .first_or_empty("w:jc")
                    .attribute("w:val")
                    .map(str::to_string),
            };
            let target = match style_type {
                "paragraph" => &mut styles.paragraph,
                "character" => &mut styles.character,
                "table" => &mut styles.table,
                _ => continue,
            };
            target.insert(style_id.to_string(), style);
        }

        styles
    }

    pub fn find_paragraph_style_by_id(&self, style_id: &str) -> Option<&Style> {
        self.paragraph.get(style_id)
    }

    pub fn find_character_style_by_id(&self, style_id: &str) -> Option<&Style> {
        self.character.get(style_id)
    }

    pub fn find_table_style_by_id(&self, style_id: &str) -> Option<&Style> {
        self.table.get(style_id)
    }

    pub fn find_numbering_style_by_id(&self, style_id: &str) -> Option<&NumberingStyle> {
        self.numbering.get(style_id)
    }
}
