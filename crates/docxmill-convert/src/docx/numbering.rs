//! List definitions from `word/numbering.xml`

use std::collections::HashMap;

use docxmill_ooxml::XmlElement;

use super::styles::Styles;
use crate::document::NumberingLevel;

#[derive(Debug, Clone, Default)]
struct AbstractNum {
    levels: HashMap<usize, NumberingLevel>,
    num_style_link: Option<String>,
}

/// Numbering instances and their abstract definitions
#[derive(Debug, Clone, Default)]
pub struct Numbering {
    /// numId -> abstractNumId
    nums: HashMap<String, String>,
    abstract_nums: HashMap<String, AbstractNum>,
    levels_by_paragraph_style_id: HashMap<String, NumberingLevel>,
    /// Numbering style id -> numId, for `w:numStyleLink`
    style_links: HashMap<String, String>,
}

impl Numbering {
    /// Read a numbering part; `styles` resolves numbering-style links
    pub fn read(root: &XmlElement, styles: &Styles) -> Self {
        let mut numbering = Numbering::default();

        for element in root.elements_named("w:abstractNum") {
            let Some(id) = element.attribute("w:abstractNumId") else {
                continue;
            };
            let mut abstract_num = AbstractNum {
                levels: HashMap::new(),
                num_style_link: element
                    .first_or_empty("w:numStyleLink")
                    .attribute("w:val")
                    .map(str::to_string),
            };

            for level in element.elements().filter(|e| e.name == "w:lvl") {
                let Some(level_index) = level
                    .attribute("w:ilvl")
                    .and_then(|v| v.parse::<usize>().ok())
                else {
                    continue;
                };
                let num_fmt = level.first_or_empty("w:numFmt").attribute("w:val");
                let numbering_level = NumberingLevel {
                    level_index,
                    is_ordered: num_fmt != Some("bullet"),
                };
                if let Some(style_id) = level.first_or_empty("w:pStyle").attribute("w:val") {
                    numbering
                        .levels_by_paragraph_style_id
                        .insert(style_id.to_string(), numbering_level);
                }
                abstract_num.levels.insert(level_index, numbering_level);
            }

            if let Some(link) = &abstract_num.num_style_link {
                if let Some(num_id) = styles
                    .find_numbering_style_by_id(link)
                    .and_then(|s| s.num_id.clone())
                {
                    numbering.style_links.insert(link.clone(), num_id);
                }
            }
            numbering.abstract_nums.insert(id.to_string(), abstract_num);
        }

        for element in root.elements_named("w:num") {
            let num_id = element.attribute("w:numId");
            let abstract_num_id = element
                .first("w:abstractNumId")
                .and_then(|e| e.attribute("w:val"));
            if let (Some(num_id), Some(abstract_num_id)) = (num_id, abstract_num_id) {
                numbering
                    .nums
                    .insert(num_id.to_string(), abstract_num_id.to_string());
            }
        }

        numbering
    }

    /// Level `level` of numbering instance `num_id`
    pub fn find_level(&self, num_id: &str, level: usize) -> Option<NumberingLevel> {
        let mut num_id = num_id;
        // numStyleLink chains are short; the bound guards against cycles
        for _ in 0..8 {
            let abstract_num = self.abstract_nums.get(self.nums.get(num_id)?)?;
            match &abstract_num.num_style_link {
                None => return abstract_num.levels.get(&level).copied(),
                Some(link) => num_id = self.style_links.get(link)?,
            }
        }
        None
    }

    /// The level a paragraph style is attached to, if any
    pub fn find_level_by_paragraph_style_id(&self, style_id: &str) -> Option<NumberingLevel> {
        self.levels_by_paragraph_style_id.get(style_id).copied()
    }
}
