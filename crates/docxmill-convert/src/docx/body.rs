//! WordprocessingML body reader
//!
//! Walks the children of `w:body` (or a note, or a comment) and builds the
//! document model. Anything that cannot be represented is dropped with a
//! warning; the reader itself never fails.

use std::collections::HashMap;
use std::sync::OnceLock;

use docxmill_ooxml::paths::{replace_fragment, uri_to_zip_entry_name};
use docxmill_ooxml::{ContentTypes, OoxmlArchive, Relationships, XmlElement, XmlNode};
use regex::Regex;
use tracing::trace;

use super::numbering::Numbering;
use super::styles::{Style, Styles};
use crate::document::{
    BookmarkStart, BreakType, CommentReference, Element, Hyperlink, Image, NoteReference, NoteType,
    NumberingLevel, Paragraph, ParagraphIndent, Run, Table, TableCell, TableRow,
    VerticalAlignment,
};
use crate::results::Message;

const SUPPORTED_IMAGE_TYPES: [&str; 5] = [
    "image/png",
    "image/gif",
    "image/jpeg",
    "image/svg+xml",
    "image/tiff",
];

const IGNORED_ELEMENTS: [&str; 20] = [
    "office-word:wrap",
    "v:shadow",
    "v:shapetype",
    "w:annotationRef",
    "w:bookmarkEnd",
    "w:sectPr",
    "w:proofErr",
    "w:lastRenderedPageBreak",
    "w:commentRangeStart",
    "w:commentRangeEnd",
    "w:del",
    "w:footnoteRef",
    "w:endnoteRef",
    "w:pPr",
    "w:rPr",
    "w:tblPr",
    "w:tblGrid",
    "w:trPr",
    "w:tcPr",
    "w:permStart",
];

/// Elements whose children are read in their place
const TRANSPARENT_ELEMENTS: [&str; 10] = [
    "w:ins",
    "w:object",
    "w:smartTag",
    "w:drawing",
    "w:pict",
    "v:roundrect",
    "v:shape",
    "v:textbox",
    "w:txbxContent",
    "w:fldSimple",
];

fn external_hyperlink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s*HYPERLINK "(.*)""#).unwrap())
}

fn internal_hyperlink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s*HYPERLINK\s+\\l\s+"(.*)""#).unwrap())
}

/// State of a `w:fldChar` field between `begin` and `end`
#[derive(Debug, Clone)]
enum ComplexField {
    Begin,
    Hyperlink {
        href: Option<String>,
        anchor: Option<String>,
    },
    Unknown,
}

/// Everything a body reader needs from the package
#[derive(Clone, Copy)]
pub struct PartContext<'a> {
    pub archive: &'a OoxmlArchive,
    pub content_types: &'a ContentTypes,
    pub styles: &'a Styles,
    pub numbering: &'a Numbering,
}

/// Reads the block and inline content of one part
pub struct BodyReader<'a> {
    context: PartContext<'a>,
    relationships: &'a Relationships,
    /// Directory of the part being read, for resolving relationship targets
    base_dir: String,
    messages: Vec<Message>,
    complex_fields: Vec<ComplexField>,
    instr_text: Vec<String>,
    deleted_paragraph_contents: Vec<XmlNode>,
}

impl<'a> BodyReader<'a> {
    pub fn new(
        context: PartContext<'a>,
        relationships: &'a Relationships,
        base_dir: impl Into<String>,
    ) -> Self {
        Self {
            context,
            relationships,
            base_dir: base_dir.into(),
            messages: Vec::new(),
            complex_fields: Vec::new(),
            instr_text: Vec::new(),
            deleted_paragraph_contents: Vec::new(),
        }
    }

    /// Messages collected so far, leaving the reader's list empty
    pub fn take_messages(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.messages.push(Message::warning(message));
    }

    /// Read a sequence of XML nodes; text between elements is ignored
    pub fn read_elements(&mut self, nodes: &[XmlNode]) -> Vec<Element> {
        let mut result = Vec::new();
        for element in nodes.iter().filter_map(XmlNode::as_element) {
            result.extend(self.read_element(element));
        }
        result
    }

    fn read_element(&mut self, element: &XmlElement) -> Vec<Element> {
        let name = element.name.as_str();
        match name {
            "w:t" => vec![Element::Text(element.text())],
            "w:r" => vec![self.read_run(element)],
            "w:p" => self.read_paragraph(element).into_iter().collect(),
            "w:fldChar" => {
                self.read_fld_char(element);
                Vec::new()
            }
            "w:instrText" => {
                self.instr_text.push(element.text());
                Vec::new()
            }
            "w:tab" => vec![Element::Tab],
            "w:noBreakHyphen" => vec![Element::text("\u{2011}")],
            "w:softHyphen" => vec![Element::text("\u{00AD}")],
            "w:sym" => self.read_symbol(element).into_iter().collect(),
            "w:hyperlink" => self.read_hyperlink(element),
            "w:tbl" => vec![self.read_table(element)],
            "w:tr" => self.read_table_row(element).into_iter().collect(),
            "w:tc" => vec![self.read_table_cell(element)],
            "w:footnoteReference" => vec![note_reference(NoteType::Footnote, element)],
            "w:endnoteReference" => vec![note_reference(NoteType::Endnote, element)],
            "w:commentReference" => vec![Element::CommentReference(CommentReference {
                comment_id: element.attribute("w:id").unwrap_or_default().to_string(),
            })],
            "w:br" => self.read_break(element).into_iter().collect(),
            "w:bookmarkStart" => match element.attribute("w:name") {
                Some(name) if name != "_GoBack" => vec![Element::BookmarkStart(BookmarkStart {
                    name: name.to_string(),
                })],
                _ => Vec::new(),
            },
            "mc:AlternateContent" => {
                self.read_elements(&element.first_or_empty("mc:Fallback").children)
            }
            "w:sdt" => self.read_elements(&element.first_or_empty("w:sdtContent").children),
            "wp:inline" | "wp:anchor" => self.read_drawing(element),
            "v:imagedata" => self.read_image_data(element).into_iter().collect(),
            _ if TRANSPARENT_ELEMENTS.contains(&name) => self.read_elements(&element.children),
            _ if IGNORED_ELEMENTS.contains(&name) => Vec::new(),
            _ => {
                self.warn(format!("An unrecognised element was ignored: {}", name));
                Vec::new()
            }
        }
    }

    fn read_paragraph(&mut self, element: &XmlElement) -> Option<Element> {
        let properties = element.first_or_empty("w:pPr");
        let is_deleted = properties.first_or_empty("w:rPr").first("w:del").is_some();
        if is_deleted {
            // Contents of a deleted paragraph mark join the next paragraph
            self.deleted_paragraph_contents
                .extend(element.children.iter().cloned());
            return None;
        }

        let mut paragraph = self.read_paragraph_properties(properties);
        paragraph.children = if self.deleted_paragraph_contents.is_empty() {
            self.read_elements(&element.children)
        } else {
            let mut nodes = std::mem::take(&mut self.deleted_paragraph_contents);
            nodes.extend(element.children.iter().cloned());
            self.read_elements(&nodes)
        };
        Some(Element::Paragraph(paragraph))
    }

    fn read_paragraph_properties(&mut self, properties: &XmlElement) -> Paragraph {
        let styles = self.context.styles;
        let (style_id, style_name) = self.read_style(properties, "w:pStyle", "Paragraph", |id| {
            styles.find_paragraph_style_by_id(id)
        });
        let numbering = self.read_numbering_properties(
            style_id.as_deref(),
            properties.first_or_empty("w:numPr"),
        );
        let indent = properties.first_or_empty("w:ind");

        Paragraph {
            children: Vec::new(),
            alignment: properties
                .first_or_empty("w:jc")
                .attribute("w:val")
                .map(str::to_string),
            numbering,
            indent: ParagraphIndent {
                start: indent
                    .attribute("w:start")
                    .or_else(|| indent.attribute("w:left"))
                    .map(str::to_string),
                end: indent
                    .attribute("w:end")
                    .or_else(|| indent.attribute("w:right"))
                    .map(str::to_string),
                first_line: indent.attribute("w:firstLine").map(str::to_string),
                hanging: indent.attribute("w:hanging").map(str::to_string),
            },
            style_id,
            style_name,
        }
    }

    fn read_numbering_properties(
        &self,
        style_id: Option<&str>,
        num_pr: &XmlElement,
    ) -> Option<NumberingLevel> {
        let level = num_pr.first_or_empty("w:ilvl").attribute("w:val");
        let num_id = num_pr.first_or_empty("w:numId").attribute("w:val");
        if let (Some(level), Some(num_id)) = (level, num_id) {
            return level
                .parse::<usize>()
                .ok()
                .and_then(|level| self.context.numbering.find_level(num_id, level));
        }
        style_id.and_then(|id| self.context.numbering.find_level_by_paragraph_style_id(id))
    }

    fn read_style(
        &mut self,
        properties: &XmlElement,
        tag_name: &str,
        style_type: &str,
        find: impl Fn(&str) -> Option<&'a Style>,
    ) -> (Option<String>, Option<String>) {
        let Some(style_id) = properties
            .first(tag_name)
            .and_then(|e| e.attribute("w:val"))
            .filter(|id| !id.is_empty())
        else {
            return (None, None);
        };
        let name = match find(style_id) {
            Some(style) => style.name.clone(),
            None => {
                self.warn(format!(
                    "{} style with ID {} was referenced but not defined in the document",
                    style_type, style_id
                ));
                None
            }
        };
        (Some(style_id.to_string()), name)
    }

    fn read_run(&mut self, element: &XmlElement) -> Element {
        let mut run = self.read_run_properties(element.first_or_empty("w:rPr"));
        let children = self.read_elements(&element.children);
        run.children = match self.current_hyperlink() {
            Some((href, anchor)) => vec![Element::Hyperlink(Hyperlink {
                children,
                href,
                anchor,
                target_frame: None,
            })],
            None => children,
        };
        Element::Run(run)
    }

    fn read_run_properties(&mut self, properties: &XmlElement) -> Run {
        let styles = self.context.styles;
        let (style_id, style_name) = self.read_style(properties, "w:rStyle", "Run", |id| {
            styles.find_character_style_by_id(id)
        });

        let vertical_alignment = match properties.first_or_empty("w:vertAlign").attribute("w:val") {
            Some("superscript") => VerticalAlignment::Superscript,
            Some("subscript") => VerticalAlignment::Subscript,
            _ => VerticalAlignment::Baseline,
        };
        let font_size = properties
            .first_or_empty("w:sz")
            .attribute("w:val")
            .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|v| v.parse::<f64>().ok())
            .map(|half_points| half_points / 2.0);

        Run {
            children: Vec::new(),
            style_id,
            style_name,
            is_bold: read_boolean_element(properties.first("w:b")),
            is_italic: read_boolean_element(properties.first("w:i")),
            is_underline: read_underline(properties.first("w:u")),
            is_strikethrough: read_boolean_element(properties.first("w:strike")),
            is_all_caps: read_boolean_element(properties.first("w:caps")),
            is_small_caps: read_boolean_element(properties.first("w:smallCaps")),
            vertical_alignment,
            font: properties
                .first_or_empty("w:rFonts")
                .attribute("w:ascii")
                .map(str::to_string),
            font_size,
        }
    }

    fn read_fld_char(&mut self, element: &XmlElement) {
        match element.attribute("w:fldCharType") {
            Some("begin") => {
                self.complex_fields.push(ComplexField::Begin);
                self.instr_text.clear();
            }
            Some("separate") => {
                if let Some(field) = self.complex_fields.pop() {
                    let parsed = self.parse_instr_text(field);
                    self.complex_fields.push(parsed);
                }
            }
            Some("end") => {
                self.complex_fields.pop();
            }
            _ => {}
        }
    }

    fn parse_instr_text(&self, field: ComplexField) -> ComplexField {
        if !matches!(field, ComplexField::Begin) {
            return field;
        }
        let instr_text = self.instr_text.concat();
        if let Some(captures) = external_hyperlink_re().captures(&instr_text) {
            return ComplexField::Hyperlink {
                href: Some(captures[1].to_string()),
                anchor: None,
            };
        }
        if let Some(captures) = internal_hyperlink_re().captures(&instr_text) {
            return ComplexField::Hyperlink {
                href: None,
                anchor: Some(captures[1].to_string()),
            };
        }
        ComplexField::Unknown
    }

    /// The innermost field hyperlink the reader is currently inside
    fn current_hyperlink(&self) -> Option<(Option<String>, Option<String>)> {
        self.complex_fields.iter().rev().find_map(|field| match field {
            ComplexField::Hyperlink { href, anchor } => Some((href.clone(), anchor.clone())),
            _ => None,
        })
    }

    fn read_symbol(&mut self, element: &XmlElement) -> Option<Element> {
        let font = element.attribute("w:font").unwrap_or_default();
        let code = element.attribute("w:char").unwrap_or_default();
        match symbol_to_unicode(font, code) {
            Some(c) => Some(Element::Text(c.to_string())),
            None => {
                self.warn(format!(
                    "A w:sym element with an unsupported character was ignored: char {} in font {}",
                    code, font
                ));
                None
            }
        }
    }

    fn read_hyperlink(&mut self, element: &XmlElement) -> Vec<Element> {
        let children = self.read_elements(&element.children);
        let anchor = element.attribute("w:anchor").filter(|a| !a.is_empty());
        let target_frame = element
            .attribute("w:tgtFrame")
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        if let Some(relationship_id) = element.attribute("r:id") {
            let Some(target) = self.relationships.get(relationship_id) else {
                self.warn(format!(
                    "Could not find relationship {} for hyperlink",
                    relationship_id
                ));
                return children;
            };
            let href = match anchor {
                Some(anchor) => replace_fragment(target, anchor),
                None => target.to_string(),
            };
            return vec![Element::Hyperlink(Hyperlink {
                children,
                href: Some(href),
                anchor: None,
                target_frame,
            })];
        }

        match anchor {
            Some(anchor) => vec![Element::Hyperlink(Hyperlink {
                children,
                href: None,
                anchor: Some(anchor.to_string()),
                target_frame,
            })],
            None => children,
        }
    }

    fn read_table(&mut self, element: &XmlElement) -> Element {
        let styles = self.context.styles;
        let (style_id, style_name) = self.read_style(
            element.first_or_empty("w:tblPr"),
            "w:tblStyle",
            "Table",
            |id| styles.find_table_style_by_id(id),
        );
        let rows = self.read_elements(&element.children);
        let children = self.calculate_row_spans(rows);
        Element::Table(Table {
            children,
            style_id,
            style_name,
        })
    }

    fn read_table_row(&mut self, element: &XmlElement) -> Option<Element> {
        let properties = element.first_or_empty("w:trPr");
        if properties.first("w:del").is_some() {
            return None;
        }
        let is_header = properties.first("w:tblHeader").is_some();
        Some(Element::TableRow(TableRow {
            children: self.read_elements(&element.children),
            is_header,
        }))
    }

    fn read_table_cell(&mut self, element: &XmlElement) -> Element {
        let children = self.read_elements(&element.children);
        let properties = element.first_or_empty("w:tcPr");
        let colspan = properties
            .first_or_empty("w:gridSpan")
            .attribute("w:val")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|span| *span > 0)
            .unwrap_or(1);
        let v_merge = properties
            .first("w:vMerge")
            .map(|merge| matches!(merge.attribute("w:val"), None | Some("continue") | Some("")));

        let mut cell = TableCell::new(children).with_colspan(colspan);
        cell.v_merge = v_merge;
        Element::TableCell(cell)
    }

    /// Fold vertically merged cells into the cell that starts the merge
    fn calculate_row_spans(&mut self, mut rows: Vec<Element>) -> Vec<Element> {
        if rows.iter().any(|r| !matches!(r, Element::TableRow(_))) {
            clear_v_merge(&mut rows);
            self.warn("unexpected non-row element in table, cell merging may be incorrect");
            return rows;
        }
        if rows
            .iter()
            .flat_map(|r| r.children())
            .any(|c| !matches!(c, Element::TableCell(_)))
        {
            clear_v_merge(&mut rows);
            self.warn("unexpected non-cell element in table row, cell merging may be incorrect");
            return rows;
        }

        // column index -> (row, cell) position of the cell a merge extends
        let mut columns: HashMap<usize, (usize, usize)> = HashMap::new();
        let mut continued = Vec::new();
        for (row_index, row) in rows.iter().enumerate() {
            let mut column = 0;
            for (cell_index, cell) in row.children().iter().enumerate() {
                let Element::TableCell(cell) = cell else {
                    continue;
                };
                match columns.get(&column) {
                    Some(&origin) if cell.v_merge == Some(true) => continued.push(origin),
                    _ => {
                        columns.insert(column, (row_index, cell_index));
                    }
                }
                column += cell.colspan;
            }
        }

        for (row_index, cell_index) in continued {
            if let Some(Element::TableCell(cell)) = rows[row_index]
                .children_mut()
                .and_then(|cells| cells.get_mut(cell_index))
            {
                cell.rowspan += 1;
            }
        }

        for row in &mut rows {
            if let Some(cells) = row.children_mut() {
                cells.retain(|c| !matches!(c, Element::TableCell(cell) if cell.v_merge == Some(true)));
            }
        }
        clear_v_merge(&mut rows);
        rows
    }

    fn read_break(&mut self, element: &XmlElement) -> Option<Element> {
        match element.attribute("w:type") {
            None | Some("textWrapping") => Some(Element::Break(BreakType::Line)),
            Some("page") => Some(Element::Break(BreakType::Page)),
            Some("column") => Some(Element::Break(BreakType::Column)),
            Some(other) => {
                self.warn(format!("Unsupported break type: {}", other));
                None
            }
        }
    }

    fn read_drawing(&mut self, element: &XmlElement) -> Vec<Element> {
        let doc_pr = element.first_or_empty("wp:docPr");
        let alt_text = match doc_pr.attribute("descr") {
            Some(descr) if !descr.trim().is_empty() => Some(descr.to_string()),
            _ => doc_pr.attribute("title").map(str::to_string),
        };

        let blips = children_along(
            element,
            &["a:graphic", "a:graphicData", "pic:pic", "pic:blipFill", "a:blip"],
        );
        let mut images = Vec::new();
        for blip in blips {
            if let Some(relationship_id) = blip.attribute("r:embed") {
                images.extend(self.read_image(relationship_id, alt_text.clone()));
            } else if blip.attribute("r:link").is_some() {
                self.warn("A linked image was ignored: only embedded images are supported");
            } else {
                self.warn("Could not find image file for a:blip element");
            }
        }
        images
    }

    fn read_image_data(&mut self, element: &XmlElement) -> Option<Element> {
        match element.attribute("r:id") {
            Some(relationship_id) => {
                let alt_text = element.attribute("o:title").map(str::to_string);
                self.read_image(relationship_id, alt_text)
            }
            None => {
                self.warn("A v:imagedata element without a relationship ID was ignored");
                None
            }
        }
    }

    fn read_image(&mut self, relationship_id: &str, alt_text: Option<String>) -> Option<Element> {
        let Some(target) = self.relationships.get(relationship_id) else {
            self.warn(format!(
                "Could not find relationship {} for image",
                relationship_id
            ));
            return None;
        };
        let path = uri_to_zip_entry_name(&self.base_dir, target);
        let Some(data) = self.context.archive.get(&path) else {
            self.warn(format!("Could not find image file {}", path));
            return None;
        };
        trace!(%path, bytes = data.len(), "read image");

        let content_type = self
            .context
            .content_types
            .find_content_type(&path)
            .map(str::to_string)
            .or_else(|| image_content_type_from_extension(&path).map(str::to_string));
        let is_supported = content_type
            .as_deref()
            .is_some_and(|ct| SUPPORTED_IMAGE_TYPES.contains(&ct));
        if !is_supported {
            self.warn(format!(
                "Image of type {} is unlikely to display in web browsers",
                content_type.as_deref().unwrap_or("unknown")
            ));
        }

        Some(Element::Image(Image {
            alt_text,
            content_type,
            data: data.to_vec(),
        }))
    }
}

fn note_reference(note_type: NoteType, element: &XmlElement) -> Element {
    Element::NoteReference(NoteReference {
        note_type,
        note_id: element.attribute("w:id").unwrap_or_default().to_string(),
    })
}

fn read_boolean_element(element: Option<&XmlElement>) -> bool {
    match element {
        Some(element) => !matches!(element.attribute("w:val"), Some("false") | Some("0")),
        None => false,
    }
}

fn read_underline(element: Option<&XmlElement>) -> bool {
    element
        .and_then(|e| e.attribute("w:val"))
        .is_some_and(|val| !matches!(val, "false" | "0" | "none"))
}

fn clear_v_merge(rows: &mut [Element]) {
    for row in rows {
        if let Some(cells) = row.children_mut() {
            for cell in cells {
                if let Element::TableCell(cell) = cell {
                    cell.v_merge = None;
                }
            }
        }
    }
}

/// Descend through direct children named by each step in turn
fn children_along<'e>(element: &'e XmlElement, steps: &[&str]) -> Vec<&'e XmlElement> {
    let mut current = vec![element];
    for step in steps {
        current = current
            .into_iter()
            .flat_map(|e| e.elements().filter(move |c| c.name == *step))
            .collect();
    }
    current
}

fn image_content_type_from_extension(path: &str) -> Option<&'static str> {
    let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "tif" | "tiff" => Some("image/tiff"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Greek letters of the Symbol font, indexed from 0x41 ('A')
const SYMBOL_LETTERS: [char; 58] = [
    'Α', 'Β', 'Χ', 'Δ', 'Ε', 'Φ', 'Γ', 'Η', 'Ι', 'ϑ', 'Κ', 'Λ', 'Μ', 'Ν', 'Ο', 'Π', 'Θ', 'Ρ',
    'Σ', 'Τ', 'Υ', 'ς', 'Ω', 'Ξ', 'Ψ', 'Ζ', '[', '∴', ']', '⊥', '_', '‾', 'α', 'β', 'χ', 'δ',
    'ε', 'φ', 'γ', 'η', 'ι', 'ϕ', 'κ', 'λ', 'μ', 'ν', 'ο', 'π', 'θ', 'ρ', 'σ', 'τ', 'υ', 'ϖ',
    'ω', 'ξ', 'ψ', 'ζ',
];

/// Map a `w:sym` code point to Unicode
///
/// Symbol-font codes are often stored in the private use area (`F0xx`), so
/// that prefix is dropped before looking them up.
fn symbol_to_unicode(font: &str, code: &str) -> Option<char> {
    let value = u32::from_str_radix(code, 16).ok()?;
    let value = if (0xF000..=0xF0FF).contains(&value) {
        value - 0xF000
    } else {
        value
    };

    match font.to_ascii_lowercase().as_str() {
        "symbol" => match value {
            0x41..=0x7A => SYMBOL_LETTERS.get((value - 0x41) as usize).copied(),
            0xB7 => Some('•'),
            0xA5 => Some('∞'),
            0xAE => Some('→'),
            0xAC => Some('←'),
            0xB1 => Some('±'),
            0xB4 => Some('×'),
            0xB8 => Some('÷'),
            0xB9 => Some('≠'),
            0xA3 => Some('≤'),
            0xB3 => Some('≥'),
            0x20..=0x40 => char::from_u32(value),
            _ => None,
        },
        "wingdings" => match value {
            0x9F => Some('•'),
            0xA7 => Some('▪'),
            0xA8 => Some('◻'),
            0xD8 => Some('➢'),
            0xE0 => Some('➔'),
            0xFC => Some('✓'),
            0xFB => Some('✗'),
            0x6C => Some('●'),
            0x6E => Some('■'),
            _ => None,
        },
        _ => char::from_u32(value).filter(|c| !c.is_control()),
    }
}
