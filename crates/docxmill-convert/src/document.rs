//! Abstract document model produced by the DOCX reader
//!
//! The tree mirrors what a reader of the document sees rather than the raw
//! WordprocessingML: style ids are resolved to names, numbering references
//! to list levels and relationship ids to hrefs and image bytes.

/// A whole document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Top-level block elements
    pub children: Vec<Element>,
    /// Footnotes and endnotes, in part order
    pub notes: Vec<Note>,
    /// Comments, in part order
    pub comments: Vec<Comment>,
}

impl Document {
    /// Find a note by type and id
    pub fn find_note(&self, note_type: NoteType, note_id: &str) -> Option<&Note> {
        self.notes
            .iter()
            .find(|n| n.note_type == note_type && n.note_id == note_id)
    }

    /// Find a comment by id
    pub fn find_comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.comment_id == comment_id)
    }
}

/// A node of the document tree
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Paragraph(Paragraph),
    Run(Run),
    Text(String),
    Tab,
    Break(BreakType),
    Hyperlink(Hyperlink),
    Image(Image),
    Table(Table),
    TableRow(TableRow),
    TableCell(TableCell),
    NoteReference(NoteReference),
    CommentReference(CommentReference),
    BookmarkStart(BookmarkStart),
}

/// Discriminant of [`Element`], used for descendant queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Paragraph,
    Run,
    Text,
    Tab,
    Break,
    Hyperlink,
    Image,
    Table,
    TableRow,
    TableCell,
    NoteReference,
    CommentReference,
    BookmarkStart,
}

impl Element {
    /// The element's type
    pub fn element_type(&self) -> ElementType {
        match self {
            Element::Paragraph(_) => ElementType::Paragraph,
            Element::Run(_) => ElementType::Run,
            Element::Text(_) => ElementType::Text,
            Element::Tab => ElementType::Tab,
            Element::Break(_) => ElementType::Break,
            Element::Hyperlink(_) => ElementType::Hyperlink,
            Element::Image(_) => ElementType::Image,
            Element::Table(_) => ElementType::Table,
            Element::TableRow(_) => ElementType::TableRow,
            Element::TableCell(_) => ElementType::TableCell,
            Element::NoteReference(_) => ElementType::NoteReference,
            Element::CommentReference(_) => ElementType::CommentReference,
            Element::BookmarkStart(_) => ElementType::BookmarkStart,
        }
    }

    /// Child elements; leaves have none
    pub fn children(&self) -> &[Element] {
        match self {
            Element::Paragraph(p) => &p.children,
            Element::Run(r) => &r.children,
            Element::Hyperlink(h) => &h.children,
            Element::Table(t) => &t.children,
            Element::TableRow(r) => &r.children,
            Element::TableCell(c) => &c.children,
            _ => &[],
        }
    }

    /// Mutable child elements, `None` for leaves
    pub fn children_mut(&mut self) -> Option<&mut Vec<Element>> {
        match self {
            Element::Paragraph(p) => Some(&mut p.children),
            Element::Run(r) => Some(&mut r.children),
            Element::Hyperlink(h) => Some(&mut h.children),
            Element::Table(t) => Some(&mut t.children),
            Element::TableRow(r) => Some(&mut r.children),
            Element::TableCell(c) => Some(&mut c.children),
            _ => None,
        }
    }

    /// Shorthand for a text element
    pub fn text(value: impl Into<String>) -> Self {
        Element::Text(value.into())
    }
}

/// A paragraph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub children: Vec<Element>,
    pub style_id: Option<String>,
    pub style_name: Option<String>,
    pub numbering: Option<NumberingLevel>,
    pub alignment: Option<String>,
    pub indent: ParagraphIndent,
}

impl Paragraph {
    pub fn new(children: Vec<Element>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }
}

/// List membership of a paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingLevel {
    /// Zero-based nesting level
    pub level_index: usize,
    pub is_ordered: bool,
}

/// Raw indentation values from `w:ind`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphIndent {
    pub start: Option<String>,
    pub end: Option<String>,
    pub first_line: Option<String>,
    pub hanging: Option<String>,
}

/// Baseline shift of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

/// A run of text with uniform formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub children: Vec<Element>,
    pub style_id: Option<String>,
    pub style_name: Option<String>,
    pub is_bold: bool,
    pub is_italic: bool,
    pub is_underline: bool,
    pub is_strikethrough: bool,
    pub is_all_caps: bool,
    pub is_small_caps: bool,
    pub vertical_alignment: VerticalAlignment,
    pub font: Option<String>,
    /// Size in points
    pub font_size: Option<f64>,
}

impl Run {
    pub fn new(children: Vec<Element>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }
}

/// Kind of `w:br`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakType {
    Line,
    Page,
    Column,
}

impl BreakType {
    /// Name used in style mappings
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakType::Line => "line",
            BreakType::Page => "page",
            BreakType::Column => "column",
        }
    }
}

/// A hyperlink to an external href or an internal bookmark
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hyperlink {
    pub children: Vec<Element>,
    pub href: Option<String>,
    pub anchor: Option<String>,
    pub target_frame: Option<String>,
}

/// An embedded image, loaded eagerly from the package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub alt_text: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub children: Vec<Element>,
    pub style_id: Option<String>,
    pub style_name: Option<String>,
}

/// A table row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub children: Vec<Element>,
    pub is_header: bool,
}

/// A table cell
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub children: Vec<Element>,
    pub colspan: usize,
    pub rowspan: usize,
    /// Continuation of a vertically merged cell; only meaningful while reading
    pub(crate) v_merge: Option<bool>,
}

impl TableCell {
    pub fn new(children: Vec<Element>) -> Self {
        Self {
            children,
            colspan: 1,
            rowspan: 1,
            v_merge: None,
        }
    }

    /// Builder: set the column span
    pub fn with_colspan(mut self, colspan: usize) -> Self {
        self.colspan = colspan;
        self
    }

    /// Builder: set the row span
    pub fn with_rowspan(mut self, rowspan: usize) -> Self {
        self.rowspan = rowspan;
        self
    }
}

/// Footnote or endnote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteType {
    Footnote,
    Endnote,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteType::Footnote => "footnote",
            NoteType::Endnote => "endnote",
        }
    }
}

/// Reference from body text to a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteReference {
    pub note_type: NoteType,
    pub note_id: String,
}

/// The body of a footnote or endnote
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub note_type: NoteType,
    pub note_id: String,
    pub body: Vec<Element>,
}

/// Reference from body text to a comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentReference {
    pub comment_id: String,
}

/// A review comment
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub comment_id: String,
    pub body: Vec<Element>,
    pub author_name: Option<String>,
    pub author_initials: Option<String>,
}

/// Start of a named bookmark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkStart {
    pub name: String,
}
