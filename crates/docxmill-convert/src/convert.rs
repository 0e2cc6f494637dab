//! Document model to HTML
//!
//! Every element is looked up in the style map; the first mapping whose
//! matcher accepts it decides the HTML path its content is wrapped in.
//! Notes and comments referenced from the body are collected on the way and
//! appended after it.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::debug;

use crate::document::{
    BreakType, Comment, CommentReference, Document, Element, Hyperlink, Note, NoteReference,
    Paragraph, Run, Table, TableCell, VerticalAlignment,
};
use crate::html::{self, fresh_element, non_fresh_element, text, HtmlNode, HtmlTag};
use crate::images::{data_uri, ImageConverter};
use crate::options::ConvertOptions;
use crate::results::{ConversionResult, Message};
use crate::styles::{HtmlPath, MatchTarget, StyleMapping};
use crate::writers;

/// Converts one document; holds the per-conversion counters
pub struct DocumentConverter<'a> {
    options: &'a ConvertOptions,
    style_map: &'a [StyleMapping],
    image_converter: ImageConverter,
    comments: HashMap<&'a str, &'a Comment>,
    note_number: usize,
    note_references: Vec<&'a NoteReference>,
    referenced_comments: Vec<(String, &'a str)>,
    messages: Vec<Message>,
}

impl<'a> DocumentConverter<'a> {
    pub fn new(options: &'a ConvertOptions, style_map: &'a [StyleMapping]) -> Self {
        Self {
            options,
            style_map,
            image_converter: options.convert_image.clone().unwrap_or_else(data_uri),
            comments: HashMap::new(),
            note_number: 1,
            note_references: Vec::new(),
            referenced_comments: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Convert and write the document in the configured output format
    pub fn convert(mut self, document: &'a Document) -> ConversionResult<String> {
        let nodes = self.convert_document(document);
        let mut writer = writers::writer(self.options.output_format, self.options.pretty_print);
        html::write(writer.as_mut(), &html::simplify(nodes));
        debug!(
            notes = self.note_references.len(),
            comments = self.referenced_comments.len(),
            "converted document"
        );
        ConversionResult::new(writer.as_string(), self.messages)
    }

    /// The HTML tree before simplification
    pub fn convert_document(&mut self, document: &'a Document) -> Vec<HtmlNode> {
        self.comments = document
            .comments
            .iter()
            .map(|c| (c.comment_id.as_str(), c))
            .collect();

        let mut nodes = self.convert_elements(&document.children, false);

        let mut note_nodes = Vec::new();
        let references = std::mem::take(&mut self.note_references);
        for reference in &references {
            match document.find_note(reference.note_type, &reference.note_id) {
                Some(note) => note_nodes.push(self.convert_note(note)),
                None => self.messages.push(Message::warning(format!(
                    "Could not find {} with ID {}",
                    reference.note_type.as_str(),
                    reference.note_id
                ))),
            }
        }
        self.note_references = references;

        let mut comment_nodes = Vec::new();
        let referenced = std::mem::take(&mut self.referenced_comments);
        for (label, comment_id) in &referenced {
            if let Some(comment) = self.comments.get(comment_id).copied() {
                comment_nodes.extend(self.convert_comment(label, comment));
            }
        }
        self.referenced_comments = referenced;

        nodes.push(fresh_element("ol", Vec::new(), note_nodes));
        nodes.push(fresh_element("dl", Vec::new(), comment_nodes));
        nodes
    }

    fn convert_elements(&mut self, elements: &'a [Element], is_table_header: bool) -> Vec<HtmlNode> {
        elements
            .iter()
            .flat_map(|element| self.convert_element(element, is_table_header))
            .collect()
    }

    fn convert_element(&mut self, element: &'a Element, is_table_header: bool) -> Vec<HtmlNode> {
        match element {
            Element::Paragraph(paragraph) => self.convert_paragraph(paragraph, is_table_header),
            Element::Run(run) => self.convert_run(run, is_table_header),
            Element::Text(value) => vec![text(value.as_str())],
            Element::Tab => vec![text("\t")],
            Element::Break(break_type) => self.convert_break(*break_type),
            Element::Hyperlink(hyperlink) => self.convert_hyperlink(hyperlink, is_table_header),
            Element::Image(image) => match (self.image_converter)(image) {
                Ok(nodes) => nodes,
                Err(err) => {
                    self.messages.push(Message::error(err.to_string()));
                    Vec::new()
                }
            },
            Element::Table(table) => self.convert_table(table),
            Element::TableRow(row) => {
                let mut children = vec![HtmlNode::ForceWrite];
                children.extend(self.convert_elements(&row.children, is_table_header));
                vec![fresh_element("tr", Vec::new(), children)]
            }
            Element::TableCell(cell) => self.convert_table_cell(cell, is_table_header),
            Element::NoteReference(reference) => self.convert_note_reference(reference),
            Element::CommentReference(reference) => self.convert_comment_reference(reference),
            Element::BookmarkStart(bookmark) => vec![fresh_element(
                "a",
                vec![("id".to_string(), self.html_id(&bookmark.name))],
                vec![HtmlNode::ForceWrite],
            )],
        }
    }

    fn find_style(&self, target: MatchTarget<'_>) -> Option<&'a StyleMapping> {
        self.style_map.iter().find(|mapping| mapping.from.matches(target))
    }

    fn find_html_path(&self, target: MatchTarget<'_>) -> Option<&'a HtmlPath> {
        self.find_style(target).map(|mapping| &mapping.to)
    }

    fn convert_paragraph(&mut self, paragraph: &'a Paragraph, is_table_header: bool) -> Vec<HtmlNode> {
        let path = match self.find_html_path(MatchTarget::Paragraph(paragraph)) {
            Some(path) => Cow::Borrowed(path),
            None => {
                if let Some(style_id) = &paragraph.style_id {
                    self.messages.push(unrecognised_style_warning(
                        "paragraph",
                        paragraph.style_name.as_deref(),
                        style_id,
                    ));
                }
                Cow::Owned(HtmlPath::top_level_element("p"))
            }
        };
        path.wrap(|| {
            let content = self.convert_elements(&paragraph.children, is_table_header);
            if self.options.ignore_empty_paragraphs {
                content
            } else {
                std::iter::once(HtmlNode::ForceWrite).chain(content).collect()
            }
        })
    }

    fn convert_run(&mut self, run: &'a Run, is_table_header: bool) -> Vec<HtmlNode> {
        // Innermost first; the run's own style path ends up outermost
        let mut paths: Vec<Cow<'a, HtmlPath>> = Vec::new();
        if run.is_small_caps {
            paths.push(self.run_property_path(MatchTarget::SmallCaps, None));
        }
        if run.is_all_caps {
            paths.push(self.run_property_path(MatchTarget::AllCaps, None));
        }
        if run.is_strikethrough {
            paths.push(self.run_property_path(MatchTarget::Strikethrough, Some("s")));
        }
        if run.is_underline {
            paths.push(self.run_property_path(MatchTarget::Underline, None));
        }
        match run.vertical_alignment {
            VerticalAlignment::Subscript => paths.push(Cow::Owned(non_fresh_path("sub"))),
            VerticalAlignment::Superscript => paths.push(Cow::Owned(non_fresh_path("sup"))),
            VerticalAlignment::Baseline => {}
        }
        if run.is_italic {
            paths.push(self.run_property_path(MatchTarget::Italic, Some("em")));
        }
        if run.is_bold {
            paths.push(self.run_property_path(MatchTarget::Bold, Some("strong")));
        }

        let style_path = match self.find_html_path(MatchTarget::Run(run)) {
            Some(path) => Cow::Borrowed(path),
            None => {
                if let Some(style_id) = &run.style_id {
                    self.messages.push(unrecognised_style_warning(
                        "run",
                        run.style_name.as_deref(),
                        style_id,
                    ));
                }
                Cow::Owned(HtmlPath::empty())
            }
        };
        paths.push(style_path);

        if paths.iter().any(|path| path.is_ignore()) {
            return Vec::new();
        }
        let mut nodes = self.convert_elements(&run.children, is_table_header);
        for path in &paths {
            nodes = path.wrap(|| nodes);
        }
        nodes
    }

    fn run_property_path(&self, target: MatchTarget<'_>, default_tag: Option<&str>) -> Cow<'a, HtmlPath> {
        match (self.find_html_path(target), default_tag) {
            (Some(path), _) => Cow::Borrowed(path),
            (None, Some(tag_name)) => Cow::Owned(non_fresh_path(tag_name)),
            (None, None) => Cow::Owned(HtmlPath::empty()),
        }
    }

    fn convert_break(&mut self, break_type: BreakType) -> Vec<HtmlNode> {
        let path = match self.find_html_path(MatchTarget::Break(break_type)) {
            Some(path) => Cow::Borrowed(path),
            None if break_type == BreakType::Line => Cow::Owned(HtmlPath::top_level_element("br")),
            None => Cow::Owned(HtmlPath::empty()),
        };
        path.wrap(Vec::new)
    }

    fn convert_hyperlink(&mut self, hyperlink: &'a Hyperlink, is_table_header: bool) -> Vec<HtmlNode> {
        let href = match (&hyperlink.anchor, &hyperlink.href) {
            (Some(anchor), _) => format!("#{}", self.html_id(anchor)),
            (None, Some(href)) => href.clone(),
            (None, None) => String::new(),
        };
        let mut attributes = vec![("href".to_string(), href)];
        if let Some(target_frame) = &hyperlink.target_frame {
            attributes.push(("target".to_string(), target_frame.clone()));
        }
        let children = self.convert_elements(&hyperlink.children, is_table_header);
        vec![non_fresh_element("a", attributes, children)]
    }

    fn convert_table(&mut self, table: &'a Table) -> Vec<HtmlNode> {
        let path = match self.find_html_path(MatchTarget::Table(table)) {
            Some(path) => Cow::Borrowed(path),
            None => Cow::Owned(HtmlPath::top_level_element("table")),
        };
        path.wrap(|| {
            let body_index = table
                .children
                .iter()
                .position(|row| !matches!(row, Element::TableRow(r) if r.is_header))
                .unwrap_or(table.children.len());

            let mut children = vec![HtmlNode::ForceWrite];
            if body_index == 0 {
                children.extend(self.convert_elements(&table.children, false));
            } else {
                let (head, body) = table.children.split_at(body_index);
                let head_rows = self.convert_elements(head, true);
                let body_rows = self.convert_elements(body, false);
                children.push(fresh_element("thead", Vec::new(), head_rows));
                children.push(fresh_element("tbody", Vec::new(), body_rows));
            }
            children
        })
    }

    fn convert_table_cell(&mut self, cell: &'a TableCell, is_table_header: bool) -> Vec<HtmlNode> {
        let tag_name = if is_table_header { "th" } else { "td" };
        let mut attributes = Vec::new();
        if cell.colspan != 1 {
            attributes.push(("colspan".to_string(), cell.colspan.to_string()));
        }
        if cell.rowspan != 1 {
            attributes.push(("rowspan".to_string(), cell.rowspan.to_string()));
        }
        let mut children = vec![HtmlNode::ForceWrite];
        children.extend(self.convert_elements(&cell.children, is_table_header));
        vec![fresh_element(tag_name, attributes, children)]
    }

    fn convert_note_reference(&mut self, reference: &'a NoteReference) -> Vec<HtmlNode> {
        self.note_references.push(reference);
        let note_type = reference.note_type.as_str();
        let anchor = fresh_element(
            "a",
            vec![
                (
                    "href".to_string(),
                    format!("#{}", self.referent_html_id(note_type, &reference.note_id)),
                ),
                (
                    "id".to_string(),
                    self.reference_html_id(note_type, &reference.note_id),
                ),
            ],
            vec![text(format!("[{}]", self.note_number))],
        );
        self.note_number += 1;
        vec![fresh_element("sup", Vec::new(), vec![anchor])]
    }

    fn convert_note(&mut self, note: &'a Note) -> HtmlNode {
        let note_type = note.note_type.as_str();
        let mut body = self.convert_elements(&note.body, false);
        body.push(self.back_link(note_type, &note.note_id));
        fresh_element(
            "li",
            vec![(
                "id".to_string(),
                self.referent_html_id(note_type, &note.note_id),
            )],
            body,
        )
    }

    fn convert_comment_reference(&mut self, reference: &'a CommentReference) -> Vec<HtmlNode> {
        let path = match self.find_html_path(MatchTarget::CommentReference) {
            Some(path) => path,
            None => return Vec::new(),
        };
        path.wrap(|| {
            let initials = self
                .comments
                .get(reference.comment_id.as_str())
                .and_then(|c| c.author_initials.as_deref())
                .unwrap_or_default();
            let label = format!("[{}{}]", initials, self.referenced_comments.len() + 1);
            self.referenced_comments
                .push((label.clone(), reference.comment_id.as_str()));
            vec![fresh_element(
                "a",
                vec![
                    (
                        "href".to_string(),
                        format!("#{}", self.referent_html_id("comment", &reference.comment_id)),
                    ),
                    (
                        "id".to_string(),
                        self.reference_html_id("comment", &reference.comment_id),
                    ),
                ],
                vec![text(label)],
            )]
        })
    }

    fn convert_comment(&mut self, label: &str, comment: &'a Comment) -> Vec<HtmlNode> {
        let mut body = self.convert_elements(&comment.body, false);
        body.push(self.back_link("comment", &comment.comment_id));
        vec![
            fresh_element(
                "dt",
                vec![(
                    "id".to_string(),
                    self.referent_html_id("comment", &comment.comment_id),
                )],
                vec![text(format!("Comment {}", label))],
            ),
            fresh_element("dd", Vec::new(), body),
        ]
    }

    /// `<p> <a href="#...-ref-id">↑</a></p>`, merged into a preceding paragraph
    fn back_link(&self, reference_type: &str, id: &str) -> HtmlNode {
        non_fresh_element(
            "p",
            Vec::new(),
            vec![
                text(" "),
                fresh_element(
                    "a",
                    vec![(
                        "href".to_string(),
                        format!("#{}", self.reference_html_id(reference_type, id)),
                    )],
                    vec![text("↑")],
                ),
            ],
        )
    }

    fn referent_html_id(&self, reference_type: &str, id: &str) -> String {
        self.html_id(&format!("{}-{}", reference_type, id))
    }

    fn reference_html_id(&self, reference_type: &str, id: &str) -> String {
        self.html_id(&format!("{}-ref-{}", reference_type, id))
    }

    fn html_id(&self, suffix: &str) -> String {
        format!("{}{}", self.options.id_prefix, suffix)
    }
}

fn non_fresh_path(tag_name: &str) -> HtmlPath {
    HtmlPath::Elements(vec![HtmlTag::new(tag_name)])
}

fn unrecognised_style_warning(kind: &str, style_name: Option<&str>, style_id: &str) -> Message {
    Message::warning(format!(
        "Unrecognised {} style: '{}' (Style ID: {})",
        kind,
        style_name.unwrap_or_default(),
        style_id
    ))
}

/// Convert a document with an already parsed style map
pub fn convert_document(
    document: &Document,
    style_map: &[StyleMapping],
    options: &ConvertOptions,
) -> ConversionResult<String> {
    DocumentConverter::new(options, style_map).convert(document)
}
