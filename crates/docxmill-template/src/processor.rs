//! Filling one document part
//!
//! The preprocessed part is flattened into a stream of open, text and close
//! events that a cursor walks while an output tree is built on a stack.
//! Loops record where their body starts (event index, segment within the
//! text node and the chain of open elements); at `END-FOR` the walker closes
//! the elements opened since, reopens fresh copies of the ones that were
//! open at the `FOR` and continues right after it. `IF` is a loop over one
//! or zero items.
//!
//! While a loop has no items the walker is skipping: text is not written,
//! only loop commands are interpreted and elements both opened and closed
//! during the skip are dropped. Paragraphs and table rows that held a
//! command but received no content are removed as well.

use std::collections::HashMap;

use docxmill_ooxml::{XmlElement, XmlNode};
use rhai::Dynamic;
use serde_json::Value;
use tracing::debug;

use crate::commands::{loop_variable, parse_alias, parse_for, summarize, CommandKind, CommandSummary};
use crate::delimiters::{Delimiters, Segment};
use crate::error::{Result, TemplateError};
use crate::evaluator::{is_truthy, Evaluator};
use crate::inserts::{
    alt_chunk, break_lines, drawing, html_chunk, hyperlink, value_to_text, ImageSpec, LinkSpec,
};
use crate::options::ReportOptions;

/// An image added by an IMAGE command
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    pub rel_id: String,
    /// Extension including the dot
    pub extension: String,
    pub data: Vec<u8>,
}

/// The filled-in part and the resources its content refers to
#[derive(Debug, Clone)]
pub struct PartReport {
    pub root: XmlElement,
    pub images: Vec<ImageEntry>,
    /// Relationship id and URL of each LINK
    pub links: Vec<(String, String)>,
    /// Relationship id and chunk document of each HTML command
    pub htmls: Vec<(String, String)>,
    /// Highest image id in use, to seed the next part
    pub last_image_id: u32,
}

/// Highest `wp:docPr` id in a part, 0 when there is none
pub fn highest_image_id(root: &XmlElement) -> u32 {
    root.elements_named("wp:docPr")
        .iter()
        .filter_map(|e| e.attribute("id"))
        .filter_map(|id| id.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

enum Event {
    Open(XmlElement),
    /// Text of a `w:t`, split into literal text and commands
    Text(Vec<Segment>),
    /// Any other character data
    Raw(String),
    Close,
}

fn flatten(element: XmlElement, delimiters: &Delimiters, events: &mut Vec<Event>) {
    let XmlElement {
        name,
        attributes,
        children,
    } = element;
    let scan = name == "w:t";
    events.push(Event::Open(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    }));
    for child in children {
        match child {
            XmlNode::Element(e) => flatten(e, delimiters, events),
            XmlNode::Text(text) if scan => events.push(Event::Text(delimiters.split(&text))),
            XmlNode::Text(text) => events.push(Event::Raw(text)),
        }
    }
    events.push(Event::Close);
}

struct Frame {
    element: XmlElement,
    /// Index of the `Open` event this frame came from
    template_index: usize,
    opened_in_skip: bool,
    has_command: bool,
    has_content: bool,
}

#[derive(Clone)]
struct Resume {
    pc: usize,
    segment: usize,
    path: Vec<usize>,
}

struct Loop {
    variable: String,
    items: Vec<Dynamic>,
    index: usize,
    is_if: bool,
    resume: Option<Resume>,
}

fn removable_when_empty(name: &str) -> bool {
    name == "w:p" || name == "w:tr"
}

fn has_block(cell: &XmlElement) -> bool {
    cell.elements().any(|e| e.name == "w:p" || e.name == "w:tbl")
}

/// Walks one part and executes its commands
pub struct Processor<'a> {
    options: &'a ReportOptions,
    evaluator: Box<dyn Evaluator>,
    image_id: u32,
    link_id: u32,
    html_id: u32,
    images: Vec<ImageEntry>,
    links: Vec<(String, String)>,
    htmls: Vec<(String, String)>,
    aliases: HashMap<String, String>,
    errors: Vec<TemplateError>,
    stack: Vec<Frame>,
    loops: Vec<Loop>,
    root: Option<XmlElement>,
    after_text: Vec<XmlElement>,
    after_run: Vec<XmlElement>,
    after_paragraph: Vec<XmlElement>,
}

impl<'a> Processor<'a> {
    /// A processor whose images are numbered after `last_image_id`
    pub fn new(options: &'a ReportOptions, data: &Value, last_image_id: u32) -> Result<Self> {
        let evaluator = (options.evaluator)(data, &options.additional_context)?;
        Ok(Self {
            options,
            evaluator,
            image_id: last_image_id,
            link_id: 0,
            html_id: 0,
            images: Vec::new(),
            links: Vec::new(),
            htmls: Vec::new(),
            aliases: HashMap::new(),
            errors: Vec::new(),
            stack: Vec::new(),
            loops: Vec::new(),
            root: None,
            after_text: Vec::new(),
            after_run: Vec::new(),
            after_paragraph: Vec::new(),
        })
    }

    /// Fill a preprocessed part
    pub fn process(mut self, template: XmlElement) -> Result<PartReport> {
        let mut events = Vec::new();
        flatten(template, &self.options.delimiters, &mut events);

        let mut pc = 0;
        let mut segment = 0;
        while pc < events.len() {
            match &events[pc] {
                Event::Open(element) => self.open(element.clone(), pc, false),
                Event::Close => self.close(),
                Event::Raw(text) => {
                    if !self.skipping() {
                        self.append_text(text);
                    }
                }
                Event::Text(segments) => {
                    if let Some(resume) = self.text(segments, pc, segment)? {
                        self.jump(&events, &resume.path);
                        pc = resume.pc;
                        segment = resume.segment;
                        continue;
                    }
                }
            }
            pc += 1;
            segment = 0;
        }

        if let Some(open) = self.loops.last() {
            let err = if open.is_if {
                TemplateError::IncompleteConditional
            } else {
                TemplateError::UnterminatedLoop(open.variable.clone())
            };
            self.recover(err)?;
        }
        match self.errors.len() {
            0 => {}
            1 => return Err(self.errors.remove(0)),
            _ => return Err(TemplateError::Multiple(self.errors)),
        }

        let root = self
            .root
            .ok_or_else(|| TemplateError::Parse("template part has no root element".to_string()))?;
        Ok(PartReport {
            root,
            images: self.images,
            links: self.links,
            htmls: self.htmls,
            last_image_id: self.image_id,
        })
    }

    fn skipping(&self) -> bool {
        self.loops.iter().any(|l| l.items.is_empty())
    }

    fn open(&mut self, element: XmlElement, template_index: usize, holds_command: bool) {
        let opened_in_skip = self.skipping();
        self.stack.push(Frame {
            element,
            template_index,
            opened_in_skip,
            has_command: holds_command,
            has_content: false,
        });
    }

    fn close(&mut self) {
        let Some(mut frame) = self.stack.pop() else {
            return;
        };
        // A table cell must keep at least one block
        if frame.element.name == "w:tc" && !has_block(&frame.element) {
            frame.element.children.push(XmlNode::Element(XmlElement::new("w:p")));
        }
        let skipping = self.skipping();
        let after = match frame.element.name.as_str() {
            "w:t" => std::mem::take(&mut self.after_text),
            "w:r" => std::mem::take(&mut self.after_run),
            "w:p" => std::mem::take(&mut self.after_paragraph),
            _ => Vec::new(),
        };
        let dropped = (frame.opened_in_skip && skipping)
            || (removable_when_empty(&frame.element.name) && frame.has_command && !frame.has_content);

        let Some(parent) = self.stack.last_mut() else {
            self.root = Some(frame.element);
            return;
        };
        if !dropped {
            parent.element.children.push(XmlNode::Element(frame.element));
        }
        parent
            .element
            .children
            .extend(after.into_iter().map(XmlNode::Element));
    }

    /// Return to a loop start: close what was opened since, reopen what was open then
    fn jump(&mut self, events: &[Event], path: &[usize]) {
        let common = self
            .stack
            .iter()
            .zip(path)
            .take_while(|(frame, &index)| frame.template_index == index)
            .count();
        while self.stack.len() > common {
            self.close();
        }
        for &index in &path[common..] {
            if let Event::Open(element) = &events[index] {
                self.open(element.clone(), index, true);
            }
        }
    }

    fn append_text(&mut self, text: &str) {
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        match frame.element.children.last_mut() {
            Some(XmlNode::Text(existing)) => existing.push_str(text),
            _ => frame.element.children.push(XmlNode::Text(text.to_string())),
        }
    }

    fn emit_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.append_text(text);
        self.mark(|frame| frame.has_content = true);
    }

    fn mark(&mut self, update: impl Fn(&mut Frame)) {
        for frame in self.stack.iter_mut() {
            if removable_when_empty(&frame.element.name) {
                update(frame);
            }
        }
    }

    fn text(&mut self, segments: &[Segment], pc: usize, start: usize) -> Result<Option<Resume>> {
        for (index, segment) in segments.iter().enumerate().skip(start) {
            match segment {
                Segment::Literal(text) => {
                    if !self.skipping() {
                        self.emit_text(text);
                    }
                }
                Segment::Command(raw) => {
                    self.mark(|frame| frame.has_command = true);
                    match self.command(raw, pc, index + 1) {
                        Ok(Some(resume)) => return Ok(Some(resume)),
                        Ok(None) => {}
                        Err(err) => self.recover(err)?,
                    }
                }
            }
        }
        Ok(None)
    }

    /// Keep going after a command error unless failing fast
    fn recover(&mut self, err: TemplateError) -> Result<()> {
        if self.options.fail_fast {
            return Err(err);
        }
        debug!(error = %err, "collected command error");
        self.errors.push(err);
        Ok(())
    }

    fn command(&mut self, raw: &str, pc: usize, next_segment: usize) -> Result<Option<Resume>> {
        let summary = match summarize(raw, &self.aliases, self.options.fix_smart_quotes) {
            Ok(summary) => summary,
            Err(_) if self.skipping() => return Ok(None),
            Err(err) => return Err(err),
        };

        if self.skipping() {
            match summary.kind {
                CommandKind::For => {
                    let variable = parse_for(&summary.code)
                        .map(|(variable, _)| variable)
                        .unwrap_or_else(|_| summary.code.clone());
                    self.push_skipped(variable, false);
                }
                CommandKind::If => self.push_skipped(format!("IF {}", summary.code), true),
                CommandKind::EndFor | CommandKind::EndIf => return self.end_loop(&summary),
                _ => {}
            }
            return Ok(None);
        }

        debug!(command = %summary.raw, "executing command");
        match summary.kind {
            CommandKind::Query | CommandKind::CmdNode => {}
            CommandKind::Alias => {
                let (name, body) = parse_alias(&summary.code)?;
                self.aliases.insert(name, body);
            }
            CommandKind::For => {
                let (variable, expression) = parse_for(&summary.code)?;
                let value = self.evaluate(&expression, &summary.raw)?;
                let items = value.try_cast::<rhai::Array>().ok_or_else(|| {
                    TemplateError::invalid_command(
                        "Invalid FOR command (can only iterate over Array)",
                        summary.raw.clone(),
                    )
                })?;
                self.begin_loop(variable, items, false, pc, next_segment);
            }
            CommandKind::If => {
                let value = self.evaluate(&summary.code, &summary.raw)?;
                let items = if is_truthy(&value) {
                    vec![Dynamic::TRUE]
                } else {
                    Vec::new()
                };
                self.begin_loop(format!("IF {}", summary.code), items, true, pc, next_segment);
            }
            CommandKind::EndFor | CommandKind::EndIf => return self.end_loop(&summary),
            CommandKind::Ins => {
                let value = self.evaluate(&summary.code, &summary.raw)?;
                self.insert(&value, &summary.raw)?;
            }
            CommandKind::Exec => {
                self.evaluate(&summary.code, &summary.raw)?;
            }
            CommandKind::Image => {
                let value = self.evaluate(&summary.code, &summary.raw)?;
                self.insert_image(&value, &summary.raw)?;
            }
            CommandKind::Link => {
                let value = self.evaluate(&summary.code, &summary.raw)?;
                let link = LinkSpec::from_dynamic(&value, &summary.raw)?;
                self.link_id += 1;
                let rel_id = format!("link{}", self.link_id);
                self.after_run.push(hyperlink(&rel_id, &link));
                self.links.push((rel_id, link.url));
                self.mark(|frame| frame.has_content = true);
            }
            CommandKind::Html => {
                let value = self.evaluate(&summary.code, &summary.raw)?;
                if !value.is_string() {
                    return Err(TemplateError::InvalidInsertion {
                        kind: "HTML",
                        command: summary.raw.clone(),
                        message: "expected a string".to_string(),
                    });
                }
                self.html_id += 1;
                let rel_id = format!("html{}", self.html_id);
                self.after_paragraph.push(alt_chunk(&rel_id));
                self.htmls.push((rel_id, html_chunk(&value.to_string())));
            }
        }
        Ok(None)
    }

    fn locals(&self) -> Vec<(String, Dynamic)> {
        self.loops
            .iter()
            .filter(|l| !l.is_if)
            .filter_map(|l| {
                l.items
                    .get(l.index)
                    .map(|item| (l.variable.clone(), item.clone()))
            })
            .collect()
    }

    fn evaluate(&mut self, code: &str, command: &str) -> Result<Dynamic> {
        let locals = self.locals();
        match self.evaluator.evaluate(code, &locals) {
            Ok(value) => Ok(value),
            Err(err) => {
                let err = TemplateError::CommandExecution {
                    command: command.to_string(),
                    message: err.to_string(),
                };
                match &self.options.error_handler {
                    Some(handler) => Ok(handler(&err, code)),
                    None => Err(err),
                }
            }
        }
    }

    fn insert(&mut self, value: &Dynamic, command: &str) -> Result<()> {
        match value_to_text(value, command)? {
            None if self.options.reject_nullish => Err(TemplateError::NullishCommandResult {
                command: command.to_string(),
            }),
            None => Ok(()),
            Some(text) => {
                if self.options.process_line_breaks && text.contains('\n') {
                    let text = break_lines(&text, &self.options.literal_xml_delimiter);
                    self.emit_text(&text);
                } else {
                    self.emit_text(&text);
                }
                Ok(())
            }
        }
    }

    fn insert_image(&mut self, value: &Dynamic, command: &str) -> Result<()> {
        let image = ImageSpec::from_dynamic(value, command)?;
        self.image_id += 1;
        let rel_id = format!("img{}", self.image_id);
        self.after_text.push(drawing(&rel_id, self.image_id, &image));
        if let Some(caption) = &image.caption {
            self.after_text.push(XmlElement::new("w:br"));
            self.after_text.push(
                XmlElement::new("w:t")
                    .with_attribute("xml:space", "preserve")
                    .with_text(caption.clone()),
            );
        }
        self.images.push(ImageEntry {
            rel_id,
            extension: image.extension,
            data: image.data,
        });
        self.mark(|frame| frame.has_content = true);
        Ok(())
    }

    fn begin_loop(&mut self, variable: String, items: Vec<Dynamic>, is_if: bool, pc: usize, segment: usize) {
        let resume = Resume {
            pc,
            segment,
            path: self.stack.iter().map(|f| f.template_index).collect(),
        };
        self.loops.push(Loop {
            variable,
            items,
            index: 0,
            is_if,
            resume: Some(resume),
        });
    }

    fn push_skipped(&mut self, variable: String, is_if: bool) {
        self.loops.push(Loop {
            variable,
            items: Vec::new(),
            index: 0,
            is_if,
            resume: None,
        });
    }

    fn end_loop(&mut self, summary: &CommandSummary) -> Result<Option<Resume>> {
        let Some(current) = self.loops.last_mut() else {
            return Err(TemplateError::invalid_command(
                format!("Unexpected {} without an open loop or condition", summary.kind),
                summary.raw.clone(),
            ));
        };
        match summary.kind {
            CommandKind::EndFor => {
                if current.is_if {
                    return Err(TemplateError::invalid_command(
                        "Unexpected END-FOR inside an IF block",
                        summary.raw.clone(),
                    ));
                }
                let variable = loop_variable(&summary.code);
                if !variable.is_empty() && variable != current.variable {
                    return Err(TemplateError::invalid_command(
                        format!("END-FOR does not match the open 'FOR {}'", current.variable),
                        summary.raw.clone(),
                    ));
                }
            }
            _ => {
                if !current.is_if {
                    return Err(TemplateError::invalid_command(
                        format!("Unexpected END-IF inside 'FOR {}'", current.variable),
                        summary.raw.clone(),
                    ));
                }
            }
        }

        current.index += 1;
        if current.index < current.items.len() {
            return Ok(current.resume.clone());
        }
        self.loops.pop();
        Ok(None)
    }
}

/// Raw commands of a preprocessed part in document order
pub fn raw_commands(root: &XmlElement, delimiters: &Delimiters) -> Vec<String> {
    root.elements_named("w:t")
        .iter()
        .flat_map(|t| delimiters.split(&t.text()))
        .filter_map(|segment| match segment {
            Segment::Command(command) => Some(command),
            Segment::Literal(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::preprocess_template;
    use docxmill_ooxml::{parse_xml, WriteOptions};
    use serde_json::json;

    fn paragraph(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    fn run(body: &str, data: Value, options: &ReportOptions) -> Result<PartReport> {
        let mut root = parse_xml(&format!("<w:body>{}</w:body>", body)).unwrap();
        preprocess_template(&mut root, &options.delimiters);
        Processor::new(options, &data, 0)?.process(root)
    }

    fn texts(report: &PartReport) -> Vec<String> {
        report
            .root
            .elements_named("w:p")
            .iter()
            .map(|p| p.text())
            .collect()
    }

    #[test]
    fn test_insert_values() {
        let report = run(
            &paragraph("Dear +++=name+++, you are +++age+++."),
            json!({"name": "Ada", "age": 36}),
            &ReportOptions::default(),
        )
        .unwrap();
        assert_eq!(texts(&report), vec!["Dear Ada, you are 36."]);
    }

    #[test]
    fn test_for_loop_over_paragraphs() {
        let body = [
            paragraph("+++FOR item IN items+++"),
            paragraph("- +++=$item.name+++"),
            paragraph("+++END-FOR item+++"),
            paragraph("done"),
        ]
        .concat();
        let data = json!({"items": [{"name": "a"}, {"name": "b"}]});
        let report = run(&body, data, &ReportOptions::default()).unwrap();
        assert_eq!(texts(&report), vec!["- a", "- b", "done"]);
    }

    #[test]
    fn test_for_loop_inside_one_paragraph() {
        let report = run(
            &paragraph("[+++FOR x IN [1, 2, 3]+++(+++=x+++)+++END-FOR x+++]"),
            json!({}),
            &ReportOptions::default(),
        )
        .unwrap();
        assert_eq!(texts(&report), vec!["[(1)(2)(3)]"]);
    }

    #[test]
    fn test_for_loop_over_table_rows() {
        let row = |text: &str| format!("<w:tr><w:tc>{}</w:tc></w:tr>", paragraph(text));
        let body = format!(
            "<w:tbl>{}{}{}{}</w:tbl>",
            row("Header"),
            row("+++FOR r IN rows+++"),
            row("+++=r+++"),
            row("+++END-FOR r+++")
        );
        let report = run(&body, json!({"rows": ["x", "y"]}), &ReportOptions::default()).unwrap();
        let rows = report.root.elements_named("w:tr");
        assert_eq!(rows.len(), 3);
        assert_eq!(texts(&report), vec!["Header", "x", "y"]);
    }

    #[test]
    fn test_cells_keep_a_paragraph() {
        let cell = |body: String| format!("<w:tc>{}</w:tc>", body);
        let body = format!(
            "<w:tbl><w:tr>{}{}</w:tr></w:tbl>",
            cell([paragraph("+++IF show+++"), paragraph("secret"), paragraph("+++END-IF+++")].concat()),
            cell(paragraph("other")),
        );
        let report = run(&body, json!({"show": false}), &ReportOptions::default()).unwrap();
        let cells = report.root.elements_named("w:tc");
        assert_eq!(cells.len(), 2);
        for cell in &cells {
            assert!(cell.first("w:p").is_some(), "{}", cell.to_xml(&WriteOptions::plain()));
        }
        assert_eq!(cells[0].text(), "");
        assert_eq!(cells[1].text(), "other");
    }

    #[test]
    fn test_row_loop_with_command_only_cells() {
        let cell = |text: &str| format!("<w:tc>{}</w:tc>", paragraph(text));
        let body = format!(
            "<w:tbl><w:tr>{}{}{}</w:tr></w:tbl>",
            cell("+++FOR r IN rows+++"),
            cell("+++=r+++"),
            cell("+++END-FOR r+++")
        );
        let report = run(&body, json!({"rows": ["x", "y"]}), &ReportOptions::default()).unwrap();
        let cells = report.root.elements_named("w:tc");
        assert!(!cells.is_empty());
        for cell in &cells {
            assert!(cell.first("w:p").is_some(), "{}", cell.to_xml(&WriteOptions::plain()));
        }
        assert_eq!(texts(&report).concat(), "xy");
    }

    #[test]
    fn test_empty_loop_drops_body() {
        let body = [
            paragraph("+++FOR x IN []+++"),
            paragraph("never +++=x.missing+++"),
            paragraph("+++END-FOR x+++"),
        ]
        .concat();
        let report = run(&body, json!({}), &ReportOptions::default()).unwrap();
        assert!(texts(&report).is_empty());
    }

    #[test]
    fn test_if_blocks() {
        let body = [
            paragraph("+++IF show+++"),
            paragraph("shown"),
            paragraph("+++END-IF+++"),
            paragraph("+++IF !show+++"),
            paragraph("hidden"),
            paragraph("+++END-IF+++"),
            paragraph("A+++IF false+++B+++END-IF+++C"),
        ]
        .concat();
        let report = run(&body, json!({"show": true}), &ReportOptions::default()).unwrap();
        assert_eq!(texts(&report), vec!["shown", "AC"]);
    }

    #[test]
    fn test_nested_loops() {
        let body = [
            paragraph("+++FOR g IN groups+++"),
            paragraph("+++=g.name+++:"),
            paragraph("+++FOR m IN g.members+++"),
            paragraph("+++=m+++"),
            paragraph("+++END-FOR m+++"),
            paragraph("+++END-FOR g+++"),
        ]
        .concat();
        let data = json!({"groups": [
            {"name": "one", "members": ["a", "b"]},
            {"name": "two", "members": []}
        ]});
        let report = run(&body, data, &ReportOptions::default()).unwrap();
        assert_eq!(texts(&report), vec!["one:", "a", "b", "two:"]);
    }

    #[test]
    fn test_exec_and_alias() {
        let body = [
            paragraph("+++EXEC fn shout(s) { s.to_upper() }+++"),
            paragraph("+++ALIAS hi INS shout(name)+++"),
            paragraph("+++*hi+++ and +++*hi+++"),
        ]
        .concat();
        let report = run(&body, json!({"name": "ada"}), &ReportOptions::default()).unwrap();
        assert_eq!(texts(&report), vec!["ADA and ADA"]);
    }

    #[test]
    fn test_line_breaks_become_br() {
        let report = run(
            &paragraph("+++=text+++"),
            json!({"text": "one\ntwo"}),
            &ReportOptions::default(),
        )
        .unwrap();
        let xml = report.root.to_xml(&WriteOptions::default());
        assert!(xml.contains(r#"one</w:t><w:br/><w:t xml:space="preserve">two"#));
    }

    #[test]
    fn test_inserted_text_is_escaped() {
        let report = run(
            &paragraph("+++=text+++"),
            json!({"text": "a < b & c"}),
            &ReportOptions::default(),
        )
        .unwrap();
        let xml = report.root.to_xml(&WriteOptions::default());
        assert!(xml.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_unterminated_loop() {
        let err = run(
            &paragraph("+++FOR x IN [1]+++"),
            json!({}),
            &ReportOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Unterminated FOR-loop ('FOR x')");

        let err = run(&paragraph("+++IF true+++"), json!({}), &ReportOptions::default()).unwrap_err();
        assert!(matches!(err, TemplateError::IncompleteConditional));
    }

    #[test]
    fn test_mismatched_end_for() {
        let err = run(
            &paragraph("+++FOR x IN [1]++++++END-FOR y+++"),
            json!({}),
            &ReportOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("END-FOR does not match the open 'FOR x'"));
    }

    #[test]
    fn test_collects_errors_without_fail_fast() {
        let options = ReportOptions::default().with_fail_fast(false);
        let err = run(
            &paragraph("+++=missing+++ +++=person+++ ok"),
            json!({"person": {"name": "x"}}),
            &options,
        )
        .unwrap_err();
        let errors = err.errors();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], TemplateError::CommandExecution { .. }));
        assert!(matches!(errors[1], TemplateError::ObjectCommandResult { .. }));
    }

    #[test]
    fn test_error_handler_substitutes_value() {
        let options = ReportOptions::default()
            .with_error_handler(|_, code| Dynamic::from(format!("<{}?>", code)));
        let report = run(&paragraph("+++=missing+++"), json!({}), &options).unwrap();
        assert_eq!(texts(&report), vec!["<missing?>"]);
    }

    #[test]
    fn test_reject_nullish() {
        let body = paragraph("a+++=()+++b");
        let report = run(&body, json!({}), &ReportOptions::default()).unwrap();
        assert_eq!(texts(&report), vec!["ab"]);

        let options = ReportOptions::default().with_reject_nullish(true);
        let err = run(&body, json!({}), &options).unwrap_err();
        assert!(matches!(err, TemplateError::NullishCommandResult { .. }));
    }

    #[test]
    fn test_image_link_and_html() {
        let body = [
            paragraph(r#"+++IMAGE #{width: 1, height: 1, data: "aGk=", extension: ".png", caption: "Fig"}+++"#),
            paragraph(r#"See +++LINK #{url: "https://example.com", label: "site"}+++"#),
            paragraph(r#"+++HTML "&lt;b&gt;bold&lt;/b&gt;"+++"#),
        ]
        .concat();
        let options = ReportOptions::default();
        let mut root = parse_xml(&format!("<w:body>{}</w:body>", body)).unwrap();
        preprocess_template(&mut root, &options.delimiters);
        let report = Processor::new(&options, &json!({}), 7)
            .unwrap()
            .process(root)
            .unwrap();

        assert_eq!(report.last_image_id, 8);
        assert_eq!(report.images[0].rel_id, "img8");
        assert_eq!(report.images[0].data, b"hi");
        assert_eq!(report.links, vec![("link1".to_string(), "https://example.com".to_string())]);
        assert_eq!(report.htmls[0].0, "html1");
        assert_eq!(report.htmls[0].1, r#"<meta charset="UTF-8"><body><b>bold</b></body>"#);

        let xml = report.root.to_xml(&WriteOptions::default());
        assert!(xml.contains(r#"<a:blip r:embed="img8"/>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">Fig</w:t>"#));
        assert!(xml.contains(r#"<w:hyperlink r:id="link1" w:history="1">"#));
        // The HTML paragraph is removed, its chunk stays in the body
        assert!(xml.ends_with(r#"<w:altChunk r:id="html1"/></w:body>"#));
        assert_eq!(texts(&report), vec!["Fig", "See site"]);
    }

    #[test]
    fn test_highest_image_id() {
        let root = parse_xml(
            r#"<w:body><wp:docPr id="4"/><x><wp:docPr id="12"/></x><wp:docPr id="x"/></w:body>"#,
        )
        .unwrap();
        assert_eq!(highest_image_id(&root), 12);
        assert_eq!(highest_image_id(&parse_xml("<w:body/>").unwrap()), 0);
    }

    #[test]
    fn test_raw_commands() {
        let root = parse_xml(&format!(
            "<w:body>{}{}</w:body>",
            paragraph("+++QUERY q+++ text"),
            paragraph("+++=a+++")
        ))
        .unwrap();
        assert_eq!(
            raw_commands(&root, &Delimiters::default()),
            vec!["QUERY q".to_string(), "=a".to_string()]
        );
    }
}
