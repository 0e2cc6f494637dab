//! Output writers for the simplified HTML tree

mod html;
mod markdown;

pub use html::{escape_html_attribute, escape_html_text, HtmlWriter, PrettyHtmlWriter};
pub use markdown::{escape_markdown, MarkdownWriter};

use crate::options::OutputFormat;

/// Receives the HTML tree as a stream of open/close/text events
pub trait Writer {
    fn open(&mut self, tag_name: &str, attributes: &[(String, String)]);
    fn close(&mut self, tag_name: &str);
    fn text(&mut self, value: &str);
    fn self_closing(&mut self, tag_name: &str, attributes: &[(String, String)]);
    /// Everything written so far
    fn as_string(&self) -> String;
}

/// Pick the writer for an output format
pub fn writer(output_format: OutputFormat, pretty_print: bool) -> Box<dyn Writer> {
    match output_format {
        OutputFormat::Markdown => Box::new(MarkdownWriter::new()),
        OutputFormat::Html if pretty_print => Box::new(PrettyHtmlWriter::new()),
        OutputFormat::Html => Box::new(HtmlWriter::new()),
    }
}
