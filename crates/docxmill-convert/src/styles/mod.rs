//! The style-map mini-language
//!
//! A style map is a list of rules such as `p[style-name='Heading 1'] => h1:fresh`.
//! The first rule whose matcher accepts a document element decides the HTML
//! it is wrapped in.

pub mod html_paths;
pub mod matchers;
mod parser;
pub mod tokeniser;

pub use html_paths::HtmlPath;
pub use matchers::{DocumentMatcher, ElementMatcher, ListMatcher, MatchTarget, StringMatcher};
pub use parser::{
    parse_style_map, read_document_matcher, read_html_path, read_style, read_style_map_lines,
    StyleMapping,
};
