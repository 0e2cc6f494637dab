use super::Writer;

const INDENTED_ELEMENTS: [&str; 4] = ["div", "p", "ul", "li"];
const INDENTATION: &str = "  ";

/// Writes compact HTML
#[derive(Debug, Default)]
pub struct HtmlWriter {
    fragments: Vec<String>,
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, html: impl Into<String>) {
        self.fragments.push(html.into());
    }
}

fn attribute_string(attributes: &[(String, String)]) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!(" {}=\"{}\"", key, escape_html_attribute(value)))
        .collect()
}

impl Writer for HtmlWriter {
    fn open(&mut self, tag_name: &str, attributes: &[(String, String)]) {
        self.append(format!("<{}{}>", tag_name, attribute_string(attributes)));
    }

    fn close(&mut self, tag_name: &str) {
        self.append(format!("</{}>", tag_name));
    }

    fn text(&mut self, value: &str) {
        self.append(escape_html_text(value));
    }

    fn self_closing(&mut self, tag_name: &str, attributes: &[(String, String)]) {
        self.append(format!("<{}{} />", tag_name, attribute_string(attributes)));
    }

    fn as_string(&self) -> String {
        self.fragments.concat()
    }
}

/// Writes HTML with block elements on their own indented lines
///
/// Content inside `pre` is written untouched.
#[derive(Debug)]
pub struct PrettyHtmlWriter {
    inner: HtmlWriter,
    indentation_level: usize,
    stack: Vec<String>,
    start: bool,
    in_text: bool,
}

impl Default for PrettyHtmlWriter {
    fn default() -> Self {
        Self {
            inner: HtmlWriter::new(),
            indentation_level: 0,
            stack: Vec::new(),
            start: true,
            in_text: false,
        }
    }
}

impl PrettyHtmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_indented(tag_name: &str) -> bool {
        INDENTED_ELEMENTS.contains(&tag_name)
    }

    fn inside_indented_element(&self) -> bool {
        self.stack.last().map_or(true, |tag| Self::is_indented(tag))
    }

    fn is_in_pre(&self) -> bool {
        self.stack.iter().any(|tag| tag == "pre")
    }

    fn indent(&mut self) {
        self.in_text = false;
        if !self.start && self.inside_indented_element() && !self.is_in_pre() {
            self.inner.append("\n");
            for _ in 0..self.indentation_level {
                self.inner.append(INDENTATION);
            }
        }
    }

    fn start_text(&mut self) {
        if !self.in_text {
            self.indent();
            self.in_text = true;
        }
    }
}

impl Writer for PrettyHtmlWriter {
    fn open(&mut self, tag_name: &str, attributes: &[(String, String)]) {
        if Self::is_indented(tag_name) {
            self.indent();
        }
        self.stack.push(tag_name.to_string());
        self.inner.open(tag_name, attributes);
        if Self::is_indented(tag_name) {
            self.indentation_level += 1;
        }
        self.start = false;
    }

    fn close(&mut self, tag_name: &str) {
        if Self::is_indented(tag_name) {
            self.indentation_level = self.indentation_level.saturating_sub(1);
            self.indent();
        }
        self.stack.pop();
        self.inner.close(tag_name);
    }

    fn text(&mut self, value: &str) {
        self.start_text();
        if self.is_in_pre() {
            self.inner.text(value);
        } else {
            let indented = value.replacen('\n', &format!("\n{}", INDENTATION), 1);
            self.inner.text(&indented);
        }
    }

    fn self_closing(&mut self, tag_name: &str, attributes: &[(String, String)]) {
        self.indent();
        self.inner.self_closing(tag_name, attributes);
    }

    fn as_string(&self) -> String {
        self.inner.as_string()
    }
}

/// Escape HTML character data
pub fn escape_html_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an HTML attribute value
pub fn escape_html_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_writer_escapes() {
        let mut writer = HtmlWriter::new();
        writer.open("a", &attrs(&[("href", "?a=1&b=\"2\"")]));
        writer.text("<b> & co");
        writer.close("a");
        writer.self_closing("img", &attrs(&[("alt", "x")]));
        assert_eq!(
            writer.as_string(),
            r#"<a href="?a=1&amp;b=&quot;2&quot;">&lt;b&gt; &amp; co</a><img alt="x" />"#
        );
    }

    #[test]
    fn test_pretty_writer_indents_blocks() {
        let mut writer = PrettyHtmlWriter::new();
        writer.open("ul", &[]);
        writer.open("li", &[]);
        writer.text("one");
        writer.close("li");
        writer.close("ul");
        writer.open("p", &[]);
        writer.open("strong", &[]);
        writer.text("bold");
        writer.close("strong");
        writer.close("p");
        assert_eq!(
            writer.as_string(),
            "<ul>\n  <li>\n    one\n  </li>\n</ul>\n<p><strong>bold</strong>\n</p>"
        );
    }

    #[test]
    fn test_pretty_writer_leaves_pre_alone() {
        let mut writer = PrettyHtmlWriter::new();
        writer.open("div", &[]);
        writer.open("pre", &[]);
        writer.text("a\nb");
        writer.close("pre");
        writer.close("div");
        assert_eq!(writer.as_string(), "<div><pre>a\nb</pre>\n</div>");
    }
}
