use super::Writer;

#[derive(Debug, Clone, Copy)]
struct ListState {
    is_ordered: bool,
    indent: usize,
    count: usize,
}

#[derive(Debug)]
enum ElementEnd {
    Text(String),
    /// List items end with a newline unless a nested item already wrote one
    ListItem,
}

#[derive(Debug)]
struct OpenElement {
    end: ElementEnd,
    pushed_list: bool,
}

#[derive(Debug, Default)]
struct MarkdownElement {
    start: String,
    end: Option<ElementEnd>,
    anchor_before_start: bool,
    list: Option<ListState>,
}

/// Writes Markdown for the subset of HTML the converter produces
///
/// Unknown tags contribute only their text.
#[derive(Debug, Default)]
pub struct MarkdownWriter {
    fragments: Vec<String>,
    element_stack: Vec<OpenElement>,
    lists: Vec<ListState>,
    list_item_closed: bool,
}

impl MarkdownWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn element_for(&mut self, tag_name: &str, attributes: &[(String, String)]) -> MarkdownElement {
        match tag_name {
            "p" => symmetric_block("", "\n\n"),
            "br" => symmetric_block("", "  \n"),
            "ul" | "ol" => {
                let parent = self.lists.last();
                MarkdownElement {
                    start: if parent.is_some() { "\n" } else { "" }.to_string(),
                    end: Some(ElementEnd::Text(
                        if parent.is_some() { "" } else { "\n" }.to_string(),
                    )),
                    anchor_before_start: false,
                    list: Some(ListState {
                        is_ordered: tag_name == "ol",
                        indent: parent.map_or(0, |list| list.indent + 1),
                        count: 0,
                    }),
                }
            }
            "li" => {
                let (indent, bullet) = match self.lists.last_mut() {
                    Some(list) => {
                        list.count += 1;
                        let bullet = if list.is_ordered {
                            format!("{}.", list.count)
                        } else {
                            "-".to_string()
                        };
                        (list.indent, bullet)
                    }
                    None => (0, "-".to_string()),
                };
                self.list_item_closed = false;
                MarkdownElement {
                    start: format!("{}{} ", "\t".repeat(indent), bullet),
                    end: Some(ElementEnd::ListItem),
                    ..MarkdownElement::default()
                }
            }
            "strong" => symmetric_block("__", "__"),
            "em" => symmetric_block("*", "*"),
            "a" => match attribute(attributes, "href").filter(|href| !href.is_empty()) {
                Some(href) => MarkdownElement {
                    start: "[".to_string(),
                    end: Some(ElementEnd::Text(format!("]({})", href))),
                    anchor_before_start: true,
                    list: None,
                },
                None => MarkdownElement::default(),
            },
            "img" => {
                let src = attribute(attributes, "src").unwrap_or_default();
                let alt = attribute(attributes, "alt").unwrap_or_default();
                if src.is_empty() && alt.is_empty() {
                    MarkdownElement::default()
                } else {
                    MarkdownElement {
                        start: format!("![{}]({})", alt, src),
                        ..MarkdownElement::default()
                    }
                }
            }
            heading if is_heading(heading) => {
                let level = heading[1..].parse::<usize>().unwrap_or(1);
                symmetric_block(&format!("{} ", "#".repeat(level)), "\n\n")
            }
            _ => MarkdownElement::default(),
        }
    }

    fn write_anchor(&mut self, attributes: &[(String, String)]) {
        if let Some(id) = attribute(attributes, "id") {
            self.fragments.push(format!("<a id=\"{}\"></a>", id));
        }
    }
}

fn symmetric_block(start: &str, end: &str) -> MarkdownElement {
    MarkdownElement {
        start: start.to_string(),
        end: Some(ElementEnd::Text(end.to_string())),
        ..MarkdownElement::default()
    }
}

fn is_heading(tag_name: &str) -> bool {
    matches!(tag_name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

impl Writer for MarkdownWriter {
    fn open(&mut self, tag_name: &str, attributes: &[(String, String)]) {
        let element = self.element_for(tag_name, attributes);

        let pushed_list = match element.list {
            Some(list) => {
                self.lists.push(list);
                true
            }
            None => false,
        };
        self.element_stack.push(OpenElement {
            end: element.end.unwrap_or(ElementEnd::Text(String::new())),
            pushed_list,
        });

        if element.anchor_before_start {
            self.write_anchor(attributes);
        }
        self.fragments.push(element.start);
        if !element.anchor_before_start {
            self.write_anchor(attributes);
        }
    }

    fn close(&mut self, _tag_name: &str) {
        let Some(element) = self.element_stack.pop() else {
            return;
        };
        if element.pushed_list {
            self.lists.pop();
        }
        match element.end {
            ElementEnd::Text(end) => self.fragments.push(end),
            ElementEnd::ListItem => {
                if !self.list_item_closed {
                    self.list_item_closed = true;
                    self.fragments.push("\n".to_string());
                }
            }
        }
    }

    fn text(&mut self, value: &str) {
        self.fragments.push(escape_markdown(value));
    }

    fn self_closing(&mut self, tag_name: &str, attributes: &[(String, String)]) {
        self.open(tag_name, attributes);
        self.close(tag_name);
    }

    fn as_string(&self) -> String {
        self.fragments.concat()
    }
}

/// Backslash-escape characters with meaning in Markdown
pub fn escape_markdown(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(
            c,
            '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '#' | '+' | '-' | '.' | '!'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
