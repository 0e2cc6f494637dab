use super::{element_with_tag, text, HtmlElement, HtmlNode};

/// Drop empty nodes, then merge adjacent non-fresh elements that match
pub fn simplify(nodes: Vec<HtmlNode>) -> Vec<HtmlNode> {
    collapse(remove_empty(nodes))
}

fn remove_empty(nodes: Vec<HtmlNode>) -> Vec<HtmlNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            HtmlNode::Element(element) => {
                let children = remove_empty(element.children);
                let element = HtmlElement {
                    tag: element.tag,
                    children,
                };
                if element.children.is_empty() && !element.is_void() {
                    None
                } else {
                    Some(HtmlNode::Element(element))
                }
            }
            HtmlNode::Text(value) if value.is_empty() => None,
            other => Some(other),
        })
        .collect()
}

fn collapse(nodes: Vec<HtmlNode>) -> Vec<HtmlNode> {
    let mut children = Vec::new();
    for node in nodes {
        let node = match node {
            HtmlNode::Element(element) => element_with_tag(element.tag, collapse(element.children)),
            other => other,
        };
        append_child(&mut children, node);
    }
    children
}

fn append_child(children: &mut Vec<HtmlNode>, child: HtmlNode) {
    let child = match child {
        HtmlNode::Element(element) if !element.tag.fresh => element,
        other => {
            children.push(other);
            return;
        }
    };

    match children.last_mut() {
        Some(HtmlNode::Element(last)) if child.tag.matches_element(&last.tag) => {
            if let Some(separator) = &child.tag.separator {
                append_child(&mut last.children, text(separator.clone()));
            }
            for grand_child in child.children {
                append_child(&mut last.children, grand_child);
            }
        }
        _ => children.push(HtmlNode::Element(child)),
    }
}
