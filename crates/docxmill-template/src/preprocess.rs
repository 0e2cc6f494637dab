//! Template preparation before processing
//!
//! Word splits text into runs wherever formatting, spell checking or editing
//! history changes, so a command typed as `+++INS name+++` can end up spread
//! over several `w:t` nodes. Preprocessing moves every command, delimiters
//! included, into the text node where it starts. A node that loses text this
//! way receives a `CMD_NODE` placeholder, so its paragraph still counts as
//! one that held a command.

use docxmill_ooxml::{XmlElement, XmlNode};

use crate::commands::CMD_NODE;
use crate::delimiters::Delimiters;

/// Merge split commands and mark every `w:t` as whitespace-preserving
pub fn preprocess_template(root: &mut XmlElement, delimiters: &Delimiters) {
    let mut slots: Vec<&mut String> = Vec::new();
    collect_text_slots(root, &mut slots);
    let texts: Vec<String> = slots.iter().map(|slot| slot.to_string()).collect();
    for (slot, text) in slots.into_iter().zip(merge_commands(&texts, delimiters)) {
        *slot = text;
    }
}

fn collect_text_slots<'a>(element: &'a mut XmlElement, slots: &mut Vec<&'a mut String>) {
    for child in element.children.iter_mut() {
        if let XmlNode::Element(child) = child {
            if child.name == "w:t" {
                child.set_attribute("xml:space", "preserve");
                for node in child.children.iter_mut() {
                    if let XmlNode::Text(text) = node {
                        slots.push(text);
                    }
                }
            } else {
                collect_text_slots(child, slots);
            }
        }
    }
}

/// Redistribute the text of consecutive nodes so each command sits in its first node
fn merge_commands(texts: &[String], delimiters: &Delimiters) -> Vec<String> {
    let joined = texts.concat();
    let mut bounds = Vec::with_capacity(texts.len());
    let mut offset = 0;
    for text in texts {
        bounds.push((offset, offset + text.len()));
        offset += text.len();
    }

    let placeholder = delimiters.wrap(CMD_NODE);
    let mut merged = vec![String::new(); texts.len()];
    let copy_own = |merged: &mut Vec<String>, from: usize, to: usize| {
        for (slot, &(start, end)) in bounds.iter().enumerate() {
            let (lo, hi) = (from.max(start), to.min(end));
            if lo < hi {
                merged[slot].push_str(&joined[lo..hi]);
            }
        }
    };

    let mut position = 0;
    for (start, end) in delimiters.command_ranges(&joined) {
        copy_own(&mut merged, position, start);
        let owner = bounds.partition_point(|&(_, slot_end)| slot_end <= start);
        merged[owner].push_str(&joined[start..end]);
        for (slot, &(slot_start, slot_end)) in bounds.iter().enumerate().skip(owner + 1) {
            if slot_start >= end {
                break;
            }
            if slot_end > slot_start {
                merged[slot].push_str(&placeholder);
            }
        }
        position = end;
    }
    copy_own(&mut merged, position, joined.len());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use docxmill_ooxml::parse_xml;

    fn merge(texts: &[&str]) -> Vec<String> {
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        merge_commands(&texts, &Delimiters::default())
    }

    #[test]
    fn test_untouched_without_commands() {
        assert_eq!(merge(&["Hello ", "world"]), vec!["Hello ", "world"]);
    }

    #[test]
    fn test_command_split_across_nodes() {
        assert_eq!(
            merge(&["Dear +++IN", "S na", "me+++, hi"]),
            vec![
                "Dear +++INS name+++".to_string(),
                "+++CMD_NODE+++".to_string(),
                "+++CMD_NODE+++, hi".to_string(),
            ]
        );
    }

    #[test]
    fn test_split_delimiter() {
        assert_eq!(
            merge(&["a +", "++=x+", "++ b"]),
            vec!["a +++=x+++", "+++CMD_NODE+++", "+++CMD_NODE+++ b"]
        );
    }

    #[test]
    fn test_several_commands_in_one_node() {
        assert_eq!(
            merge(&["+++=a+++ and +++=b", "+++"]),
            vec!["+++=a+++ and +++=b+++", "+++CMD_NODE+++"]
        );
    }

    #[test]
    fn test_preprocess_tree() {
        let mut root = parse_xml(
            r#"<w:body><w:p><w:r><w:t>+++IF </w:t></w:r><w:r><w:t>ok+++</w:t></w:r></w:p></w:body>"#,
        )
        .unwrap();
        preprocess_template(&mut root, &Delimiters::default());
        let texts: Vec<_> = root.elements_named("w:t").iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["+++IF ok+++", "+++CMD_NODE+++"]);
        assert!(root
            .elements_named("w:t")
            .iter()
            .all(|t| t.attribute("xml:space") == Some("preserve")));
    }
}
