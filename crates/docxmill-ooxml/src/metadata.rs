//! Document properties from `docProps/app.xml` and `docProps/core.xml`

use serde::Serialize;

use crate::archive::OoxmlArchive;
use crate::error::Result;
use crate::xml::{XmlElement, XmlNode};

/// Path of the extended (application) properties part
pub const APP_XML_PATH: &str = "docProps/app.xml";
/// Path of the core properties part
pub const CORE_XML_PATH: &str = "docProps/core.xml";

/// Summary properties of a document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub pages: Option<f64>,
    pub words: Option<f64>,
    pub characters: Option<f64>,
    pub lines: Option<f64>,
    pub paragraphs: Option<f64>,
    pub company: Option<String>,
    pub template: Option<String>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub revision: Option<String>,
    pub last_printed: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub category: Option<String>,
}

/// Read the summary properties; both property parts must exist
pub fn read_metadata(archive: &OoxmlArchive) -> Result<Metadata> {
    let app = archive.require_xml(APP_XML_PATH)?;
    let core = archive.require_xml(CORE_XML_PATH)?;

    Ok(Metadata {
        pages: numberize(child_text(&app, "Pages")),
        words: numberize(child_text(&app, "Words")),
        characters: numberize(child_text(&app, "Characters")),
        lines: numberize(child_text(&app, "Lines")),
        paragraphs: numberize(child_text(&app, "Paragraphs")),
        company: child_text(&app, "Company"),
        template: child_text(&app, "Template"),
        title: child_text(&core, "dc:title"),
        subject: child_text(&core, "dc:subject"),
        creator: child_text(&core, "dc:creator"),
        description: child_text(&core, "dc:description"),
        last_modified_by: child_text(&core, "cp:lastModifiedBy"),
        revision: child_text(&core, "cp:revision"),
        last_printed: child_text(&core, "cp:lastPrinted"),
        created: child_text(&core, "dcterms:created"),
        modified: child_text(&core, "dcterms:modified"),
        category: child_text(&core, "cp:category"),
    })
}

/// Text of the first direct child named `tag`, only if that child starts with text
fn child_text(parent: &XmlElement, tag: &str) -> Option<String> {
    match parent.first(tag)?.children.first()? {
        XmlNode::Text(text) => Some(text.clone()),
        XmlNode::Element(_) => None,
    }
}

fn numberize(value: Option<String>) -> Option<f64> {
    value?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}
