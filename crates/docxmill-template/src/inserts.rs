//! Turning command results into document content

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use docxmill_ooxml::XmlElement;
use rhai::{Dynamic, Map};

use crate::error::{Result, TemplateError};

/// Extensions accepted by `IMAGE`
pub const IMAGE_EXTENSIONS: [&str; 6] = [".png", ".gif", ".jpg", ".jpeg", ".bmp", ".svg"];

/// EMUs per centimetre
const EMU_PER_CM: f64 = 360_000.0;

const PICTURE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const DRAWING_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// Render an INS result as text
///
/// Returns `None` for unit, which inserts nothing.
pub fn value_to_text(value: &Dynamic, command: &str) -> Result<Option<String>> {
    if value.is_unit() {
        return Ok(None);
    }
    if value.is_map() {
        return Err(TemplateError::ObjectCommandResult {
            command: command.to_string(),
        });
    }
    if value.is_array() {
        let items = value.clone().into_array().unwrap_or_default();
        let mut parts = Vec::with_capacity(items.len());
        for item in &items {
            parts.push(value_to_text(item, command)?.unwrap_or_default());
        }
        return Ok(Some(parts.join(",")));
    }
    if let Ok(f) = value.as_float() {
        return Ok(Some(format_float(f)));
    }
    Ok(Some(value.to_string()))
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Replace line breaks with literal `w:br` markup
///
/// The literal XML delimiter makes the writer emit the markup unescaped.
pub fn break_lines(text: &str, literal_delimiter: &str) -> String {
    let markup = format!(
        r#"{d}</w:t><w:br/><w:t xml:space="preserve">{d}"#,
        d = literal_delimiter
    );
    text.replace("\r\n", "\n").split('\n').collect::<Vec<_>>().join(&markup)
}

/// Contents of an IMAGE command result
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {
    /// Width in centimetres
    pub width: f64,
    /// Height in centimetres
    pub height: f64,
    /// Decoded image bytes
    pub data: Vec<u8>,
    /// Extension including the dot, e.g. `.png`
    pub extension: String,
    pub alt: Option<String>,
    /// Clockwise rotation in degrees
    pub rotation: Option<f64>,
    pub caption: Option<String>,
}

impl ImageSpec {
    /// Read `{ width, height, data, extension, alt?, rotation?, caption? }`
    pub fn from_dynamic(value: &Dynamic, command: &str) -> Result<Self> {
        let invalid = |message: &str| TemplateError::InvalidInsertion {
            kind: "IMAGE",
            command: command.to_string(),
            message: message.to_string(),
        };
        let map = value
            .clone()
            .try_cast::<Map>()
            .ok_or_else(|| invalid("expected a map with width, height, data and extension"))?;

        let width = number_field(&map, "width").ok_or_else(|| invalid("missing numeric 'width'"))?;
        let height = number_field(&map, "height").ok_or_else(|| invalid("missing numeric 'height'"))?;
        let extension = string_field(&map, "extension").ok_or_else(|| invalid("missing 'extension'"))?;
        let extension = if extension.starts_with('.') {
            extension.to_ascii_lowercase()
        } else {
            format!(".{}", extension.to_ascii_lowercase())
        };
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(invalid(&format!(
                "unsupported extension '{}', expected one of {}",
                extension,
                IMAGE_EXTENSIONS.join(", ")
            )));
        }

        let data = map.get("data").ok_or_else(|| invalid("missing 'data'"))?;
        let data = image_bytes(data).map_err(|message| invalid(&message))?;

        Ok(Self {
            width,
            height,
            data,
            extension,
            alt: string_field(&map, "alt"),
            rotation: number_field(&map, "rotation"),
            caption: string_field(&map, "caption"),
        })
    }
}

fn number_field(map: &Map, key: &str) -> Option<f64> {
    let value = map.get(key)?;
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|i| i as f64))
}

fn string_field(map: &Map, key: &str) -> Option<String> {
    map.get(key)
        .filter(|v| v.is_string())
        .map(|v| v.to_string())
}

/// Image data: a base64 string, a blob or an array of bytes
fn image_bytes(data: &Dynamic) -> std::result::Result<Vec<u8>, String> {
    if data.is_string() {
        let text = data.to_string();
        let payload = match text.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => text.as_str(),
        };
        return STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("'data' is not valid base64: {}", e));
    }
    if data.is_blob() {
        return Ok(data.clone().cast::<rhai::Blob>());
    }
    if let Some(items) = data.clone().try_cast::<rhai::Array>() {
        return items
            .iter()
            .map(|item| {
                item.as_int()
                    .ok()
                    .and_then(|i| u8::try_from(i).ok())
                    .ok_or_else(|| "'data' array must contain bytes".to_string())
            })
            .collect();
    }
    Err("'data' must be a base64 string or a blob".to_string())
}

/// `w:drawing` for an inline picture referencing relationship `rel_id`
pub fn drawing(rel_id: &str, doc_pr_id: u32, image: &ImageSpec) -> XmlElement {
    let cx = (image.width * EMU_PER_CM).round() as i64;
    let cy = (image.height * EMU_PER_CM).round() as i64;
    let name = format!("Picture {}", doc_pr_id);
    let alt = image.alt.clone().unwrap_or_default();

    let mut xfrm = XmlElement::new("a:xfrm");
    if let Some(rotation) = image.rotation {
        xfrm = xfrm.with_attribute("rot", ((rotation * 60_000.0).round() as i64).to_string());
    }
    let xfrm = xfrm
        .with_child(XmlElement::new("a:off").with_attribute("x", "0").with_attribute("y", "0"))
        .with_child(
            XmlElement::new("a:ext")
                .with_attribute("cx", cx.to_string())
                .with_attribute("cy", cy.to_string()),
        );

    let picture = XmlElement::new("pic:pic")
        .with_attribute("xmlns:pic", PICTURE_URI)
        .with_child(
            XmlElement::new("pic:nvPicPr")
                .with_child(
                    XmlElement::new("pic:cNvPr")
                        .with_attribute("id", "0")
                        .with_attribute("name", name.clone())
                        .with_attribute("descr", alt.clone()),
                )
                .with_child(
                    XmlElement::new("pic:cNvPicPr").with_child(
                        XmlElement::new("a:picLocks")
                            .with_attribute("noChangeAspect", "1")
                            .with_attribute("noChangeArrowheads", "1"),
                    ),
                ),
        )
        .with_child(
            XmlElement::new("pic:blipFill")
                .with_child(XmlElement::new("a:blip").with_attribute("r:embed", rel_id))
                .with_child(XmlElement::new("a:srcRect"))
                .with_child(XmlElement::new("a:stretch").with_child(XmlElement::new("a:fillRect"))),
        )
        .with_child(
            XmlElement::new("pic:spPr")
                .with_attribute("bwMode", "auto")
                .with_child(xfrm)
                .with_child(
                    XmlElement::new("a:prstGeom")
                        .with_attribute("prst", "rect")
                        .with_child(XmlElement::new("a:avLst")),
                ),
        );

    XmlElement::new("w:drawing").with_child(
        XmlElement::new("wp:inline")
            .with_attribute("distT", "0")
            .with_attribute("distB", "0")
            .with_attribute("distL", "0")
            .with_attribute("distR", "0")
            .with_child(
                XmlElement::new("wp:extent")
                    .with_attribute("cx", cx.to_string())
                    .with_attribute("cy", cy.to_string()),
            )
            .with_child(
                XmlElement::new("wp:docPr")
                    .with_attribute("id", doc_pr_id.to_string())
                    .with_attribute("name", name)
                    .with_attribute("descr", alt),
            )
            .with_child(
                XmlElement::new("wp:cNvGraphicFramePr").with_child(
                    XmlElement::new("a:graphicFrameLocks")
                        .with_attribute("xmlns:a", DRAWING_NS)
                        .with_attribute("noChangeAspect", "1"),
                ),
            )
            .with_child(
                XmlElement::new("a:graphic")
                    .with_attribute("xmlns:a", DRAWING_NS)
                    .with_child(
                        XmlElement::new("a:graphicData")
                            .with_attribute("uri", PICTURE_URI)
                            .with_child(picture),
                    ),
            ),
    )
}

/// Contents of a LINK command result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub url: String,
    pub label: Option<String>,
}

impl LinkSpec {
    /// Read `{ url, label? }`
    pub fn from_dynamic(value: &Dynamic, command: &str) -> Result<Self> {
        let map = value.clone().try_cast::<Map>();
        match map.as_ref().and_then(|m| string_field(m, "url")) {
            Some(url) => Ok(Self {
                url,
                label: map.as_ref().and_then(|m| string_field(m, "label")),
            }),
            None => Err(TemplateError::InvalidInsertion {
                kind: "LINK",
                command: command.to_string(),
                message: "expected a map with a 'url' string".to_string(),
            }),
        }
    }
}

/// `w:hyperlink` pointing at relationship `rel_id`
pub fn hyperlink(rel_id: &str, link: &LinkSpec) -> XmlElement {
    let label = link.label.clone().unwrap_or_else(|| link.url.clone());
    XmlElement::new("w:hyperlink")
        .with_attribute("r:id", rel_id)
        .with_attribute("w:history", "1")
        .with_child(
            XmlElement::new("w:r")
                .with_child(
                    XmlElement::new("w:rPr")
                        .with_child(XmlElement::new("w:color").with_attribute("w:val", "0563C1"))
                        .with_child(XmlElement::new("w:u").with_attribute("w:val", "single")),
                )
                .with_child(
                    XmlElement::new("w:t")
                        .with_attribute("xml:space", "preserve")
                        .with_text(label),
                ),
        )
}

/// Wrap an HTML fragment as a standalone chunk document
pub fn html_chunk(html: &str) -> String {
    format!(r#"<meta charset="UTF-8"><body>{}</body>"#, html)
}

/// `w:altChunk` pointing at relationship `rel_id`
pub fn alt_chunk(rel_id: &str) -> XmlElement {
    XmlElement::new("w:altChunk").with_attribute("r:id", rel_id)
}
