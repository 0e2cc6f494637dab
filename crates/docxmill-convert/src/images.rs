//! Image conversion hooks

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::document::Image;
use crate::error::Result;
use crate::html::{fresh_element, HtmlNode};

/// Turns an image into HTML nodes
pub type ImageConverter = Arc<dyn Fn(&Image) -> Result<Vec<HtmlNode>> + Send + Sync>;

/// Build a converter producing one `img` element
///
/// `attributes` supplies the attributes (at least `src`); the image's alt
/// text is added unless the callback already set `alt`.
pub fn img_element<F>(attributes: F) -> ImageConverter
where
    F: Fn(&Image) -> Result<Vec<(String, String)>> + Send + Sync + 'static,
{
    Arc::new(move |image: &Image| {
        let mut attributes = attributes(image)?;
        if let Some(alt_text) = &image.alt_text {
            if !attributes.iter().any(|(name, _)| name == "alt") {
                attributes.push(("alt".to_string(), alt_text.clone()));
            }
        }
        Ok(vec![fresh_element("img", attributes, Vec::new())])
    })
}

/// Embed the image bytes as a base64 `data:` URI
pub fn data_uri() -> ImageConverter {
    img_element(|image| {
        let content_type = image.content_type.as_deref().unwrap_or("application/octet-stream");
        Ok(vec![(
            "src".to_string(),
            format!("data:{};base64,{}", content_type, STANDARD.encode(&image.data)),
        )])
    })
}
