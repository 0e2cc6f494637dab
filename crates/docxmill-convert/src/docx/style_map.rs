//! Style maps embedded in a DOCX package
//!
//! The map is stored as a plain text part and registered both in the main
//! document's relationships and in the content-type manifest, so Word keeps
//! it when the document is edited and saved.

use docxmill_ooxml::paths::rels_path_for;
use docxmill_ooxml::{ContentTypes, OoxmlArchive, Relationships};
use tracing::debug;

use crate::error::Result;

/// Zip entry holding the embedded style map
pub const STYLE_MAP_PATH: &str = "mammoth/style-map";
/// Relationship type of the embedded style map
pub const STYLE_MAP_RELATIONSHIP_TYPE: &str = "http://schemas.zwobble.org/mammoth/style-map";
/// Content type of the embedded style map
pub const STYLE_MAP_CONTENT_TYPE: &str = "text/prs.mammoth.style-map";
const STYLE_MAP_RELATIONSHIP_ID: &str = "rMammothStyleMap";

/// Store `style_map` inside the package, replacing any earlier map
pub fn write_style_map(archive: &mut OoxmlArchive, main_document: &str, style_map: &str) -> Result<()> {
    let absolute_path = format!("/{}", STYLE_MAP_PATH);
    archive.set_string(STYLE_MAP_PATH, style_map);

    let rels_path = rels_path_for(main_document);
    let mut relationships = Relationships::parse_optional(archive.get(&rels_path))?;
    relationships.add_with_id(
        STYLE_MAP_RELATIONSHIP_ID,
        absolute_path.as_str(),
        STYLE_MAP_RELATIONSHIP_TYPE,
        None,
    );
    archive.set_string(rels_path, relationships.to_xml());

    let mut content_types = ContentTypes::read(archive)?;
    content_types.add_override(&absolute_path, STYLE_MAP_CONTENT_TYPE);
    content_types.write(archive);

    debug!(bytes = style_map.len(), "embedded style map");
    Ok(())
}

/// The embedded style map, if the package has one
pub fn read_style_map(archive: &OoxmlArchive) -> Option<String> {
    archive.get_string(STYLE_MAP_PATH)
}
