//! Package rewrite tests
//!
//! Open a fixture package, change parts through the public API, zip it again
//! and check that the result reads back consistently.

use docxmill_ooxml::test_utils::{extract_file, DocxFixture};
use docxmill_ooxml::{ContentTypes, OoxmlArchive, Relationships, WriteOptions};

mod content_types {
    use super::*;

    #[test]
    fn test_fixture_main_document_is_found() {
        let docx = DocxFixture::new().build();
        let archive = OoxmlArchive::from_bytes(&docx).unwrap();
        let types = ContentTypes::read(&archive).unwrap();
        assert_eq!(types.main_document_part().unwrap(), "document.xml");
    }

    #[test]
    fn test_added_defaults_survive_rezip() {
        let docx = DocxFixture::new().build();
        let mut archive = OoxmlArchive::from_bytes(&docx).unwrap();

        let mut types = ContentTypes::read(&archive).unwrap();
        types.ensure_default("png", "image/png");
        types.write(&mut archive);

        let bytes = archive.to_bytes().unwrap();
        let manifest = extract_file(&bytes, "[Content_Types].xml").unwrap();
        assert!(manifest.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert_eq!(manifest.matches(r#"Extension="xml""#).count(), 1);
    }
}

mod relationships {
    use super::*;

    #[test]
    fn test_new_relationships_are_written_back() {
        let docx = DocxFixture::new()
            .external_rel("rId1", Relationships::TYPE_HYPERLINK, "https://example.com")
            .build();
        let mut archive = OoxmlArchive::from_bytes(&docx).unwrap();

        let mut rels = Relationships::parse_optional(archive.get("word/_rels/document.xml.rels")).unwrap();
        assert_eq!(rels.get("rId1"), Some("https://example.com"));
        assert_eq!(
            rels.get_target("rId1").and_then(|r| r.target_mode.as_deref()),
            Some("External")
        );

        rels.add_with_id("img1", "media/template_document.xml_img1.png", Relationships::TYPE_IMAGE, None);
        archive.set_string("word/_rels/document.xml.rels", rels.to_xml());

        let reread = Relationships::parse(archive.get("word/_rels/document.xml.rels").unwrap()).unwrap();
        assert_eq!(reread.len(), 2);
        assert_eq!(reread.targets_of_type(Relationships::TYPE_IMAGE).count(), 1);
    }

    #[test]
    fn test_missing_rels_part_is_empty() {
        let rels = Relationships::parse_optional(None).unwrap();
        assert!(rels.is_empty());
    }
}

mod xml_parts {
    use super::*;

    #[test]
    fn test_document_part_survives_parse_and_write() {
        let docx = DocxFixture::new()
            .body(r#"<w:p><w:r><w:t xml:space="preserve"> spaced  &amp; escaped </w:t></w:r></w:p>"#)
            .build();
        let mut archive = OoxmlArchive::from_bytes(&docx).unwrap();

        let document = archive.require_xml("word/document.xml").unwrap();
        archive.set_xml("word/document.xml", &document, &WriteOptions::plain());

        let reread = archive.require_xml("word/document.xml").unwrap();
        assert_eq!(document, reread);
        assert_eq!(reread.elements_named("w:t")[0].text(), " spaced  & escaped ");
    }
}
