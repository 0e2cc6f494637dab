//! End-to-end conversion tests
//!
//! Packages are assembled in memory with the ooxml test fixtures and run
//! through the public API.
//!
//! Test Categories:
//! 1. HTML conversion - styles, lists, links, images, notes
//! 2. Markdown conversion
//! 3. Raw text extraction
//! 4. Embedded style maps

use docxmill_ooxml::test_utils::DocxFixture;

const HEADING_STYLES: &str = concat!(
    r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/></w:style>"#,
);

const BULLET_NUMBERING: &str = concat!(
    r#"<w:abstractNum w:abstractNumId="0">"#,
    r#"<w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/></w:lvl>"#,
    r#"<w:lvl w:ilvl="1"><w:numFmt w:val="decimal"/></w:lvl>"#,
    r#"</w:abstractNum>"#,
    r#"<w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>"#,
);

fn list_item(level: usize, value: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="{}"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
        level, value
    )
}

// =============================================================================
// PART 1: HTML CONVERSION
// =============================================================================

mod html_tests {
    use super::*;
    use docxmill_convert::{convert_to_html, ConvertOptions, Message};

    #[test]
    fn test_default_style_map_headings() {
        let docx = DocxFixture::new()
            .styles(HEADING_STYLES)
            .body(concat!(
                r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>"#,
                r#"<w:p><w:r><w:t>Text &amp; more</w:t></w:r></w:p>"#,
            ))
            .build();

        let result = convert_to_html(&docx, &ConvertOptions::default()).unwrap();
        assert_eq!(result.value, "<h1>Intro</h1><p>Text &amp; more</p>");
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_custom_mapping_beats_default() {
        let docx = DocxFixture::new()
            .styles(HEADING_STYLES)
            .body(r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>"#)
            .build();

        let options = ConvertOptions::new().with_style_map("p[style-name='heading 1'] => h2.title:fresh");
        let result = convert_to_html(&docx, &options).unwrap();
        assert_eq!(result.value, r#"<h2 class="title">Intro</h2>"#);
    }

    #[test]
    fn test_unrecognised_style_and_bad_mapping_warnings() {
        let docx = DocxFixture::new()
            .styles(HEADING_STYLES)
            .body(r#"<w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:t>q</w:t></w:r></w:p>"#)
            .build();

        let options = ConvertOptions::new().with_style_map("p =>> h1");
        let result = convert_to_html(&docx, &options).unwrap();
        assert_eq!(result.value, "<p>q</p>");
        assert_eq!(result.messages.len(), 2);
        assert!(result.messages[0]
            .message
            .starts_with("Did not understand this style mapping, so ignored it: p =>> h1"));
        assert_eq!(
            result.messages[1],
            Message::warning("Unrecognised paragraph style: 'Quote' (Style ID: Quote)")
        );
    }

    #[test]
    fn test_nested_lists() {
        let docx = DocxFixture::new()
            .numbering(BULLET_NUMBERING)
            .body(format!(
                "{}{}{}",
                list_item(0, "a"),
                list_item(1, "a.1"),
                list_item(0, "b")
            ))
            .build();

        let result = convert_to_html(&docx, &ConvertOptions::default()).unwrap();
        assert_eq!(
            result.value,
            "<ul><li>a<ol><li>a.1</li></ol></li><li>b</li></ul>"
        );
    }

    #[test]
    fn test_external_hyperlink() {
        let docx = DocxFixture::new()
            .external_rel(
                "rIdLink",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink",
                "https://example.com/?a=1&amp;b=2",
            )
            .body(r#"<w:p><w:hyperlink r:id="rIdLink"><w:r><w:t>site</w:t></w:r></w:hyperlink></w:p>"#)
            .build();

        let result = convert_to_html(&docx, &ConvertOptions::default()).unwrap();
        assert_eq!(
            result.value,
            r#"<p><a href="https://example.com/?a=1&amp;b=2">site</a></p>"#
        );
    }

    #[test]
    fn test_embedded_image_becomes_data_uri() {
        let docx = DocxFixture::new()
            .document_rel(
                "rIdImage",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image",
                "media/dot.png",
            )
            .content_type_default("png", "image/png")
            .part("word/media/dot.png", b"png".to_vec())
            .body(concat!(
                r#"<w:p><w:r><w:drawing><wp:inline><wp:docPr id="1" name="Picture" descr="A dot"/>"#,
                r#"<a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rIdImage"/></pic:blipFill></pic:pic></a:graphicData></a:graphic>"#,
                r#"</wp:inline></w:drawing></w:r></w:p>"#,
            ))
            .build();

        let result = convert_to_html(&docx, &ConvertOptions::default()).unwrap();
        assert_eq!(
            result.value,
            r#"<p><img src="data:image/png;base64,cG5n" alt="A dot" /></p>"#
        );
    }

    #[test]
    fn test_footnotes_are_appended() {
        let docx = DocxFixture::new()
            .xml_part(
                "word/footnotes.xml",
                "w:footnotes",
                concat!(
                    r#"<w:footnote w:type="separator" w:id="0"><w:p><w:r><w:separator/></w:r></w:p></w:footnote>"#,
                    r#"<w:footnote w:id="2"><w:p><w:r><w:t>Source</w:t></w:r></w:p></w:footnote>"#,
                ),
            )
            .body(r#"<w:p><w:r><w:t>Claim</w:t></w:r><w:r><w:footnoteReference w:id="2"/></w:r></w:p>"#)
            .build();

        let options = ConvertOptions::new().with_id_prefix("doc-");
        let result = convert_to_html(&docx, &options).unwrap();
        assert_eq!(
            result.value,
            concat!(
                r##"<p>Claim<sup><a href="#doc-footnote-2" id="doc-footnote-ref-2">[1]</a></sup></p>"##,
                r##"<ol><li id="doc-footnote-2"><p>Source <a href="#doc-footnote-ref-2">↑</a></p></li></ol>"##,
            )
        );
    }

    #[test]
    fn test_missing_main_document_is_an_error() {
        let mut archive = docxmill_ooxml::OoxmlArchive::new();
        archive.set_string("word/styles.xml", "<w:styles/>");
        let bytes = archive.to_bytes().unwrap();
        assert!(convert_to_html(&bytes, &ConvertOptions::default()).is_err());
    }

    #[test]
    fn test_transform_document_runs_before_conversion() {
        let docx = DocxFixture::new()
            .body(r#"<w:p><w:r><w:t>plain</w:t></w:r></w:p>"#)
            .build();
        let options = ConvertOptions::new().with_transform(|document| {
            docxmill_convert::transform_runs(document, |mut run| {
                run.is_bold = true;
                run
            })
        });
        let result = convert_to_html(&docx, &options).unwrap();
        assert_eq!(result.value, "<p><strong>plain</strong></p>");
    }
}

// =============================================================================
// PART 2: MARKDOWN CONVERSION
// =============================================================================

mod markdown_tests {
    use super::*;
    use docxmill_convert::{convert_to_markdown, ConvertOptions};

    #[test]
    fn test_headings_emphasis_and_lists() {
        let docx = DocxFixture::new()
            .styles(HEADING_STYLES)
            .numbering(BULLET_NUMBERING)
            .body(format!(
                "{}{}{}",
                r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Title</w:t></w:r></w:p>"#,
                r#"<w:p><w:r><w:rPr><w:i/></w:rPr><w:t>soft</w:t></w:r></w:p>"#,
                list_item(0, "one")
            ))
            .build();

        let result = convert_to_markdown(&docx, &ConvertOptions::default()).unwrap();
        assert_eq!(result.value, "# Title\n\n*soft*\n\n- one\n\n");
    }
}

// =============================================================================
// PART 3: RAW TEXT
// =============================================================================

mod raw_text_tests {
    use super::*;
    use docxmill_convert::extract_raw_text;

    #[test]
    fn test_raw_text_ignores_formatting() {
        let docx = DocxFixture::new()
            .body(concat!(
                r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Bold</w:t></w:r><w:r><w:tab/><w:t>tail</w:t></w:r></w:p>"#,
                r#"<w:p><w:r><w:t>Second</w:t></w:r></w:p>"#,
            ))
            .build();

        let result = extract_raw_text(&docx).unwrap();
        assert_eq!(result.value, "Bold\ttail\n\nSecond\n\n");
    }
}

// =============================================================================
// PART 4: EMBEDDED STYLE MAPS
// =============================================================================

mod embedded_style_map_tests {
    use super::*;
    use docxmill_convert::{
        convert_to_html, embed_style_map, read_embedded_style_map, ConvertOptions,
    };

    #[test]
    fn test_embedded_map_is_used_until_disabled() {
        let docx = DocxFixture::new()
            .body(r#"<w:p><w:r><w:t>x</w:t></w:r></w:p>"#)
            .build();
        let docx = embed_style_map(&docx, "p => h3:fresh").unwrap();
        assert_eq!(
            read_embedded_style_map(&docx).unwrap().as_deref(),
            Some("p => h3:fresh")
        );

        let result = convert_to_html(&docx, &ConvertOptions::default()).unwrap();
        assert_eq!(result.value, "<h3>x</h3>");

        let options = ConvertOptions::new().with_embedded_style_map(false);
        assert_eq!(convert_to_html(&docx, &options).unwrap().value, "<p>x</p>");

        let options = ConvertOptions::new().with_style_map("p => h4:fresh");
        assert_eq!(convert_to_html(&docx, &options).unwrap().value, "<h4>x</h4>");
    }

    #[test]
    fn test_plain_document_has_no_embedded_map() {
        let docx = docxmill_ooxml::test_utils::create_minimal_docx("hi");
        assert_eq!(read_embedded_style_map(&docx).unwrap(), None);
    }
}
