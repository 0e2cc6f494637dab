//! End-to-end report generation tests
//!
//! Templates are assembled in memory with the ooxml fixtures and filled
//! through the public API.
//!
//! Test Categories:
//! 1. Filling the main document
//! 2. Images, links and HTML resources
//! 3. Secondary parts (headers, footers)
//! 4. Query providers and XML output
//! 5. Command listing and metadata

use docxmill_ooxml::test_utils::{extract_document_xml, extract_file, DocxFixture};
use serde_json::json;

fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
}

fn template(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs.iter().map(|p| paragraph(p)).collect();
    DocxFixture::new().body(body).build()
}

// =============================================================================
// PART 1: MAIN DOCUMENT
// =============================================================================

mod main_document_tests {
    use super::*;
    use docxmill_template::{create_report, ReportOptions, TemplateError};

    #[test]
    fn test_insert_into_document() {
        let options = ReportOptions::new(template(&["Hello +++=name+++!"]))
            .with_data(json!({"name": "Ada"}));
        let report = create_report(&options).unwrap();
        let xml = extract_document_xml(&report);
        assert!(xml.contains("Hello Ada!"));
        assert!(!xml.contains("+++"));
    }

    #[test]
    fn test_loop_with_custom_delimiters() {
        let options = ReportOptions::new(template(&[
            "{FOR p IN people}",
            "Name: {=p.name}",
            "{END-FOR p}",
        ]))
        .with_delimiters(docxmill_template::Delimiters::new("{", "}").unwrap())
        .with_data(json!({"people": [{"name": "Ada"}, {"name": "Grace"}]}));
        let xml = extract_document_xml(&create_report(&options).unwrap());
        let ada = xml.find("Name: Ada").unwrap();
        let grace = xml.find("Name: Grace").unwrap();
        assert!(ada < grace);
        assert!(!xml.contains("FOR"));
    }

    #[test]
    fn test_hidden_cell_content_leaves_an_empty_paragraph() {
        let cell = format!(
            "<w:tc>{}{}{}</w:tc>",
            paragraph("+++IF show+++"),
            paragraph("secret"),
            paragraph("+++END-IF+++")
        );
        let body = format!(
            "<w:tbl><w:tr>{}<w:tc>{}</w:tc></w:tr></w:tbl>",
            cell,
            paragraph("other")
        );
        let options = ReportOptions::new(DocxFixture::new().body(body).build())
            .with_data(json!({"show": false}));
        let xml = extract_document_xml(&create_report(&options).unwrap());
        assert!(!xml.contains("<w:tc/>"), "{}", xml);
        assert!(xml.contains("<w:tc><w:p/></w:tc>"), "{}", xml);
        assert!(!xml.contains("secret"));
        assert!(xml.contains("other"));
    }

    #[test]
    fn test_additional_context_is_visible() {
        let options = ReportOptions::new(template(&["+++=greeting+++ +++=name+++"]))
            .with_data(json!({"name": "Ada"}))
            .with_context("greeting", "Hi")
            .unwrap();
        let xml = extract_document_xml(&create_report(&options).unwrap());
        assert!(xml.contains("Hi Ada"));
    }

    #[test]
    fn test_failing_command_is_reported() {
        let options = ReportOptions::new(template(&["+++=missing.field+++"]));
        let err = create_report(&options).unwrap_err();
        assert!(matches!(err, TemplateError::CommandExecution { .. }));
        assert!(err.to_string().starts_with("Error executing command 'INS missing.field'"));
    }

    #[test]
    fn test_missing_main_document() {
        let mut archive = docxmill_ooxml::OoxmlArchive::new();
        archive.set_string(
            "[Content_Types].xml",
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
                r#"</Types>"#,
            ),
        );
        let options = ReportOptions::new(archive.to_bytes().unwrap());
        let err = create_report(&options).unwrap_err();
        assert_eq!(err.to_string(), "document.xml could not be found");
    }

    #[test]
    fn test_empty_delimiter_is_rejected() {
        let options = ReportOptions::new(template(&["x"]))
            .with_delimiters(docxmill_template::Delimiters::symmetric(""));
        let err = create_report(&options).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidOptions(_)));
    }
}

// =============================================================================
// PART 2: RESOURCES
// =============================================================================

mod resource_tests {
    use super::*;
    use docxmill_template::{create_report, ReportOptions};

    #[test]
    fn test_image_is_stored_and_registered() {
        let options = ReportOptions::new(template(&[
            r#"+++IMAGE #{width: 2, height: 1, data: "aGk=", extension: ".png"}+++"#,
        ]));
        let report = create_report(&options).unwrap();

        assert_eq!(
            extract_file(&report, "word/media/template_document.xml_img1.png").as_deref(),
            Some("hi")
        );
        let rels = extract_file(&report, "word/_rels/document.xml.rels").unwrap();
        assert!(rels.contains(r#"Id="img1""#));
        assert!(rels.contains(r#"Target="media/template_document.xml_img1.png""#));

        let types = extract_file(&report, "[Content_Types].xml").unwrap();
        assert!(types.contains(r#"Extension="png""#));
        assert!(types.contains(r#"ContentType="image/svg+xml""#));
        assert!(!types.contains(r#"Extension="html""#));

        let xml = extract_document_xml(&report);
        assert!(xml.contains(r#"<a:blip r:embed="img1"/>"#));
        assert!(xml.contains(r#"cx="720000""#));
    }

    #[test]
    fn test_existing_drawings_push_image_ids_up() {
        let body = format!(
            "{}{}",
            r#"<w:p><w:r><w:drawing><wp:inline><wp:docPr id="5" name="old"/></wp:inline></w:drawing></w:r></w:p>"#,
            paragraph(r#"+++IMAGE #{width: 1, height: 1, data: "aGk=", extension: ".gif"}+++"#)
        );
        let options = ReportOptions::new(DocxFixture::new().body(body).build());
        let report = create_report(&options).unwrap();
        assert!(extract_file(&report, "word/media/template_document.xml_img6.gif").is_some());
    }

    #[test]
    fn test_link_and_html_chunk() {
        let options = ReportOptions::new(template(&[
            r#"+++LINK #{url: "https://example.com", label: "Example"}+++"#,
            r#"+++HTML "&lt;p&gt;chunk&lt;/p&gt;"+++"#,
        ]));
        let report = create_report(&options).unwrap();

        let rels = extract_file(&report, "word/_rels/document.xml.rels").unwrap();
        assert!(rels.contains(r#"Target="https://example.com""#));
        assert!(rels.contains(r#"TargetMode="External""#));
        assert!(rels.contains(r#"Target="template_document_xml_html1.html""#));

        assert_eq!(
            extract_file(&report, "word/template_document_xml_html1.html").as_deref(),
            Some(r#"<meta charset="UTF-8"><body><p>chunk</p></body>"#)
        );
        let types = extract_file(&report, "[Content_Types].xml").unwrap();
        assert!(types.contains(r#"Extension="html""#));

        let xml = extract_document_xml(&report);
        assert!(xml.contains(r#"<w:altChunk r:id="html1"/>"#));
        assert!(xml.contains("Example"));
    }
}

// =============================================================================
// PART 3: SECONDARY PARTS
// =============================================================================

mod secondary_part_tests {
    use super::*;
    use docxmill_template::{create_report, ReportOptions};

    #[test]
    fn test_header_is_filled() {
        let docx = DocxFixture::new()
            .body(paragraph("Body +++=title+++"))
            .xml_part("word/header1.xml", "w:hdr", &paragraph("Header +++=title+++"))
            .build();
        let options = ReportOptions::new(docx).with_data(json!({"title": "Q3"}));
        let report = create_report(&options).unwrap();

        assert!(extract_document_xml(&report).contains("Body Q3"));
        let header = extract_file(&report, "word/header1.xml").unwrap();
        assert!(header.contains("Header Q3"));
        assert!(!header.contains("+++"));
    }

    #[test]
    fn test_header_images_use_their_own_relationships() {
        let image = r#"+++IMAGE #{width: 1, height: 1, data: "aGk=", extension: ".png"}+++"#;
        let docx = DocxFixture::new()
            .body(paragraph(image))
            .xml_part("word/header1.xml", "w:hdr", &paragraph(image))
            .build();
        let report = create_report(&ReportOptions::new(docx)).unwrap();

        assert!(extract_file(&report, "word/media/template_document.xml_img1.png").is_some());
        assert!(extract_file(&report, "word/media/template_header1.xml_img2.png").is_some());
        let rels = extract_file(&report, "word/_rels/header1.xml.rels").unwrap();
        assert!(rels.contains(r#"Id="img2""#));
    }
}

// =============================================================================
// PART 4: QUERIES AND XML OUTPUT
// =============================================================================

mod query_tests {
    use super::*;
    use docxmill_template::{create_report, generate, ReportOptions, ReportOutput, TemplateError};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_query_is_passed_to_provider() {
        let seen = Arc::new(Mutex::new(None));
        let recorder = Arc::clone(&seen);
        let options = ReportOptions::new(template(&["+++QUERY all_users+++", "+++=count+++ users"]))
            .with_query_vars(json!({"limit": 5}))
            .with_query(move |query, vars| {
                *recorder.lock().unwrap() = Some((query.map(str::to_string), vars.cloned()));
                Ok(json!({"count": 3}))
            });

        let xml = extract_document_xml(&create_report(&options).unwrap());
        assert!(xml.contains("3 users"));
        assert_eq!(
            seen.lock().unwrap().clone(),
            Some((Some("all_users".to_string()), Some(json!({"limit": 5}))))
        );
    }

    #[test]
    fn test_provider_error_aborts() {
        let options = ReportOptions::new(template(&["+++=x+++"]))
            .with_query(|_, _| Err(TemplateError::Query("offline".to_string())));
        let err = create_report(&options).unwrap_err();
        assert_eq!(err.to_string(), "Data query failed: offline");
    }

    #[test]
    fn test_xml_output() {
        let options = ReportOptions::new(template(&["+++=1 + 2+++"]));
        let xml = String::from_utf8(generate(&options, ReportOutput::Xml).unwrap()).unwrap();
        assert!(xml.contains("<w:document"));
        assert!(xml.contains(">3</w:t>"));
    }
}

// =============================================================================
// PART 5: COMMAND LISTING AND METADATA
// =============================================================================

mod inspection_tests {
    use super::*;
    use docxmill_template::{get_metadata, list_commands, CommandKind, Delimiters};

    #[test]
    fn test_list_commands_expands_aliases() {
        let docx = template(&[
            "+++QUERY q+++",
            "+++ALIAS t INS title+++",
            "+++*t+++",
            "+++FOR x IN xs+++",
            "+++=x+++",
            "+++END-FOR x+++",
        ]);
        let commands = list_commands(&docx, &Delimiters::default()).unwrap();
        let kinds: Vec<CommandKind> = commands.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Query,
                CommandKind::Alias,
                CommandKind::Ins,
                CommandKind::For,
                CommandKind::Ins,
                CommandKind::EndFor,
            ]
        );
        assert_eq!(commands[2].raw, "INS title");
        assert_eq!(commands[2].code, "title");
        assert_eq!(commands[4].raw, "INS x");
        assert_eq!(commands[3].code, "x IN xs");
    }

    #[test]
    fn test_list_commands_split_across_runs() {
        let docx = DocxFixture::new()
            .body(r#"<w:p><w:r><w:t>+++IN</w:t></w:r><w:r><w:t>S name++</w:t></w:r><w:r><w:t>+</w:t></w:r></w:p>"#)
            .build();
        let commands = list_commands(&docx, &Delimiters::default()).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].raw, "INS name");
    }

    #[test]
    fn test_metadata() {
        let docx = DocxFixture::new()
            .part(
                "docProps/app.xml",
                r#"<Properties><Pages>2</Pages><Words>40</Words><Company>ACME</Company></Properties>"#,
            )
            .part(
                "docProps/core.xml",
                concat!(
                    r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">"#,
                    r#"<dc:title>Report</dc:title><dc:creator>Ada</dc:creator></cp:coreProperties>"#,
                ),
            )
            .build();
        let metadata = get_metadata(&docx).unwrap();
        assert_eq!(metadata.pages, Some(2.0));
        assert_eq!(metadata.words, Some(40.0));
        assert_eq!(metadata.company.as_deref(), Some("ACME"));
        assert_eq!(metadata.title.as_deref(), Some("Report"));
        assert_eq!(metadata.creator.as_deref(), Some("Ada"));
        assert_eq!(metadata.subject, None);
    }

    #[test]
    fn test_metadata_requires_property_parts() {
        assert!(get_metadata(&template(&["x"])).is_err());
    }
}
