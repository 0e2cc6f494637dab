//! Report generation over a whole package

use std::collections::HashMap;
use std::sync::OnceLock;

use docxmill_ooxml::paths::split_path;
use docxmill_ooxml::{read_metadata, ContentTypes, Metadata, OoxmlArchive, Relationships, WriteOptions, XmlElement};
use regex::Regex;
use tracing::{debug, info};

use crate::commands::{parse_alias, summarize, CommandKind, CommandSummary};
use crate::delimiters::Delimiters;
use crate::error::{Result, TemplateError};
use crate::options::{ReportData, ReportOptions, ReportOutput};
use crate::preprocess::preprocess_template;
use crate::processor::{highest_image_id, raw_commands, PartReport, Processor};

/// Folder holding the WordprocessingML parts
const TEMPLATE_PATH: &str = "word";

/// Content types declared when a report adds images
const IMAGE_CONTENT_TYPES: [(&str, &str); 6] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
];

/// A parsed and preprocessed template
struct Template {
    archive: OoxmlArchive,
    content_types: ContentTypes,
    /// Main part relative to `word/`, usually `document.xml`
    main_document: String,
    root: XmlElement,
}

fn parse_template(bytes: &[u8], delimiters: &Delimiters) -> Result<Template> {
    debug!("Unzipping...");
    let archive = OoxmlArchive::from_bytes(bytes)?;

    debug!("finding main template file (e.g. document.xml)");
    let content_types = ContentTypes::read(&archive)?;
    let main_document = content_types.main_document_part()?;

    debug!("Reading template...");
    let path = format!("{}/{}", TEMPLATE_PATH, main_document);
    let mut root = archive
        .get_xml(&path)?
        .ok_or_else(|| TemplateError::Parse(format!("{} could not be found", main_document)))?;

    debug!("Preprocessing template...");
    preprocess_template(&mut root, delimiters);
    Ok(Template {
        archive,
        content_types,
        main_document,
        root,
    })
}

/// Other `word/*.xml` parts (headers, footers, notes...) to fill as well
fn secondary_parts(
    archive: &OoxmlArchive,
    main_document: &str,
    delimiters: &Delimiters,
) -> Result<Vec<(String, XmlElement)>> {
    static PART_RE: OnceLock<Regex> = OnceLock::new();
    let re = PART_RE.get_or_init(|| Regex::new(r"^word/[^/]+\.xml$").unwrap());

    let main_path = format!("{}/{}", TEMPLATE_PATH, main_document);
    let template_prefix = format!("{}/template", TEMPLATE_PATH);
    let mut parts = Vec::new();
    for path in archive.file_list() {
        if !re.is_match(path) || path == main_path || path.starts_with(&template_prefix) {
            continue;
        }
        let mut root = archive
            .get_xml(path)?
            .ok_or_else(|| TemplateError::Parse(format!("{} could not be read", path)))?;
        preprocess_template(&mut root, delimiters);
        parts.push((path.to_string(), root));
    }
    Ok(parts)
}

/// The code of the template's first `QUERY` command
pub fn find_query(root: &XmlElement, delimiters: &Delimiters, fix_smart_quotes: bool) -> Option<String> {
    let aliases = HashMap::new();
    raw_commands(root, delimiters)
        .iter()
        .filter_map(|raw| summarize(raw, &aliases, fix_smart_quotes).ok())
        .find(|summary| summary.kind == CommandKind::Query)
        .map(|summary| summary.code)
}

/// Fill a template and return the resulting DOCX
pub fn create_report(options: &ReportOptions) -> Result<Vec<u8>> {
    generate(options, ReportOutput::Docx)
}

/// Fill a template, returning either the package or the main document XML
pub fn generate(options: &ReportOptions, output: ReportOutput) -> Result<Vec<u8>> {
    debug!(?options, "Report options");
    options.validate()?;

    let Template {
        mut archive,
        mut content_types,
        main_document,
        root,
    } = parse_template(&options.template, &options.delimiters)?;

    let data = match &options.data {
        ReportData::Value(value) => value.clone(),
        ReportData::Query(provider) => {
            debug!("Looking for the query in the template...");
            let query = find_query(&root, &options.delimiters, options.fix_smart_quotes);
            debug!(query = query.as_deref().unwrap_or("no query found"), "Query");
            provider(query.as_deref(), options.query_vars.as_ref())?
        }
    };

    let secondaries = secondary_parts(&archive, &main_document, &options.delimiters)?;
    let highest = secondaries
        .iter()
        .map(|(_, root)| highest_image_id(root))
        .chain(std::iter::once(highest_image_id(&root)))
        .max()
        .unwrap_or(0);

    info!("Generating report...");
    let report = Processor::new(options, &data, highest)?.process(root)?;
    let xml_options = WriteOptions::default().with_literal_xml_delimiter(options.literal_xml_delimiter.clone());

    debug!("Converting report to XML...");
    let xml = report.root.to_xml(&xml_options);
    if output == ReportOutput::Xml {
        return Ok(xml.into_bytes());
    }

    debug!("Writing report...");
    archive.set_string(format!("{}/{}", TEMPLATE_PATH, main_document), xml);
    let mut image_count = report.images.len();
    let mut html_count = report.htmls.len();
    let mut last_image_id = report.last_image_id;
    write_resources(&mut archive, &main_document, &report)?;

    for (path, root) in secondaries {
        let part = split_path(&path).basename.to_string();
        let report = Processor::new(options, &data, last_image_id)?.process(root)?;
        archive.set_string(path.as_str(), report.root.to_xml(&xml_options));
        image_count += report.images.len();
        html_count += report.htmls.len();
        last_image_id = report.last_image_id;
        write_resources(&mut archive, &part, &report)?;
    }

    if image_count > 0 || html_count > 0 {
        debug!("Completing [Content_Types].xml...");
        if image_count > 0 {
            for (extension, content_type) in IMAGE_CONTENT_TYPES {
                content_types.ensure_default(extension, content_type);
            }
        }
        if html_count > 0 {
            content_types.ensure_default("html", "text/html");
        }
        content_types.write(&mut archive);
    }

    info!(images = image_count, htmls = html_count, "report generated");
    debug!("Zipping...");
    Ok(archive.to_bytes()?)
}

/// Store images and HTML chunks of a part and register its relationships
fn write_resources(archive: &mut OoxmlArchive, part: &str, report: &PartReport) -> Result<()> {
    if report.images.is_empty() && report.links.is_empty() && report.htmls.is_empty() {
        return Ok(());
    }
    debug!("Processing resources for {}...", part);
    let rels_path = format!("{}/_rels/{}.rels", TEMPLATE_PATH, part);
    let mut relationships = Relationships::parse_optional(archive.get(&rels_path))?;

    for image in &report.images {
        let name = format!("template_{}_{}{}", part, image.rel_id, image.extension);
        debug!("Writing image {} ({})...", image.rel_id, name);
        archive.set(format!("{}/media/{}", TEMPLATE_PATH, name), image.data.clone());
        relationships.add_with_id(
            image.rel_id.as_str(),
            format!("media/{}", name),
            Relationships::TYPE_IMAGE,
            None,
        );
    }

    for (rel_id, url) in &report.links {
        relationships.add_with_id(rel_id.as_str(), url.as_str(), Relationships::TYPE_HYPERLINK, Some("External"));
    }

    for (rel_id, html) in &report.htmls {
        let name = format!("template_{}_{}.html", part.replace('.', "_"), rel_id);
        debug!("Writing html {} ({})...", rel_id, name);
        archive.set_string(format!("{}/{}", TEMPLATE_PATH, name), html.as_str());
        relationships.add_with_id(rel_id.as_str(), name, Relationships::TYPE_AF_CHUNK, None);
    }

    archive.set_string(rels_path, relationships.to_xml());
    Ok(())
}

/// Every command in a template: main document first, then the other parts
///
/// `CMD_NODE` placeholders are left out. Aliases defined with `ALIAS` are
/// expanded for the commands that follow them.
pub fn list_commands(template: &[u8], delimiters: &Delimiters) -> Result<Vec<CommandSummary>> {
    delimiters.validate()?;
    let Template {
        archive,
        main_document,
        root,
        ..
    } = parse_template(template, delimiters)?;
    let secondaries = secondary_parts(&archive, &main_document, delimiters)?;

    let mut commands = Vec::new();
    for root in std::iter::once(&root).chain(secondaries.iter().map(|(_, root)| root)) {
        let mut aliases = HashMap::new();
        for raw in raw_commands(root, delimiters) {
            let summary = summarize(&raw, &aliases, false)?;
            if summary.kind == CommandKind::Alias {
                let (name, body) = parse_alias(&summary.code)?;
                aliases.insert(name, body);
            }
            if summary.kind != CommandKind::CmdNode {
                commands.push(summary);
            }
        }
    }
    Ok(commands)
}

/// Document properties (pages, words, title, author...)
pub fn get_metadata(template: &[u8]) -> Result<Metadata> {
    let archive = OoxmlArchive::from_bytes(template)?;
    Ok(read_metadata(&archive)?)
}
