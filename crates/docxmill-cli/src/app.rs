//! CLI application logic
//!
//! Argument parsing and the command implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use docxmill_convert::{img_element, ConversionResult, ConvertError, ConvertOptions, ImageConverter};
use docxmill_ooxml::{read_metadata, OoxmlArchive};
use docxmill_template::{create_report, list_commands, Delimiters, ReportOptions, DEFAULT_DELIMITER};

/// Output format for `convert`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// HTML fragment
    #[default]
    Html,
    /// Markdown
    Markdown,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
        }
    }
}

impl From<OutputFormat> for docxmill_convert::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Html => docxmill_convert::OutputFormat::Html,
            OutputFormat::Markdown => docxmill_convert::OutputFormat::Markdown,
        }
    }
}

#[derive(Parser)]
#[command(name = "docxmill")]
#[command(author, version, about = "Convert DOCX documents and fill DOCX report templates", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a DOCX file to HTML or Markdown
    Convert {
        /// Input DOCX file
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "html")]
        format: OutputFormat,

        /// File with additional style mappings, one per line
        #[arg(short, long)]
        style_map: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<PathBuf>,

        /// Directory receiving the converted file and its images
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Use only the custom and embedded style mappings
        #[arg(long)]
        no_default_style_map: bool,
    },

    /// Print the text of a DOCX file without formatting
    RawText {
        /// Input DOCX file
        input: PathBuf,
    },

    /// Store a style map inside a DOCX file
    EmbedStyleMap {
        /// Input DOCX file
        input: PathBuf,

        /// Style map file
        style_map: PathBuf,

        /// Output DOCX file (overwrites the input when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fill a DOCX template with JSON data
    Report {
        /// Template DOCX file
        template: PathBuf,

        /// JSON data file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output DOCX file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Command delimiter
        #[arg(long, default_value = DEFAULT_DELIMITER)]
        delimiter: String,

        /// Closing delimiter when it differs from the opening one
        #[arg(long)]
        close_delimiter: Option<String>,

        /// Collect every failing command instead of stopping at the first
        #[arg(long)]
        no_fail_fast: bool,
    },

    /// List the commands found in a DOCX template
    Commands {
        /// Template DOCX file
        template: PathBuf,

        /// Command delimiter
        #[arg(long, default_value = DEFAULT_DELIMITER)]
        delimiter: String,

        /// Closing delimiter when it differs from the opening one
        #[arg(long)]
        close_delimiter: Option<String>,
    },

    /// Print the document properties of a DOCX file as JSON
    Metadata {
        /// Input DOCX file
        input: PathBuf,
    },
}

/// Parse arguments and run the selected command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert {
            input,
            format,
            style_map,
            output,
            output_dir,
            no_default_style_map,
        } => convert_command(
            &input,
            format,
            style_map.as_deref(),
            output.as_deref(),
            output_dir.as_deref(),
            !no_default_style_map,
        )?,
        Commands::RawText { input } => raw_text_command(&input)?,
        Commands::EmbedStyleMap {
            input,
            style_map,
            output,
        } => embed_style_map_command(&input, &style_map, output.as_deref())?,
        Commands::Report {
            template,
            data,
            output,
            delimiter,
            close_delimiter,
            no_fail_fast,
        } => {
            let delimiters = delimiters(delimiter, close_delimiter)?;
            report_command(
                &template,
                data.as_deref(),
                output.as_deref(),
                delimiters,
                !no_fail_fast,
            )?;
        }
        Commands::Commands {
            template,
            delimiter,
            close_delimiter,
        } => commands_command(&template, delimiters(delimiter, close_delimiter)?)?,
        Commands::Metadata { input } => metadata_command(&input)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when running inside tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn delimiters(open: String, close: Option<String>) -> Result<Delimiters> {
    let delimiters = match close {
        Some(close) => Delimiters::new(open, close)?,
        None => Delimiters::symmetric(open),
    };
    delimiters.validate()?;
    Ok(delimiters)
}

fn read_input(input: &Path) -> Result<Vec<u8>> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    fs::read(input).with_context(|| format!("Failed to read {}", input.display()))
}

fn print_warnings<T>(result: &ConversionResult<T>) {
    for message in &result.messages {
        eprintln!("Warning: {}", message);
    }
}

/// Convert a DOCX file
///
/// Without `output` or `output_dir` the result is printed to stdout and
/// images are embedded as data URIs. With `output_dir`, images are written
/// next to the converted file as `1.png`, `2.jpeg`, ...
pub fn convert_command(
    input: &Path,
    format: OutputFormat,
    style_map: Option<&Path>,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    default_style_map: bool,
) -> Result<()> {
    let docx = read_input(input)?;

    let mut options = ConvertOptions::default()
        .with_output_format(format.into())
        .with_default_style_map(default_style_map);
    if let Some(path) = style_map {
        let map = fs::read_to_string(path)
            .with_context(|| format!("Failed to read style map {}", path.display()))?;
        options = options.with_style_map(&map);
    }

    let target = match output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            options = options.with_image_converter(image_files(dir.to_path_buf()));
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            Some(dir.join(format!("{}.{}", stem, format.extension())))
        }
        None => output.map(Path::to_path_buf),
    };

    info!(input = %input.display(), format = ?format, "converting");
    let result = docxmill_convert::convert(&docx, &options)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    print_warnings(&result);

    match target {
        Some(path) => {
            fs::write(&path, &result.value)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", result.value),
    }
    Ok(())
}

/// Image converter writing each image into `dir` under a sequential name
fn image_files(dir: PathBuf) -> ImageConverter {
    let counter = Arc::new(AtomicUsize::new(0));
    img_element(move |image| {
        let index = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let extension = image
            .content_type
            .as_deref()
            .and_then(|content_type| content_type.strip_prefix("image/"))
            .and_then(|subtype| subtype.split('+').next())
            .unwrap_or("bin");
        let name = format!("{}.{}", index, extension);
        fs::write(dir.join(&name), &image.data)
            .map_err(|e| ConvertError::Image(format!("{}: {}", name, e)))?;
        debug!(image = %name, "wrote image");
        Ok(vec![("src".to_string(), name)])
    })
}

/// Print the raw text of a DOCX file
pub fn raw_text_command(input: &Path) -> Result<()> {
    let docx = read_input(input)?;
    let result = docxmill_convert::extract_raw_text(&docx)
        .with_context(|| format!("Failed to extract text from {}", input.display()))?;
    print_warnings(&result);
    print!("{}", result.value);
    Ok(())
}

/// Embed a style map; writes back to `input` unless `output` is given
pub fn embed_style_map_command(input: &Path, style_map: &Path, output: Option<&Path>) -> Result<()> {
    let docx = read_input(input)?;
    let map = fs::read_to_string(style_map)
        .with_context(|| format!("Failed to read style map {}", style_map.display()))?;

    let updated = docxmill_convert::embed_style_map(&docx, &map)
        .with_context(|| format!("Failed to embed style map into {}", input.display()))?;

    let target = output.unwrap_or(input);
    fs::write(target, updated).with_context(|| format!("Failed to write {}", target.display()))?;
    println!("Embedded style map into {}", target.display());
    Ok(())
}

/// Default report path: `<template stem>-report.docx` next to the template
pub fn default_report_path(template: &Path) -> PathBuf {
    let stem = template.file_stem().unwrap_or_default().to_string_lossy();
    template.with_file_name(format!("{}-report.docx", stem))
}

/// Fill a template with the JSON in `data` (an empty object when omitted)
pub fn report_command(
    template: &Path,
    data: Option<&Path>,
    output: Option<&Path>,
    delimiters: Delimiters,
    fail_fast: bool,
) -> Result<()> {
    let template_bytes = read_input(template)?;
    let data = match data {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read data file {}", path.display()))?;
            serde_json::from_str::<Value>(&text)
                .with_context(|| format!("Failed to parse data file {}", path.display()))?
        }
        None => Value::Object(Default::default()),
    };

    let options = ReportOptions::new(template_bytes)
        .with_data(data)
        .with_delimiters(delimiters)
        .with_fail_fast(fail_fast);
    let report = create_report(&options)
        .with_context(|| format!("Failed to generate report from {}", template.display()))?;

    let target = output.map(Path::to_path_buf).unwrap_or_else(|| default_report_path(template));
    fs::write(&target, report).with_context(|| format!("Failed to write {}", target.display()))?;
    println!("Wrote {}", target.display());
    Ok(())
}

/// Print one line per command: its kind, a tab, and the expanded command
pub fn commands_command(template: &Path, delimiters: Delimiters) -> Result<()> {
    let bytes = read_input(template)?;
    let commands = list_commands(&bytes, &delimiters)
        .with_context(|| format!("Failed to read commands from {}", template.display()))?;
    for command in &commands {
        println!("{}\t{}", command.kind.as_str(), command.raw);
    }
    Ok(())
}

/// Document properties of a DOCX file as pretty-printed JSON
pub fn metadata_json(input: &Path) -> Result<String> {
    let archive = OoxmlArchive::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let metadata = read_metadata(&archive)
        .with_context(|| format!("Failed to read metadata from {}", input.display()))?;
    Ok(serde_json::to_string_pretty(&metadata)?)
}

/// Print the document properties of a DOCX file
pub fn metadata_command(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    println!("{}", metadata_json(input)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_convert() {
        let cli = Cli::try_parse_from([
            "docxmill",
            "convert",
            "in.docx",
            "--format",
            "markdown",
            "--no-default-style-map",
        ])
        .unwrap();
        match cli.command {
            Commands::Convert {
                input,
                format,
                no_default_style_map,
                output,
                ..
            } => {
                assert_eq!(input, PathBuf::from("in.docx"));
                assert_eq!(format, OutputFormat::Markdown);
                assert!(no_default_style_map);
                assert!(output.is_none());
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_output_and_output_dir_conflict() {
        let parsed = Cli::try_parse_from([
            "docxmill",
            "convert",
            "in.docx",
            "--output",
            "out.html",
            "--output-dir",
            "out",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_report_defaults() {
        let cli = Cli::try_parse_from(["docxmill", "report", "t.docx", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Report {
                delimiter,
                no_fail_fast,
                close_delimiter,
                ..
            } => {
                assert_eq!(delimiter, "+++");
                assert!(close_delimiter.is_none());
                assert!(!no_fail_fast);
            }
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn test_delimiters() {
        let pair = delimiters("{".to_string(), Some("}".to_string())).unwrap();
        assert_eq!(pair.wrap("INS x"), "{INS x}");
        assert!(delimiters(String::new(), None).is_err());
    }

    #[test]
    fn test_default_report_path() {
        assert_eq!(
            default_report_path(Path::new("dir/invoice.docx")),
            PathBuf::from("dir/invoice-report.docx")
        );
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(
            docxmill_convert::OutputFormat::from(OutputFormat::Markdown),
            docxmill_convert::OutputFormat::Markdown
        );
        assert_eq!(OutputFormat::Markdown.extension(), "md");
    }
}
