//! resume – command-line front end for the resume editor core.
//!
//! Usage:
//!   resume export [resume.json] [-o DIR] [--config export.json] [--slicing crop]
//!   resume preview [resume.json] [-o preview.html]
//!   resume color "<css color>" [--fallback "#0ea5a4"]
//!   resume plan --width 1560 --height 4000
//!
//! Without a resume file the built-in sample resume is used.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use log::info;

use resume_forge::color::{resolve_color, CssColorProbe, DocumentProbe, HexColor};
use resume_forge::editor::ResumeEditor;
use resume_forge::error::Result;
use resume_forge::model::{FontChoice, Template};
use resume_forge::page_layout::Slicing;
use resume_forge::pagination::{plan_pages, Orientation};
use resume_forge::pipeline::{ExportConfig, Exporter};

#[derive(Parser)]
#[command(name = "resume")]
#[command(version)]
#[command(about = "Edit a resume, preview it as HTML and export it to a paginated A4 PDF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a resume to PDF
    Export {
        /// Resume JSON file (sample resume if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        design: DesignArgs,

        #[command(flatten)]
        export: ExportArgs,

        /// Extra TTF/OTF font file (repeatable)
        #[arg(long = "font-file", value_name = "FILE")]
        font_files: Vec<PathBuf>,
    },

    /// Write the preview HTML
    Preview {
        /// Resume JSON file (sample resume if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        design: DesignArgs,
    },

    /// Normalize a CSS color to #rrggbb
    Color {
        /// Any CSS color value
        value: String,

        /// Color returned when the value cannot be resolved
        #[arg(long, default_value = "#0ea5a4")]
        fallback: String,
    },

    /// Print the page plan for a capture size as JSON
    Plan {
        /// Capture width in device pixels
        #[arg(long)]
        width: u32,

        /// Capture height in device pixels
        #[arg(long)]
        height: u32,

        #[command(flatten)]
        export: ExportArgs,
    },
}

/// Design overrides applied on top of the resume file.
#[derive(Args)]
struct DesignArgs {
    #[arg(long, value_enum)]
    template: Option<Template>,

    #[arg(long, value_enum)]
    font: Option<FontChoice>,

    /// Primary color (hex, rgb(), named color, ...)
    #[arg(long)]
    color: Option<String>,
}

/// Export settings; flags override the config file.
#[derive(Args)]
struct ExportArgs {
    /// JSON export configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    slicing: Option<Slicing>,

    #[arg(long, value_enum)]
    orientation: Option<Orientation>,

    /// Device pixels per CSS pixel
    #[arg(long)]
    scale: Option<f32>,
}

impl ExportArgs {
    fn load(&self) -> Result<ExportConfig> {
        let mut config = match &self.config {
            Some(path) => ExportConfig::from_file(path)?,
            None => ExportConfig::default(),
        };
        if let Some(slicing) = self.slicing {
            config.slicing = slicing;
        }
        if let Some(orientation) = self.orientation {
            config.orientation = orientation;
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        Ok(config)
    }
}

fn load_editor(input: Option<&PathBuf>, design: &DesignArgs) -> Result<ResumeEditor> {
    let mut editor = match input {
        Some(path) => ResumeEditor::from_json(&fs::read_to_string(path)?)?,
        None => ResumeEditor::new(),
    };
    if let Some(template) = design.template {
        editor.set_template(template);
    }
    if let Some(font) = design.font {
        editor.set_font(font);
    }
    if let Some(color) = &design.color {
        let mut document = editor.preview_document();
        editor.set_primary_color(color, Some(&mut DocumentProbe::new(&mut document)));
    }
    Ok(editor)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Export {
            input,
            output,
            design,
            export,
            font_files,
        } => {
            let editor = load_editor(input.as_ref(), &design)?;
            let mut config = export.load()?;
            config.font_files.extend(font_files);

            let exporter = Exporter::new(config)?;
            match editor.export(&exporter)? {
                Some(pdf) => {
                    fs::create_dir_all(&output)?;
                    let path = pdf.save_to(&output)?;
                    eprintln!(
                        "Wrote '{}' ({} bytes, {} page{})",
                        path.display(),
                        pdf.bytes.len(),
                        pdf.page_count,
                        if pdf.page_count == 1 { "" } else { "s" }
                    );
                }
                None => eprintln!("Nothing to export: preview root not found"),
            }
        }
        Commands::Preview { input, output, design } => {
            let editor = load_editor(input.as_ref(), &design)?;
            let html = editor.preview_html();
            match output {
                Some(path) => {
                    fs::write(&path, html)?;
                    info!("Preview written to {}", path.display());
                }
                None => println!("{html}"),
            }
        }
        Commands::Color { value, fallback } => {
            let fallback = HexColor::parse(&fallback).unwrap_or_default();
            println!("{}", resolve_color(&value, &fallback, Some(&mut CssColorProbe)));
        }
        Commands::Plan { width, height, export } => {
            let config = export.load()?;
            let plan = plan_pages(width, height, config.geometry(), config.slicing, "Resume")?;
            println!("{}", plan.to_json()?);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
