use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use ocrlines::core::geometry::{HullStrategy, RectStrategy};
use ocrlines::core::model::LineRecord;
use ocrlines::ocr::annotation::{AnnotateImageResponse, FeatureLevel};
use ocrlines::ocr::bridge::{VisionConfig, DEFAULT_ENDPOINT};
use ocrlines::ocr::layout_builder::{LineReconstructor, ReconstructOptions};
use ocrlines::pipeline::{self, AnnotationSource, PipelineConfig};
use ocrlines::raster::loader::DEFAULT_JPEG_QUALITY;

#[derive(Parser, Debug)]
#[command(name = "ocrlines")]
#[command(version, about = "Line-level image/transcript extraction from OCR annotations", long_about = None)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract line crops and transcripts from one image
    Process {
        /// Input image path
        input: PathBuf,

        /// Output directory (default: ./<input_name>_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Saved OCR response to use instead of calling Cloud Vision
        #[arg(short, long)]
        annotation: Option<PathBuf>,

        #[command(flatten)]
        vision: VisionArgs,

        #[command(flatten)]
        lines: LineArgs,

        #[command(flatten)]
        overlay: OverlayArgs,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Process multiple images
    Batch {
        /// Input images
        inputs: Vec<PathBuf>,

        /// Output directory for all results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory of earlier results; `<dir>/<stem>/<stem>_gcv_response.json`
        /// is used instead of calling Cloud Vision
        #[arg(long)]
        annotation_dir: Option<PathBuf>,

        /// Worker threads (0 = one per core)
        #[arg(short, long, default_value_t = 0)]
        jobs: usize,

        #[command(flatten)]
        vision: VisionArgs,

        #[command(flatten)]
        lines: LineArgs,

        #[command(flatten)]
        overlay: OverlayArgs,
    },

    /// Print the reconstructed lines of a saved OCR response as JSON
    Lines {
        /// Saved OCR response
        annotation: PathBuf,

        /// Line geometry
        #[arg(short, long, value_enum, default_value_t = Mode::Hull)]
        mode: Mode,

        #[command(flatten)]
        lines: LineArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct VisionArgs {
    /// Cloud Vision API key
    #[arg(long, env = "GCV_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Cloud Vision annotate endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// OCR language hints (e.g. en, de)
    #[arg(long)]
    language: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct LineArgs {
    /// Concave hull alpha (default: tightest single polygon)
    #[arg(long)]
    alpha: Option<f64>,

    /// Emit text left open at the end of a paragraph as a line
    #[arg(long)]
    flush_trailing: bool,
}

#[derive(Args, Debug, Clone)]
struct OverlayArgs {
    /// Also outline OCR features of these levels on the overlay
    #[arg(long, value_enum)]
    features: Vec<Level>,

    /// Also outline each line's bounding rectangle on the overlay
    #[arg(long)]
    rects: bool,

    /// JPEG quality for crops and overlay
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Mode {
    Hull,
    Rect,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Level {
    Block,
    Paragraph,
    Word,
    Symbol,
}

impl From<Level> for FeatureLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Block => FeatureLevel::Block,
            Level::Paragraph => FeatureLevel::Paragraph,
            Level::Word => FeatureLevel::Word,
            Level::Symbol => FeatureLevel::Symbol,
        }
    }
}

impl VisionArgs {
    fn source(&self, annotation: Option<PathBuf>) -> Result<AnnotationSource> {
        if let Some(path) = annotation {
            return Ok(AnnotationSource::File(path));
        }
        let api_key = self
            .api_key
            .clone()
            .context("no --annotation given and no API key (--api-key or GCV_API_KEY)")?;
        Ok(AnnotationSource::Vision(
            VisionConfig::new(api_key)
                .with_endpoint(self.endpoint.clone())
                .with_language_hints(self.language.clone()),
        ))
    }
}

impl LineArgs {
    fn options(&self) -> ReconstructOptions {
        ReconstructOptions {
            flush_trailing: self.flush_trailing,
        }
    }
}

fn build_config(
    input: PathBuf,
    output: PathBuf,
    source: AnnotationSource,
    lines: &LineArgs,
    overlay: &OverlayArgs,
) -> PipelineConfig {
    PipelineConfig::new(input, output, source)
        .with_alpha(lines.alpha)
        .with_flush_trailing(lines.flush_trailing)
        .with_overlay(
            overlay.features.iter().copied().map(FeatureLevel::from).collect(),
            overlay.rects,
        )
        .with_jpeg_quality(overlay.quality)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process {
            input,
            output,
            annotation,
            vision,
            lines,
            overlay,
            quiet,
        } => process_single(input, output, annotation, &vision, &lines, &overlay, quiet),
        Commands::Batch {
            inputs,
            output,
            annotation_dir,
            jobs,
            vision,
            lines,
            overlay,
        } => process_batch(inputs, output, annotation_dir, jobs, &vision, &lines, &overlay),
        Commands::Lines {
            annotation,
            mode,
            lines,
        } => print_lines(&annotation, mode, &lines),
    }
}

fn check_input(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }
    Ok(())
}

fn process_single(
    input: PathBuf,
    output: Option<PathBuf>,
    annotation: Option<PathBuf>,
    vision: &VisionArgs,
    lines: &LineArgs,
    overlay: &OverlayArgs,
    quiet: bool,
) -> Result<()> {
    check_input(&input)?;

    let output_dir = match output {
        Some(dir) => dir,
        None => PathBuf::from(format!("{}_output", pipeline::stem_of(&input)?)),
    };

    if !quiet {
        println!("[*] Processing: {}", input.display());
        println!("[*] Output: {}", output_dir.display());
        match &annotation {
            Some(path) => println!("[*] Annotation: {}", path.display()),
            None => println!("[*] Annotation: Cloud Vision"),
        }
    }

    let source = vision.source(annotation)?;
    let config = build_config(input.clone(), output_dir.clone(), source, lines, overlay);

    if !quiet {
        println!("\n[+] Reconstructing lines...");
    }

    let document = pipeline::process_image(&config)
        .with_context(|| format!("Failed to process image: {}", input.display()))?;

    if !quiet {
        println!(
            "[+] {} line(s), {} dropped fragment(s)",
            document.lines.len(),
            document.dropped.len()
        );
        println!("[+] Exporting results...");
    }

    pipeline::export_dataset(&document, &config)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    if !quiet {
        println!("\n[✓] Done! Results saved to: {}", output_dir.display());
    }

    Ok(())
}

fn process_batch(
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    annotation_dir: Option<PathBuf>,
    jobs: usize,
    vision: &VisionArgs,
    lines: &LineArgs,
    overlay: &OverlayArgs,
) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    let base_output = output.unwrap_or_else(|| PathBuf::from("batch_output"));

    println!("[*] Batch processing {} file(s)", inputs.len());
    println!("[*] Base output: {}\n", base_output.display());

    let mut failed = 0;
    let mut configs = Vec::with_capacity(inputs.len());

    for input in inputs {
        if let Err(e) = check_input(&input) {
            eprintln!("  [!] Skipped {}: {}", input.display(), e);
            failed += 1;
            continue;
        }
        let annotation = match &annotation_dir {
            Some(dir) => {
                let stem = pipeline::stem_of(&input)?;
                Some(dir.join(&stem).join(format!("{stem}_gcv_response.json")))
            }
            None => None,
        };
        let source = vision.source(annotation)?;
        configs.push(build_config(input, base_output.clone(), source, lines, overlay));
    }

    let mut success = 0;
    let total = configs.len();
    for (i, item) in pipeline::run_batch(&configs, jobs)?.into_iter().enumerate() {
        println!("[{}/{}] {}", i + 1, total, item.input.display());
        match item.result {
            Ok(count) => {
                println!("  [✓] Success: {} line(s)", count);
                success += 1;
            }
            Err(e) => {
                eprintln!("  [✗] Failed: {:#}", e);
                failed += 1;
            }
        }
    }

    println!("\n[*] Summary: {} succeeded, {} failed", success, failed);

    if failed > 0 {
        anyhow::bail!("{} file(s) failed to process", failed);
    }

    Ok(())
}

fn print_lines(annotation: &Path, mode: Mode, lines: &LineArgs) -> Result<()> {
    let response = AnnotateImageResponse::from_value(pipeline::load_response(annotation)?)
        .context("OCR response does not match the annotation schema")?;
    let tree = response.annotation()?;

    let reconstruction = match mode {
        Mode::Hull => LineReconstructor::new(HullStrategy::new(lines.alpha))
            .with_options(lines.options())
            .reconstruct(tree)?,
        Mode::Rect => LineReconstructor::new(RectStrategy)
            .with_options(lines.options())
            .reconstruct(tree)?,
    };

    let records: Vec<LineRecord> = reconstruction.lines.iter().map(LineRecord::from).collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
