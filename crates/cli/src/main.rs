//! CLI tool for normalizing slide decks into a template.

use anyhow::{Context, Result};
use clap::Parser;
use deck_core::config::MetricsConfig;
use deck_core::fill::SlideGeometry;
use deck_core::{Backend, NormalizeConfig, Normalized, OcrPolicy, PageSize, RgbColor};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Normalize .pptx decks: one title and body per slide, long bodies split
/// into continuation slides, everything restyled into a template.
#[derive(Parser, Debug)]
#[command(name = "deck-normalize")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input presentation(s) (.pptx)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Template presentation whose layouts and theme are used
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Output directory (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recognize text in pictures
    #[arg(long)]
    ocr: bool,

    /// When to run OCR: only_when_missing or always
    #[arg(long)]
    ocr_policy: Option<OcrPolicy>,

    /// OCR backend: cloud_vision or local_ocr
    #[arg(long)]
    ocr_backend: Option<Backend>,

    /// Resolution hint for OCR preprocessing (72-600)
    #[arg(long)]
    dpi: Option<u32>,

    /// Characters per page before a body is split
    #[arg(long)]
    char_budget: Option<usize>,

    /// Suffix appended to continuation slide titles
    #[arg(long)]
    suffix: Option<String>,

    /// Paginate by measuring text with this font file instead of counting characters
    #[arg(long)]
    font: Option<PathBuf>,

    /// Font size in pixels for --font
    #[arg(long)]
    font_size: Option<f32>,

    /// Text box width in pixels for --font (default: the 864 px body frame)
    #[arg(long)]
    box_width: Option<f32>,

    /// Text box height in pixels for --font (default: the 480 px body frame)
    #[arg(long)]
    box_height: Option<f32>,

    /// Title color as #RRGGBB
    #[arg(long)]
    title_color: Option<RgbColor>,

    /// Body color as #RRGGBB
    #[arg(long)]
    body_color: Option<RgbColor>,

    /// Print the paginated pages as JSON to stdout
    #[arg(short, long)]
    print: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let config = load_config(&args)?;

    if config.ocr.enabled {
        let backends = deck_core::ocr::install(deck_ocr::default_backends(&config.ocr));
        log::debug!(
            "OCR enabled, backend '{}' available: {}",
            config.ocr.backend,
            backends.has(config.ocr.backend)
        );
    }

    let template = match &args.template {
        Some(path) => {
            Some(std::fs::read(path).with_context(|| format!("Failed to read template {}", path.display()))?)
        }
        None => None,
    };

    let mut failures = 0usize;
    for input_path in &args.input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        match process_file(input_path, template.as_deref(), &config) {
            Ok(normalized) => {
                let output_path = get_output_path(input_path, args.output.as_ref())?;
                write_output(&output_path, &normalized.document)?;

                if args.print {
                    println!("{}", serde_json::to_string_pretty(&normalized.pages)?);
                }
                if args.verbose {
                    eprintln!("  {} output slide(s)", normalized.pages.len());
                    eprintln!("Written to: {}", output_path.display());
                }
                if !normalized.report.is_empty() {
                    eprintln!("{}: {}", input_path.display(), normalized.report.summary());
                }
            }
            Err(e) => {
                eprintln!("Error processing {}: {:#}", input_path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} file(s) failed", failures, args.input.len());
    }
    Ok(())
}

/// Configuration file (or defaults) with command-line overrides applied.
fn load_config(args: &Args) -> Result<NormalizeConfig> {
    let mut config = match &args.config {
        Some(path) => NormalizeConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => NormalizeConfig::default(),
    };

    if args.ocr {
        config.ocr.enabled = true;
    }
    if let Some(policy) = args.ocr_policy {
        config.ocr.policy = policy;
    }
    if let Some(backend) = args.ocr_backend {
        config.ocr.backend = backend;
    }
    if let Some(dpi) = args.dpi {
        config.ocr.dpi = dpi;
    }
    if let Some(budget) = args.char_budget {
        config.pagination.char_budget = budget;
    }
    if let Some(suffix) = &args.suffix {
        config.pagination.continuation_suffix = suffix.clone();
    }
    if let Some(font) = &args.font {
        match config.pagination.metrics.as_mut() {
            Some(metrics) => metrics.font_path = font.clone(),
            None => {
                let (width, height) = SlideGeometry::for_page(PageSize::default()).body_px();
                config.pagination.metrics = Some(MetricsConfig {
                    font_path: font.clone(),
                    font_size_px: 16.0,
                    box_width_px: Some(width),
                    box_height_px: Some(height),
                })
            }
        }
    }
    if let Some(metrics) = config.pagination.metrics.as_mut() {
        if let Some(size) = args.font_size {
            metrics.font_size_px = size;
        }
        if let Some(width) = args.box_width {
            metrics.box_width_px = Some(width);
        }
        if let Some(height) = args.box_height {
            metrics.box_height_px = Some(height);
        }
    } else if args.font_size.is_some() || args.box_width.is_some() || args.box_height.is_some() {
        log::warn!("--font-size, --box-width and --box-height only apply with --font");
    }
    if let Some(color) = args.title_color {
        config.style.title_color = color;
    }
    if let Some(color) = args.body_color {
        config.style.body_color = color;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Normalize a single presentation.
fn process_file(input_path: &Path, template: Option<&[u8]>, config: &NormalizeConfig) -> Result<Normalized> {
    let source =
        std::fs::read(input_path).with_context(|| format!("Failed to open {}", input_path.display()))?;

    deck_pptx::normalize(&source, template, config.clone())
        .map_err(|e| anyhow::anyhow!("{} stage: {}", e.stage(), e))
}

/// Determine the output path for a processed file.
fn get_output_path(input_path: &Path, output_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let output_filename = format!("{}_normalized.pptx", stem);

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => {
            if let Some(parent) = input_path.parent() {
                parent.join(output_filename)
            } else {
                PathBuf::from(output_filename)
            }
        }
    };

    Ok(output_path)
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::Paginator;

    #[test]
    fn test_output_path() {
        let path = get_output_path(Path::new("decks/q1.pptx"), None).unwrap();
        assert_eq!(path, PathBuf::from("decks/q1_normalized.pptx"));
    }

    #[test]
    fn test_flag_overrides() {
        let args = Args::parse_from([
            "deck-normalize",
            "in.pptx",
            "--ocr",
            "--ocr-backend",
            "local_ocr",
            "--char-budget",
            "900",
            "--title-color",
            "#112233",
        ]);
        let config = load_config(&args).unwrap();
        assert!(config.ocr.enabled);
        assert_eq!(config.ocr.backend, Backend::LocalOcr);
        assert_eq!(config.pagination.char_budget, 900);
        assert_eq!(config.style.title_color, RgbColor::new(0x11, 0x22, 0x33));
    }

    #[test]
    fn test_font_switches_to_measured_pagination() {
        let font = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
        if !Path::new(font).exists() {
            return;
        }
        let body = (0..30).map(|i| format!("item {}", i)).collect::<Vec<_>>().join("\n\n");

        let plain = load_config(&Args::parse_from(["deck-normalize", "in.pptx"])).unwrap();
        let by_budget = Paginator::from_config(&plain.pagination).unwrap().split(&body);
        assert_eq!(by_budget.len(), 1);

        let measured = load_config(&Args::parse_from(["deck-normalize", "in.pptx", "--font", font])).unwrap();
        let metrics = measured.pagination.metrics.as_ref().unwrap();
        assert_eq!((metrics.box_width_px, metrics.box_height_px), (Some(864.0), Some(480.0)));
        let by_metrics = Paginator::from_config(&measured.pagination).unwrap().split(&body);
        assert!(by_metrics.len() > 1);

        let taller = load_config(&Args::parse_from([
            "deck-normalize",
            "in.pptx",
            "--font",
            font,
            "--box-height",
            "4000",
        ]))
        .unwrap();
        assert_eq!(Paginator::from_config(&taller.pagination).unwrap().split(&body).len(), 1);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = Args::parse_from(["deck-normalize", "in.pptx", "--dpi", "10"]);
        assert!(load_config(&args).is_err());
    }
}
