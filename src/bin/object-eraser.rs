use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use object_eraser::{default_output_path, EraserConfig, EraserEngine, ProcessResult};

#[derive(Parser)]
#[command(
    name = "object-eraser",
    about = "Erase detected objects from camera frames via inpainting",
    version,
    after_help = "Simple usage: object-eraser frame.png  (uses frame.json detections, writes frame_erased.png)\n\n\
                  Detections are read from a JSON sidecar: an array of\n\
                  {\"label\": ..., \"confidence\": ..., \"bbox\": {\"left\",\"top\",\"right\",\"bottom\"}}."
)]
struct Cli {
    /// Input frame file or directory of frames
    input: String,

    /// Output file or directory (default: {name}_erased.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Detections JSON file (default: {name}.json next to the input)
    #[arg(short, long)]
    detections: Option<String>,

    /// Label substring an object must match to be erased
    #[arg(short, long, default_value = "bottle")]
    label: String,

    /// Confidence threshold for the fallback and annotation paths (0.0-1.0)
    #[arg(short, long, default_value = "0.5")]
    confidence: f32,

    /// Padding around each detection box, in pixels
    #[arg(short, long, default_value = "10")]
    margin: u32,

    /// Inpainting search radius, in pixels
    #[arg(short, long, default_value = "10")]
    radius: f32,

    /// Draw boxes and captions instead of erasing
    #[arg(short, long)]
    annotate: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if !(0.0..=1.0).contains(&cli.confidence) {
        eprintln!("Error: Confidence must be between 0.0 and 1.0");
        process::exit(1);
    }
    if cli.radius < 1.0 {
        eprintln!("Error: Radius must be at least 1 pixel");
        process::exit(1);
    }

    let config = EraserConfig {
        target_label: cli.label.clone(),
        confidence_threshold: cli.confidence,
        mask_margin: cli.margin,
        inpaint_radius: cli.radius,
    };
    let mut engine = EraserEngine::new(config);
    if cli.annotate {
        engine.toggle_removal();
    }

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    let results = if input_path.is_dir() {
        if cli.detections.is_some() {
            eprintln!("Error: --detections applies to single files; directories use sidecars");
            process::exit(1);
        }
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: object-eraser <input_dir> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        let detections_path = cli.detections.as_ref().map(PathBuf::from);
        vec![engine.process_file(input_path, &output_path, detections_path.as_deref())]
    };

    let mut success_count = 0u32;
    let mut skip_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, cli.quiet);
        if r.skipped {
            skip_count += 1;
        } else if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if skip_count > 0 {
            eprint!(", Skipped: {skip_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, quiet: bool) {
    if quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if !quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !quiet {
            eprintln!("[OK] {filename}: {}", result.message);
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }
}
