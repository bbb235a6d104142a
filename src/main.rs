use clap::{Parser, Subcommand};
use dropconvert::batch::{self, BatchEvent};
use dropconvert::formats::TargetFormat;
use dropconvert::imaging::Background;
use dropconvert::queue::{self, ConversionQueue};
use dropconvert::{config, logging, output, relocate};
use std::path::{Path, PathBuf};

/// Flags of the `convert` command. Each one overrides the config file.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Files or folders to convert (folders are searched recursively)
    paths: Vec<PathBuf>,

    /// Raw drop payload, e.g. "{/path/with space.png} /other.jpg"
    #[arg(long)]
    payload: Option<String>,

    /// Output format: JPG, JPEG, PNG, WEBP, TIFF or BMP
    #[arg(short, long)]
    format: Option<TargetFormat>,

    /// JPEG and WebP quality (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Do not copy EXIF metadata into the output
    #[arg(long)]
    no_exif: bool,

    /// Text appended to each output file name (no path separators)
    #[arg(long)]
    suffix: Option<String>,

    /// Directory converted files are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Fill color under transparent pixels for JPEG output (#rrggbb)
    #[arg(long)]
    background: Option<Background>,

    /// Move the converted files into this folder afterwards
    #[arg(long)]
    move_to: Option<PathBuf>,

    /// Print the batch report as JSON instead of status lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
#[command(name = "dropconvert")]
#[command(about = "Convert dropped images between JPG, PNG, WebP, TIFF and BMP")]
#[command(long_about = "\
Convert dropped images between JPG, PNG, WebP, TIFF and BMP

Drop files or whole folders on the command line (or hand over a raw
drag-and-drop payload with --payload). Every supported image is converted
in turn; a file that fails is reported and the rest carry on.

  dropconvert convert holiday/ logo.png -f jpg
  holiday/IMG_0042.webp  ->  converted_output/IMG_0042_converted.jpg
  logo.png               ->  converted_output/logo_converted.jpg

Transparent pixels become the background color (white by default) when
the output is JPEG. EXIF metadata is kept unless the output is BMP or
--no-exif is given. Source files are never modified.

Run 'dropconvert gen-config' to generate a documented dropconvert.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./dropconvert.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert files and folders
    Convert(ConvertArgs),
    /// List output formats and accepted input extensions
    Formats,
    /// Print a stock dropconvert.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Convert(args) => run_convert(args, cli.config.as_deref())?,
        Command::Formats => output::print_formats(),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_convert(args: ConvertArgs, config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = config::load_config(config_path, Path::new("."))?;
    let target = args.format.unwrap_or(settings.format);
    if let Some(quality) = args.quality {
        settings.quality = quality;
    }
    if args.no_exif {
        settings.keep_exif = false;
    }
    if let Some(suffix) = args.suffix {
        settings.suffix = suffix;
    }
    settings.validate()?;
    let mut options = settings.to_options()?;
    if let Some(dir) = args.output_dir {
        options.output_dir = dir;
    }
    if let Some(background) = args.background {
        options.background = background;
    }

    let mut dropped = args.paths;
    if let Some(payload) = &args.payload {
        dropped.extend(queue::parse_drop_payload(payload));
    }
    let mut queue = ConversionQueue::new();
    let added = queue.add_dropped(&dropped);
    if !args.json {
        output::print_queue_summary(added, queue.len());
    }

    let report = if args.json {
        batch::convert_batch(queue.as_slice(), target, &options, None)
    } else {
        let (tx, rx) = std::sync::mpsc::channel::<BatchEvent>();
        let printer = std::thread::spawn(move || {
            for event in rx {
                output::print_batch_event(&event, target);
            }
        });
        let report = batch::convert_batch(queue.as_slice(), target, &options, Some(tx));
        printer
            .join()
            .map_err(|_| "progress printer thread panicked")?;
        output::print_batch_summary(&report, &options.output_dir);
        report
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some(dest) = args.move_to {
        let moved = relocate::move_converted(&report.outputs(), &dest)?;
        if !args.json {
            output::print_move_summary(&moved, &dest);
        }
    }

    Ok(())
}
