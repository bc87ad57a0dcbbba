use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info};
use simplelog::{Config, WriteLogger};

use stampink::Settings;
use stampink::stamp::{Bitmap, Color, ResizeFilter};
use stampink::viewport::{RelativeRect, Size, to_absolute};

/// Tint and place stamp images the way the annotation viewer does
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where to write the log
    #[arg(long, global = true, default_value = "stampink.log")]
    log_file: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scale a stamp image, tint its dark pixels and save it as PNG
    Tint {
        /// Stamp image (PNG or JPEG)
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Tint color as #RRGGBB (defaults to `default_color` from the settings)
        #[arg(short, long, conflicts_with = "no_tint")]
        color: Option<Color>,

        /// Only scale, leave the colors alone
        #[arg(long)]
        no_tint: bool,

        /// Target width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Target height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Override the near-black threshold from the settings
        #[arg(long)]
        threshold: Option<u8>,

        /// Override the resampling filter (nearest, bilinear, catmull_rom, lanczos3)
        #[arg(long, value_parser = parse_filter)]
        filter: Option<ResizeFilter>,
    },

    /// Print the pixel rectangle of a relative stamp rectangle
    Place {
        /// Viewport size as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_size)]
        viewport: Size,

        /// Relative rectangle as x,y,width,height (fractions of the viewport)
        #[arg(long, value_parser = parse_relative_rect)]
        rect: RelativeRect,

        /// Also print the rectangle after resizing the viewport to WIDTHxHEIGHT
        #[arg(long, value_parser = parse_size)]
        resize_to: Option<Size>,
    },
}

fn parse_filter(s: &str) -> Result<ResizeFilter, String> {
    serde_yaml::from_str(s).map_err(|_| format!("unknown filter {s:?}"))
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let num = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}"));
    Ok(Size::new(num(w)?, num(h)?))
}

fn parse_relative_rect(s: &str) -> Result<RelativeRect, String> {
    let parts = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(RelativeRect::new(*x, *y, *w, *h)),
        _ => Err(format!("expected x,y,width,height, got {s:?}")),
    }
}

fn main() -> Result<()> {
    better_panic::install();

    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&cli.log_file)
            .with_context(|| format!("Failed to create log file {:?}", cli.log_file))?,
    )?;

    info!("Starting stampink {}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Tint {
            input,
            output,
            color,
            no_tint,
            width,
            height,
            threshold,
            filter,
        } => {
            let mut settings = load_settings(cli.config.as_deref());
            if let Some(threshold) = threshold {
                settings.tint_threshold = threshold;
            }
            if let Some(filter) = filter {
                settings.resize_filter = filter;
            }
            let color = if no_tint {
                None
            } else {
                Some(color.unwrap_or(settings.default_color))
            };
            run_tint(&settings, &input, &output, color, width, height)
        }
        Commands::Place {
            viewport,
            rect,
            resize_to,
        } => run_place(viewport, rect, resize_to),
    };

    if let Err(err) = &result {
        error!("Application error: {err:?}");
    }
    result
}

fn load_settings(path: Option<&Path>) -> Settings {
    match path {
        Some(path) => Settings::load_from_path(path),
        None => Settings::load(),
    }
}

fn run_tint(
    settings: &Settings,
    input: &Path,
    output: &Path,
    color: Option<Color>,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read stamp {input:?}"))?;
    let source = Arc::new(
        Bitmap::decode(&bytes).with_context(|| format!("Failed to decode stamp {input:?}"))?,
    );

    let (src_w, src_h) = source.dimensions();
    let (width, height) = target_size(src_w, src_h, width, height);

    let cache = settings.image_cache();
    let result = cache
        .get_scaled_tinted_image(&source, width, height, color)
        .with_context(|| format!("Failed to render {input:?} at {width}x{height}"))?;

    result
        .save(output)
        .with_context(|| format!("Failed to write {output:?}"))?;

    info!(
        "Wrote {output:?} ({width}x{height}, color {})",
        color.map_or_else(|| "none".to_string(), |c| c.to_string())
    );
    println!("{}", output.display());
    Ok(())
}

/// Fill in a missing target side from the source aspect ratio
fn target_size(src_w: u32, src_h: u32, width: Option<u32>, height: Option<u32>) -> (u32, u32) {
    let ratio = |num: u32, a: u32, b: u32| {
        if b == 0 {
            0
        } else {
            ((f64::from(num) * f64::from(a) / f64::from(b)).round() as u32).max(1)
        }
    };
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, ratio(w, src_h, src_w)),
        (None, Some(h)) => (ratio(h, src_w, src_h), h),
        (None, None) => (src_w, src_h),
    }
}

fn run_place(viewport: Size, rect: RelativeRect, resize_to: Option<Size>) -> Result<()> {
    if rect != rect.clamped() {
        bail!("relative rectangle components must lie in [0, 1], got {rect:?}");
    }

    let print = |size: Size| -> Result<()> {
        let abs = to_absolute(rect, size)?;
        println!(
            "{}x{}: x={} y={} width={} height={}",
            size.width, size.height, abs.x, abs.y, abs.width, abs.height
        );
        Ok(())
    };

    print(viewport)?;
    if let Some(size) = resize_to {
        print(size)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes_and_rects() {
        assert_eq!(parse_size("800x600").unwrap(), Size::new(800.0, 600.0));
        assert_eq!(parse_size("12.5X3").unwrap(), Size::new(12.5, 3.0));
        assert!(parse_size("800").is_err());

        assert_eq!(
            parse_relative_rect("0.5, 0.5,0.1,0.1").unwrap(),
            RelativeRect::new(0.5, 0.5, 0.1, 0.1)
        );
        assert!(parse_relative_rect("0.5,0.5,0.1").is_err());
        assert!(parse_relative_rect("a,b,c,d").is_err());
    }

    #[test]
    fn parses_filters() {
        assert_eq!(parse_filter("catmull_rom").unwrap(), ResizeFilter::CatmullRom);
        assert!(parse_filter("bicubic").is_err());
    }

    #[test]
    fn missing_side_follows_aspect_ratio() {
        assert_eq!(target_size(200, 50, Some(100), None), (100, 25));
        assert_eq!(target_size(200, 50, None, Some(10)), (40, 10));
        assert_eq!(target_size(200, 50, None, None), (200, 50));
        assert_eq!(target_size(200, 50, Some(3), Some(4)), (3, 4));
    }

    #[test]
    fn derived_side_never_rounds_to_zero() {
        assert_eq!(target_size(200, 50, Some(1), None), (1, 1));
        assert_eq!(target_size(50, 200, None, Some(1)), (1, 1));
    }
}
