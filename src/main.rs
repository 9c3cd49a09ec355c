use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::warn;
use serde::Deserialize;

use pdfstamp::{
    MetadataFields, Position, RelativeDirection, StampOptions, TimestampFormat, TimestampSpec,
    stamp_pdf,
};

const DEFAULT_WATERMARKS: [&str; 2] = ["signAL.png", "sign.png"];

#[derive(Parser, Debug)]
#[clap(author, version, about = "Stamps a watermark image onto selected pages of a PDF.")]
struct Args {
    /// PDF file to stamp.
    input_pdf: PathBuf,

    /// Output path (default: <input>_signed.pdf next to the input).
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Watermark image (PNG/JPEG/GIF/BMP).
    #[clap(short, long)]
    watermark: Option<PathBuf>,

    /// Scale factor for the watermark, must be > 0.
    #[clap(short, long)]
    scale: Option<f64>,

    /// top-left, top-right, bottom-left, bottom-right, center or custom:<rx>,<ry>.
    #[clap(short, long)]
    position: Option<Position>,

    /// Pages to stamp: all, first, last, odd, even, or a list like 1,3-5.
    #[clap(long, default_value = "all")]
    pages: String,

    /// Pages to leave out, same grammar as --pages.
    #[clap(long)]
    exclude_pages: Option<String>,

    /// Watermark opacity in (0, 1].
    #[clap(long)]
    opacity: Option<f64>,

    /// Border width in pixels around the watermark image.
    #[clap(long, default_value_t = 0)]
    border_width: u32,

    /// Border color as r,g,b (0-255 each).
    #[clap(long, default_value = "0,0,0", value_parser = parse_rgb)]
    border_color: [u8; 3],

    /// Paint a flat drop shadow beneath the watermark.
    #[clap(long)]
    shadow: bool,

    /// Shadow offset as dx,dy in pixels.
    #[clap(long, default_value = "4,4", value_parser = parse_offset)]
    shadow_offset: (i32, i32),

    /// Add a date/time stamp next to the watermark.
    #[clap(long)]
    timestamp: bool,

    /// short, long, full, iso or custom.
    #[clap(long, default_value = "short")]
    timestamp_format: TimestampFormat,

    /// chrono pattern used when --timestamp-format is custom.
    #[clap(long)]
    timestamp_custom_format: Option<String>,

    /// above, below, left or right of the watermark.
    #[clap(long, default_value = "below")]
    timestamp_position: RelativeDirection,

    /// TTF/OTF font for the timestamp text.
    #[clap(long, default_value = "fonts/stamp.ttf")]
    timestamp_font: PathBuf,

    /// Write author/title/subject metadata into the output.
    #[clap(long)]
    add_metadata: bool,

    #[clap(long)]
    author: Option<String>,

    #[clap(long)]
    title: Option<String>,

    #[clap(long)]
    subject: Option<String>,

    /// Name of a profile in the profiles file; CLI flags override it.
    #[clap(long)]
    profile: Option<String>,

    #[clap(long, default_value = "profiles.toml")]
    profiles_file: PathBuf,
}

/// A saved stamping profile. Mirrors what the profiles file stores per name.
#[derive(Debug, Deserialize, Default)]
struct Profile {
    scale: Option<f64>,
    position: Option<String>,
    opacity: Option<f64>,
    watermark: Option<PathBuf>,
    #[allow(dead_code)]
    description: Option<String>,
}

fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err("expected r,g,b".to_string());
    }
    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|_| format!("invalid color component '{part}'"))?;
    }
    Ok(rgb)
}

fn parse_offset(s: &str) -> Result<(i32, i32), String> {
    let (dx, dy) = s.split_once(',').ok_or("expected dx,dy")?;
    let dx = dx.trim().parse().map_err(|_| format!("invalid offset '{s}'"))?;
    let dy = dy.trim().parse().map_err(|_| format!("invalid offset '{s}'"))?;
    Ok((dx, dy))
}

fn load_profile(path: &Path, name: &str) -> Result<Profile, String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("could not read {}: {err}", path.display()))?;
    let mut profiles: BTreeMap<String, Profile> =
        toml::from_str(&text).map_err(|err| format!("could not parse {}: {err}", path.display()))?;
    profiles
        .remove(name)
        .ok_or_else(|| format!("no profile '{name}' in {}", path.display()))
}

/// `document.pdf` becomes `document_signed.pdf` beside the input.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = input.extension().and_then(|s| s.to_str()).unwrap_or("pdf");
    input.with_file_name(format!("{stem}_signed.{extension}"))
}

fn default_watermark() -> PathBuf {
    for candidate in DEFAULT_WATERMARKS {
        if Path::new(candidate).exists() {
            return PathBuf::from(candidate);
        }
    }
    PathBuf::from(DEFAULT_WATERMARKS[1])
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let profile = match &args.profile {
        Some(name) => match load_profile(&args.profiles_file, name) {
            Ok(profile) => profile,
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        },
        None => Profile::default(),
    };

    let profile_position = match profile.position.as_deref().map(str::parse::<Position>) {
        Some(Ok(position)) => Some(position),
        Some(Err(err)) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
        None => None,
    };

    let defaults = StampOptions::default();
    let options = StampOptions {
        scale_factor: args.scale.or(profile.scale).unwrap_or(defaults.scale_factor),
        position: args
            .position
            .or(profile_position)
            .unwrap_or(defaults.position),
        pages: args.pages.clone(),
        exclude_pages: args.exclude_pages.clone(),
        opacity: args.opacity.or(profile.opacity).unwrap_or(defaults.opacity),
        effects: pdfstamp::EffectsSpec {
            border_width: args.border_width,
            border_color: args.border_color,
            shadow_enabled: args.shadow,
            shadow_offset: args.shadow_offset,
        },
        timestamp: args.timestamp.then(|| TimestampSpec {
            format: args.timestamp_format,
            custom_format: args.timestamp_custom_format.clone(),
            relative_position: args.timestamp_position,
            font_path: args.timestamp_font.clone(),
        }),
        metadata: args.add_metadata.then(|| MetadataFields {
            author: args.author.clone(),
            title: args.title.clone(),
            subject: args.subject.clone(),
        }),
    };

    let watermark = args
        .watermark
        .clone()
        .or(profile.watermark)
        .unwrap_or_else(default_watermark);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input_pdf));

    match stamp_pdf(&args.input_pdf, &watermark, &output, &options) {
        Ok(outcome) => {
            for degradation in &outcome.degradations {
                warn!("{degradation}");
            }
            println!(
                "Stamped {} of {} pages -> {}",
                outcome.stamped_pages.len(),
                outcome.total_pages,
                output.display()
            );
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
