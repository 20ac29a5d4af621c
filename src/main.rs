use clap::{Args, Parser, Subcommand};
use respimg::{Breakpoint, FsMedia, SizeSpec, config, output, warm};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "respimg")]
#[command(about = "Responsive image markup and resized variants for a media library")]
#[command(long_about = "\
Responsive image markup and resized variants for a media library

Images come from two places:

  uploads/                         # Media library (attachments, by numeric id)
  ├── attachments.json             # Attachment index: files, alt text, sizes
  ├── 2024/photo.jpg               # Attachment #1
  └── 2024/photo-resized-400x200.jpg   # Generated variant of #1
  theme/images/                    # Theme images (by relative path)
  └── logo.svg

A SOURCE that is a positive integer is an attachment id; anything else is a
path under the theme's image directory.

Run 'respimg gen-config' to generate a documented respimg.toml.")]
#[command(version)]
struct Cli {
    /// Config file; relative directories in it resolve against its location
    #[arg(long, default_value = "respimg.toml", global = true)]
    config: PathBuf,

    /// Log decisions at debug level (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the markup for an image
    Render(RenderArgs),
    /// Add a file under the uploads directory to the library
    Register {
        file: PathBuf,
        /// Alternative text stored with the attachment
        #[arg(long, default_value = "")]
        alt: String,
    },
    /// Register every untracked image under the uploads directory
    Scan,
    /// Pre-generate width variants for every attachment
    Warm {
        /// Target width in pixels (repeatable)
        #[arg(long = "width", required = true)]
        widths: Vec<u32>,
    },
    /// Print a stock respimg.toml with all options documented
    GenConfig,
}

#[derive(Args)]
struct RenderArgs {
    /// Attachment id or theme-relative path
    source: String,

    /// Scale to this width in pixels
    #[arg(long, group = "size_spec")]
    size: Option<u32>,

    /// Scale to this height in pixels
    #[arg(long, group = "size_spec")]
    height: Option<u32>,

    /// Use a size the library knows by name
    #[arg(long, group = "size_spec")]
    named: Option<String>,

    /// Fill and centre-crop to WIDTHxHEIGHT
    #[arg(long, group = "size_spec", value_parser = parse_crop)]
    crop: Option<(u32, u32)>,

    #[arg(long)]
    alt: Option<String>,

    /// Class names (repeatable, whitespace-separated)
    #[arg(long)]
    class: Vec<String>,

    /// Extra attribute NAME=VALUE (repeatable)
    #[arg(long, value_parser = parse_attr)]
    attr: Vec<(String, String)>,

    /// Force lazy loading
    #[arg(long, conflicts_with = "eager")]
    lazy: bool,

    /// Force eager loading
    #[arg(long)]
    eager: bool,

    /// Embed SVG files as markup
    #[arg(long)]
    inline: bool,

    /// Responsive breakpoint MAX_WIDTH=WIDTH (repeatable)
    #[arg(long)]
    breakpoint: Vec<Breakpoint>,
}

impl RenderArgs {
    fn size_spec(&self) -> Option<SizeSpec> {
        if let Some(width) = self.size {
            return Some(SizeSpec::Width(width));
        }
        if let Some(height) = self.height {
            return Some(SizeSpec::Height(height));
        }
        if let Some(name) = &self.named {
            return Some(SizeSpec::Named(name.clone()));
        }
        self.crop
            .map(|(width, height)| SizeSpec::Crop { width, height })
    }
}

fn parse_crop(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let w = w.parse().map_err(|_| format!("invalid width '{w}'"))?;
    let h = h.parse().map_err(|_| format!("invalid height '{h}'"))?;
    Ok((w, h))
}

fn parse_attr(value: &str) -> Result<(String, String), String> {
    let (name, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{value}'"))?;
    Ok((name.to_string(), val.to_string()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose picks the level for this crate
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "respimg=debug".to_string()
        } else {
            "respimg=warn".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Render(args) => {
            let media = open_media(&cli.config)?;
            let mut image = media.image(args.source.clone())?;
            if let Some(alt) = &args.alt {
                image.alt(alt.as_str());
            }
            for class in &args.class {
                image.class(class);
            }
            for (name, value) in &args.attr {
                image.attr(name, value.as_str());
            }
            if args.lazy {
                image.lazy(true);
            } else if args.eager {
                image.lazy(false);
            }
            image
                .inline(args.inline)
                .srcset(args.breakpoint.iter().copied());
            if let Some(size) = args.size_spec() {
                image.size(size)?;
            }
            println!("{}", image.render()?);
        }
        Command::Register { file, alt } => {
            let media = open_media(&cli.config)?;
            let file = std::path::absolute(&file)?;
            let id = media.library().register(&file, &alt, media.backend())?;
            let records: Vec<_> = media
                .library()
                .record(id)
                .map(|record| (id, record))
                .into_iter()
                .collect();
            output::print_registered(&records);
        }
        Command::Scan => {
            let media = open_media(&cli.config)?;
            let added = media.library().scan(media.backend())?;
            let records: Vec<_> = added
                .into_iter()
                .filter_map(|id| media.library().record(id).map(|record| (id, record)))
                .collect();
            output::print_registered(&records);
        }
        Command::Warm { widths } => {
            let media = open_media(&cli.config)?;
            let ids = media.library().attachment_ids();
            let reports = warm::warm(&media, &ids, &widths)?;
            output::print_warm_output(&reports);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file and open the library it points at.
///
/// The config path is made absolute first so library paths and paths given on
/// the command line compare equal.
fn open_media(config_path: &Path) -> Result<FsMedia, Box<dyn std::error::Error>> {
    let config = config::load_config(&std::path::absolute(config_path)?)?;
    Ok(FsMedia::open(config)?)
}
