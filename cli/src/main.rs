use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use byte_unit::Byte;
use clap::{Args, Parser, Subcommand};
use ledger::{
    codec, constants::DISCRIMINATOR_SIZE, Color, EditSet, LedgerArchiveReader,
    LedgerArchiveWriter, MemorySource, Pubkey, SocialBundle, SubmitRequest, Submitter,
    WallConfig, WallSession,
};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Ledger descriptor JSON to use instead of the built-in one
    #[arg(long, global = true)]
    descriptor: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print record offsets, sizes and the rebuild query
    Layout,
    /// Turn a CSV of `x,y,color` rows into ledger records and archive them
    Pack {
        in_file: PathBuf,
        out_file: PathBuf,
        /// Archive whose records are already on the ledger
        #[arg(long)]
        base: Option<PathBuf>,
        #[command(flatten)]
        painter: PainterArgs,
    },
    /// Rebuild the canvas from an archive and save it as a PNG
    Render {
        archive_path: PathBuf,
        out_file: PathBuf,
    },
    /// Decode and print archived records
    Inspect {
        archive_path: PathBuf,
        /// Only print this record
        #[arg(short, long)]
        index: Option<u32>,
    },
}

#[derive(Debug, Args)]
struct PainterArgs {
    /// Base58 key of the painter
    #[arg(long)]
    payer: String,
    /// Base58 key of the advertised token
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    twitter: Option<String>,
    #[arg(long)]
    community: Option<String>,
    #[arg(long)]
    image: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    ticker: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl PainterArgs {
    fn request(self) -> Result<SubmitRequest> {
        let payer: Pubkey = self.payer.parse()?;
        let mut request = SubmitRequest::new(payer);
        if let Some(token) = self.token {
            request.token = token.parse()?;
        }
        request.socials = SocialBundle {
            website: self.website,
            twitter: self.twitter,
            community: self.community,
            image: self.image,
            name: self.name,
            ticker: self.ticker,
            description: self.description,
        };
        Ok(request)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.descriptor {
        Some(path) => WallConfig::load(path)
            .with_context(|| format!("Could not load descriptor {}", path.display()))?,
        None => WallConfig::builtin()?,
    };

    match cli.command {
        Commands::Layout => print_layout(&config),
        Commands::Pack {
            in_file,
            out_file,
            base,
            painter,
        } => pack(config, &in_file, &out_file, base.as_deref(), painter).await,
        Commands::Render {
            archive_path,
            out_file,
        } => render(config, &archive_path, &out_file).await,
        Commands::Inspect {
            archive_path,
            index,
        } => inspect(&config, &archive_path, index),
    }
}

fn print_layout(config: &WallConfig) -> Result<()> {
    println!("{:<12} {:>6} {:>6}", "field", "offset", "size");
    for field in &config.layout.schema().fields {
        println!(
            "{:<12} {:>6} {:>6}",
            field.name,
            config.layout.field_offset(&field.name)?,
            field.kind.size()
        );
    }
    println!("record size: {}", config.layout.record_size());
    println!(
        "version filter: offset {} bytes {}",
        config.version_filter.offset,
        config.version_filter.encoded()
    );
    println!(
        "rebuild slice: offset {} length {}",
        config.read_slice.offset, config.read_slice.length
    );
    Ok(())
}

/// Reads `x,y,color` rows. Later rows win for the same pixel.
fn read_edits(path: &Path, config: &WallConfig) -> Result<EditSet> {
    let file = File::open(path).with_context(|| format!("Could not open {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let (width, height) = (config.constants.px_width, config.constants.px_height);

    let mut edits = EditSet::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.context("Could not read CSV row")?;
        let column = |i: usize, name: &str| {
            record
                .get(i)
                .map(str::trim)
                .with_context(|| format!("row {}: missing {}", row + 1, name))
        };

        let x: usize = column(0, "x")?.parse().context("Could not parse x coordinate")?;
        let y: usize = column(1, "y")?.parse().context("Could not parse y coordinate")?;
        let color: Color = column(2, "color")?.parse()?;

        if x >= width || y >= height {
            bail!("row {}: ({}, {}) is outside the {}x{} canvas", row + 1, x, y, width, height);
        }
        edits.insert((x + y * width) as u32, color);
    }

    Ok(edits)
}

fn read_records(path: &Path, config: &WallConfig) -> Result<Vec<Vec<u8>>> {
    let file = File::open(path).with_context(|| format!("Could not open {}", path.display()))?;
    let reader = LedgerArchiveReader::new(BufReader::new(file))?;
    reader.check_layout(config)?;

    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

async fn pack(
    config: Arc<WallConfig>,
    in_file: &Path,
    out_file: &Path,
    base: Option<&Path>,
    painter: PainterArgs,
) -> Result<()> {
    let edits = read_edits(in_file, &config)?;
    let request = painter.request()?;
    let existing = match base {
        Some(path) => read_records(path, &config)?,
        None => Vec::new(),
    };

    let source = Arc::new(MemorySource::with_records(Arc::clone(&config), existing));
    let report = Submitter::new(Arc::clone(&source), Arc::clone(&config))
        .submit(&edits, &request, |progress| {
            info!(
                chunk = progress.chunk,
                total = progress.total,
                retries = progress.retries,
                "submitting chunk"
            )
        })
        .await?;

    let session = WallSession::open(Arc::clone(&source), Arc::clone(&config)).await?;

    let file = File::create(out_file)
        .with_context(|| format!("Could not create {}", out_file.display()))?;
    let mut writer = LedgerArchiveWriter::new(file, &config)?;
    for raw in source.records() {
        writer.add_record(&raw)?;
    }
    writer.add_snapshot(session.canvas())?;
    let meta = writer.finalize()?;

    let size = std::fs::metadata(out_file)?.len();
    println!(
        "Packed {} pixels into {} records, archive holds {} records ({})",
        edits.len(),
        report.total_chunks,
        meta.record_count,
        Byte::from_bytes(size as u128).get_appropriate_unit(false)
    );
    Ok(())
}

async fn render(config: Arc<WallConfig>, archive_path: &Path, out_file: &Path) -> Result<()> {
    let records = read_records(archive_path, &config)?;
    let source = MemorySource::with_records(Arc::clone(&config), records);
    let session = WallSession::open(source, config).await?;

    if let Some(warning) = session.warning() {
        warn!("{}", warning);
    }
    if let Some(summary) = session.summary() {
        println!(
            "Applied {} of {} records ({} skipped), {} pixels untouched",
            summary.applied, summary.fetched, summary.skipped, summary.remaining
        );
    }

    session
        .canvas()
        .to_image()
        .save_with_format(out_file, image::ImageFormat::Png)
        .with_context(|| format!("Could not save {}", out_file.display()))?;
    Ok(())
}

fn inspect(config: &WallConfig, archive_path: &Path, only: Option<u32>) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Could not open {}", archive_path.display()))?;
    let reader = LedgerArchiveReader::new(BufReader::new(file))?;
    reader.check_layout(config)?;
    println!(
        "{} records, {}x{} canvas, layout version {}",
        reader.meta.record_count, reader.meta.px_width, reader.meta.px_height, reader.meta.version
    );

    let Some(first) = config.layout.schema().fields.first() else {
        bail!("Record schema has no fields");
    };

    for (index, raw) in reader.enumerate() {
        if only.is_some_and(|only| only as usize != index) {
            continue;
        }
        let raw = raw?;
        let body = &raw[DISCRIMINATOR_SIZE..];

        println!("record {}", index);
        match codec::decode_fields(body, &config.layout, &first.name, None) {
            Ok(fields) => {
                for (name, value) in fields {
                    println!("  {:<10} {}", name, value);
                }
            }
            Err(err) => {
                println!("  undecodable: {}", err);
                continue;
            }
        }

        if let Ok(record) = codec::decode_record(body, config, &first.name) {
            if let Some(placed_at) = record.placed_at() {
                println!("  placed at  {}", placed_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            println!("  pixels     {}", record.pixels.len());

            let attribution = record.attribution();
            println!(
                "  token      {}",
                attribution.token_label().unwrap_or_else(|| "none".to_string())
            );
            let links = attribution.socials.links();
            for (label, link) in [
                ("website", links.website),
                ("twitter", links.twitter),
                ("community", links.community),
                ("image", links.image),
            ] {
                if let Some(link) = link {
                    println!("  {:<10} {}", label, link);
                }
            }
        }
    }

    Ok(())
}
