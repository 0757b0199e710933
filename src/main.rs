use clap::{Args, Parser, Subcommand};
use cropmark::config::{self, AppConfig};
use cropmark::imaging::{Compositor, OutputMode, Position};
use cropmark::output;
use cropmark::service::{self, CropService, ImageRequest};
use cropmark::store::{ConfigUpdate, DEFAULT_LIST_LIMIT, NewConfig, SqliteStore};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "cropmark")]
#[command(about = "Crop PNG images and stamp them with a stored logo")]
#[command(long_about = "\
Crop PNG images and stamp them with a stored logo

Crop coordinates are [x, y, width, height] in source pixels, given as a JSON
array. A preview is the crop scaled to 5% of its size; generate writes the
full-resolution crop.

Logo configurations are stored per user and hold the logo PNG, a corner
(top-left, top-right, bottom-left, bottom-right, center) and an optional
scale factor up to 0.25. A logo never covers more than 30% of either side.

Run 'cropmark gen-config' to generate a documented cropmark.toml.")]
#[command(version)]
struct Cli {
    /// Settings file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    settings: PathBuf,

    /// Configuration database (overrides [database] path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Identity that owns logo configurations
    #[arg(long, default_value = "local", global = true)]
    user: String,

    /// Log debug detail to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for the image commands.
#[derive(Args, Clone)]
struct ImageArgs {
    /// Source PNG
    #[arg(long)]
    image: PathBuf,

    /// Crop rectangle as JSON, e.g. '[10, 20, 640, 480]'
    #[arg(long)]
    crop: String,

    /// Logo configuration to apply
    #[arg(long)]
    config_id: Option<i64>,

    /// Output file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Fields shared by create and update.
#[derive(Args, Clone)]
struct ConfigFields {
    /// Logo scale factor in (0, 0.25]
    #[arg(long)]
    scale_down: Option<f64>,

    /// Logo corner
    #[arg(long)]
    position: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Logo PNG file
    #[arg(long)]
    logo: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a 5% preview of the crop
    Preview(ImageArgs),
    /// Write the full-resolution crop
    Generate(ImageArgs),
    /// Manage logo configurations
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print a stock cropmark.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Create a configuration
    Create(ConfigFields),
    /// Change fields of a configuration
    Update {
        id: i64,
        #[command(flatten)]
        fields: ConfigFields,
    },
    /// Show one configuration
    Get { id: i64 },
    /// List configurations, newest first
    List {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Delete a configuration
    Delete { id: i64 },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let settings = config::load_config(&cli.settings)?;
    let db_path = cli.db.clone().unwrap_or_else(|| settings.database.path.clone());
    let store = SqliteStore::open(&db_path)?;

    let result = run(&cli, &settings, &store);
    store.close()?;
    result
}

fn run(
    cli: &Cli,
    settings: &AppConfig,
    store: &SqliteStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Preview(args) => {
            render(cli, settings, store, args, OutputMode::Preview)?;
        }
        Command::Generate(args) => {
            render(cli, settings, store, args, OutputMode::Final)?;
        }
        Command::Config(ConfigCommand::Create(fields)) => {
            let new = NewConfig {
                scale_down: fields.scale_down,
                position: parse_position(fields.position.as_deref())?,
                description: fields.description.clone(),
                logo: read_logo(fields.logo.as_deref(), settings)?,
            };
            let record = store.create(&cli.user, new)?;
            output::print_config(&record.summary());
        }
        Command::Config(ConfigCommand::Update { id, fields }) => {
            let update = ConfigUpdate {
                scale_down: fields.scale_down,
                position: parse_position(fields.position.as_deref())?,
                description: fields.description.clone(),
                logo: read_logo(fields.logo.as_deref(), settings)?,
            };
            match store.update(*id, &cli.user, update)? {
                Some(record) => output::print_config(&record.summary()),
                None => return Err(not_found(*id)),
            }
        }
        Command::Config(ConfigCommand::Get { id }) => match store.get(*id, &cli.user)? {
            Some(record) => output::print_config(&record.summary()),
            None => return Err(not_found(*id)),
        },
        Command::Config(ConfigCommand::List { limit, offset }) => {
            let summaries: Vec<_> = store
                .list(&cli.user, *limit, *offset)?
                .iter()
                .map(|r| r.summary())
                .collect();
            output::print_config_list(&cli.user, &summaries);
        }
        Command::Config(ConfigCommand::Delete { id }) => {
            if !store.soft_delete(*id, &cli.user)? {
                return Err(not_found(*id));
            }
            println!("Deleted configuration #{id:0>3}");
        }
        Command::GenConfig => {}
    }
    Ok(())
}

fn render(
    cli: &Cli,
    settings: &AppConfig,
    store: &SqliteStore,
    args: &ImageArgs,
    mode: OutputMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = ImageRequest {
        image: Some(std::fs::read(&args.image)?),
        crop_coords: Some(serde_json::Value::String(args.crop.clone())),
        config_id: args.config_id,
    };

    let compositor = Compositor::with_limits(settings.decode_limits());
    let crop_service = CropService::new(
        compositor,
        store,
        settings.output.download_filename.clone(),
    )
    .with_max_upload(settings.max_upload_bytes());
    let response = match mode {
        OutputMode::Preview => crop_service.preview(&cli.user, request),
        OutputMode::Final => crop_service.generate(&cli.user, request),
    }
    .inspect_err(|e| tracing::error!(status = e.status().code(), "{e}"))?;

    let dest = args.output.clone().unwrap_or_else(|| match mode {
        OutputMode::Preview => PathBuf::from("preview.png"),
        OutputMode::Final => PathBuf::from(&settings.output.download_filename),
    });
    std::fs::write(&dest, &response.body)?;
    output::print_render_output(mode, &response, &dest);
    Ok(())
}

fn parse_position(keyword: Option<&str>) -> Result<Option<Position>, service::ServiceError> {
    keyword.map(service::parse_position).transpose()
}

fn read_logo(
    path: Option<&Path>,
    settings: &AppConfig,
) -> Result<Option<cropmark::store::LogoAsset>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let data = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    Ok(Some(service::logo_upload(
        data,
        file_name,
        settings.max_upload_bytes(),
    )?))
}

fn not_found(id: i64) -> Box<dyn std::error::Error> {
    Box::new(service::ServiceError::ConfigNotFound(id))
}

/// Route tracing output to stderr so stdout stays clean for results.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
