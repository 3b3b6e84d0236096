use clap::{Parser, Subcommand};
use ember_gal::drive::{self, LazyRemote};
use ember_gal::source::Source;
use ember_gal::types::{Manifest, ManifestEntry};
use ember_gal::{config, manifest, output, scan, server};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ember-gal")]
#[command(about = "Server-rendered image gallery")]
#[command(long_about = "\
Server-rendered image gallery

Lists images from a local directory, a JSON manifest or a Google Drive
folder, and serves a searchable, paginated page with a random header image.
Drive files are streamed through /api/file/{id}.

Sources ([source] kind in gallery.toml, or GALLERY_SOURCE):

  local     scan [source] dir on every request
  manifest  read [source] manifest (see 'ember-gal manifest')
  drive     list [source] folder_id through the Drive API

Settings resolve as: stock defaults → gallery.toml → .env.local / .env →
process environment.

Run 'ember-gal gen-config' to generate a documented gallery.toml.")]
#[command(version = env!("EMBER_GAL_VERSION"))]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "gallery.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Snapshot the local image directory into a manifest
    Manifest {
        /// Image directory (defaults to [source] dir)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Output file (defaults to [source] manifest)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Snapshot a Drive folder into a manifest
    DriveManifest {
        /// Folder id (defaults to [source] folder_id / DRIVE_FOLDER_ID)
        #[arg(long)]
        folder: Option<String>,
        /// Output file (defaults to [source] manifest)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Enumerate the configured source once and report
    Check,
    /// Print a stock gallery.toml with all options documented
    GenConfig,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ember_gal=info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Earlier files win: dotenvy never overwrites a variable already set.
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing();
    let config_path = cli.config;

    match cli.command {
        Command::Serve => {
            let config = config::load_config(&config_path)?;
            server::serve(config).await?;
        }
        Command::Manifest { dir, out } => {
            let config = config::load_config(&config_path)?;
            let dir = dir.unwrap_or_else(|| config.source.dir.clone());
            let out = out.unwrap_or_else(|| config.source.manifest.clone());
            let manifest =
                tokio::task::spawn_blocking(move || scan::build_local_manifest(&dir)).await?;
            manifest::write_manifest(&out, &manifest)?;
            output::print_manifest_output(&manifest, &out);
        }
        Command::DriveManifest { folder, out } => {
            let config = config::load_config(&config_path)?;
            let folder = folder
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| config.source.folder_id.clone());
            if folder.trim().is_empty() {
                return Err("Missing folder id: pass --folder or set DRIVE_FOLDER_ID".into());
            }
            let out = out.unwrap_or_else(|| config.source.manifest.clone());

            let remote = LazyRemote::new(config.remote.clone());
            let store = remote.get().await?;
            let files = drive::list_folder(store.as_ref(), &folder).await?;
            let manifest = Manifest::new(
                files
                    .iter()
                    .map(|f| ManifestEntry::Record(f.to_record()))
                    .collect(),
            );
            manifest::write_manifest(&out, &manifest)?;
            output::print_manifest_output(&manifest, &out);
        }
        Command::Check => {
            let config = config::load_config(&config_path)?;
            let remote = Arc::new(LazyRemote::new(config.remote.clone()));
            let source = Source::from_config(&config, remote)?;
            let location = source.location();
            println!("==> Checking {}", location);
            let items = source.list().await?;
            output::print_check_output(&config, &location, &items);
            println!("==> Source is readable");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
