use clap::{Parser, Subcommand};
use edge_resize::config::{self, ResizerConfig};
use edge_resize::event::TriggerEvent;
use edge_resize::imaging::RustBackend;
use edge_resize::pipeline::Resizer;
use edge_resize::storage::FsBlobStore;
use edge_resize::{batch, output, request};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "edge-resize")]
#[command(about = "On-demand image variants for CDN cache misses")]
#[command(long_about = "\
On-demand image variants for CDN cache misses

Runs the origin-response hook locally: a cache-miss event for
/photo-800x600c.jpg fetches photo.jpg from the store, renders the 800x600
crop, caches it back as photo-800x600c.jpg, and answers with the image.

Size token (last dash segment of the file name):

  photo-800x600.jpg     fit inside 800x600
  photo-800x600c.jpg    crop to exactly 800x600
  photo-0x600.jpg       0 = configured default max for that axis

Store layout:

  store/                           # --store (or [storage] root)
  └── images/                      # [storage] bucket
      ├── photo.jpg                # canonical upload
      ├── photo-800x600c.jpg       # generated variant
      └── photo-800x600c.jpg.meta.json

Logging goes to stderr; set RUST_LOG to adjust (default edge_resize=info).

Run 'edge-resize gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Blob store root directory (overrides [storage] root)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one trigger event and print the response JSON
    Handle {
        /// Event file, or - for stdin
        #[arg(default_value = "-")]
        event: PathBuf,
    },
    /// Handle every event file under a directory in parallel
    Batch {
        /// Directory of *.json event files
        dir: PathBuf,
    },
    /// Print how a request URI decodes, as JSON
    Decode {
        /// Request URI, e.g. /photo-800x600c.jpg
        uri: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("edge_resize=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Handle { event } => {
            let config = config::load_config(&cli.config)?;
            let resizer = build_resizer(config, cli.store.as_deref());
            let json = read_event(&event)?;
            let (request, response) = TriggerEvent::from_json(&json)?.into_parts()?;
            let response = resizer.handle(&request, response);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Batch { dir } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let resizer = build_resizer(config, cli.store.as_deref());
            let events = batch::collect_events(&dir)?;

            let (tx, rx) = std::sync::mpsc::channel();
            let root = dir.clone();
            let printer = std::thread::spawn(move || {
                for report in rx {
                    println!("{}", output::format_event_report(&report, &root));
                }
            });
            let summary = batch::run_batch(&resizer, &events, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            println!();
            println!("{}", output::format_batch_summary(&summary));
        }
        Command::Decode { uri } => {
            let config = config::load_config(&cli.config)?;
            let spec = request::decode_request(&uri, &config.resize)?;
            println!("{}", serde_json::to_string_pretty(&spec)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn build_resizer(config: ResizerConfig, store_root: Option<&Path>) -> Resizer<RustBackend, FsBlobStore> {
    let root = store_root
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.storage.root));
    let store = FsBlobStore::new(root, &config.storage.bucket);
    Resizer::new(RustBackend::new(), store, config)
}

fn read_event(path: &Path) -> std::io::Result<String> {
    if path == Path::new("-") {
        let mut json = String::new();
        std::io::stdin().read_to_string(&mut json)?;
        Ok(json)
    } else {
        std::fs::read_to_string(path)
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
