use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use guru_bundle::env::{core::LogLevel, EnvVar};
use guru_bundle::utils::url::clean_identifier;
use guru_bundle::{
    import_directory, Bundle, BundleOptions, BundleResult, CompileHooks, GuruClient,
    HttpDownloader,
};

/// Compile a directory of HTML pages into a Guru collection import bundle
#[derive(Parser, Debug)]
#[command(name = "guru-bundle", version, about)]
struct Cli {
    /// Directory containing the HTML files to import
    input: PathBuf,

    /// Base output directory (the bundle is written to <OUTPUT>/<NAME>/)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Bundle id, defaults to the input directory name
    #[arg(short, long)]
    name: Option<String>,

    /// Collection title written to the manifest
    #[arg(short, long)]
    title: Option<String>,

    /// Maximum folder nesting depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Drop empty folders and cards without content
    #[arg(long)]
    skip_empty: bool,

    /// Also write a browsable index.html
    #[arg(long)]
    preview: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Download remote images and attachments into the bundle
    #[arg(long)]
    download: bool,

    /// Upload the archive to this collection (id or name) when done
    #[arg(long, value_name = "COLLECTION")]
    upload: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    let level = LogLevel::get().unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(format!("guru_bundle={}", level))
                .unwrap_or_else(|_| "guru_bundle=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> BundleResult<()> {
    let mut options = match &cli.config {
        Some(path) => BundleOptions::from_toml_file(path)?,
        None => BundleOptions::default(),
    };
    options.apply_env_overrides()?;

    if let Some(output) = cli.output {
        options = options.with_output_dir(output);
    }
    if let Some(max_depth) = cli.max_depth {
        options = options.with_max_depth(max_depth);
    }
    if cli.skip_empty {
        options = options.with_skip_empty_containers(true);
    }
    if cli.preview {
        options.write_preview = true;
    }
    if let Some(title) = cli.title {
        options.collection_title = Some(title);
    }
    options.validate()?;

    let name = cli
        .name
        .clone()
        .or_else(|| {
            cli.input
                .canonicalize()
                .ok()
                .and_then(|path| path.file_name().map(|n| n.to_string_lossy().to_string()))
        })
        .map(|name| clean_identifier(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "bundle".to_string());

    let mut bundle = Bundle::new(&name, options)?;
    let roots = import_directory(&mut bundle, &cli.input)?;
    info!("Imported {} top-level node(s)", roots.len());

    let report = if cli.download {
        let mut downloader = HttpDownloader::new()?;
        bundle.zip_with(CompileHooks::new().with_downloader(&mut downloader))?
    } else {
        bundle.zip()?
    };

    println!("Bundle:     {}", report.run_dir.display());
    println!("Archive:    {}", report.archive_path.display());
    if let Some(log_path) = &report.log_path {
        println!("Log:        {}", log_path.display());
    }
    println!(
        "Folders: {}  Cards: {}  Resources: {}  Events: {}  ({:.2?})",
        report.containers, report.documents, report.resources, report.events, report.elapsed
    );

    if let Some(collection) = cli.upload {
        let client = GuruClient::from_env()?;
        client.upload_bundle(&collection, &report.archive_path)?;
        println!("Uploaded to collection {}", collection);
    }

    Ok(())
}
