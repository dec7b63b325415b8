use clap::{Parser, Subcommand};
use quire::serve::DevServer;
use quire::site::Site;
use quire::{config, output, watch};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

/// Input and output directories shared by build and serve.
#[derive(clap::Args, Clone)]
struct DirArgs {
    /// Content directory (holds quire.toml)
    #[arg(long, default_value = "content")]
    input: PathBuf,

    /// Output directory
    #[arg(long, default_value = "public")]
    output: PathBuf,
}

fn version_string() -> &'static str {
    let hash = env!("QUIRE_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{} ({hash})", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Static blog generator for AsciiDoc posts")]
#[command(long_about = "\
Static blog generator for AsciiDoc posts

Every .adoc file under the content directory becomes a post page at the same
relative path (blog/2026/post-one.adoc → /blog/2026/post-one/). Everything
else is copied verbatim.

Content structure:

  content/
  ├── quire.toml                   # Site config (required)
  └── blog/
      └── 2026/
          ├── post-one.adoc        # Post
          ├── images/cover.png     # Copied; covers get index thumbnails
          └── site.js              # Copied

Post header:

  ---
  = First Post
  Jane Doe
  2026-01-12
  :tags: Java, AI
  :teaser: Optional manual teaser
  :cover-image: images/cover.png
  :status: draft
  ---

Run 'quire gen-config' to generate a documented quire.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Log progress details (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the whole site once
    Build {
        #[command(flatten)]
        dirs: DirArgs,

        /// Delete the output directory first
        #[arg(long)]
        clean: bool,
    },
    /// Build, then serve the output and rebuild on changes until Ctrl-C
    Serve {
        #[command(flatten)]
        dirs: DirArgs,

        /// Port to listen on (defaults to dev.port from quire.toml)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a stock quire.toml with all options documented
    GenConfig,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build { dirs, clean } => {
            let mut site = Site::open(&dirs.input, &dirs.output)?;
            let summary = site.build_all(clean)?;
            output::print_build_summary(&summary);
        }
        Command::Serve { dirs, port } => {
            let mut site = Site::open(&dirs.input, &dirs.output)?;
            let summary = site.build_all(false)?;
            output::print_build_summary(&summary);

            let stop = Arc::new(AtomicBool::new(false));
            let handler_stop = Arc::clone(&stop);
            ctrlc::set_handler(move || {
                handler_stop.store(true, Ordering::SeqCst);
            })?;

            let server = DevServer::start(site.output().to_path_buf(), site.resolve_serve_port(port))?;
            output::print_serve_url(server.port());

            let watched = watch::watch(&mut site, &stop);
            server.stop();
            watched?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
