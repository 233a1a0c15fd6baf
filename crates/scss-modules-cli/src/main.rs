//! scss-modules CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::GlobalArgs;

#[derive(Parser)]
#[command(name = "scss-modules")]
#[command(version)]
#[command(about = "Compile CSS-Modules-style SCSS stylesheets into script modules", long_about = None)]
struct Cli {
    /// YAML plugin configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not inject the compiled CSS into the document
    #[arg(long, global = true)]
    no_inject: bool,

    /// Minify the scoped CSS
    #[arg(long, global = true)]
    minify: bool,

    /// Do not memoize resolutions within the build
    #[arg(long, global = true)]
    no_cache: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a `<basename>.css.js` module next to each entry under DIR
    Build {
        /// Stylesheet entries, relative to the current directory
        #[arg(required = true)]
        entries: Vec<String>,

        /// Output directory
        #[arg(long)]
        outdir: PathBuf,
    },

    /// Compile one stylesheet as a bundler would
    Bundle {
        /// Stylesheet entry, relative to the current directory
        entry: String,

        /// Write `<basename>.js` (and `<basename>.css`) to DIR instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the TypeScript declaration for stylesheet modules
    Types {
        /// Write the declaration to FILE
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "scss_modules=debug"
    } else {
        "scss_modules=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let global = GlobalArgs {
        config: cli.config,
        no_inject: cli.no_inject,
        minify: cli.minify,
        no_cache: cli.no_cache,
    };

    match cli.command {
        Commands::Build { entries, outdir } => commands::build::execute(
            &global,
            commands::build::BuildArgs { entries, outdir },
        ),
        Commands::Bundle { entry, out } => {
            commands::bundle::execute(&global, commands::bundle::BundleArgs { entry, out })
        }
        Commands::Types { out } => commands::types::execute(out),
    }
}
