use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use nu_plugin_gallery::algo::script::ScriptStatus;
use nu_plugin_gallery::config::{self, GalleryConfig};
use nu_plugin_gallery::ops;
use nu_plugin_gallery::pipeline::{self, RunOptions};
use nu_plugin_gallery::Result;
use serde_json::Value;
use tracing::{error, Level};

#[derive(Parser)]
#[command(
    name = "gallery",
    version,
    about = "Match product pages to image folders and rewrite their galleries"
)]
struct Cli {
    /// Config file (default: $GALLERY_CONFIG, then $XDG_DATA_HOME/gallery/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SiteArgs {
    /// Site root holding the product pages
    #[arg(short, long, default_value = ".")]
    site: PathBuf,
    /// Catalog root (default: the asset URL prefix under the site root)
    #[arg(short, long)]
    images: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite main image, thumbnail gallery and preload call on every product page
    ///
    /// A page that changes is written back from the parsed document, so the
    /// first write also normalizes markup outside the three regions: void
    /// tags lose their trailing slash (`<br/>` becomes `<br>`), character
    /// references are written as the characters they stand for (`&#8358;`
    /// becomes `₦`) and the line break after the doctype is dropped. Use
    /// --backup to keep the original. Later runs leave the page byte for byte
    /// unchanged.
    Update {
        #[command(flatten)]
        site: SiteArgs,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Report what would change without writing
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Keep a `<page>.backup` copy (created once)
        #[arg(short, long)]
        backup: bool,
        /// Print the full report as JSON instead of status lines
        #[arg(long)]
        json: bool,
    },
    /// List catalog folders and their images
    Catalog {
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Show the match decision and best candidates for one page
    #[command(name = "match")]
    Match {
        /// Page file name, e.g. mugs.html
        page: String,
        #[command(flatten)]
        site: SiteArgs,
        /// Number of ranked candidates to show
        #[arg(short = 'n', long, default_value_t = 5)]
        top: usize,
        /// Suggestion metric when nothing matches: levenshtein, jaro-winkler
        #[arg(short, long, default_value = "jaro-winkler")]
        metric: String,
    },
    /// Score one page name against one folder name
    Score {
        /// Page file name
        page: String,
        /// Folder name
        folder: String,
    },
    /// Add the thumbnail click handler to pages that call but never define it
    #[command(name = "install-script")]
    InstallScript {
        /// Site root holding the pages
        #[arg(short, long, default_value = ".")]
        site: PathBuf,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Report what would change without writing
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Keep a `<page>.backup` copy (created once)
        #[arg(short, long)]
        backup: bool,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = config::resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Update {
            site,
            recursive,
            dry_run,
            backup,
            json,
        } => {
            let options = RunOptions {
                site: site.site,
                images: site.images,
                recursive,
                dry_run,
                backup,
            };
            cmd_update(&options, &config, json)?;
        }
        Commands::Catalog { site } => {
            let root = catalog_root(&site, &config);
            print_json(&ops::op_catalog(&root, &config)?);
        }
        Commands::Match {
            page,
            site,
            top,
            metric,
        } => {
            let root = catalog_root(&site, &config);
            print_json(&ops::op_match(&page, &root, top, &metric, &config)?);
        }
        Commands::Score { page, folder } => {
            print_json(&ops::op_score(&page, &folder, &config));
        }
        Commands::InstallScript {
            site,
            recursive,
            dry_run,
            backup,
        } => {
            let options = RunOptions {
                site,
                images: None,
                recursive,
                dry_run,
                backup,
            };
            cmd_install_script(&options, &config)?;
        }
        Commands::Config => print_json(&ops::op_config(&config)?),
    }
    Ok(ExitCode::SUCCESS)
}

fn catalog_root(site: &SiteArgs, config: &GalleryConfig) -> PathBuf {
    site.images
        .clone()
        .unwrap_or_else(|| config.catalog_dir(&site.site))
}

fn cmd_update(options: &RunOptions, config: &GalleryConfig, json: bool) -> Result<()> {
    if json {
        let report = pipeline::run_update(config, options)?;
        print_json(&serde_json::to_value(&report)?);
        return Ok(());
    }

    let report = pipeline::run_update_with(config, options, |page| println!("{page}"))?;
    println!(
        "Catalog: {} ({} folders)",
        report.catalog_root.display(),
        report.folders
    );
    if options.dry_run {
        println!("(dry run, nothing written)");
    }
    println!("{}", report.summary);
    Ok(())
}

fn cmd_install_script(options: &RunOptions, config: &GalleryConfig) -> Result<()> {
    let reports = pipeline::run_install_script(config, options)?;
    let mut installed = 0;
    for r in &reports {
        let page = &r.page;
        match &r.message {
            Some(msg) => println!("{page}: ERROR - {msg}"),
            None => println!("{page}: {}", r.status.as_str()),
        }
        if r.status == ScriptStatus::Installed {
            installed += 1;
        }
    }
    println!("Installed: {installed}, Pages: {}", reports.len());
    Ok(())
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("error: {e}"),
    }
}
