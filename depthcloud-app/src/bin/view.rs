//! Depthcloud viewer
//!
//! Loads a saved point cloud from `data/processed/pointcloud/` and shows it.

use clap::Parser;
use depthcloud_app::viewer::{load, summary, view};
use depthcloud_app::{DEFAULT_FILENAME, LoggingConfig, ProjectLayout, ROOT_ENV};
use std::path::PathBuf;

/// Depthcloud viewer - show a saved point cloud in the terminal
#[derive(Parser, Debug)]
#[command(name = "depthcloud-view")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Point cloud file name inside data/processed/pointcloud
    #[arg(short, long, default_value = DEFAULT_FILENAME)]
    filename: String,

    /// Print a summary instead of opening the interactive view
    #[arg(long)]
    no_window: bool,

    /// Project root holding the data/ directory
    #[arg(long, env = ROOT_ENV, default_value = ".")]
    root: PathBuf,
}

fn main() {
    LoggingConfig::default().init();
    let args = Args::parse();
    let layout = ProjectLayout::new(args.root);

    let cloud = match load(&layout, &args.filename) {
        Ok(cloud) => cloud,
        Err(e) => {
            eprintln!("Viewer error: {}", e);
            std::process::exit(1);
        }
    };

    if args.no_window {
        println!("{}", summary(&cloud));
        return;
    }

    if let Err(e) = view(&cloud) {
        eprintln!("Viewer error: {}", e);
        std::process::exit(1);
    }
}
