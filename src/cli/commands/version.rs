//! Version information display.

use crate::cli::args::{OutputFormat, VersionArgs};
use crate::icon::GRID_SIZE;

/// Print version information.
pub fn run(args: &VersionArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => {
            println!("{name} {version} ({GRID_SIZE}-slot grid)");
        }
        OutputFormat::Json => {
            println!(r#"{{"name":"{name}","version":"{version}","grid_size":{GRID_SIZE}}}"#);
        }
    }
}
