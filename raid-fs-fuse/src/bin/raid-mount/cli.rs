use std::path::PathBuf;

use clap::Parser;

/// Mount a RAID filesystem through FUSE
#[derive(Parser)]
pub struct Cli {
    /// Disk image, in any order
    #[arg(long = "disk", short, required = true)]
    pub disks: Vec<PathBuf>,

    /// Mount option passed through to FUSE
    #[arg(short = 'o')]
    pub options: Vec<String>,

    pub mountpoint: PathBuf,
}
