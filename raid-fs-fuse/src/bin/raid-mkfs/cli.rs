use std::path::PathBuf;

use clap::Parser;
use raid_fs::layout::RaidMode;

/// Create a RAID filesystem on a set of disk images
#[derive(Parser)]
pub struct Cli {
    /// RAID mode: 0 (striped), 1 (mirrored) or 1v (verified mirror)
    #[arg(long, short)]
    pub raid: RaidMode,

    /// Disk image, at least two
    #[arg(long = "disk", short, required = true)]
    pub disks: Vec<PathBuf>,

    /// Number of inodes, rounded up to a multiple of 32
    #[arg(long, short)]
    pub inodes: u64,

    /// Number of data blocks, rounded up to a multiple of 32
    #[arg(long, short)]
    pub blocks: u64,

    /// Create missing images (or extend short ones) to this many MiB
    #[arg(long)]
    pub size: Option<u64>,
}
