mod cli;

use std::io;
use std::sync::Arc;

use block_dev::BlockDevice;
use clap::Parser;
use fuser::MountOption;
use raid_fs::RaidFileSystem;
use raid_fs_fuse::{BlockFile, RaidFuse};

use self::cli::Cli;

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let devices = cli
        .disks
        .iter()
        .map(|path| Ok(Arc::new(BlockFile::open(path)?) as Arc<dyn BlockDevice>))
        .collect::<io::Result<Vec<_>>>()?;
    let fs = RaidFileSystem::open(devices).map_err(|err| {
        log::error!("cannot mount: {err}");
        io::Error::other(err)
    })?;

    let mut options = vec![MountOption::FSName("raid-fs".to_owned())];
    options.extend(cli.options.into_iter().map(MountOption::CUSTOM));
    log::info!("mounting at {:?}", cli.mountpoint);

    fuser::mount2(RaidFuse::new(fs), &cli.mountpoint, &options)
}
