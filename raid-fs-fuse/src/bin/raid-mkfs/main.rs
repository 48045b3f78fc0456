mod cli;

use std::sync::Arc;

use block_dev::BlockDevice;
use clap::Parser;
use raid_fs::{LayoutError, Owner, RaidFileSystem};
use raid_fs_fuse::BlockFile;
use typed_bytesize::ByteSizeIec;

use self::cli::Cli;

fn main() -> Result<(), LayoutError> {
    env_logger::init();

    let cli = Cli::parse();
    println!("disks={:?}\nmode={}", cli.disks, cli.raid);

    let devices = cli
        .disks
        .iter()
        .map(|path| {
            let disk = match cli.size {
                Some(mib) => BlockFile::create(path, ByteSizeIec::mib(mib).0)?,
                None => BlockFile::open(path)?,
            };
            Ok(Arc::new(disk) as Arc<dyn BlockDevice>)
        })
        .collect::<Result<Vec<_>, LayoutError>>()?;

    // SAFETY: 只读取进程的用户与组
    let owner = unsafe {
        Owner {
            uid: libc::getuid(),
            gid: libc::getgid(),
        }
    };
    let fs = RaidFileSystem::format(devices, cli.raid, cli.inodes, cli.blocks, owner)?;

    let sb = fs.super_block();
    println!(
        "inodes={}\ndata blocks={}\nbytes per disk={}",
        sb.num_inodes,
        sb.num_data_blocks,
        sb.required_capacity()
    );

    Ok(())
}
