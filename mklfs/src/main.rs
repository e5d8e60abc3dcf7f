//! `mklfs`: builds an LFS image from a set of host files.

use std::env;
use std::path::PathBuf;
use std::process::exit;

use lfs_core::builder::ImageBuilder;
use lfs_core::layout::{SuperBlock, FSSIZE};

fn main() {
    let mut args = env::args();
    let prog = args.next().unwrap_or_else(|| "mklfs".to_string());
    let rest: Vec<String> = args.collect();

    if rest.len() < 2 {
        eprintln!("{prog}: usage: {prog} <image-path> <file>...");
        exit(1);
    }

    let image_path = PathBuf::from(&rest[0]);
    let input_paths: Vec<PathBuf> = rest[1..].iter().map(PathBuf::from).collect();

    match ImageBuilder::build(&image_path, &input_paths) {
        Ok(summary) => {
            println!(
                "nmeta 4 (boot, super, checkpoint1, checkpoint2) blocks {} total {}",
                SuperBlock::new().nblocks,
                FSSIZE
            );
            println!(
                "balloc: first {} blocks have been allocated",
                summary.blocks_allocated
            );
        }
        Err(e) => {
            eprintln!("{prog}: {e}");
            exit(1);
        }
    }
}
