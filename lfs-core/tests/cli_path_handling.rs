//! Exercises `ImageBuilder::build`'s real-filesystem path handling: the
//! `user/`-prefix stripping and leading-`_`-stripping rules apply to the
//! literal CLI argument, which must be a shallow, `/`-free (after
//! stripping) name - exactly the shape `mklfs` receives from a build
//! system invoking it with paths relative to its own working directory.

use std::fs;
use std::path::PathBuf;

use lfs_core::builder::ImageBuilder;
use lfs_core::device::FileBlockDevice;
use lfs_core::inode::DiskInode;
use lfs_core::layout::BSIZE;

struct Guard(PathBuf);
impl Drop for Guard {
    fn drop(&mut self) {
        fs::remove_file(&self.0).ok();
    }
}

#[test]
fn builds_an_image_from_a_real_file_with_underscore_prefix_stripped() {
    let tag = format!(
        "{}-{:?}",
        std::process::id(),
        std::thread::current().id()
    );
    let input = PathBuf::from(format!("_mklfs_cli_test_input_{tag}"));
    fs::write(&input, b"payload").unwrap();
    let _input_guard = Guard(input.clone());

    let image = PathBuf::from(format!("mklfs_cli_test_image_{tag}.img"));
    let summary = ImageBuilder::build(&image, &[input]).unwrap();
    let _image_guard = Guard(image.clone());

    assert!(summary.blocks_allocated > 0);

    let dev = FileBlockDevice::open(&image).unwrap();
    let block = summary.imap.block_for(2).unwrap();
    let mut buf = [0u8; BSIZE];
    dev.read_block(block, &mut buf);
    let dinode = DiskInode::decode_from(&buf);
    assert_eq!(dinode.size as usize, 7);
}

#[test]
fn rejects_a_path_with_an_embedded_slash() {
    let image = PathBuf::from(format!(
        "mklfs_cli_test_rejects_{}_{:?}.img",
        std::process::id(),
        std::thread::current().id()
    ));
    let result = ImageBuilder::build(&image, &["nested/path"]);
    assert!(result.is_err());
    fs::remove_file(&image).ok();
}
