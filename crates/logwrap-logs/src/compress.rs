//! Gzip compression of rotated backups

use flate2::write::GzEncoder;
use flate2::Compression;
use logwrap_core::Result;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::namer::gz_sibling;

/// Compress a backup file to `{path}.gz` and remove the original.
///
/// The uncompressed source is removed only after the compressed file has
/// been fully written; on failure the source stays in place and any
/// partial `.gz` output is removed.
pub fn gzip_file(src: &Path) -> Result<PathBuf> {
    let dst = gz_sibling(src);

    match stream_gzip(src, &dst) {
        Ok(()) => {
            fs::remove_file(src)?;
            Ok(dst)
        }
        Err(e) => {
            let _ = fs::remove_file(&dst);
            Err(e.into())
        }
    }
}

fn stream_gzip(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = File::open(src)?;
    let output = File::create(dst)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}
