//! Small file helpers shared by the manifest and brick-file backends.
//! Mirrors the read/write/sync conventions in the corpus's own
//! `util::files` module, narrowed to our error kinds.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;

pub fn create_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        err_at!(IOError, fs::create_dir_all(parent))?;
    }
    err_at!(IOError, fs::OpenOptions::new().read(true).write(true).create(true).truncate(true).open(path))
}

pub fn open_file_rw(path: &Path) -> Result<fs::File> {
    err_at!(IOError, fs::OpenOptions::new().read(true).write(true).open(path))
}

pub fn sync_write_at(file: &mut fs::File, offset: u64, data: &[u8]) -> Result<()> {
    err_at!(IOError, file.seek(SeekFrom::Start(offset)))?;
    let n = err_at!(IOError, file.write(data))?;
    if n != data.len() {
        return err_at!(Fatal, msg: "partial write at offset {}: {}/{} bytes", offset, n, data.len());
    }
    err_at!(IOError, file.sync_all())?;
    Ok(())
}

pub fn read_at(file: &mut fs::File, offset: u64, n: usize) -> Result<Vec<u8>> {
    err_at!(IOError, file.seek(SeekFrom::Start(offset)))?;
    let mut buf = vec![0u8; n];
    let got = err_at!(IOError, file.read(&mut buf))?;
    if got != n {
        return err_at!(Fatal, msg: "short read at offset {}: {}/{} bytes", offset, got, n);
    }
    Ok(buf)
}
