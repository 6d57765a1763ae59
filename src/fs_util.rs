use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use md5::{Digest, Md5};

use crate::error::MafError;

const HASH_CHUNK: usize = 4096;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn md5_hex(path: &Path) -> Result<String, MafError> {
    let mut file = File::open(path)
        .map_err(|err| MafError::Filesystem(format!("open {}: {err}", path.display())))?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; HASH_CHUNK];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|err| MafError::Filesystem(format!("read {}: {err}", path.display())))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn ensure_dir(path: &Path) -> Result<(), MafError> {
    fs::create_dir_all(path)
        .map_err(|err| MafError::Filesystem(format!("create {}: {err}", path.display())))
}

pub fn open_maf(path: &Path) -> Result<Box<dyn BufRead>, MafError> {
    let file = File::open(path)
        .map_err(|err| MafError::Filesystem(format!("open {}: {err}", path.display())))?;
    let mut reader = BufReader::new(file);
    let is_gzip = reader
        .fill_buf()
        .map(|head| head.starts_with(&GZIP_MAGIC))
        .map_err(|err| MafError::Filesystem(format!("read {}: {err}", path.display())))?;
    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

pub fn read_maf_lines(path: &Path) -> Result<Vec<String>, MafError> {
    let reader = open_maf(path)?;
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|err| MafError::Decode {
            file: path.display().to_string(),
            message: err.to_string(),
        })?;
        lines.push(line.strip_suffix('\r').map(str::to_string).unwrap_or(line));
    }
    Ok(lines)
}
