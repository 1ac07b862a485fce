//! Checksum generation for produced archives
//!
//! Computes BLAKE3 and SHA256 digests for each zip and writes them as
//! sidecar files next to the archive.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake3::Hasher as Blake3Hasher;
use sha2::{Digest, Sha256};

/// Digests of one archive
#[derive(Debug, Clone)]
pub struct Checksums {
    pub b3sum: String,
    pub sha256: String,
}

/// Compute BLAKE3 hash of a file
pub fn b3sum<P: AsRef<Path>>(path: P) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Blake3Hasher::new();

    let mut buffer = [0u8; 65536];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute SHA256 hash of a file
pub fn sha256sum<P: AsRef<Path>>(path: P) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();

    let mut buffer = [0u8; 65536];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute both digests for one archive
pub fn compute_checksums<P: AsRef<Path>>(path: P) -> std::io::Result<Checksums> {
    let path = path.as_ref();
    Ok(Checksums {
        b3sum: b3sum(path)?,
        sha256: sha256sum(path)?,
    })
}

impl Checksums {
    /// Write `<archive>.b3sum` and `<archive>.sha256` sidecars
    pub fn write_sidecars<P: AsRef<Path>>(&self, archive_path: P) -> std::io::Result<()> {
        let path = archive_path.as_ref();
        let filename = path.file_name().unwrap_or_default().to_string_lossy();

        std::fs::write(
            format!("{}.b3sum", path.display()),
            format!("{}  {}\n", self.b3sum, filename),
        )?;
        std::fs::write(
            format!("{}.sha256", path.display()),
            format!("{}  {}\n", self.sha256, filename),
        )?;

        Ok(())
    }
}
