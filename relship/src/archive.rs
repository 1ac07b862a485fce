//! Archiver stage
//!
//! Enumerates immediate subdirectories of the projects root and produces one
//! zip per subdirectory in the staging directory, with entry paths relative
//! to the subdirectory. A missing root is a successful no-op.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::checksum::{self, Checksums};
use crate::{Error, Result};

pub const ARCHIVE_EXTENSION: &str = "zip";

/// One produced archive, scoped to a single run
#[derive(Debug, Clone)]
pub struct Archive {
    /// Asset name, `<dir>.zip`
    pub name: String,
    /// Directory name the archive was derived from
    pub stem: String,
    pub path: PathBuf,
    pub checksums: Checksums,
}

/// Archive every immediate subdirectory of `root` into `staging`.
///
/// Returns the produced set ordered by directory name. An absent root
/// yields an empty set, not an error.
pub fn archive_projects(root: &Path, staging: &Path) -> Result<Vec<Archive>> {
    if !root.is_dir() {
        info!("Projects root {} not found, nothing to do", root.display());
        return Ok(Vec::new());
    }

    fs::create_dir_all(staging)?;

    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut archives = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let stem = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Archive(format!("Unnamed directory {}", dir.display())))?;

        let name = format!("{}.{}", stem, ARCHIVE_EXTENSION);
        let dest = staging.join(&name);

        info!("Archiving {} -> {}", dir.display(), dest.display());
        zip_directory(&dir, &dest)?;

        let checksums = checksum::compute_checksums(&dest)?;
        checksums.write_sidecars(&dest)?;
        debug!("{} sha256 {}", name, checksums.sha256);

        archives.push(Archive {
            name,
            stem,
            path: dest,
            checksums,
        });
    }

    Ok(archives)
}

/// Write the full contents of `dir` into a zip at `dest`, entry paths
/// relative to `dir`. An empty directory yields a valid empty zip.
fn zip_directory(dir: &Path, dest: &Path) -> Result<()> {
    let file = File::create(dest)?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| Error::Archive(e.to_string()))?
            .to_string_lossy()
            .into_owned();

        if entry.file_type().is_dir() {
            writer.add_directory(relative, options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(relative, options)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut writer)?;
        }
        // Symlinks and special files are skipped.
    }

    writer.finish()?;
    Ok(())
}

/// Rebuild the archive set from the staging directory of a previous
/// `archive` invocation, recomputing checksums.
pub fn load_staged(staging: &Path) -> Result<Vec<Archive>> {
    if !staging.is_dir() {
        return Ok(Vec::new());
    }

    let mut archives = Vec::new();
    let mut paths: Vec<PathBuf> = fs::read_dir(staging)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION)
        })
        .collect();
    paths.sort();

    for path in paths {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let checksums = checksum::compute_checksums(&path)?;

        archives.push(Archive {
            name,
            stem,
            path,
            checksums,
        });
    }

    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn staged(root: &Path) -> (tempfile::TempDir, Vec<Archive>) {
        let staging = tempfile::tempdir().unwrap();
        let archives = archive_projects(root, staging.path()).unwrap();
        (staging, archives)
    }

    #[test]
    fn test_missing_root_is_noop() {
        let staging = tempfile::tempdir().unwrap();
        let archives =
            archive_projects(Path::new("/nonexistent/projects"), staging.path()).unwrap();
        assert!(archives.is_empty());
    }

    #[test]
    fn test_archives_named_after_directories() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("Alpha Beta")).unwrap();
        fs::write(root.path().join("Alpha Beta/readme.txt"), b"alpha").unwrap();
        fs::create_dir(root.path().join("gamma")).unwrap();
        fs::write(root.path().join("gamma/main.rs"), b"fn main() {}").unwrap();
        // Loose files at the root are not archived.
        fs::write(root.path().join("stray.txt"), b"ignored").unwrap();

        let (_staging, archives) = staged(root.path());
        let names: Vec<&str> = archives.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha Beta.zip", "gamma.zip"]);
        assert_eq!(archives[0].stem, "Alpha Beta");
        assert!(archives.iter().all(|a| a.path.exists()));
    }

    #[test]
    fn test_entries_relative_to_subdirectory() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("proj/src/nested")).unwrap();
        fs::write(root.path().join("proj/src/nested/deep.txt"), b"deep").unwrap();
        fs::write(root.path().join("proj/top.txt"), b"top").unwrap();

        let (_staging, archives) = staged(root.path());
        assert_eq!(archives.len(), 1);

        let mut zip = zip::ZipArchive::new(File::open(&archives[0].path).unwrap()).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"top.txt".to_string()));
        assert!(names.contains(&"src/nested/deep.txt".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("proj")));

        let mut content = String::new();
        zip.by_name("src/nested/deep.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "deep");
    }

    #[test]
    fn test_empty_subdirectory_yields_empty_zip() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("empty")).unwrap();

        let (_staging, archives) = staged(root.path());
        assert_eq!(archives.len(), 1);

        let zip = zip::ZipArchive::new(File::open(&archives[0].path).unwrap()).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn test_checksum_sidecars_written() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("proj")).unwrap();
        fs::write(root.path().join("proj/a.txt"), b"a").unwrap();

        let (staging, archives) = staged(root.path());
        assert!(staging.path().join("proj.zip.b3sum").exists());
        assert!(staging.path().join("proj.zip.sha256").exists());
        assert_eq!(archives[0].checksums.sha256.len(), 64);
    }

    #[test]
    fn test_load_staged_round_trip() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("beta")).unwrap();
        fs::write(root.path().join("beta/b.txt"), b"b").unwrap();

        let (staging, produced) = staged(root.path());
        let loaded = load_staged(staging.path()).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, produced[0].name);
        assert_eq!(loaded[0].stem, "beta");
        assert_eq!(loaded[0].checksums.sha256, produced[0].checksums.sha256);
    }

    #[test]
    fn test_load_staged_missing_dir() {
        assert!(load_staged(Path::new("/nonexistent/dist"))
            .unwrap()
            .is_empty());
    }
}
