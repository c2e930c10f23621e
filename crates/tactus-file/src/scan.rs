//! Audio directory discovery and file filtering

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{FileError, FileResult};

/// Extensions the player will attempt to decode
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg"];

/// Smaller files are assumed to be stray metadata, not audio
const MIN_AUDIO_FILE_BYTES: u64 = 1_000;

/// Filter out system/metadata files masquerading as audio.
pub fn is_valid_audio_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with("._") || name.starts_with(".DS_Store") || name.starts_with("Thumbs.db")
    {
        return false;
    }
    match std::fs::metadata(path) {
        Ok(meta) => meta.len() >= MIN_AUDIO_FILE_BYTES,
        Err(_) => false,
    }
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Find playable files in the audio directory, sorted by name.
///
/// A missing directory is created (and reported as empty). An empty result
/// is an error so startup can fail loudly.
pub fn find_audio_files(dir: &Path) -> FileResult<Vec<PathBuf>> {
    if !dir.exists() {
        log::warn!("Creating audio directory: {}", dir.display());
        std::fs::create_dir_all(dir)?;
        return Err(FileError::NoAudioFiles(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_audio_extension(path))
        .filter(|path| {
            let ok = is_valid_audio_file(path);
            if !ok {
                log::info!("Ignoring metadata/system file: {}", path.display());
            }
            ok
        })
        .collect();

    files.sort();

    if files.is_empty() {
        return Err(FileError::NoAudioFiles(dir.to_path_buf()));
    }

    log::info!("Found {} audio file(s) in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, bytes: usize) {
        std::fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn test_filters_metadata_and_tiny_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("._ghost.wav"), 5_000);
        touch(&dir.path().join("tiny.wav"), 10);
        touch(&dir.path().join("real.wav"), 5_000);
        touch(&dir.path().join("notes.txt"), 5_000);

        let files = find_audio_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("real.wav"));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_audio_files(dir.path()),
            Err(FileError::NoAudioFiles(_))
        ));
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("audio");
        assert!(matches!(
            find_audio_files(&missing),
            Err(FileError::NoAudioFiles(_))
        ));
        assert!(missing.exists());
    }

    #[test]
    fn test_results_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.wav"), 5_000);
        touch(&dir.path().join("a.flac"), 5_000);
        touch(&dir.path().join("c.ogg"), 5_000);

        let files = find_audio_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.flac", "b.wav", "c.ogg"]);
    }
}
