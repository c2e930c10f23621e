//! Audio file manager: load, swap and fetch
//!
//! File swaps follow a fixed sequence: remember playback/repeat state, stop,
//! load the new waveform, restore repeat parameters, auto-start when
//! configured. A failed fetch never touches the current playback; remote
//! callers get a failure snapshot instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;

use tactus_engine::{PlaybackEngine, TransferPhase, TransferSnapshot, unix_time_secs};

use crate::{FileError, FileResult, decode, is_valid_audio_file, resample};

/// Settle time between a stop command and the load that follows, giving the
/// render path one buffer to apply the stop.
const STOP_SETTLE: Duration = Duration::from_millis(200);

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AudioFileManager {
    audio_dir: PathBuf,
    auto_start: bool,
    engine: Arc<PlaybackEngine>,
    current: Mutex<Option<PathBuf>>,
    previous: Mutex<Option<PathBuf>>,
}

impl AudioFileManager {
    pub fn new(audio_dir: PathBuf, auto_start: bool, engine: Arc<PlaybackEngine>) -> Self {
        Self {
            audio_dir,
            auto_start,
            engine,
            current: Mutex::new(None),
            previous: Mutex::new(None),
        }
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.current.lock().clone()
    }

    /// Decode, resample and hand a file to the engine. Used at startup and
    /// as the final step of every swap.
    pub fn prepare_and_load(&self, path: &Path) -> FileResult<()> {
        let decoded = decode(path)?;
        let samples = resample(
            &decoded.samples,
            decoded.sample_rate,
            self.engine.sample_rate(),
        )?;
        self.engine.load_waveform(samples)?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());
        self.engine.set_current_file(name);

        let mut current = self.current.lock();
        *self.previous.lock() = current.clone();
        *current = Some(path.to_path_buf());
        Ok(())
    }

    /// Handle a remote load request: an HTTP(S) URL is fetched into the
    /// audio directory first, anything else is treated as a local path.
    pub async fn swap_to(self: &Arc<Self>, source: String) {
        let engine = Arc::clone(&self.engine);
        let original_state = engine.state();

        // Repeat parameters survive a file swap
        let repeat_was_armed = engine.repeat_enabled();
        let (saved_count, saved_interval) = engine.repeat_params();

        let is_url = source.starts_with("http://") || source.starts_with("https://");
        if is_url {
            engine.publish_transfer(TransferSnapshot {
                transfer_state: TransferPhase::Downloading,
                timestamp: unix_time_secs(),
                detail: json!({
                    "download_url": source,
                    "current_file": engine.current_file(),
                }),
            });
        }

        let result = self.swap_inner(&source, is_url).await;

        match result {
            Ok(path) => {
                if repeat_was_armed {
                    log::info!(
                        "Restoring repeat parameters: {saved_count}x with {:.1}s interval",
                        saved_interval.as_secs_f64()
                    );
                    if let Err(e) = engine.start_repeat_playback(saved_count, saved_interval)
                    {
                        log::error!("Failed to restore repeat parameters: {e}");
                    }
                }

                let auto_started = self.auto_start;
                if auto_started {
                    log::info!(
                        "Auto-starting new file (was {})",
                        original_state.as_str()
                    );
                    engine.start_playback();
                } else {
                    log::info!("New file loaded, auto-start disabled - awaiting command");
                }

                engine.publish_transfer(TransferSnapshot {
                    transfer_state: TransferPhase::Downloaded,
                    timestamp: unix_time_secs(),
                    detail: json!({
                        "loaded_file": path.file_name().and_then(|n| n.to_str()),
                        "file_path": path.display().to_string(),
                        "is_remote": is_url,
                        "original_state": original_state.as_str(),
                        "auto_started": auto_started,
                        "repeat_restored": repeat_was_armed,
                    }),
                });
            }
            Err(e) => {
                log::error!("File swap failed: {e}");
                log::info!("Continuing with current audio file (no interruption)");
                engine.publish_transfer(TransferSnapshot {
                    transfer_state: TransferPhase::DownloadFailed,
                    timestamp: unix_time_secs(),
                    detail: json!({
                        "error_message": e.to_string(),
                        "failed_source": source,
                        "current_file": engine.current_file(),
                        "playback_interrupted": false,
                    }),
                });
            }
        }
    }

    async fn swap_inner(self: &Arc<Self>, source: &str, is_url: bool) -> FileResult<PathBuf> {
        let path = if is_url {
            self.download(source).await?
        } else {
            let path = PathBuf::from(source);
            if !path.exists() {
                return Err(FileError::NotFound(path));
            }
            if !is_valid_audio_file(&path) {
                return Err(FileError::MetadataFile(path));
            }
            path
        };

        // Only now touch playback: the fetch happened with audio running
        self.engine.stop_playback();
        self.engine.interrupt_repeat_worker();
        tokio::time::sleep(STOP_SETTLE).await;

        let manager = Arc::clone(self);
        let load_path = path.clone();
        tokio::task::spawn_blocking(move || manager.prepare_and_load(&load_path))
            .await
            .map_err(|e| FileError::Decode(format!("load task failed: {e}")))??;

        log::info!("Switched to: {}", path.display());
        Ok(path)
    }

    async fn download(&self, url: &str) -> FileResult<PathBuf> {
        log::info!("Starting download from: {url} (keeping current playback)");

        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()?;
        let response = client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        let filename = filename_from_url(url)
            .unwrap_or_else(|| format!("downloaded_audio_{}.wav", unix_time_secs() as u64));
        let path = self.audio_dir.join(filename);

        std::fs::create_dir_all(&self.audio_dir)?;
        std::fs::write(&path, &bytes)?;

        log::info!("Download completed: {}", path.display());
        Ok(path)
    }
}

/// Filename from the URL path when it carries a known audio extension.
fn filename_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next()?;
    let name = without_query.rsplit('/').next()?;
    let ext = name.rsplit('.').next()?.to_ascii_lowercase();
    if name.is_empty() || !crate::AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactus_engine::EngineSettings;

    fn test_engine() -> Arc<PlaybackEngine> {
        Arc::new(PlaybackEngine::new(EngineSettings {
            sample_rate: 48_000,
            ..EngineSettings::default()
        }))
    }

    fn write_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(0.5f32).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_prepare_and_load_installs_waveform() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cue.wav");
        write_wav(&path, 48_000);

        let engine = test_engine();
        let manager =
            AudioFileManager::new(dir.path().to_path_buf(), false, Arc::clone(&engine));

        manager.prepare_and_load(&path).unwrap();
        assert_eq!(engine.template_frames(), 48_000);
        assert_eq!(engine.current_file().as_deref(), Some("cue.wav"));
        assert_eq!(manager.current_file().as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_failure_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        write_wav(&good, 48_000);

        let engine = test_engine();
        let manager =
            AudioFileManager::new(dir.path().to_path_buf(), false, Arc::clone(&engine));
        manager.prepare_and_load(&good).unwrap();

        let missing = dir.path().join("missing.wav");
        assert!(manager.prepare_and_load(&missing).is_err());

        // Prior state preserved
        assert_eq!(engine.template_frames(), 48_000);
        assert_eq!(manager.current_file().as_deref(), Some(good.as_path()));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("http://host/audio/cue.wav").as_deref(),
            Some("cue.wav")
        );
        assert_eq!(
            filename_from_url("https://host/a/b/tone.flac?sig=abc").as_deref(),
            Some("tone.flac")
        );
        assert_eq!(filename_from_url("http://host/download"), None);
        assert_eq!(filename_from_url("http://host/"), None);
    }
}
