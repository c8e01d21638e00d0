use super::{SessionWatermark, WatermarkEntry, WatermarkError, WatermarkStore};
use num_bigint::BigUint;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Wraps a `SessionWatermark`-shaped entry list and serializes the full
/// list to `path` after every mutation (whole-file replace), guarded by
/// the same mutex that protects the in-memory view. The mutex is held
/// across the disk write: correctness beats throughput here.
pub struct FileWatermark {
    path: PathBuf,
    entries: Mutex<Vec<WatermarkEntry>>,
}

impl FileWatermark {
    /// Load `path` if it exists (an absent file starts empty), then
    /// perform a write-check before returning so a misconfigured path
    /// fails at startup rather than on the first accepted sign.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WatermarkError> {
        let path = path.as_ref().to_path_buf();
        let entries = load_from_disk(&path)?;
        let store = FileWatermark {
            path,
            entries: Mutex::new(entries),
        };
        store.save_to_disk_locked(&store.entries.lock()?)?;
        Ok(store)
    }

    fn save_to_disk_locked(&self, entries: &[WatermarkEntry]) -> Result<(), WatermarkError> {
        let yaml = serde_yaml::to_string(entries)?;
        std::fs::write(&self.path, yaml)?;
        Ok(())
    }
}

fn load_from_disk(path: &Path) -> Result<Vec<WatermarkEntry>, WatermarkError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(&contents)?)
}

impl WatermarkStore for FileWatermark {
    fn is_safe_to_sign(
        &self,
        key_hash: &str,
        chain_id: &str,
        op_type: u8,
        level: &BigUint,
    ) -> Result<bool, WatermarkError> {
        let mut entries = self.entries.lock()?;
        let ok = SessionWatermark::check_and_update_locked(
            &mut entries,
            key_hash,
            chain_id,
            op_type,
            level,
        );
        if ok {
            self.save_to_disk_locked(&entries)?;
        }
        Ok(ok)
    }
}
