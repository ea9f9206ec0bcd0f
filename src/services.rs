use std::{
    collections::HashSet,
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{Context, Result};

use crate::model::{ImageMediaType, SelectedFile};

/// Creates and revokes display references to image bytes.
pub trait PreviewService: Send + Sync {
    fn create(&self, file: &SelectedFile) -> Result<String>;
    fn revoke(&self, location: &str);
}

/// A live preview. Revoked when dropped.
pub struct PreviewHandle {
    location: String,
    service: Arc<dyn PreviewService>,
}

impl PreviewHandle {
    pub fn acquire(service: &Arc<dyn PreviewService>, file: &SelectedFile) -> Result<Self> {
        let location = service.create(file)?;
        tracing::debug!(%location, "preview created");
        Ok(Self {
            location,
            service: Arc::clone(service),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        tracing::debug!(location = %self.location, "preview revoked");
        self.service.revoke(&self.location);
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("location", &self.location)
            .finish()
    }
}

/// Keeps previews as opaque `blob:` references and tracks which are live.
#[derive(Default)]
pub struct InMemoryPreviewService {
    next_id: AtomicU64,
    ledger: Mutex<PreviewLedger>,
}

#[derive(Default)]
struct PreviewLedger {
    live: HashSet<String>,
    created: usize,
    revoked: usize,
    peak_live: usize,
}

impl InMemoryPreviewService {
    pub fn live(&self) -> usize {
        self.with_ledger(|ledger| ledger.live.len())
    }

    pub fn created(&self) -> usize {
        self.with_ledger(|ledger| ledger.created)
    }

    pub fn revoked(&self) -> usize {
        self.with_ledger(|ledger| ledger.revoked)
    }

    pub fn peak_live(&self) -> usize {
        self.with_ledger(|ledger| ledger.peak_live)
    }

    fn with_ledger<T>(&self, f: impl FnOnce(&mut PreviewLedger) -> T) -> T {
        let mut ledger = self
            .ledger
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut ledger)
    }
}

impl PreviewService for InMemoryPreviewService {
    fn create(&self, file: &SelectedFile) -> Result<String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let location = format!("blob:hurai/{id}/{}", file.name);
        self.with_ledger(|ledger| {
            ledger.live.insert(location.clone());
            ledger.created += 1;
            ledger.peak_live = ledger.peak_live.max(ledger.live.len());
        });
        Ok(location)
    }

    fn revoke(&self, location: &str) {
        self.with_ledger(|ledger| {
            if ledger.live.remove(location) {
                ledger.revoked += 1;
            }
        });
    }
}

/// Writes each preview to its own file under a directory and deletes it on
/// revoke, so the image can be opened by an external viewer meanwhile.
pub struct TempDirPreviewService {
    dir: PathBuf,
    next_id: AtomicU64,
}

impl TempDirPreviewService {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl PreviewService for TempDirPreviewService {
    fn create(&self, file: &SelectedFile) -> Result<String> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed creating preview dir {}", self.dir.display()))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self.dir.join(format!(
            "preview-{}-{id}.{}",
            std::process::id(),
            extension_for(file.media_type)
        ));
        fs::write(&path, &file.data)
            .with_context(|| format!("failed writing preview {}", path.display()))?;
        Ok(path.display().to_string())
    }

    fn revoke(&self, location: &str) {
        if let Err(err) = fs::remove_file(location) {
            tracing::warn!(%location, error = %err, "failed removing preview file");
        }
    }
}

fn extension_for(media_type: ImageMediaType) -> &'static str {
    match media_type {
        ImageMediaType::Jpeg | ImageMediaType::Jpg => "jpg",
        ImageMediaType::Png => "png",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_file() -> SelectedFile {
        SelectedFile {
            name: "cat.png".into(),
            media_type: ImageMediaType::Png,
            data: Arc::from(vec![0x89, 0x50, 0x4e, 0x47]),
        }
    }

    #[test]
    fn dropping_handle_revokes_preview() {
        let memory = Arc::new(InMemoryPreviewService::default());
        let service: Arc<dyn PreviewService> = memory.clone();

        let handle = PreviewHandle::acquire(&service, &sample_file()).expect("acquire");
        assert!(handle.location().starts_with("blob:hurai/1/"));
        assert_eq!(memory.live(), 1);

        drop(handle);
        assert_eq!(memory.live(), 0);
        assert_eq!(memory.created(), 1);
        assert_eq!(memory.revoked(), 1);
    }

    #[test]
    fn temp_dir_preview_lives_until_revoked() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let service: Arc<dyn PreviewService> =
            Arc::new(TempDirPreviewService::new(tmp.path().join("previews")));

        let handle = PreviewHandle::acquire(&service, &sample_file()).expect("acquire");
        let path = PathBuf::from(handle.location());
        assert_eq!(fs::read(&path).expect("read preview"), vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("png"));

        drop(handle);
        assert!(!path.exists());
    }
}
