//! Save-then-upload of one snapshot.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use sessionlog_network::SnapshotUploader;
use sessionlog_ops::LocalStore;
use sessionlog_types::config::ModeConfig;
use tracing::{debug, error, info, warn};

/// Result of one delivery attempt. Never escalated to the caller as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Neither saving nor sending is enabled for this run mode.
    Disabled,
    /// The snapshot could not be encoded.
    EncodeFailed,
    /// Local-only mode; `saved` reports whether the write succeeded.
    Saved { saved: bool },
    /// Sending needs a local copy first and the write failed.
    SaveFailed,
    /// Sending is enabled but no collector URL is configured.
    MissingServerUrl,
    /// The collector answered 2xx.
    Delivered { removed_local: bool },
    /// Upload failed; a local copy, if any, is kept for the next sweep.
    Deferred { kept_local: bool },
}

impl DeliveryOutcome {
    /// The boolean reported to completion callbacks.
    pub fn succeeded(&self) -> bool {
        match self {
            DeliveryOutcome::Delivered { .. } => true,
            DeliveryOutcome::Saved { saved } => *saved,
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct DeliveryPipeline {
    mode: ModeConfig,
    store: LocalStore,
    uploader: Option<Arc<dyn SnapshotUploader>>,
}

impl DeliveryPipeline {
    /// `uploader` is `None` when no collector URL is configured.
    pub fn new(
        mode: ModeConfig,
        store: LocalStore,
        uploader: Option<Arc<dyn SnapshotUploader>>,
    ) -> Self {
        Self {
            mode,
            store,
            uploader,
        }
    }

    pub fn mode(&self) -> ModeConfig {
        self.mode
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Writes the local copy when local saving is enabled.
    pub fn save_local(&self, json: &str, file_name: &str) -> Option<PathBuf> {
        if !self.mode.save_local_json {
            debug!("Local save disabled by configuration");
            return None;
        }
        match self.store.write(file_name, json) {
            Ok(path) => {
                info!("Session log saved locally to {:?}", path);
                Some(path)
            }
            Err(err) => {
                error!("Error writing session log file: {err}");
                None
            }
        }
    }

    pub async fn deliver(&self, json: String, file_name: &str) -> DeliveryOutcome {
        if !self.mode.is_active() {
            info!("Neither saving nor sending is enabled for this mode; skipping");
            return DeliveryOutcome::Disabled;
        }

        let saved = self.save_local(&json, file_name);

        if !self.mode.send_to_server {
            return DeliveryOutcome::Saved {
                saved: saved.is_some(),
            };
        }
        if self.mode.save_local_json && saved.is_none() {
            warn!("Skipping upload because the local copy could not be written");
            return DeliveryOutcome::SaveFailed;
        }

        self.upload(json, saved.as_deref(), false).await
    }

    /// Upload step alone, for files left by earlier sessions. The file is
    /// deleted on success and left untouched otherwise.
    pub async fn upload_only(&self, json: String, path: &Path) -> DeliveryOutcome {
        self.upload(json, Some(path), true).await
    }

    async fn upload(&self, json: String, local: Option<&Path>, retry: bool) -> DeliveryOutcome {
        let label = if retry { " (retry)" } else { "" };
        let Some(uploader) = &self.uploader else {
            error!("Sending enabled, but the server URL is not configured");
            return DeliveryOutcome::MissingServerUrl;
        };

        match uploader.upload(json).await {
            Ok(()) => {
                info!("Session data{label} sent successfully");
                let removed_local = match local {
                    Some(path) => match self.store.remove(path) {
                        Ok(removed) => {
                            if removed {
                                debug!("Deleted delivered log file {:?}", path);
                            }
                            removed
                        }
                        Err(err) => {
                            error!("Error deleting delivered log file: {err}");
                            false
                        }
                    },
                    None => false,
                };
                DeliveryOutcome::Delivered { removed_local }
            }
            Err(err) => {
                match local {
                    Some(path) => warn!(
                        "Failed to send session data{label}: {err}. Kept at {:?} for the next launch",
                        path
                    ),
                    None => warn!("Failed to send session data{label}: {err} (not saved locally)"),
                }
                DeliveryOutcome::Deferred {
                    kept_local: local.is_some(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedUploader;

    const FILE: &str = "01_02_24_10_30_SessionLog.json";

    fn pipeline(
        dir: &Path,
        save_local_json: bool,
        send_to_server: bool,
        uploader: Option<Arc<ScriptedUploader>>,
    ) -> DeliveryPipeline {
        DeliveryPipeline::new(
            ModeConfig {
                save_local_json,
                send_to_server,
            },
            LocalStore::open(dir).unwrap(),
            uploader.map(|u| u as Arc<dyn SnapshotUploader>),
        )
    }

    #[tokio::test]
    async fn disabled_mode_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(ScriptedUploader::accepting());
        let p = pipeline(dir.path(), false, false, Some(uploader.clone()));

        let outcome = p.deliver("{}".into(), FILE).await;
        assert_eq!(outcome, DeliveryOutcome::Disabled);
        assert!(!outcome.succeeded());
        assert_eq!(uploader.calls(), 0);
        assert!(!dir.path().join(FILE).exists());
    }

    #[tokio::test]
    async fn local_only_reports_write_result() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), true, false, None);
        let outcome = p.deliver("{\"a\":1}".into(), FILE).await;
        assert_eq!(outcome, DeliveryOutcome::Saved { saved: true });
        assert!(outcome.succeeded());
        assert!(dir.path().join(FILE).exists());
    }

    #[tokio::test]
    async fn success_deletes_local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(ScriptedUploader::accepting());
        let p = pipeline(dir.path(), true, true, Some(uploader.clone()));

        let outcome = p.deliver("{}".into(), FILE).await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Delivered {
                removed_local: true
            }
        );
        assert!(!dir.path().join(FILE).exists());
        assert_eq!(uploader.bodies(), vec!["{}".to_string()]);
    }

    #[tokio::test]
    async fn failure_keeps_local_copy_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(ScriptedUploader::rejecting());
        let p = pipeline(dir.path(), true, true, Some(uploader.clone()));

        let outcome = p.deliver("{}".into(), FILE).await;
        assert_eq!(outcome, DeliveryOutcome::Deferred { kept_local: true });
        assert!(!outcome.succeeded());
        assert!(dir.path().join(FILE).exists());

        uploader.push_ok();
        let retry = p.upload_only("{}".into(), &dir.path().join(FILE)).await;
        assert!(retry.succeeded());
        assert!(!dir.path().join(FILE).exists());
    }

    #[tokio::test]
    async fn send_without_local_save_uploads_directly() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(ScriptedUploader::accepting());
        let p = pipeline(dir.path(), false, true, Some(uploader.clone()));

        let outcome = p.deliver("{}".into(), FILE).await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Delivered {
                removed_local: false
            }
        );
        assert!(!dir.path().join(FILE).exists());
    }

    #[tokio::test]
    async fn missing_url_never_touches_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), true, true, None);
        let outcome = p.deliver("{}".into(), FILE).await;
        assert_eq!(outcome, DeliveryOutcome::MissingServerUrl);
        assert!(dir.path().join(FILE).exists());
    }

    #[tokio::test]
    async fn failed_write_blocks_upload_when_local_save_required() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(ScriptedUploader::accepting());
        let p = pipeline(dir.path(), true, true, Some(uploader.clone()));
        std::fs::create_dir(dir.path().join(FILE)).unwrap();

        let outcome = p.deliver("{}".into(), FILE).await;
        assert_eq!(outcome, DeliveryOutcome::SaveFailed);
        assert_eq!(uploader.calls(), 0);
    }

    #[tokio::test]
    async fn same_minute_saves_overwrite_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), true, false, None);
        p.deliver("{\"n\":1}".into(), FILE).await;
        p.deliver("{\"n\":2}".into(), FILE).await;

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join(FILE)).unwrap(),
            "{\"n\":2}"
        );
    }
}
