//! umsd - Unified Model Store daemon.
//!
//! Hosts the long-lived model store and the four background watchers that
//! bridge git hook scripts to in-process store operations through trigger and
//! result files under `.ums/`.

pub mod changelog;
pub mod git;
pub mod handlers;
pub mod hooks;
pub mod store;
pub mod watcher;

use std::path::Path;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::info;
use ums_core::{CoordinationConfig, UmsPaths};

use handlers::{MergeHandler, PostCommitHandler, ReloadHandler, SharedStore, ValidationHandler};
use hooks::HookInstaller;
use store::{ModelStore, StoreError};
use watcher::Watcher;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Hooks(#[from] hooks::HookError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;

/// The daemon: one store, four watchers, one `.ums/` directory.
pub struct UmsDaemon {
    paths: UmsPaths,
    config: CoordinationConfig,
    store: SharedStore,
    validation: Watcher<ValidationHandler>,
    reload: Watcher<ReloadHandler>,
    post_commit: Watcher<PostCommitHandler>,
    merge: Watcher<MergeHandler>,
}

impl UmsDaemon {
    /// Build the store over the repository working tree and wire up the
    /// watchers. Nothing polls until `start()`.
    pub fn new(repo_root: &Path, config: CoordinationConfig) -> Result<Self> {
        let paths = UmsPaths::new(repo_root);
        paths.ensure_layout()?;

        let store = ModelStore::builder()
            .with_storage_root(repo_root)
            .with_model_extension(&config.model_extension)
            .build_and_load()?;
        let store: SharedStore = Arc::new(Mutex::new(store));

        let poll = config.poll_interval();
        let validation = Watcher::new(
            ValidationHandler::new(Arc::clone(&store), &paths, &config),
            poll,
        );
        let reload = Watcher::new(ReloadHandler::new(Arc::clone(&store), &paths), poll);
        let post_commit = Watcher::new(PostCommitHandler::new(&paths, &config), poll);
        let merge = Watcher::new(MergeHandler::new(Arc::clone(&store), &paths), poll);

        Ok(Self {
            paths,
            config,
            store,
            validation,
            reload,
            post_commit,
            merge,
        })
    }

    pub fn paths(&self) -> &UmsPaths {
        &self.paths
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    /// Shared handle to the store, for foreground mutation through views.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Write the four hook scripts into the repository.
    pub fn install_hooks(&self) -> hooks::Result<()> {
        HookInstaller::new(&self.paths.root, &self.config)?.install_all()
    }

    /// Start all four watchers. Idempotent.
    pub fn start(&mut self) {
        self.validation.start();
        self.reload.start();
        self.post_commit.start();
        self.merge.start();
        info!(
            repo = %self.paths.root.display(),
            poll_ms = self.config.poll_interval_ms,
            "umsd watchers running"
        );
    }

    pub fn is_running(&self) -> bool {
        self.validation.is_running()
            || self.reload.is_running()
            || self.post_commit.is_running()
            || self.merge.is_running()
    }

    /// Stop all watchers and dispose the store.
    pub async fn shutdown(&mut self) {
        self.validation.stop().await;
        self.reload.stop().await;
        self.post_commit.stop().await;
        self.merge.stop().await;
        handlers::lock_store(&self.store).dispose();
        info!("umsd shut down");
    }
}
