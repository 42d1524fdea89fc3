//! Settings synchronization.
//!
//! The local record is written synchronously and is what the caller sees.
//! In remote mode every change is also queued as a whole-record upsert on a
//! background worker; its outcome is only logged.

use std::sync::Arc;

use crate::{
    domain::settings::{SettingKey, SettingsError, UserSettings},
    infra::{
        error::AppError,
        sync_queue::{EnqueueError, SyncOutcome, SyncQueue},
    },
};

use super::{
    contracts::{StoreError, SyncBackend},
    dual_store::DualStore,
};

const SETTINGS_SYNC_QUEUE: &str = "superapp-settings-sync";

const SETTINGS_SYNC_SUCCEEDED: &str = "SETTINGS_SYNC_SUCCEEDED";
const SETTINGS_SYNC_FAILED: &str = "SETTINGS_SYNC_FAILED";
const SETTINGS_SYNC_SKIPPED: &str = "SETTINGS_SYNC_SKIPPED";
const SETTINGS_REMOTE_LOAD_FAILED: &str = "SETTINGS_REMOTE_LOAD_FAILED";
const SETTINGS_LOCAL_WRITE_FAILED: &str = "SETTINGS_LOCAL_WRITE_FAILED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsJob {
    pub user_id: String,
    pub settings: UserSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsUpdateError {
    #[error(transparent)]
    Invalid(#[from] SettingsError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SettingsSync {
    user_id: String,
    current: UserSettings,
    remote_queue: Option<SyncQueue<SettingsJob>>,
}

impl SettingsSync {
    /// Starts the background remote writer when `store` is in remote mode.
    /// Settings stay at their defaults until [`SettingsSync::load`] runs.
    pub fn start<R, L>(
        store: &DualStore<R, L>,
        user_id: &str,
        queue_capacity: usize,
    ) -> Result<Self, AppError>
    where
        R: SyncBackend + 'static,
        L: SyncBackend,
    {
        let remote_queue = match store.remote() {
            Some(remote) => {
                let remote = Arc::clone(remote);
                Some(SyncQueue::start(
                    SETTINGS_SYNC_QUEUE,
                    queue_capacity,
                    move |job: &SettingsJob| remote.save_settings(&job.user_id, &job.settings),
                    report_outcome,
                )?)
            }
            None => None,
        };

        Ok(Self {
            user_id: user_id.to_owned(),
            current: UserSettings::default(),
            remote_queue,
        })
    }

    pub fn current(&self) -> &UserSettings {
        &self.current
    }

    /// Remote record if one exists, else the local one, else defaults
    /// (persisted locally).
    pub fn load<R, L>(&mut self, store: &DualStore<R, L>) -> &UserSettings
    where
        R: SyncBackend,
        L: SyncBackend,
    {
        let remote_record = store.remote().and_then(|remote| {
            remote
                .load_settings(&self.user_id)
                .unwrap_or_else(|error| {
                    tracing::warn!(
                        code = SETTINGS_REMOTE_LOAD_FAILED,
                        error_code = error.code(),
                        error = %error,
                        "remote settings unavailable; using local record"
                    );
                    None
                })
        });

        self.current = match remote_record {
            Some(settings) => {
                self.write_local_best_effort(store, &settings);
                settings
            }
            None => match store.local().load_settings(&self.user_id) {
                Ok(Some(settings)) => settings,
                _ => {
                    let defaults = UserSettings::default();
                    self.write_local_best_effort(store, &defaults);
                    defaults
                }
            },
        };

        &self.current
    }

    /// Changes exactly one field.
    pub fn update<R, L>(
        &mut self,
        store: &DualStore<R, L>,
        key: SettingKey,
        raw_value: &str,
    ) -> Result<&UserSettings, SettingsUpdateError>
    where
        R: SyncBackend,
        L: SyncBackend,
    {
        let updated = self.current.with_field(key, raw_value)?;
        self.persist(store, updated)?;
        Ok(&self.current)
    }

    pub fn reset<R, L>(&mut self, store: &DualStore<R, L>) -> Result<&UserSettings, SettingsUpdateError>
    where
        R: SyncBackend,
        L: SyncBackend,
    {
        self.persist(store, UserSettings::default())?;
        Ok(&self.current)
    }

    fn persist<R, L>(
        &mut self,
        store: &DualStore<R, L>,
        settings: UserSettings,
    ) -> Result<(), StoreError>
    where
        R: SyncBackend,
        L: SyncBackend,
    {
        store.local().save_settings(&self.user_id, &settings)?;
        self.current = settings;

        if let Some(queue) = &self.remote_queue {
            let job = SettingsJob {
                user_id: self.user_id.clone(),
                settings: self.current.clone(),
            };
            if let Err(EnqueueError::Closed) = queue.enqueue(job) {
                tracing::warn!(
                    code = SETTINGS_SYNC_SKIPPED,
                    "settings sync worker is gone; remote record not updated"
                );
            }
        }

        Ok(())
    }

    fn write_local_best_effort<R, L>(&self, store: &DualStore<R, L>, settings: &UserSettings)
    where
        R: SyncBackend,
        L: SyncBackend,
    {
        if let Err(error) = store.local().save_settings(&self.user_id, settings) {
            tracing::warn!(
                code = SETTINGS_LOCAL_WRITE_FAILED,
                error = %error,
                "settings could not be cached locally"
            );
        }
    }
}

fn report_outcome(job: &SettingsJob, outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::Succeeded => tracing::debug!(
            code = SETTINGS_SYNC_SUCCEEDED,
            user_id = %job.user_id,
            "settings synced to remote"
        ),
        SyncOutcome::Failed(error) => tracing::warn!(
            code = SETTINGS_SYNC_FAILED,
            user_id = %job.user_id,
            error_code = error.code(),
            error = %error,
            "background settings sync failed; local record kept"
        ),
    }
}
