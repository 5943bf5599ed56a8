use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::{self, JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::configuration::ProviderConfiguration;
use crate::error::build_report;
use crate::keystore::{KeyStore, KeyStoreError};

#[derive(Debug, Error)]
pub enum RotationError {
    #[error("Error rotating signing key")]
    KeyStore(#[from] KeyStoreError),
    #[error("Rotation task failed")]
    Task(#[from] JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSummary {
    pub key_id: String,
    pub purged: usize,
}

/// Rotates the provider's signing key every `rotation_interval` and drops
/// retired keys whose window has closed.
pub struct KeyRotationService {
    provider: Arc<ProviderConfiguration>,
    keystore: Arc<KeyStore>,
}

impl KeyRotationService {
    pub fn new(provider: Arc<ProviderConfiguration>, keystore: Arc<KeyStore>) -> Self {
        Self { provider, keystore }
    }

    pub async fn tick(&self) -> Result<RotationSummary, RotationError> {
        let keystore = self.keystore.clone();
        let summary = task::spawn_blocking(move || {
            let key = keystore.rotate(None)?;
            let purged = keystore.purge_expired();
            Ok::<_, KeyStoreError>(RotationSummary {
                key_id: key.key_id().to_owned(),
                purged,
            })
        })
        .await??;
        Ok(summary)
    }

    /// Starts the rotation loop. The first rotation happens one full interval
    /// after this call.
    pub fn spawn(self) -> RotationHandle {
        let (tx, mut rx) = oneshot::channel::<()>();
        let period = self.provider.ttl().rotation_interval.unsigned_abs();
        let task = task::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Key rotation scheduled every {:?}", period);
            loop {
                tokio::select! {
                    _ = &mut rx => break,
                    _ = ticker.tick() => match self.tick().await {
                        Ok(summary) => info!(
                            "Signing key rotated to {}, {} expired keys purged",
                            summary.key_id, summary.purged
                        ),
                        Err(err) => error!("{}", build_report(&err)),
                    },
                }
            }
            info!("Key rotation stopped");
        });
        RotationHandle {
            shutdown: tx,
            task,
        }
    }
}

pub struct RotationHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RotationHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            error!("Key rotation task ended abnormally: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::Duration;

    use idp_types::jose::jws::SigningAlgorithm;

    use crate::keystore::KeyStore;
    use crate::services::rotation::KeyRotationService;
    use crate::test_utils::provider;

    #[tokio::test]
    async fn test_tick_rotates_and_purges() {
        let (provider, clock) = provider(SigningAlgorithm::Es256);
        let keystore = Arc::new(KeyStore::generate(provider.clone()).unwrap());
        let first = keystore.current_signing_key().unwrap();
        let service = KeyRotationService::new(provider, keystore.clone());

        let summary = service.tick().await.unwrap();

        assert_ne!(first.key_id(), summary.key_id);
        assert_eq!(0, summary.purged);
        assert_eq!(summary.key_id, keystore.current_signing_key().unwrap().key_id());

        clock.advance(Duration::days(31));
        let summary = service.tick().await.unwrap();
        assert_eq!(2, summary.purged);
        assert_eq!(1, keystore.list_public_keys().len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_service_rotates_until_shutdown() {
        tracing_subscriber::fmt::try_init().ok();
        let (provider, _) = provider(SigningAlgorithm::Es256);
        let period = provider.ttl().rotation_interval.unsigned_abs();
        let keystore = Arc::new(KeyStore::generate(provider.clone()).unwrap());

        let handle = KeyRotationService::new(provider, keystore.clone()).spawn();
        tokio::time::sleep(period / 2).await;
        assert_eq!(1, keystore.version());

        tokio::time::sleep(period * 3).await;
        handle.shutdown().await;
        let version = keystore.version();
        assert!(version > 1);

        tokio::time::sleep(period * 3).await;
        assert_eq!(version, keystore.version());
    }
}
