use std::collections::HashMap;
use std::sync::Arc;

use arrival_schema::{AirportConfiguration, Sequence, SequencingError};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;

/// Owns one sequence per airport and serializes access to each.
///
/// The registry lock is only held long enough to look up or insert an airport;
/// everything else happens under the airport's own lock so airports never block
/// each other.
#[derive(Default)]
pub struct SequenceProvider {
    sequences: RwLock<HashMap<String, Arc<Mutex<Sequence>>>>,
}

impl SequenceProvider {
    pub async fn create(&self, airport: AirportConfiguration) -> Result<(), SequencingError> {
        let identifier = airport.identifier.clone();
        let sequence = Sequence::new(airport)?;

        let mut sequences = self.sequences.write().await;
        if sequences.contains_key(&identifier) {
            return Err(SequencingError::DuplicateAirport(identifier));
        }

        log::info!("{identifier}: sequence created");
        sequences.insert(identifier, Arc::new(Mutex::new(sequence)));
        Ok(())
    }

    /// Stops managing an airport. Holders of its lock keep their guard until done.
    pub async fn remove(&self, airport: &str) -> Result<(), SequencingError> {
        self.sequences
            .write()
            .await
            .remove(airport)
            .map(|_| log::info!("{airport}: sequence removed"))
            .ok_or_else(|| SequencingError::UnknownAirport(airport.to_string()))
    }

    pub async fn airports(&self) -> Vec<String> {
        let mut airports = self.sequences.read().await.keys().cloned().collect::<Vec<_>>();
        airports.sort();
        airports
    }

    async fn sequence(&self, airport: &str) -> Result<Arc<Mutex<Sequence>>, SequencingError> {
        self.sequences
            .read()
            .await
            .get(airport)
            .cloned()
            .ok_or_else(|| SequencingError::UnknownAirport(airport.to_string()))
    }

    /// Exclusive access to an airport's sequence, released when the guard drops
    pub async fn acquire(
        &self,
        airport: &str,
    ) -> Result<OwnedMutexGuard<Sequence>, SequencingError> {
        Ok(self.sequence(airport).await?.lock_owned().await)
    }

    /// Like [`SequenceProvider::acquire`], but gives up if the token is cancelled
    /// while waiting for the lock.
    pub async fn acquire_cancellable(
        &self,
        airport: &str,
        cancellation: &CancellationToken,
    ) -> Result<OwnedMutexGuard<Sequence>, SequencingError> {
        let sequence = self.sequence(airport).await?;

        tokio::select! {
            guard = sequence.lock_owned() => Ok(guard),
            _ = cancellation.cancelled() => {
                log::debug!("{airport}: gave up waiting for the sequence");
                Err(SequencingError::Cancelled(airport.to_string()))
            }
        }
    }
}
