use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use arrival_schema::SequenceSnapshot;
use futures::channel::mpsc;
use ulid::Ulid;

/// Fans sequence snapshots out to every subscriber.
///
/// Publishing never waits on a subscriber: channels are unbounded and subscribers
/// whose receiver has gone away are dropped on the next publish.
#[derive(Default)]
pub struct SnapshotPublisher {
    subscriptions: Mutex<Subscriptions>,
}

type Subscriptions = HashMap<Ulid, mpsc::UnboundedSender<SequenceSnapshot>>;

impl SnapshotPublisher {
    pub fn subscribe(&self) -> (Ulid, mpsc::UnboundedReceiver<SequenceSnapshot>) {
        let id = Ulid::new();
        let (tx, rx) = mpsc::unbounded();

        log::info!("new snapshot subscription: {id}");
        self.lock().insert(id, tx);

        (id, rx)
    }

    pub fn unsubscribe(&self, id: Ulid) {
        self.lock().remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    pub fn publish(&self, snapshot: SequenceSnapshot) {
        let mut subscriptions = self.lock();

        let mut disconnected = vec![];
        for (id, tx) in subscriptions.iter() {
            match tx.unbounded_send(snapshot.clone()) {
                Err(e) if e.is_disconnected() => disconnected.push(*id),
                _ => {}
            }
        }

        // Remove any disconnected subscribers
        for id in disconnected {
            log::info!("snapshot subscription {id} disconnected");
            subscriptions.remove(&id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Subscriptions> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod test {
    use arrival_schema::{AirportConfiguration, Runway, RunwayMode, Sequence};
    use chrono::{TimeDelta, TimeZone, Utc};
    use futures::StreamExt;

    use super::*;

    fn snapshot() -> SequenceSnapshot {
        let sequence = Sequence::new(AirportConfiguration {
            identifier: "YSSY".to_string(),
            runway_modes: vec![RunwayMode::new(
                "34L",
                vec![Runway::new("34L", TimeDelta::minutes(3))],
                TimeDelta::minutes(5),
            )],
            feeder_fixes: vec![],
            feeder_fix_estimate_source_range_nm: 30.0,
        })
        .unwrap();

        sequence.snapshot(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_reaches_every_subscriber() {
        let publisher = SnapshotPublisher::default();
        let (_, mut first) = publisher.subscribe();
        let (_, mut second) = publisher.subscribe();

        publisher.publish(snapshot());

        assert_eq!(first.next().await.unwrap().airport, "YSSY");
        assert_eq!(second.next().await.unwrap().current_runway_mode, "34L");
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_subscribers_are_dropped() {
        let publisher = SnapshotPublisher::default();
        let (_, first) = publisher.subscribe();
        let (id, _second) = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 2);

        drop(first);
        publisher.publish(snapshot());
        assert_eq!(publisher.subscriber_count(), 1);

        publisher.unsubscribe(id);
        assert_eq!(publisher.subscriber_count(), 0);
    }
}
