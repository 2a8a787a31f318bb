//! Per-user snapshot feeds.
//!
//! A feed always holds the latest full snapshot of a collection. Subscribers
//! see the current value immediately and every later replacement; dropping
//! the receiver unsubscribes.
//!
//! Loading and sending a snapshot for one user happens under that user's
//! gate, so snapshots reach subscribers in the order they were read.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

pub type Feed<T> = watch::Receiver<Arc<T>>;

struct Slot<T> {
    gate: Arc<Mutex<()>>,
    sender: Option<watch::Sender<Arc<T>>>,
}

impl<T> Slot<T> {
    fn live(&self) -> Option<&watch::Sender<Arc<T>>> {
        self.sender.as_ref().filter(|tx| !tx.is_closed())
    }
}

pub struct FeedHub<T> {
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T> Default for FeedHub<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> FeedHub<T> {
    /// Joins the user's feed. A live feed is joined as is; otherwise `load`
    /// supplies the first snapshot.
    pub async fn subscribe<F, Fut, E>(&self, user_id: &str, load: F) -> Result<Feed<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let gate = self.gate(user_id).await;
        let joined = {
            let _turn = gate.lock().await;
            self.join_or_open(user_id, load).await
        };
        self.release(user_id, gate).await;
        joined
    }

    /// Sends a freshly loaded snapshot to the user's subscribers. Returns
    /// false without calling `load` when nobody listens.
    pub async fn refresh<F, Fut, E>(&self, user_id: &str, load: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let gate = self.gate(user_id).await;
        let sent = {
            let _turn = gate.lock().await;
            self.reload(user_id, load).await
        };
        self.release(user_id, gate).await;
        sent
    }

    pub async fn has_subscribers(&self, user_id: &str) -> bool {
        self.slots
            .lock()
            .await
            .get(user_id)
            .is_some_and(|slot| slot.live().is_some())
    }

    pub async fn active_feeds(&self) -> usize {
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| slot.live().is_some())
            .count()
    }

    async fn gate(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(user_id.to_string()).or_insert_with(|| Slot {
            gate: Arc::default(),
            sender: None,
        });
        Arc::clone(&slot.gate)
    }

    async fn join_or_open<F, Fut, E>(&self, user_id: &str, load: F) -> Result<Feed<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let existing = {
            let slots = self.slots.lock().await;
            slots.get(user_id).and_then(Slot::live).map(watch::Sender::subscribe)
        };
        if let Some(rx) = existing {
            return Ok(rx);
        }

        let (tx, rx) = watch::channel(Arc::new(load().await?));
        if let Some(slot) = self.slots.lock().await.get_mut(user_id) {
            slot.sender = Some(tx);
        }
        Ok(rx)
    }

    async fn reload<F, Fut, E>(&self, user_id: &str, load: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.has_subscribers(user_id).await {
            return Ok(false);
        }
        let snapshot = Arc::new(load().await?);
        let slots = self.slots.lock().await;
        Ok(slots
            .get(user_id)
            .and_then(Slot::live)
            .is_some_and(|tx| tx.send(snapshot).is_ok()))
    }

    /// Forgets the user's slot once nobody listens and no other task holds
    /// its gate.
    async fn release(&self, user_id: &str, gate: Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().await;
        drop(gate);
        let idle = slots
            .get(user_id)
            .is_some_and(|slot| slot.live().is_none() && Arc::strong_count(&slot.gate) == 1);
        if idle {
            slots.remove(user_id);
            tracing::trace!(user_id, "feed pruned, no subscribers left");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tokio::sync::oneshot;

    fn ready<T>(value: T) -> impl FnOnce() -> std::future::Ready<Result<T, Infallible>> {
        move || std::future::ready(Ok(value))
    }

    #[tokio::test]
    async fn subscriber_sees_initial_then_updates() {
        let hub: FeedHub<Vec<u32>> = FeedHub::default();
        let mut rx = hub.subscribe("u1", ready(vec![1])).await.unwrap();
        assert_eq!(**rx.borrow_and_update(), vec![1]);

        assert!(hub.refresh("u1", ready(vec![1, 2])).await.unwrap());
        rx.changed().await.unwrap();
        assert_eq!(**rx.borrow_and_update(), vec![1, 2]);
    }

    #[tokio::test]
    async fn joining_a_live_feed_keeps_its_snapshot() {
        let hub: FeedHub<u8> = FeedHub::default();
        let mut first = hub.subscribe("u", ready(5)).await.unwrap();

        let second = hub
            .subscribe("u", || async { Err::<u8, &str>("live feed must not reload") })
            .await
            .unwrap();
        assert_eq!(**second.borrow(), 5);
        assert!(!first.has_changed().unwrap());
        assert_eq!(**first.borrow_and_update(), 5);
    }

    #[tokio::test]
    async fn refresh_only_reaches_the_owning_user() {
        let hub: FeedHub<&'static str> = FeedHub::default();
        let a = hub.subscribe("a", ready("a0")).await.unwrap();
        let b = hub.subscribe("b", ready("b0")).await.unwrap();

        hub.refresh("a", ready("a1")).await.unwrap();
        assert!(a.has_changed().unwrap());
        assert!(!b.has_changed().unwrap());
        assert_eq!(**b.borrow(), "b0");
    }

    #[tokio::test]
    async fn nobody_listening_skips_the_load_and_prunes() {
        let hub: FeedHub<u8> = FeedHub::default();
        let rx = hub.subscribe("u", ready(0)).await.unwrap();
        assert!(hub.has_subscribers("u").await);

        drop(rx);
        let sent = hub
            .refresh("u", || async { Err::<u8, &str>("no one to load for") })
            .await
            .unwrap();
        assert!(!sent);
        assert_eq!(hub.active_feeds().await, 0);
        assert!(hub.slots.lock().await.is_empty());

        let rx = hub.subscribe("u", ready(7)).await.unwrap();
        assert_eq!(**rx.borrow(), 7);
    }

    #[tokio::test]
    async fn a_slow_earlier_load_cannot_overwrite_a_later_one() {
        let hub: Arc<FeedHub<u32>> = Arc::new(FeedHub::default());
        let mut rx = hub.subscribe("u", ready(0)).await.unwrap();

        let (resume, paused) = oneshot::channel::<()>();
        let slow = tokio::spawn({
            let hub = Arc::clone(&hub);
            async move {
                hub.refresh("u", || async move {
                    let _ = paused.await;
                    Ok::<_, Infallible>(1)
                })
                .await
            }
        });
        tokio::task::yield_now().await;

        let fast = tokio::spawn({
            let hub = Arc::clone(&hub);
            async move { hub.refresh("u", ready(2)).await }
        });
        tokio::task::yield_now().await;

        resume.send(()).unwrap();
        assert!(slow.await.unwrap().unwrap());
        assert!(fast.await.unwrap().unwrap());
        assert_eq!(**rx.borrow_and_update(), 2);
    }
}
