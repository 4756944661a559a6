use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::mpsc::{self, Sender, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::trace;

use super::{Inbound, NetworkError, Transport};
use crate::consensus::peers::ReplicaId;

type Link = UnboundedSender<(Instant, Vec<u8>)>;

/// In-process transport. Every ordered pair of replicas gets its own link
/// task that holds each payload until `delay` has passed since it was sent,
/// so per-link order is send order.
#[derive(Clone)]
pub struct SimulatedNetwork {
    delay: Duration,
    n_replicas: usize,
    links: Arc<HashMap<(ReplicaId, ReplicaId), Link>>,
    tasks: Arc<Vec<JoinHandle<()>>>,
}

impl SimulatedNetwork {
    /// Wire up links into `inboxes`, indexed by replica id. Must be called
    /// from within a tokio runtime.
    pub fn new(inboxes: &[Sender<Inbound>], delay: Duration) -> Self {
        let n_replicas = inboxes.len();
        let mut links = HashMap::new();
        let mut tasks = Vec::new();

        for from in 0..n_replicas {
            for (to, inbox) in inboxes.iter().enumerate() {
                let (tx, rx) = mpsc::unbounded_channel();
                tasks.push(tokio::spawn(run_link(from, to, rx, inbox.clone())));
                links.insert((from, to), tx);
            }
        }

        SimulatedNetwork {
            delay,
            n_replicas,
            links: Arc::new(links),
            tasks: Arc::new(tasks),
        }
    }

    /// Stop every link task. Payloads still in flight are dropped.
    pub fn shutdown(&self) {
        for task in self.tasks.iter() {
            task.abort();
        }
    }

    fn send(&self, from: ReplicaId, to: ReplicaId, payload: Vec<u8>) -> Result<(), NetworkError> {
        for id in [from, to] {
            if id >= self.n_replicas {
                return Err(NetworkError::UnknownPeer(id));
            }
        }
        let link = self
            .links
            .get(&(from, to))
            .ok_or(NetworkError::UnknownPeer(to))?;
        link.send((Instant::now() + self.delay, payload))
            .map_err(|_| NetworkError::LinkClosed { from, to })
    }
}

impl Transport for SimulatedNetwork {
    fn broadcast(&self, from: ReplicaId, payload: Vec<u8>) -> Result<(), NetworkError> {
        let mut result = Ok(());
        for to in (0..self.n_replicas).filter(|&to| to != from) {
            if let Err(e) = self.send(from, to, payload.clone()) {
                result = result.and(Err(e));
            }
        }
        result
    }

    fn unicast(&self, from: ReplicaId, to: ReplicaId, payload: Vec<u8>) -> Result<(), NetworkError> {
        self.send(from, to, payload)
    }
}

async fn run_link(
    from: ReplicaId,
    to: ReplicaId,
    mut rx: UnboundedReceiver<(Instant, Vec<u8>)>,
    inbox: Sender<Inbound>,
) {
    while let Some((deliver_at, payload)) = rx.recv().await {
        sleep_until(deliver_at).await;
        trace!(from, to, len = payload.len(), "delivering");
        if inbox.send(Inbound::Payload(payload)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::Receiver;

    fn inboxes(n: usize) -> (Vec<Sender<Inbound>>, Vec<Receiver<Inbound>>) {
        (0..n).map(|_| mpsc::channel(100)).unzip()
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_after_delay() {
        let (txs, mut rxs) = inboxes(2);
        let delay = Duration::from_millis(100);
        let network = SimulatedNetwork::new(&txs, delay);

        let sent_at = Instant::now();
        network.unicast(0, 1, b"hello".to_vec()).unwrap();

        let received = rxs[1].recv().await.unwrap();
        assert_eq!(received, Inbound::Payload(b"hello".to_vec()));
        assert!(sent_at.elapsed() >= delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_preserves_order() {
        let (txs, mut rxs) = inboxes(2);
        let network = SimulatedNetwork::new(&txs, Duration::from_millis(5));

        for i in 0..10u8 {
            network.unicast(1, 0, vec![i]).unwrap();
        }
        for i in 0..10u8 {
            assert_eq!(rxs[0].recv().await.unwrap(), Inbound::Payload(vec![i]));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_skips_sender() {
        let (txs, mut rxs) = inboxes(3);
        let network = SimulatedNetwork::new(&txs, Duration::from_millis(5));

        network.broadcast(1, b"x".to_vec()).unwrap();
        assert_eq!(rxs[0].recv().await.unwrap(), Inbound::Payload(b"x".to_vec()));
        assert_eq!(rxs[2].recv().await.unwrap(), Inbound::Payload(b"x".to_vec()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rxs[1].try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_peer() {
        let (txs, _rxs) = inboxes(2);
        let network = SimulatedNetwork::new(&txs, Duration::from_millis(5));

        assert_eq!(
            network.unicast(0, 7, Vec::new()),
            Err(NetworkError::UnknownPeer(7))
        );
        assert_eq!(
            network.broadcast(9, Vec::new()),
            Err(NetworkError::UnknownPeer(9))
        );
    }
}
