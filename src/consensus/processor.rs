use tokio::{
    sync::{mpsc::Receiver, watch},
    time::Instant,
};
use tracing::{debug, warn};

use super::replica::{Outbound, Replica, ReplicaStatus};
use crate::network::{Inbound, Transport};

/// Drives one [`Replica`] from its inbox: one inbound item at a time, each
/// handled to completion before the next is read.
pub struct ConsensusProcessor<T: Transport> {
    pub replica: Replica,
    pub msg_rx: Receiver<Inbound>,
    pub transport: T,
    pub status_tx: watch::Sender<ReplicaStatus>,
    /// Epoch for the replica's latency clock.
    pub start: Instant,
}

impl<T: Transport> ConsensusProcessor<T> {
    pub fn new(
        replica: Replica,
        msg_rx: Receiver<Inbound>,
        transport: T,
        start: Instant,
    ) -> (Self, watch::Receiver<ReplicaStatus>) {
        let (status_tx, status_rx) = watch::channel(replica.status());
        let processor = ConsensusProcessor {
            replica,
            msg_rx,
            transport,
            status_tx,
            start,
        };
        (processor, status_rx)
    }

    /// Runs until the inbox closes.
    pub async fn run(&mut self) {
        debug!(replica = self.replica.id(), "running consensus processor");
        while let Some(inbound) = self.msg_rx.recv().await {
            self.process(inbound);
        }
        debug!(replica = self.replica.id(), "inbox closed, stopping");
    }

    pub fn process(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Payload(payload) => {
                let now = self.start.elapsed();
                let outbound = self.replica.handle_payload(&payload, now);
                for out in outbound {
                    self.send(out);
                }
            }
            Inbound::Submit(command) => {
                if let Err(e) = self.replica.submit(command) {
                    warn!(replica = self.replica.id(), error = %e, "refusing command");
                }
            }
        }
        self.status_tx.send_replace(self.replica.status());
    }

    fn send(&self, outbound: Outbound) {
        let from = self.replica.id();
        let result = match outbound {
            Outbound::Broadcast(payload) => self.transport.broadcast(from, payload),
            Outbound::Unicast(to, payload) => self.transport.unicast(from, to, payload),
        };
        if let Err(e) = result {
            warn!(replica = from, error = %e, "send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        common::{crypto::PlaceholderSigner, hash::GENESIS_HASH},
        config::RunConfig,
        consensus::{
            codec::{encode_message, frame},
            executor::CommandLog,
            message::Message,
            peers::ReplicaId,
            qc::QuorumCertificate,
        },
        network::NetworkError,
    };

    #[derive(Clone, Default)]
    struct CapturingTransport {
        sent: Arc<Mutex<Vec<(Option<ReplicaId>, Vec<u8>)>>>,
    }

    impl Transport for CapturingTransport {
        fn broadcast(&self, _from: ReplicaId, payload: Vec<u8>) -> Result<(), NetworkError> {
            self.sent.lock().unwrap().push((None, payload));
            Ok(())
        }

        fn unicast(&self, _from: ReplicaId, to: ReplicaId, payload: Vec<u8>) -> Result<(), NetworkError> {
            self.sent.lock().unwrap().push((Some(to), payload));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_processor_proposes_and_publishes_status() {
        let config = RunConfig::new(4);
        let replica = Replica::new(
            config.for_replica(0).unwrap(),
            Box::new(PlaceholderSigner::new(0)),
            Box::new(CommandLog::new(0)),
        );
        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let transport = CapturingTransport::default();
        let (mut processor, mut status_rx) =
            ConsensusProcessor::new(replica, rx, transport.clone(), Instant::now());

        tokio::spawn(async move {
            processor.run().await;
        });

        tx.send(Inbound::Submit("put k v".to_string())).await.unwrap();
        let qc = QuorumCertificate::new(1, 0, GENESIS_HASH.to_string());
        let new_view = frame(encode_message(&Message::NewView(qc)), config.tx_size);
        tx.send(Inbound::Payload(new_view)).await.unwrap();

        status_rx
            .wait_for(|status| status.last_proposal.is_some())
            .await
            .unwrap();
        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, None);
        assert_eq!(sent[0].1[0], b'1');
        assert_eq!(status_rx.borrow().metrics.messages_received, 1);
    }
}
