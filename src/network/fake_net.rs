// src/network/fake_net.rs
//! In-process broadcast network
//!
//! Participants register an inbox under their address. Broadcasts reach every
//! registered inbox (the sender included) in a random order per call, so no
//! participant can rely on a global delivery order. Delivery itself is
//! reliable for every participant that is still running.

use crate::network::message::{Message, NetEvent};
use crate::types::Address;
use arc_swap::ArcSwap;
use crossbeam_channel::Sender;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// A registered participant inbox
#[derive(Debug, Clone)]
struct Peer {
    address: Address,
    inbox: Sender<Message>,
}

/// Simulated network shared by all participants
#[derive(Debug)]
pub struct FakeNet {
    /// Copy-on-write peer list; broadcasts read a snapshot without locking
    peers: ArcSwap<Vec<Peer>>,
}

impl Default for FakeNet {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeNet {
    /// Creates an empty network
    pub fn new() -> Self {
        FakeNet {
            peers: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Registers a participant inbox, replacing any earlier one for the address
    pub fn register(&self, address: Address, inbox: Sender<Message>) {
        let peer = Peer { address, inbox };
        self.peers.rcu(|peers| {
            let mut next: Vec<Peer> = peers
                .iter()
                .filter(|p| p.address != peer.address)
                .cloned()
                .collect();
            next.push(peer.clone());
            next
        });
    }

    /// Number of registered participants
    pub fn peer_count(&self) -> usize {
        self.peers.load().len()
    }

    /// Delivers `event` to every registered participant
    ///
    /// # Returns
    /// Number of inboxes the event reached
    pub fn broadcast(&self, event: NetEvent) -> usize {
        let peers = self.peers.load();
        let mut order: Vec<&Peer> = peers.iter().collect();
        order.shuffle(&mut rand::thread_rng());

        let mut delivered = 0;
        for peer in order {
            match peer.inbox.send(Message::Event(event.clone())) {
                Ok(()) => delivered += 1,
                Err(_) => log::warn!("Peer {} has stopped; dropping event", peer.address),
            }
        }
        delivered
    }

    /// Delivers `event` to one participant
    ///
    /// # Returns
    /// `true` if the participant is registered and still running
    pub fn send_to(&self, address: &str, event: NetEvent) -> bool {
        let peers = self.peers.load();
        match peers.iter().find(|p| p.address == address) {
            Some(peer) => peer.inbox.send(Message::Event(event)).is_ok(),
            None => {
                log::warn!("No peer registered as {}", address);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Block;
    use crossbeam_channel::unbounded;

    #[test]
    fn broadcast_reaches_every_peer() {
        let net = FakeNet::new();
        let (a_tx, a_rx) = unbounded();
        let (b_tx, b_rx) = unbounded();
        net.register("a".into(), a_tx);
        net.register("b".into(), b_tx);

        let delivered = net.broadcast(NetEvent::ProofFound(Arc::new(Block::genesis())));
        assert_eq!(delivered, 2);
        assert!(matches!(
            a_rx.try_recv(),
            Ok(Message::Event(NetEvent::ProofFound(_)))
        ));
        assert!(matches!(
            b_rx.try_recv(),
            Ok(Message::Event(NetEvent::ProofFound(_)))
        ));
    }

    #[test]
    fn send_to_targets_one_peer() {
        let net = FakeNet::new();
        let (a_tx, a_rx) = unbounded();
        let (b_tx, b_rx) = unbounded();
        net.register("a".into(), a_tx);
        net.register("b".into(), b_tx);

        let event = NetEvent::MissingBlock {
            requester: "a".into(),
            hash: "h".into(),
        };
        assert!(net.send_to("b", event.clone()));
        assert!(!net.send_to("nobody", event));
        assert!(a_rx.try_recv().is_err());
        assert!(b_rx.try_recv().is_ok());
    }

    #[test]
    fn stopped_peers_do_not_block_delivery() {
        let net = FakeNet::new();
        let (a_tx, a_rx) = unbounded();
        let (b_tx, b_rx) = unbounded();
        net.register("a".into(), a_tx);
        net.register("b".into(), b_tx);
        drop(b_rx);

        let delivered = net.broadcast(NetEvent::ProofFound(Arc::new(Block::genesis())));
        assert_eq!(delivered, 1);
        assert!(a_rx.try_recv().is_ok());
    }

    #[test]
    fn re_registering_replaces_the_inbox() {
        let net = FakeNet::new();
        let (old_tx, _old_rx) = unbounded();
        let (new_tx, _new_rx) = unbounded();
        net.register("a".into(), old_tx);
        net.register("a".into(), new_tx);
        assert_eq!(net.peer_count(), 1);
    }
}
