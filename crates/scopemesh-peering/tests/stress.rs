//! Stress tests for scopemesh-peering
//!
//! These tests verify that the peer network stays consistent under
//! concurrent connects and lookups from many threads.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use scopemesh_core::{Peer, ScopeId};
use scopemesh_peering::PeerNetwork;

const THREADS: usize = 8;
const PEERS_PER_THREAD: usize = 250;

fn scope_for(i: usize) -> String {
    format!("scope-{}", i % 10)
}

#[test]
fn test_concurrent_connects() {
    let network = Arc::new(PeerNetwork::new());
    let start = Instant::now();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let network = Arc::clone(&network);
            thread::spawn(move || {
                for i in 0..PEERS_PER_THREAD {
                    let n = t * PEERS_PER_THREAD + i;
                    let peer = Peer::new(format!("peer-{n}"), format!("10.0.{t}.{i}:7000"))
                        .with_scopes([scope_for(n)]);
                    network.connect(peer).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    println!(
        "Connected {} peers in {:?}",
        THREADS * PEERS_PER_THREAD,
        start.elapsed()
    );

    assert_eq!(network.peer_count(), THREADS * PEERS_PER_THREAD);

    let total: usize = (0..10)
        .map(|s| network.discover(&ScopeId::new(format!("scope-{s}"))).len())
        .sum();
    assert_eq!(total, THREADS * PEERS_PER_THREAD);
}

#[test]
fn test_concurrent_reconnects_do_not_duplicate_peers() {
    let network = Arc::new(PeerNetwork::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let network = Arc::clone(&network);
            thread::spawn(move || {
                for i in 0..50 {
                    let peer = Peer::new(format!("peer-{i}"), "shared").with_scopes(["org-1"]);
                    network.connect(peer).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let org = ScopeId::from("org-1");
    assert_eq!(network.peer_count(), 50);
    assert_eq!(network.index_entry_len(&org), THREADS * 50);
    assert_eq!(network.discover(&org).len(), 50);

    assert_eq!(network.compact_index(), (THREADS - 1) * 50);
    assert_eq!(network.discover(&org).len(), 50);
}

#[test]
fn test_readers_during_writes() {
    let network = Arc::new(PeerNetwork::new());
    let org = ScopeId::from("org-1");

    let writer = {
        let network = Arc::clone(&network);
        thread::spawn(move || {
            for i in 0..1_000 {
                network
                    .connect(Peer::new(format!("peer-{i}"), "a").with_scopes(["org-1"]))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let network = Arc::clone(&network);
            let org = org.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..500 {
                    let seen = network.discover(&org).len();
                    // Connects are never undone, so a reader can only see growth
                    assert!(seen >= last);
                    last = seen;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(network.discover(&org).len(), 1_000);
}
