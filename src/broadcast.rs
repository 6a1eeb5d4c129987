//! Fan-out of one message to every other connection

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::message::Message;
use crate::registry::Registry;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Destinations the message was queued for
    pub delivered: usize,
    /// Destinations whose connection had already stopped
    pub skipped: usize,
}

/// Send `msg` to every registered connection except `sender`
///
/// Each destination is handled on its own: the message is queued without
/// waiting, so a slow reader never holds up the sender or anyone else. A
/// destination whose writer has stopped is logged and skipped. It stays
/// registered; its own session removes it.
pub async fn broadcast(registry: &Registry, sender: &Connection, msg: &Message) -> Delivery {
    let mut delivery = Delivery::default();

    for conn in registry.snapshot().await {
        if conn == *sender || !conn.is_open() {
            continue;
        }

        match conn.send(msg.clone()) {
            Ok(()) => {
                debug!("Sent {} bytes to {}", msg.len(), conn.id());
                delivery.delivered += 1;
            }
            Err(e) => {
                warn!("Error broadcasting to {} ({}): {}", conn.id(), conn.peer(), e);
                delivery.skipped += 1;
            }
        }
    }

    delivery
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};
    use tokio::time::{timeout, Duration};

    use crate::connection::WriteHandle;

    fn open(peer: &str) -> (Connection, WriteHandle, DuplexStream) {
        let (io, remote) = duplex(4096);
        let (conn, handle) = Connection::open(peer, io);
        (conn, handle, remote)
    }

    async fn read_n(remote: &mut DuplexStream, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        remote.read_exact(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_sender_is_excluded() {
        let registry = Registry::spawn(16);
        let (a, _ha, mut a_remote) = open("a");
        let (b, _hb, mut b_remote) = open("b");
        let (c, _hc, mut c_remote) = open("c");
        for conn in [&a, &b, &c] {
            registry.add(conn.clone()).await;
        }

        let delivery = broadcast(&registry, &a, &Message::from("hello")).await;
        assert_eq!(delivery, Delivery { delivered: 2, skipped: 0 });

        assert_eq!(read_n(&mut b_remote, 5).await, b"hello");
        assert_eq!(read_n(&mut c_remote, 5).await, b"hello");

        let mut buf = [0u8; 1];
        let nothing = timeout(Duration::from_millis(100), a_remote.read(&mut buf)).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_failed_destination_does_not_block_others() {
        let registry = Registry::spawn(16);
        let (sender, _hs, _sender_remote) = open("sender");
        let (dead, dead_handle, _dead_remote) = open("dead");
        let (live, _hl, mut live_remote) = open("live");
        for conn in [&sender, &dead, &live] {
            registry.add(conn.clone()).await;
        }

        // Closed but still registered: its session has not removed it yet.
        dead_handle.close().await;

        let delivery = broadcast(&registry, &sender, &Message::from("still here")).await;
        assert_eq!(delivery.delivered, 1);

        assert_eq!(read_n(&mut live_remote, 10).await, b"still here");
        assert_eq!(registry.len().await, 3);
    }

    #[tokio::test]
    async fn test_slow_destination_gets_everything_later() {
        let registry = Registry::spawn(16);
        let (sender, _hs, _sender_remote) = open("sender");
        // Its pipe holds a single byte and nobody reads it until the end.
        let (slow_io, mut slow_remote) = duplex(1);
        let (slow, _hslow) = Connection::open("slow", slow_io);
        let (fast, _hf, mut fast_remote) = open("fast");
        for conn in [&sender, &slow, &fast] {
            registry.add(conn.clone()).await;
        }

        for i in 0..64u8 {
            let msg = Message::from(vec![i]);
            let delivery = broadcast(&registry, &sender, &msg).await;
            assert_eq!(delivery, Delivery { delivered: 2, skipped: 0 });
        }

        let expected: Vec<u8> = (0..64u8).collect();
        assert_eq!(read_n(&mut fast_remote, 64).await, expected);
        assert_eq!(read_n(&mut slow_remote, 64).await, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_broadcasts_do_not_interleave() {
        const LEN: usize = 4096;
        const ROUNDS: usize = 8;

        let registry = Registry::spawn(16);
        let (x, _hx, _x_remote) = open("x");
        let (y, _hy, _y_remote) = open("y");
        // Small pipe so every message takes several partial writes.
        let (dest_io, mut dest_remote) = duplex(256);
        let (dest, _hd) = Connection::open("dest", dest_io);
        for conn in [&x, &y, &dest] {
            registry.add(conn.clone()).await;
        }

        let fan_out = |from: Connection, byte: u8| {
            let registry = registry.clone();
            tokio::spawn(async move {
                for _ in 0..ROUNDS {
                    let msg = Message::from(vec![byte; LEN]);
                    broadcast(&registry, &from, &msg).await;
                }
            })
        };
        let tx = fan_out(x.clone(), b'x');
        let ty = fan_out(y.clone(), b'y');
        tx.await.unwrap();
        ty.await.unwrap();

        let received = read_n(&mut dest_remote, 2 * ROUNDS * LEN).await;
        for chunk in received.chunks(LEN) {
            assert!(chunk.iter().all(|&b| b == chunk[0]));
        }
    }
}
