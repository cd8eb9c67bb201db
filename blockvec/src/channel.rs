//! Channel-backed implementation of WorkerGroup.
//!
//! Every rank is an OS thread holding one endpoint of a fully connected
//! group; traffic moves as bincode-encoded envelopes over mpsc channels.
//! Envelopes that arrive ahead of a matching `recv` wait in a stash, so
//! point-to-point matching works even when senders race each other.

use crate::{Payload, WorkerGroup};
use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::trace;

// Tags reserved for the fabric's own collectives; user tags stay clear of
// the top of the range.
const BCAST_TAG: u32 = u32::MAX;
const SCATTER_TAG: u32 = u32::MAX - 1;
const GATHER_TAG: u32 = u32::MAX - 2;

/// One message in flight between two ranks.
struct Envelope {
    src: u32,
    tag: u32,
    bytes: Vec<u8>,
}

/// Receive side of an endpoint.
struct Inbox {
    rx: Receiver<Envelope>,
    stash: Vec<Envelope>,
}

/// A single rank's endpoint in an in-process worker group.
pub struct ChannelGroup {
    rank: u32,
    links: Arc<Vec<Sender<Envelope>>>,
    inbox: Arc<Mutex<Inbox>>,
}

impl ChannelGroup {
    /// Wire up a fully connected group of `size` endpoints, one per rank,
    /// returned in rank order.
    pub fn create(size: u32) -> Vec<ChannelGroup> {
        let (links, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::channel()).unzip();
        let links = Arc::new(links);
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, rx)| ChannelGroup {
                rank: rank as u32,
                links: Arc::clone(&links),
                inbox: Arc::new(Mutex::new(Inbox {
                    rx,
                    stash: Vec::new(),
                })),
            })
            .collect()
    }
}

/// Spawn one thread per rank, run `f` on every endpoint, and hand back
/// the results in rank order.
pub fn run_group<T, F>(size: u32, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(ChannelGroup) -> T + Sync,
{
    let endpoints = ChannelGroup::create(size);
    thread::scope(|scope| {
        let f = &f;
        let workers: Vec<_> = endpoints
            .into_iter()
            .map(|endpoint| scope.spawn(move || f(endpoint)))
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().expect("worker thread panicked"))
            .collect()
    })
}

fn deliver(links: &[Sender<Envelope>], src: u32, dest: u32, tag: u32, bytes: Vec<u8>) {
    trace!(src, dest, tag, len = bytes.len(), "deliver");
    links[dest as usize]
        .send(Envelope { src, tag, bytes })
        .expect("peer endpoint dropped mid-protocol");
}

fn collect(inbox: &Mutex<Inbox>, src: u32, tag: u32) -> Vec<u8> {
    trace!(src, tag, "collect");
    let mut inbox = inbox.lock().expect("inbox poisoned");
    if let Some(at) = inbox
        .stash
        .iter()
        .position(|envelope| envelope.src == src && envelope.tag == tag)
    {
        return inbox.stash.remove(at).bytes;
    }
    loop {
        let envelope = inbox.rx.recv().expect("peer endpoint dropped mid-protocol");
        if envelope.src == src && envelope.tag == tag {
            return envelope.bytes;
        }
        inbox.stash.push(envelope);
    }
}

impl WorkerGroup for ChannelGroup {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.links.len() as u32
    }

    fn send<T: Payload>(
        &self,
        data: &T,
        dest: u32,
        tag: u32,
    ) -> Pin<Box<dyn Future<Output = ()>>> {
        let bytes = bincode::serialize(data).expect("payload should serialize");
        let rank = self.rank;
        let links = Arc::clone(&self.links);
        Box::into_pin(Box::new(async move {
            deliver(&links, rank, dest, tag, bytes);
        }))
    }

    fn recv<T: Payload>(&self, source: u32, tag: u32) -> Pin<Box<dyn Future<Output = T>>> {
        let inbox = Arc::clone(&self.inbox);
        Box::into_pin(Box::new(async move {
            let bytes = collect(&inbox, source, tag);
            bincode::deserialize(&bytes).expect("payload should deserialize")
        }))
    }

    /// Broadcast `data` from this worker to every other worker.
    ///
    /// `bcast` and `recv_bcast` implement a binary-tree relay rooted at
    /// rank 0; a nonzero source injects its data at the root first.
    fn bcast<T: Payload>(&self, data: &T) -> Pin<Box<dyn Future<Output = ()>>> {
        let bytes = bincode::serialize(data).expect("payload should serialize");
        let rank = self.rank;
        let size = self.size();
        let links = Arc::clone(&self.links);

        // Positional children in the relay tree.
        let a = 2 * rank + 1;
        let b = 2 * rank + 2;

        Box::into_pin(Box::new(async move {
            if rank != 0 {
                deliver(&links, rank, 0, BCAST_TAG, bytes.clone());
            }
            if a < size {
                deliver(&links, rank, a, BCAST_TAG, bytes.clone());
            }
            if b < size {
                deliver(&links, rank, b, BCAST_TAG, bytes);
            }
        }))
    }

    /// Receive a broadcast on all ranks other than the source.
    fn recv_bcast<T: Payload>(&self, source: u32) -> Pin<Box<dyn Future<Output = T>>> {
        let rank = self.rank;
        let size = self.size();
        let links = Arc::clone(&self.links);
        let inbox = Arc::clone(&self.inbox);

        let a = 2 * rank + 1;
        let b = 2 * rank + 2;
        let parent = if rank == 0 {
            // The root hears from the source directly.
            source
        } else if rank % 2 == 0 {
            (rank - 2) / 2
        } else {
            (rank - 1) / 2
        };

        Box::into_pin(Box::new(async move {
            let bytes = collect(&inbox, parent, BCAST_TAG);

            // Relay down the tree, skipping the source: it already holds
            // the data and will never post a matching recv, and a stray
            // envelope would poison later matching against its stash.
            if a < size && a != source {
                deliver(&links, rank, a, BCAST_TAG, bytes.clone());
            }
            if b < size && b != source {
                deliver(&links, rank, b, BCAST_TAG, bytes.clone());
            }

            bincode::deserialize(&bytes).expect("payload should deserialize")
        }))
    }

    /// Scatter `data` from this worker to all workers, itself included.
    fn scatter<T: Payload>(&self, data: &[T]) -> Pin<Box<dyn Future<Output = Vec<T>>>> {
        let rank = self.rank;
        let size = self.size() as usize;
        let links = Arc::clone(&self.links);

        assert_eq!(data.len() % size, 0, "scatter length must divide evenly");
        let share = data.len() / size;

        let data: Vec<T> = data.to_vec();
        Box::into_pin(Box::new(async move {
            for dest in 0..size as u32 {
                if dest == rank {
                    continue;
                }
                let at = dest as usize * share;
                let bytes = bincode::serialize(&data[at..at + share])
                    .expect("payload should serialize");
                deliver(&links, rank, dest, SCATTER_TAG, bytes);
            }
            let rank = rank as usize;
            data[rank * share..(rank + 1) * share].to_vec()
        }))
    }

    fn scatter_recv<T: Payload>(&self, root: u32) -> Pin<Box<dyn Future<Output = Vec<T>>>> {
        let inbox = Arc::clone(&self.inbox);
        Box::into_pin(Box::new(async move {
            let bytes = collect(&inbox, root, SCATTER_TAG);
            bincode::deserialize(&bytes).expect("payload should deserialize")
        }))
    }

    /// Gather a share from every worker, this one's included, in rank
    /// order.
    fn gather<T: Payload>(&self, data: &[T]) -> Pin<Box<dyn Future<Output = Vec<T>>>> {
        let rank = self.rank;
        let size = self.size();
        let inbox = Arc::clone(&self.inbox);

        let mut own = Some(data.to_vec());
        Box::into_pin(Box::new(async move {
            let mut all = Vec::new();
            for src in 0..size {
                if src == rank {
                    if let Some(own) = own.take() {
                        all.extend(own);
                    }
                } else {
                    let bytes = collect(&inbox, src, GATHER_TAG);
                    let part: Vec<T> =
                        bincode::deserialize(&bytes).expect("payload should deserialize");
                    all.extend(part);
                }
            }
            all
        }))
    }

    fn gather_send<T: Payload>(&self, root: u32, data: &[T]) -> Pin<Box<dyn Future<Output = ()>>> {
        let bytes = bincode::serialize(data).expect("payload should serialize");
        let rank = self.rank;
        let links = Arc::clone(&self.links);
        Box::into_pin(Box::new(async move {
            deliver(&links, rank, root, GATHER_TAG, bytes);
        }))
    }
}
