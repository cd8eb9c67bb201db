//! Distributed block-vector arithmetic over a fixed group of workers.
//!
//! A global vector of order `n` is split into equal contiguous blocks,
//! one per rank; scalar parameters are broadcast from rank 0 and partial
//! results are reduced back to it. All cross-rank traffic flows through
//! the [`WorkerGroup`] collectives, and every detected error aborts the
//! whole group through the collective health check in [`gate`].

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Anything that can cross a rank boundary.
pub trait Payload: Serialize + DeserializeOwned + Default + Clone + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Default + Clone + 'static {}

/// A single worker's view of the communication group.
///
/// Collective operations (`bcast`, `scatter`, `gather` and their receive
/// counterparts) must be entered by every rank in the same relative order;
/// each call blocks its caller until the collective as a whole completes.
pub trait WorkerGroup {
    /// Rank of this worker within the group.
    fn rank(&self) -> u32;
    /// Number of workers in the group.
    fn size(&self) -> u32;
    /// Send `data` to `dest`, labeled with `tag`.
    fn send<T: Payload>(&self, data: &T, dest: u32, tag: u32)
        -> Pin<Box<dyn Future<Output = ()>>>;
    /// Receive a value labeled `tag` from `source`.
    fn recv<T: Payload>(&self, source: u32, tag: u32) -> Pin<Box<dyn Future<Output = T>>>;
    /// Broadcast `data` from this worker to every other worker.
    fn bcast<T: Payload>(&self, data: &T) -> Pin<Box<dyn Future<Output = ()>>>;
    /// Receive a broadcast originating at `source`.
    fn recv_bcast<T: Payload>(&self, source: u32) -> Pin<Box<dyn Future<Output = T>>>;
    /// Split `data` into equal contiguous shares, deliver share `i` to
    /// rank `i`, and return this worker's own share.
    ///
    /// `data.len()` must divide evenly by the group size.
    fn scatter<T: Payload>(&self, data: &[T]) -> Pin<Box<dyn Future<Output = Vec<T>>>>;
    /// Receive this worker's share of a scatter rooted at `root`.
    fn scatter_recv<T: Payload>(&self, root: u32) -> Pin<Box<dyn Future<Output = Vec<T>>>>;
    /// Collect every worker's share, this one's included, in rank order.
    fn gather<T: Payload>(&self, data: &[T]) -> Pin<Box<dyn Future<Output = Vec<T>>>>;
    /// Hand this worker's share to a gather rooted at `root`.
    fn gather_send<T: Payload>(&self, root: u32, data: &[T]) -> Pin<Box<dyn Future<Output = ()>>>;
}

pub mod channel;
pub mod distribute;
pub mod error;
pub mod gate;
pub mod ops;
pub mod params;
pub mod partition;
pub mod pipeline;
pub mod reduce;

pub use channel::{run_group, ChannelGroup};
pub use error::Abort;
