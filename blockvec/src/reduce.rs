//! Sum reduction of per-worker partials.

use crate::WorkerGroup;

const PARTIAL_TAG: u32 = 17;

/// Combine every worker's `local` partial into a single sum delivered to
/// `dest`; every other rank gets `None`.
///
/// The destination accumulates in ascending rank order, so for a fixed
/// group size the result is deterministic run to run. Across different
/// group sizes the grouping of the summands differs, which is why the
/// distributed dot product is only tolerance-equal between topologies.
pub async fn sum<G: WorkerGroup>(group: &G, local: f64, dest: u32) -> Option<f64> {
    if group.rank() == dest {
        let mut total = 0.0;
        for src in 0..group.size() {
            total += if src == group.rank() {
                local
            } else {
                group.recv::<f64>(src, PARTIAL_TAG).await
            };
        }
        Some(total)
    } else {
        group.send(&local, dest, PARTIAL_TAG).await;
        None
    }
}
