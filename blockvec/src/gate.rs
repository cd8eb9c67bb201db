//! Collective error gate.
//!
//! Every worker votes with its local health; the verdict is the logical
//! AND of all votes and is observed by everyone. A failed verdict becomes
//! the same [`Abort`] on every rank, so no worker proceeds alone and no
//! worker is left waiting on a collective its peers will never enter.

use crate::error::Abort;
use crate::WorkerGroup;
use tracing::debug;

/// Group-wide health check; doubles as a barrier.
///
/// Every rank must call this with the same `context` and `message`.
/// Returns `Ok(())` everywhere when all ranks are healthy, `Err` with the
/// same [`Abort`] everywhere otherwise.
pub async fn check<G: WorkerGroup>(
    group: &G,
    local_ok: bool,
    context: &'static str,
    message: &str,
) -> Result<(), Abort> {
    let verdict = if group.rank() == 0 {
        let votes: Vec<bool> = group.gather(&[local_ok]).await;
        let verdict = votes.iter().all(|ok| *ok);
        group.bcast(&verdict).await;
        verdict
    } else {
        group.gather_send(0, &[local_ok]).await;
        group.recv_bcast(0).await
    };

    if verdict {
        Ok(())
    } else {
        debug!(context, message, "group voted to abort");
        Err(Abort::new(context, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::run_group;
    use futures::executor;

    #[test]
    fn healthy_group_passes_everywhere() {
        let results = run_group(4, |group| {
            executor::block_on(check(&group, true, "read_order", "nothing wrong"))
        });
        assert!(results.iter().all(|result| result.is_ok()));
    }

    #[test]
    fn single_unhealthy_rank_fails_everywhere() {
        let results = run_group(4, |group| {
            let healthy = group.rank() != 2;
            executor::block_on(check(
                &group,
                healthy,
                "allocate_blocks",
                "can't allocate local vector(s)",
            ))
        });
        for result in results {
            let abort = result.expect_err("the whole group aborts");
            assert_eq!(abort.context, "allocate_blocks");
            assert_eq!(
                abort.to_string(),
                "In allocate_blocks, can't allocate local vector(s)"
            );
        }
    }

    #[test]
    fn single_worker_gate_is_local() {
        let results = run_group(1, |group| {
            executor::block_on(check(&group, false, "read_order", "bad order"))
        });
        assert!(results[0].is_err());
    }
}
