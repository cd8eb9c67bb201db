//! Distribution of the global vector: scatter on generation, gather for
//! the windowed summary.

use crate::error::Abort;
use crate::{gate, WorkerGroup};
use rand::Rng;
use std::fmt::Write as _;
use tracing::debug;

/// How many leading and trailing elements the summary shows.
const WINDOW: usize = 10;

/// Generate the global vector at `origin` and scatter it into equal
/// contiguous blocks, one per rank, in rank order.
///
/// The origin draws `n` uniform integers in `[0, rand_max)` and casts
/// them to `f64`. Its temporary global buffer is reservation-checked
/// through the gate before generation and dropped right after the
/// scatter; each worker's share lands in `block`.
pub async fn scatter_generate<G, R>(
    group: &G,
    block: &mut [f64],
    n: usize,
    rand_max: i64,
    origin: u32,
    rng: &mut R,
) -> Result<(), Abort>
where
    G: WorkerGroup,
    R: Rng,
{
    let share = if group.rank() == origin {
        let mut global: Vec<f64> = Vec::new();
        let ok = global.try_reserve_exact(n).is_ok();
        gate::check(group, ok, "scatter_generate", "can't allocate temporary vector").await?;
        global.extend((0..n).map(|_| rng.gen_range(0..rand_max) as f64));
        debug!(n, rand_max, "global vector generated");
        group.scatter(&global).await
    } else {
        gate::check(group, true, "scatter_generate", "can't allocate temporary vector").await?;
        group.scatter_recv(origin).await
    };
    block.copy_from_slice(&share);
    Ok(())
}

/// Gather all blocks back to `origin` in rank order and format the
/// windowed summary of the reassembled vector: the title line, then the
/// leading and trailing window lines. Returns `Some(text)` at the origin
/// and `None` everywhere else.
///
/// Windows clamp to the vector, so orders below the window size (an empty
/// vector included) print what exists instead of reading out of bounds.
pub async fn gather_summary<G: WorkerGroup>(
    group: &G,
    block: &[f64],
    n: usize,
    title: &str,
    origin: u32,
) -> Result<Option<String>, Abort> {
    if group.rank() == origin {
        // Reservation probe only; the gather allocates its own buffer.
        let ok = Vec::<f64>::new().try_reserve_exact(n).is_ok();
        gate::check(group, ok, "gather_summary", "can't allocate temporary vector").await?;
        let global = group.gather(block).await;
        Ok(Some(format_summary(title, &global)))
    } else {
        gate::check(group, true, "gather_summary", "can't allocate temporary vector").await?;
        group.gather_send(origin, block).await;
        Ok(None)
    }
}

/// The summary text: title, leading window, trailing window, six decimal
/// places per element.
pub fn format_summary(title: &str, values: &[f64]) -> String {
    let n = values.len();
    let head = n.min(WINDOW);
    let tail = n.saturating_sub(WINDOW);
    format!(
        "{}\n{}\n{}",
        title,
        window_line(0, &values[..head]),
        window_line(tail, &values[tail..]),
    )
}

fn window_line(start: usize, values: &[f64]) -> String {
    let mut line = format!("{} - {}: [", start, start + values.len());
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        let _ = write!(line, "{value:.6}");
    }
    line.push(']');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::run_group;
    use futures::executor;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn windows_tile_a_twenty_element_vector() {
        let values: Vec<f64> = (0..20).map(f64::from).collect();
        let summary = format_summary("Vector x", &values);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Vector x");
        assert!(lines[1].starts_with("0 - 10: [0.000000,1.000000,"));
        assert!(lines[1].ends_with("9.000000]"));
        assert!(lines[2].starts_with("10 - 20: [10.000000,"));
        assert!(lines[2].ends_with("19.000000]"));
    }

    #[test]
    fn short_vectors_clamp_both_windows() {
        let values = vec![1.0, 2.0, 3.0];
        let summary = format_summary("short", &values);
        assert_eq!(
            summary,
            "short\n0 - 3: [1.000000,2.000000,3.000000]\n0 - 3: [1.000000,2.000000,3.000000]"
        );
    }

    #[test]
    fn empty_vector_prints_empty_brackets() {
        assert_eq!(format_summary("empty", &[]), "empty\n0 - 0: []\n0 - 0: []");
    }

    #[test]
    fn generated_blocks_reassemble_to_the_seeded_vector() {
        let results = run_group(4, |group| {
            executor::block_on(async {
                let mut rng = ChaCha8Rng::seed_from_u64(7);
                let mut block = vec![0.0; 4];
                scatter_generate(&group, &mut block, 16, 10, 0, &mut rng)
                    .await
                    .expect("generation succeeds");
                gather_summary(&group, &block, 16, "Vector x", 0)
                    .await
                    .expect("gather succeeds")
            })
        });

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let reference: Vec<f64> = (0..16).map(|_| rng.gen_range(0..10i64) as f64).collect();
        assert!(reference.iter().all(|v| (0.0..10.0).contains(v)));
        assert_eq!(
            results[0].as_deref(),
            Some(format_summary("Vector x", &reference).as_str())
        );
        assert!(results[1..].iter().all(|summary| summary.is_none()));
    }
}
