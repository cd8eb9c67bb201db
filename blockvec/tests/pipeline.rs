//! End-to-end runs of the distributed pipeline over in-process groups.

use blockvec::channel::run_group;
use blockvec::params::FixedParams;
use blockvec::pipeline::{self, RunReport};
use blockvec::Abort;
use futures::executor;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Run the pipeline on `workers` ranks with canned parameters, capturing
/// each rank's outcome and report output.
fn run_fixed(
    workers: u32,
    params: FixedParams,
    seed: u64,
) -> Vec<(Result<RunReport, Abort>, String)> {
    run_group(workers, move |group| {
        let mut params = params;
        let mut out = Vec::new();
        let result = executor::block_on(pipeline::run(&group, &mut params, &mut out, seed));
        let out = String::from_utf8(out).expect("report output is utf-8");
        (result, out)
    })
}

/// Replay the origin's generation: x is drawn first, then y, from one
/// seeded stream.
fn generate_reference(n: usize, rand_max: i64, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut draw = |n: usize| -> Vec<f64> {
        (0..n).map(|_| rng.gen_range(0..rand_max) as f64).collect()
    };
    let x = draw(n);
    let y = draw(n);
    (x, y)
}

fn formatted(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| format!("{value:.6}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[test]
fn seeded_scenario_two_workers() {
    let results = run_fixed(2, FixedParams::new(8, 10, 3), 42);
    let (x, y) = generate_reference(8, 10, 42);
    assert!(x.iter().chain(&y).all(|v| (0.0..10.0).contains(v)));

    // dot(3x, 3y) == 9 * dot(x, y)
    let expected = 9.0 * x.iter().zip(&y).map(|(a, b)| a * b).sum::<f64>();
    let (outcome, out) = &results[0];
    let report = outcome.as_ref().expect("the run succeeds");
    let dot = report.dot.expect("the origin holds the result");
    assert!((dot - expected).abs() <= 1e-9 * expected.abs().max(1.0));

    // Windows clamp to the full vector when the order is below ten.
    let x_line = formatted(&x);
    assert!(out.contains(&format!("Vector x\n0 - 8: [{x_line}]\n0 - 8: [{x_line}]\n")));
    let scaled: Vec<f64> = x.iter().map(|v| v * 3.0).collect();
    let scaled_line = formatted(&scaled);
    assert!(out.contains(&format!("Vector x by scalar\n0 - 8: [{scaled_line}]\n")));
    assert!(out.contains(&format!("\nResult of dot product: {dot:.6}\n")));

    // Nothing is reported anywhere else.
    for (outcome, out) in &results[1..] {
        assert_eq!(outcome.as_ref().expect("the run succeeds").dot, None);
        assert!(out.is_empty());
    }
}

#[test]
fn windows_tile_exactly_at_order_twenty() {
    let results = run_fixed(4, FixedParams::new(20, 10, 2), 7);
    let (x, _) = generate_reference(20, 10, 7);
    let (_, out) = &results[0];
    assert!(out.contains(&format!(
        "Vector x\n0 - 10: [{}]\n10 - 20: [{}]\n",
        formatted(&x[..10]),
        formatted(&x[10..])
    )));
}

#[test]
fn one_worker_matches_four_workers() {
    let serial = run_fixed(1, FixedParams::new(40, 100, 5), 99);
    let distributed = run_fixed(4, FixedParams::new(40, 100, 5), 99);

    let serial_dot = serial[0].0.as_ref().expect("run succeeds").dot.expect("origin result");
    let distributed_dot = distributed[0]
        .0
        .as_ref()
        .expect("run succeeds")
        .dot
        .expect("origin result");
    assert!(
        (serial_dot - distributed_dot).abs() <= 1e-9 * serial_dot.abs().max(1.0),
        "serial {serial_dot} vs distributed {distributed_dot}"
    );

    // Same seed, same global vectors: the summaries agree verbatim.
    assert_eq!(serial[0].1, distributed[0].1);
}

#[test]
fn zero_order_runs_to_completion() {
    let results = run_fixed(2, FixedParams::new(0, 5, 3), 1);
    let (outcome, out) = &results[0];
    assert_eq!(outcome.as_ref().expect("run succeeds").dot, Some(0.0));
    assert!(out.contains("Vector x\n0 - 0: []\n0 - 0: []\n"));
    assert!(out.contains("Vector y by scalar\n0 - 0: []\n0 - 0: []\n"));
}

#[test]
fn indivisible_order_aborts_every_worker() {
    let results = run_fixed(2, FixedParams::new(7, 10, 3), 1);
    for (outcome, out) in &results {
        let abort = outcome.as_ref().expect_err("every rank aborts");
        assert_eq!(abort.context, "read_order");
        assert_eq!(
            abort.to_string(),
            "In read_order, n must be nonnegative and evenly divisible by the worker count"
        );
        assert!(out.is_empty());
    }
}

#[test]
fn negative_order_aborts_every_worker() {
    let results = run_fixed(4, FixedParams::new(-4, 10, 3), 1);
    for (outcome, _) in &results {
        assert_eq!(outcome.as_ref().expect_err("every rank aborts").context, "read_order");
    }
}

#[test]
fn non_positive_random_bound_aborts_every_worker() {
    for rand_max in [0, -5] {
        let results = run_fixed(2, FixedParams::new(8, rand_max, 3), 1);
        for (outcome, out) in &results {
            let abort = outcome.as_ref().expect_err("every rank aborts");
            assert_eq!(abort.context, "read_rand_max");
            assert!(out.is_empty());
        }
    }
}
