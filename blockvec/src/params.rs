//! Run-parameter sources.
//!
//! Terminal input is a collaborator of the computation, not part of it:
//! the pipeline only ever asks for the next integer. [`StdinParams`] is
//! the interactive source with the prompted reads; [`FixedParams`] feeds
//! canned values for tests and scripted runs.

use std::collections::VecDeque;
use std::io::{self, Write};

/// Where the three run parameters come from. Only rank 0 ever reads.
pub trait ParamSource {
    /// The order of the global vectors.
    fn read_order(&mut self) -> i64;
    /// Exclusive upper bound for the generated random integers.
    fn read_rand_max(&mut self) -> i64;
    /// The scalar every block is multiplied by.
    fn read_scalar(&mut self) -> i64;
}

/// Prompted reads of whitespace-separated integers from standard input.
#[derive(Default)]
pub struct StdinParams {
    tokens: VecDeque<String>,
}

impl StdinParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next integer on stdin, skipping tokens that do not parse. Returns
    /// -1 at end of input so validation downstream rejects the run.
    fn next_int(&mut self) -> i64 {
        loop {
            while let Some(token) = self.tokens.pop_front() {
                if let Ok(value) = token.parse() {
                    return value;
                }
            }
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => return -1,
                Ok(_) => self
                    .tokens
                    .extend(line.split_whitespace().map(str::to_owned)),
            }
        }
    }

    fn prompt(text: &str) {
        println!("{text}");
        let _ = io::stdout().flush();
    }
}

impl ParamSource for StdinParams {
    fn read_order(&mut self) -> i64 {
        Self::prompt("What's the order of the vectors?");
        self.next_int()
    }

    fn read_rand_max(&mut self) -> i64 {
        Self::prompt("What's the max number for random?");
        self.next_int()
    }

    fn read_scalar(&mut self) -> i64 {
        Self::prompt("\nWhat's the number for the scalar?");
        self.next_int()
    }
}

/// Canned parameters.
#[derive(Debug, Clone, Copy)]
pub struct FixedParams {
    pub order: i64,
    pub rand_max: i64,
    pub scalar: i64,
}

impl FixedParams {
    pub fn new(order: i64, rand_max: i64, scalar: i64) -> Self {
        FixedParams {
            order,
            rand_max,
            scalar,
        }
    }
}

impl ParamSource for FixedParams {
    fn read_order(&mut self) -> i64 {
        self.order
    }

    fn read_rand_max(&mut self) -> i64 {
        self.rand_max
    }

    fn read_scalar(&mut self) -> i64 {
        self.scalar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_params_echo_their_values() {
        let mut params = FixedParams::new(8, 10, 3);
        assert_eq!(params.read_order(), 8);
        assert_eq!(params.read_rand_max(), 10);
        assert_eq!(params.read_scalar(), 3);
    }
}
