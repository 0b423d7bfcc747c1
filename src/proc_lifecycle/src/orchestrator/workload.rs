//! Fixed CPU-bound workload for the priority demo
//!
//! The loop runs a fixed number of iterations rather than a wall-clock
//! duration, so elapsed times are comparable across children.

use std::hint::black_box;

/// Spin through `iterations` increments and return the final count
pub fn cpu_bound_task(iterations: u64) -> u64 {
    let mut count = 0u64;
    for _ in 0..iterations {
        count = black_box(count + 1);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_bound_task_counts_every_iteration() {
        assert_eq!(cpu_bound_task(0), 0);
        assert_eq!(cpu_bound_task(12_345), 12_345);
    }
}
