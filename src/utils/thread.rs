use crate::Parallelism;

/// Executes the two operations, possibly in parallel, while splitting the amount of parallelism
/// between the two.
#[inline]
pub fn join_raw(
    op_a: impl Send + FnOnce(Parallelism),
    op_b: impl Send + FnOnce(Parallelism),
    parallelism: Parallelism,
) {
    match parallelism {
        Parallelism::None => {
            op_a(parallelism);
            op_b(parallelism);
        }
        #[cfg(feature = "rayon")]
        Parallelism::Rayon(n_threads) => {
            if n_threads == 1 {
                op_a(Parallelism::None);
                op_b(Parallelism::None);
            } else {
                let n_threads = if n_threads > 0 {
                    n_threads
                } else {
                    rayon::current_num_threads()
                };
                let parallelism = Parallelism::Rayon(n_threads - n_threads / 2);
                rayon::join(|| op_a(parallelism), || op_b(parallelism));
            }
        }
    }
}

/// The amount of threads that should ideally execute an operation with the given parallelism.
#[inline]
pub fn parallelism_degree(parallelism: Parallelism) -> usize {
    match parallelism {
        Parallelism::None => 1,
        #[cfg(feature = "rayon")]
        Parallelism::Rayon(0) => rayon::current_num_threads(),
        #[cfg(feature = "rayon")]
        Parallelism::Rayon(n_threads) => n_threads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn join_runs_both() {
        let count = AtomicUsize::new(0);
        join_raw(
            |_| {
                count.fetch_add(1, Ordering::Relaxed);
            },
            |_| {
                count.fetch_add(2, Ordering::Relaxed);
            },
            Parallelism::None,
        );
        assert_eq!(count.load(Ordering::Relaxed), 3);
        assert_eq!(parallelism_degree(Parallelism::None), 1);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn join_rayon() {
        let count = AtomicUsize::new(0);
        join_raw(
            |par| {
                assert_eq!(par, Parallelism::Rayon(1));
                count.fetch_add(1, Ordering::Relaxed);
            },
            |_| {
                count.fetch_add(1, Ordering::Relaxed);
            },
            Parallelism::Rayon(2),
        );
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
