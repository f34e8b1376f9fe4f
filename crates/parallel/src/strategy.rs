//! Parallel processing strategies

use rayon::prelude::*;

/// Processing mode for algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    #[default]
    Sequential,
    /// Parallel processing using all available cores
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for a requested worker count: one (or zero) means sequential.
    pub fn from_threads(threads: usize) -> Self {
        if threads <= 1 {
            ProcessingMode::Sequential
        } else {
            ProcessingMode::ParallelWith(threads)
        }
    }

    /// Number of workers this mode runs with.
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => (*n).max(1),
        }
    }

    pub fn is_sequential(&self) -> bool {
        self.threads() == 1
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over items and collect results in input order
    fn par_map<T, U, F>(&self, items: Vec<T>, f: F) -> Vec<U>
    where
        T: Send,
        U: Send,
        F: Fn(T) -> U + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map<T, U, F>(&self, items: Vec<T>, f: F) -> Vec<U>
    where
        T: Send,
        U: Send,
        F: Fn(T) -> U + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => items.into_iter().map(f).collect(),
            ProcessingMode::Parallel => items.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                match rayon::ThreadPoolBuilder::new().num_threads(*threads).build() {
                    Ok(pool) => pool.install(|| items.into_par_iter().map(f).collect()),
                    Err(e) => {
                        tracing::warn!("thread pool unavailable ({e}), using global pool");
                        items.into_par_iter().map(f).collect()
                    }
                }
            }
        }
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}
