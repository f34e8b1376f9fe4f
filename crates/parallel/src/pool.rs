//! Fixed-size worker pool over an index-addressed result slice
//!
//! Every job is queued together with an exclusive reference to its result
//! slot. Workers pop `(index, job, slot)` triples from a shared channel (the
//! pop is the only synchronized step) and write straight into the slot, so
//! result writes need no locking and the caller sees results in job order
//! regardless of completion order. Slots the pool never reaches keep the
//! value the caller pre-populated.

use crossbeam_channel::bounded;

/// Run `work(index, &job)` for every job on `threads` workers, storing each
/// output in `slots[index]`.
///
/// `jobs` and `slots` are paired by position; extra entries on either side
/// are ignored. With `threads <= 1` the jobs run on the calling thread.
pub fn run_indexed<J, R, F>(threads: usize, jobs: &[J], slots: &mut [R], work: F)
where
    J: Sync,
    R: Send,
    F: Fn(usize, &J) -> R + Sync,
{
    debug_assert_eq!(jobs.len(), slots.len(), "one slot per job");
    let n = jobs.len().min(slots.len());
    if n == 0 {
        return;
    }
    if threads <= 1 {
        for (i, (job, slot)) in jobs.iter().zip(slots.iter_mut()).enumerate() {
            *slot = work(i, job);
        }
        return;
    }

    let (tx, rx) = bounded(n);
    for (i, (job, slot)) in jobs.iter().zip(slots.iter_mut()).enumerate() {
        if tx.send((i, job, slot)).is_err() {
            break;
        }
    }
    drop(tx);

    let workers = threads.min(n);
    tracing::debug!("worker pool: {n} jobs on {workers} workers");
    std::thread::scope(|scope| {
        for worker in 0..workers {
            let rx = rx.clone();
            let work = &work;
            scope.spawn(move || {
                let mut done = 0usize;
                for (i, job, slot) in rx.iter() {
                    *slot = work(i, job);
                    done += 1;
                }
                tracing::trace!("worker {worker} finished {done} jobs");
            });
        }
    });
}
