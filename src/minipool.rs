use crate::error::{CatResult, Error};
use crate::ordqueue::{self, OrdQueue};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};

/// Applies `work` to every item on scoped worker threads and returns the results in the original order.
///
/// The first error stops the remaining workers and is returned. A panicking or
/// vanished worker is reported as [`Error::Worker`] naming `stage`.
pub(crate) fn map_ordered<I, O, F>(stage: &'static str, items: Vec<I>, work: F) -> CatResult<Vec<O>> where
    I: Send,
    O: Send + 'static,
    F: Clone + Send + Fn(I) -> CatResult<O>,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    // one slot per job, so workers never wait on the collector
    let (queue, queue_iter) = ordqueue::new(total);
    run(thread_count(total), stage, items, queue, work).map_err(|e| match e {
        Error::ThreadSend => Error::Worker(stage),
        e => e,
    })?;
    queue_iter.collect_exact(total).map_err(|_| Error::Worker(stage))
}

fn run<I, O, F>(num_threads: u8, stage: &str, items: Vec<I>, queue: OrdQueue<O>, work: F) -> CatResult<()> where
    I: Send,
    O: Send + 'static,
    F: Clone + Send + Fn(I) -> CatResult<O>,
{
    let failed = &AtomicBool::new(false);
    std::thread::scope(move |scope| {
        let (jobs, inbox) = crossbeam_channel::bounded::<(usize, I)>(2);
        let worker = move |queue: OrdQueue<O>, work: F| {
            let inbox = inbox.clone();
            move || {
                catch_unwind(AssertUnwindSafe(move || {
                    for (index, item) in inbox {
                        if failed.load(SeqCst) {
                            break;
                        }
                        if let Err(e) = work(item).and_then(|out| queue.push(index, out)) {
                            failed.store(true, SeqCst);
                            return Err(e);
                        }
                    }
                    Ok(())
                })).map_err(move |_| {
                    failed.store(true, SeqCst);
                    Error::ThreadSend
                })?
            }
        };
        debug_assert!(num_threads > 0);
        let mut handles = Vec::with_capacity(num_threads.into());
        for n in 0..num_threads {
            let spawned = std::thread::Builder::new()
                .name(format!("{stage}{n}"))
                .spawn_scoped(scope, worker(queue.clone(), work.clone()));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(_) => {
                    failed.store(true, SeqCst);
                    break;
                },
            }
        }
        // the workers hold the only receivers and queue senders now
        drop(worker);
        drop(queue);

        let sent = items.into_iter().enumerate().try_for_each(|job| jobs.send(job));
        drop(jobs);
        let spawned_all = handles.len() == usize::from(num_threads);
        handles.into_iter().try_for_each(|h| h.join().map_err(|_| Error::ThreadSend)?)?;
        if sent.is_err() || !spawned_all {
            return Err(Error::ThreadSend);
        }
        Ok(())
    })
}

fn thread_count(jobs: usize) -> u8 {
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    cpus.min(jobs).clamp(1, u8::MAX.into()) as u8
}

#[test]
fn keeps_order() {
    let squares = map_ordered("sq", (0..100u32).collect(), |n| Ok(n * n)).unwrap();
    assert_eq!(squares, (0..100u32).map(|n| n * n).collect::<Vec<_>>());
}

#[test]
fn first_error_wins() {
    let res = map_ordered("err", (0..20u32).collect(), |n| {
        if n == 7 { Err(Error::NoFrames) } else { Ok(n) }
    });
    assert!(matches!(res, Err(Error::NoFrames)));
}

#[test]
fn panicking_worker_names_the_stage() {
    let res = map_ordered("encode", (0..20u32).collect(), |n| {
        if n == 3 { panic!("worker {n} gave up") } else { Ok(n) }
    });
    let err = res.unwrap_err();
    assert!(matches!(err, Error::Worker("encode")));
    assert!(err.to_string().starts_with("encode: "), "{err}");
}
