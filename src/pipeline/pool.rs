//! Fixed-size worker pool over a Mutex/Condvar work queue.
//!
//! An optional queue bound turns the pool lossy: submissions past the bound
//! return `false` immediately instead of blocking the producer. Shutdown is
//! non-accepting; jobs already queued or running are allowed to finish.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolInner {
    queue: Mutex<VecDeque<Job>>,
    signal: Condvar,
    shutdown: AtomicBool,
    capacity: Option<usize>,
    dropped: AtomicU64,
}

#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn new(name: &str, threads: usize, capacity: Option<usize>) -> Self {
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(VecDeque::new()),
            signal: Condvar::new(),
            shutdown: AtomicBool::new(false),
            capacity,
            dropped: AtomicU64::new(0),
        });

        for i in 0..threads {
            let inner = inner.clone();
            std::thread::Builder::new()
                .name(format!("{}-worker-{}", name, i))
                .spawn(move || worker_loop(inner))
                .expect("failed to spawn worker thread");
        }

        Self { inner }
    }

    /// Queue a job. Returns `false` without blocking when the pool is
    /// shutting down or the bounded queue is full.
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.shutdown.load(Ordering::Relaxed) {
            return false;
        }
        {
            let mut queue = self.inner.queue.lock().unwrap();
            if let Some(capacity) = self.inner.capacity {
                if queue.len() >= capacity {
                    self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
            }
            queue.push_back(Box::new(job));
        }
        self.inner.signal.notify_one();
        true
    }

    pub fn depth(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting work. In-flight jobs run to completion.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.signal.notify_all();
    }
}

fn worker_loop(inner: Arc<PoolInner>) {
    loop {
        let job = {
            let mut queue = inner.queue.lock().unwrap();
            loop {
                if let Some(job) = queue.pop_front() {
                    break job;
                }
                if inner.shutdown.load(Ordering::Relaxed) {
                    return;
                }
                queue = inner.signal.wait(queue).unwrap();
            }
        };
        job();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn runs_submitted_jobs() {
        let pool = WorkerPool::new("test", 2, None);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = counter.clone();
            assert!(pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while counter.load(Ordering::SeqCst) < 10 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn bounded_pool_drops_instead_of_blocking() {
        let pool = WorkerPool::new("test", 1, Some(2));
        let gate = Arc::new((Mutex::new(false), Condvar::new()));

        // Occupy the single worker
        {
            let gate = gate.clone();
            pool.submit(move || {
                let (lock, cvar) = &*gate;
                let mut open = lock.lock().unwrap();
                while !*open {
                    open = cvar.wait(open).unwrap();
                }
            });
        }
        std::thread::sleep(Duration::from_millis(50));

        // Two fit in the queue, the rest are dropped immediately
        let mut accepted = 0;
        let start = std::time::Instant::now();
        for _ in 0..10 {
            if pool.submit(|| {}) {
                accepted += 1;
            }
        }
        assert!(start.elapsed() < Duration::from_millis(100), "submit must not block");
        assert_eq!(accepted, 2);
        assert_eq!(pool.dropped(), 8);

        let (lock, cvar) = &*gate;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    #[test]
    fn shutdown_rejects_new_work() {
        let pool = WorkerPool::new("test", 1, None);
        pool.shutdown();
        assert!(!pool.submit(|| {}));
    }
}
