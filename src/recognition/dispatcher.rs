//! Recognition dispatcher: bounded queue plus a fixed worker pool.
//!
//! `submit` is fire-and-forget. When the queue is full the newest segment
//! is dropped and a warning logged; audio capture must never stall waiting
//! for recognition capacity. Failed or empty recognitions are dropped
//! silently, never retried.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::{BackendSet, RecognitionResult};
use crate::audio::AudioSegment;
use crate::config::SharedConfig;
use crate::pipeline::pool::WorkerPool;

/// Segments waiting for recognition beyond this are dropped
pub const QUEUE_CAPACITY: usize = 10;

const WORKER_THREADS: usize = 3;

/// Rolling window of per-segment processing times
const TIMING_WINDOW: usize = 20;

/// Called from worker threads with each non-empty recognition result.
pub type ResultHandler = Arc<dyn Fn(RecognitionResult) + Send + Sync>;

pub struct RecognitionDispatcher {
    pool: WorkerPool,
    backends: Arc<BackendSet>,
    config: SharedConfig,
    handler: ResultHandler,
    timings: Arc<Mutex<VecDeque<f64>>>,
}

impl RecognitionDispatcher {
    pub fn new(config: SharedConfig, backends: BackendSet, handler: ResultHandler) -> Self {
        Self {
            pool: WorkerPool::new("recognition", WORKER_THREADS, Some(QUEUE_CAPACITY)),
            backends: Arc::new(backends),
            config,
            handler,
            timings: Arc::new(Mutex::new(VecDeque::with_capacity(TIMING_WINDOW))),
        }
    }

    /// Fire-and-forget. Returns `false` when the segment was dropped.
    pub fn submit(&self, segment: AudioSegment) -> bool {
        let backends = self.backends.clone();
        let config = self.config.clone();
        let handler = self.handler.clone();
        let timings = self.timings.clone();

        let accepted = self.pool.submit(move || {
            process_segment(segment, &backends, &config, &handler, &timings);
        });
        if !accepted {
            log::warn!("recognition queue full, dropping segment");
        }
        accepted
    }

    pub fn queue_depth(&self) -> usize {
        self.pool.depth()
    }

    pub fn dropped_segments(&self) -> u64 {
        self.pool.dropped()
    }

    /// Mean of the last 20 per-segment processing times, in milliseconds.
    pub fn avg_processing_ms(&self) -> f64 {
        let timings = self.timings.lock().unwrap();
        if timings.is_empty() {
            return 0.0;
        }
        timings.iter().sum::<f64>() / timings.len() as f64
    }

    /// Stop accepting segments; in-flight recognitions finish.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

fn process_segment(
    segment: AudioSegment,
    backends: &BackendSet,
    config: &SharedConfig,
    handler: &ResultHandler,
    timings: &Mutex<VecDeque<f64>>,
) {
    let start = Instant::now();

    // Backend choice is read at processing time, not capture time
    let engine = { config.lock().unwrap().recognition_engine };

    let result = match backends.get(engine) {
        Some(backend) => match backend.recognize(&segment) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("recognition failed ({}): {:#}", engine, e);
                RecognitionResult::empty()
            }
        },
        None => {
            log::warn!("no backend configured for engine '{}'", engine);
            RecognitionResult::empty()
        }
    };

    {
        let mut timings = timings.lock().unwrap();
        if timings.len() >= TIMING_WINDOW {
            timings.pop_front();
        }
        timings.push_back(start.elapsed().as_secs_f64() * 1000.0);
    }

    if !result.is_empty() {
        handler(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::recognition::Recognizer;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Condvar;
    use std::time::Duration;

    struct FixedRecognizer {
        text: &'static str,
        calls: AtomicUsize,
    }

    impl Recognizer for FixedRecognizer {
        fn recognize(&self, _segment: &AudioSegment) -> Result<RecognitionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RecognitionResult {
                text: self.text.to_string(),
                confidence: 0.95,
            })
        }
    }

    struct FailingRecognizer;
    impl Recognizer for FailingRecognizer {
        fn recognize(&self, _segment: &AudioSegment) -> Result<RecognitionResult> {
            anyhow::bail!("backend down")
        }
    }

    fn segment() -> AudioSegment {
        AudioSegment::new(vec![0.1; 1600], 16_000)
    }

    fn shared_config() -> SharedConfig {
        Arc::new(Mutex::new(Config::default()))
    }

    #[test]
    fn results_reach_the_handler() {
        let recognizer = Arc::new(FixedRecognizer {
            text: "hello there",
            calls: AtomicUsize::new(0),
        });
        let (tx, rx) = std::sync::mpsc::channel();
        let handler: ResultHandler = Arc::new(move |result| {
            tx.send(result).unwrap();
        });
        let dispatcher = RecognitionDispatcher::new(
            shared_config(),
            BackendSet::uniform(recognizer),
            handler,
        );

        assert!(dispatcher.submit(segment()));
        let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(result.text, "hello there");
        assert!((result.confidence - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn failed_recognition_is_dropped_silently() {
        let (tx, rx) = std::sync::mpsc::channel::<RecognitionResult>();
        let handler: ResultHandler = Arc::new(move |result| {
            tx.send(result).unwrap();
        });
        let dispatcher = RecognitionDispatcher::new(
            shared_config(),
            BackendSet::uniform(Arc::new(FailingRecognizer)),
            handler,
        );

        assert!(dispatcher.submit(segment()));
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
        // The failed segment still counts toward the timing window
        assert!(dispatcher.avg_processing_ms() >= 0.0);
    }

    #[test]
    fn backpressure_drops_instead_of_blocking() {
        // Recognizer that parks until released, pinning all three workers
        struct Parked {
            gate: Arc<(Mutex<bool>, Condvar)>,
            processed: Arc<AtomicUsize>,
        }
        impl Recognizer for Parked {
            fn recognize(&self, _segment: &AudioSegment) -> Result<RecognitionResult> {
                let (lock, cvar) = &*self.gate;
                let mut open = lock.lock().unwrap();
                while !*open {
                    open = cvar.wait(open).unwrap();
                }
                self.processed.fetch_add(1, Ordering::SeqCst);
                Ok(RecognitionResult::empty())
            }
        }

        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let processed = Arc::new(AtomicUsize::new(0));
        let recognizer = Arc::new(Parked {
            gate: gate.clone(),
            processed: processed.clone(),
        });
        let handler: ResultHandler = Arc::new(|_| {});
        let dispatcher = RecognitionDispatcher::new(
            shared_config(),
            BackendSet::uniform(recognizer),
            handler,
        );

        // Let the workers pick up their first segments
        for _ in 0..3 {
            dispatcher.submit(segment());
        }
        std::thread::sleep(Duration::from_millis(100));

        let start = Instant::now();
        let mut accepted = 0;
        for _ in 0..30 {
            if dispatcher.submit(segment()) {
                accepted += 1;
            }
        }
        assert!(
            start.elapsed() < Duration::from_millis(200),
            "submit must return immediately"
        );
        // Only the queue capacity is accepted beyond the in-flight three
        assert_eq!(accepted, QUEUE_CAPACITY);
        assert_eq!(dispatcher.dropped_segments(), 30 - QUEUE_CAPACITY as u64);

        // Release the workers and verify nothing beyond capacity + in-flight ran
        {
            let (lock, cvar) = &*gate;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }
        let deadline = Instant::now() + Duration::from_secs(2);
        while dispatcher.queue_depth() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        std::thread::sleep(Duration::from_millis(100));
        assert!(processed.load(Ordering::SeqCst) <= 3 + QUEUE_CAPACITY);
    }

    #[test]
    fn engine_switch_applies_to_next_segment() {
        use crate::recognition::RecognitionEngine;

        let cloud = Arc::new(FixedRecognizer {
            text: "from cloud",
            calls: AtomicUsize::new(0),
        });
        let neural = Arc::new(FixedRecognizer {
            text: "from neural",
            calls: AtomicUsize::new(0),
        });
        let backends = BackendSet {
            cloud: Some(cloud.clone()),
            acoustic: None,
            neural: Some(neural.clone()),
        };

        let (tx, rx) = std::sync::mpsc::channel();
        let handler: ResultHandler = Arc::new(move |result| {
            tx.send(result).unwrap();
        });
        let config = shared_config();
        let dispatcher = RecognitionDispatcher::new(config.clone(), backends, handler);

        dispatcher.submit(segment());
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.text, "from cloud");

        config.lock().unwrap().recognition_engine = RecognitionEngine::NeuralTranscription;
        dispatcher.submit(segment());
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(second.text, "from neural");
    }
}
