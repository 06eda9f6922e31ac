//! Execution bridge: runs blocking codec work off the caller's thread.
//!
//! Every job runs on a rayon pool, either the global one or a dedicated pool
//! built from a [`BridgeConfig`]. The result travels back through a
//! `tokio::sync::oneshot` channel and is observed through [`Pending`], which
//! is a [`Future`] and can also be waited on from plain threads. A job either
//! completes with its result or, if it panics, with
//! [`CodecError::WorkerPanicked`]; either way it completes exactly once.

use alloc::string::String;
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicU64, Ordering};
use core::task::{Context, Poll};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{trace, warn};
use tokio::sync::oneshot;

use crate::codecs::Codec;
use crate::error::CodecError;
use crate::format::ImageFormat;

static NEXT_JOB: AtomicU64 = AtomicU64::new(1);

/// Thread pool settings for a [`Bridge`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Worker count for a dedicated pool. `None` shares rayon's global pool.
    pub threads: Option<usize>,
    /// Thread name prefix for a dedicated pool.
    pub thread_name: Option<String>,
}

impl BridgeConfig {
    /// Share rayon's global pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run on a dedicated pool of `threads` workers (0 lets rayon choose).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Name dedicated workers `{prefix}-{index}`.
    pub fn with_thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = Some(prefix.into());
        self
    }
}

/// Schedules jobs on a rayon pool and hands their results back.
pub struct Bridge {
    pool: Option<rayon::ThreadPool>,
}

impl core::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bridge")
            .field(
                "threads",
                &self
                    .pool
                    .as_ref()
                    .map_or_else(rayon::current_num_threads, |p| p.current_num_threads()),
            )
            .field("dedicated", &self.pool.is_some())
            .finish()
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::shared()
    }
}

impl Bridge {
    /// Bridge on rayon's global pool.
    pub fn shared() -> Self {
        Self { pool: None }
    }

    /// Bridge as described by `config`.
    ///
    /// # Errors
    ///
    /// Fails if a dedicated pool cannot be spawned.
    pub fn new(config: &BridgeConfig) -> Result<Self, rayon::ThreadPoolBuildError> {
        let Some(threads) = config.threads else {
            return Ok(Self::shared());
        };

        let mut builder = rayon::ThreadPoolBuilder::new().num_threads(threads);
        if let Some(prefix) = config.thread_name.clone() {
            builder = builder.thread_name(move |i| alloc::format!("{prefix}-{i}"));
        }
        let pool = builder.build()?;
        log::debug!("bridge pool started with {} workers", pool.current_num_threads());
        Ok(Self { pool: Some(pool) })
    }

    fn spawn(&self, work: impl FnOnce() + Send + 'static) {
        match &self.pool {
            Some(pool) => pool.spawn(work),
            None => rayon::spawn(work),
        }
    }

    /// Run `job` on the pool and return a handle to its result.
    pub fn submit<T, F>(&self, job: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CodecError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let id = NEXT_JOB.fetch_add(1, Ordering::Relaxed);
        trace!("job {id} submitted");

        self.spawn(move || {
            let result = run_job(id, job);
            if tx.send(result).is_err() {
                trace!("job {id} finished after its handle was dropped");
            }
        });

        Pending { rx }
    }

    /// Run `job` on the pool and pass its result to `callback` on the worker
    /// thread.
    pub fn submit_with<T, F, C>(&self, job: F, callback: C)
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CodecError> + Send + 'static,
        C: FnOnce(Result<T, CodecError>) + Send + 'static,
    {
        let id = NEXT_JOB.fetch_add(1, Ordering::Relaxed);
        trace!("job {id} submitted with callback");

        self.spawn(move || {
            let result = run_job(id, job);
            // a panicking callback must not take the worker down with it
            if let Err(panic) = catch_unwind(AssertUnwindSafe(move || callback(result))) {
                warn!("job {id} callback panicked: {}", panic_message(&*panic));
            }
        });
    }
}

fn run_job<T>(id: u64, job: impl FnOnce() -> Result<T, CodecError>) -> Result<T, CodecError> {
    let result = catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|panic| {
        warn!("job {id} panicked: {}", panic_message(&*panic));
        Err(CodecError::WorkerPanicked)
    });
    match &result {
        Ok(_) => trace!("job {id} completed"),
        Err(e) => trace!("job {id} failed: {e}"),
    }
    result
}

fn panic_message(panic: &(dyn core::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Result of a job submitted to a [`Bridge`].
///
/// Await it from async code, or call [`wait`](Pending::wait) from a plain
/// thread. Dropping it does not stop the job.
#[must_use = "the job runs regardless, but its result is lost"]
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, CodecError>>,
}

impl<T> Pending<T> {
    /// Block the current thread until the job completes.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime; `.await` it there.
    pub fn wait(self) -> Result<T, CodecError> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(CodecError::WorkerPanicked))
    }

    /// Take the result if the job has already completed.
    pub fn try_take(&mut self) -> Option<Result<T, CodecError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CodecError::WorkerPanicked)),
        }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, CodecError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CodecError::WorkerPanicked)))
    }
}

static GATES: [Mutex<()>; ImageFormat::ALL.len()] = [Mutex::new(()), Mutex::new(()), Mutex::new(())];

fn gate_index(format: ImageFormat) -> usize {
    ImageFormat::ALL
        .iter()
        .position(|f| *f == format)
        .unwrap_or_default()
}

/// Run `f`, holding the per-format gate when `codec` is not reentrant.
pub(crate) fn serialized<R>(codec: &dyn Codec, f: impl FnOnce() -> R) -> R {
    let _guard: Option<MutexGuard<'static, ()>> = (!codec.reentrant()).then(|| {
        GATES[gate_index(codec.format())]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    });
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    #[test]
    fn wait_returns_the_result() {
        let bridge = Bridge::shared();
        let pending = bridge.submit(|| Ok(21 * 2));
        assert_eq!(pending.wait().unwrap(), 42);
    }

    #[test]
    fn errors_pass_through() {
        let bridge = Bridge::shared();
        let pending =
            bridge.submit::<(), _>(|| Err(crate::FormatError::Unrecognized.into()));
        assert_eq!(pending.wait().unwrap_err().kind(), ErrorKind::Unrecognized);
    }

    #[test]
    fn panic_becomes_worker_panicked() {
        let bridge = Bridge::shared();
        let pending = bridge.submit::<u8, _>(|| panic!("boom"));
        assert_eq!(pending.wait().unwrap_err().kind(), ErrorKind::WorkerPanicked);
    }

    #[test]
    fn callback_runs_exactly_once() {
        let bridge = Bridge::shared();
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        {
            let calls = Arc::clone(&calls);
            bridge.submit_with(
                || Ok("done"),
                move |result| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tx.send(result.unwrap()).unwrap();
                },
            );
        }
        assert_eq!(rx.recv().unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn callback_sees_panic_as_error() {
        let bridge = Bridge::shared();
        let (tx, rx) = mpsc::channel();
        bridge.submit_with(
            || -> Result<(), CodecError> { panic!("boom") },
            move |result| tx.send(result.map_err(|e| e.kind())).unwrap(),
        );
        assert_eq!(rx.recv().unwrap(), Err(ErrorKind::WorkerPanicked));
    }

    #[test]
    fn dedicated_pool_names_threads() {
        let config = BridgeConfig::new().with_threads(2).with_thread_name("zenpicha-test");
        let bridge = Bridge::new(&config).unwrap();
        let name = bridge
            .submit(|| Ok(std::thread::current().name().map(String::from)))
            .wait()
            .unwrap();
        assert!(name.unwrap().starts_with("zenpicha-test-"));
    }

    #[tokio::test]
    async fn pending_is_a_future() {
        let bridge = Bridge::shared();
        let value = bridge.submit(|| Ok(String::from("async"))).await.unwrap();
        assert_eq!(value, "async");
    }

    struct Exclusive(AtomicUsize);

    impl Codec for Exclusive {
        fn format(&self) -> ImageFormat {
            ImageFormat::Tiff
        }
        fn probe(&self, _: &[u8]) -> Result<crate::StatResult, CodecError> {
            Err(crate::FormatError::Unrecognized.into())
        }
        fn decode(&self, _: &[u8]) -> Result<crate::PixelBuffer, CodecError> {
            Err(crate::FormatError::Unrecognized.into())
        }
        fn encode(
            &self,
            _: &crate::PixelBuffer,
            _: &crate::EncodeOptions,
        ) -> Result<alloc::vec::Vec<u8>, CodecError> {
            Err(crate::FormatError::Unrecognized.into())
        }
        fn encodable_layouts(&self) -> &'static [crate::PixelLayout] {
            &[]
        }
        fn reentrant(&self) -> bool {
            false
        }
    }

    #[test]
    fn non_reentrant_codecs_never_overlap() {
        static CODEC: Exclusive = Exclusive(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let bridge = Bridge::new(&BridgeConfig::new().with_threads(4)).unwrap();

        let jobs: alloc::vec::Vec<_> = (0..16)
            .map(|_| {
                let overlaps = Arc::clone(&overlaps);
                bridge.submit(move || {
                    serialized(&CODEC, || {
                        if CODEC.0.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        std::thread::sleep(std::time::Duration::from_millis(2));
                        CODEC.0.fetch_sub(1, Ordering::SeqCst);
                    });
                    Ok(())
                })
            })
            .collect();
        for job in jobs {
            job.wait().unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }
}
