//! Fixed-size OCR worker pool.
//!
//! Recognition is expensive, so the pool bounds how many jobs run at once.
//! Each job holds one permit for its whole run. The engine is warmed up
//! lazily by whichever job gets there first.

use std::sync::Arc;

use tally_core::{Result, TallyError};
use tokio::sync::{OnceCell, Semaphore};
use tracing::debug;

use crate::ocr::{OcrEngine, Recognized};

pub const MAX_WORKERS: usize = 64;

pub struct OcrPool {
    engine: Arc<dyn OcrEngine>,
    permits: Semaphore,
    size: u32,
    warmed: OnceCell<()>,
}

impl OcrPool {
    /// A pool of `workers` slots, clamped to `1..=MAX_WORKERS`.
    pub fn new(engine: Arc<dyn OcrEngine>, workers: usize) -> Self {
        let size = workers.clamp(1, MAX_WORKERS) as u32;
        Self {
            engine,
            permits: Semaphore::new(size as usize),
            size,
            warmed: OnceCell::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Run one recognition job, waiting for a free worker first.
    pub async fn recognize(&self, bytes: &[u8]) -> Result<Recognized> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TallyError::PoolClosed)?;
        self.warmed
            .get_or_try_init(|| async {
                debug!(workers = self.size, "warming up ocr engine");
                self.engine.warm_up().await
            })
            .await?;
        self.engine.recognize(bytes).await
    }

    /// Wait for in-flight jobs to finish, then refuse new ones. Safe to call
    /// more than once.
    pub async fn shutdown(&self) {
        match self.permits.acquire_many(self.size).await {
            Ok(all) => {
                self.permits.close();
                drop(all);
                debug!("ocr pool shut down");
            }
            Err(_) => debug!("ocr pool already shut down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct CountingEngine {
        warm_ups: AtomicUsize,
        running: AtomicUsize,
        peak: AtomicUsize,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl OcrEngine for CountingEngine {
        async fn warm_up(&self) -> Result<()> {
            self.warm_ups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn recognize(&self, bytes: &[u8]) -> Result<Recognized> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(Recognized {
                text: String::from_utf8_lossy(bytes).into_owned(),
                confidence: 90.0,
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_bounds_concurrency_and_warms_once() {
        let engine = Arc::new(CountingEngine::default());
        let pool = Arc::new(OcrPool::new(engine.clone(), 2));

        let jobs: Vec<_> = (0..6)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.recognize(format!("page {i}").as_bytes()).await })
            })
            .collect();
        for job in jobs {
            let out = job.await.unwrap().unwrap();
            assert!(out.text.starts_with("page "));
        }

        assert_eq!(engine.finished.load(Ordering::SeqCst), 6);
        assert!(engine.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(engine.warm_ups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_drains_in_flight_jobs() {
        let engine = Arc::new(CountingEngine::default());
        let pool = Arc::new(OcrPool::new(engine.clone(), 2));

        let job = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.recognize(b"scan").await })
        };
        // Let the job take its permit before shutting down.
        while engine.running.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        pool.shutdown().await;
        assert_eq!(engine.finished.load(Ordering::SeqCst), 1);
        assert!(job.await.unwrap().is_ok());

        assert!(pool.is_closed());
        let err = pool.recognize(b"late").await.unwrap_err();
        assert!(matches!(err, TallyError::PoolClosed));

        pool.shutdown().await;
    }

    #[test]
    fn test_worker_count_is_clamped() {
        let engine = Arc::new(CountingEngine::default());
        assert_eq!(OcrPool::new(engine.clone(), 0).size(), 1);
        assert_eq!(OcrPool::new(engine, 1000).size(), MAX_WORKERS);
    }
}
