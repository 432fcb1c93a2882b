//! In-memory `ProgressApi` stub for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProgressError;

use super::api::ProgressApi;
use super::model::{ProgressEntry, ProgressMap, ProgressPatch};

#[derive(Default)]
pub(crate) struct StubApi {
    pages: Mutex<ProgressMap>,
    latency: Duration,
    /// Delay after a patch has been applied, before it is acknowledged.
    response_delay: Duration,
    pub fail_fetch: AtomicBool,
    pub fail_patch: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fetch_calls: AtomicUsize,
    pub patch_calls: AtomicUsize,
    in_flight_patches: AtomicUsize,
    pub max_in_flight_patches: AtomicUsize,
    patch_log: Mutex<Vec<(String, ProgressPatch)>>,
    delete_log: Mutex<Vec<Option<String>>>,
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages<I>(pages: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, ProgressEntry)>,
    {
        let stub = Self::new();
        {
            let mut map = stub.pages.lock().unwrap();
            for (id, entry) in pages {
                map.insert(id.to_string(), entry);
            }
        }
        stub
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn pages(&self) -> ProgressMap {
        self.pages.lock().unwrap().clone()
    }

    pub fn patches(&self) -> Vec<(String, ProgressPatch)> {
        self.patch_log.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<Option<String>> {
        self.delete_log.lock().unwrap().clone()
    }

    fn failure(operation: &str) -> ProgressError {
        ProgressError::Status {
            operation: operation.to_string(),
            status: 503,
            body: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl ProgressApi for StubApi {
    async fn fetch_all(&self) -> Result<ProgressMap, ProgressError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Self::failure("load"));
        }
        Ok(self.pages.lock().unwrap().clone())
    }

    async fn patch(&self, page_id: &str, patch: &ProgressPatch) -> Result<(), ProgressError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight_patches.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_patches.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight_patches.fetch_sub(1, Ordering::SeqCst);

        if self.fail_patch.load(Ordering::SeqCst) {
            return Err(Self::failure("update"));
        }
        self.patch_log
            .lock()
            .unwrap()
            .push((page_id.to_string(), *patch));
        self.pages
            .lock()
            .unwrap()
            .entry(page_id.to_string())
            .or_default()
            .apply(patch, chrono::Utc::now());
        tokio::time::sleep(self.response_delay).await;
        Ok(())
    }

    async fn delete(&self, page_id: Option<&str>) -> Result<(), ProgressError> {
        tokio::time::sleep(self.latency).await;
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::failure("reset"));
        }
        self.delete_log
            .lock()
            .unwrap()
            .push(page_id.map(String::from));
        let mut pages = self.pages.lock().unwrap();
        match page_id {
            Some(id) => {
                pages.remove(id);
            }
            None => pages.clear(),
        }
        Ok(())
    }
}
