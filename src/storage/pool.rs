//! Shared access to a single live backend.
//!
//! The pool creates and connects its backend on the first [`BackendPool::acquire`],
//! hands out leases that all talk to that one backend through a mutex, and
//! counts outstanding leases. Dropping a lease releases it; the backend stays
//! open until [`BackendPool::close_all`]. Leases issued before a `close_all`
//! no longer count against the pool.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use super::backend::{PersistenceBackend, Result};
use super::models::{Bookmark, DailyStat, MasteryRecord, ReviewEntry};
use crate::catalog::VocabularyEntry;

pub type SharedBackend = Box<dyn PersistenceBackend + Send>;

type Factory = Box<dyn Fn() -> SharedBackend + Send + Sync>;

struct PoolState {
    backend: Option<Arc<Mutex<SharedBackend>>>,
    leases: usize,
    /// Bumped by `close_all`
    generation: u64,
}

struct PoolInner {
    factory: Factory,
    state: Mutex<PoolState>,
}

/// Reference-counted pool around one backend connection
#[derive(Clone)]
pub struct BackendPool {
    inner: Arc<PoolInner>,
}

impl BackendPool {
    /// Create a pool; `factory` builds an unconnected backend when one is needed
    pub fn new(factory: impl Fn() -> SharedBackend + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                factory: Box::new(factory),
                state: Mutex::new(PoolState {
                    backend: None,
                    leases: 0,
                    generation: 0,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lease the live backend, connecting it first if necessary
    pub fn acquire(&self) -> Result<PooledBackend> {
        let mut state = self.state();

        let shared = match &state.backend {
            Some(shared) => Arc::clone(shared),
            None => {
                log::debug!("Creating pooled backend connection");
                let mut backend = (self.inner.factory)();
                backend.connect()?;
                let shared = Arc::new(Mutex::new(backend));
                state.backend = Some(Arc::clone(&shared));
                shared
            }
        };

        state.leases += 1;
        log::debug!("Backend leased (active leases: {})", state.leases);

        Ok(PooledBackend {
            shared,
            pool: self.clone(),
            generation: state.generation,
        })
    }

    fn release(&self, generation: u64) {
        let mut state = self.state();
        if generation != state.generation {
            return;
        }
        state.leases = state.leases.saturating_sub(1);
        log::debug!("Backend released (active leases: {})", state.leases);
    }

    /// Number of leases currently held
    pub fn active_leases(&self) -> usize {
        self.state().leases
    }

    /// Whether a live backend is currently held
    pub fn is_open(&self) -> bool {
        self.state().backend.is_some()
    }

    /// Close the live backend; outstanding leases see a disconnected backend
    pub fn close_all(&self) -> Result<()> {
        let shared = {
            let mut state = self.state();
            state.leases = 0;
            state.generation += 1;
            state.backend.take()
        };

        if let Some(shared) = shared {
            let mut backend = shared.lock().unwrap_or_else(PoisonError::into_inner);
            backend.close()?;
            log::info!("Closed pooled backend");
        }
        Ok(())
    }
}

/// A lease on the pool's backend. Each call locks the shared backend for
/// its own duration only.
pub struct PooledBackend {
    shared: Arc<Mutex<SharedBackend>>,
    pool: BackendPool,
    generation: u64,
}

impl PooledBackend {
    fn backend(&self) -> MutexGuard<'_, SharedBackend> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PooledBackend {
    fn drop(&mut self) {
        self.pool.release(self.generation);
    }
}

impl PersistenceBackend for PooledBackend {
    fn connect(&mut self) -> Result<()> {
        let mut backend = self.backend();
        if backend.is_connected() {
            Ok(())
        } else {
            backend.connect()
        }
    }

    /// Leases never close the shared connection; use [`BackendPool::close_all`]
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.backend().is_connected()
    }

    fn get_vocabulary(&self, level: Option<u8>) -> Vec<VocabularyEntry> {
        self.backend().get_vocabulary(level)
    }

    fn get_user_records(&self, user: &str) -> Vec<MasteryRecord> {
        self.backend().get_user_records(user)
    }

    fn get_review_list(&self, user: &str) -> Vec<ReviewEntry> {
        self.backend().get_review_list(user)
    }

    fn get_bookmarks(&self, user: &str) -> Vec<Bookmark> {
        self.backend().get_bookmarks(user)
    }

    fn get_daily_stats(&self, user: &str) -> Vec<DailyStat> {
        self.backend().get_daily_stats(user)
    }

    fn list_users(&self) -> Vec<String> {
        self.backend().list_users()
    }

    fn update_user_record(&mut self, user: &str, vocab_id: u32, star: u8) -> Result<()> {
        self.backend().update_user_record(user, vocab_id, star)
    }

    fn add_to_review_list(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()> {
        self.backend().add_to_review_list(user, vocab_id, weight)
    }

    fn update_review_weight(&mut self, user: &str, vocab_id: u32, weight: f64) -> Result<()> {
        self.backend().update_review_weight(user, vocab_id, weight)
    }

    fn remove_from_review_list(&mut self, user: &str, vocab_id: u32) -> Result<bool> {
        self.backend().remove_from_review_list(user, vocab_id)
    }

    fn add_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<()> {
        self.backend().add_bookmark(user, vocab_id)
    }

    fn remove_bookmark(&mut self, user: &str, vocab_id: u32) -> Result<bool> {
        self.backend().remove_bookmark(user, vocab_id)
    }

    fn update_daily_stats(
        &mut self,
        user: &str,
        date: NaiveDate,
        total: u32,
        correct: u32,
        wrong: u32,
    ) -> Result<()> {
        self.backend()
            .update_daily_stats(user, date, total, correct, wrong)
    }

    fn import_vocabulary(&mut self, entries: &[VocabularyEntry]) -> Result<usize> {
        self.backend().import_vocabulary(entries)
    }
}

impl std::fmt::Debug for BackendPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("BackendPool")
            .field("open", &state.backend.is_some())
            .field("leases", &state.leases)
            .finish()
    }
}
