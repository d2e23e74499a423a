use crate::normalize::NormalizedUrl;
use crate::result::FetchRequest;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Dedup set and pending queue shared by the engine and the fetch workers.
///
/// A URL is accepted at most once for the whole crawl: once offered it stays
/// in the seen set after it is fetched, and is never queued again.
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
}

#[derive(Debug, Default)]
struct FrontierState {
    seen: HashSet<NormalizedUrl>,
    pending: VecDeque<FetchRequest>,
    in_flight: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `request` unless its URL was already seen. Check and insert
    /// happen under one lock, so concurrent offers of the same URL yield a
    /// single `true`.
    pub fn offer(&self, request: FetchRequest) -> bool {
        let mut state = self.lock();
        if !state.seen.insert(request.url.clone()) {
            return false;
        }
        state.pending.push_back(request);
        true
    }

    /// Take the oldest pending request and count it as in flight.
    pub fn next(&self) -> Option<FetchRequest> {
        let mut state = self.lock();
        let request = state.pending.pop_front()?;
        state.in_flight += 1;
        Some(request)
    }

    /// Release the in-flight slot of a request taken with [`Frontier::next`].
    pub fn complete(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }

    /// Nothing pending and nothing in flight.
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.pending.is_empty() && state.in_flight == 0
    }

    /// Empty the pending queue. Discarded URLs remain seen.
    pub fn discard_pending(&self) -> Vec<FetchRequest> {
        self.lock().pending.drain(..).collect()
    }

    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.lock().seen.contains(url)
    }

    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // No mutation spans a panic point, so poisoned state is still valid
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
