//! In-memory agent surface
//!
//! A scripted stand-in for a real front-end. Replies are queued up front as
//! sequences of frames; every submission consumes one reply and appends a
//! response unit to the page, and every read of that unit advances one frame
//! (sticking at the last). This reproduces an answer that is still being
//! rendered when the poller samples it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{AgentSurface, PageId, ResponseUnit};
use crate::error::{RelayError, Result};

#[derive(Debug, Default)]
struct UnitState {
    frames: Vec<ResponseUnit>,
    cursor: usize,
}

impl UnitState {
    fn read(&mut self) -> Option<ResponseUnit> {
        let frame = self.frames.get(self.cursor).cloned();
        if self.cursor + 1 < self.frames.len() {
            self.cursor += 1;
        }
        frame
    }
}

#[derive(Debug, Default)]
struct MemoryPage {
    navigated: bool,
    input: String,
    units: Vec<UnitState>,
}

#[derive(Debug)]
struct MemoryState {
    next_page: u64,
    pages: HashMap<PageId, MemoryPage>,
    replies: VecDeque<Vec<ResponseUnit>>,
    echo: bool,
    authenticated: bool,
    input_ready: bool,
    send_button: bool,
    submitted: Vec<String>,
    resets: usize,
    closed: usize,
    commit_keys: usize,
}

/// Scripted, in-process `AgentSurface`.
#[derive(Debug)]
pub struct MemorySurface {
    state: Mutex<MemoryState>,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    /// A logged-in surface with a ready input box and a send button.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_page: 0,
                pages: HashMap::new(),
                replies: VecDeque::new(),
                echo: false,
                authenticated: true,
                input_ready: true,
                send_button: true,
                submitted: Vec::new(),
                resets: 0,
                closed: 0,
                commit_keys: 0,
            }),
        }
    }

    /// A surface that answers unscripted submissions by echoing the last
    /// prompt line back.
    pub fn echo() -> Self {
        let surface = Self::new();
        surface.lock().echo = true;
        surface
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply rendered progressively through `frames`.
    pub fn push_reply(&self, frames: Vec<ResponseUnit>) {
        self.lock().replies.push_back(frames);
    }

    /// Queue a reply that is fully rendered on first read.
    pub fn push_text(&self, text: &str) {
        self.push_reply(vec![ResponseUnit::new(text, text)]);
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.lock().authenticated = authenticated;
    }

    pub fn set_input_ready(&self, ready: bool) {
        self.lock().input_ready = ready;
    }

    pub fn set_send_button(&self, available: bool) {
        self.lock().send_button = available;
    }

    /// Make `page` disappear as if its tab crashed.
    pub fn kill_page(&self, page: &PageId) {
        self.lock().pages.remove(page);
    }

    /// Prompts submitted so far, oldest first.
    pub fn submitted(&self) -> Vec<String> {
        self.lock().submitted.clone()
    }

    pub fn resets(&self) -> usize {
        self.lock().resets
    }

    pub fn closed(&self) -> usize {
        self.lock().closed
    }

    pub fn commit_keys(&self) -> usize {
        self.lock().commit_keys
    }

    pub fn open_pages(&self) -> usize {
        self.lock().pages.len()
    }

    fn with_page<T>(&self, page: &PageId, f: impl FnOnce(&mut MemoryPage) -> T) -> Result<T> {
        let mut state = self.lock();
        state
            .pages
            .get_mut(page)
            .map(f)
            .ok_or_else(|| RelayError::Surface(format!("page {page} is closed")))
    }

    fn send(&self, page: &PageId) -> Result<()> {
        let mut state = self.lock();
        if !state.pages.contains_key(page) {
            return Err(RelayError::Surface(format!("page {page} is closed")));
        }

        let prompt = state
            .pages
            .get_mut(page)
            .map(|p| std::mem::take(&mut p.input))
            .unwrap_or_default();
        state.submitted.push(prompt.clone());

        let frames = match state.replies.pop_front() {
            Some(frames) => Some(frames),
            None if state.echo => {
                let line = prompt.lines().last().unwrap_or("").to_string();
                Some(vec![ResponseUnit::new(line.clone(), line)])
            }
            None => None,
        };

        if let (Some(frames), Some(p)) = (frames, state.pages.get_mut(page)) {
            p.units.push(UnitState { frames, cursor: 0 });
        }
        Ok(())
    }
}

#[async_trait]
impl AgentSurface for MemorySurface {
    fn name(&self) -> &str {
        "memory"
    }

    async fn new_page(&self) -> Result<PageId> {
        let mut state = self.lock();
        state.next_page += 1;
        let page = PageId::new(format!("mem-{}", state.next_page));
        state.pages.insert(page.clone(), MemoryPage::default());
        Ok(page)
    }

    async fn navigate(&self, page: &PageId) -> Result<()> {
        self.with_page(page, |p| p.navigated = true)
    }

    async fn probe_authenticated(&self, page: &PageId) -> Result<bool> {
        let navigated = self.with_page(page, |p| p.navigated)?;
        Ok(navigated && self.lock().authenticated)
    }

    async fn is_alive(&self, page: &PageId) -> Result<bool> {
        Ok(self.lock().pages.contains_key(page))
    }

    async fn wait_for_input_ready(&self, page: &PageId, _timeout: Duration) -> Result<bool> {
        let navigated = self.with_page(page, |p| p.navigated)?;
        let state = self.lock();
        Ok(navigated && state.authenticated && state.input_ready)
    }

    async fn reset_conversation(&self, page: &PageId) -> Result<bool> {
        self.with_page(page, |p| p.input.clear())?;
        self.lock().resets += 1;
        Ok(true)
    }

    async fn clear_and_insert(&self, page: &PageId, text: &str) -> Result<()> {
        self.with_page(page, |p| p.input = text.to_string())
    }

    async fn submit(&self, page: &PageId) -> Result<bool> {
        if !self.lock().send_button {
            return Ok(false);
        }
        self.send(page)?;
        Ok(true)
    }

    async fn press_commit_key(&self, page: &PageId) -> Result<()> {
        self.lock().commit_keys += 1;
        self.send(page)
    }

    async fn count_response_units(&self, page: &PageId) -> Result<usize> {
        self.with_page(page, |p| p.units.len())
    }

    async fn read_unit(&self, page: &PageId, index: usize) -> Result<Option<ResponseUnit>> {
        self.with_page(page, |p| p.units.get_mut(index).and_then(UnitState::read))
    }

    async fn close(&self, page: &PageId) -> Result<()> {
        let mut state = self.lock();
        if state.pages.remove(page).is_some() {
            state.closed += 1;
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let mut state = self.lock();
        let open = state.pages.len();
        state.pages.clear();
        state.closed += open;
        Ok(())
    }
}
