//! Client-side chapter sequencing: resolution with bounded retry, next-chapter prefetch,
//! and continuous or paged presentation.

mod model;
mod source;

pub use model::{Prefetched, PresentationMode, ReaderState};
pub use source::{ChapterSource, HttpChapterSource, SourceFuture};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::chapter::{ChapterResource, PageQuality};
use crate::core::{Backoff, EdgeError, RetryAttempt, RetryConfig};

/// Where readers are sent when a chapter cannot be resolved.
pub const DEFAULT_FALLBACK_BASE: &str = "https://mangadex.org/chapter/";

/// Tuning for [`ReaderSequencer`].
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Application-level retry for transient resolution failures. Only `enabled`,
    /// `max_attempts` and `backoff` are consulted.
    pub resolve_retry: RetryConfig,
    /// Leading pages of the next chapter fetched in the background.
    pub prefetch_pages: usize,
    pub quality: PageQuality,
    /// The chapter id is appended to build the fallback link.
    pub fallback_base: String,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            resolve_retry: RetryConfig {
                enabled: true,
                max_attempts: 3,
                backoff: Backoff::Fixed(Duration::from_secs(1)),
                retry_on_status: Vec::new(),
            },
            prefetch_pages: 3,
            quality: PageQuality::Original,
            fallback_base: DEFAULT_FALLBACK_BASE.to_owned(),
        }
    }
}

type PrefetchTask = JoinHandle<Result<Prefetched, EdgeError>>;

/// Drives one reader view.
///
/// `Idle -> Loading -> Ready` or `Idle -> Loading -> Failed`. Once `Ready`, the next chapter
/// in the list (if any) is resolved and its first pages fetched in a background task. That
/// task holds only the source, never the sequencer's state, so its failure cannot change
/// the current chapter.
pub struct ReaderSequencer<S: ChapterSource> {
    source: Arc<S>,
    config: SequencerConfig,
    state: watch::Sender<ReaderState>,
    chapters: Vec<String>,
    mode: PresentationMode,
    page: usize,
    prefetch: Option<(String, PrefetchTask)>,
}

impl<S: ChapterSource> ReaderSequencer<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self::with_config(source, SequencerConfig::default())
    }

    pub fn with_config(source: Arc<S>, config: SequencerConfig) -> Self {
        let (state, _) = watch::channel(ReaderState::Idle);
        Self {
            source,
            config,
            state,
            chapters: Vec::new(),
            mode: PresentationMode::default(),
            page: 0,
            prefetch: None,
        }
    }

    /// Sets the ordered chapter list used to find adjacent chapters.
    pub fn set_chapters<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.chapters = ids.into_iter().map(Into::into).collect();
    }

    /// Current state snapshot.
    pub fn state(&self) -> ReaderState {
        self.state.borrow().clone()
    }

    /// Observe state transitions, `Loading` included.
    pub fn subscribe(&self) -> watch::Receiver<ReaderState> {
        self.state.subscribe()
    }

    pub fn current_chapter_id(&self) -> Option<String> {
        self.state.borrow().chapter_id().map(str::to_owned)
    }

    fn adjacent(&self, offset: isize) -> Option<String> {
        let current = self.current_chapter_id()?;
        let idx = self.chapters.iter().position(|c| *c == current)?;
        let target = idx.checked_add_signed(offset)?;
        self.chapters.get(target).cloned()
    }

    pub fn next_chapter_id(&self) -> Option<String> {
        self.adjacent(1)
    }

    pub fn prev_chapter_id(&self) -> Option<String> {
        self.adjacent(-1)
    }

    /// Loads `chapter_id` and returns the resulting state (`Ready` or `Failed`).
    #[tracing::instrument(skip(self))]
    pub async fn open(&mut self, chapter_id: &str) -> ReaderState {
        let prefetched = self.take_prefetched(chapter_id).await;
        self.page = 0;
        self.state.send_replace(ReaderState::Loading {
            chapter_id: chapter_id.to_owned(),
        });

        let resolved = match prefetched {
            Some(chapter) => {
                tracing::debug!("using prefetched chapter");
                Ok(chapter)
            }
            None => self.resolve_with_retry(chapter_id).await,
        };

        match resolved {
            Ok(chapter) => {
                let pages = chapter.page_urls(self.config.quality);
                self.state.send_replace(ReaderState::Ready { chapter, pages });
                self.start_prefetch();
            }
            Err(e) => {
                tracing::warn!(error = %e, "chapter could not be resolved");
                self.state.send_replace(ReaderState::Failed {
                    chapter_id: chapter_id.to_owned(),
                    reason: e.to_string(),
                    fallback_url: format!("{}{chapter_id}", self.config.fallback_base),
                });
            }
        }
        self.state()
    }

    /// Opens the next chapter, if one is known.
    pub async fn advance(&mut self) -> Option<ReaderState> {
        let next = self.next_chapter_id()?;
        Some(self.open(&next).await)
    }

    /// Opens the previous chapter, if one is known.
    pub async fn retreat(&mut self) -> Option<ReaderState> {
        let prev = self.prev_chapter_id()?;
        Some(self.open(&prev).await)
    }

    async fn resolve_with_retry(&self, chapter_id: &str) -> Result<ChapterResource, EdgeError> {
        let cfg = &self.config.resolve_retry;
        let mut attempt = RetryAttempt::first(cfg);
        loop {
            if !attempt.delay.is_zero() {
                tokio::time::sleep(attempt.delay).await;
            }
            match self.source.resolve(chapter_id).await {
                Ok(chapter) => return Ok(chapter),
                Err(e) if e.is_transient() => match attempt.next(cfg) {
                    Some(next) => {
                        tracing::debug!(attempt = attempt.attempt, error = %e, "retrying resolution");
                        attempt = next;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }

    fn start_prefetch(&mut self) {
        let Some(next) = self.next_chapter_id() else {
            return;
        };
        let source = Arc::clone(&self.source);
        let quality = self.config.quality;
        let count = self.config.prefetch_pages;
        let id = next.clone();

        let task = tokio::spawn(async move {
            let result = prefetch(source.as_ref(), &id, quality, count).await;
            if let Err(e) = &result {
                tracing::debug!(chapter_id = %id, error = %e, "prefetch failed");
            }
            result
        });
        self.prefetch = Some((next, task));
    }

    /// Takes a finished prefetch of `chapter_id`; any other pending prefetch is aborted.
    async fn take_prefetched(&mut self, chapter_id: &str) -> Option<ChapterResource> {
        let (id, task) = self.prefetch.take()?;
        if id != chapter_id || !task.is_finished() {
            task.abort();
            return None;
        }
        task.await.ok()?.ok().map(|p| p.chapter)
    }

    /// Waits for the pending prefetch, if any, and returns its outcome.
    pub async fn wait_prefetch(&mut self) -> Option<Result<Prefetched, EdgeError>> {
        let (_, task) = self.prefetch.take()?;
        task.await.ok()
    }

    /* ---------------- presentation ---------------- */

    pub const fn mode(&self) -> PresentationMode {
        self.mode
    }

    pub const fn set_mode(&mut self, mode: PresentationMode) {
        self.mode = mode;
    }

    /// Zero-based cursor used in paged mode.
    pub const fn current_page(&self) -> usize {
        self.page
    }

    /// Pages to show: all of them when continuous, the current one when paged.
    pub fn visible_pages(&self) -> Vec<String> {
        let state = self.state.borrow();
        let pages = state.pages();
        match self.mode {
            PresentationMode::Continuous => pages.to_vec(),
            PresentationMode::Paged => pages.get(self.page).cloned().into_iter().collect(),
        }
    }

    /// Moves the cursor forward; returns `false` at the last page.
    pub fn next_page(&mut self) -> bool {
        let count = self.state.borrow().pages().len();
        if self.page + 1 < count {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Moves the cursor back; returns `false` at the first page.
    pub fn prev_page(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }
}

impl<S: ChapterSource> Drop for ReaderSequencer<S> {
    fn drop(&mut self) {
        if let Some((_, task)) = self.prefetch.take() {
            task.abort();
        }
    }
}

async fn prefetch<S: ChapterSource + ?Sized>(
    source: &S,
    chapter_id: &str,
    quality: PageQuality,
    count: usize,
) -> Result<Prefetched, EdgeError> {
    let chapter = source.resolve(chapter_id).await?;
    let urls: Vec<String> = chapter.page_urls(quality).into_iter().take(count).collect();
    let results = futures::future::join_all(urls.iter().map(|u| source.fetch_page(u))).await;
    let pages_fetched = results.iter().filter(|r| r.is_ok()).count();
    Ok(Prefetched {
        chapter,
        pages_fetched,
    })
}
