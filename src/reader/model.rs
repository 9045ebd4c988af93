use crate::chapter::ChapterResource;

/// Lifecycle of one chapter view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReaderState {
    #[default]
    Idle,
    Loading {
        chapter_id: String,
    },
    Ready {
        chapter: ChapterResource,
        /// Page image URLs in reading order.
        pages: Vec<String>,
    },
    /// Resolution gave up; `fallback_url` opens the chapter on the upstream site.
    Failed {
        chapter_id: String,
        reason: String,
        fallback_url: String,
    },
}

impl ReaderState {
    pub fn chapter_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Loading { chapter_id } | Self::Failed { chapter_id, .. } => Some(chapter_id),
            Self::Ready { chapter, .. } => Some(&chapter.chapter_id),
        }
    }

    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn pages(&self) -> &[String] {
        match self {
            Self::Ready { pages, .. } => pages,
            _ => &[],
        }
    }

    pub fn fallback_url(&self) -> Option<&str> {
        match self {
            Self::Failed { fallback_url, .. } => Some(fallback_url),
            _ => None,
        }
    }
}

/// How pages are presented. Does not affect resolution or prefetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentationMode {
    /// All pages stacked in one scroll.
    #[default]
    Continuous,
    /// One page at a time.
    Paged,
}

/// Result of a background prefetch of the next chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefetched {
    pub chapter: ChapterResource,
    /// How many of the leading pages were fetched successfully.
    pub pages_fetched: usize,
}
