use serde::{Deserialize, Serialize};

/// Image quality variant served by the at-home network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageQuality {
    /// Original uploads (`data/`).
    #[default]
    Original,
    /// Recompressed, smaller images (`data-saver/`).
    DataSaver,
}

impl PageQuality {
    pub(crate) const fn path_segment(self) -> &'static str {
        match self {
            Self::Original => "data",
            Self::DataSaver => "data-saver",
        }
    }
}

/// Everything needed to build the ordered page URLs of one chapter.
///
/// File order is the upstream's reading order and is never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterResource {
    pub chapter_id: String,
    pub base_url: String,
    pub hash: String,
    pub data: Vec<String>,
    pub data_saver: Vec<String>,
}

impl ChapterResource {
    /// Page image URLs in reading order.
    ///
    /// Falls back to original quality when the chapter has no data-saver files.
    pub fn page_urls(&self, quality: PageQuality) -> Vec<String> {
        let (segment, files) = match quality {
            PageQuality::DataSaver if !self.data_saver.is_empty() => {
                (quality.path_segment(), &self.data_saver)
            }
            _ => (PageQuality::Original.path_segment(), &self.data),
        };
        let base = self.base_url.trim_end_matches('/');
        files
            .iter()
            .map(|f| format!("{base}/{segment}/{}/{f}", self.hash))
            .collect()
    }

    /// Number of pages in the chapter.
    pub fn page_count(&self) -> usize {
        self.data.len()
    }
}
