//! Chapter page resolution through the at-home server endpoint.

mod api;
mod model;
mod wire;

pub use api::{fetch_at_home, parse_at_home};
pub use model::{ChapterResource, PageQuality};
