//! Manga detail, chapter feed and search listing passthrough.

mod api;

pub use api::{MangaRequest, fetch_listing, fetch_manga, has_feed_data, normalize_params};
