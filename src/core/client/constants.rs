//! Centralized constants for default endpoints and UA.

use std::time::Duration;

/// Descriptive client identifier; the upstream asks every consumer to send one.
pub(crate) const USER_AGENT: &str = concat!(
    "manga-edge/",
    env!("CARGO_PKG_VERSION"),
    " (MangaDex reader edge proxy)"
);

/// MangaDex JSON API base (paths are appended).
pub(crate) const DEFAULT_BASE_API: &str = "https://api.mangadex.org/";

/// MangaDex uploads host, serves cover images under `covers/`.
pub(crate) const DEFAULT_BASE_UPLOADS: &str = "https://uploads.mangadex.org/";

/// Referer sent with cover fetches; the uploads host rejects hotlinks without it.
pub(crate) const DEFAULT_REFERER: &str = "https://mangadex.org";

/// Upper bound for one upstream attempt, body included.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);

/// Connect timeout for the underlying HTTP client.
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
