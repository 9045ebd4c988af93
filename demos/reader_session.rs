use std::sync::Arc;
use std::time::Duration;

use manga_edge::{
    AppState, Backoff, HttpChapterSource, PresentationMode, ReaderSequencer, ReaderState,
    RetryConfig, SequencerConfig, UpstreamClient, proxy,
};
use tokio::net::TcpListener;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Usage: reader_session <chapter-id> [<next-chapter-id> ...]
    let chapters: Vec<String> = std::env::args().skip(1).collect();
    let Some(first) = chapters.first().cloned() else {
        eprintln!("usage: reader_session <chapter-id> [<next-chapter-id> ...]");
        return Ok(());
    };

    // 1. --- Start a local proxy in front of the real upstream ---
    println!("--- Starting the proxy with a custom retry policy ---");
    let client = UpstreamClient::builder()
        .retry_config(RetryConfig {
            max_attempts: 2,
            backoff: Backoff::Fixed(Duration::from_millis(500)),
            ..Default::default()
        })
        .build()?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(proxy::serve(listener, AppState::new(client), std::future::pending()));
    println!("Proxy listening on http://{addr}/");
    println!();

    // 2. --- Open the first chapter through the proxy ---
    let source = Arc::new(HttpChapterSource::new(Url::parse(&format!("http://{addr}/"))?)?);
    let mut reader = ReaderSequencer::with_config(
        Arc::clone(&source),
        SequencerConfig {
            prefetch_pages: 2,
            ..Default::default()
        },
    );
    reader.set_chapters(chapters);

    match reader.open(&first).await {
        ReaderState::Ready { pages, .. } => println!("Chapter {first}: {} pages", pages.len()),
        ReaderState::Failed {
            reason,
            fallback_url,
            ..
        } => {
            println!("Chapter {first} failed ({reason}); read it at {fallback_url}");
            return Ok(());
        }
        other => println!("Unexpected state: {other:?}"),
    }
    println!();

    // 3. --- Paged presentation ---
    println!("--- Paging through the first pages ---");
    reader.set_mode(PresentationMode::Paged);
    for _ in 0..3 {
        println!("  page {}: {:?}", reader.current_page() + 1, reader.visible_pages());
        if !reader.next_page() {
            break;
        }
    }
    println!();

    // 4. --- Background prefetch of the next chapter ---
    if let Some(next) = reader.next_chapter_id() {
        println!("--- Waiting for the prefetch of {next} ---");
        match reader.wait_prefetch().await {
            Some(Ok(p)) => println!("  prefetched {} leading pages", p.pages_fetched),
            Some(Err(e)) => println!("  prefetch failed, current chapter unaffected: {e}"),
            None => println!("  no prefetch was running"),
        }
        // served from the source's session cache
        if let Some(state) = reader.advance().await {
            println!("Advanced to {:?}", state.chapter_id());
        }
    }

    source.clear_cache().await;
    Ok(())
}
