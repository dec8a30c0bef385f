//! End-to-end submission pipeline tests: extract → check → fetch → record,
//! with a deterministic fetcher standing in for the network.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use urllog::channels::{ChannelMessage, Notifier};
use urllog::config::UrlLogConfig;
use urllog::error::{FetchError, TransportError};
use urllog::ledger::{LedgerStore, SqliteLedgerStore};
use urllog::links::TitleFetcher;
use urllog::session::Coordinator;

struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    async fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, channel_id: &str, text: &str) -> Result<(), TransportError> {
        self.messages
            .lock()
            .await
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }
}

enum Behavior {
    Title(&'static str),
    Timeout,
}

struct StubFetcher {
    behavior: Behavior,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubFetcher {
    fn returning(title: &'static str) -> Self {
        Self {
            behavior: Behavior::Title(title),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn timing_out() -> Self {
        Self {
            behavior: Behavior::Timeout,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TitleFetcher for StubFetcher {
    async fn fetch_title(&self, _url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            Behavior::Title(title) => Ok((*title).to_string()),
            Behavior::Timeout => Err(FetchError::Timeout),
        }
    }
}

struct Harness {
    store: Arc<dyn LedgerStore>,
    fetcher: Arc<StubFetcher>,
    notifier: Arc<RecordingNotifier>,
    coordinator: Coordinator,
}

async fn harness(fetcher: StubFetcher) -> Harness {
    let store: Arc<dyn LedgerStore> = Arc::new(SqliteLedgerStore::in_memory().await.unwrap());
    let fetcher = Arc::new(fetcher);
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = Coordinator::new(
        Arc::clone(&store),
        Arc::clone(&fetcher) as Arc<dyn TitleFetcher>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        UrlLogConfig::default(),
    );
    Harness {
        store,
        fetcher,
        notifier,
        coordinator,
    }
}

fn msg(channel: &str, author: &str, text: &str) -> ChannelMessage {
    ChannelMessage {
        channel_id: channel.to_string(),
        author: author.to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn first_submission_is_recorded_and_title_announced() {
    let h = harness(StubFetcher::returning("Example Domain")).await;
    let before = Utc::now();

    h.coordinator
        .dispatch(&msg("#rust", "alice", "check this http://example.com cool site"))
        .await;
    h.coordinator.shutdown().await;

    let entries = h.store.entries("#rust").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].url, "http://example.com");
    assert_eq!(entries[0].description, "cool site");
    assert_eq!(entries[0].title, "Example Domain");
    assert_eq!(entries[0].submitter, "alice");
    // Stored timestamps carry millisecond precision.
    assert!(entries[0].timestamp.timestamp_millis() >= before.timestamp_millis());

    let messages = h.notifier.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0], ("#rust".to_string(), "Example Domain".to_string()));
}

#[tokio::test]
async fn resubmission_notifies_without_refetching() {
    let h = harness(StubFetcher::returning("Example Domain")).await;

    h.coordinator
        .dispatch(&msg("#rust", "alice", "check this http://example.com cool site"))
        .await;
    h.coordinator.shutdown().await;
    assert_eq!(h.fetcher.calls(), 1);

    h.coordinator
        .dispatch(&msg("#rust", "bob", "http://example.com seen this?"))
        .await;
    h.coordinator.shutdown().await;

    // No second fetch, no second entry.
    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(h.store.entries("#rust").await.unwrap().len(), 1);

    let messages = h.notifier.messages().await;
    assert_eq!(messages.len(), 2);
    let notice = &messages[1].1;
    assert!(notice.contains("bob"), "notice should address bob: {notice}");
    assert!(notice.contains("alice"), "notice should cite alice: {notice}");

    // The original timestamp, formatted with the default date format.
    let original = h
        .store
        .find_entry("#rust", "http://example.com")
        .await
        .unwrap()
        .unwrap();
    let formatted = original
        .timestamp
        .format("%-d.%-m.%Y %H:%M:%S")
        .to_string();
    assert!(
        notice.contains(&formatted),
        "notice should cite {formatted}: {notice}"
    );
}

#[tokio::test]
async fn repeat_submissions_never_alter_the_original_entry() {
    let h = harness(StubFetcher::returning("Example Domain")).await;

    h.coordinator
        .dispatch(&msg("#rust", "alice", "http://example.com first"))
        .await;
    h.coordinator.shutdown().await;

    let original = h.store.entries("#rust").await.unwrap().remove(0);

    for author in ["bob", "carol", "alice", "dave"] {
        h.coordinator
            .dispatch(&msg("#rust", author, "http://example.com again"))
            .await;
    }
    h.coordinator.shutdown().await;

    let entries = h.store.entries("#rust").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0], original);
    assert_eq!(h.fetcher.calls(), 1);
}

#[tokio::test]
async fn fetch_failure_notifies_and_records_nothing() {
    let h = harness(StubFetcher::timing_out()).await;

    h.coordinator
        .dispatch(&msg("#rust", "alice", "http://slow.example.com"))
        .await;
    h.coordinator.shutdown().await;

    assert!(h.store.entries("#rust").await.unwrap().is_empty());

    let messages = h.notifier.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("alice"));
    assert!(messages[0].1.contains("Oh noes, error:"));
    assert!(messages[0].1.contains("timed out"));
}

#[tokio::test]
async fn empty_title_is_recorded_but_not_announced() {
    let h = harness(StubFetcher::returning("")).await;

    h.coordinator
        .dispatch(&msg("#rust", "alice", "http://untitled.example.com"))
        .await;
    h.coordinator.shutdown().await;

    let entries = h.store.entries("#rust").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "");
    assert!(h.notifier.messages().await.is_empty());
}

#[tokio::test]
async fn message_without_url_does_nothing() {
    let h = harness(StubFetcher::returning("Never")).await;

    h.coordinator
        .dispatch(&msg("#rust", "alice", "good morning everyone"))
        .await;
    h.coordinator.shutdown().await;

    assert_eq!(h.fetcher.calls(), 0);
    assert!(h.store.entries("#rust").await.unwrap().is_empty());
    assert!(h.notifier.messages().await.is_empty());
}

#[tokio::test]
async fn private_address_urls_are_ignored() {
    let h = harness(StubFetcher::returning("Never")).await;

    for text in [
        "http://127.0.0.1:8080/admin",
        "http://10.1.2.3/",
        "http://192.168.0.1/router",
        "http://169.254.1.1/",
        "http://172.20.0.1/internal",
    ] {
        h.coordinator.dispatch(&msg("#rust", "mallory", text)).await;
    }
    h.coordinator.shutdown().await;

    assert_eq!(h.fetcher.calls(), 0);
    assert!(h.store.entries("#rust").await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_first_submissions_record_exactly_one_entry() {
    // Both messages pass the ledger check before either fetch completes;
    // the conditional append lets only one of them in.
    let h = harness(
        StubFetcher::returning("Example Domain").with_delay(Duration::from_millis(100)),
    )
    .await;

    h.coordinator
        .dispatch(&msg("#rust", "alice", "http://example.com mine"))
        .await;
    h.coordinator
        .dispatch(&msg("#rust", "bob", "http://example.com no mine"))
        .await;
    h.coordinator.shutdown().await;

    // Both submissions missed the ledger check and fetched.
    assert_eq!(h.fetcher.calls(), 2);

    let entries = h.store.entries("#rust").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].url, "http://example.com");

    // The race loser stays silent: one title announcement, no duplicate
    // notice.
    let messages = h.notifier.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, "Example Domain");
}

#[tokio::test]
async fn channels_keep_separate_ledgers() {
    let h = harness(StubFetcher::returning("Example Domain")).await;

    h.coordinator
        .dispatch(&msg("#rust", "alice", "http://example.com"))
        .await;
    h.coordinator
        .dispatch(&msg("#python", "bob", "http://example.com"))
        .await;
    h.coordinator.shutdown().await;

    // Same URL, different channels: both fetched, both recorded.
    assert_eq!(h.fetcher.calls(), 2);
    assert_eq!(h.store.entries("#rust").await.unwrap().len(), 1);
    assert_eq!(h.store.entries("#python").await.unwrap().len(), 1);
    assert_eq!(
        h.store.entries("#rust").await.unwrap()[0].submitter,
        "alice"
    );
    assert_eq!(
        h.store.entries("#python").await.unwrap()[0].submitter,
        "bob"
    );
}
