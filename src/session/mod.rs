pub mod notice;

use crate::channels::{ChannelMessage, Notifier};
use crate::config::UrlLogConfig;
use crate::ledger::{AppendOutcome, LedgerStore, UrlEntry};
use crate::links::{Submission, TitleFetcher, extract};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::task::TaskTracker;

/// Per-channel submission pipeline.
///
/// One session per channel, constructed once and shared. Extraction and the
/// ledger lookup run inline on the caller's turn, so messages within a
/// channel are checked one at a time; the title fetch is spawned, so message
/// handling never waits on the network.
pub struct ChannelSession {
    channel_id: String,
    store: Arc<dyn LedgerStore>,
    fetcher: Arc<dyn TitleFetcher>,
    notifier: Arc<dyn Notifier>,
    config: Arc<UrlLogConfig>,
    fetches: TaskTracker,
}

impl ChannelSession {
    pub fn new(
        channel_id: String,
        store: Arc<dyn LedgerStore>,
        fetcher: Arc<dyn TitleFetcher>,
        notifier: Arc<dyn Notifier>,
        config: Arc<UrlLogConfig>,
    ) -> Self {
        Self {
            channel_id,
            store,
            fetcher,
            notifier,
            config,
            fetches: TaskTracker::new(),
        }
    }

    /// Process one inbound message: extract, check the ledger, then either
    /// notify about a duplicate or spawn a fetch-and-record task.
    pub async fn handle_message(&self, author: &str, text: &str) {
        let Some(submission) = extract(text) else {
            return;
        };

        tracing::debug!(
            channel = %self.channel_id,
            url = %submission.url,
            "url submitted"
        );

        if let Err(e) = self.store.get_or_create(&self.channel_id).await {
            self.say(&notice::error_notice(author, &e.to_string())).await;
            return;
        }

        match self.store.find_entry(&self.channel_id, &submission.url).await {
            Err(e) => {
                self.say(&notice::error_notice(author, &e.to_string())).await;
            }
            Ok(Some(existing)) => {
                // First-seen wins; the original submission stays untouched.
                self.say(&notice::duplicate_notice(&self.config, author, &existing))
                    .await;
            }
            Ok(None) => self.spawn_fetch(author.to_string(), submission),
        }
    }

    fn spawn_fetch(&self, author: String, submission: Submission) {
        let channel_id = self.channel_id.clone();
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let notifier = Arc::clone(&self.notifier);

        self.fetches.spawn(async move {
            match fetcher.fetch_title(&submission.url).await {
                Ok(title) => {
                    let entry = UrlEntry {
                        url: submission.url,
                        description: submission.description,
                        title,
                        submitter: author,
                        timestamp: Utc::now(),
                    };

                    match store.append(&channel_id, &entry).await {
                        Ok(AppendOutcome::Appended) => {
                            if !entry.title.is_empty() {
                                deliver(&*notifier, &channel_id, &entry.title).await;
                            }
                        }
                        Ok(AppendOutcome::AlreadyRecorded) => {
                            // A concurrent submission won the race between our
                            // ledger check and this append; nothing to record.
                            tracing::debug!(
                                channel = %channel_id,
                                url = %entry.url,
                                "entry already recorded, dropping"
                            );
                        }
                        Err(e) => {
                            deliver(
                                &*notifier,
                                &channel_id,
                                &notice::error_notice(&entry.submitter, &e.to_string()),
                            )
                            .await;
                        }
                    }
                }
                Err(e) => {
                    deliver(
                        &*notifier,
                        &channel_id,
                        &notice::error_notice(&author, &e.to_string()),
                    )
                    .await;
                }
            }
        });
    }

    async fn say(&self, text: &str) {
        deliver(&*self.notifier, &self.channel_id, text).await;
    }

    /// Wait until all in-flight fetches have settled.
    pub async fn drain(&self) {
        self.fetches.close();
        self.fetches.wait().await;
    }
}

async fn deliver(notifier: &dyn Notifier, channel_id: &str, text: &str) {
    if let Err(e) = notifier.notify(channel_id, text).await {
        tracing::warn!(channel = %channel_id, error = %e, "notification failed");
    }
}

/// Routes inbound messages to their channel's session, creating sessions
/// lazily. The store handle is injected once at construction and shared by
/// every session.
pub struct Coordinator {
    store: Arc<dyn LedgerStore>,
    fetcher: Arc<dyn TitleFetcher>,
    notifier: Arc<dyn Notifier>,
    config: Arc<UrlLogConfig>,
    sessions: Mutex<HashMap<String, Arc<ChannelSession>>>,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        fetcher: Arc<dyn TitleFetcher>,
        notifier: Arc<dyn Notifier>,
        config: UrlLogConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            config: Arc::new(config),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The session for `channel_id`, created on first use.
    pub async fn session(&self, channel_id: &str) -> Arc<ChannelSession> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(channel_id.to_string()).or_insert_with(|| {
            Arc::new(ChannelSession::new(
                channel_id.to_string(),
                Arc::clone(&self.store),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.notifier),
                Arc::clone(&self.config),
            ))
        });
        Arc::clone(session)
    }

    pub async fn dispatch(&self, message: &ChannelMessage) {
        self.session(&message.channel_id)
            .await
            .handle_message(&message.author, &message.text)
            .await;
    }

    /// Consume messages until the channel closes.
    pub async fn run(&self, mut rx: mpsc::Receiver<ChannelMessage>) {
        while let Some(message) = rx.recv().await {
            self.dispatch(&message).await;
        }
    }

    /// Wait for every session's outstanding fetches.
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = {
            let guard = self.sessions.lock().await;
            guard.values().cloned().collect()
        };
        for session in sessions {
            session.drain().await;
        }
    }
}
