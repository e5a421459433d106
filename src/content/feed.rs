//! Queue of upcoming texts, filled by a worker thread.
//!
//! Every request carries the feed generation at the time it was sent.
//! Switching category or jumping to another article line bumps the
//! generation, so replies that arrive afterwards are dropped instead of
//! replacing what the user is looking at.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::content::{
    ArticleCursor, Category, ContentError, ContentItem, ContentRequest, ContentSource,
    ReservedCategory, Volume,
};

#[derive(Debug)]
pub enum FeedEvent {
    Loaded(ContentItem),
    Failed(ContentError),
    Volumes(Vec<Volume>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Purpose {
    Show,
    Prefetch,
}

enum Job {
    Fetch {
        generation: u64,
        purpose: Purpose,
        request: ContentRequest,
    },
    Volumes,
}

enum Reply {
    Fetched {
        generation: u64,
        purpose: Purpose,
        result: Result<Vec<ContentItem>, ContentError>,
    },
    Volumes(Result<Vec<Volume>, ContentError>),
}

pub struct ContentFeed {
    category: Category,
    mistakes: Vec<char>,
    queue: VecDeque<ContentItem>,
    depth: usize,
    generation: u64,
    awaiting_show: bool,
    prefetching: bool,
    pending: VecDeque<FeedEvent>,
    jobs: mpsc::Sender<Job>,
    replies: mpsc::Receiver<Reply>,
}

impl ContentFeed {
    pub fn new(source: Box<dyn ContentSource>, category: Category, depth: usize) -> Self {
        let (jobs, job_rx) = mpsc::channel::<Job>();
        let (reply_tx, replies) = mpsc::channel();

        thread::spawn(move || {
            for job in job_rx {
                let reply = match job {
                    Job::Fetch {
                        generation,
                        purpose,
                        request,
                    } => Reply::Fetched {
                        generation,
                        purpose,
                        result: source.fetch(&request),
                    },
                    Job::Volumes => Reply::Volumes(source.volumes()),
                };
                if reply_tx.send(reply).is_err() {
                    return;
                }
            }
        });

        Self {
            category,
            mistakes: Vec::new(),
            queue: VecDeque::new(),
            depth: depth.max(1),
            generation: 0,
            awaiting_show: false,
            prefetching: false,
            pending: VecDeque::new(),
            jobs,
            replies,
        }
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// A text has been asked for and not delivered yet.
    pub fn is_loading(&self) -> bool {
        self.awaiting_show
    }

    /// Weak characters sent along with mistake review requests.
    pub fn set_mistakes(&mut self, mistakes: Vec<char>) {
        self.mistakes = mistakes;
    }

    /// Drops everything queued or in flight for the old category.
    pub fn switch_category(&mut self, category: Category) {
        tracing::info!(from = %self.category, to = %category, "category switched");
        self.category = category;
        self.invalidate();
    }

    /// A text was loaded from elsewhere; nothing already asked for may
    /// replace it.
    pub fn supersede(&mut self) {
        tracing::debug!(generation = self.generation, "feed superseded by a direct load");
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.queue.clear();
        self.awaiting_show = false;
        self.prefetching = false;
    }

    /// The next queued text, or `None` with a fetch under way whose result
    /// arrives through [`poll`](Self::poll).
    pub fn next(&mut self) -> Option<ContentItem> {
        if let Some(item) = self.queue.pop_front() {
            self.top_up();
            return Some(item);
        }
        if !self.awaiting_show {
            self.send_fetch(Purpose::Show, None);
        }
        None
    }

    /// The line after `cursor`, from the queue when it is already there.
    pub fn continue_article(&mut self, cursor: ArticleCursor) -> Option<ContentItem> {
        if self
            .queue
            .front()
            .and_then(|item| item.article.as_ref())
            .is_some_and(|next| cursor.is_followed_by(next))
        {
            return self.queue.pop_front();
        }
        self.invalidate();
        self.send_fetch(Purpose::Show, Some(cursor));
        None
    }

    pub fn request_volumes(&mut self) {
        if self.jobs.send(Job::Volumes).is_err() {
            self.pending
                .push_back(FeedEvent::Failed(ContentError::Disconnected));
        }
    }

    /// Everything delivered since the last call, without blocking.
    pub fn poll(&mut self) -> Vec<FeedEvent> {
        let mut events: Vec<FeedEvent> = self.pending.drain(..).collect();
        while let Ok(reply) = self.replies.try_recv() {
            if let Some(event) = self.handle(reply) {
                events.push(event);
            }
        }
        events
    }

    /// Blocks until one event is ready or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<FeedEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.checked_duration_since(Instant::now())?;
            let reply = self.replies.recv_timeout(left).ok()?;
            if let Some(event) = self.handle(reply) {
                return Some(event);
            }
        }
    }

    fn handle(&mut self, reply: Reply) -> Option<FeedEvent> {
        let (generation, purpose, result) = match reply {
            Reply::Fetched {
                generation,
                purpose,
                result,
            } => (generation, purpose, result),
            Reply::Volumes(Ok(volumes)) => return Some(FeedEvent::Volumes(volumes)),
            Reply::Volumes(Err(e)) => {
                tracing::warn!(error = %e, "volume list unavailable");
                return None;
            }
        };

        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "stale content discarded");
            return None;
        }

        match purpose {
            Purpose::Show => {
                self.awaiting_show = false;
                match result {
                    Ok(items) => {
                        let mut items = items.into_iter();
                        let Some(first) = items.next() else {
                            return Some(FeedEvent::Failed(ContentError::Empty));
                        };
                        self.queue.extend(items);
                        self.top_up();
                        Some(FeedEvent::Loaded(first))
                    }
                    Err(e) => {
                        tracing::warn!(category = %self.category, error = %e, "content fetch failed");
                        Some(FeedEvent::Failed(e))
                    }
                }
            }
            Purpose::Prefetch => {
                self.prefetching = false;
                match result {
                    Ok(items) => {
                        self.queue.extend(items);
                        self.top_up();
                    }
                    // No retry here; the next `next()` tops up again.
                    Err(e) => tracing::warn!(error = %e, "prefetch failed"),
                }
                None
            }
        }
    }

    /// Builtin pools are prefetched; volumes stay strictly sequential.
    fn top_up(&mut self) {
        if self.category.is_builtin()
            && !self.prefetching
            && !self.awaiting_show
            && self.queue.len() < self.depth
        {
            self.send_fetch(Purpose::Prefetch, None);
        }
    }

    fn send_fetch(&mut self, purpose: Purpose, next_from: Option<ArticleCursor>) {
        let mistakes = if self.category == Category::Builtin(ReservedCategory::Mistake) {
            self.mistakes.clone()
        } else {
            Vec::new()
        };
        let job = Job::Fetch {
            generation: self.generation,
            purpose,
            request: ContentRequest {
                category: self.category.clone(),
                mistakes,
                next_from,
            },
        };
        if self.jobs.send(job).is_err() {
            if purpose == Purpose::Show {
                self.pending
                    .push_back(FeedEvent::Failed(ContentError::Disconnected));
            }
            return;
        }
        match purpose {
            Purpose::Show => self.awaiting_show = true,
            Purpose::Prefetch => self.prefetching = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    /// Numbered texts tagged with the category; volumes return three lines.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        requests: Mutex<Vec<ContentRequest>>,
    }

    impl ContentSource for CountingSource {
        fn fetch(&self, request: &ContentRequest) -> Result<Vec<ContentItem>, ContentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            match &request.category {
                Category::Builtin(_) => Ok(vec![ContentItem::sentence(format!(
                    "{}-{n}",
                    request.category
                ))]),
                Category::Volume(_) => {
                    let start = request.next_from.map_or(0, |c| c.line_index + 1);
                    Ok((start..3)
                        .map(|i| ContentItem {
                            text: format!("line-{i}"),
                            title: Some("课文".to_string()),
                            article: Some(ArticleCursor {
                                article_id: 1,
                                line_index: i,
                                total_lines: 3,
                            }),
                        })
                        .collect())
                }
            }
        }

        fn volumes(&self) -> Result<Vec<Volume>, ContentError> {
            Ok(vec![Volume {
                id: "grade-1-vol-1".to_string(),
                name: "Grade 1".to_string(),
            }])
        }
    }

    struct FailingSource;

    impl ContentSource for FailingSource {
        fn fetch(&self, _request: &ContentRequest) -> Result<Vec<ContentItem>, ContentError> {
            Err(ContentError::Request("offline".to_string()))
        }

        fn volumes(&self) -> Result<Vec<Volume>, ContentError> {
            Err(ContentError::Request("offline".to_string()))
        }
    }

    fn feed_with(category: &str, depth: usize) -> (Arc<CountingSource>, ContentFeed) {
        let source = Arc::new(CountingSource::default());
        let feed = ContentFeed::new(Box::new(Arc::clone(&source)), Category::parse(category), depth);
        (source, feed)
    }

    fn loaded(feed: &mut ContentFeed) -> ContentItem {
        match feed.wait(WAIT) {
            Some(FeedEvent::Loaded(item)) => item,
            other => panic!("expected a loaded item, got {other:?}"),
        }
    }

    fn settle(feed: &mut ContentFeed, queued: usize) {
        let deadline = Instant::now() + WAIT;
        while feed.queued() < queued && Instant::now() < deadline {
            feed.poll();
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_first_request_fetches_then_prefetches_to_depth() {
        let (_source, mut feed) = feed_with("poem", 3);
        assert!(feed.next().is_none());
        assert!(feed.is_loading());
        let item = loaded(&mut feed);
        assert!(item.text.starts_with("poem-"));
        assert!(!feed.is_loading());

        settle(&mut feed, 3);
        assert_eq!(feed.queued(), 3);
        assert!(feed.next().is_some());
    }

    #[test]
    fn test_switch_discards_stale_delivery() {
        let (_source, mut feed) = feed_with("poem", 1);
        feed.next();
        let before = feed.generation();
        feed.switch_category(Category::parse("tongue"));
        assert_eq!(feed.generation(), before + 1);
        assert_eq!(feed.queued(), 0);
        feed.next();
        let item = loaded(&mut feed);
        assert!(item.text.starts_with("tongue-"), "got {}", item.text);
    }

    #[test]
    fn test_supersede_discards_in_flight_show() {
        let (_source, mut feed) = feed_with("mistake", 1);
        assert!(feed.next().is_none());
        feed.supersede();
        assert!(!feed.is_loading());
        let deadline = Instant::now() + Duration::from_millis(200);
        while Instant::now() < deadline {
            for event in feed.poll() {
                assert!(
                    !matches!(event, FeedEvent::Loaded(_)),
                    "superseded fetch was delivered"
                );
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_volume_lines_queue_without_prefetch() {
        let (source, mut feed) = feed_with("grade-1-vol-1", 3);
        feed.next();
        let first = loaded(&mut feed);
        assert_eq!(first.text, "line-0");
        assert_eq!(feed.queued(), 2);
        thread::sleep(Duration::from_millis(20));
        feed.poll();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let next = feed.continue_article(first.article.unwrap()).unwrap();
        assert_eq!(next.text, "line-1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_continue_article_fetches_when_not_queued() {
        let (source, mut feed) = feed_with("grade-1-vol-1", 3);
        let cursor = ArticleCursor {
            article_id: 1,
            line_index: 0,
            total_lines: 3,
        };
        assert!(feed.continue_article(cursor).is_none());
        let item = loaded(&mut feed);
        assert_eq!(item.text, "line-1");
        let requests = source.requests.lock().unwrap();
        assert_eq!(requests[0].next_from, Some(cursor));
    }

    #[test]
    fn test_mistakes_only_sent_for_review() {
        let (source, mut feed) = feed_with("sentence", 1);
        feed.set_mistakes(vec!['那']);
        feed.next();
        loaded(&mut feed);
        feed.switch_category(Category::Builtin(ReservedCategory::Mistake));
        feed.next();
        loaded(&mut feed);
        let requests = source.requests.lock().unwrap();
        assert!(requests[0].mistakes.is_empty());
        let review = requests
            .iter()
            .find(|r| r.category == Category::Builtin(ReservedCategory::Mistake))
            .unwrap();
        assert_eq!(review.mistakes, vec!['那']);
    }

    #[test]
    fn test_failure_is_reported_and_retryable() {
        let mut feed = ContentFeed::new(Box::new(FailingSource), Category::default(), 3);
        feed.next();
        match feed.wait(WAIT) {
            Some(FeedEvent::Failed(ContentError::Request(msg))) => assert_eq!(msg, "offline"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!feed.is_loading());
        assert!(feed.next().is_none());
        assert!(feed.is_loading());
    }

    #[test]
    fn test_volume_listing() {
        let (_source, mut feed) = feed_with("sentence", 1);
        feed.request_volumes();
        let deadline = Instant::now() + WAIT;
        loop {
            let events = feed.poll();
            if let Some(FeedEvent::Volumes(v)) =
                events.into_iter().find(|e| matches!(e, FeedEvent::Volumes(_)))
            {
                assert_eq!(v[0].id, "grade-1-vol-1");
                break;
            }
            assert!(Instant::now() < deadline, "volumes never arrived");
            thread::sleep(Duration::from_millis(5));
        }
    }
}
