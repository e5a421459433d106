use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::config::{Config, ThemeKind};
use crate::content::feed::{ContentFeed, FeedEvent};
use crate::content::{ArticleCursor, Category, ContentItem, ContentSource, ReservedCategory};
use crate::engine::auto_confirm::AutoConfirm;
use crate::engine::mistakes::{MistakeBook, MistakeEntry};
use crate::engine::practice::{Confirmation, PracticeEngine};
use crate::engine::pronunciation::{PinyinDictionary, PronunciationSource};
use crate::session::report::{self, Period};
use crate::session::stat::SessionHistory;
use crate::session::tracker::{SessionSummary, SessionTracker};
use crate::store::Persistence;
use crate::ui::components::menu::Menu;
use crate::ui::components::stats_dashboard::TAB_COUNT;
use crate::ui::theme::Theme;

/// Characters sent along with a review request.
const REVIEW_CHARACTERS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Practice,
    Mistakes,
    Stats,
    Summary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Startup choices that override what was persisted.
#[derive(Clone, Debug, Default)]
pub struct StartOptions {
    pub category: Option<Category>,
    pub theme: Option<ThemeKind>,
    pub text: Option<String>,
    pub report_dir: Option<PathBuf>,
}

pub struct App<P: PronunciationSource = PinyinDictionary> {
    pub screen: AppScreen,
    pub config: Config,
    pub theme_kind: ThemeKind,
    pub theme: Theme,
    pub engine: PracticeEngine<P>,
    pub tracker: SessionTracker,
    pub mistakes: MistakeBook,
    pub history: SessionHistory,
    pub feed: ContentFeed,
    pub auto_confirm: AutoConfirm,
    pub persistence: Persistence,
    pub menu: Menu,
    pub menu_open: bool,
    pub title: Option<String>,
    pub article: Option<ArticleCursor>,
    pub notice: Option<Notice>,
    pub last_summary: Option<SessionSummary>,
    pub mistake_selected: usize,
    pub mistake_confirm_clear: bool,
    pub stats_tab: usize,
    pub stats_period: Period,
    pub should_quit: bool,
    report_dir: Option<PathBuf>,
}

impl<P: PronunciationSource> App<P> {
    pub fn new(
        config: Config,
        persistence: Persistence,
        source: Box<dyn ContentSource>,
        pronunciations: P,
        options: StartOptions,
    ) -> Self {
        let mistakes = persistence.load_mistakes();
        let history = persistence.load_sessions();
        let theme_kind = options.theme.unwrap_or_else(|| persistence.load_theme());
        let category = options.category.clone().unwrap_or_else(|| {
            Category::parse(
                &persistence
                    .load_category()
                    .unwrap_or_else(|| config.default_category.clone()),
            )
        });

        let mut feed = ContentFeed::new(source, category.clone(), config.prefetch_depth);
        feed.request_volumes();
        let mut menu = Menu::new();
        menu.select(&category);

        let mut app = Self {
            screen: AppScreen::Practice,
            theme: Theme::for_kind(theme_kind),
            theme_kind,
            engine: PracticeEngine::new(pronunciations),
            tracker: SessionTracker::new(),
            mistakes,
            history,
            feed,
            auto_confirm: AutoConfirm::new(config.auto_confirm_ms),
            persistence,
            menu,
            menu_open: false,
            title: None,
            article: None,
            notice: None,
            last_summary: None,
            mistake_selected: 0,
            mistake_confirm_clear: false,
            stats_tab: 0,
            stats_period: Period::default(),
            should_quit: false,
            report_dir: options.report_dir,
            config,
        };

        match options.text {
            Some(text) if !text.trim().is_empty() => {
                app.show_direct(ContentItem::sentence(text.trim()))
            }
            _ => app.request_next(),
        }
        app
    }

    pub fn category(&self) -> &Category {
        self.feed.category()
    }

    fn show(&mut self, item: ContentItem) {
        self.auto_confirm.cancel();
        self.engine.load(&item.text);
        self.title = item.title;
        self.article = item.article;
        self.notice = None;
        if self.engine.is_exhausted() {
            self.on_exhausted();
        }
    }

    /// Loads a text that did not come from the feed. Anything the feed still
    /// has in flight was asked for before it and must not replace it.
    fn show_direct(&mut self, item: ContentItem) {
        self.feed.supersede();
        self.show(item);
    }

    /// Next text from the queue, or a fetch whose result arrives on a tick.
    pub fn request_next(&mut self) {
        self.feed
            .set_mistakes(self.mistakes.top_characters(REVIEW_CHARACTERS));
        match self.feed.next() {
            Some(item) => self.show(item),
            None => self.notice = Some(Notice::info("Loading...")),
        }
    }

    fn continue_article(&mut self, cursor: ArticleCursor) {
        match self.feed.continue_article(cursor) {
            Some(item) => self.show(item),
            None => self.notice = Some(Notice::info("Loading next line...")),
        }
    }

    /// Space on an exhausted text: the next article line or the next text.
    pub fn advance(&mut self) {
        match (self.category().is_builtin(), self.article) {
            (false, Some(cursor)) => self.continue_article(cursor),
            _ => self.request_next(),
        }
    }

    fn on_exhausted(&mut self) {
        match (self.category().is_builtin(), self.article) {
            // Curriculum volumes move straight on to the next line.
            (false, Some(cursor)) => self.continue_article(cursor),
            _ => self.notice = Some(Notice::info("Done! Press Space for the next text.")),
        }
    }

    pub fn type_key(&mut self, ch: char, now: Instant) {
        if self.engine.append_key(ch) {
            self.auto_confirm.rearm(&self.engine, now);
        }
    }

    pub fn backspace(&mut self, now: Instant) {
        if self.engine.backspace() {
            self.auto_confirm.rearm(&self.engine, now);
        }
    }

    /// Confirms the buffer, or moves on when the text is finished.
    pub fn space(&mut self) {
        if self.engine.is_exhausted() {
            if !self.feed.is_loading() {
                self.advance();
            }
            return;
        }
        if let Some(confirmation) = self.engine.confirm() {
            self.after_confirm(confirmation);
        }
    }

    fn after_confirm(&mut self, confirmation: Confirmation) {
        self.auto_confirm.cancel();
        self.tracker.observe(&confirmation);
        if let Some(ref mistake) = confirmation.mistake {
            self.mistakes.record_mistake(mistake);
            self.persistence.save_mistakes(&self.mistakes);
        }
        if confirmation.exhausted {
            self.on_exhausted();
        }
    }

    /// Feed deliveries, the session countdown and auto-confirm.
    pub fn tick(&mut self, now: Instant, wall: DateTime<Utc>) {
        for event in self.feed.poll() {
            match event {
                FeedEvent::Loaded(item) => self.show(item),
                FeedEvent::Failed(e) => {
                    self.notice = Some(Notice::error(format!(
                        "Couldn't load a new text ({e}). Press Space to retry."
                    )));
                }
                FeedEvent::Volumes(volumes) => self.menu.set_volumes(&volumes),
            }
        }

        if let Some(summary) = self.tracker.tick(now, wall) {
            self.finish_session(summary);
        }

        if let Some(confirmation) = self.auto_confirm.poll(&mut self.engine, now) {
            self.after_confirm(confirmation);
        }
    }

    /// Starts a timed session over a fresh copy of the current text.
    pub fn start_session(&mut self, now: Instant, wall: DateTime<Utc>) {
        if self.tracker.start(self.config.session_secs(), now, wall) {
            let text = self.engine.text();
            self.auto_confirm.cancel();
            self.feed.supersede();
            self.engine.load(&text);
            self.last_summary = None;
        }
    }

    pub fn end_session(&mut self, wall: DateTime<Utc>) {
        if let Some(summary) = self.tracker.end(wall) {
            self.finish_session(summary);
        }
    }

    pub fn reset_session(&mut self) {
        self.tracker.reset();
    }

    fn finish_session(&mut self, summary: SessionSummary) {
        if let Some(stat) = summary.record() {
            self.history.push(stat);
            self.persistence.save_sessions(&self.history);
        }
        self.last_summary = Some(summary);
        self.screen = AppScreen::Summary;
    }

    pub fn switch_category(&mut self, category: Category) {
        self.menu.select(&category);
        self.persistence.save_category(category.as_str());
        self.feed.switch_category(category);
        self.title = None;
        self.article = None;
        self.request_next();
    }

    pub fn toggle_theme(&mut self) {
        self.theme_kind = self.theme_kind.toggle();
        self.theme = Theme::for_kind(self.theme_kind);
        self.persistence.save_theme(self.theme_kind);
    }

    pub fn open_menu(&mut self) {
        let current = self.category().clone();
        self.menu.select(&current);
        self.menu_open = true;
    }

    pub fn choose_menu_item(&mut self) {
        self.menu_open = false;
        if let Some(category) = self.menu.selected_category().cloned() {
            if &category != self.category() {
                self.switch_category(category);
            }
        }
    }

    pub fn go_to_practice(&mut self) {
        self.screen = AppScreen::Practice;
        self.mistake_confirm_clear = false;
    }

    pub fn go_to_mistakes(&mut self) {
        self.screen = AppScreen::Mistakes;
        self.mistake_selected = self
            .mistake_selected
            .min(self.mistakes.len().saturating_sub(1));
        self.mistake_confirm_clear = false;
    }

    pub fn go_to_stats(&mut self) {
        self.screen = AppScreen::Stats;
        self.notice = None;
    }

    pub fn sorted_mistakes(&self) -> Vec<&MistakeEntry> {
        self.mistakes.sorted_by_count()
    }

    pub fn select_next_mistake(&mut self) {
        if !self.mistakes.is_empty() {
            self.mistake_selected = (self.mistake_selected + 1).min(self.mistakes.len() - 1);
        }
    }

    pub fn select_prev_mistake(&mut self) {
        self.mistake_selected = self.mistake_selected.saturating_sub(1);
    }

    pub fn delete_selected_mistake(&mut self) {
        let Some((character, correct)) = self
            .sorted_mistakes()
            .get(self.mistake_selected)
            .map(|e| (e.character, e.correct.clone()))
        else {
            return;
        };
        if self.mistakes.remove(character, &correct) {
            self.persistence.save_mistakes(&self.mistakes);
            self.mistake_selected = self
                .mistake_selected
                .min(self.mistakes.len().saturating_sub(1));
        }
    }

    pub fn clear_mistakes(&mut self) {
        self.mistakes.clear();
        self.persistence.save_mistakes(&self.mistakes);
        self.mistake_selected = 0;
        self.mistake_confirm_clear = false;
    }

    /// Loads every mistaken character as one text, under the review category.
    pub fn practice_mistakes(&mut self) {
        let text = self.mistakes.unique_characters();
        if text.is_empty() {
            self.notice = Some(Notice::info("No mistakes to review yet."));
            return;
        }
        let review = Category::Builtin(ReservedCategory::Mistake);
        if self.category() != &review {
            self.menu.select(&review);
            self.persistence.save_category(review.as_str());
            self.feed.switch_category(review);
        }
        self.show_direct(ContentItem {
            text,
            title: Some("Mistake review".to_string()),
            article: None,
        });
        self.go_to_practice();
    }

    pub fn next_stats_tab(&mut self) {
        self.stats_tab = (self.stats_tab + 1) % TAB_COUNT;
    }

    pub fn prev_stats_tab(&mut self) {
        self.stats_tab = (self.stats_tab + TAB_COUNT - 1) % TAB_COUNT;
    }

    pub fn cycle_period(&mut self) {
        self.stats_period = self.stats_period.next();
    }

    /// Writes the markdown report for the selected period.
    pub fn save_report(&mut self, now: DateTime<Utc>) {
        let Some(report) = report::learning_report(
            self.history.sessions(),
            &self.mistakes,
            self.stats_period,
            now,
        ) else {
            self.notice = Some(Notice::info("No sessions to report on yet."));
            return;
        };
        let Some(dir) = self.report_dir.clone() else {
            self.notice = Some(Notice::error("No directory to save reports in."));
            return;
        };
        let path = dir.join(format!("report-{}.md", now.format("%Y%m%d-%H%M%S")));
        let result = fs::create_dir_all(&dir).and_then(|_| fs::write(&path, report));
        self.notice = Some(match result {
            Ok(()) => Notice::info(format!("Report saved to {}", path.display())),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "report not saved");
                Notice::error(format!("Couldn't save report: {e}"))
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentError, ContentRequest, Volume};
    use crate::engine::practice::SlotStatus;
    use crate::engine::pronunciation::TableDictionary;
    use std::time::Duration;

    struct FixedSource(Vec<&'static str>);

    impl ContentSource for FixedSource {
        fn fetch(&self, request: &ContentRequest) -> Result<Vec<ContentItem>, ContentError> {
            match &request.category {
                Category::Builtin(_) => Ok(self.0.iter().map(|t| ContentItem::sentence(*t)).collect()),
                Category::Volume(_) => {
                    let line = request.next_from.map_or(0, |c| c.line_index + 1);
                    Ok(vec![ContentItem {
                        text: ["你好", "好你"][line as usize % 2].to_string(),
                        title: Some("课文".to_string()),
                        article: Some(ArticleCursor {
                            article_id: 0,
                            line_index: line,
                            total_lines: 9,
                        }),
                    }])
                }
            }
        }

        fn volumes(&self) -> Result<Vec<Volume>, ContentError> {
            Ok(Vec::new())
        }
    }

    fn table() -> TableDictionary {
        TableDictionary::from_pairs(&[('你', &["nǐ"]), ('好', &["hǎo"])])
    }

    fn app_with(options: StartOptions, texts: Vec<&'static str>) -> App<TableDictionary> {
        App::new(
            Config::default(),
            Persistence::in_memory(),
            Box::new(FixedSource(texts)),
            table(),
            options,
        )
    }

    fn text_app(text: &str) -> App<TableDictionary> {
        app_with(
            StartOptions {
                text: Some(text.to_string()),
                ..Default::default()
            },
            vec!["好你"],
        )
    }

    fn type_str(app: &mut App<TableDictionary>, s: &str) {
        for ch in s.chars() {
            app.type_key(ch, Instant::now());
        }
    }

    fn wait_for_text(app: &mut App<TableDictionary>, text: &str) {
        for _ in 0..500 {
            app.tick(Instant::now(), Utc::now());
            if app.engine.text() == text {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("text {text:?} never loaded, have {:?}", app.engine.text());
    }

    #[test]
    fn test_initial_text_skips_fetch() {
        let app = text_app("你好");
        assert_eq!(app.engine.text(), "你好");
        assert_eq!(app.engine.cursor(), 0);
    }

    #[test]
    fn test_fetched_text_arrives_on_tick() {
        let mut app = app_with(StartOptions::default(), vec!["好你"]);
        wait_for_text(&mut app, "好你");
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_wrong_answer_records_and_persists_mistake() {
        let mut app = text_app("你好");
        type_str(&mut app, "ma");
        app.space();
        assert_eq!(app.engine.slots()[0].status, SlotStatus::Wrong);
        assert_eq!(app.mistakes.len(), 1);
        assert_eq!(app.persistence.load_mistakes(), app.mistakes);
    }

    #[test]
    fn test_exhausted_builtin_waits_for_space() {
        let mut app = text_app("你好");
        type_str(&mut app, "ni");
        app.space();
        type_str(&mut app, "hao");
        app.space();
        assert!(app.engine.is_exhausted());
        assert_eq!(app.engine.accuracy(), 100);
        assert!(app.notice.as_ref().unwrap().text.contains("Space"));

        app.space();
        wait_for_text(&mut app, "好你");
    }

    #[test]
    fn test_session_counts_and_records() {
        let mut app = text_app("你好");
        let now = Instant::now();
        let wall = Utc::now();
        type_str(&mut app, "n");
        app.start_session(now, wall);
        // Starting reloads the text.
        assert_eq!(app.engine.buffer(), "");
        type_str(&mut app, "ni");
        app.space();
        type_str(&mut app, "ma");
        app.space();
        app.end_session(wall + chrono::Duration::seconds(30));

        assert_eq!(app.screen, AppScreen::Summary);
        let summary = app.last_summary.clone().unwrap();
        assert_eq!(summary.counters.typed, 2);
        assert_eq!(summary.accuracy, 50);
        assert_eq!(app.history.len(), 1);
        assert_eq!(app.persistence.load_sessions().len(), 1);
    }

    #[test]
    fn test_empty_session_not_recorded() {
        let mut app = text_app("你好");
        let wall = Utc::now();
        app.start_session(Instant::now(), wall);
        app.end_session(wall + chrono::Duration::seconds(5));
        assert!(app.history.is_empty());
        assert_eq!(app.screen, AppScreen::Summary);
    }

    #[test]
    fn test_countdown_finishes_session_on_tick() {
        let mut app = text_app("你好");
        app.config.session_minutes = 0;
        let now = Instant::now();
        let wall = Utc::now();
        app.start_session(now, wall);
        type_str(&mut app, "ni");
        app.space();
        app.tick(now + Duration::from_secs(10), wall + chrono::Duration::seconds(10));
        assert!(!app.tracker.is_active());
        assert_eq!(app.history.len(), 1);
    }

    #[test]
    fn test_auto_confirm_fires_after_delay() {
        let mut app = text_app("你好");
        app.auto_confirm = AutoConfirm::new(300);
        let now = Instant::now();
        app.type_key('n', now);
        app.type_key('i', now);
        app.tick(now + Duration::from_millis(100), Utc::now());
        assert_eq!(app.engine.cursor(), 0);
        app.tick(now + Duration::from_millis(400), Utc::now());
        assert_eq!(app.engine.cursor(), 1);
        assert_eq!(app.engine.slots()[0].status, SlotStatus::Correct);
    }

    #[test]
    fn test_switch_category_persists_and_fetches() {
        let mut app = text_app("你好");
        app.switch_category(Category::Builtin(ReservedCategory::Poem));
        assert_eq!(app.persistence.load_category().as_deref(), Some("poem"));
        wait_for_text(&mut app, "好你");
    }

    #[test]
    fn test_volume_continues_to_next_line() {
        let mut app = app_with(
            StartOptions {
                category: Some(Category::parse("grade-1-vol-1")),
                ..Default::default()
            },
            Vec::new(),
        );
        wait_for_text(&mut app, "你好");
        assert_eq!(app.title.as_deref(), Some("课文"));
        type_str(&mut app, "ni");
        app.space();
        type_str(&mut app, "hao");
        app.space();
        wait_for_text(&mut app, "好你");
        assert_eq!(app.article.unwrap().line_index, 1);
    }

    #[test]
    fn test_practice_mistakes_loads_unique_characters() {
        let mut app = text_app("你好你");
        type_str(&mut app, "ma");
        app.space();
        type_str(&mut app, "ha");
        app.space();
        app.go_to_mistakes();
        app.practice_mistakes();
        assert_eq!(app.screen, AppScreen::Practice);
        assert_eq!(app.category(), &Category::Builtin(ReservedCategory::Mistake));
        assert_eq!(app.engine.text().chars().count(), 2);
        assert_eq!(app.title.as_deref(), Some("Mistake review"));
    }

    /// Holds every fetch until the test lets it through.
    struct GatedSource {
        gate: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl ContentSource for GatedSource {
        fn fetch(&self, _request: &ContentRequest) -> Result<Vec<ContentItem>, ContentError> {
            let _ = self.gate.lock().unwrap().recv();
            Ok(vec![ContentItem::sentence("你好你好")])
        }

        fn volumes(&self) -> Result<Vec<Volume>, ContentError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_late_fetch_does_not_replace_review_text() {
        let (release, gate) = std::sync::mpsc::channel();
        let mut app = App::new(
            Config::default(),
            Persistence::in_memory(),
            Box::new(GatedSource {
                gate: std::sync::Mutex::new(gate),
            }),
            table(),
            StartOptions {
                category: Some(Category::Builtin(ReservedCategory::Mistake)),
                ..Default::default()
            },
        );
        assert!(app.feed.is_loading());

        app.mistakes.record('好', "ha", "hǎo");
        app.practice_mistakes();
        assert_eq!(app.engine.text(), "好");
        app.type_key('h', Instant::now());

        release.send(()).unwrap();
        for _ in 0..40 {
            app.tick(Instant::now(), Utc::now());
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(app.engine.text(), "好");
        assert_eq!(app.engine.buffer(), "h");
        assert_eq!(app.title.as_deref(), Some("Mistake review"));
    }

    #[test]
    fn test_delete_and_clear_mistakes() {
        let mut app = text_app("你好");
        type_str(&mut app, "ma");
        app.space();
        type_str(&mut app, "ha");
        app.space();
        assert_eq!(app.mistakes.len(), 2);
        app.go_to_mistakes();
        app.delete_selected_mistake();
        assert_eq!(app.mistakes.len(), 1);
        assert_eq!(app.persistence.load_mistakes().len(), 1);
        app.clear_mistakes();
        assert!(app.persistence.load_mistakes().is_empty());
    }

    #[test]
    fn test_toggle_theme_persists() {
        let mut app = text_app("你好");
        assert_eq!(app.theme_kind, ThemeKind::Light);
        app.toggle_theme();
        assert_eq!(app.theme_kind, ThemeKind::Dark);
        assert_eq!(app.persistence.load_theme(), ThemeKind::Dark);
    }

    #[test]
    fn test_save_report_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = app_with(
            StartOptions {
                text: Some("你好".to_string()),
                report_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            Vec::new(),
        );
        app.save_report(Utc::now());
        assert!(app.notice.as_ref().unwrap().text.contains("No sessions"));

        let wall = Utc::now();
        app.start_session(Instant::now(), wall);
        type_str(&mut app, "ni");
        app.space();
        app.end_session(wall + chrono::Duration::seconds(20));
        app.save_report(Utc::now());
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
