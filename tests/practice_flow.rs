use std::time::Duration;

use chrono::Utc;
use pinydr::config::Config;
use pinydr::content::feed::{ContentFeed, FeedEvent};
use pinydr::content::samples::SampleSource;
use pinydr::content::{Category, ContentItem};
use pinydr::engine::{MistakeBook, PinyinDictionary, PracticeEngine, SlotStatus};
use pinydr::session::SessionHistory;
use pinydr::session::report::{self, Period};
use pinydr::store::Persistence;
use pinydr::store::json_store::JsonStore;

fn type_and_confirm(engine: &mut PracticeEngine, input: &str) -> bool {
    for ch in input.chars() {
        engine.append_key(ch);
    }
    engine.confirm().map(|c| c.correct).unwrap_or(false)
}

fn wait_loaded(feed: &mut ContentFeed) -> ContentItem {
    loop {
        match feed.wait(Duration::from_secs(5)) {
            Some(FeedEvent::Loaded(item)) => return item,
            Some(FeedEvent::Volumes(_)) => continue,
            Some(FeedEvent::Failed(e)) => panic!("fetch failed: {e}"),
            None => panic!("no content within timeout"),
        }
    }
}

#[test]
fn typing_with_bundled_dictionary() {
    let mut engine = PracticeEngine::new(PinyinDictionary::new());
    engine.load("你好，世界");

    // Punctuation is skipped; four graded targets.
    assert_eq!(engine.target_count(), 4);
    assert!(type_and_confirm(&mut engine, "ni3"));
    assert!(type_and_confirm(&mut engine, "HAO"));
    assert!(!type_and_confirm(&mut engine, "si"));
    assert!(type_and_confirm(&mut engine, "jie4"));

    assert!(engine.is_exhausted());
    assert_eq!(engine.accuracy(), 75);
    assert_eq!(engine.slots()[3].status, SlotStatus::Wrong);
    assert_eq!(engine.slots()[3].recorded_answer.as_deref(), Some("shì"));
}

#[test]
fn polyphones_accept_every_reading() {
    let mut engine = PracticeEngine::new(PinyinDictionary::new());
    engine.load("行行");
    assert!(type_and_confirm(&mut engine, "xing"));
    assert!(type_and_confirm(&mut engine, "hang2"));
}

#[test]
fn mistakes_and_sessions_survive_reopen() {
    let dir = tempfile::TempDir::new().unwrap();

    let mut mistakes = MistakeBook::new();
    mistakes.record('那', "na3", "nà");
    mistakes.record('那', "na3", "nà");
    mistakes.record('拔', "bo", "bá");
    {
        let mut persistence = Persistence::new(JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap());
        persistence.save_mistakes(&mistakes);
        persistence.save_category("idiom");
    }

    let persistence = Persistence::new(JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap());
    let loaded = persistence.load_mistakes();
    assert_eq!(loaded, mistakes);
    assert_eq!(loaded.top_characters(10), vec!['那', '拔']);
    assert_eq!(persistence.load_category().as_deref(), Some("idiom"));
    assert!(persistence.load_sessions().is_empty());
}

#[test]
fn export_moves_data_between_stores() {
    let source_dir = tempfile::TempDir::new().unwrap();
    let target_dir = tempfile::TempDir::new().unwrap();

    let mut source = Persistence::new(JsonStore::with_base_dir(source_dir.path().to_path_buf()).unwrap());
    let mut mistakes = MistakeBook::new();
    mistakes.record('梁', "lang", "liáng");
    source.save_mistakes(&mistakes);

    let json = serde_json::to_string(&source.export_all(&Config::default())).unwrap();

    let mut target = Persistence::new(JsonStore::with_base_dir(target_dir.path().to_path_buf()).unwrap());
    target.import_all(&serde_json::from_str(&json).unwrap()).unwrap();
    assert_eq!(target.load_mistakes(), mistakes);
}

#[test]
fn volume_feed_walks_article_lines() {
    let mut feed = ContentFeed::new(
        Box::new(SampleSource::with_seed(7)),
        Category::parse("grade-1-vol-1"),
        3,
    );
    assert!(feed.next().is_none());
    let first = wait_loaded(&mut feed);
    let cursor = first.article.unwrap();
    assert_eq!(cursor.line_index, 0);
    assert_eq!(first.title.as_deref(), Some("秋天"));

    // The rest of the article came with the first line.
    let second = feed.continue_article(cursor).unwrap();
    assert_eq!(second.article.unwrap().line_index, 1);
}

#[test]
fn builtin_feed_serves_practice_text() {
    let mut feed = ContentFeed::new(Box::new(SampleSource::with_seed(1)), Category::parse("poem"), 2);
    assert!(feed.next().is_none());
    let item = wait_loaded(&mut feed);

    let mut engine = PracticeEngine::new(PinyinDictionary::new());
    engine.load(&item.text);
    assert!(engine.target_count() > 0);
    assert!(item.article.is_none());
}

#[test]
fn report_needs_history() {
    let history = SessionHistory::new();
    let mistakes = MistakeBook::new();
    assert!(report::learning_report(history.sessions(), &mistakes, Period::All, Utc::now()).is_none());
}
