mod common;

use std::time::Duration;

use common::{comment, story, ApiCall, FakeApi};
use hnac_core::{JobContext, JobId, Settings, SourceOverrides, StoryItem};
use hnac_engine::{HackernewsStories, Operation, Source, SourceError};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::Instant;

fn configured(api: FakeApi, poll: f64, backoff: f64, retries: u32) -> HackernewsStories {
    let mut source = HackernewsStories::new(api);
    source.configure(&Settings {
        source: SourceOverrides {
            poll_interval_seconds: Some(poll),
            backoff_seconds: Some(backoff),
            max_retry_attempts: Some(retries),
        },
        ..Settings::default()
    });
    source
}

async fn drain(source: &mut HackernewsStories) -> Result<Vec<StoryItem>, SourceError> {
    let mut items = Vec::new();
    while let Some(item) = source.next_item().await? {
        items.push(item);
    }
    Ok(items)
}

fn ids(items: &[StoryItem]) -> Vec<u64> {
    items.iter().map(|item| item.id).collect()
}

#[tokio::test(start_paused = true)]
async fn yields_stories_in_api_order() {
    let api = FakeApi::new(vec![11976079, 12299134, 5])
        .with_item(11976079, story(11976079))
        .with_item(12299134, story(12299134))
        .with_item(5, story(5));
    let mut source = configured(api.clone(), 0.0, 0.0, 3);

    let items = drain(&mut source).await.unwrap();

    assert_eq!(ids(&items), vec![11976079, 12299134, 5]);
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::NewStoryIds,
            ApiCall::Item(11976079),
            ApiCall::Item(12299134),
            ApiCall::Item(5),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_bodies_are_skipped_silently() {
    let mut no_url = story(3);
    no_url.as_object_mut().unwrap().remove("url");
    let api = FakeApi::new(vec![1, 2, 3, 4, 5])
        .with_item(1, comment(1))
        .with_item(2, story(2))
        .with_item(3, no_url)
        .with_item(5, json!([1, 2]));
    let mut source = configured(api, 0.0, 0.0, 3);

    let items = drain(&mut source).await.unwrap();

    assert_eq!(ids(&items), vec![2]);
    let stats = source.stats();
    assert_eq!(stats.ids_listed, 5);
    assert_eq!(stats.items_yielded, 1);
    assert_eq!(stats.items_skipped, 4);
}

#[tokio::test(start_paused = true)]
async fn id_list_recovers_within_budget() {
    let api = FakeApi::new(vec![7]).with_item(7, story(7)).failing_id_list(2);
    let mut source = configured(api.clone(), 0.0, 5.0, 3);
    let start = Instant::now();

    let items = drain(&mut source).await.unwrap();

    assert_eq!(ids(&items), vec![7]);
    assert_eq!(api.count(ApiCall::NewStoryIds), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn id_list_exhaustion_makes_exactly_budget_plus_one_attempts() {
    let api = FakeApi::new(vec![7]).with_item(7, story(7)).failing_id_list(10);
    let mut source = configured(api.clone(), 0.0, 1.0, 3);

    let err = source.next_item().await.unwrap_err();

    assert!(matches!(
        err,
        SourceError::RetryExhausted {
            operation: Operation::NewStoryIds,
            attempts: 4,
            ..
        }
    ));
    assert_eq!(api.count(ApiCall::NewStoryIds), 4);
    assert_eq!(api.count(ApiCall::Item(7)), 0);

    // The sequence is terminal after a fatal error.
    assert!(source.next_item().await.unwrap().is_none());
    assert_eq!(api.count(ApiCall::NewStoryIds), 4);
}

#[tokio::test(start_paused = true)]
async fn failure_counter_does_not_leak_across_items() {
    // Each item alone stays within budget; together they would not.
    let api = FakeApi::new(vec![1, 2, 3])
        .with_item(1, story(1))
        .with_item(2, story(2))
        .with_item(3, story(3))
        .failing_item(1, 3)
        .failing_item(2, 3)
        .failing_item(3, 2);
    let mut source = configured(api.clone(), 0.0, 0.5, 3);

    let items = drain(&mut source).await.unwrap();

    assert_eq!(ids(&items), vec![1, 2, 3]);
    assert_eq!(api.count(ApiCall::Item(1)), 4);
    assert_eq!(api.count(ApiCall::Item(2)), 4);
    assert_eq!(api.count(ApiCall::Item(3)), 3);
}

#[tokio::test(start_paused = true)]
async fn item_exhaustion_is_fatal_and_stops_the_sequence() {
    let api = FakeApi::new(vec![100, 200, 300])
        .with_item(100, story(100))
        .with_item(200, story(200))
        .with_item(300, story(300))
        .failing_item(200, 4);
    let mut source = configured(api.clone(), 0.0, 0.0, 3);

    assert_eq!(source.next_item().await.unwrap().map(|i| i.id), Some(100));
    let err = source.next_item().await.unwrap_err();

    assert!(matches!(
        err,
        SourceError::RetryExhausted {
            operation: Operation::Item(200),
            attempts: 4,
            ..
        }
    ));
    assert_eq!(api.count(ApiCall::Item(200)), 4);
    assert!(source.next_item().await.unwrap().is_none());
    assert_eq!(api.count(ApiCall::Item(300)), 0);
}

#[tokio::test(start_paused = true)]
async fn requests_are_spaced_by_poll_interval() {
    let api = FakeApi::new(vec![1, 2, 3])
        .with_item(1, story(1))
        .with_item(2, comment(2))
        .with_item(3, story(3));
    let mut source = configured(api.clone(), 1.5, 0.0, 3);

    drain(&mut source).await.unwrap();

    let timeline = api.timeline();
    assert_eq!(timeline.len(), 4);
    for pair in timeline.windows(2) {
        let gap = pair[1].1 - pair[0].1;
        assert!(gap >= Duration::from_millis(1500), "gap {gap:?} too short");
    }
    let total = timeline[3].1 - timeline[0].1;
    assert_eq!(total, Duration::from_millis(4500));
}

#[tokio::test(start_paused = true)]
async fn no_throttle_sleep_when_consumer_is_slow() {
    let api = FakeApi::new(vec![1, 2])
        .with_item(1, story(1))
        .with_item(2, story(2));
    let mut source = configured(api.clone(), 1.0, 0.0, 3);

    source.next_item().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    let before = Instant::now();
    source.next_item().await.unwrap();

    assert_eq!(before.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn job_started_resets_a_finished_sequence() {
    let api = FakeApi::new(vec![1]).with_item(1, story(1));
    let mut source = configured(api.clone(), 0.0, 0.0, 3);
    let context = JobContext {
        job_id: JobId::new(),
        started_at: chrono::Utc::now(),
    };

    source.job_started(&context).await;
    assert_eq!(ids(&drain(&mut source).await.unwrap()), vec![1]);
    source.job_finished(&context).await;

    source.job_started(&context).await;
    assert_eq!(ids(&drain(&mut source).await.unwrap()), vec![1]);
    assert_eq!(api.count(ApiCall::NewStoryIds), 2);
}

#[test]
fn configure_keeps_defaults_for_missing_keys() {
    let mut source = HackernewsStories::new(FakeApi::default());
    source.configure(&Settings {
        source: SourceOverrides {
            max_retry_attempts: Some(9),
            ..SourceOverrides::default()
        },
        ..Settings::default()
    });
    let settings = source.settings();
    assert_eq!(settings.max_retry_attempts, 9);
    assert_eq!(settings.poll_interval_seconds, 1.0);
    assert_eq!(settings.backoff_seconds, 5.0);
}
