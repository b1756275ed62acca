use super::*;
use guildfetch_test_utils::{guild::TEST_CHANNEL_ID, member::test_members};

fn spawn_windowed(
    tc: &TestCase,
    options: WindowedListOptions,
) -> tokio::task::JoinHandle<GfResult<MemberMap>> {
    let r = tc.retrieval.clone();
    tokio::task::spawn(async move { r.fetch_windowed_list(options).await })
}

fn ranges_of(message: &PushMessage) -> Vec<ListRange> {
    match message {
        PushMessage::SubscribeRanges(s) => {
            assert_eq!(TEST_GUILD_ID, s.guild_id);
            assert_eq!(TEST_CHANNEL_ID, s.channel_id);
            s.ranges.clone()
        }
        oth => panic!("expected a subscription, got {oth:?}"),
    }
}

fn sync(range: ListRange, items: Vec<Member>) -> PushEvent {
    list_update(TEST_CHANNEL_ID, vec![ListOp::Sync { range, items }])
}

fn invalidate(range: ListRange) -> PushEvent {
    list_update(TEST_CHANNEL_ID, vec![ListOp::Invalidate { range }])
}

#[tokio::test(start_paused = true)]
async fn sync_of_the_window_completes() {
    let tc = TestCase::new(MemPushChannel::create()).await;
    let task = spawn_windowed(&tc, WindowedListOptions::new(TEST_CHANNEL_ID));

    let sent = tc.wait_sent(1).await;
    assert_eq!(vec![ListRange(0, 99)], ranges_of(&sent[0]));

    let members = test_members(TEST_GUILD_ID, 100);
    tc.push.emit(sync(ListRange(0, 99), members));

    assert_eq!(100, task.await.unwrap().unwrap().len());
    assert_eq!(100, tc.store.count(TEST_GUILD_ID).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn double_range_merges_both_windows() {
    let tc = TestCase::new(MemPushChannel::create()).await;
    let task = spawn_windowed(
        &tc,
        WindowedListOptions {
            offset: 200,
            double_range: true,
            ..WindowedListOptions::new(TEST_CHANNEL_ID)
        },
    );

    let sent = tc.wait_sent(1).await;
    assert_eq!(
        vec![ListRange(0, 99), ListRange(200, 299)],
        ranges_of(&sent[0])
    );

    let members = test_members(TEST_GUILD_ID, 150);
    tc.push.emit(list_update(
        TEST_CHANNEL_ID,
        vec![
            ListOp::Sync {
                range: ListRange(0, 99),
                items: members[..100].to_vec(),
            },
            ListOp::Delete { index: 3 },
            ListOp::Insert {
                index: 4,
                item: members[100].clone(),
            },
        ],
    ));
    tc.push.emit(sync(ListRange(200, 299), members[101..].to_vec()));

    assert_eq!(150, task.await.unwrap().unwrap().len());
}

#[tokio::test(start_paused = true)]
async fn invalidation_resubscribes_until_retries_run_out() {
    let tc = TestCase::new(MemPushChannel::create()).await;
    let task = spawn_windowed(
        &tc,
        WindowedListOptions {
            max_retries: Some(3),
            ..WindowedListOptions::new(TEST_CHANNEL_ID)
        },
    );

    let first = tc.wait_sent(1).await.remove(0);

    for n in 1..=3 {
        tc.push.emit(invalidate(ListRange(0, 99)));
        let sent = tc.wait_sent(n + 1).await;
        assert_eq!(first, sent[n]);
    }

    tc.push.emit(invalidate(ListRange(0, 99)));
    match task.await.unwrap() {
        Err(GfError::Invalidated { range }) => {
            assert_eq!(ListRange(0, 99), range)
        }
        oth => panic!("unexpected outcome {oth:?}"),
    }

    // one subscription and exactly three resubscriptions
    assert_eq!(4, tc.push.sent().len());
}

#[tokio::test(start_paused = true)]
async fn double_range_invalidation_counts_once_per_update() {
    let tc = TestCase::new(MemPushChannel::create()).await;
    let task = spawn_windowed(
        &tc,
        WindowedListOptions {
            offset: 200,
            double_range: true,
            max_retries: Some(3),
            ..WindowedListOptions::new(TEST_CHANNEL_ID)
        },
    );
    tc.wait_sent(1).await;

    let invalidate_both = || {
        list_update(
            TEST_CHANNEL_ID,
            vec![
                ListOp::Invalidate {
                    range: ListRange(0, 99),
                },
                ListOp::Invalidate {
                    range: ListRange(200, 299),
                },
            ],
        )
    };

    for n in 1..=3 {
        tc.push.emit(invalidate_both());
        let sent = tc.wait_sent(n + 1).await;
        assert_eq!(n + 1, sent.len());
        assert!(!task.is_finished());
    }

    tc.push.emit(invalidate_both());
    assert!(matches!(
        task.await.unwrap(),
        Err(GfError::Invalidated { .. })
    ));
    assert_eq!(4, tc.push.sent().len());
}

#[tokio::test(start_paused = true)]
async fn retry_then_complete() {
    let tc = TestCase::new(MemPushChannel::create()).await;
    let task = spawn_windowed(&tc, WindowedListOptions::new(TEST_CHANNEL_ID));
    tc.wait_sent(1).await;

    // a range we did not subscribe to is not our concern
    tc.push.emit(invalidate(ListRange(500, 599)));
    tc.push.emit(invalidate(ListRange(0, 99)));
    tc.wait_sent(2).await;

    tc.push
        .emit(sync(ListRange(0, 99), test_members(TEST_GUILD_ID, 42)));
    assert_eq!(42, task.await.unwrap().unwrap().len());
    assert_eq!(2, tc.push.sent().len());
}

#[tokio::test(start_paused = true)]
async fn one_subscription_per_channel() {
    let tc = TestCase::new(MemPushChannel::create()).await;
    let first = spawn_windowed(&tc, WindowedListOptions::new(TEST_CHANNEL_ID));
    tc.wait_sent(1).await;

    let second = tc
        .retrieval
        .fetch_windowed_list(WindowedListOptions::new(TEST_CHANNEL_ID))
        .await;
    assert!(matches!(second, Err(GfError::DuplicateToken { .. })));

    tc.push.emit(sync(ListRange(0, 99), vec![]));
    assert!(first.await.unwrap().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn windowed_times_out() {
    let tc = TestCase::new(MemPushChannel::create()).await;

    assert!(matches!(
        spawn_windowed(
            &tc,
            WindowedListOptions {
                timeout: Some(std::time::Duration::from_millis(50)),
                ..WindowedListOptions::new(TEST_CHANNEL_ID)
            },
        )
        .await
        .unwrap(),
        Err(GfError::RetrievalTimeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn windowed_options_are_validated() {
    let tc = TestCase::new(MemPushChannel::create()).await;

    assert!(matches!(
        tc.retrieval
            .fetch_windowed_list(WindowedListOptions {
                max_retries: Some(0),
                ..WindowedListOptions::new(TEST_CHANNEL_ID)
            })
            .await,
        Err(GfError::InvalidArgument { .. })
    ));
    assert!(tc.push.sent().is_empty());
}
