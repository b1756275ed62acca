use super::*;
use guildfetch_test_utils::member::test_member;
use std::time::Duration;
use tokio::time::Instant;

/// Answers every query with the members whose name starts with it,
/// except for the queries in `silent`, which are never answered.
fn prefix_server(
    members: Vec<Member>,
    silent: &'static [&'static str],
) -> Arc<MemPushChannel> {
    MemPushChannel::with_responder(move |message| match message {
        PushMessage::RequestMembers(RequestMembers {
            target: MemberTarget::Query(query),
            limit,
            nonce,
            ..
        }) => {
            if silent.contains(&query.as_str()) {
                return vec![];
            }
            let limit = if *limit == 0 {
                usize::MAX
            } else {
                *limit as usize
            };
            let found = members
                .iter()
                .filter(|m| m.matches_prefix(query))
                .take(limit)
                .cloned()
                .collect();
            vec![chunk(found, 0, 1, nonce)]
        }
        _ => vec![],
    })
}

fn named(names: &[&str]) -> Vec<Member> {
    names
        .iter()
        .enumerate()
        .map(|(n, name)| test_member(TEST_GUILD_ID, UserId(n as u64 + 1), name))
        .collect()
}

fn queries(push: &MemPushChannel) -> Vec<String> {
    push.sent()
        .into_iter()
        .map(|m| match m {
            PushMessage::RequestMembers(RequestMembers {
                target: MemberTarget::Query(q),
                ..
            }) => q,
            oth => panic!("unexpected message {oth:?}"),
        })
        .collect()
}

fn config(alphabet: &str, depth: u8) -> CoreRetrievalConfig {
    CoreRetrievalConfig {
        bruteforce_alphabet: alphabet.to_string(),
        bruteforce_depth: depth,
        ..Default::default()
    }
}

async fn setup(
    config: CoreRetrievalConfig,
    member_count: u64,
    push: Arc<MemPushChannel>,
) -> TestCase {
    TestCase::with(
        config,
        GuildContext::new(TEST_GUILD_ID, member_count),
        push,
        Arc::new(MockRestClient::new()),
    )
    .await
}

#[tokio::test(start_paused = true)]
async fn empty_prefixes_are_pruned() {
    let push = prefix_server(named(&["bob", "bill", "1up"]), &[]);
    let tc = setup(config("ab1", 2), 0, push).await;

    let found = tc
        .retrieval
        .fetch_bruteforce(BruteforceOptions::default())
        .await
        .unwrap();
    assert_eq!(3, found.len());

    let queries = queries(&tc.push);
    assert_eq!(
        vec!["a", "b", "1", "ba", "bb", "b1", "1a", "1b", "11"],
        queries
    );
    assert!(!queries.iter().any(|q| q.len() > 1 && q.starts_with('a')));
}

#[tokio::test(start_paused = true)]
async fn stops_once_the_store_is_complete() {
    let push = prefix_server(named(&["aa", "ab", "b"]), &[]);
    let tc = setup(config("ab1", 2), 3, push).await;

    let found = tc
        .retrieval
        .fetch_bruteforce(BruteforceOptions::default())
        .await
        .unwrap();

    assert_eq!(3, found.len());
    assert_eq!(vec!["a", "b"], queries(&tc.push));
}

#[tokio::test(start_paused = true)]
async fn complete_store_is_returned_without_queries() {
    let cached = named(&["ann", "ben", "cat", "dan", "eve"]);
    let tc = setup(config("ab1", 2), 5, prefix_server(cached.clone(), &[]))
        .await;
    for member in cached {
        tc.store.put(member).await.unwrap();
    }

    let found = tc
        .retrieval
        .fetch_bruteforce(BruteforceOptions::default())
        .await
        .unwrap();

    assert_eq!(5, found.len());
    assert!(tc.push.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn early_stop_includes_previously_stored_members() {
    let mut list = named(&["aa", "ab"]);
    let zoe = test_member(TEST_GUILD_ID, UserId(10), "zoe");
    list.push(zoe.clone());
    let tc = setup(config("ab", 1), 3, prefix_server(list, &[])).await;
    tc.store.put(zoe).await.unwrap();

    let found = tc
        .retrieval
        .fetch_bruteforce(BruteforceOptions::default())
        .await
        .unwrap();

    assert_eq!(vec!["a"], queries(&tc.push));
    assert_eq!(3, found.len());
    assert!(found.contains_key(&UserId(10)));
}

#[tokio::test(start_paused = true)]
async fn queries_are_throttled() {
    let push = prefix_server(named(&["a"]), &[]);
    let tc = setup(config("ab1", 1), 0, push).await;

    let start = Instant::now();
    tc.retrieval
        .fetch_bruteforce(BruteforceOptions {
            delay: Some(Duration::from_millis(1_000)),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(3, queries(&tc.push).len());
    assert!(start.elapsed() >= Duration::from_millis(2_000));
}

#[tokio::test(start_paused = true)]
async fn delay_below_minimum_is_raised() {
    let push = prefix_server(named(&["a"]), &[]);
    let tc = setup(config("ab1", 1), 0, push).await;

    let start = Instant::now();
    tc.retrieval
        .fetch_bruteforce(BruteforceOptions {
            delay: Some(Duration::from_millis(1)),
            ..Default::default()
        })
        .await
        .unwrap();

    // two pauses between three queries, each at least the 500ms minimum
    assert!(start.elapsed() >= Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn timed_out_candidates_are_skipped() {
    let push = prefix_server(named(&["apple", "banana", "1984"]), &["b"]);
    let tc = setup(
        CoreRetrievalConfig {
            search_timeout_ms: 1_000,
            ..config("ab1", 1)
        },
        0,
        push,
    )
    .await;

    let found = tc
        .retrieval
        .fetch_bruteforce(BruteforceOptions::default())
        .await
        .unwrap();

    assert_eq!(vec!["a", "b", "1"], queries(&tc.push));
    assert_eq!(2, found.len());
    assert!(found.contains_key(&UserId(1)));
    assert!(found.contains_key(&UserId(3)));
}

#[tokio::test(start_paused = true)]
async fn page_limit_is_sent_with_each_query() {
    let push = prefix_server(named(&["a"]), &[]);
    let tc = setup(config("a", 1), 0, push).await;

    tc.retrieval
        .fetch_bruteforce(BruteforceOptions {
            limit: Some(7),
            ..Default::default()
        })
        .await
        .unwrap();

    match &tc.push.sent()[0] {
        PushMessage::RequestMembers(r) => assert_eq!(7, r.limit),
        oth => panic!("unexpected message {oth:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn bruteforce_options_are_validated() {
    let tc = setup(config("ab1", 1), 0, MemPushChannel::create()).await;

    for options in [
        BruteforceOptions {
            depth: Some(0),
            ..Default::default()
        },
        BruteforceOptions {
            limit: Some(0),
            ..Default::default()
        },
        BruteforceOptions {
            limit: Some(500),
            ..Default::default()
        },
    ] {
        assert!(matches!(
            tc.retrieval.fetch_bruteforce(options).await,
            Err(GfError::InvalidArgument { .. })
        ));
    }
    assert!(tc.push.sent().is_empty());
}
