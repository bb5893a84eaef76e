//! Store + routine middleware tests.
//! In-memory only: controls are closures, state is a plain struct.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use routine_runtime::control::{halting, resolving, returning};
use routine_runtime::{ControlTable, Coroutine, RoutineError, Script};
use routine_store::{reducer, Store};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Test state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PostsState {
    posts: Vec<Value>,
    requests: u32,
    last_error: Option<String>,
}

fn posts_reducer() -> impl routine_store::Reducer<PostsState> {
    reducer::from_fn(|state: &mut PostsState, action: &Value| {
        match action["type"].as_str() {
            Some("REQUEST_POSTS") => state.requests += 1,
            Some("RECEIVE_POSTS") => {
                if let Some(posts) = action["posts"].as_array() {
                    state.posts.extend(posts.iter().cloned());
                }
            }
            Some("FETCH_FAILED") => {
                state.last_error = action["error"].as_str().map(str::to_string);
            }
            _ => {}
        }
    })
}

fn fetch_controls() -> ControlTable {
    ControlTable::new().with(
        "API_FETCH",
        resolving(|action| {
            let path = action["path"].as_str().unwrap_or_default().to_string();
            async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                match path.as_str() {
                    "/posts" => Ok(json!([{"id": 1}, {"id": 2}])),
                    other => Err(anyhow::anyhow!("404 for {other}")),
                }
            }
        }),
    )
}

fn fetch_posts(path: &'static str) -> Coroutine {
    Coroutine::new(move |co| async move {
        co.yield_(json!({"type": "REQUEST_POSTS"})).await?;
        match co.yield_(json!({"type": "API_FETCH", "path": path})).await {
            Ok(posts) => Ok(json!({"type": "RECEIVE_POSTS", "posts": posts})),
            Err(err) => Ok(json!({"type": "FETCH_FAILED", "error": err.to_string()})),
        }
    })
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn routine_actions_reach_the_reducer() {
    let store = Store::new(posts_reducer(), PostsState::default(), fetch_controls());

    let result = store.dispatch(fetch_posts("/posts")).await.unwrap();

    assert_eq!(result["type"], "RECEIVE_POSTS");
    let state = store.get_state();
    assert_eq!(state.requests, 1);
    assert_eq!(state.posts, vec![json!({"id": 1}), json!({"id": 2})]);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn caught_rejection_becomes_a_failure_action() {
    let store = Store::new(posts_reducer(), PostsState::default(), fetch_controls());

    store.dispatch(fetch_posts("/missing")).await.unwrap();

    let state = store.get_state();
    assert!(state.posts.is_empty());
    assert_eq!(
        state.last_error.as_deref(),
        Some("control `API_FETCH` rejected: 404 for /missing")
    );
}

#[tokio::test]
async fn uncaught_error_reaches_the_caller() {
    let store = Store::new(posts_reducer(), PostsState::default(), fetch_controls());

    let routine = Coroutine::new(|co| async move {
        co.yield_(json!({"type": "API_FETCH", "path": "/nope"})).await?;
        Ok(json!({"type": "RECEIVE_POSTS", "posts": []}))
    });

    let err = store.dispatch(routine).await.unwrap_err();
    assert!(matches!(err, RoutineError::Rejected { .. }));
    assert_eq!(store.get_state(), PostsState::default());
}

#[tokio::test]
async fn plain_action_skips_controls() {
    let hits = Arc::new(AtomicUsize::new(0));
    let controls = {
        let hits = hits.clone();
        ControlTable::new().with(
            "REQUEST_POSTS",
            returning(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Value::Null
            }),
        )
    };
    let store = Store::new(posts_reducer(), PostsState::default(), controls);

    let result = store.dispatch(json!({"type": "REQUEST_POSTS"})).await.unwrap();

    assert_eq!(result, json!({"type": "REQUEST_POSTS"}));
    assert_eq!(store.get_state().requests, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn killed_routine_never_reduces_its_final_action() {
    let controls = ControlTable::new().with("KILL", halting(|_| {}));
    let store = Store::new(posts_reducer(), PostsState::default(), controls);

    let routine = Script::new(vec![json!({"type": "REQUEST_POSTS"}), json!({"type": "KILL"})])
        .returning(json!({"type": "RECEIVE_POSTS", "posts": [{"id": 9}]}));

    let outcome = tokio::time::timeout(Duration::from_millis(50), store.dispatch(routine)).await;
    assert!(outcome.is_err());

    let state = store.get_state();
    assert_eq!(state.requests, 1);
    assert!(state.posts.is_empty());
}

#[tokio::test]
async fn listeners_fire_only_on_effective_change() {
    let store = Store::new(posts_reducer(), PostsState::default(), ControlTable::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let id = {
        let calls = calls.clone();
        store.subscribe(move || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };

    let _ = store.dispatch(json!({"type": "REQUEST_POSTS"}));
    let _ = store.dispatch(json!({"type": "UNRELATED"}));
    let _ = store.dispatch(json!({"type": "RECEIVE_POSTS", "posts": []}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(store.unsubscribe(id));
    let _ = store.dispatch(json!({"type": "REQUEST_POSTS"}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn listener_can_read_state_during_notification() {
    let store = Store::new(posts_reducer(), PostsState::default(), ControlTable::new());
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    {
        let seen = seen.clone();
        let reader = store.clone();
        store.subscribe(move || seen.lock().unwrap().push(reader.get_state().requests));
    }

    store.dispatch(two_requests()).await.unwrap();
    assert_eq!(seen.lock().unwrap().as_slice(), &[1, 2]);
}

fn two_requests() -> Script {
    Script::new(vec![
        json!({"type": "REQUEST_POSTS"}),
        json!({"type": "REQUEST_POSTS"}),
    ])
}

#[tokio::test]
async fn state_snapshot_serializes() {
    let store = Store::new(posts_reducer(), PostsState::default(), fetch_controls());
    store.dispatch(fetch_posts("/posts")).await.unwrap();

    let snapshot = serde_json::to_value(store.get_state()).unwrap();
    assert_eq!(snapshot["requests"], 1);
    assert_eq!(snapshot["posts"].as_array().map(Vec::len), Some(2));
}
