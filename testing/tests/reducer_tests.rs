//! Reducer behaviour driven through the `ReducerTest` harness and the mock API.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use std::sync::Arc;
use todo_sync_core::{
    Reducer, Rollback, SortOrder, TodoAction, TodoEnvironment, TodoId, TodoPatch, TodoReducer,
    TodoState,
};
use todo_sync_testing::assertions::{assert_has_future_effect, assert_no_effects, resolve};
use todo_sync_testing::helpers::{local_environment, remote_environment};
use todo_sync_testing::properties::{patch, sort_order, todo_text};
use todo_sync_testing::{ApiCall, MockTodoApi, ReducerTest, todo};

fn remote() -> (Arc<MockTodoApi>, TodoEnvironment) {
    let api = Arc::new(MockTodoApi::with_todos(vec![todo("srv-1", "a", 1)]));
    let env = remote_environment(api.clone());
    (api, env)
}

fn remote_state() -> TodoState {
    TodoState::with_items(vec![todo("srv-1", "a", 1)])
}

/// Applies `action` and feeds every resulting action back until nothing is left
async fn run(state: &mut TodoState, action: TodoAction, env: &TodoEnvironment) {
    let mut queue = vec![action];
    while let Some(action) = queue.pop() {
        let effects = TodoReducer::new().reduce(state, action, env);
        queue.extend(resolve(effects).await);
    }
}

#[test]
fn local_add_has_no_effects() {
    ReducerTest::new(TodoReducer::new())
        .with_env(local_environment())
        .given_state(TodoState::new())
        .when_action(TodoAction::Add {
            item: todo(1u64, "buy milk", 0),
        })
        .then_state(|state| {
            assert_eq!(state.count(), 1);
            assert!(!state.items()[0].completed);
        })
        .then_effects(|effects| assert_no_effects(effects))
        .run();
}

#[test]
fn remote_toggle_is_optimistic() {
    let (_api, env) = remote();
    ReducerTest::new(TodoReducer::new())
        .with_env(env)
        .given_state(remote_state())
        .when_action(TodoAction::ToggleCompleted {
            id: TodoId::remote("srv-1"),
        })
        .then_state(|state| assert!(state.items()[0].completed))
        .then_effects(|effects| assert_has_future_effect(effects))
        .run();
}

#[tokio::test]
async fn failed_toggle_rolls_back() {
    let (api, env) = remote();
    api.fail_all();
    let mut state = remote_state();

    run(
        &mut state,
        TodoAction::ToggleCompleted {
            id: TodoId::remote("srv-1"),
        },
        &env,
    )
    .await;

    assert!(!state.items()[0].completed);
}

#[tokio::test]
async fn confirmed_add_swaps_temporary_id() {
    let api = Arc::new(MockTodoApi::new());
    let env = remote_environment(api.clone());
    let mut state = TodoState::new();

    run(
        &mut state,
        TodoAction::Add {
            item: todo("tmp-1", "buy milk", 0),
        },
        &env,
    )
    .await;

    assert_eq!(state.count(), 1);
    assert_eq!(state.items()[0].id, TodoId::remote("srv-1"));
    assert!(!state.contains(&TodoId::remote("tmp-1")));
    assert!(!state.is_provisional(&TodoId::remote("tmp-1")));
}

#[tokio::test]
async fn failed_add_discards_provisional_item() {
    let api = Arc::new(MockTodoApi::new());
    api.fail_all();
    let env = remote_environment(api.clone());
    let mut state = TodoState::new();

    run(
        &mut state,
        TodoAction::Add {
            item: todo("tmp-1", "buy milk", 0),
        },
        &env,
    )
    .await;

    assert_eq!(state.count(), 0);
}

#[tokio::test]
async fn edits_during_create_are_pushed_after_confirmation() {
    let api = Arc::new(MockTodoApi::new());
    let env = remote_environment(api.clone());
    let mut state = TodoState::new();
    let reducer = TodoReducer::new();

    let create = reducer.reduce(
        &mut state,
        TodoAction::Add {
            item: todo("tmp-1", "draft", 0),
        },
        &env,
    );
    let effects = reducer.reduce(
        &mut state,
        TodoAction::Update {
            id: TodoId::remote("tmp-1"),
            patch: TodoPatch::text("final"),
        },
        &env,
    );
    assert_no_effects(&effects);

    for action in resolve(create).await {
        run(&mut state, action, &env).await;
    }

    assert_eq!(state.items()[0].id, TodoId::remote("srv-1"));
    assert_eq!(state.items()[0].text, "final");
    assert_eq!(api.todos()[0].text, "final");
    assert!(matches!(
        api.calls().as_slice(),
        [ApiCall::Create(_), ApiCall::Update(id, _)] if *id == TodoId::remote("srv-1")
    ));
}

#[tokio::test]
async fn removing_a_provisional_item_deletes_the_server_copy() {
    let api = Arc::new(MockTodoApi::new());
    let env = remote_environment(api.clone());
    let mut state = TodoState::new();
    let reducer = TodoReducer::new();

    let create = reducer.reduce(
        &mut state,
        TodoAction::Add {
            item: todo("tmp-1", "oops", 0),
        },
        &env,
    );
    let effects = reducer.reduce(
        &mut state,
        TodoAction::Remove {
            id: TodoId::remote("tmp-1"),
        },
        &env,
    );
    assert_no_effects(&effects);

    for action in resolve(create).await {
        run(&mut state, action, &env).await;
    }

    assert_eq!(state.count(), 0);
    assert!(api.todos().is_empty());
}

#[tokio::test]
async fn stale_failure_keeps_newer_value() {
    let (api, env) = remote();
    api.fail_when(|call| matches!(call, ApiCall::Update(_, patch) if patch.text.as_deref() == Some("first")));
    let mut state = remote_state();
    let reducer = TodoReducer::new();
    let id = TodoId::remote("srv-1");

    let first = reducer.reduce(
        &mut state,
        TodoAction::Update {
            id: id.clone(),
            patch: TodoPatch::text("first"),
        },
        &env,
    );
    let second = reducer.reduce(
        &mut state,
        TodoAction::Update {
            id: id.clone(),
            patch: TodoPatch::text("second"),
        },
        &env,
    );

    // The newer write lands first, then the older one fails.
    for action in resolve(second).await {
        run(&mut state, action, &env).await;
    }
    let failures = resolve(first).await;
    assert!(matches!(
        failures.as_slice(),
        [TodoAction::WriteFailed {
            rollback: Rollback::Restore { .. },
            ..
        }]
    ));
    for action in failures {
        run(&mut state, action, &env).await;
    }

    assert_eq!(state.get(&id).unwrap().text, "second");
}

#[tokio::test]
async fn failed_remove_reinserts_at_original_position() {
    let api = Arc::new(MockTodoApi::new());
    api.fail_all();
    let env = remote_environment(api.clone());
    let mut state = TodoState::with_items(vec![
        todo("srv-1", "a", 1),
        todo("srv-2", "b", 2),
        todo("srv-3", "c", 3),
    ]);

    run(
        &mut state,
        TodoAction::Remove {
            id: TodoId::remote("srv-2"),
        },
        &env,
    )
    .await;

    let ids: Vec<_> = state.items().iter().map(|item| item.id.to_string()).collect();
    assert_eq!(ids, ["srv-1", "srv-2", "srv-3"]);
}

#[tokio::test]
async fn load_keeps_provisional_items() {
    let api = Arc::new(MockTodoApi::with_todos(vec![todo("srv-9", "server", 9)]));
    api.hold();
    let env = remote_environment(api.clone());
    let mut state = TodoState::new();
    let reducer = TodoReducer::new();

    let load = reducer.reduce(&mut state, TodoAction::Load, &env);
    let _create = reducer.reduce(
        &mut state,
        TodoAction::Add {
            item: todo("tmp-1", "local", 0),
        },
        &env,
    );
    api.release();

    for action in resolve(load).await {
        run(&mut state, action, &env).await;
    }

    let ids: Vec<_> = state.items().iter().map(|item| item.id.to_string()).collect();
    assert_eq!(ids, ["srv-9", "tmp-1"]);
}

proptest! {
    #[test]
    fn sort_keeps_every_item(order in sort_order(), texts in prop::collection::vec(todo_text(), 0..12)) {
        let items: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| todo(i as u64 + 1, text, i as i64))
            .collect();
        let mut state = TodoState::with_items(items.clone());

        let _ = TodoReducer::new().reduce(&mut state, TodoAction::Sort { order }, &local_environment());

        prop_assert_eq!(state.count(), items.len());
        for item in &items {
            prop_assert_eq!(state.get(&item.id), Some(item));
        }
    }

    #[test]
    fn newest_then_oldest_reverses(texts in prop::collection::vec(todo_text(), 1..12)) {
        let items: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| todo(i as u64 + 1, text, i as i64))
            .collect();
        let mut state = TodoState::with_items(items);
        let env = local_environment();
        let reducer = TodoReducer::new();

        let _ = reducer.reduce(&mut state, TodoAction::Sort { order: SortOrder::NewestFirst }, &env);
        let newest: Vec<_> = state.items().to_vec();
        let _ = reducer.reduce(&mut state, TodoAction::Sort { order: SortOrder::OldestFirst }, &env);
        let mut oldest: Vec<_> = state.items().to_vec();
        oldest.reverse();

        prop_assert_eq!(newest, oldest);
    }

    #[test]
    fn local_update_applies_patch(patch in patch()) {
        let mut state = TodoState::with_items(vec![todo(1u64, "a", 0)]);
        let _ = TodoReducer::new().reduce(
            &mut state,
            TodoAction::Update { id: TodoId::Local(1), patch: patch.clone() },
            &local_environment(),
        );

        let item = &state.items()[0];
        if let Some(text) = patch.text.as_deref() {
            prop_assert_eq!(item.text.as_str(), text.trim());
        }
        if let Some(completed) = patch.completed {
            prop_assert_eq!(item.completed, completed);
        }
    }
}
