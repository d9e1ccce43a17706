//! Local-mode store: optimistic mutations mirrored to the storage slot.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use todo_sync_core::snapshot::{decode, encode};
use todo_sync_core::{STORAGE_KEY, SortOrder, TodoId, TodoPatch};
use todo_sync_runtime::{FileStorage, StoreError, TodoStore};
use todo_sync_testing::{InMemoryStorage, test_clock, todo};

fn store_with(storage: &InMemoryStorage) -> TodoStore {
    TodoStore::local(Arc::new(storage.clone()), Arc::new(test_clock()))
}

fn seeded(count: u64) -> InMemoryStorage {
    let items: Vec<_> = (1..=count)
        .map(|n| todo(n, &format!("item {n}"), i64::try_from(n).unwrap()))
        .collect();
    InMemoryStorage::with_raw(STORAGE_KEY, &encode(&items).unwrap())
}

fn stored(storage: &InMemoryStorage) -> Vec<todo_sync_core::TodoItem> {
    decode(&storage.raw(STORAGE_KEY).unwrap()).unwrap()
}

#[tokio::test]
async fn add_appends_notifies_and_mirrors() {
    let storage = InMemoryStorage::new();
    let store = store_with(&storage);
    let mut changes = store.changes().await;
    assert!(changes.current().is_empty());

    let item = store.add("  buy milk ").await.unwrap().unwrap();

    assert_eq!(item.id, TodoId::Local(1));
    assert_eq!(item.text, "buy milk");
    assert!(!item.completed);

    let snapshot = changes.recv().await.unwrap();
    assert_eq!(snapshot.as_slice(), std::slice::from_ref(&item));
    assert_eq!(stored(&storage), vec![item]);
}

#[tokio::test]
async fn removed_items_leave_no_bookkeeping() {
    let store = store_with(&InMemoryStorage::new());

    let mut ids = Vec::new();
    for n in 0..100 {
        let item = store.add(&format!("item {n}")).await.unwrap().unwrap();
        store.toggle_completed(item.id.clone()).await.unwrap();
        store.remove(item.id.clone()).await.unwrap();
        ids.push(item.id);
    }

    assert!(store.list().await.is_empty());
    let tracked = store
        .state(|state| ids.iter().filter(|id| state.revision_of(id).is_some()).count())
        .await;
    assert_eq!(tracked, 0);
}

#[tokio::test]
async fn blank_text_is_a_silent_no_op() {
    let storage = InMemoryStorage::new();
    let store = store_with(&storage);
    let mut changes = store.changes().await;

    assert!(store.add("").await.unwrap().is_none());
    assert!(store.add("   ").await.unwrap().is_none());

    assert!(store.list().await.is_empty());
    assert!(changes.try_recv().is_none());
    assert_eq!(storage.saves(), 0);
}

#[tokio::test]
async fn ids_continue_after_stored_items() {
    let storage = seeded(3);
    let store = store_with(&storage);
    assert_eq!(store.list().await.len(), 3);

    let item = store.add("next").await.unwrap().unwrap();
    assert_eq!(item.id, TodoId::Local(4));
}

#[tokio::test]
async fn corrupt_slot_starts_empty() {
    let storage = InMemoryStorage::with_raw(STORAGE_KEY, "{not json");
    let store = store_with(&storage);

    assert!(store.list().await.is_empty());
    store.add("fresh").await.unwrap();
    assert_eq!(stored(&storage).len(), 1);
}

#[tokio::test]
async fn toggle_twice_restores_flag() {
    let storage = seeded(1);
    let store = store_with(&storage);
    let id = TodoId::Local(1);

    store.toggle_completed(id.clone()).await.unwrap();
    assert!(store.list().await[0].completed);
    assert!(stored(&storage)[0].completed);

    store.toggle_completed(id).await.unwrap();
    assert!(!store.list().await[0].completed);
    assert!(!stored(&storage)[0].completed);
}

#[tokio::test]
async fn second_remove_is_a_no_op() {
    let storage = seeded(2);
    let store = store_with(&storage);
    let mut changes = store.changes().await;

    store.remove(TodoId::Local(1)).await.unwrap();
    store.remove(TodoId::Local(1)).await.unwrap();

    assert!(changes.try_recv().is_some());
    assert!(changes.try_recv().is_none());
    assert_eq!(store.list().await.len(), 1);
    assert_eq!(stored(&storage).len(), 1);
}

#[tokio::test]
async fn update_merges_fields_and_rejects_blank_text() {
    let storage = seeded(1);
    let store = store_with(&storage);
    let id = TodoId::Local(1);

    store
        .update(id.clone(), TodoPatch::text("renamed"))
        .await
        .unwrap();
    store.update(id.clone(), TodoPatch::text("  ")).await.unwrap();
    store
        .update(TodoId::Local(42), TodoPatch::completed(true))
        .await
        .unwrap();

    let list = store.list().await;
    assert_eq!(list[0].text, "renamed");
    assert!(!list[0].completed);
}

#[tokio::test]
async fn unknown_sort_criterion_changes_nothing() {
    let storage = seeded(3);
    let store = store_with(&storage);
    let before = store.list().await;
    let mut changes = store.changes().await;

    store.sort("alphabetical").await.unwrap();

    assert_eq!(store.list().await, before);
    assert!(changes.try_recv().is_none());
}

#[tokio::test]
async fn named_sorts_reorder() {
    let storage = seeded(3);
    let store = store_with(&storage);
    store.toggle_completed(TodoId::Local(2)).await.unwrap();

    store.sort("completed").await.unwrap();
    assert_eq!(store.list().await[0].id, TodoId::Local(2));

    store.sort("newest").await.unwrap();
    let ids: Vec<_> = store.list().await.iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids, [TodoId::Local(3), TodoId::Local(2), TodoId::Local(1)]);

    store.sort_by(SortOrder::IncompleteFirst).await.unwrap();
    assert_eq!(store.list().await[2].id, TodoId::Local(2));
}

#[tokio::test]
async fn storage_failure_keeps_in_memory_state() {
    let storage = InMemoryStorage::new();
    let store = store_with(&storage);
    storage.fail_saves(true);

    let item = store.add("kept").await.unwrap();

    assert!(item.is_some());
    assert_eq!(store.list().await.len(), 1);
    assert!(storage.raw(STORAGE_KEY).is_none());
}

#[tokio::test]
async fn snapshots_arrive_in_mutation_order() {
    let storage = InMemoryStorage::new();
    let store = store_with(&storage);
    let mut changes = store.changes().await;

    store.add("a").await.unwrap();
    store.add("b").await.unwrap();
    store.toggle_completed(TodoId::Local(1)).await.unwrap();

    let lengths: Vec<_> = [
        changes.recv().await.unwrap(),
        changes.recv().await.unwrap(),
        changes.recv().await.unwrap(),
    ]
    .iter()
    .map(|s| (s.len(), s[0].completed))
    .collect();
    assert_eq!(lengths, [(1, false), (2, false), (2, true)]);
    assert_eq!(changes.current().len(), 2);
}

#[tokio::test]
async fn unsubscribed_listener_does_not_block_others() {
    let storage = InMemoryStorage::new();
    let store = store_with(&storage);
    let gone = store.changes().await;
    let mut kept = store.changes().await;

    gone.unsubscribe();
    store.add("a").await.unwrap();

    assert_eq!(kept.recv().await.unwrap().len(), 1);
}

#[tokio::test]
async fn subscription_streams_snapshots() {
    use futures::StreamExt;

    let storage = InMemoryStorage::new();
    let store = store_with(&storage);
    let stream = store.changes().await.into_stream();

    store.add("a").await.unwrap();
    store.add("b").await.unwrap();

    let snapshots: Vec<_> = stream.take(2).collect().await;
    assert_eq!(snapshots[1].len(), 2);
}

#[tokio::test]
async fn file_storage_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = TodoStore::local(Arc::new(FileStorage::new(dir.path())), Arc::new(test_clock()));
    first.add("persisted").await.unwrap();
    first.toggle_completed(TodoId::Local(1)).await.unwrap();

    let second = TodoStore::local(Arc::new(FileStorage::new(dir.path())), Arc::new(test_clock()));
    let list = second.list().await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].text, "persisted");
    assert!(list[0].completed);
}

#[tokio::test]
async fn shutdown_rejects_new_mutations() {
    let storage = InMemoryStorage::new();
    let store = store_with(&storage);

    store.shutdown(Duration::from_secs(1)).await.unwrap();

    assert_eq!(
        store.add("late").await.unwrap_err(),
        StoreError::ShutdownInProgress
    );
    assert!(store.list().await.is_empty());
}

proptest! {
    #[test]
    fn add_grows_list_by_one(text in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,20}") {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let storage = seeded(2);
            let store = store_with(&storage);

            let item = store.add(&text).await.unwrap().unwrap();
            let list = store.list().await;

            assert_eq!(list.len(), 3);
            assert!(!item.completed);
            assert_eq!(item.text, text.trim());
        });
    }

    #[test]
    fn toggle_pair_is_identity(n in 1u64..=4) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let storage = seeded(4);
            let store = store_with(&storage);
            let before = store.list().await;

            store.toggle_completed(TodoId::Local(n)).await.unwrap();
            store.toggle_completed(TodoId::Local(n)).await.unwrap();

            assert_eq!(store.list().await, before);
        });
    }
}
