use mono_core::{
    CreateTaskRequest, MonoStore, RepoError, TaskListService, TaskPatch, TaskQuery, TaskService,
};
use std::sync::Arc;

fn services() -> (TaskService, TaskListService) {
    let store = Arc::new(MonoStore::open_in_memory().unwrap());
    (
        TaskService::new(Arc::clone(&store)),
        TaskListService::new(store),
    )
}

#[test]
fn created_list_starts_blank_and_can_be_renamed() {
    let (_, lists) = services();
    let list = lists.create().unwrap();
    assert!(!list.id.is_empty());
    assert_eq!(list.name, "");

    lists.rename(&list.id, "  Groceries ").unwrap();
    assert_eq!(lists.get(&list.id).unwrap().unwrap().name, "Groceries");
}

#[test]
fn rename_unknown_list_returns_not_found() {
    let (_, lists) = services();
    assert!(lists.rename("missing", "x").unwrap_err().is_not_found());
}

#[test]
fn deleting_list_keeps_its_tasks_without_a_list() {
    let (tasks, lists) = services();
    let list = lists.create_named("Errands").unwrap();
    let mut request = CreateTaskRequest::titled("post office");
    request.task_list_id = Some(list.id.clone());
    let task_id = tasks.create(&request).unwrap();

    assert!(lists.delete(&list.id).unwrap());

    let task = tasks.get(&task_id).unwrap().expect("task should survive");
    assert_eq!(task.task_list_id, None);
    assert!(tasks
        .list(&TaskQuery::in_lists([list.id.clone()]))
        .unwrap()
        .is_empty());
    assert!(!lists.delete(&list.id).unwrap());
}

#[test]
fn deleting_list_bumps_member_revisions_so_stale_edits_conflict() {
    let (tasks, lists) = services();
    let list = lists.create_named("Errands").unwrap();
    let mut request = CreateTaskRequest::titled("post office");
    request.task_list_id = Some(list.id.clone());
    let task_id = tasks.create(&request).unwrap();
    let before = tasks.get(&task_id).unwrap().unwrap();

    lists.delete(&list.id).unwrap();

    let after = tasks.get(&task_id).unwrap().unwrap();
    assert_eq!(after.task_list_id, None);
    assert!(after.revision > before.revision);
    assert!(after.updated_at >= before.updated_at);

    let stale = TaskPatch {
        task_list_id: Some(before.task_list_id.clone()),
        expected_revision: Some(before.revision),
        ..TaskPatch::default()
    };
    let err = tasks.update(&task_id, &stale).unwrap_err();
    assert!(matches!(err, RepoError::Conflict { .. }), "got {err:?}");
}

#[test]
fn delete_many_detaches_tasks_of_every_removed_list() {
    let (tasks, lists) = services();
    let a = lists.create_named("A").unwrap();
    let b = lists.create_named("B").unwrap();
    let mut in_a = CreateTaskRequest::titled("a");
    in_a.task_list_id = Some(a.id.clone());
    let mut in_b = CreateTaskRequest::titled("b");
    in_b.task_list_id = Some(b.id.clone());
    let a_task = tasks.create(&in_a).unwrap();
    let b_task = tasks.create(&in_b).unwrap();
    let untouched = tasks.create(&CreateTaskRequest::titled("loose")).unwrap();

    assert_eq!(lists.delete_many(&[a.id.clone(), b.id.clone()]).unwrap(), 2);

    for id in [&a_task, &b_task] {
        let task = tasks.get(id).unwrap().unwrap();
        assert_eq!(task.task_list_id, None);
        assert_eq!(task.revision, 2);
    }
    assert_eq!(tasks.get(&untouched).unwrap().unwrap().revision, 1);
}

#[test]
fn delete_many_removes_requested_lists() {
    let (_, lists) = services();
    let a = lists.create_named("A").unwrap();
    let b = lists.create_named("B").unwrap();
    let c = lists.create_named("C").unwrap();

    let removed = lists.delete_many(&[a.id.clone(), c.id.clone()]).unwrap();
    assert_eq!(removed, 2);

    let remaining = lists.list().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, b.id);
}

#[test]
fn observed_lists_follow_writes() {
    let (_, lists) = services();
    let observable = lists.observe_all().unwrap();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = observable.subscribe(move |items: &Vec<mono_core::TaskList>| {
        sink.lock().unwrap().push(items.len());
    });

    let list = lists.create_named("Inbox").unwrap();
    lists.delete(&list.id).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 0]);
}
