use mono_core::{
    CreateTaskRequest, EntityKind, MonoStore, RepoError, SubTaskPatch, SubTaskService,
    TaskService,
};
use std::sync::Arc;

fn services() -> (TaskService, SubTaskService) {
    let store = Arc::new(MonoStore::open_in_memory().unwrap());
    (
        TaskService::new(Arc::clone(&store)),
        SubTaskService::new(store),
    )
}

#[test]
fn sub_tasks_are_appended_in_order_and_embedded_in_task() {
    let (tasks, sub_tasks) = services();
    let task_id = tasks.create(&CreateTaskRequest::titled("trip")).unwrap();

    let first = sub_tasks.create(&task_id).unwrap();
    let second = sub_tasks.create(&task_id).unwrap();
    sub_tasks
        .update(
            &first,
            &SubTaskPatch {
                title: Some("passport".to_string()),
                ..SubTaskPatch::default()
            },
        )
        .unwrap();

    let listed = sub_tasks.list_for_task(&task_id).unwrap();
    assert_eq!(
        listed.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        vec![first.as_str(), second.as_str()]
    );
    assert!(listed[0].position < listed[1].position);
    assert_eq!(listed[0].title, "passport");
    assert_eq!(listed[1].title, "");

    let task = tasks.get(&task_id).unwrap().unwrap();
    assert_eq!(task.sub_tasks, listed);
}

#[test]
fn create_for_unknown_task_returns_not_found() {
    let (_, sub_tasks) = services();
    match sub_tasks.create("missing").unwrap_err() {
        RepoError::NotFound { entity, .. } => assert_eq!(entity, EntityKind::Task),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn update_unknown_sub_task_returns_not_found() {
    let (_, sub_tasks) = services();
    let err = sub_tasks
        .update("missing", &SubTaskPatch::default())
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn deleting_task_cascades_to_its_sub_tasks() {
    let (tasks, sub_tasks) = services();
    let task_id = tasks.create(&CreateTaskRequest::titled("parent")).unwrap();
    let keep_id = tasks.create(&CreateTaskRequest::titled("other")).unwrap();
    let child_a = sub_tasks.create(&task_id).unwrap();
    let child_b = sub_tasks.create(&task_id).unwrap();
    let unrelated = sub_tasks.create(&keep_id).unwrap();

    assert!(tasks.delete(&task_id).unwrap());

    assert!(sub_tasks.get(&child_a).unwrap().is_none());
    assert!(sub_tasks.get(&child_b).unwrap().is_none());
    assert!(sub_tasks.list_for_task(&task_id).unwrap().is_empty());
    assert!(sub_tasks.get(&unrelated).unwrap().is_some());
}

#[test]
fn clear_completed_cascades_to_sub_tasks() {
    let (tasks, sub_tasks) = services();
    let task_id = tasks.create(&CreateTaskRequest::titled("done")).unwrap();
    let child = sub_tasks.create(&task_id).unwrap();
    tasks.set_completed(&task_id, true).unwrap();

    assert_eq!(
        tasks.clear_completed(&mono_core::TaskQuery::all()).unwrap(),
        vec![task_id.clone()]
    );
    assert!(sub_tasks.get(&child).unwrap().is_none());
}

#[test]
fn bulk_delete_counts_only_existing_rows() {
    let (tasks, sub_tasks) = services();
    let task_id = tasks.create(&CreateTaskRequest::titled("bulk")).unwrap();
    let a = sub_tasks.create(&task_id).unwrap();
    let b = sub_tasks.create(&task_id).unwrap();
    let c = sub_tasks.create(&task_id).unwrap();

    let removed = sub_tasks
        .delete_many(&[a.clone(), b.clone(), "missing".to_string()])
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(sub_tasks.delete_many(&[]).unwrap(), 0);

    let remaining = sub_tasks.list_for_task(&task_id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, c);
    assert!(!sub_tasks.delete(&a).unwrap());
}
