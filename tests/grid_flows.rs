use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::sync::broadcast;

use team_grid_lib::autosave::types::SaveStatus;
use team_grid_lib::choices::Selection;
use team_grid_lib::columns::types::{Assignee, CellValue, ColumnKey};
use team_grid_lib::config::UnmountPolicy;
use team_grid_lib::edit::types::EditKey;
use team_grid_lib::options::types::{ListName, Member, OptionLists, RemoveOutcome};
use team_grid_lib::store::memory::InMemoryStore;
use team_grid_lib::store::types::{RowId, WorkspaceId};
use team_grid_lib::store::{OptionStore, RowStore};
use team_grid_lib::subflow::types::SubflowKind;
use team_grid_lib::tasks::types::{Task, TaskPatch};
use team_grid_lib::{
    AppError, EditableGrid, GridConfig, GridEvent, GridServices, ValidationError,
};

const WORKSPACE: &str = "acme";

fn workspace() -> WorkspaceId {
    WorkspaceId::from(WORKSPACE)
}

fn row(id: &str) -> RowId {
    RowId::from(id)
}

fn task(id: &str, status: &str, day: u32) -> Task {
    Task {
        id: RowId::from(id),
        priority: "Medium".into(),
        category: String::new(),
        task_type: String::new(),
        status: status.into(),
        ticket_no: format!("T-{id}"),
        company: "Acme".into(),
        inquiry_details: String::new(),
        notes: String::new(),
        cs_manager: None,
        qa_manager: None,
        developer: None,
        start_date: None,
        end_date: None,
        created_at: Utc
            .with_ymd_and_hms(2024, 3, day, 9, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

fn lists() -> OptionLists {
    OptionLists {
        priorities: vec!["High".into(), "Medium".into(), "Low".into()],
        statuses: vec!["Open".into(), "QA".into(), "Done".into()],
        members: vec![Member::new("u-1", "Ana")],
        ..OptionLists::default()
    }
}

fn config(unmount: UnmountPolicy) -> GridConfig {
    let mut config = GridConfig {
        workspace: WORKSPACE.into(),
        ..GridConfig::default()
    };
    config.grid.unmount = unmount;
    config
}

async fn mounted(store: &Arc<InMemoryStore>, unmount: UnmountPolicy) -> EditableGrid {
    let grid = EditableGrid::new(
        workspace(),
        GridServices::from_backend(store.clone()),
        config(unmount),
    );
    grid.mount().await.expect("mount");
    grid
}

fn seeded(rows: Vec<Task>) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.seed_rows(&workspace(), rows);
    store.seed_options(&workspace(), lists());
    store
}

/// Lets spawned sync and timer tasks observe the latest state.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

fn ids(rows: &[Task]) -> Vec<String> {
    rows.iter().map(|task| task.id.to_string()).collect()
}

fn drain(events: &mut broadcast::Receiver<GridEvent>) -> Vec<GridEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn rapid_typing_produces_a_single_write_after_the_quiet_window() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Notes).await.expect("begin");
    grid.input("abc").await.expect("type");
    tokio::time::sleep(Duration::from_millis(300)).await;
    grid.input("abcd").await.expect("type");

    tokio::time::sleep(Duration::from_millis(799)).await;
    assert!(store.update_calls().is_empty());
    assert_eq!(
        grid.display_value(&row("r1"), ColumnKey::Notes),
        Some(CellValue::Text("abcd".into()))
    );

    tokio::time::sleep(Duration::from_millis(2)).await;
    let calls = store.update_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].patch,
        TaskPatch::single(ColumnKey::Notes, CellValue::Text("abcd".into()))
    );
    assert_eq!(grid.indicator(&row("r1"), ColumnKey::Notes), Some(SaveStatus::Saved));
    assert!(grid.edit_session().is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(grid.indicator(&row("r1"), ColumnKey::Notes), None);
}

#[tokio::test(start_paused = true)]
async fn enter_commits_text_immediately_and_shift_enter_keeps_editing() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Notes).await.expect("begin");
    grid.input("line one").await.expect("type");
    grid.key(EditKey::Enter { shift: true }).await.expect("newline");
    assert!(grid.edit_session().is_some());

    grid.key(EditKey::Enter { shift: false }).await.expect("commit");
    assert!(grid.edit_session().is_none());
    assert_eq!(store.update_calls().len(), 1);
    assert_eq!(
        store.row(&workspace(), &row("r1")).map(|task| task.notes),
        Some("line one".to_owned())
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(store.update_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn escape_discards_pending_text() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Company).await.expect("begin");
    grid.input("Globex").await.expect("type");
    grid.key(EditKey::Escape).await.expect("cancel");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(store.update_calls().is_empty());
    assert_eq!(
        grid.display_value(&row("r1"), ColumnKey::Company),
        Some(CellValue::Text("Acme".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn cancelling_an_invite_keeps_the_session_and_persists_nothing() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Developer).await.expect("begin");
    grid.select(Selection::InviteUser).await.expect("sentinel");

    let request = grid.subflow().expect("invite modal");
    assert_eq!(request.kind, SubflowKind::Invite);
    let session = grid.edit_session().expect("still editing");
    assert_eq!(session.cell.column, ColumnKey::Developer);
    assert!(!session.touched);

    grid.cancel_subflow().expect("cancel");
    assert!(grid.subflow().is_none());
    assert!(grid.edit_session().is_some());

    settle().await;
    assert!(store.update_calls().is_empty());
    assert_eq!(store.row(&workspace(), &row("r1")).and_then(|t| t.developer), None);
}

#[tokio::test(start_paused = true)]
async fn completed_invite_assigns_the_new_member() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    store.register_contact("dana@example.com", Member::new("u-9", "Dana"));
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Developer).await.expect("begin");
    grid.select(Selection::InviteUser).await.expect("sentinel");

    let err = grid
        .complete_invite("ghost@example.com")
        .await
        .expect_err("unknown account");
    assert!(matches!(err, AppError::ContactNotFound(_)));
    assert!(grid.subflow().is_some());

    let member = grid.complete_invite("dana@example.com").await.expect("invite");
    assert_eq!(member.id, "u-9");
    assert!(grid.subflow().is_none());
    assert!(grid.edit_session().is_none());
    assert_eq!(
        store.row(&workspace(), &row("r1")).and_then(|t| t.developer),
        Some(Assignee::Member {
            id: "u-9".into(),
            label: "Dana".into()
        })
    );
    assert!(store.options(&workspace()).member("u-9").is_some());
}

#[tokio::test(start_paused = true)]
async fn add_option_sub_flow_stores_the_value_and_selects_it() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Status).await.expect("begin");
    grid.select(Selection::CreateNewOption).await.expect("sentinel");

    let err = grid.complete_add_option("   ").await.expect_err("blank");
    assert!(matches!(err, AppError::Validation(ValidationError::BlankOption { .. })));
    assert!(grid.subflow().is_some());

    let stored = grid.complete_add_option(" Blocked ").await.expect("add");
    assert_eq!(stored, "Blocked");
    assert_eq!(
        store.options(&workspace()).statuses,
        vec!["Open", "QA", "Blocked", "Done"]
    );
    assert_eq!(
        store.row(&workspace(), &row("r1")).map(|t| t.status),
        Some("Blocked".to_owned())
    );
    assert!(grid.edit_session().is_none());
}

#[tokio::test(start_paused = true)]
async fn sentinels_are_never_persisted_outside_a_session() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.select_cell(&row("r1"), ColumnKey::Priority, Selection::CreateNewOption)
        .await
        .expect("sentinel");
    let request = grid.subflow().expect("modal");
    assert!(!request.from_edit_session);
    grid.cancel_subflow().expect("cancel");

    grid.select_cell(&row("r1"), ColumnKey::Priority, Selection::InviteUser)
        .await
        .expect_err("invite sentinel on a select column");
    settle().await;
    assert!(store.update_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn removed_member_is_shown_disabled_with_its_last_label() {
    let mut assigned = task("r1", "Open", 1);
    assigned.developer = Some(Assignee::Member {
        id: "u-2".into(),
        label: "Ben".into(),
    });
    let store = seeded(vec![assigned]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    let choices = grid.choices(&row("r1"), ColumnKey::Developer).expect("choices");
    let labels: Vec<&str> = choices.iter().map(|choice| choice.label.as_str()).collect();
    assert_eq!(labels, vec!["Ana", "Ben (removed)", "+ Invite user…"]);
    assert!(!choices[1].enabled);
    assert_eq!(choices[2].selection, Selection::InviteUser);
}

#[tokio::test(start_paused = true)]
async fn renamed_member_label_is_shown_from_the_registry() {
    let mut assigned = task("r1", "Open", 1);
    assigned.developer = Some(Assignee::Member {
        id: "u-1".into(),
        label: "Ana".into(),
    });
    let store = seeded(vec![assigned]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.options()
        .rename_member_label("u-1", "Ana K.")
        .await
        .expect("rename");
    let shown = grid
        .display_value(&row("r1"), ColumnKey::Developer)
        .map(|value| value.display());
    assert_eq!(shown.as_deref(), Some("Ana K."));
}

#[tokio::test(start_paused = true)]
async fn remote_delete_of_the_edited_row_cancels_with_a_toast() {
    let store = seeded(vec![task("r1", "Open", 1), task("r2", "Open", 2)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;
    let mut events = grid.subscribe_events();

    grid.begin_edit(&row("r1"), ColumnKey::Notes).await.expect("begin");
    grid.input("draft").await.expect("type");
    store.delete_row(&workspace(), &row("r1")).await.expect("remote delete");
    settle().await;

    assert!(grid.edit_session().is_none());
    let seen = drain(&mut events);
    assert!(seen.iter().any(|event| matches!(event, GridEvent::Toast(_))));
    assert!(seen
        .iter()
        .any(|event| matches!(event, GridEvent::RowsReplaced { count: 1 })));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(store.update_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn remote_edits_to_other_cells_leave_the_session_open() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Notes).await.expect("begin");
    store
        .update_row(
            &workspace(),
            &row("r1"),
            TaskPatch::single(ColumnKey::Company, CellValue::Text("Initech".into())),
        )
        .await
        .expect("remote update");
    settle().await;

    assert!(grid.edit_session().is_some());
    assert_eq!(
        grid.display_value(&row("r1"), ColumnKey::Company),
        Some(CellValue::Text("Initech".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn rows_are_partitioned_by_terminal_status_newest_first() {
    let store = seeded(vec![
        task("r1", "Open", 1),
        task("r2", "Done", 2),
        task("r3", "QA", 3),
    ]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    let view = grid.view();
    assert_eq!(ids(&view.active), vec!["r3", "r1"]);
    assert_eq!(ids(&view.completed), vec!["r2"]);

    grid.select_cell(&row("r1"), ColumnKey::Status, Selection::Value("Done".into()))
        .await
        .expect("complete r1");
    settle().await;
    let view = grid.view();
    assert_eq!(ids(&view.active), vec!["r3"]);
    assert_eq!(ids(&view.completed), vec!["r2", "r1"]);
}

#[tokio::test(start_paused = true)]
async fn blank_ticket_number_keeps_the_session_open() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;
    let mut events = grid.subscribe_events();

    grid.begin_edit(&row("r1"), ColumnKey::TicketNo).await.expect("begin");
    grid.input("").await.expect("type");
    let err = grid
        .key(EditKey::Enter { shift: false })
        .await
        .expect_err("required");
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::Required(ColumnKey::TicketNo))
    ));
    assert!(grid.edit_session().is_some());
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, GridEvent::ValidationFailed { .. })));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(store.update_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_save_keeps_the_optimistic_value_and_flags_the_cell() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;
    store.fail_next_writes(1);

    let err = grid
        .select_cell(&row("r1"), ColumnKey::Priority, Selection::Value("High".into()))
        .await
        .expect_err("write fails");
    assert!(matches!(err, AppError::Store(_)));
    assert_eq!(
        grid.display_value(&row("r1"), ColumnKey::Priority),
        Some(CellValue::Text("High".into()))
    );
    assert!(matches!(
        grid.indicator(&row("r1"), ColumnKey::Priority),
        Some(SaveStatus::Error(_))
    ));
    assert_eq!(
        store.row(&workspace(), &row("r1")).map(|t| t.priority),
        Some("Medium".to_owned())
    );

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(store.update_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unmount_flushes_pending_text_by_default() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Notes).await.expect("begin");
    grid.input("unsaved").await.expect("type");
    grid.unmount().await.expect("unmount");

    assert!(!grid.is_mounted());
    assert_eq!(
        store.row(&workspace(), &row("r1")).map(|t| t.notes),
        Some("unsaved".to_owned())
    );
}

#[tokio::test(start_paused = true)]
async fn unmount_can_drop_pending_text() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Drop).await;

    grid.begin_edit(&row("r1"), ColumnKey::Notes).await.expect("begin");
    grid.input("unsaved").await.expect("type");
    grid.unmount().await.expect("unmount");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(store.update_calls().is_empty());
    assert!(matches!(grid.unmount().await, Err(AppError::NotMounted)));
}

#[tokio::test(start_paused = true)]
async fn mount_seeds_defaults_into_empty_lists() {
    let store = Arc::new(InMemoryStore::new());
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    let stored = store.options(&workspace());
    assert_eq!(stored.priorities, vec!["High", "Medium", "Low"]);
    assert_eq!(stored.terminal_status(), Some("Complete"));
    assert_eq!(grid.terminal_status().as_deref(), Some("Complete"));
}

#[tokio::test(start_paused = true)]
async fn created_and_deleted_tasks_flow_through_the_snapshot() {
    let store = seeded(Vec::new());
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    let err = grid
        .create_task(Default::default())
        .await
        .expect_err("ticket number required");
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::Required(ColumnKey::TicketNo))
    ));

    let row_id = grid
        .create_task(team_grid_lib::tasks::types::TaskDraft {
            ticket_no: "T-100".into(),
            ..Default::default()
        })
        .await
        .expect("create");
    settle().await;
    let created = grid.row(&row_id).expect("row in snapshot");
    assert_eq!(created.status, "Open");

    grid.begin_edit(&row_id, ColumnKey::Notes).await.expect("begin");
    grid.delete_task(&row_id).await.expect("delete");
    settle().await;
    assert!(grid.edit_session().is_none());
    assert!(grid.rows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn select_cells_only_take_listed_values() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    let err = grid
        .select_cell(&row("r1"), ColumnKey::Status, Selection::Value("NotInList".into()))
        .await
        .expect_err("unlisted status");
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::NotAnOption {
            list: ListName::Statuses,
            ..
        })
    ));

    grid.begin_edit(&row("r1"), ColumnKey::Status).await.expect("begin");
    grid.select(Selection::Value("NotInList".into()))
        .await
        .expect_err("unlisted status in a session");
    assert!(grid.edit_session().is_some());

    settle().await;
    assert!(store.update_calls().is_empty());
    assert_eq!(
        store.row(&workspace(), &row("r1")).map(|t| t.status),
        Some("Open".to_owned())
    );
}

#[tokio::test(start_paused = true)]
async fn picking_a_removed_option_placeholder_changes_nothing() {
    let mut archived = task("r1", "Archived", 1);
    archived.priority = "Urgent".into();
    let store = seeded(vec![archived]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    let placeholder = grid
        .choices(&row("r1"), ColumnKey::Priority)
        .expect("choices")
        .into_iter()
        .find(|choice| !choice.enabled)
        .expect("removed placeholder");
    assert_eq!(placeholder.label, "Urgent (removed)");

    grid.begin_edit(&row("r1"), ColumnKey::Priority).await.expect("begin");
    grid.select(placeholder.selection).await.expect("own value");
    assert!(grid.edit_session().is_none());
    settle().await;
    assert!(store.update_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn removed_member_keeps_its_reference_when_picked_again() {
    let mut assigned = task("r1", "Open", 1);
    assigned.developer = Some(Assignee::Member {
        id: "u-1".into(),
        label: "Ana".into(),
    });
    let store = seeded(vec![assigned]);
    store.grant_role(&workspace(), "u-1", "developer");
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    let outcome = grid.options().remove_member("u-1").await.expect("remove member");
    assert_eq!(outcome, RemoveOutcome::Removed("u-1".into()));
    assert!(store.roles(&workspace(), "u-1").is_empty());
    settle().await;

    let choices = grid.choices(&row("r1"), ColumnKey::Developer).expect("choices");
    let labels: Vec<&str> = choices.iter().map(|choice| choice.label.as_str()).collect();
    assert_eq!(labels, vec!["Ana (removed)", "+ Invite user…"]);
    assert!(!choices[0].enabled);
    let shown = grid
        .display_value(&row("r1"), ColumnKey::Developer)
        .map(|value| value.display());
    assert_eq!(shown.as_deref(), Some("Ana"));

    grid.begin_edit(&row("r1"), ColumnKey::Developer).await.expect("begin");
    grid.select(choices[0].selection.clone()).await.expect("stale pick");
    grid.select_cell(&row("r1"), ColumnKey::Developer, choices[0].selection.clone())
        .await
        .expect("stale pick outside a session");
    settle().await;

    assert!(store.update_calls().is_empty());
    assert_eq!(
        store.row(&workspace(), &row("r1")).and_then(|t| t.developer),
        Some(Assignee::Member {
            id: "u-1".into(),
            label: "Ana".into()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn option_snapshot_leaves_an_unrelated_session_untouched() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Notes).await.expect("begin");
    grid.input("half typed").await.expect("type");
    let before = grid.edit_session().expect("editing");

    store
        .set_list(
            &workspace(),
            ListName::Priorities,
            vec!["P0".into(), "P1".into()],
        )
        .await
        .expect("remote list change");
    settle().await;

    assert_eq!(grid.edit_session(), Some(before));
    let labels: Vec<String> = grid
        .choices(&row("r1"), ColumnKey::Priority)
        .expect("choices")
        .into_iter()
        .map(|choice| choice.label)
        .collect();
    assert_eq!(labels, vec!["P0", "P1", "Medium (removed)", "+ Add new option…"]);
    assert!(store.update_calls().is_empty());

    tokio::time::sleep(Duration::from_millis(800)).await;
    let calls = store.update_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].patch,
        TaskPatch::single(ColumnKey::Notes, CellValue::Text("half typed".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn enter_after_the_debounced_write_does_not_write_again() {
    let store = seeded(vec![task("r1", "Open", 1)]);
    let grid = mounted(&store, UnmountPolicy::Flush).await;

    grid.begin_edit(&row("r1"), ColumnKey::Notes).await.expect("begin");
    grid.input("abcd").await.expect("type");
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(store.update_calls().len(), 1);

    grid.key(EditKey::Enter { shift: false }).await.expect("commit");
    assert!(grid.edit_session().is_none());
    settle().await;
    assert_eq!(store.update_calls().len(), 1);
}

