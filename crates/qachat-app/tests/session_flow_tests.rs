mod common;

use common::{controller_in, ScriptedClient};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use qachat::session::{NoticeKind, SessionContext, SessionError, SessionState};
use qachat_store::{CredentialStore, HistoryStore};
use qachat_types::{AuthError, ChatTurn, Page};

#[tokio::test]
async fn test_signup_then_login_example() {
    let dir = TempDir::new().unwrap();
    let mut controller = controller_in(&dir, ScriptedClient::new());
    let mut ctx = SessionContext::new();

    controller.show_signup(&mut ctx).unwrap();
    assert_eq!(ctx.page(), Some(Page::Signup));

    controller
        .sign_up(&mut ctx, "alice", "a@x.com", "pw123")
        .await
        .unwrap();
    assert_eq!(ctx.state, SessionState::Anonymous { page: Page::Login });
    assert_eq!(ctx.take_notice().map(|n| n.kind), Some(NoticeKind::Success));

    let store = CredentialStore::open(dir.path().join("user_data.csv")).unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.verify("alice", "pw123"));

    let err = controller.login(&mut ctx, "alice", "wrong").await.unwrap_err();
    assert!(matches!(err, SessionError::Auth(AuthError::WrongPassword)));
    assert!(!ctx.is_authenticated());

    let err = controller.login(&mut ctx, "bob", "pw123").await.unwrap_err();
    assert_eq!(err.to_string(), "Username not found");

    controller.login(&mut ctx, "alice", "pw123").await.unwrap();
    assert_eq!(ctx.username(), Some("alice"));
}

#[tokio::test]
async fn test_duplicate_signup_stays_on_form() {
    let dir = TempDir::new().unwrap();
    let mut controller = controller_in(&dir, ScriptedClient::new());
    let mut ctx = SessionContext::new();

    controller.sign_up(&mut ctx, "alice", "a@x.com", "pw123").await.unwrap();
    let before = std::fs::read_to_string(dir.path().join("user_data.csv")).unwrap();

    controller.show_signup(&mut ctx).unwrap();
    let err = controller
        .sign_up(&mut ctx, "alice", "other@x.com", "different")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Username already exists!");
    assert_eq!(ctx.page(), Some(Page::Signup));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("user_data.csv")).unwrap(),
        before
    );
    assert!(controller.credentials().verify("alice", "pw123"));
}

#[tokio::test]
async fn test_submit_records_exchange_newest_first() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new();
    client.reply("Hi! How can I help?");
    let mut controller = controller_in(&dir, client.clone());
    let mut ctx = SessionContext::new();

    controller.sign_up(&mut ctx, "alice", "a@x.com", "pw123").await.unwrap();
    controller.login(&mut ctx, "alice", "pw123").await.unwrap();

    let reply = controller.submit(&mut ctx, "hello").await.unwrap();

    let expected = vec![
        ChatTurn::assistant("Hi! How can I help?"),
        ChatTurn::user("hello"),
    ];
    assert_eq!(reply, "Hi! How can I help?");
    assert_eq!(ctx.current_history(), expected.as_slice());

    let on_disk = HistoryStore::new(dir.path().join("chat_histories"))
        .unwrap()
        .load("alice")
        .unwrap();
    assert_eq!(on_disk, expected);
    assert_eq!(client.requests(), vec![vec![ChatTurn::user("hello")]]);
}

#[tokio::test]
async fn test_context_is_sent_oldest_first() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new();
    client.reply("one");
    client.reply("two");
    let mut controller = controller_in(&dir, client.clone());
    let mut ctx = SessionContext::new();

    controller.sign_up(&mut ctx, "alice", "", "pw").await.unwrap();
    controller.login(&mut ctx, "alice", "pw").await.unwrap();
    controller.submit(&mut ctx, "first").await.unwrap();
    controller.submit(&mut ctx, "second").await.unwrap();

    assert_eq!(
        client.requests()[1],
        vec![
            ChatTurn::user("first"),
            ChatTurn::assistant("one"),
            ChatTurn::user("second"),
        ]
    );
}

#[tokio::test]
async fn test_empty_question_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new();
    let mut controller = controller_in(&dir, client.clone());
    let mut ctx = SessionContext::new();

    controller.sign_up(&mut ctx, "alice", "", "pw").await.unwrap();
    controller.login(&mut ctx, "alice", "pw").await.unwrap();

    let err = controller.submit(&mut ctx, "   \n").await.unwrap_err();

    assert!(matches!(err, SessionError::EmptyInput));
    assert!(client.requests().is_empty());
    assert!(ctx.current_history().is_empty());
    assert!(!dir.path().join("chat_histories/alice_history.json").exists());
}

#[tokio::test]
async fn test_failed_completion_then_retry() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new();
    client.fail("503 Service Unavailable");
    client.reply("Sorry for the wait");
    let mut controller = controller_in(&dir, client.clone());
    let mut ctx = SessionContext::new();

    controller.sign_up(&mut ctx, "alice", "", "pw").await.unwrap();
    controller.login(&mut ctx, "alice", "pw").await.unwrap();

    let err = controller.submit(&mut ctx, "are you there?").await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("503"));
    assert!(ctx.current_history().is_empty());
    assert_eq!(ctx.pending_question.as_deref(), Some("are you there?"));
    assert!(!dir.path().join("chat_histories/alice_history.json").exists());

    controller.retry(&mut ctx).await.unwrap();

    assert_eq!(
        ctx.current_history(),
        &[
            ChatTurn::assistant("Sorry for the wait"),
            ChatTurn::user("are you there?"),
        ]
    );
    assert!(ctx.pending_question.is_none());
    assert!(matches!(
        controller.retry(&mut ctx).await.unwrap_err(),
        SessionError::NothingToRetry
    ));
}

#[tokio::test]
async fn test_logout_discards_and_login_reloads() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new();
    client.reply("42");
    let mut controller = controller_in(&dir, client);
    let mut ctx = SessionContext::new();

    controller.sign_up(&mut ctx, "alice", "", "pw").await.unwrap();
    controller.login(&mut ctx, "alice", "pw").await.unwrap();
    controller.submit(&mut ctx, "meaning of life?").await.unwrap();

    controller.logout(&mut ctx).await.unwrap();
    assert_eq!(ctx.state, SessionState::Anonymous { page: Page::Login });
    assert!(ctx.histories.is_empty());

    controller.login(&mut ctx, "alice", "pw").await.unwrap();
    assert_eq!(ctx.current_history().len(), 2);
    assert_eq!(ctx.current_history()[0], ChatTurn::assistant("42"));
}

#[tokio::test]
async fn test_wrong_state_actions_are_rejected() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new();
    let mut controller = controller_in(&dir, client.clone());
    let mut ctx = SessionContext::new();

    let err = controller.submit(&mut ctx, "hello").await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));
    assert!(matches!(
        controller.logout(&mut ctx).await.unwrap_err(),
        SessionError::InvalidTransition { .. }
    ));
    assert!(client.requests().is_empty());

    controller.sign_up(&mut ctx, "alice", "", "pw").await.unwrap();
    controller.login(&mut ctx, "alice", "pw").await.unwrap();

    assert!(matches!(
        controller.login(&mut ctx, "alice", "pw").await.unwrap_err(),
        SessionError::InvalidTransition { .. }
    ));
    assert!(matches!(
        controller.show_signup(&mut ctx).unwrap_err(),
        SessionError::InvalidTransition { .. }
    ));
    assert_eq!(ctx.username(), Some("alice"));
}

#[tokio::test]
async fn test_history_loads_on_demand() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new();
    client.reply("new reply");
    let mut controller = controller_in(&dir, client);
    let mut ctx = SessionContext::new();

    controller.sign_up(&mut ctx, "alice", "", "pw").await.unwrap();
    controller
        .history_store()
        .save("alice", &[ChatTurn::assistant("old reply"), ChatTurn::user("old")])
        .unwrap();
    controller.login(&mut ctx, "alice", "pw").await.unwrap();
    ctx.histories.clear();

    controller.submit(&mut ctx, "new").await.unwrap();

    let on_disk = controller.history_store().load("alice").unwrap();
    assert_eq!(on_disk.len(), 4);
    assert_eq!(on_disk[3], ChatTurn::user("old"));
}

#[tokio::test]
async fn test_corrupted_history_blocks_login_and_is_kept() {
    let dir = TempDir::new().unwrap();
    let mut controller = controller_in(&dir, ScriptedClient::new());
    let mut ctx = SessionContext::new();

    controller.sign_up(&mut ctx, "alice", "", "pw").await.unwrap();
    let path = controller.history_store().path_for("alice");
    std::fs::write(&path, "{not json").unwrap();

    let err = controller.login(&mut ctx, "alice", "pw").await.unwrap_err();

    assert!(matches!(err, SessionError::Storage(_)));
    assert!(!ctx.is_authenticated());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
}

#[tokio::test]
async fn test_invalid_username_is_rejected_at_signup() {
    let dir = TempDir::new().unwrap();
    let mut controller = controller_in(&dir, ScriptedClient::new());
    let mut ctx = SessionContext::new();

    let err = controller
        .sign_up(&mut ctx, "../escape", "", "pw")
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Auth(AuthError::InvalidUsername(_))));
    assert!(controller.credentials().is_empty());
}
