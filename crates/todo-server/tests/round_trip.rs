//! HttpStore and TodoSession against a live server

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;

use todo_core::{
    AdminView, Category, Draft, HttpStore, Identity, IdentityWatch, Role, Schedule,
    StoreConfig, StoreError, SubmitConfig, SyncOp, SyncStatus, TodoConfig, TodoError,
    TodoQuery, TodoSession, TodoStore,
};
use todo_server::{create_router, AppState};

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(Arc::new(AppState::new()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str, identity: &IdentityWatch) -> TodoSession {
    let config = TodoConfig {
        submit: SubmitConfig { cooldown_ms: 0 },
        store: StoreConfig {
            base_url: Some(base_url.to_string()),
            timeout_secs: 5,
        },
        ..TodoConfig::default()
    };
    TodoSession::from_config(&config, identity).unwrap()
}

#[tokio::test]
async fn session_round_trips_through_the_server() {
    let base_url = spawn_server().await;
    let identity = IdentityWatch::new();
    identity.sign_in(Identity::new("u-ada", "Ada"));
    let session = client(&base_url, &identity);
    session.set_identity(identity.current()).await.unwrap();

    let mut draft = Draft::time_range("Finish report", "Work", "09:00", "10:00");
    let submitted = session.add(&mut draft).unwrap();
    submitted.write.wait().await;
    assert_eq!(session.get(&submitted.id).unwrap().status, SyncStatus::Confirmed);

    let deadline = Utc::now() + chrono::Duration::days(2);
    session
        .add(&mut Draft::deadline("Read chapter", "Study", deadline))
        .unwrap()
        .write
        .wait()
        .await;

    session.toggle(&submitted.id).unwrap().wait().await;

    // a second device signed in as the same user sees the same items
    let other = client(&base_url, &identity);
    other.set_identity(identity.current()).await.unwrap();
    let items = other.snapshot();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text, "Finish report");
    assert_eq!(items[0].category, Category::Work);
    assert!(items[0].completed);
    assert_eq!(items[1].category, Category::Study);
    assert_eq!(items[1].schedule, Schedule::Deadline { deadline });

    other.delete(&items[0].id).unwrap().wait().await;
    session.reload().await.unwrap();
    assert_eq!(session.snapshot().len(), 1);
}

#[tokio::test]
async fn http_store_maps_server_errors() {
    let base_url = spawn_server().await;
    let identity = IdentityWatch::new();
    let store = HttpStore::new(&base_url, Duration::from_secs(5), identity.subscribe()).unwrap();

    identity.sign_in(Identity::new("u-ada", "Ada"));
    let session = TodoSession::new(Arc::new(
        HttpStore::new(&base_url, Duration::from_secs(5), identity.subscribe()).unwrap(),
    ), &SubmitConfig { cooldown_ms: 0 });
    session.set_identity(identity.current()).await.unwrap();
    session
        .add(&mut Draft::time_range("Run", "Exercise", "06:00", "07:00"))
        .unwrap()
        .write
        .wait()
        .await;

    let err = AdminView::load(&store, &identity.current().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, TodoError::Forbidden(_)));

    // the server checks the roles it is sent, not the viewer passed in
    let admin = Identity::new("u-ada", "Ada").with_role(Role::Admin);
    let err = AdminView::load(&store, &admin).await.unwrap_err();
    assert!(matches!(err, TodoError::Store(StoreError::Forbidden(_))));

    identity.sign_in(Identity::new("2781687723", "Root").with_role(Role::Admin));
    let view = AdminView::load(&store, &identity.current().unwrap()).await.unwrap();
    assert_eq!(view.owners(), vec!["Ada"]);

    let missing = todo_core::TodoId::from("does-not-exist");
    assert_eq!(store.get(&missing).await.unwrap(), None);
    store.delete(&missing).await.unwrap();

    identity.sign_out();
    assert!(matches!(
        store.revision("u-ada").await,
        Err(StoreError::Unauthorized)
    ));
}

#[tokio::test]
async fn write_started_before_an_identity_switch_is_not_stored_for_the_new_user() {
    let base_url = spawn_server().await;
    let identity = IdentityWatch::new();
    identity.sign_in(Identity::new("u-ada", "Ada"));
    let session = client(&base_url, &identity);
    session.set_identity(identity.current()).await.unwrap();

    let submitted = session
        .add(&mut Draft::time_range("Ada's secret", "Other", "09:00", "10:00"))
        .unwrap();
    // the headers now name Bob, while the write still belongs to Ada
    identity.sign_in(Identity::new("u-bob", "Bob"));
    submitted.write.wait().await;

    assert_eq!(
        session.get(&submitted.id).unwrap().status,
        SyncStatus::Failed(SyncOp::Create)
    );

    let store = HttpStore::new(&base_url, Duration::from_secs(5), identity.subscribe()).unwrap();
    let bob_items = store.query(&TodoQuery::owned_by("u-bob")).await.unwrap();
    assert!(bob_items.is_empty());

    identity.sign_in(Identity::new("u-ada", "Ada"));
    let ada_items = store.query(&TodoQuery::owned_by("u-ada")).await.unwrap();
    assert!(ada_items.is_empty());
}
