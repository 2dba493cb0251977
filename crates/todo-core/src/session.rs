//! Intent handling for one client session
//!
//! A [`TodoSession`] owns the list state, the submit gate and the current
//! identity. Intents apply their local mutation under the session lock and
//! return at once; the matching store write runs on a spawned task and
//! reports back into the list when it settles. Callers that care about the
//! outcome can await the returned [`PendingWrite`]; nobody has to.
//!
//! Every identity change bumps a generation counter. Write results and
//! reloads started under an older generation are dropped so one user's
//! completions never land in another user's list.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::config::{SubmitConfig, TodoConfig};
use crate::error::{Result, TodoError};
use crate::identity::{Identity, IdentityWatch};
use crate::item::{NewTodo, TodoId, TodoItem};
use crate::list::{CreateOutcome, Entry, Retry, SyncOp, Toggle, TodoList};
use crate::store::{HttpStore, TodoPatch, TodoQuery, TodoStore};
use crate::validation::{Draft, SubmitGate};

/// Owner recorded on items created without an identity
pub const LOCAL_OWNER: &str = "local";

/// Handle to a store write started by an intent
#[derive(Debug)]
pub struct PendingWrite(Option<JoinHandle<()>>);

impl PendingWrite {
    fn settled() -> Self {
        Self(None)
    }

    /// Whether a store write was started
    pub fn is_remote(&self) -> bool {
        self.0.is_some()
    }

    /// Wait until the write has been applied to the list, successfully or not
    pub async fn wait(self) {
        if let Some(handle) = self.0 {
            if let Err(e) = handle.await {
                tracing::warn!("store write task ended abnormally: {}", e);
            }
        }
    }
}

/// Result of an accepted add intent
#[derive(Debug)]
pub struct Submitted {
    /// Local id of the new item; stays valid after the store assigns its own
    pub id: TodoId,
    pub write: PendingWrite,
}

struct State {
    identity: Option<Identity>,
    generation: u64,
    list: TodoList,
    gate: SubmitGate,
}

struct Inner {
    store: Option<Arc<dyn TodoStore>>,
    state: Mutex<State>,
}

/// Client-side state and intent handlers for one user session.
#[derive(Clone)]
pub struct TodoSession {
    inner: Arc<Inner>,
}

enum FollowUp {
    Update(Toggle),
    Delete(TodoId),
}

impl TodoSession {
    /// Session mirrored to a store
    pub fn new(store: Arc<dyn TodoStore>, submit: &SubmitConfig) -> Self {
        Self::build(Some(store), TodoList::tracked(), submit)
    }

    /// Session with no store; the list lives only in memory
    pub fn detached(submit: &SubmitConfig) -> Self {
        Self::build(None, TodoList::local(), submit)
    }

    /// Session for a configuration: backed by the HTTP store when a base
    /// URL is configured, detached otherwise.
    pub fn from_config(config: &TodoConfig, identity: &IdentityWatch) -> Result<Self> {
        match &config.store.base_url {
            Some(url) => {
                let store = HttpStore::new(url, config.store.timeout(), identity.subscribe())?;
                Ok(Self::new(Arc::new(store), &config.submit))
            }
            None => Ok(Self::detached(&config.submit)),
        }
    }

    fn build(store: Option<Arc<dyn TodoStore>>, list: TodoList, submit: &SubmitConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                state: Mutex::new(State {
                    identity: None,
                    generation: 0,
                    list,
                    gate: SubmitGate::new(submit.cooldown()),
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn<F>(&self, write: F) -> PendingWrite
    where
        F: Future<Output = ()> + Send + 'static,
    {
        PendingWrite(Some(tokio::spawn(write)))
    }

    pub fn store(&self) -> Option<Arc<dyn TodoStore>> {
        self.inner.store.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    /// Items in display order
    pub fn snapshot(&self) -> Vec<TodoItem> {
        self.lock().list.items().cloned().collect()
    }

    /// Items with their sync status
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().list.entries().to_vec()
    }

    pub fn get(&self, id: &TodoId) -> Option<Entry> {
        self.lock().list.get(id).cloned()
    }

    /// Writes the store refused, by current item id
    pub fn failed(&self) -> Vec<(TodoId, SyncOp)> {
        self.lock().list.failed()
    }

    /// Inline message from the last rejected add
    pub fn error_message(&self) -> Option<String> {
        self.lock().gate.message().map(str::to_string)
    }

    /// Whether the submit affordance is enabled
    pub fn can_submit(&self) -> bool {
        self.lock().gate.is_enabled()
    }

    /// Add intent: validate the draft, append the item, start the create.
    pub fn add(&self, draft: &mut Draft) -> Result<Submitted> {
        let (id, todo, generation) = {
            let mut state = self.lock();
            if self.inner.store.is_some() && state.identity.is_none() {
                return Err(TodoError::Unauthenticated);
            }

            let fields = state.gate.submit(draft)?;
            let (owner_id, owner_name) = match &state.identity {
                Some(identity) => (identity.id.clone(), identity.name.clone()),
                None => (LOCAL_OWNER.to_string(), LOCAL_OWNER.to_string()),
            };
            let now = Utc::now();
            let todo = NewTodo::from_fields(fields, owner_id, owner_name, now);
            let id = state.list.push(todo.clone(), now.timestamp_millis());
            (id, todo, state.generation)
        };

        let write = match self.inner.store {
            Some(_) => {
                let session = self.clone();
                let local_id = id.clone();
                self.spawn(async move { session.run_create(generation, local_id, todo).await })
            }
            None => PendingWrite::settled(),
        };

        Ok(Submitted { id, write })
    }

    /// Toggle intent. Returns `None` when no item has this id.
    pub fn toggle(&self, id: &TodoId) -> Option<PendingWrite> {
        let (toggle, generation) = {
            let mut state = self.lock();
            let toggle = state.list.toggle(id)?;
            (toggle, state.generation)
        };

        if !toggle.send {
            return Some(PendingWrite::settled());
        }

        let session = self.clone();
        Some(self.spawn(async move { session.run_update(generation, toggle).await }))
    }

    /// Delete intent. The item leaves the list whatever the store answers.
    /// Returns `None` when no item has this id.
    pub fn delete(&self, id: &TodoId) -> Option<PendingWrite> {
        let (removal, generation) = {
            let mut state = self.lock();
            let removal = state.list.remove(id)?;
            (removal, state.generation)
        };

        let Some(stored_id) = removal.stored_id else {
            return Some(PendingWrite::settled());
        };

        let session = self.clone();
        Some(self.spawn(async move { session.run_delete(generation, stored_id).await }))
    }

    /// Re-send every write the store refused
    pub fn retry_failed(&self) -> Vec<PendingWrite> {
        let (retries, generation) = {
            let mut state = self.lock();
            (state.list.begin_retry(), state.generation)
        };

        retries
            .into_iter()
            .map(|retry| {
                let session = self.clone();
                match retry {
                    Retry::Create { local_id, todo } => self.spawn(async move {
                        session.run_create(generation, local_id, todo).await
                    }),
                    Retry::Update(toggle) => {
                        self.spawn(async move { session.run_update(generation, toggle).await })
                    }
                    Retry::Delete(id) => {
                        self.spawn(async move { session.run_delete(generation, id).await })
                    }
                }
            })
            .collect()
    }

    /// Revert the local effect of a failed write
    pub fn rollback(&self, id: &TodoId) -> bool {
        self.lock().list.rollback(id)
    }

    /// React to a sign-in, sign-out or account switch.
    ///
    /// A store-backed session drops its list and, when signed in, reloads
    /// it for the new identity. Reporting the current identity again does
    /// nothing.
    pub async fn set_identity(&self, identity: Option<Identity>) -> Result<()> {
        let signed_in = {
            let mut state = self.lock();
            if state.identity == identity {
                return Ok(());
            }
            tracing::debug!(
                "identity changed to {:?}",
                identity.as_ref().map(|i| i.id.as_str())
            );
            state.identity = identity;
            state.generation += 1;
            if state.list.is_tracked() {
                state.list.clear();
            }
            state.identity.is_some()
        };

        if signed_in && self.inner.store.is_some() {
            self.reload().await?;
        }
        Ok(())
    }

    /// Fetch the owner's items and merge them into the list.
    pub async fn reload(&self) -> Result<()> {
        let Some(store) = self.store() else {
            return Ok(());
        };

        let (owner, generation) = {
            let state = self.lock();
            let identity = state.identity.as_ref().ok_or(TodoError::Unauthenticated)?;
            (identity.id.clone(), state.generation)
        };

        let items = store.query(&TodoQuery::owned_by(owner)).await?;

        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!("discarding reload for a previous identity");
            return Ok(());
        }
        tracing::debug!("reloaded {} items", items.len());
        state.list.reload(items);
        Ok(())
    }

    /// Reload only when the store's revision differs from `seen`.
    ///
    /// Stores without a revision token are always reloaded. Returns whether
    /// a reload happened.
    pub async fn reload_if_changed(&self, seen: &mut Option<u64>) -> Result<bool> {
        let Some(store) = self.store() else {
            return Ok(false);
        };

        let owner = self
            .identity()
            .map(|identity| identity.id)
            .ok_or(TodoError::Unauthenticated)?;
        let revision = store.revision(&owner).await?;
        if revision.is_some() && revision == *seen {
            return Ok(false);
        }

        self.reload().await?;
        *seen = revision;
        Ok(true)
    }

    /// The store to send a write on, unless the identity the write was made
    /// under is gone
    fn store_for(&self, generation: u64) -> Option<Arc<dyn TodoStore>> {
        let store = self.store()?;
        if self.lock().generation != generation {
            tracing::debug!("not sending a write from a previous identity");
            return None;
        }
        Some(store)
    }

    async fn run_create(&self, generation: u64, local_id: TodoId, todo: NewTodo) {
        let Some(store) = self.store_for(generation) else {
            return;
        };
        let result = store.create(todo).await;

        let follow_up = {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::debug!("dropping create result for {} from a previous identity", local_id);
                return;
            }
            match result {
                Ok(stored) => match state.list.confirm_created(&local_id, &stored) {
                    CreateOutcome::Confirmed { follow_up } => follow_up.map(FollowUp::Update),
                    CreateOutcome::Orphaned(id) => Some(FollowUp::Delete(id)),
                },
                Err(e) => {
                    tracing::warn!("create of {} failed: {}", local_id, e);
                    state.list.fail_create(&local_id);
                    None
                }
            }
        };

        match follow_up {
            Some(FollowUp::Update(toggle)) => self.run_update(generation, toggle).await,
            Some(FollowUp::Delete(id)) => self.run_delete(generation, id).await,
            None => {}
        }
    }

    async fn run_update(&self, generation: u64, toggle: Toggle) {
        let Some(store) = self.store_for(generation) else {
            return;
        };
        let result = store
            .update(&toggle.id, TodoPatch::completed(toggle.completed))
            .await;

        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        match result {
            Ok(()) => state.list.confirm_update(&toggle.id, toggle.revision),
            Err(e) => {
                tracing::warn!("update of {} failed: {}", toggle.id, e);
                state.list.fail_update(&toggle.id, toggle.revision);
            }
        }
    }

    async fn run_delete(&self, generation: u64, id: TodoId) {
        let Some(store) = self.store_for(generation) else {
            return;
        };
        let result = store.delete(&id).await;

        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        match result {
            Ok(()) => state.list.confirm_delete(&id),
            Err(e) => {
                tracing::warn!("delete of {} failed: {}", id, e);
                state.list.fail_delete(&id);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::item::{Category, Schedule};
    use crate::list::SyncStatus;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// In-memory store whose writes can be failed or held back
    pub(crate) struct TestStore {
        pub(crate) inner: InMemoryStore,
        failing: AtomicBool,
        held: AtomicBool,
        answers_held: AtomicBool,
        permits: Semaphore,
    }

    impl Default for TestStore {
        fn default() -> Self {
            Self {
                inner: InMemoryStore::new(),
                failing: AtomicBool::new(false),
                held: AtomicBool::new(false),
                answers_held: AtomicBool::new(false),
                permits: Semaphore::new(0),
            }
        }
    }

    impl TestStore {
        pub(crate) fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub(crate) fn hold(&self) {
            self.held.store(true, Ordering::SeqCst);
        }

        /// Creates reach the store but their answers wait for `release`
        pub(crate) fn hold_answers(&self) {
            self.answers_held.store(true, Ordering::SeqCst);
        }

        pub(crate) fn release(&self) {
            self.held.store(false, Ordering::SeqCst);
            self.answers_held.store(false, Ordering::SeqCst);
            self.permits.add_permits(64);
        }

        async fn wait_if(&self, gate: &AtomicBool) {
            if gate.load(Ordering::SeqCst) {
                self.permits.acquire().await.expect("semaphore open").forget();
            }
        }

        async fn pass(&self) -> std::result::Result<(), StoreError> {
            self.wait_if(&self.held).await;
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("offline".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TodoStore for TestStore {
        async fn create(&self, todo: NewTodo) -> std::result::Result<TodoItem, StoreError> {
            self.pass().await?;
            let stored = self.inner.create(todo).await?;
            self.wait_if(&self.answers_held).await;
            Ok(stored)
        }

        async fn get(&self, id: &TodoId) -> std::result::Result<Option<TodoItem>, StoreError> {
            self.inner.get(id).await
        }

        async fn update(&self, id: &TodoId, patch: TodoPatch) -> std::result::Result<(), StoreError> {
            self.pass().await?;
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: &TodoId) -> std::result::Result<(), StoreError> {
            self.pass().await?;
            self.inner.delete(id).await
        }

        async fn query(&self, query: &TodoQuery) -> std::result::Result<Vec<TodoItem>, StoreError> {
            self.inner.query(query).await
        }

        async fn revision(&self, owner_id: &str) -> std::result::Result<Option<u64>, StoreError> {
            self.inner.revision(owner_id).await
        }
    }

    fn ada() -> Identity {
        Identity::new("u-ada", "Ada")
    }

    fn report() -> Draft {
        Draft::time_range("Finish report", "Work", "09:00", "10:00")
    }

    fn quick() -> SubmitConfig {
        SubmitConfig { cooldown_ms: 0 }
    }

    async fn signed_in(store: Arc<TestStore>) -> TodoSession {
        let session = TodoSession::new(store, &quick());
        session.set_identity(Some(ada())).await.unwrap();
        session
    }

    #[tokio::test]
    async fn finish_report_scenario() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;

        let mut draft = report();
        let submitted = session.add(&mut draft).unwrap();
        assert!(submitted.id.is_local());
        assert_eq!(draft, Draft::default());
        assert_eq!(session.get(&submitted.id).unwrap().status, SyncStatus::Pending);
        submitted.write.wait().await;

        let entry = session.get(&submitted.id).unwrap();
        assert_eq!(entry.status, SyncStatus::Confirmed);
        assert!(!entry.id().is_local());
        assert!(!entry.item.completed);
        assert_eq!(entry.item.owner_name, "Ada");

        let mut empty = Draft::time_range("", "Work", "09:00", "10:00");
        let err = session.add(&mut empty).unwrap_err();
        assert!(matches!(err, TodoError::Validation(_)));
        assert!(session.error_message().is_some());
        assert_eq!(session.snapshot().len(), 1);

        session.toggle(&submitted.id).unwrap().wait().await;
        let stored = store.inner.get(entry.id()).await.unwrap().unwrap();
        assert!(stored.completed);
        assert!(session.snapshot()[0].completed);

        session.delete(&submitted.id).unwrap().wait().await;
        assert!(session.snapshot().is_empty());
        assert!(store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn store_backed_session_requires_identity() {
        let store = Arc::new(TestStore::default());
        let session = TodoSession::new(store, &quick());
        let err = session.add(&mut report()).unwrap_err();
        assert!(matches!(err, TodoError::Unauthenticated));
        assert!(matches!(session.reload().await, Err(TodoError::Unauthenticated)));
    }

    #[tokio::test]
    async fn submit_cools_down_after_add() {
        let store = Arc::new(TestStore::default());
        let session = TodoSession::new(store, &SubmitConfig { cooldown_ms: 50 });
        session.set_identity(Some(ada())).await.unwrap();

        session.add(&mut report()).unwrap();
        assert!(!session.can_submit());
        assert!(matches!(
            session.add(&mut report()),
            Err(TodoError::CoolingDown { .. })
        ));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(session.can_submit());
        assert_eq!(session.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn add_then_reload_round_trips_fields() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;
        let deadline = Utc::now() + chrono::Duration::days(3);
        session
            .add(&mut Draft::deadline("Essay", "Philosophy", deadline))
            .unwrap()
            .write
            .wait()
            .await;

        let other = signed_in(store).await;
        let items = other.snapshot();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Essay");
        assert_eq!(items[0].category, Category::Other("Philosophy".into()));
        assert_eq!(items[0].schedule, Schedule::Deadline { deadline });
        assert_eq!(items[0].days_remaining(Utc::now()), Some(3));
    }

    #[tokio::test]
    async fn failed_create_is_surfaced_and_retried() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;

        store.fail(true);
        let submitted = session.add(&mut report()).unwrap();
        submitted.write.wait().await;

        assert_eq!(
            session.get(&submitted.id).unwrap().status,
            SyncStatus::Failed(SyncOp::Create)
        );
        assert_eq!(session.failed(), vec![(submitted.id.clone(), SyncOp::Create)]);
        // remote failures never become the inline validation message
        assert_eq!(session.error_message(), None);

        store.fail(false);
        for write in session.retry_failed() {
            write.wait().await;
        }
        assert_eq!(session.get(&submitted.id).unwrap().status, SyncStatus::Confirmed);
        assert_eq!(store.inner.len().await, 1);
    }

    #[tokio::test]
    async fn failed_toggle_can_be_rolled_back() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;
        let submitted = session.add(&mut report()).unwrap();
        submitted.write.wait().await;

        store.fail(true);
        session.toggle(&submitted.id).unwrap().wait().await;
        let entry = session.get(&submitted.id).unwrap();
        assert!(entry.item.completed);
        assert_eq!(entry.status, SyncStatus::Failed(SyncOp::Update));

        assert!(session.rollback(&submitted.id));
        let entry = session.get(&submitted.id).unwrap();
        assert!(!entry.item.completed);
        assert_eq!(entry.status, SyncStatus::Confirmed);
    }

    #[tokio::test]
    async fn failed_delete_stays_hidden_from_reloads() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;
        session.add(&mut report()).unwrap().write.wait().await;
        let id = session.snapshot()[0].id.clone();

        store.fail(true);
        session.delete(&id).unwrap().wait().await;
        assert!(session.snapshot().is_empty());
        assert_eq!(session.failed(), vec![(id.clone(), SyncOp::Delete)]);

        session.reload().await.unwrap();
        assert!(session.snapshot().is_empty());

        store.fail(false);
        for write in session.retry_failed() {
            write.wait().await;
        }
        assert!(store.inner.is_empty().await);
        assert!(session.failed().is_empty());
    }

    #[tokio::test]
    async fn toggle_while_create_in_flight_reaches_the_store() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;

        store.hold();
        let submitted = session.add(&mut report()).unwrap();
        let toggle = session.toggle(&submitted.id).unwrap();
        assert!(!toggle.is_remote());

        store.release();
        submitted.write.wait().await;

        let entry = session.get(&submitted.id).unwrap();
        assert_eq!(entry.status, SyncStatus::Confirmed);
        let stored = store.inner.get(entry.id()).await.unwrap().unwrap();
        assert!(stored.completed);
    }

    #[tokio::test]
    async fn delete_while_create_in_flight_leaves_no_orphan() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;

        store.hold();
        let submitted = session.add(&mut report()).unwrap();
        let delete = session.delete(&submitted.id).unwrap();
        assert!(!delete.is_remote());
        assert!(session.snapshot().is_empty());

        store.release();
        submitted.write.wait().await;
        assert!(store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn reload_during_create_keeps_one_entry() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;

        store.hold_answers();
        let submitted = session.add(&mut report()).unwrap();
        tokio::task::yield_now().await;
        assert_eq!(store.inner.len().await, 1);

        // the stored copy is listed before the create has answered
        session.reload().await.unwrap();
        assert_eq!(session.snapshot().len(), 1);
        assert_eq!(session.get(&submitted.id).unwrap().status, SyncStatus::Pending);

        store.release();
        submitted.write.wait().await;

        let entries = session.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, SyncStatus::Confirmed);
        assert!(!entries[0].id().is_local());
        session.reload().await.unwrap();
        assert_eq!(session.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn delete_during_create_survives_a_reload() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;

        store.hold_answers();
        let submitted = session.add(&mut report()).unwrap();
        tokio::task::yield_now().await;
        session.delete(&submitted.id).unwrap();

        session.reload().await.unwrap();
        assert!(session.snapshot().is_empty());

        store.release();
        submitted.write.wait().await;
        assert!(store.inner.is_empty().await);
        session.reload().await.unwrap();
        assert!(session.snapshot().is_empty());
        assert!(session.failed().is_empty());
    }

    #[tokio::test]
    async fn identity_switch_before_send_drops_the_write() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;

        let submitted = session.add(&mut report()).unwrap();
        session
            .set_identity(Some(Identity::new("u-bob", "Bob")))
            .await
            .unwrap();
        submitted.write.wait().await;

        assert!(session.snapshot().is_empty());
        assert!(store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn identity_switch_drops_in_flight_results() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;

        store.hold();
        let submitted = session.add(&mut report()).unwrap();
        tokio::task::yield_now().await;
        session
            .set_identity(Some(Identity::new("u-bob", "Bob")))
            .await
            .unwrap();
        assert!(session.snapshot().is_empty());

        store.release();
        submitted.write.wait().await;

        // Ada's item was created for Ada and is not deleted as an orphan
        assert!(session.snapshot().is_empty());
        let ada_items = store.inner.query(&TodoQuery::owned_by("u-ada")).await.unwrap();
        assert_eq!(ada_items.len(), 1);
        assert_eq!(ada_items[0].owner_name, "Ada");
        let bob_items = store.inner.query(&TodoQuery::owned_by("u-bob")).await.unwrap();
        assert!(bob_items.is_empty());
    }

    #[tokio::test]
    async fn reload_if_changed_ignores_other_owners() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;
        let mut seen = None;
        assert!(session.reload_if_changed(&mut seen).await.unwrap());

        let bob = TodoSession::new(store.clone(), &quick());
        bob.set_identity(Some(Identity::new("u-bob", "Bob")))
            .await
            .unwrap();
        bob.add(&mut report()).unwrap().write.wait().await;

        assert!(!session.reload_if_changed(&mut seen).await.unwrap());
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn sign_out_clears_the_list() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store).await;
        session.add(&mut report()).unwrap().write.wait().await;

        session.set_identity(None).await.unwrap();
        assert!(session.snapshot().is_empty());
        assert_eq!(session.identity(), None);
    }

    #[tokio::test]
    async fn reload_if_changed_skips_unchanged_revisions() {
        let store = Arc::new(TestStore::default());
        let session = signed_in(store.clone()).await;
        let mut seen = None;

        assert!(session.reload_if_changed(&mut seen).await.unwrap());
        assert!(!session.reload_if_changed(&mut seen).await.unwrap());

        session.add(&mut report()).unwrap().write.wait().await;
        assert!(session.reload_if_changed(&mut seen).await.unwrap());
        assert_eq!(session.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn detached_session_keeps_everything_local() {
        let session = TodoSession::detached(&quick());
        let first = session.add(&mut report()).unwrap();
        let second = session.add(&mut report()).unwrap();
        assert!(!first.write.is_remote());
        assert_ne!(first.id, second.id);

        let entries = session.entries();
        assert!(entries.iter().all(|e| e.status == SyncStatus::Confirmed));
        assert_eq!(entries[0].item.owner_id, LOCAL_OWNER);

        assert!(!session.toggle(&first.id).unwrap().is_remote());
        assert!(session.snapshot()[0].completed);
        assert!(session.toggle(&TodoId::from("missing")).is_none());

        assert!(!session.delete(&first.id).unwrap().is_remote());
        let remaining: Vec<_> = session.snapshot().into_iter().map(|i| i.id).collect();
        assert_eq!(remaining, vec![second.id]);
    }

    #[test]
    fn from_config_without_url_is_detached() {
        let session = TodoSession::from_config(&TodoConfig::default(), &IdentityWatch::new())
            .unwrap();
        assert!(session.store().is_none());
    }
}
