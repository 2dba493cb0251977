//! Read-only listing of every owner's items

use crate::error::Result;
use crate::identity::Identity;
use crate::item::TodoItem;
use crate::policy;
use crate::store::{TodoQuery, TodoStore};

/// All items across owners, ordered by owner display name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminView {
    pub items: Vec<TodoItem>,
}

impl AdminView {
    /// Load the listing as `viewer`; fails with `Forbidden` for non-admins.
    pub async fn load(store: &dyn TodoStore, viewer: &Identity) -> Result<Self> {
        policy::require_view_all(viewer)?;
        let items = store.query(&TodoQuery::all_by_owner_name()).await?;
        tracing::debug!("admin view loaded {} items for {}", items.len(), viewer.id);
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct owner names in listing order
    pub fn owners(&self) -> Vec<&str> {
        let mut owners: Vec<&str> = Vec::new();
        for item in &self.items {
            if owners.last() != Some(&item.owner_name.as_str()) {
                owners.push(&item.owner_name);
            }
        }
        owners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TodoError;
    use crate::identity::Role;
    use crate::item::NewTodo;
    use crate::store::InMemoryStore;
    use crate::validation::Draft;
    use chrono::{Duration, Utc};

    async fn seed(store: &InMemoryStore, owner: &str, name: &str, text: &str, age_secs: i64) {
        let fields = Draft::time_range(text, "Exercise", "06:00", "07:00")
            .validate(Utc::now())
            .unwrap();
        let created = Utc::now() - Duration::seconds(age_secs);
        store
            .create(NewTodo::from_fields(fields, owner, name, created))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn admin_sees_everyone_by_owner_name() {
        let store = InMemoryStore::new();
        seed(&store, "u2", "Zed", "swim", 30).await;
        seed(&store, "u1", "Ada", "run", 10).await;
        seed(&store, "u1", "Ada", "lift", 20).await;

        let admin = Identity::new("2781687723", "Root").with_role(Role::Admin);
        let view = AdminView::load(&store, &admin).await.unwrap();

        assert_eq!(view.len(), 3);
        assert_eq!(view.owners(), vec!["Ada", "Zed"]);
        let texts: Vec<_> = view.items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["lift", "run", "swim"]);
    }

    #[tokio::test]
    async fn non_admin_is_refused() {
        let store = InMemoryStore::new();
        seed(&store, "u1", "Ada", "run", 0).await;

        let err = AdminView::load(&store, &Identity::new("u1", "Ada"))
            .await
            .unwrap_err();
        assert!(matches!(err, TodoError::Forbidden(_)));
    }
}
