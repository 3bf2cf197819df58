use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::form::orchestrator::{FormContext, FormOrchestrator};

pub type SharedForm = Arc<Mutex<FormOrchestrator>>;

struct Session {
    form: SharedForm,
    last_seen: Instant,
}

/// Live orchestrators keyed by owner. All edits for one owner are serialized
/// through that owner's mutex.
///
/// Sessions untouched for `idle_ttl` are dropped by [`evict_idle`](Self::evict_idle).
/// Every commit is already in the session tier, so the next request for that
/// owner reopens the record from there.
#[derive(Clone)]
pub struct FormSessions {
    ctx: FormContext,
    idle_ttl: Duration,
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl FormSessions {
    pub fn new(ctx: FormContext, idle_ttl: Duration) -> Self {
        Self {
            ctx,
            idle_ttl,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the owner's orchestrator, opening it from persistence on first use.
    pub async fn get_or_open(&self, owner: Uuid) -> SharedForm {
        if let Some(session) = self.sessions.write().await.get_mut(&owner) {
            session.last_seen = Instant::now();
            return session.form.clone();
        }

        // Loading happens outside the registry lock; a concurrent open of the
        // same owner keeps whichever instance was inserted first.
        let opened = FormOrchestrator::open(owner, self.ctx.clone()).await;
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(owner).or_insert_with(|| {
            debug!("Opened form session for {owner}");
            Session {
                form: Arc::new(Mutex::new(opened)),
                last_seen: Instant::now(),
            }
        });
        session.last_seen = Instant::now();
        session.form.clone()
    }

    /// Drops sessions idle for longer than the TTL. A session still referenced
    /// elsewhere, such as by a running submission, is kept.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            now.duration_since(session.last_seen) < self.idle_ttl
                || Arc::strong_count(&session.form) > 1
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle form session(s), {} remain", sessions.len());
        }
        evicted
    }

    /// Runs [`evict_idle`](Self::evict_idle) on a fixed period until the
    /// runtime shuts down.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                sessions.evict_idle().await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend_client::fixture::FixtureSubmissionBackend;
    use crate::form::personal::PersonalField;
    use crate::github::fixture::FixtureRepositorySource;
    use crate::persistence::memory::InMemoryRecordStore;
    use crate::persistence::FormPersistence;

    const TTL: Duration = Duration::from_secs(60);

    fn sessions() -> FormSessions {
        let ctx = FormContext {
            persistence: FormPersistence::new(
                Arc::new(InMemoryRecordStore::new("session")),
                Arc::new(InMemoryRecordStore::new("durable")),
            ),
            submitter: Arc::new(FixtureSubmissionBackend::new()),
            repositories: Arc::new(FixtureRepositorySource),
        };
        FormSessions::new(ctx, TTL)
    }

    #[tokio::test]
    async fn test_same_owner_gets_same_session() {
        let sessions = sessions();
        let owner = Uuid::new_v4();

        let first = sessions.get_or_open(owner).await;
        first
            .lock()
            .await
            .update_personal(PersonalField::FullName, "Ada")
            .await;

        let second = sessions.get_or_open(owner).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().await.record().personal.full_name, "Ada");
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let sessions = sessions();
        let a = sessions.get_or_open(Uuid::new_v4()).await;
        let b = sessions.get_or_open(Uuid::new_v4()).await;

        a.lock()
            .await
            .update_personal(PersonalField::Email, "a@example.com")
            .await;
        assert!(b.lock().await.record().personal.email.is_empty());
        assert_eq!(sessions.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_evicted_and_reopens_from_store() {
        let sessions = sessions();
        let owner = Uuid::new_v4();

        let first = sessions.get_or_open(owner).await;
        first
            .lock()
            .await
            .update_personal(PersonalField::FullName, "Ada")
            .await;
        drop(first);

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert_eq!(sessions.evict_idle().await, 1);
        assert_eq!(sessions.len().await, 0);

        let reopened = sessions.get_or_open(owner).await;
        assert_eq!(reopened.lock().await.record().personal.full_name, "Ada");
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_and_referenced_sessions_are_kept() {
        let sessions = sessions();
        let held = sessions.get_or_open(Uuid::new_v4()).await;
        let touched = Uuid::new_v4();
        sessions.get_or_open(touched).await;

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        sessions.get_or_open(touched).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(sessions.evict_idle().await, 0);
        assert_eq!(sessions.len().await, 2);
        drop(held);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_on_its_period() {
        let sessions = sessions();
        sessions.get_or_open(Uuid::new_v4()).await;
        let sweeper = sessions.spawn_sweeper(Duration::from_secs(30));

        tokio::time::sleep(TTL + Duration::from_secs(31)).await;
        assert_eq!(sessions.len().await, 0);
        sweeper.abort();
    }
}
