use async_trait::async_trait;
use chrono::Utc;
use forum_client::models::Actor;
use forum_client::{
    Account, AuthSession, ClientError, ClientResult, FeedPage, FeedSnapshot, FileStorage,
    ForumApi, LoginCredentials, MemoryStorage, NotificationCenter, NotificationItem, Registration,
    SessionManager, SessionStorage,
};
use forum_core::domain::{NotificationKind, Role};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn unauthorized() -> ClientError {
    ClientError::Api {
        status: 401,
        message: "Invalid or expired token".into(),
    }
}

fn item(read: bool) -> NotificationItem {
    NotificationItem {
        id: Uuid::new_v4(),
        kind: NotificationKind::Reply,
        title: "New reply".into(),
        message: "bob replied to your post".into(),
        read,
        actor: Some(Actor {
            id: Uuid::new_v4(),
            username: "bob".into(),
            avatar: None,
        }),
        target_url: None,
        topic_id: None,
        post_id: None,
        created_at: Utc::now(),
    }
}

/// In-process stand-in for the server. Only `valid_token` is accepted.
struct FakeApi {
    account: Account,
    valid_token: Mutex<String>,
    fail_me: AtomicBool,
    fail_writes: AtomicBool,
    refresh_works: AtomicBool,
    feed: Mutex<Vec<NotificationItem>>,
    feed_calls: AtomicUsize,
    role_calls: AtomicUsize,
}

impl FakeApi {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            account: Account {
                id: Uuid::new_v4(),
                username: "alice".into(),
                email: "alice@x.test".into(),
                display_name: "Alice".into(),
                role: Role::Admin,
                avatar: None,
                bio: None,
            },
            valid_token: Mutex::new("token-1".into()),
            fail_me: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            refresh_works: AtomicBool::new(true),
            feed: Mutex::new(vec![item(false), item(false), item(true)]),
            feed_calls: AtomicUsize::new(0),
            role_calls: AtomicUsize::new(0),
        })
    }

    fn check(&self, token: &str) -> ClientResult<()> {
        if *self.valid_token.lock().unwrap() == token {
            Ok(())
        } else {
            Err(unauthorized())
        }
    }

    fn rotate_token(&self, token: &str) {
        *self.valid_token.lock().unwrap() = token.to_string();
    }

    fn session(&self) -> AuthSession {
        AuthSession {
            token: self.valid_token.lock().unwrap().clone(),
            user: self.account.clone(),
        }
    }

    fn page(&self) -> FeedPage {
        let feed = self.feed.lock().unwrap();
        FeedPage {
            notifications: feed.clone(),
            total_notifications: feed.len() as u64,
            unread_count: feed.iter().filter(|n| !n.read).count() as u64,
            current_page: 1,
            total_pages: 1,
        }
    }

    fn write_guard(&self) -> ClientResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(ClientError::Api {
                status: 500,
                message: "Internal server error".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ForumApi for FakeApi {
    async fn login(&self, credentials: &LoginCredentials) -> ClientResult<AuthSession> {
        if credentials.password != "secret123" {
            return Err(ClientError::Api {
                status: 401,
                message: "Invalid credentials".into(),
            });
        }
        Ok(self.session())
    }

    async fn register(&self, _registration: &Registration) -> ClientResult<AuthSession> {
        Ok(self.session())
    }

    async fn me(&self, token: &str) -> ClientResult<Account> {
        self.check(token)?;
        if self.fail_me.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 500,
                message: "Internal server error".into(),
            });
        }
        Ok(self.account.clone())
    }

    async fn refresh_token(&self, _token: &str) -> ClientResult<AuthSession> {
        if !self.refresh_works.load(Ordering::SeqCst) {
            return Err(unauthorized());
        }
        self.rotate_token("token-2");
        Ok(self.session())
    }

    async fn notifications(&self, token: &str, _page: u32, _limit: u32) -> ClientResult<FeedPage> {
        self.check(token)?;
        self.feed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.page())
    }

    async fn mark_read(&self, token: &str, ids: &[Uuid]) -> ClientResult<u64> {
        self.check(token)?;
        self.write_guard()?;
        let mut feed = self.feed.lock().unwrap();
        let mut modified = 0;
        for n in feed.iter_mut() {
            if !n.read && (ids.is_empty() || ids.contains(&n.id)) {
                n.read = true;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete_notification(&self, token: &str, id: Uuid) -> ClientResult<u64> {
        self.check(token)?;
        self.write_guard()?;
        let mut feed = self.feed.lock().unwrap();
        let before = feed.len();
        feed.retain(|n| n.id != id);
        Ok((before - feed.len()) as u64)
    }

    async fn delete_all_notifications(&self, token: &str) -> ClientResult<u64> {
        self.check(token)?;
        self.write_guard()?;
        let mut feed = self.feed.lock().unwrap();
        let removed = feed.len() as u64;
        feed.clear();
        Ok(removed)
    }

    async fn set_role(&self, token: &str, user_id: Uuid, role: Role) -> ClientResult<Account> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        self.check(token)?;
        Ok(Account {
            id: user_id,
            username: "bob".into(),
            email: "bob@x.test".into(),
            display_name: "bob".into(),
            role,
            avatar: None,
            bio: None,
        })
    }
}

fn credentials() -> LoginCredentials {
    LoginCredentials {
        login: "alice".into(),
        password: "secret123".into(),
    }
}

async fn signed_in(api: &Arc<FakeApi>, storage: &Arc<MemoryStorage>) -> Arc<SessionManager> {
    let session = SessionManager::restore(api.clone(), storage.clone()).unwrap();
    session.login(&credentials()).await.unwrap();
    Arc::new(session)
}

#[tokio::test]
async fn login_persists_and_restore_reads_it_back() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    let session = signed_in(&api, &storage).await;
    assert!(session.is_authenticated().await);
    assert!(session.has_role(Role::Teacher).await);
    assert_eq!(storage.get("token").unwrap().as_deref(), Some("token-1"));

    let restored = SessionManager::restore(api.clone(), storage.clone()).unwrap();
    assert_eq!(restored.user().await.unwrap().username, "alice");
    assert_eq!(restored.token().await.as_deref(), Some("token-1"));
}

#[tokio::test]
async fn malformed_stored_user_starts_anonymous() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    storage.set("token", "token-1").unwrap();
    storage.set("user", "{not json").unwrap();

    let session = SessionManager::restore(api, storage.clone()).unwrap();
    assert!(!session.is_authenticated().await);
    assert_eq!(storage.get("token").unwrap(), None);
    assert_eq!(storage.get("user").unwrap(), None);
}

#[tokio::test]
async fn corrupt_session_file_starts_anonymous_and_recovers() {
    let path = std::env::temp_dir().join(format!("forum-session-{}.json", Uuid::new_v4()));
    std::fs::write(&path, "{not json").unwrap();
    let api = FakeApi::new();
    let storage = Arc::new(FileStorage::new(&path));

    let session = SessionManager::restore(api, storage.clone()).unwrap();
    assert!(!session.is_authenticated().await);
    assert_eq!(storage.get("token").unwrap(), None);

    session.login(&credentials()).await.unwrap();
    let reopened = FileStorage::new(&path);
    assert_eq!(reopened.get("token").unwrap().as_deref(), Some("token-1"));
    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn half_a_stored_session_is_cleared() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    storage.set("token", "token-1").unwrap();

    let session = SessionManager::restore(api.clone(), storage.clone()).unwrap();
    assert!(!session.is_authenticated().await);
    assert_eq!(storage.get("token").unwrap(), None);

    let user = serde_json::to_string(&api.account).unwrap();
    storage.set("user", &user).unwrap();
    let session = SessionManager::restore(api, storage.clone()).unwrap();
    assert!(!session.is_authenticated().await);
    assert_eq!(storage.get("user").unwrap(), None);
}

#[tokio::test]
async fn failed_profile_fetch_after_login_tears_down() {
    let api = FakeApi::new();
    api.fail_me.store(true, Ordering::SeqCst);
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionManager::restore(api.clone(), storage.clone()).unwrap();

    let result = session.login(&credentials()).await;
    assert!(matches!(result, Err(ClientError::Api { status: 500, .. })));
    assert!(!session.is_authenticated().await);
    assert_eq!(storage.get("token").unwrap(), None);
}

#[tokio::test]
async fn ordinary_401_signs_out() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    let session = signed_in(&api, &storage).await;
    api.rotate_token("revoked");

    let result = session.refresh_profile().await;
    assert!(matches!(result, Err(ClientError::SessionExpired)));
    assert!(!session.is_authenticated().await);
    assert_eq!(storage.get("user").unwrap(), None);
}

#[tokio::test]
async fn admin_mutation_refreshes_once_and_retries() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    let session = signed_in(&api, &storage).await;
    api.rotate_token("server-side-rotation");

    let target = Uuid::new_v4();
    let updated = session.set_role(target, Role::Teacher).await.unwrap();
    assert_eq!(updated.role, Role::Teacher);
    assert_eq!(api.role_calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.token().await.as_deref(), Some("token-2"));
    assert_eq!(storage.get("token").unwrap().as_deref(), Some("token-2"));
}

#[tokio::test]
async fn failed_refresh_gives_up_and_signs_out() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    let session = signed_in(&api, &storage).await;
    api.rotate_token("revoked");
    api.refresh_works.store(false, Ordering::SeqCst);

    let result = session.set_role(Uuid::new_v4(), Role::Admin).await;
    assert!(matches!(result, Err(ClientError::SessionExpired)));
    assert!(!session.is_authenticated().await);
    assert_eq!(api.role_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn optimistic_updates_apply_before_the_server_answers() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    let session = signed_in(&api, &storage).await;
    let center = NotificationCenter::new(session, api.clone());

    center.refresh().await.unwrap();
    let snapshot = center.snapshot().await;
    assert_eq!(snapshot.unread_count, 2);
    assert_eq!(snapshot.total_notifications, 3);

    let first = snapshot.notifications[0].id;
    center.mark_read(&[first]).await;
    assert_eq!(center.unread_count().await, 1);

    // The server rejects the next write; the local patch stays until the next refresh.
    api.fail_writes.store(true, Ordering::SeqCst);
    let second = snapshot.notifications[1].id;
    center.delete(second).await;
    let local = center.snapshot().await;
    assert_eq!(local.total_notifications, 2);
    assert_eq!(local.unread_count, 0);

    center.refresh().await.unwrap();
    let reconciled = center.snapshot().await;
    assert_eq!(reconciled.total_notifications, 3);
    assert_eq!(reconciled.unread_count, 1);

    api.fail_writes.store(false, Ordering::SeqCst);
    center.clear_all().await;
    assert_eq!(center.snapshot().await, FeedSnapshot::default());
    center.refresh().await.unwrap();
    assert_eq!(center.snapshot().await.total_notifications, 0);
}

#[tokio::test]
async fn polling_stops_on_cancel() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    let session = signed_in(&api, &storage).await;
    let center = Arc::new(NotificationCenter::new(session, api.clone()));

    let cancel = CancellationToken::new();
    let handle = center.start_polling_every(Duration::from_millis(10), cancel.clone());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(api.feed_calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(center.unread_count().await, 2);

    cancel.cancel();
    handle.await.unwrap();
    let calls = api.feed_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(api.feed_calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn polling_stops_after_logout() {
    let api = FakeApi::new();
    let storage = Arc::new(MemoryStorage::new());
    let session = signed_in(&api, &storage).await;
    let center = Arc::new(NotificationCenter::new(session.clone(), api.clone()));

    let handle = center.start_polling_every(Duration::from_millis(10), CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(30)).await;
    session.logout().await;
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("poller should exit once signed out")
        .unwrap();
    assert_eq!(center.snapshot().await, FeedSnapshot::default());
}
