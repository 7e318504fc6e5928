//! Session manager: token lifecycle, decoded identity and refresh coordination
//!
//! One manager exists per session and is shared explicitly (`Arc`) between
//! the HTTP client and whatever presents the session to the user. State
//! changes are published on a watch channel; notable transitions (sign-in,
//! refresh, sign-out, forced re-login) are broadcast as [`SessionEvent`]s.

use super::error::ClientError;
use super::store::TokenStore;
use super::token::{AccessClaims, TokenPair, decode_access_token};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use bloomkart_core::{KeyValueStore, SessionConfig, UserIdentity};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

/// Network calls the session manager needs from the auth endpoints
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange a refresh token for a new pair
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError>;

    /// Invalidate one refresh token server-side
    async fn logout(&self, refresh_token: &str) -> Result<(), ClientError>;

    /// Invalidate every session of the bearer's account server-side
    async fn logout_all(&self, access_token: &str) -> Result<(), ClientError>;
}

/// Where the session currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Refreshing,
}

/// Notable session transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(UserIdentity),
    Refreshed(UserIdentity),
    SignedOut,
    /// The session ended involuntarily; the user should be sent to `redirect`
    LoginRequired { redirect: String },
}

/// Authorization prepared for an outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Bearer {
    Token(String),
    /// No session to attach
    Anonymous,
    /// The session ended while preparing this request; login was already requested
    Ended,
}

#[derive(Debug)]
struct Session {
    access_token: String,
    claims: AccessClaims,
}

pub struct SessionManager {
    tokens: TokenStore,
    backend: Arc<dyn AuthBackend>,
    current: ArcSwapOption<Session>,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    refresh_lock: Mutex<()>,
    refresh_threshold: Duration,
    login_path: String,
}

impl SessionManager {
    /// Create a manager and restore any persisted session
    ///
    /// A persisted access token that decodes and has not expired starts the
    /// session authenticated. A malformed one is deleted. An expired one is
    /// kept so the next request can renew it with the refresh token.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn AuthBackend>,
        config: &SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        let (events, _) = broadcast::channel(16);
        let manager = Self {
            tokens: TokenStore::new(store),
            backend,
            current: ArcSwapOption::empty(),
            state,
            events,
            refresh_lock: Mutex::new(()),
            refresh_threshold: config.refresh_threshold(),
            login_path: config.login_path.clone(),
        };
        manager.restore();
        manager
    }

    fn restore(&self) {
        let stored = match self.tokens.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Could not read persisted session: {e}");
                return;
            }
        };
        let Some(access_token) = stored.access_token else {
            return;
        };
        match decode_access_token(&access_token) {
            Ok(claims) if claims.is_expired(Utc::now()) => {
                debug!("Persisted access token has expired; it will be renewed on first use");
                self.current.store(Some(Arc::new(Session {
                    access_token,
                    claims,
                })));
            }
            Ok(claims) => {
                info!(user_id = claims.user_id, "Restored persisted session");
                self.current.store(Some(Arc::new(Session {
                    access_token,
                    claims,
                })));
                self.state.send_replace(SessionState::Authenticated);
            }
            Err(e) => {
                warn!("Discarding persisted access token: {e}");
                if let Err(e) = self.tokens.clear() {
                    warn!("Failed to clear persisted tokens: {e}");
                }
            }
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Receive session events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Identity decoded from the current access token
    pub fn identity(&self) -> Option<UserIdentity> {
        self.current
            .load()
            .as_ref()
            .map(|session| session.claims.identity())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() != SessionState::Unauthenticated
    }

    /// Where a forced logout sends the user
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub const fn refresh_threshold(&self) -> Duration {
        self.refresh_threshold
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Store a freshly issued pair and derive the identity from it
    pub fn establish(&self, pair: &TokenPair) -> Result<UserIdentity, ClientError> {
        let claims = decode_access_token(&pair.access_token).map_err(|e| {
            ClientError::Authentication(format!("server issued an unusable access token: {e}"))
        })?;
        self.tokens.save(pair)?;
        let identity = self.install(pair.access_token.clone(), claims);
        info!(user_id = identity.user_id, role = %identity.role, "Signed in");
        self.emit(SessionEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    /// Sign in with a lone access token (OAuth redirect); no refresh token is kept
    pub fn adopt_access_token(&self, access_token: &str) -> Result<UserIdentity, ClientError> {
        let claims = decode_access_token(access_token)
            .map_err(|e| ClientError::Validation(format!("redirect token: {e}")))?;
        self.tokens.save_access_only(access_token)?;
        let identity = self.install(access_token.to_string(), claims);
        info!(user_id = identity.user_id, "Signed in from OAuth redirect");
        self.emit(SessionEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    fn install(&self, access_token: String, claims: AccessClaims) -> UserIdentity {
        let identity = claims.identity();
        self.current.store(Some(Arc::new(Session {
            access_token,
            claims,
        })));
        self.state.send_replace(SessionState::Authenticated);
        identity
    }

    /// Reconcile the in-memory session with the persisted tokens
    ///
    /// Another process sharing the store may have rotated or deleted the
    /// tokens; the identity is re-derived whenever the stored access token
    /// differs from the one in memory.
    fn sync_from_store(&self) -> Result<Option<Arc<Session>>, ClientError> {
        let stored = self.tokens.load()?;
        let current = self.current.load_full();

        let Some(access_token) = stored.access_token else {
            if current.is_some() {
                debug!("Tokens were removed from storage; dropping session");
                self.current.store(None);
                self.state.send_replace(SessionState::Unauthenticated);
                self.emit(SessionEvent::SignedOut);
            }
            return Ok(None);
        };

        if let Some(session) = current.filter(|s| s.access_token == access_token) {
            return Ok(Some(session));
        }

        match decode_access_token(&access_token) {
            Ok(claims) => {
                debug!("Adopting access token found in storage");
                let session = Arc::new(Session {
                    access_token,
                    claims,
                });
                self.current.store(Some(session.clone()));
                if !session.claims.is_expired(Utc::now()) {
                    self.state.send_replace(SessionState::Authenticated);
                }
                Ok(Some(session))
            }
            Err(e) => {
                warn!("Stored access token is invalid, clearing it: {e}");
                self.tokens.clear()?;
                self.current.store(None);
                self.state.send_replace(SessionState::Unauthenticated);
                Ok(None)
            }
        }
    }

    /// Access token to attach to an outgoing request
    ///
    /// Refreshes first when the token is close to expiry. Returns `None` when
    /// there is no usable session; the request then goes out unauthenticated.
    pub async fn bearer_token(&self) -> Result<Option<String>, ClientError> {
        match self.authorization().await? {
            Bearer::Token(access_token) => Ok(Some(access_token)),
            Bearer::Anonymous | Bearer::Ended => Ok(None),
        }
    }

    /// Like [`SessionManager::bearer_token`], but tells an absent session
    /// apart from one that was just ended by a rejected refresh
    pub(crate) async fn authorization(&self) -> Result<Bearer, ClientError> {
        let Some(session) = self.sync_from_store()? else {
            return Ok(Bearer::Anonymous);
        };

        if !session
            .claims
            .needs_refresh(self.refresh_threshold, Utc::now())
        {
            return Ok(Bearer::Token(session.access_token.clone()));
        }

        debug!("Access token is close to expiry; refreshing before request");
        match self.renew(&session.access_token).await {
            Ok(access_token) => Ok(Bearer::Token(access_token)),
            Err(e) if e.is_auth_expired() => Ok(Bearer::Ended),
            Err(e) if e.is_retryable() => {
                warn!("Proactive refresh failed, using current token: {e}");
                Ok(Bearer::Token(session.access_token.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Obtain a token newer than `stale_access_token`
    ///
    /// Refreshes are serialized. A caller that waited for the lock first
    /// checks whether the stored pair has already moved past the token it
    /// saw, and if so uses that instead of refreshing again.
    pub async fn renew(&self, stale_access_token: &str) -> Result<String, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        let stored = self.tokens.load()?;
        if let Some(access_token) = stored
            .access_token
            .as_deref()
            .filter(|token| *token != stale_access_token)
        {
            if let Ok(claims) = decode_access_token(access_token) {
                if !claims.is_expired(Utc::now()) {
                    debug!("Token already rotated by a concurrent refresh");
                    let access_token = access_token.to_string();
                    self.install(access_token.clone(), claims);
                    return Ok(access_token);
                }
            }
        }

        let Some(refresh_token) = stored.refresh_token else {
            self.expire("no refresh token available");
            return Err(ClientError::Refresh("no refresh token available".into()));
        };

        let previous = self.state.send_replace(SessionState::Refreshing);
        match self.backend.refresh(&refresh_token).await {
            Ok(pair) => match decode_access_token(&pair.access_token) {
                Ok(claims) => {
                    // The server has rotated the pair; the stored refresh token is now dead
                    if let Err(e) = self.tokens.save(&pair) {
                        self.expire("could not persist refreshed tokens");
                        return Err(e.into());
                    }
                    let identity = self.install(pair.access_token.clone(), claims);
                    debug!(user_id = identity.user_id, "Session refreshed");
                    self.emit(SessionEvent::Refreshed(identity));
                    Ok(pair.access_token)
                }
                Err(e) => {
                    self.expire("refresh returned an unusable access token");
                    Err(ClientError::Refresh(e.to_string()))
                }
            },
            Err(e) if e.is_retryable() => {
                self.state.send_replace(previous);
                Err(e)
            }
            Err(e) => {
                warn!("Refresh token rejected: {e}");
                self.expire("refresh token rejected");
                Err(ClientError::Refresh(e.to_string()))
            }
        }
    }

    /// End the session involuntarily and ask for a new login
    pub fn expire(&self, reason: &str) {
        warn!(reason, "Session ended; login required");
        self.clear_local();
        self.emit(SessionEvent::LoginRequired {
            redirect: self.login_path.clone(),
        });
    }

    /// Ask for a login without touching the stored session
    pub fn request_login(&self) {
        self.emit(SessionEvent::LoginRequired {
            redirect: self.login_path.clone(),
        });
    }

    fn clear_local(&self) {
        if let Err(e) = self.tokens.clear_session_data() {
            warn!("Failed to clear local session data: {e}");
        }
        self.current.store(None);
        self.state.send_replace(SessionState::Unauthenticated);
    }

    /// Log out this session
    ///
    /// Local tokens, identity and cart are cleared whether or not the server
    /// call succeeds; a server failure is still returned to the caller.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let refresh_token = self
            .tokens
            .load()
            .map(|stored| stored.refresh_token)
            .unwrap_or_default();

        let result = match refresh_token {
            Some(refresh_token) => self.backend.logout(&refresh_token).await,
            None => Ok(()),
        };
        if let Err(e) = &result {
            warn!("Server logout failed: {e}");
        }

        self.clear_local();
        info!("Logged out");
        self.emit(SessionEvent::SignedOut);
        result
    }

    /// Log out every session of this account
    ///
    /// Same local cleanup guarantees as [`SessionManager::logout`].
    pub async fn logout_all(&self) -> Result<(), ClientError> {
        let result = match self.bearer_token().await {
            Ok(Some(access_token)) => self.backend.logout_all(&access_token).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            warn!("Server logout of all sessions failed: {e}");
        }

        self.clear_local();
        info!("Logged out of all sessions");
        self.emit(SessionEvent::SignedOut);
        result
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub AuthBackend {}

        #[async_trait]
        impl AuthBackend for AuthBackend {
            async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError>;
            async fn logout(&self, refresh_token: &str) -> Result<(), ClientError>;
            async fn logout_all(&self, access_token: &str) -> Result<(), ClientError>;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockAuthBackend;
    use super::*;
    use crate::client::token::test_support::access_token;
    use bloomkart_core::{MemoryStore, Role, keys};

    fn manager(store: &Arc<MemoryStore>, backend: MockAuthBackend) -> SessionManager {
        SessionManager::new(store.clone(), Arc::new(backend), &SessionConfig::default())
    }

    fn seed(store: &MemoryStore, access: &str, refresh: &str) {
        store
            .set_many(&[(keys::ACCESS_TOKEN, access), (keys::REFRESH_TOKEN, refresh)])
            .unwrap();
    }

    #[test]
    fn test_starts_unauthenticated_without_tokens() {
        let store = Arc::new(MemoryStore::new());
        let session = manager(&store, MockAuthBackend::new());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.identity(), None);
    }

    #[test]
    fn test_restores_valid_persisted_session() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &access_token(Role::Admin, 3600), "r1");

        let session = manager(&store, MockAuthBackend::new());
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.identity().unwrap().role, Role::Admin);
    }

    #[test]
    fn test_malformed_persisted_token_is_cleared() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "garbage", "r1");

        let session = manager(&store, MockAuthBackend::new());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_fresh_token_is_used_without_refresh() {
        let store = Arc::new(MemoryStore::new());
        let token = access_token(Role::User, 3600);
        seed(&store, &token, "r1");

        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().never();
        let session = manager(&store, backend);

        assert_eq!(session.bearer_token().await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed_once_for_concurrent_callers() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &access_token(Role::User, 60), "r1");
        let renewed = access_token(Role::User, 3600);

        let mut backend = MockAuthBackend::new();
        let issued = renewed.clone();
        backend
            .expect_refresh()
            .withf(|token| token == "r1")
            .times(1)
            .returning(move |_| Ok(TokenPair::new(issued.clone(), "r2")));
        let session = manager(&store, backend);

        let results =
            futures::future::join_all((0..5).map(|_| session.bearer_token())).await;
        for result in results {
            assert_eq!(result.unwrap().as_deref(), Some(renewed.as_str()));
        }
        assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap().as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_rejected_refresh_ends_session() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &access_token(Role::User, 60), "revoked");
        store.set(keys::CART, "[]").unwrap();

        let mut backend = MockAuthBackend::new();
        backend
            .expect_refresh()
            .returning(|_| Err(ClientError::Authentication("revoked".into())));
        let session = manager(&store, backend);
        let mut events = session.subscribe();

        assert_eq!(session.bearer_token().await.unwrap(), None);
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::CART).unwrap(), None);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoginRequired {
                redirect: "/login".to_string()
            }
        );
    }

    /// Reads work, writes fail
    struct FullDisk(MemoryStore);

    impl KeyValueStore for FullDisk {
        fn get(&self, key: &str) -> bloomkart_core::CoreResult<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> bloomkart_core::CoreResult<()> {
            Err(bloomkart_core::CoreError::storage_error("disk full"))
        }

        fn remove(&self, key: &str) -> bloomkart_core::CoreResult<()> {
            self.0.remove(key)
        }
    }

    #[tokio::test]
    async fn test_unpersisted_refresh_ends_session() {
        let disk = MemoryStore::new();
        seed(&disk, &access_token(Role::User, 60), "r1");
        let store = Arc::new(FullDisk(disk));

        let mut backend = MockAuthBackend::new();
        backend
            .expect_refresh()
            .times(1)
            .returning(|_| Ok(TokenPair::new(access_token(Role::User, 3600), "r2")));
        let session =
            SessionManager::new(store.clone(), Arc::new(backend), &SessionConfig::default());
        let mut events = session.subscribe();

        let result = session.bearer_token().await;
        assert!(matches!(result, Err(ClientError::Storage(_))));
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(!session.is_authenticated());
        assert_eq!(session.identity(), None);
        assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap(), None);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoginRequired {
                redirect: "/login".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_transient_refresh_failure_keeps_session() {
        let store = Arc::new(MemoryStore::new());
        let token = access_token(Role::User, 60);
        seed(&store, &token, "r1");

        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().returning(|_| {
            Err(ClientError::Server {
                status: 503,
                message: "maintenance".into(),
            })
        });
        let session = manager(&store, backend);

        assert_eq!(session.bearer_token().await.unwrap(), Some(token));
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap().as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_renew_adopts_token_rotated_by_another_process() {
        let store = Arc::new(MemoryStore::new());
        let stale = access_token(Role::User, 60);
        seed(&store, &stale, "r1");

        let mut backend = MockAuthBackend::new();
        backend.expect_refresh().never();
        let session = manager(&store, backend);

        // Another process sharing the store refreshed first
        let rotated = access_token(Role::User, 3600);
        seed(&store, &rotated, "r2");

        assert_eq!(session.renew(&stale).await.unwrap(), rotated);
    }

    #[tokio::test]
    async fn test_logout_clears_locally_even_when_server_fails() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &access_token(Role::User, 3600), "r1");
        store.set(keys::CART, "[]").unwrap();

        let mut backend = MockAuthBackend::new();
        backend
            .expect_logout()
            .withf(|token| token == "r1")
            .returning(|_| {
                Err(ClientError::Server {
                    status: 500,
                    message: "boom".into(),
                })
            });
        let session = manager(&store, backend);

        assert!(session.logout().await.is_err());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(session.identity(), None);
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::CART).unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_all_sends_bearer_token() {
        let store = Arc::new(MemoryStore::new());
        let token = access_token(Role::User, 3600);
        seed(&store, &token, "r1");

        let mut backend = MockAuthBackend::new();
        let expected = token.clone();
        backend
            .expect_logout_all()
            .withf(move |bearer| bearer == expected)
            .times(1)
            .returning(|_| Ok(()));
        let session = manager(&store, backend);

        session.logout_all().await.unwrap();
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap(), None);
    }

    #[test]
    fn test_oauth_token_replaces_previous_pair() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &access_token(Role::User, 3600), "old-refresh");
        let session = manager(&store, MockAuthBackend::new());

        let identity = session
            .adopt_access_token(&access_token(Role::Admin, 3600))
            .unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap(), None);
    }

    #[test]
    fn test_external_logout_is_observed() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &access_token(Role::User, 3600), "r1");
        let session = manager(&store, MockAuthBackend::new());

        store
            .remove_many(&[keys::ACCESS_TOKEN, keys::REFRESH_TOKEN])
            .unwrap();
        assert!(session.sync_from_store().unwrap().is_none());
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }
}
