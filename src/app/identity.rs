// src/app/identity.rs
//! Identity provider seam plus the REST adapter (`/auth/v1/*`).

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock};

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::data::{Credentials, User};
use super::utils::{build_http_client, clip, trim_base};
use crate::error::AuthError;

/// `Some(user)` after a sign-in, `None` after a sign-out or expiry.
pub type AuthChange = Option<User>;

pub trait IdentityProvider: Send + Sync {
    fn current_session(&self) -> Result<Option<User>, AuthError>;
    /// Creates the identity only; does not sign in.
    fn sign_up(&self, creds: &Credentials) -> Result<(), AuthError>;
    /// Success is announced to subscribers, not through the return value.
    fn sign_in(&self, creds: &Credentials) -> Result<(), AuthError>;
    fn sign_out(&self) -> Result<(), AuthError>;
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> Receiver<AuthChange>;
}

/// Access token shared between the identity provider and the row store.
#[derive(Clone, Default)]
pub struct TokenCell(Arc<RwLock<Option<String>>>);

impl TokenCell {
    pub fn get(&self) -> Option<String> {
        self.0.read().ok().and_then(|t| t.clone())
    }

    pub fn set(&self, token: Option<String>) {
        if let Ok(mut slot) = self.0.write() {
            *slot = token;
        }
    }
}

/// Fan-out of auth changes; senders whose receiver is gone are pruned.
#[derive(Default)]
pub struct Subscribers {
    senders: Mutex<Vec<Sender<AuthChange>>>,
}

impl Subscribers {
    pub fn subscribe(&self) -> Receiver<AuthChange> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }
        rx
    }

    pub fn broadcast(&self, change: &AuthChange) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|tx| tx.send(change.clone()).is_ok());
        }
    }

    pub fn len(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: User,
}

pub struct RestIdentityProvider {
    base_url: String,
    anon_key: Option<String>,
    token: TokenCell,
    http: Client,
    subscribers: Subscribers,
}

impl RestIdentityProvider {
    pub fn new(base_url: &str, anon_key: Option<String>, token: TokenCell) -> Result<Self, AuthError> {
        Ok(Self {
            base_url: trim_base(base_url),
            anon_key,
            token,
            http: build_http_client("podshelf/auth")?,
            subscribers: Subscribers::default(),
        })
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn with_key(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.anon_key {
            Some(key) => req.header("apikey", key),
            None => req,
        }
    }

    fn rejected(resp: Response) -> AuthError {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        let reason = provider_message(&body).unwrap_or_else(|| format!("HTTP {status}"));
        warn!("identity provider -> {status}: {}", clip(&body, 200));
        AuthError::Rejected { reason }
    }
}

/// Pull the human-readable message out of an error body.
fn provider_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|k| v.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

impl IdentityProvider for RestIdentityProvider {
    fn current_session(&self) -> Result<Option<User>, AuthError> {
        let Some(token) = self.token.get() else {
            return Ok(None);
        };
        let resp = self
            .with_key(self.http.get(self.auth_url("user")))
            .bearer_auth(token)
            .send()?;
        match resp.status() {
            s if s.is_success() => Ok(Some(resp.json::<User>()?)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("stored session expired");
                self.token.set(None);
                Ok(None)
            }
            _ => Err(Self::rejected(resp)),
        }
    }

    fn sign_up(&self, creds: &Credentials) -> Result<(), AuthError> {
        let resp = self
            .with_key(self.http.post(self.auth_url("signup")))
            .json(&json!({ "email": creds.email, "password": creds.password }))
            .send()?;
        if !resp.status().is_success() {
            return Err(Self::rejected(resp));
        }
        info!("Sign-up accepted");
        Ok(())
    }

    fn sign_in(&self, creds: &Credentials) -> Result<(), AuthError> {
        let resp = self
            .with_key(self.http.post(self.auth_url("token?grant_type=password")))
            .json(&json!({ "email": creds.email, "password": creds.password }))
            .send()?;
        if !resp.status().is_success() {
            return Err(Self::rejected(resp));
        }
        let body: TokenResponse = resp.json()?;
        self.token.set(Some(body.access_token));
        info!("Signed in as user {}", body.user.id);
        self.subscribers.broadcast(&Some(body.user));
        Ok(())
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(token) = self.token.get() {
            let resp = self
                .with_key(self.http.post(self.auth_url("logout")))
                .bearer_auth(token)
                .send()?;
            if !resp.status().is_success() && resp.status() != StatusCode::UNAUTHORIZED {
                return Err(Self::rejected(resp));
            }
        }
        self.token.set(None);
        info!("Signed out");
        self.subscribers.broadcast(&None);
        Ok(())
    }

    fn subscribe(&self) -> Receiver<AuthChange> {
        self.subscribers.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::Receiver;
    use std::sync::Mutex;

    use super::{AuthChange, IdentityProvider, Subscribers};
    use crate::app::data::{Credentials, User};
    use crate::error::AuthError;

    /// Accepts `secret` as the only password. Sign-in announces the user on
    /// the next `announce()` call unless `auto_announce` is set.
    #[derive(Default)]
    pub(crate) struct FakeIdentity {
        pub existing: Mutex<Option<User>>,
        pub fail_session: Mutex<bool>,
        pub fail_sign_out: Mutex<bool>,
        pub auto_announce: bool,
        pub calls: AtomicUsize,
        pending: Mutex<Option<AuthChange>>,
        pub subscribers: Subscribers,
    }

    impl FakeIdentity {
        pub fn user(id: &str) -> User {
            User {
                id: id.into(),
                email: Some(format!("{id}@example.com")),
            }
        }

        /// Deliver the change held back by the last sign-in/out.
        pub fn announce(&self) {
            if let Some(change) = self.pending.lock().unwrap().take() {
                self.subscribers.broadcast(&change);
            }
        }

        pub fn push(&self, change: AuthChange) {
            self.subscribers.broadcast(&change);
        }

        fn emit(&self, change: AuthChange) {
            if self.auto_announce {
                self.subscribers.broadcast(&change);
            } else {
                *self.pending.lock().unwrap() = Some(change);
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl IdentityProvider for FakeIdentity {
        fn current_session(&self) -> Result<Option<User>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail_session.lock().unwrap() {
                return Err(AuthError::Transport {
                    reason: "provider down".into(),
                });
            }
            Ok(self.existing.lock().unwrap().clone())
        }

        fn sign_up(&self, creds: &Credentials) -> Result<(), AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if creds.email.starts_with("taken") {
                return Err(AuthError::Rejected {
                    reason: "User already registered".into(),
                });
            }
            Ok(())
        }

        fn sign_in(&self, creds: &Credentials) -> Result<(), AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if creds.password != "secret" {
                return Err(AuthError::Rejected {
                    reason: "Invalid login credentials".into(),
                });
            }
            let local = creds.email.split('@').next().unwrap_or_default();
            self.emit(Some(Self::user(local)));
            Ok(())
        }

        fn sign_out(&self) -> Result<(), AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail_sign_out.lock().unwrap() {
                return Err(AuthError::Transport {
                    reason: "connection reset".into(),
                });
            }
            self.emit(None);
            Ok(())
        }

        fn subscribe(&self) -> Receiver<AuthChange> {
            self.subscribers.subscribe()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_provider_messages() {
        assert_eq!(
            provider_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(
            provider_message(r#"{"code":422,"msg":"Password should be at least 6 characters"}"#)
                .as_deref(),
            Some("Password should be at least 6 characters")
        );
        assert_eq!(provider_message("<html>"), None);
    }

    #[test]
    fn broadcast_prunes_dropped_subscribers() {
        let subs = Subscribers::default();
        let keep = subs.subscribe();
        let gone = subs.subscribe();
        drop(gone);
        assert!(!subs.is_empty());
        subs.broadcast(&None);
        assert_eq!(subs.len(), 1);
        assert_eq!(keep.try_recv().unwrap(), None);
        drop(keep);
        subs.broadcast(&None);
        assert!(subs.is_empty());
    }

    #[test]
    fn token_cell_is_shared() {
        let a = TokenCell::default();
        let b = a.clone();
        a.set(Some("t".into()));
        assert_eq!(b.get().as_deref(), Some("t"));
    }

    #[test]
    fn signed_out_provider_has_no_session_without_request() {
        let provider =
            RestIdentityProvider::new("http://127.0.0.1:9", None, TokenCell::default()).unwrap();
        assert_eq!(provider.current_session().unwrap(), None);
        assert_eq!(
            provider.auth_url("token?grant_type=password"),
            "http://127.0.0.1:9/auth/v1/token?grant_type=password"
        );
    }
}
