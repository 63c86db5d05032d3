use std::result;

use log::{debug, error, info};

use crate::backend::{Backend, FindError};
use crate::password;
use crate::session::{Session, SessionId};
use crate::user::User;
use crate::Timestamp;

pub struct Accounts(Backend);

#[derive(Copy, Clone, Debug)]
pub enum Error {
    Internal,
}

pub type Result<T> = result::Result<T, Error>;

impl From<Error> for async_graphql::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Internal => async_graphql::Error::new("internal server error"),
        }
    }
}

/// Why a login attempt was rejected. The unknown-username / wrong-password
/// distinction is deliberate and surfaces as distinct field errors.
#[derive(Debug)]
pub enum LoginError {
    UnknownUsername,
    WrongPassword,
    Internal,
}

impl From<Error> for LoginError {
    fn from(e: Error) -> Self {
        match e {
            Error::Internal => Self::Internal,
        }
    }
}

impl Accounts {
    pub fn new(backend: Backend) -> Self {
        Self(backend)
    }

    /// The user the request's session belongs to. Absence is always `None`,
    /// never an error: no cookie, an unknown session id and a session whose
    /// user has since been deleted all look the same to the caller.
    pub async fn me(&self, session: &Session) -> Result<Option<User>> {
        let Some(session_id) = session.current() else {
            return Ok(None);
        };

        let user_id = self
            .0
            .session_user(&session_id.to_string())
            .await
            .map_err(|()| Error::Internal)?;

        let Some(user_id) = user_id else {
            debug!("no session found for {session_id}");
            return Ok(None);
        };

        match self.0.find_user_by_id(user_id).await {
            Ok(user) => Ok(Some(user)),
            Err(FindError::NotFound) => {
                info!("session {session_id} refers to deleted user {user_id}");
                Ok(None)
            }
            Err(FindError::Internal) => Err(Error::Internal),
        }
    }

    /// Create an account and log it in. There is no field-error path here:
    /// anything that goes wrong (including a username collision) surfaces as
    /// a generic server error.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        session: &Session,
    ) -> Result<User> {
        let pwhash = password::hash(password).map_err(|e| {
            error!("couldn't hash password for {username}: {e}");
            Error::Internal
        })?;

        let now = now()?;

        let user = self
            .0
            .create_user(username, &pwhash, now)
            .await
            .map_err(|()| Error::Internal)?;

        self.bind_session(session, user.id, now).await?;

        info!("{username} registered as user {}", user.id);
        Ok(user)
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        session: &Session,
    ) -> result::Result<User, LoginError> {
        let user = self
            .0
            .find_user_by_username(username)
            .await
            .map_err(|e| match e {
                FindError::NotFound => {
                    error!("rejecting unknown user {username}");
                    LoginError::UnknownUsername
                }
                FindError::Internal => LoginError::Internal,
            })?;

        if !password::verify(&user.pwhash, password) {
            error!("wrong password for user {username}");
            return Err(LoginError::WrongPassword);
        }

        let now = now()?;
        self.bind_session(session, user.id, now).await?;

        info!("{username} logged in");
        Ok(user)
    }

    /// Drop the request's session, if it has one. Returns whether anything
    /// was cleared.
    pub async fn logout(&self, session: &Session) -> Result<bool> {
        let Some(session_id) = session.current() else {
            return Ok(false);
        };

        self.0
            .delete_session(&session_id.to_string())
            .await
            .map_err(|()| Error::Internal)?;

        info!("session {session_id} logged out");
        Ok(true)
    }

    /// Point the client's session at `user_id`, minting a session id if the
    /// request didn't present one, and record it for the Set-Cookie reply.
    async fn bind_session(
        &self,
        session: &Session,
        user_id: i64,
        now: Timestamp,
    ) -> Result<SessionId> {
        let session_id = session.current().unwrap_or_else(SessionId::new);

        self.0
            .upsert_session(&session_id.to_string(), user_id, now)
            .await
            .map_err(|()| Error::Internal)?;

        session.issue(session_id);
        Ok(session_id)
    }
}

fn now() -> Result<Timestamp> {
    Timestamp::now().map_err(|()| Error::Internal)
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::backend;

    async fn create_accounts() -> Accounts {
        Accounts(Backend(backend::test::create_db().await))
    }

    fn anonymous() -> Session {
        Session::from_cookie(None)
    }

    fn resume(id: SessionId) -> Session {
        Session::from_cookie(Some(&id.to_string()))
    }

    #[tokio::test]
    async fn me_without_session() {
        let accounts = create_accounts().await;

        let user = accounts.me(&anonymous()).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn me_with_unknown_session() {
        let accounts = create_accounts().await;

        let user = accounts.me(&resume(SessionId::new())).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn register_then_login() {
        let accounts = create_accounts().await;

        let session = anonymous();
        let registered = accounts.register("alice", "pw1", &session).await.unwrap();

        // auto-login: the new session maps to the new user
        let session_id = session.issued().expect("register issues a session");
        assert_eq!(
            accounts
                .0
                .session_user(&session_id.to_string())
                .await
                .unwrap(),
            Some(registered.id),
        );

        // a fresh client can log in with the same credentials
        let session = anonymous();
        let logged_in = accounts.login("alice", "pw1", &session).await.unwrap();
        assert_eq!(logged_in.id, registered.id);

        let session_id = session.issued().expect("login issues a session");
        assert_eq!(
            accounts
                .0
                .session_user(&session_id.to_string())
                .await
                .unwrap(),
            Some(registered.id),
        );
    }

    #[tokio::test]
    async fn me_resumes_session() {
        let accounts = create_accounts().await;

        let session = anonymous();
        let registered = accounts.register("alice", "pw1", &session).await.unwrap();
        let session_id = session.issued().unwrap();

        let me = accounts.me(&resume(session_id)).await.unwrap().unwrap();
        assert_eq!(me.id, registered.id);
        assert_eq!(me.username, "alice");
    }

    #[tokio::test]
    async fn login_unknown_username() {
        let accounts = create_accounts().await;

        let session = anonymous();
        let err = accounts.login("ghost", "x", &session).await.unwrap_err();

        assert!(matches!(err, LoginError::UnknownUsername));
        assert!(session.issued().is_none());
    }

    #[tokio::test]
    async fn login_wrong_password() {
        let accounts = create_accounts().await;

        accounts
            .register("alice", "pw1", &anonymous())
            .await
            .unwrap();

        let session = anonymous();
        let err = accounts
            .login("alice", "wrong", &session)
            .await
            .unwrap_err();

        assert!(matches!(err, LoginError::WrongPassword));
        assert!(session.issued().is_none());
    }

    #[tokio::test]
    async fn failed_login_leaves_session_untouched() {
        let accounts = create_accounts().await;

        let session = anonymous();
        let alice = accounts.register("alice", "pw1", &session).await.unwrap();
        accounts
            .register("bob", "pw2", &anonymous())
            .await
            .unwrap();
        let session_id = session.issued().unwrap();

        // a failed login as bob on alice's session must not rebind it
        let session = resume(session_id);
        accounts.login("bob", "wrong", &session).await.unwrap_err();

        assert_eq!(
            accounts
                .0
                .session_user(&session_id.to_string())
                .await
                .unwrap(),
            Some(alice.id),
        );
    }

    #[tokio::test]
    async fn me_with_stale_session() {
        let accounts = create_accounts().await;

        let session = anonymous();
        let registered = accounts.register("alice", "pw1", &session).await.unwrap();
        let session_id = session.issued().unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(registered.id)
            .execute(&accounts.0 .0)
            .await
            .unwrap();

        let user = accounts.me(&resume(session_id)).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn duplicate_username() {
        let accounts = create_accounts().await;

        accounts
            .register("alice", "pw1", &anonymous())
            .await
            .unwrap();

        let session = anonymous();
        let err = accounts.register("alice", "pw2", &session).await;

        assert!(matches!(err, Err(Error::Internal)));
        assert!(session.issued().is_none());
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let accounts = create_accounts().await;

        let session = anonymous();
        accounts.register("alice", "pw1", &session).await.unwrap();
        let session_id = session.issued().unwrap();

        let session = resume(session_id);
        assert!(accounts.logout(&session).await.unwrap());

        let user = accounts.me(&resume(session_id)).await.unwrap();
        assert!(user.is_none());

        // logging out an anonymous session is a no-op
        assert!(!accounts.logout(&anonymous()).await.unwrap());
    }
}
