use std::sync::Arc;

use async_graphql::{
    Context, EmptySubscription, InputObject, Object, Result, Schema, SimpleObject,
};

use crate::accounts::{Accounts, LoginError};
use crate::session::Session;
use crate::user::User;

pub type AccountSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn schema(accounts: Arc<Accounts>) -> AccountSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(accounts)
        .finish()
}

/// Credentials as supplied by the client. Deliberately unvalidated: empty or
/// weak values are accepted here and rejected (or not) downstream.
#[derive(Debug, InputObject)]
pub struct UsernamePasswordInput {
    pub username: String,
    pub password: String,
}

/// A failure attributed to one named input field, for client-side display.
#[derive(Debug, SimpleObject)]
pub struct FieldError {
    field: String,
    message: String,
}

/// Either a user or a non-empty list of field errors, never both.
#[derive(Debug, SimpleObject)]
pub struct UserResponse {
    errors: Option<Vec<FieldError>>,
    user: Option<User>,
}

impl UserResponse {
    fn from_user(user: User) -> Self {
        Self {
            errors: None,
            user: Some(user),
        }
    }

    fn error(field: &str, message: &str) -> Self {
        Self {
            errors: Some(vec![FieldError {
                field: field.into(),
                message: message.into(),
            }]),
            user: None,
        }
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The currently logged-in user, or null when unauthenticated.
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let accounts = ctx.data::<Arc<Accounts>>()?;
        let session = ctx.data::<Session>()?;

        Ok(accounts.me(session).await?)
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create an account and log it in. Failures (including a taken
    /// username) surface as GraphQL errors, not field errors.
    async fn register(
        &self,
        ctx: &Context<'_>,
        options: UsernamePasswordInput,
    ) -> Result<User> {
        let accounts = ctx.data::<Arc<Accounts>>()?;
        let session = ctx.data::<Session>()?;

        Ok(accounts
            .register(&options.username, &options.password, session)
            .await?)
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        options: UsernamePasswordInput,
    ) -> Result<UserResponse> {
        let accounts = ctx.data::<Arc<Accounts>>()?;
        let session = ctx.data::<Session>()?;

        match accounts
            .login(&options.username, &options.password, session)
            .await
        {
            Ok(user) => Ok(UserResponse::from_user(user)),
            Err(LoginError::UnknownUsername) => {
                Ok(UserResponse::error("username", "Username does not exist"))
            }
            Err(LoginError::WrongPassword) => {
                Ok(UserResponse::error("password", "Incorrect password"))
            }
            Err(LoginError::Internal) => Err(crate::accounts::Error::Internal.into()),
        }
    }

    /// Drop the request's session. Returns whether a session was cleared.
    async fn logout(&self, ctx: &Context<'_>) -> Result<bool> {
        let accounts = ctx.data::<Arc<Accounts>>()?;
        let session = ctx.data::<Session>()?;

        Ok(accounts.logout(session).await?)
    }
}
