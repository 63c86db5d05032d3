use async_graphql::SimpleObject;

use crate::Timestamp;

/// An account row. `pwhash` never leaves the process: it's skipped in the
/// GraphQL object, so no query can select it.
#[derive(Debug, Clone, SimpleObject)]
#[derive(sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[graphql(skip)]
    pub pwhash: String,
    pub created: Timestamp,
}
