use std::path::{Path, PathBuf};

use sqlx::{migrate::MigrateDatabase, Pool, Sqlite, SqlitePool};

use log::{error, info};

use crate::user::User;
use crate::Timestamp;

type Result<T> = std::result::Result<T, ()>;

#[derive(Debug)]
pub enum FindError {
    NotFound,
    Internal,
}

pub struct Backend(pub Pool<Sqlite>);

fn into_sql(path: &Path) -> PathBuf {
    path.join("accounts.sql")
}

pub async fn init(data_dir: &Path) {
    let final_path = format!(
        "sqlite://{}",
        into_sql(data_dir).to_str().expect("non utf-8 data")
    );
    match Sqlite::create_database(&final_path).await {
        Ok(()) => {
            info!("Using {}", &final_path);
        }
        Err(e) => {
            let sqlx::Error::Database(db_err) = e else {
                panic!("error creating database: {e}");
            };

            panic!("sql db error: {db_err:?}");
        }
    }
}

impl Backend {
    pub async fn new(data_dir: &Path) -> Self {
        let db_pathbuf = into_sql(data_dir);
        let db_path = db_pathbuf.to_str().expect("non utf-8 data");
        let pool = match SqlitePool::connect(db_path).await {
            Ok(pool) => pool,
            Err(_err) => {
                init(data_dir).await;
                SqlitePool::connect(db_path).await.expect("db connection")
            }
        };

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migration");

        Self(pool)
    }
}

impl Backend {
    pub async fn find_user_by_username(
        &self,
        username: &str,
    ) -> std::result::Result<User, FindError> {
        sqlx::query_as::<_, User>(
            "
            SELECT id, username, pwhash, created
            FROM users
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_one(&self.0)
        .await
        .map_err(|e| {
            if matches!(e, sqlx::Error::RowNotFound) {
                FindError::NotFound
            } else {
                error!("couldn't query user {username}: {e:?}");
                FindError::Internal
            }
        })
    }

    pub async fn find_user_by_id(&self, id: i64) -> std::result::Result<User, FindError> {
        sqlx::query_as::<_, User>(
            "
            SELECT id, username, pwhash, created
            FROM users
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_one(&self.0)
        .await
        .map_err(|e| {
            if matches!(e, sqlx::Error::RowNotFound) {
                FindError::NotFound
            } else {
                error!("couldn't query user id {id}: {e:?}");
                FindError::Internal
            }
        })
    }

    pub async fn create_user(
        &self,
        username: &str,
        pwhash: &str,
        created: Timestamp,
    ) -> Result<User> {
        sqlx::query(
            "
            INSERT INTO users
            (username, pwhash, created)
            VALUES
            (?, ?, ?)
            ",
        )
        .bind(username)
        .bind(pwhash)
        .bind(created)
        .execute(&self.0)
        .await
        .map(|done| User {
            id: done.last_insert_rowid(),
            username: username.into(),
            pwhash: pwhash.into(),
            created,
        })
        .map_err(|e| {
            error!("error inserting user {username}: {e:?}");
        })
    }
}

impl Backend {
    pub async fn upsert_session(
        &self,
        session_id: &str,
        user_id: i64,
        created: Timestamp,
    ) -> Result<()> {
        sqlx::query(
            "
            INSERT INTO sessions
            (id, user_id, created)
            VALUES
            (?, ?, ?)
            ON CONFLICT(id)
            DO
                UPDATE SET user_id = excluded.user_id
            ",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(created)
        .execute(&self.0)
        .await
        .map(|_| ())
        .map_err(|e| {
            error!("error upserting session: {e:?}");
        })
    }

    pub async fn session_user(&self, session_id: &str) -> Result<Option<i64>> {
        sqlx::query_as::<_, (i64,)>(
            "
            SELECT user_id
            FROM sessions
            WHERE id = ?
            ",
        )
        .bind(session_id)
        .fetch_optional(&self.0)
        .await
        .map(|row| row.map(|(user_id,)| user_id))
        .map_err(|e| {
            error!("couldn't query session {session_id}: {e:?}");
        })
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        sqlx::query(
            "
            DELETE FROM sessions
            WHERE id = ?
            ",
        )
        .bind(session_id)
        .execute(&self.0)
        .await
        .map(|_| ())
        .map_err(|e| {
            error!("error deleting session {session_id}: {e:?}");
        })
    }
}

#[cfg(test)]
pub mod test {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};

    pub async fn create_db() -> Pool<Sqlite> {
        // single connection: each sqlite :memory: connection is its own db
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();

        sqlx::migrate!("./migrations").run(&db).await.unwrap();

        db
    }
}
