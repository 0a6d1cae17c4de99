use crate::db::models::{DbAcronym, DbCategory, DbUser};
use crate::db::schema::{ADD_TWITTER_URL_TO_USER, SQLITE_INIT};
use crate::error::TilError;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

/// Input for inserting a user row.
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub twitter_url: Option<String>,
}

/// Input for inserting an acronym row.
#[derive(Debug, Clone)]
pub struct AcronymCreate {
    pub short: String,
    pub long: String,
    pub user_id: i64,
}

/// Full-row update for an acronym.
#[derive(Debug, Clone)]
pub struct AcronymUpdate {
    pub id: i64,
    pub short: String,
    pub long: String,
    pub user_id: i64,
}

/// One acronym<->category association, addressed by category name.
#[derive(Debug, Clone)]
pub struct CategoryLink {
    pub acronym_id: i64,
    pub name: String,
}

#[derive(Debug)]
pub enum DbActorMessage {
    /// Insert a user and return the stored row.
    CreateUser(UserCreate, RpcReplyPort<Result<DbUser, TilError>>),

    /// Look up a user by login identity.
    FindUserByUsername(String, RpcReplyPort<Result<Option<DbUser>, TilError>>),

    /// Look up a user by id.
    GetUser(i64, RpcReplyPort<Result<Option<DbUser>, TilError>>),

    /// List all users.
    ListUsers(RpcReplyPort<Result<Vec<DbUser>, TilError>>),

    /// Insert an acronym and return the stored row.
    CreateAcronym(AcronymCreate, RpcReplyPort<Result<DbAcronym, TilError>>),

    /// Look up an acronym by id.
    GetAcronym(i64, RpcReplyPort<Result<Option<DbAcronym>, TilError>>),

    /// List all acronyms.
    ListAcronyms(RpcReplyPort<Result<Vec<DbAcronym>, TilError>>),

    /// Update an acronym's short/long/owner fields.
    UpdateAcronym(AcronymUpdate, RpcReplyPort<Result<(), TilError>>),

    /// Delete an acronym by id (no error when the row is absent).
    DeleteAcronym(i64, RpcReplyPort<Result<(), TilError>>),

    /// List acronyms owned by one user.
    AcronymsForUser(i64, RpcReplyPort<Result<Vec<DbAcronym>, TilError>>),

    /// List all categories.
    ListCategories(RpcReplyPort<Result<Vec<DbCategory>, TilError>>),

    /// Look up a category by id.
    GetCategory(i64, RpcReplyPort<Result<Option<DbCategory>, TilError>>),

    /// List acronyms associated with one category.
    AcronymsForCategory(i64, RpcReplyPort<Result<Vec<DbAcronym>, TilError>>),

    /// List categories associated with one acronym.
    CategoriesForAcronym(i64, RpcReplyPort<Result<Vec<DbCategory>, TilError>>),

    /// Attach a category (created by name on demand) to an acronym.
    AttachCategory(CategoryLink, RpcReplyPort<Result<(), TilError>>),

    /// Detach a category from an acronym by name.
    DetachCategory(CategoryLink, RpcReplyPort<Result<(), TilError>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn create_user(&self, create: UserCreate) -> Result<DbUser, TilError> {
        ractor::call!(self.actor, DbActorMessage::CreateUser, create)
            .map_err(|e| TilError::Ractor(format!("DbActor CreateUser RPC failed: {e}")))?
    }

    pub async fn find_user_by_username(&self, username: String) -> Result<Option<DbUser>, TilError> {
        ractor::call!(self.actor, DbActorMessage::FindUserByUsername, username).map_err(|e| {
            TilError::Ractor(format!("DbActor FindUserByUsername RPC failed: {e}"))
        })?
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<DbUser>, TilError> {
        ractor::call!(self.actor, DbActorMessage::GetUser, id)
            .map_err(|e| TilError::Ractor(format!("DbActor GetUser RPC failed: {e}")))?
    }

    pub async fn list_users(&self) -> Result<Vec<DbUser>, TilError> {
        ractor::call!(self.actor, DbActorMessage::ListUsers)
            .map_err(|e| TilError::Ractor(format!("DbActor ListUsers RPC failed: {e}")))?
    }

    pub async fn create_acronym(&self, create: AcronymCreate) -> Result<DbAcronym, TilError> {
        ractor::call!(self.actor, DbActorMessage::CreateAcronym, create)
            .map_err(|e| TilError::Ractor(format!("DbActor CreateAcronym RPC failed: {e}")))?
    }

    pub async fn get_acronym(&self, id: i64) -> Result<Option<DbAcronym>, TilError> {
        ractor::call!(self.actor, DbActorMessage::GetAcronym, id)
            .map_err(|e| TilError::Ractor(format!("DbActor GetAcronym RPC failed: {e}")))?
    }

    pub async fn list_acronyms(&self) -> Result<Vec<DbAcronym>, TilError> {
        ractor::call!(self.actor, DbActorMessage::ListAcronyms)
            .map_err(|e| TilError::Ractor(format!("DbActor ListAcronyms RPC failed: {e}")))?
    }

    pub async fn update_acronym(&self, update: AcronymUpdate) -> Result<(), TilError> {
        ractor::call!(self.actor, DbActorMessage::UpdateAcronym, update)
            .map_err(|e| TilError::Ractor(format!("DbActor UpdateAcronym RPC failed: {e}")))?
    }

    pub async fn delete_acronym(&self, id: i64) -> Result<(), TilError> {
        ractor::call!(self.actor, DbActorMessage::DeleteAcronym, id)
            .map_err(|e| TilError::Ractor(format!("DbActor DeleteAcronym RPC failed: {e}")))?
    }

    pub async fn acronyms_for_user(&self, user_id: i64) -> Result<Vec<DbAcronym>, TilError> {
        ractor::call!(self.actor, DbActorMessage::AcronymsForUser, user_id)
            .map_err(|e| TilError::Ractor(format!("DbActor AcronymsForUser RPC failed: {e}")))?
    }

    pub async fn list_categories(&self) -> Result<Vec<DbCategory>, TilError> {
        ractor::call!(self.actor, DbActorMessage::ListCategories)
            .map_err(|e| TilError::Ractor(format!("DbActor ListCategories RPC failed: {e}")))?
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<DbCategory>, TilError> {
        ractor::call!(self.actor, DbActorMessage::GetCategory, id)
            .map_err(|e| TilError::Ractor(format!("DbActor GetCategory RPC failed: {e}")))?
    }

    pub async fn acronyms_for_category(&self, category_id: i64) -> Result<Vec<DbAcronym>, TilError> {
        ractor::call!(self.actor, DbActorMessage::AcronymsForCategory, category_id).map_err(|e| {
            TilError::Ractor(format!("DbActor AcronymsForCategory RPC failed: {e}"))
        })?
    }

    pub async fn categories_for_acronym(&self, acronym_id: i64) -> Result<Vec<DbCategory>, TilError> {
        ractor::call!(self.actor, DbActorMessage::CategoriesForAcronym, acronym_id).map_err(|e| {
            TilError::Ractor(format!("DbActor CategoriesForAcronym RPC failed: {e}"))
        })?
    }

    pub async fn attach_category(&self, acronym_id: i64, name: String) -> Result<(), TilError> {
        let link = CategoryLink { acronym_id, name };
        ractor::call!(self.actor, DbActorMessage::AttachCategory, link)
            .map_err(|e| TilError::Ractor(format!("DbActor AttachCategory RPC failed: {e}")))?
    }

    pub async fn detach_category(&self, acronym_id: i64, name: String) -> Result<(), TilError> {
        let link = CategoryLink { acronym_id, name };
        ractor::call!(self.actor, DbActorMessage::DetachCategory, link)
            .map_err(|e| TilError::Ractor(format!("DbActor DetachCategory RPC failed: {e}")))?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        apply_migrations(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db migration failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::CreateUser(create, reply) => {
                let res = self.create_user(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::FindUserByUsername(username, reply) => {
                let res = self.find_user_by_username(&state.pool, &username).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetUser(id, reply) => {
                let res = self.get_user(&state.pool, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListUsers(reply) => {
                let res = self.list_users(&state.pool).await;
                let _ = reply.send(res);
            }
            DbActorMessage::CreateAcronym(create, reply) => {
                let res = self.create_acronym(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetAcronym(id, reply) => {
                let res = self.get_acronym(&state.pool, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListAcronyms(reply) => {
                let res = self.list_acronyms(&state.pool).await;
                let _ = reply.send(res);
            }
            DbActorMessage::UpdateAcronym(update, reply) => {
                let res = self.update_acronym(&state.pool, update).await;
                let _ = reply.send(res);
            }
            DbActorMessage::DeleteAcronym(id, reply) => {
                let res = self.delete_acronym(&state.pool, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::AcronymsForUser(user_id, reply) => {
                let res = self.acronyms_for_user(&state.pool, user_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::ListCategories(reply) => {
                let res = self.list_categories(&state.pool).await;
                let _ = reply.send(res);
            }
            DbActorMessage::GetCategory(id, reply) => {
                let res = self.get_category(&state.pool, id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::AcronymsForCategory(category_id, reply) => {
                let res = self.acronyms_for_category(&state.pool, category_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::CategoriesForAcronym(acronym_id, reply) => {
                let res = self.categories_for_acronym(&state.pool, acronym_id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::AttachCategory(link, reply) => {
                let res = self.attach_category(&state.pool, link).await;
                let _ = reply.send(res);
            }
            DbActorMessage::DetachCategory(link, reply) => {
                let res = self.detach_category(&state.pool, link).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn create_user(&self, pool: &SqlitePool, create: UserCreate) -> Result<DbUser, TilError> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, DbUser>(
            r#"
        INSERT INTO user (name, username, password_hash, twitter_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, name, username, password_hash, twitter_url, created_at, updated_at
        "#,
        )
        .bind(create.name)
        .bind(create.username)
        .bind(create.password_hash)
        .bind(create.twitter_url)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_username(
        &self,
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<DbUser>, TilError> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
        SELECT id, name, username, password_hash, twitter_url, created_at, updated_at
        FROM user
        WHERE username = ?
        "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn get_user(&self, pool: &SqlitePool, id: i64) -> Result<Option<DbUser>, TilError> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
        SELECT id, name, username, password_hash, twitter_url, created_at, updated_at
        FROM user
        WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn list_users(&self, pool: &SqlitePool) -> Result<Vec<DbUser>, TilError> {
        let rows = sqlx::query_as::<_, DbUser>(
            r#"
        SELECT id, name, username, password_hash, twitter_url, created_at, updated_at
        FROM user
        ORDER BY id
        "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn create_acronym(
        &self,
        pool: &SqlitePool,
        create: AcronymCreate,
    ) -> Result<DbAcronym, TilError> {
        let now = Utc::now();
        let acronym = sqlx::query_as::<_, DbAcronym>(
            r#"
        INSERT INTO acronym (short, long, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, short, long, user_id, created_at, updated_at
        "#,
        )
        .bind(create.short)
        .bind(create.long)
        .bind(create.user_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(acronym)
    }

    async fn get_acronym(&self, pool: &SqlitePool, id: i64) -> Result<Option<DbAcronym>, TilError> {
        let row = sqlx::query_as::<_, DbAcronym>(
            r#"
        SELECT id, short, long, user_id, created_at, updated_at
        FROM acronym
        WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn list_acronyms(&self, pool: &SqlitePool) -> Result<Vec<DbAcronym>, TilError> {
        let rows = sqlx::query_as::<_, DbAcronym>(
            r#"
        SELECT id, short, long, user_id, created_at, updated_at
        FROM acronym
        ORDER BY id
        "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn update_acronym(
        &self,
        pool: &SqlitePool,
        update: AcronymUpdate,
    ) -> Result<(), TilError> {
        let now = Utc::now();
        sqlx::query(
            r#"
        UPDATE acronym
        SET short = ?, long = ?, user_id = ?, updated_at = ?
        WHERE id = ?
        "#,
        )
        .bind(update.short)
        .bind(update.long)
        .bind(update.user_id)
        .bind(now)
        .bind(update.id)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn delete_acronym(&self, pool: &SqlitePool, id: i64) -> Result<(), TilError> {
        // Join rows go with the acronym via ON DELETE CASCADE.
        sqlx::query("DELETE FROM acronym WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    async fn acronyms_for_user(
        &self,
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<DbAcronym>, TilError> {
        let rows = sqlx::query_as::<_, DbAcronym>(
            r#"
        SELECT id, short, long, user_id, created_at, updated_at
        FROM acronym
        WHERE user_id = ?
        ORDER BY id
        "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn list_categories(&self, pool: &SqlitePool) -> Result<Vec<DbCategory>, TilError> {
        let rows =
            sqlx::query_as::<_, DbCategory>("SELECT id, name FROM category ORDER BY name")
                .fetch_all(pool)
                .await?;

        Ok(rows)
    }

    async fn get_category(
        &self,
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<DbCategory>, TilError> {
        let row = sqlx::query_as::<_, DbCategory>("SELECT id, name FROM category WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row)
    }

    async fn acronyms_for_category(
        &self,
        pool: &SqlitePool,
        category_id: i64,
    ) -> Result<Vec<DbAcronym>, TilError> {
        let rows = sqlx::query_as::<_, DbAcronym>(
            r#"
        SELECT a.id, a.short, a.long, a.user_id, a.created_at, a.updated_at
        FROM acronym a
        JOIN acronym_category ac ON ac.acronym_id = a.id
        WHERE ac.category_id = ?
        ORDER BY a.id
        "#,
        )
        .bind(category_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn categories_for_acronym(
        &self,
        pool: &SqlitePool,
        acronym_id: i64,
    ) -> Result<Vec<DbCategory>, TilError> {
        let rows = sqlx::query_as::<_, DbCategory>(
            r#"
        SELECT c.id, c.name
        FROM category c
        JOIN acronym_category ac ON ac.category_id = c.id
        WHERE ac.acronym_id = ?
        ORDER BY c.name
        "#,
        )
        .bind(acronym_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn attach_category(&self, pool: &SqlitePool, link: CategoryLink) -> Result<(), TilError> {
        // Find-or-create by name; the no-op DO UPDATE keeps RETURNING usable on conflict.
        let category_id: i64 = sqlx::query_scalar(
            r#"
        INSERT INTO category (name)
        VALUES (?)
        ON CONFLICT(name) DO UPDATE SET name = excluded.name
        RETURNING id
        "#,
        )
        .bind(link.name)
        .fetch_one(pool)
        .await?;

        sqlx::query("INSERT OR IGNORE INTO acronym_category (acronym_id, category_id) VALUES (?, ?)")
            .bind(link.acronym_id)
            .bind(category_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    async fn detach_category(&self, pool: &SqlitePool, link: CategoryLink) -> Result<(), TilError> {
        sqlx::query(
            r#"
        DELETE FROM acronym_category
        WHERE acronym_id = ?
          AND category_id = (SELECT id FROM category WHERE name = ?)
        "#,
        )
        .bind(link.acronym_id)
        .bind(link.name)
        .execute(pool)
        .await?;

        Ok(())
    }
}

/// Spawn the database actor and return a cloneable handle.
///
/// Anonymous on purpose: several instances may coexist in one process (tests spin up
/// one per temp database), and registered names are process-global.
pub async fn spawn(database_url: &str) -> DbActorHandle {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .expect("failed to spawn DbActor");

    DbActorHandle { actor }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), TilError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

async fn apply_migrations(pool: &SqlitePool) -> Result<(), TilError> {
    let columns: Vec<String> =
        sqlx::query_scalar("SELECT name FROM pragma_table_info('user')")
            .fetch_all(pool)
            .await?;

    if !columns.iter().any(|c| c == "twitter_url") {
        sqlx::query(ADD_TWITTER_URL_TO_USER).execute(pool).await?;
        info!("applied migration: twitter_url column added to user");
    }

    Ok(())
}
