use chrono::{DateTime, Utc};
use roster_storage::{
    GroupId, LocalGroup, LocalMember, MemberFilter, MembershipStore, StoreError,
    UpsertMemberParams, UserId,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

type MemberRow = (
    i64,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    DateTime<Utc>,
);

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.roster/cache.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".roster");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        // sqlx wants forward slashes in sqlite URLs, even on Windows
        let path = dir.join("cache.db");
        let url = format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"));
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        tracing::info!(url, "opening local membership cache");

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its single connection.
        let in_memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(backend)?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    async fn member_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM local_members WHERE user_id=?")
            .bind(user_id.0 as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.is_some())
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn map_write_err(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else if s.contains("FOREIGN KEY") {
        StoreError::NotFound
    } else {
        StoreError::Backend(s)
    }
}

fn group_name(name: &str) -> Result<String, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput("group name is empty".into()));
    }
    Ok(name.to_string())
}

fn member_from_row(r: MemberRow) -> LocalMember {
    LocalMember {
        user_id: UserId(r.0 as u64),
        username: r.1,
        name: r.2,
        avatar_url: r.3,
        project_id: r.4.map(|id| id as u64),
        project_name: r.5,
        updated_at: r.6,
    }
}

#[async_trait::async_trait]
impl MembershipStore for SqliteStore {
    // ───────────────────────────── Members ─────────────────────────────

    async fn upsert_members(&self, members: &[UpsertMemberParams]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let now = Utc::now();

        for m in members {
            sqlx::query(
                "INSERT INTO local_members(user_id,username,name,avatar_url,project_id,project_name,updated_at)
                 VALUES(?,?,?,?,?,?,?)
                 ON CONFLICT(user_id) DO UPDATE SET
                   username=excluded.username,
                   name=excluded.name,
                   avatar_url=excluded.avatar_url,
                   project_id=excluded.project_id,
                   project_name=excluded.project_name,
                   updated_at=excluded.updated_at",
            )
            .bind(m.user_id.0 as i64)
            .bind(&m.username)
            .bind(&m.name)
            .bind(&m.avatar_url)
            .bind(m.project_id.map(|id| id as i64))
            .bind(&m.project_name)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        tracing::info!(count = members.len(), "upserted local members");
        Ok(())
    }

    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<LocalMember>, StoreError> {
        let rows = match &filter.query {
            Some(q) => {
                let like = format!("%{}%", q);
                sqlx::query_as::<_, MemberRow>(
                    "SELECT user_id,username,name,avatar_url,project_id,project_name,updated_at
                     FROM local_members
                     WHERE username LIKE ?1 OR name LIKE ?1
                     ORDER BY updated_at DESC, user_id ASC
                     LIMIT ?2",
                )
                .bind(like)
                .bind(filter.limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, MemberRow>(
                    "SELECT user_id,username,name,avatar_url,project_id,project_name,updated_at
                     FROM local_members
                     ORDER BY updated_at DESC, user_id ASC
                     LIMIT ?1",
                )
                .bind(filter.limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(backend)?;

        tracing::debug!(query = ?filter.query, count = rows.len(), "listed local members");
        Ok(rows.into_iter().map(member_from_row).collect())
    }

    async fn delete_members(&self, user_ids: &[UserId]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let mut deleted = 0;

        for uid in user_ids {
            sqlx::query("DELETE FROM local_group_members WHERE user_id=?")
                .bind(uid.0 as i64)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
            let res = sqlx::query("DELETE FROM local_members WHERE user_id=?")
                .bind(uid.0 as i64)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
            deleted += res.rows_affected();
        }

        tx.commit().await.map_err(backend)?;
        tracing::info!(requested = user_ids.len(), deleted, "deleted local members");
        Ok(deleted)
    }

    // ───────────────────────────── Groups ──────────────────────────────

    async fn create_group(&self, name: &str) -> Result<LocalGroup, StoreError> {
        let name = group_name(name)?;
        let now = Utc::now();

        let res = sqlx::query("INSERT INTO local_groups(name,created_at) VALUES(?,?)")
            .bind(&name)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_write_err)?;

        let id = GroupId(res.last_insert_rowid());
        tracing::info!(group_id = %id, name = %name, "created local group");
        Ok(LocalGroup {
            id,
            name,
            created_at: now,
            members_count: 0,
        })
    }

    async fn get_group(&self, group_id: &GroupId) -> Result<LocalGroup, StoreError> {
        let row = sqlx::query_as::<_, (i64, String, DateTime<Utc>, i64)>(
            "SELECT g.id, g.name, g.created_at, COUNT(gm.user_id)
             FROM local_groups g
             LEFT JOIN local_group_members gm ON gm.group_id = g.id
             WHERE g.id = ?
             GROUP BY g.id",
        )
        .bind(group_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Err(StoreError::NotFound),
            Some((id, name, created_at, count)) => Ok(LocalGroup {
                id: GroupId(id),
                name,
                created_at,
                members_count: count as u64,
            }),
        }
    }

    async fn list_groups(&self) -> Result<Vec<LocalGroup>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, String, DateTime<Utc>, i64)>(
            "SELECT g.id, g.name, g.created_at, COUNT(gm.user_id)
             FROM local_groups g
             LEFT JOIN local_group_members gm ON gm.group_id = g.id
             GROUP BY g.id
             ORDER BY g.id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows
            .into_iter()
            .map(|(id, name, created_at, count)| LocalGroup {
                id: GroupId(id),
                name,
                created_at,
                members_count: count as u64,
            })
            .collect())
    }

    async fn rename_group(&self, group_id: &GroupId, name: &str) -> Result<(), StoreError> {
        let name = group_name(name)?;
        let res = sqlx::query("UPDATE local_groups SET name=? WHERE id=?")
            .bind(&name)
            .bind(group_id.0)
            .execute(&self.pool)
            .await
            .map_err(map_write_err)?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::info!(group_id = %group_id, name = %name, "renamed local group");
        Ok(())
    }

    async fn delete_group(&self, group_id: &GroupId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM local_group_members WHERE group_id=?")
            .bind(group_id.0)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        let res = sqlx::query("DELETE FROM local_groups WHERE id=?")
            .bind(group_id.0)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        if res.rows_affected() == 0 {
            tx.rollback().await.map_err(backend)?;
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(backend)?;
        tracing::info!(group_id = %group_id, "deleted local group");
        Ok(())
    }

    // ───────────────────────────── Group Membership ────────────────────

    async fn add_to_group(&self, group_id: &GroupId, user_ids: &[UserId]) -> Result<(), StoreError> {
        // surfaces NotFound for a missing group before touching anything
        self.get_group(group_id).await?;
        for uid in user_ids {
            if !self.member_exists(*uid).await? {
                tracing::debug!(user_id = %uid, "refusing to group an uncached member");
                return Err(StoreError::NotFound);
            }
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        let now = Utc::now();

        for uid in user_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO local_group_members(group_id,user_id,created_at)
                 VALUES(?,?,?)",
            )
            .bind(group_id.0)
            .bind(uid.0 as i64)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_write_err)?;
        }

        tx.commit().await.map_err(backend)?;
        tracing::info!(group_id = %group_id, count = user_ids.len(), "added members to group");
        Ok(())
    }

    async fn remove_from_group(
        &self,
        group_id: &GroupId,
        user_ids: &[UserId],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        for uid in user_ids {
            sqlx::query("DELETE FROM local_group_members WHERE group_id=? AND user_id=?")
                .bind(group_id.0)
                .bind(uid.0 as i64)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        tracing::info!(group_id = %group_id, count = user_ids.len(), "removed members from group");
        Ok(())
    }

    async fn list_group_members(&self, group_id: &GroupId) -> Result<Vec<LocalMember>, StoreError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT m.user_id,m.username,m.name,m.avatar_url,m.project_id,m.project_name,m.updated_at
             FROM local_members m
             INNER JOIN local_group_members gm ON gm.user_id = m.user_id
             WHERE gm.group_id = ?
             ORDER BY m.username ASC",
        )
        .bind(group_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        tracing::debug!(group_id = %group_id, count = rows.len(), "listed group members");
        Ok(rows.into_iter().map(member_from_row).collect())
    }
}
