use crate::collab::engine::ManifestEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Legacy document row, keyed by an opaque client-chosen id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// Project row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File row. `projects`/`files` are the source of truth for which files
/// exist; the collaborative file-manifest room is derived from them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub path: String,
    pub content: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRow {
    /// Projection pushed into the project's file-manifest room.
    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            id: self.id.to_string(),
            name: self.name.clone(),
            path: self.path.clone(),
            language: self.language.clone(),
        }
    }
}

/// Database connection pool
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Returns
    /// * `Result<Self, SqlxError>` - Database connection pool or error
    pub async fn connect(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Create the schema if it does not exist yet.
    pub async fn init_schema(&self) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL DEFAULT '',
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id UUID PRIMARY KEY,
                project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                path TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                language TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (project_id, path)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database schema initialized");
        Ok(())
    }

    /// Load the stored text of a legacy document
    ///
    /// # Arguments
    /// * `document_id` - Opaque document identifier
    ///
    /// # Returns
    /// * `Result<Option<String>, SqlxError>` - Content if a row exists
    pub async fn load_document(&self, document_id: &str) -> Result<Option<String>, SqlxError> {
        let content: Option<(String,)> =
            sqlx::query_as("SELECT content FROM documents WHERE id = $1")
                .bind(document_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(content.map(|(c,)| c))
    }

    /// Load the full row of a legacy document.
    pub async fn load_document_row(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentRow>, SqlxError> {
        sqlx::query_as::<_, DocumentRow>(
            "SELECT id, content, updated_at FROM documents WHERE id = $1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Write the flattened text of a legacy document in a single upsert.
    /// The row carries last-writer-by-timestamp semantics, so out-of-order
    /// completion of overlapping flushes is tolerated.
    pub async fn upsert_document(&self, document_id: &str, content: &str) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, content, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (id) DO UPDATE
                SET content = EXCLUDED.content,
                    updated_at = NOW()
            "#,
        )
        .bind(document_id)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Load the stored content of a project file.
    pub async fn load_file_content(&self, file_id: Uuid) -> Result<Option<String>, SqlxError> {
        let content: Option<(String,)> = sqlx::query_as("SELECT content FROM files WHERE id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(content.map(|(c,)| c))
    }

    /// Write the flattened content of a project file
    ///
    /// # Returns
    /// * `Result<bool, SqlxError>` - false if the row no longer exists
    pub async fn update_file_content(&self, file_id: Uuid, content: &str) -> Result<bool, SqlxError> {
        let result = sqlx::query(
            "UPDATE files SET content = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(file_id)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert a new project
    ///
    /// # Arguments
    /// * `name` - Display name of the project
    ///
    /// # Returns
    /// * `Result<ProjectRow, SqlxError>` - The created row
    pub async fn insert_project(&self, name: &str) -> Result<ProjectRow, SqlxError> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO projects (id, name)
            VALUES ($1, $2)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        info!("Project created: {} ('{}')", row.id, row.name);
        Ok(row)
    }

    /// Fetch a project by id.
    pub async fn get_project(&self, project_id: Uuid) -> Result<Option<ProjectRow>, SqlxError> {
        sqlx::query_as::<_, ProjectRow>(
            "SELECT id, name, created_at, updated_at FROM projects WHERE id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// List the files of a project, oldest first.
    pub async fn list_files(&self, project_id: Uuid) -> Result<Vec<FileRow>, SqlxError> {
        sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, project_id, name, path, content, language, created_at, updated_at
            FROM files
            WHERE project_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Insert a new file row
    ///
    /// # Arguments
    /// * `project_id` - Owning project
    /// * `name` - File name
    /// * `path` - Path within the project, unique per project
    /// * `language` - Editor language hint
    ///
    /// # Returns
    /// * `Result<FileRow, SqlxError>` - The created row
    pub async fn insert_file(
        &self,
        project_id: Uuid,
        name: &str,
        path: &str,
        language: &str,
    ) -> Result<FileRow, SqlxError> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO files (id, project_id, name, path, language)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, name, path, content, language, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(name)
        .bind(path)
        .bind(language)
        .fetch_one(&self.pool)
        .await?;
        info!("File created: {} ('{}' in project {})", row.id, row.path, project_id);
        Ok(row)
    }

    /// Delete a file row
    ///
    /// # Returns
    /// * `Result<bool, SqlxError>` - false if no such row existed
    pub async fn delete_file(&self, project_id: Uuid, file_id: Uuid) -> Result<bool, SqlxError> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1 AND project_id = $2")
            .bind(file_id)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
