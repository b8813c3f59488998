//! # PostgreSQL データベース接続管理
//!
//! 接続プールの作成、マイグレーション、疎通確認を提供する。
//!
//! ```rust,ignore
//! use storefront_infra::db;
//!
//! let pool = db::create_pool("postgres://localhost/storefront").await?;
//! db::run_migrations(&pool).await?;
//! ```

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

/// 接続プールの最大接続数
const MAX_CONNECTIONS: u32 = 10;
/// 接続取得のタイムアウト
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL 接続プールを作成する
///
/// アプリケーション起動時に一度だけ呼び出し、プールを共有する。
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// 埋め込みマイグレーションを適用する
///
/// 適用済みのものはスキップされる。sqlx が advisory lock を取るため、
/// 複数インスタンスから同時に呼び出してもよい。
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// `SELECT 1` で疎通を確認する（readiness check 用）
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
