//! # リポジトリ実装
//!
//! 永続化の操作をトレイトで定義し、PostgreSQL 実装を提供する。
//! ユースケースは `Arc<dyn ReviewRepository>` 経由で利用するため、
//! テストではインメモリのモック（`mock` モジュール）に差し替えられる。

pub mod review_repository;

pub use review_repository::{PostgresReviewRepository, ReviewRepository};
