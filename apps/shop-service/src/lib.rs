//! # Shop Service ライブラリ
//!
//! ルーター、設定、ハンドラ、ユースケースを公開する。
//! ルーターテスト（`tests/`）から [`app::build_router`] を直接呼び出す。

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
