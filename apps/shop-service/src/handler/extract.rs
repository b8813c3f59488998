//! # リクエスト抽出
//!
//! axum 標準の `Json` / `Path` を包み、抽出失敗を [`ShopError::BadRequest`] に
//! 変換する。これにより必須フィールドの欠落や不正な ID も RFC 9457 形式の
//! `validation-error` として返る。

use axum::{
    Json,
    extract::{
        FromRequest,
        FromRequestParts,
        Path,
        Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::request::Parts,
};

use crate::error::ShopError;

/// JSON ボディ
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ShopError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// パスパラメータ
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ShopError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}
