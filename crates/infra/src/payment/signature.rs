//! Webhook 署名検証
//!
//! ヘッダ形式: `t=<unix 秒>,v1=<hex>[,v1=<hex>...]`
//! 署名対象: `"{t}.{生のリクエストボディ}"` を HMAC-SHA256 したもの。
//! 鍵ローテーション中は `v1` が複数並ぶため、いずれか 1 つが一致すればよい。

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// 署名ヘッダ名
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// タイムスタンプの許容誤差（秒）。過去・未来の両方向に適用する。
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// 署名検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("署名ヘッダがありません")]
    MissingHeader,

    #[error("署名ヘッダの形式が不正です")]
    MalformedHeader,

    #[error("署名のタイムスタンプが許容範囲外です")]
    TimestampOutOfTolerance,

    #[error("署名が一致しません")]
    Mismatch,
}

struct ParsedHeader {
    timestamp:  i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<ParsedHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader)?,
                );
            }
            // 16 進として読めない署名は一致し得ないので捨てる
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(ParsedHeader {
            timestamp,
            signatures,
        }),
        _ => Err(SignatureError::MalformedHeader),
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Webhook の署名を検証する
///
/// # Errors
///
/// - ヘッダがない: [`SignatureError::MissingHeader`]
/// - `t` または `v1` が読めない: [`SignatureError::MalformedHeader`]
/// - `now` との差が [`SIGNATURE_TOLERANCE_SECS`] を超える: [`SignatureError::TimestampOutOfTolerance`]
/// - どの `v1` とも一致しない: [`SignatureError::Mismatch`]
pub fn verify_webhook_signature(
    header: Option<&str>,
    payload: &[u8],
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;
    let parsed = parse_header(header)?;

    // 桁あふれする差も許容範囲外として扱う
    let within_tolerance = now
        .timestamp()
        .checked_sub(parsed.timestamp)
        .is_some_and(|diff| diff.unsigned_abs() <= SIGNATURE_TOLERANCE_SECS.unsigned_abs());
    if !within_tolerance {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let mac = mac_for(secret, parsed.timestamp, payload)?;
    // verify_slice は定数時間比較
    let matched = parsed
        .signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok());

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// 送信側と同じ手順で署名ヘッダ値を生成する
///
/// 結合テストやローカルでの Webhook 再送に使う。
pub fn sign_payload(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, SignatureError> {
    let signature = mac_for(secret, timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={timestamp},v1={}", hex::encode(signature)))
}
