//! # Shop Service 設定
//!
//! 環境変数から Shop Service の設定を読み込む。
//!
//! 必須の変数が欠けている、または値が不正な場合は [`ConfigError`] を返す。
//! 起動処理（`main`）はこれを `anyhow` で包んで終了する。

use std::env;

use storefront_infra::{payment::StripeConfig, shipping::HttpCarrierConfig};
use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Shop Service の設定
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// データベース接続 URL
    pub database_url: String,
    pub payment:      PaymentConfig,
    pub notification: NotificationConfig,
    pub shipping:     ShippingConfig,
}

/// 決済の設定
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub gateway:        StripeConfig,
    /// Webhook 署名検証用のエンドポイントシークレット
    pub webhook_secret: String,
    /// ISO 4217 通貨コード（小文字）
    pub currency:       String,
}

/// 通知送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    Smtp,
    Ses,
    Noop,
}

/// 通知機能の設定
///
/// `NOTIFICATION_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `smtp`: Mailpit（開発）/ SMTP サーバー経由で送信
/// - `ses`: Amazon SES v2 経由で送信（本番）
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub backend:      NotificationBackend,
    pub smtp_host:    String,
    pub smtp_port:    u16,
    /// 送信元メールアドレス
    pub from_address: String,
    /// 新規注文や配送先不備の通知先
    pub owner_email:  String,
}

/// 配送キャリアの設定
#[derive(Debug, Clone)]
pub enum ShippingConfig {
    /// 外部通信を行わないスタブ
    Stub,
    Http(HttpCarrierConfig),
}

impl ShopConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let base_url = vars.or("STOREFRONT_BASE_URL", "http://localhost:5173");
        let base_url = base_url.trim_end_matches('/').to_string();

        let payment = PaymentConfig {
            gateway:        StripeConfig {
                api_base_url:      vars.or("PAYMENT_API_BASE_URL", "https://api.stripe.com"),
                secret_key:        vars.required("PAYMENT_SECRET_KEY")?,
                success_url:       vars
                    .get("CHECKOUT_SUCCESS_URL")
                    .unwrap_or_else(|| format!("{base_url}/checkout/success")),
                cancel_url:        vars
                    .get("CHECKOUT_CANCEL_URL")
                    .unwrap_or_else(|| format!("{base_url}/checkout/cancel")),
                allowed_countries: parse_countries(
                    &vars.or("PAYMENT_SHIPPING_COUNTRIES", "US,CA"),
                )?,
            },
            webhook_secret: vars.required("PAYMENT_WEBHOOK_SECRET")?,
            currency:       parse_currency(&vars.or("PAYMENT_CURRENCY", "usd"))?,
        };

        let notification = NotificationConfig {
            backend:      parse_notification_backend(&vars.or("NOTIFICATION_BACKEND", "noop"))?,
            smtp_host:    vars.or("SMTP_HOST", "localhost"),
            smtp_port:    vars.port_or("SMTP_PORT", 1025)?,
            from_address: vars.or("NOTIFICATION_FROM_ADDRESS", "noreply@storefront.example.com"),
            owner_email:  vars.or("STORE_OWNER_EMAIL", "owner@storefront.example.com"),
        };

        let shipping = match vars.or("SHIPPING_BACKEND", "stub").to_ascii_lowercase().as_str() {
            "stub" => ShippingConfig::Stub,
            "http" => ShippingConfig::Http(HttpCarrierConfig {
                api_base_url:   vars.required("SHIPPING_API_BASE_URL")?,
                client_id:      vars.required("SHIPPING_CLIENT_ID")?,
                client_secret:  vars.required("SHIPPING_CLIENT_SECRET")?,
                account_number: vars.required("SHIPPING_ACCOUNT_NUMBER")?,
            }),
            other => {
                return Err(ConfigError::Invalid {
                    name:  "SHIPPING_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            host: vars.or("SHOP_HOST", "0.0.0.0"),
            port: vars.port("SHOP_PORT")?,
            database_url: vars.required("DATABASE_URL")?,
            payment,
            notification,
            shipping,
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn port(&self, name: &'static str) -> Result<u16, ConfigError> {
        let value = self.required(name)?;
        parse_port(name, value)
    }

    fn port_or(&self, name: &'static str, default: u16) -> Result<u16, ConfigError> {
        match self.get(name) {
            Some(value) => parse_port(name, value),
            None => Ok(default),
        }
    }
}

fn parse_port(name: &'static str, value: String) -> Result<u16, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_notification_backend(value: &str) -> Result<NotificationBackend, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "smtp" => Ok(NotificationBackend::Smtp),
        "ses" => Ok(NotificationBackend::Ses),
        "noop" => Ok(NotificationBackend::Noop),
        _ => Err(ConfigError::Invalid {
            name:  "NOTIFICATION_BACKEND",
            value: value.to_string(),
        }),
    }
}

/// 3 文字の英字のみ受け付け、小文字に正規化する
fn parse_currency(value: &str) -> Result<String, ConfigError> {
    if value.len() == 3 && value.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(value.to_ascii_lowercase())
    } else {
        Err(ConfigError::Invalid {
            name:  "PAYMENT_CURRENCY",
            value: value.to_string(),
        })
    }
}

/// カンマ区切りの国コードを大文字に正規化する
fn parse_countries(value: &str) -> Result<Vec<String>, ConfigError> {
    let countries: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();

    let valid = !countries.is_empty()
        && countries
            .iter()
            .all(|c| c.len() == 2 && c.chars().all(|ch| ch.is_ascii_alphabetic()));

    if valid {
        Ok(countries)
    } else {
        Err(ConfigError::Invalid {
            name:  "PAYMENT_SHIPPING_COUNTRIES",
            value: value.to_string(),
        })
    }
}
