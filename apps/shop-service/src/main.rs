//! # Shop Service サーバー
//!
//! ストアフロントのバックエンド API。
//!
//! ## 役割
//!
//! - **レビュー**: 投稿・一覧・投票台帳による「いいね / よくないね」
//! - **決済**: ホスト型決済ページのセッション作成と Webhook 受信
//! - **配送**: 追跡照会とラベル作成
//! - **通知**: 注文確認・新規注文・配送先不備のメール送信
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `SHOP_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `SHOP_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `PAYMENT_SECRET_KEY` | **Yes** | 決済プロバイダのシークレットキー |
//! | `PAYMENT_WEBHOOK_SECRET` | **Yes** | Webhook 署名シークレット |
//! | `NOTIFICATION_BACKEND` | No | `smtp` / `ses` / `noop`（デフォルト: `noop`） |
//! | `SHIPPING_BACKEND` | No | `stub` / `http`（デフォルト: `stub`） |
//!
//! 全項目は `config` モジュールを参照。
//!
//! ## 起動方法
//!
//! ```bash
//! cargo run -p storefront-shop-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use storefront_domain::clock::SystemClock;
use storefront_infra::{
    db,
    notification::{
        NoopNotificationSender,
        NotificationSender,
        SesNotificationSender,
        SmtpNotificationSender,
    },
    payment::StripePaymentGateway,
    repository::PostgresReviewRepository,
    shipping::{HttpShippingCarrier, ShippingCarrier, StubShippingCarrier},
};
use storefront_shared::observability::{TracingConfig, init_tracing};
use storefront_shop_service::{
    app::{AppDependencies, AppSettings, build_router},
    config::{NotificationBackend, NotificationConfig, ShippingConfig, ShopConfig},
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("shop-service"));

    let config = ShopConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Shop Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    db::run_migrations(&pool)
        .await
        .context("マイグレーションの適用に失敗しました")?;
    tracing::info!("データベースに接続しました");

    let notification_sender = build_notification_sender(&config.notification).await?;
    let shipping_carrier: Arc<dyn ShippingCarrier> = match &config.shipping {
        ShippingConfig::Stub => Arc::new(StubShippingCarrier::new()),
        ShippingConfig::Http(carrier) => Arc::new(HttpShippingCarrier::new(carrier.clone())),
    };

    let deps = AppDependencies {
        review_repository: Arc::new(PostgresReviewRepository::new(pool.clone())),
        payment_gateway:   Arc::new(StripePaymentGateway::new(config.payment.gateway.clone())),
        notification_sender,
        shipping_carrier,
        clock:             Arc::new(SystemClock),
        pool,
    };
    let app = build_router(deps, AppSettings::from(&config))
        .context("メールテンプレートの登録に失敗しました")?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Shop Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_notification_sender(
    config: &NotificationConfig,
) -> anyhow::Result<Arc<dyn NotificationSender>> {
    let sender: Arc<dyn NotificationSender> = match config.backend {
        NotificationBackend::Smtp => {
            tracing::info!(
                "通知: SMTP で送信します: {}:{}",
                config.smtp_host,
                config.smtp_port
            );
            Arc::new(
                SmtpNotificationSender::new(
                    &config.smtp_host,
                    config.smtp_port,
                    &config.from_address,
                )
                .context("SMTP 送信クライアントの初期化に失敗しました")?,
            )
        }
        NotificationBackend::Ses => {
            tracing::info!("通知: Amazon SES で送信します");
            Arc::new(SesNotificationSender::from_env(config.from_address.clone()).await)
        }
        NotificationBackend::Noop => {
            tracing::info!("通知: 送信しません（noop）");
            Arc::new(NoopNotificationSender)
        }
    };
    Ok(sender)
}
