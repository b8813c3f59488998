//! # テスト用モック
//!
//! ユースケースやハンドラのテストで使うインメモリ実装。
//! `test-utils` feature を有効にすると他クレートからも利用できる。
//!
//! ```toml
//! [dev-dependencies]
//! storefront-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use storefront_domain::{
    notification::{EmailMessage, NotificationError},
    review::{ProductName, Review, ReviewId},
    shipping::{LabelRequest, ShipmentLabel, TrackingInfo, TrackingNumber},
    value_objects::Version,
};

use crate::{
    error::InfraError,
    notification::NotificationSender,
    payment::{CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway},
    repository::ReviewRepository,
    shipping::{ShippingCarrier, ShippingError, StubShippingCarrier},
};

// ===== MockReviewRepository =====

/// インメモリの ReviewRepository
///
/// `update_with_version_check` は保存済みの版と比較し、PostgreSQL 実装と同じく
/// 不一致なら Conflict を返す。`find_by_id` は読み取り後に一度スケジューラへ
/// 制御を返すため、並行タスクの読み取りと書き込みが交互に走る。
#[derive(Clone, Default)]
pub struct MockReviewRepository {
    reviews:            Arc<Mutex<Vec<Review>>>,
    injected_conflicts: Arc<AtomicUsize>,
    version_conflicts:  Arc<AtomicUsize>,
}

impl MockReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_review(&self, review: Review) {
        self.reviews.lock().unwrap().push(review);
    }

    /// 次の `count` 回の更新を版に関係なく Conflict にする
    pub fn inject_conflicts(&self, count: usize) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn get(&self, id: &ReviewId) -> Option<Review> {
        self.reviews
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    /// 版の不一致で拒否した更新の回数（注入分は含まない）
    pub fn version_conflicts(&self) -> usize {
        self.version_conflicts.load(Ordering::SeqCst)
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// 新しい順（作成日時の降順、同時刻は ID の降順）
fn newest_first(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().as_uuid().cmp(a.id().as_uuid()))
    });
}

#[async_trait]
impl ReviewRepository for MockReviewRepository {
    async fn insert(&self, review: &Review) -> Result<(), InfraError> {
        self.reviews.lock().unwrap().push(review.clone());
        Ok(())
    }

    async fn update_with_version_check(
        &self,
        review: &Review,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        if self.take_injected_conflict() {
            return Err(InfraError::conflict("Review", review.id().to_string()));
        }

        let mut reviews = self.reviews.lock().unwrap();
        match reviews
            .iter()
            .position(|r| r.id() == review.id() && r.version() == expected_version)
        {
            Some(pos) => {
                reviews[pos] = review.clone();
                Ok(())
            }
            None => {
                self.version_conflicts.fetch_add(1, Ordering::SeqCst);
                Err(InfraError::conflict("Review", review.id().to_string()))
            }
        }
    }

    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, InfraError> {
        let found = self.get(id);
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn find_by_product(
        &self,
        product_name: &ProductName,
    ) -> Result<Vec<Review>, InfraError> {
        let mut found: Vec<Review> = self
            .reviews
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.product_name() == product_name)
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn find_all(&self) -> Result<Vec<Review>, InfraError> {
        let mut all = self.reviews.lock().unwrap().clone();
        newest_first(&mut all);
        Ok(all)
    }
}

// ===== MockNotificationSender =====

/// 送信したメールを記録する NotificationSender
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:    Arc<Mutex<Vec<EmailMessage>>>,
    failing: bool,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に SendFailed を返す
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        if self.failing {
            return Err(NotificationError::SendFailed(
                "モック送信失敗".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ===== MockPaymentGateway =====

/// 受け取ったリクエストを記録する PaymentGateway
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    requests: Arc<Mutex<Vec<CheckoutSessionRequest>>>,
    failing:  bool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常にプロバイダエラー（500）を返す
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.failing {
            return Err(PaymentError::Provider {
                status: 500,
                body:   "mock provider failure".to_string(),
            });
        }

        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("cs_test_mock_{}", requests.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.example.test/pay/{id}"),
            id,
        })
    }
}

// ===== MockShippingCarrier =====

#[derive(Clone, Copy, Default)]
enum CarrierMode {
    #[default]
    Stub,
    NotFound,
    Unavailable,
}

/// 応答モードを切り替えられる ShippingCarrier
///
/// 既定では [`StubShippingCarrier`] と同じ応答を返す。
#[derive(Clone, Default)]
pub struct MockShippingCarrier {
    stub: Arc<StubShippingCarrier>,
    mode: CarrierMode,
}

impl MockShippingCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追跡照会を常に NotFound にする
    pub fn not_found() -> Self {
        Self {
            mode: CarrierMode::NotFound,
            ..Self::default()
        }
    }

    /// すべての呼び出しを Network エラーにする
    pub fn unavailable() -> Self {
        Self {
            mode: CarrierMode::Unavailable,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ShippingCarrier for MockShippingCarrier {
    async fn track(&self, tracking_number: &TrackingNumber) -> Result<TrackingInfo, ShippingError> {
        match self.mode {
            CarrierMode::Stub => self.stub.track(tracking_number).await,
            CarrierMode::NotFound => Err(ShippingError::NotFound(tracking_number.to_string())),
            CarrierMode::Unavailable => Err(ShippingError::Network("connection refused".to_string())),
        }
    }

    async fn create_label(&self, request: &LabelRequest) -> Result<ShipmentLabel, ShippingError> {
        match self.mode {
            CarrierMode::Stub | CarrierMode::NotFound => self.stub.create_label(request).await,
            CarrierMode::Unavailable => Err(ShippingError::Network("connection refused".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use storefront_domain::review::{
        NewReview,
        Rating,
        ReviewContent,
        ReviewTitle,
        UserKey,
        VoteAction,
    };

    use super::*;

    fn review(product: &str, at: i64) -> Review {
        Review::new(NewReview {
            id:           ReviewId::new(),
            title:        ReviewTitle::new("タイトル").unwrap(),
            content:      ReviewContent::new("本文").unwrap(),
            rating:       Rating::new(4).unwrap(),
            product_name: ProductName::new(product).unwrap(),
            now:          DateTime::<Utc>::from_timestamp(at, 0).unwrap(),
        })
    }

    #[tokio::test]
    async fn test_古い版での更新はconflict() {
        let repo = MockReviewRepository::new();
        let original = review("傘", 1_700_000_000);
        repo.insert(&original).await.unwrap();
        let user = UserKey::new("u1").unwrap();
        let now = original.created_at();

        let first = original.vote(&user, VoteAction::Like, now).unwrap();
        repo.update_with_version_check(&first, original.version())
            .await
            .unwrap();

        let stale = original.vote(&user, VoteAction::Dislike, now).unwrap();
        let err = repo
            .update_with_version_check(&stale, original.version())
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(repo.get(original.id()).unwrap().thumbs_up(), 1);
    }

    #[tokio::test]
    async fn test_注入したconflictは指定回数だけ発生する() {
        let repo = MockReviewRepository::new();
        let original = review("傘", 1_700_000_000);
        repo.insert(&original).await.unwrap();
        repo.inject_conflicts(1);
        let updated = original
            .increment(storefront_domain::review::Vote::Like, original.created_at())
            .unwrap();

        assert!(
            repo.update_with_version_check(&updated, original.version())
                .await
                .is_err()
        );
        assert!(
            repo.update_with_version_check(&updated, original.version())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_商品名で絞り込み新しい順に返す() {
        let repo = MockReviewRepository::new();
        let old = review("傘", 1_700_000_000);
        let new = review("傘", 1_700_000_100);
        repo.add_review(old.clone());
        repo.add_review(review("長靴", 1_700_000_050));
        repo.add_review(new.clone());

        let found = repo
            .find_by_product(&ProductName::new("傘").unwrap())
            .await
            .unwrap();

        let ids: Vec<_> = found.iter().map(|r| r.id().clone()).collect();
        assert_eq!(ids, vec![new.id().clone(), old.id().clone()]);
    }
}
