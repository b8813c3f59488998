//! # レビューユースケース
//!
//! レビューの投稿・取得と、2 種類のカウンタ更新を扱う。
//!
//! - [`ReviewUseCaseImpl::vote`]: 投票台帳を通した監査付き投票
//! - [`ReviewUseCaseImpl::increment`]: ユーザーを記録しない直接加算
//!
//! どちらも「読み込み → 適用 → 版チェック付き保存」を最大
//! [`MAX_UPDATE_ATTEMPTS`] 回まで繰り返す。上限に達した場合は Conflict を返す。

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use storefront_domain::{
    clock::Clock,
    review::{
        NewReview,
        ProductName,
        Rating,
        Review,
        ReviewContent,
        ReviewId,
        ReviewTitle,
        UserKey,
        Vote,
        VoteAction,
    },
};
use storefront_infra::repository::ReviewRepository;
use storefront_shared::{event_log::event, log_business_event};

use crate::error::ShopError;

/// 楽観的ロック競合時の試行回数の上限
pub const MAX_UPDATE_ATTEMPTS: usize = 3;

/// レビュー投稿の入力
pub struct CreateReviewInput {
    pub title:        String,
    pub content:      String,
    pub rating:       i64,
    pub product_name: String,
}

/// 投票の入力
///
/// `action` は `like` / `dislike` / `remove` のいずれか。
pub struct VoteInput {
    pub review_id: ReviewId,
    pub user_id:   String,
    pub action:    String,
}

/// 直接加算の入力
///
/// `vote_type` は `like` / `dislike` のいずれか。
pub struct IncrementInput {
    pub review_id: ReviewId,
    pub vote_type: String,
}

/// レビューユースケース
pub struct ReviewUseCaseImpl {
    review_repository: Arc<dyn ReviewRepository>,
    clock:             Arc<dyn Clock>,
}

impl ReviewUseCaseImpl {
    pub fn new(review_repository: Arc<dyn ReviewRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            review_repository,
            clock,
        }
    }

    /// レビューを投稿する
    pub async fn create_review(&self, input: CreateReviewInput) -> Result<Review, ShopError> {
        let review = Review::new(NewReview {
            id:           ReviewId::new(),
            title:        ReviewTitle::new(input.title)?,
            content:      ReviewContent::new(input.content)?,
            rating:       Rating::new(input.rating)?,
            product_name: ProductName::new(input.product_name)?,
            now:          self.clock.now(),
        });

        self.review_repository.insert(&review).await?;

        log_business_event!(
            event.category = event::category::REVIEW,
            event.action = event::action::REVIEW_CREATED,
            event.entity_type = event::entity_type::REVIEW,
            event.entity_id = %review.id(),
            event.result = event::result::SUCCESS,
            review.product_name = %review.product_name(),
            review.rating = review.rating().as_u8(),
            "レビューが投稿されました"
        );

        Ok(review)
    }

    pub async fn get_review(&self, review_id: &ReviewId) -> Result<Review, ShopError> {
        self.review_repository
            .find_by_id(review_id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("レビューが見つかりません: {review_id}")))
    }

    /// レビューを新しい順に一覧する
    ///
    /// `product_name` を指定すると完全一致で絞り込む。
    pub async fn list_reviews(&self, product_name: Option<String>) -> Result<Vec<Review>, ShopError> {
        let reviews = match product_name {
            Some(name) => {
                let name = ProductName::new(name)?;
                self.review_repository.find_by_product(&name).await?
            }
            None => self.review_repository.find_all().await?,
        };
        Ok(reviews)
    }

    /// 投票台帳を通して投票する
    ///
    /// 操作名とユーザーキーはレビューを読み込む前に検証する。
    /// 不正な値の場合は何も変更しない。
    pub async fn vote(&self, input: VoteInput) -> Result<Review, ShopError> {
        let action = VoteAction::from_str(&input.action)?;
        let user = UserKey::new(input.user_id)?;

        let review = self
            .update_with_retry(&input.review_id, |review, now| {
                Ok(review.vote(&user, action, now)?)
            })
            .await?;

        log_business_event!(
            event.category = event::category::REVIEW,
            event.action = event::action::REVIEW_VOTED,
            event.entity_type = event::entity_type::REVIEW,
            event.entity_id = %review.id(),
            event.result = event::result::SUCCESS,
            vote.action = %action,
            vote.user = %user,
            review.thumbs_up = review.thumbs_up(),
            review.thumbs_down = review.thumbs_down(),
            "レビューに投票しました"
        );

        Ok(review)
    }

    /// カウンタを直接加算する
    ///
    /// ユーザーごとの票は記録しないため、同じ利用者が何度でも加算できる。
    pub async fn increment(&self, input: IncrementInput) -> Result<Review, ShopError> {
        let vote = Vote::from_str(&input.vote_type)?;

        let review = self
            .update_with_retry(&input.review_id, |review, now| {
                Ok(review.increment(vote, now)?)
            })
            .await?;

        log_business_event!(
            event.category = event::category::REVIEW,
            event.action = event::action::REVIEW_INCREMENTED,
            event.entity_type = event::entity_type::REVIEW,
            event.entity_id = %review.id(),
            event.result = event::result::SUCCESS,
            vote.vote_type = %vote,
            review.thumbs_up = review.thumbs_up(),
            review.thumbs_down = review.thumbs_down(),
            "レビューのカウンタを加算しました"
        );

        Ok(review)
    }

    /// 読み込み → 適用 → 版チェック付き保存を競合がなくなるまで繰り返す
    async fn update_with_retry<F>(&self, review_id: &ReviewId, apply: F) -> Result<Review, ShopError>
    where
        F: Fn(&Review, DateTime<Utc>) -> Result<Review, ShopError>,
    {
        let mut attempt = 1;
        loop {
            let current = self.get_review(review_id).await?;
            let updated = apply(&current, self.clock.now())?;

            match self
                .review_repository
                .update_with_version_check(&updated, current.version())
                .await
            {
                Ok(()) => return Ok(updated),
                Err(e) if e.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => {
                    tracing::debug!(
                        review_id = %review_id,
                        attempt,
                        "版の競合を検知したため再試行します"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use storefront_domain::clock::FixedClock;
    use storefront_infra::mock::MockReviewRepository;

    use super::*;

    struct Fixture {
        repo:      MockReviewRepository,
        sut:       ReviewUseCaseImpl,
        review_id: ReviewId,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let repo = MockReviewRepository::new();
        let review = Review::new(NewReview {
            id:           ReviewId::new(),
            title:        ReviewTitle::new("静かで速い").unwrap(),
            content:      ReviewContent::new("深夜でも気にならない音量です").unwrap(),
            rating:       Rating::new(4).unwrap(),
            product_name: ProductName::new("電気ケトル").unwrap(),
            now,
        });
        let review_id = review.id().clone();
        repo.add_review(review);

        let sut = ReviewUseCaseImpl::new(Arc::new(repo.clone()), Arc::new(FixedClock::new(now)));
        Fixture {
            repo,
            sut,
            review_id,
        }
    }

    fn vote_input(f: &Fixture, user: &str, action: &str) -> VoteInput {
        VoteInput {
            review_id: f.review_id.clone(),
            user_id:   user.to_string(),
            action:    action.to_string(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_u1のlike_dislike_remove_removeの遷移(fixture: Fixture) {
        let f = fixture;
        let u1 = UserKey::new("u1").unwrap();

        let r = f.sut.vote(vote_input(&f, "u1", "like")).await.unwrap();
        assert_eq!((r.thumbs_up(), r.thumbs_down(), r.vote_of(&u1)), (1, 0, Some(Vote::Like)));

        let r = f.sut.vote(vote_input(&f, "u1", "dislike")).await.unwrap();
        assert_eq!(
            (r.thumbs_up(), r.thumbs_down(), r.vote_of(&u1)),
            (0, 1, Some(Vote::Dislike))
        );

        let r = f.sut.vote(vote_input(&f, "u1", "remove")).await.unwrap();
        assert_eq!((r.thumbs_up(), r.thumbs_down(), r.vote_of(&u1)), (0, 0, None));

        let err = f.sut.vote(vote_input(&f, "u1", "remove")).await.unwrap_err();
        assert!(matches!(err, ShopError::NothingToRemove));

        let stored = f.repo.get(&f.review_id).unwrap();
        assert_eq!((stored.thumbs_up(), stored.thumbs_down()), (0, 0));
        assert!(stored.user_votes().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_不正な操作名は400で何も変更しない(fixture: Fixture) {
        let f = fixture;
        let before = f.repo.get(&f.review_id).unwrap();

        let err = f.sut.vote(vote_input(&f, "u1", "upvote")).await.unwrap_err();

        assert!(matches!(err, ShopError::BadRequest(_)));
        assert_eq!(f.repo.get(&f.review_id).unwrap(), before);
    }

    #[rstest]
    #[tokio::test]
    async fn test_存在しないレビューへの投票は404(fixture: Fixture) {
        let f = fixture;
        let input = VoteInput {
            review_id: ReviewId::new(),
            user_id:   "u1".to_string(),
            action:    "like".to_string(),
        };

        assert!(matches!(f.sut.vote(input).await, Err(ShopError::NotFound(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_競合は上限未満なら再試行して成功する(fixture: Fixture) {
        let f = fixture;
        f.repo.inject_conflicts(MAX_UPDATE_ATTEMPTS - 1);

        let review = f.sut.vote(vote_input(&f, "u1", "like")).await.unwrap();

        assert_eq!(review.thumbs_up(), 1);
        assert_eq!(f.repo.get(&f.review_id).unwrap().thumbs_up(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_競合が上限回続くとconflict(fixture: Fixture) {
        let f = fixture;
        f.repo.inject_conflicts(MAX_UPDATE_ATTEMPTS);

        let err = f.sut.vote(vote_input(&f, "u1", "like")).await.unwrap_err();

        assert!(matches!(err, ShopError::Conflict(_)));
        assert_eq!(f.repo.get(&f.review_id).unwrap().thumbs_up(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_読み取り後に先を越された投票は再試行で数えられる(fixture: Fixture) {
        let f = fixture;
        let sut = Arc::new(f.sut);

        let handles: Vec<_> = ["u1", "u2"]
            .into_iter()
            .map(|user| {
                let sut = Arc::clone(&sut);
                let input = VoteInput {
                    review_id: f.review_id.clone(),
                    user_id:   user.to_string(),
                    action:    "like".to_string(),
                };
                tokio::spawn(async move { sut.vote(input).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // 2 件目の保存は 1 件目に版を進められて一度拒否される
        assert!(f.repo.version_conflicts() >= 1);
        let stored = f.repo.get(&f.review_id).unwrap();
        assert_eq!(stored.thumbs_up(), 2);
        assert_eq!(stored.user_votes().len(), 2);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_同時likeは更新を失わず負けた投票はconflictになる(fixture: Fixture) {
        const VOTERS: usize = 25;
        let f = fixture;
        let sut = Arc::new(f.sut);

        let handles: Vec<_> = (0..VOTERS)
            .map(|i| {
                let sut = Arc::clone(&sut);
                let input = VoteInput {
                    review_id: f.review_id.clone(),
                    user_id:   format!("user-{i}"),
                    action:    "like".to_string(),
                };
                tokio::spawn(async move { sut.vote(input).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(ShopError::Conflict(_)) => {}
                Err(other) => panic!("想定外のエラー: {other:?}"),
            }
        }

        let stored = f.repo.get(&f.review_id).unwrap();
        assert!(accepted >= 1);
        assert_eq!(stored.thumbs_up() as usize, accepted);
        assert_eq!(stored.user_votes().len(), accepted);
        assert_eq!(stored.version().as_u32() as usize, accepted + 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_直接加算は同じ種別を何度でも加算する(fixture: Fixture) {
        let f = fixture;
        let input = || IncrementInput {
            review_id: f.review_id.clone(),
            vote_type: "dislike".to_string(),
        };

        f.sut.increment(input()).await.unwrap();
        let review = f.sut.increment(input()).await.unwrap();

        assert_eq!((review.thumbs_up(), review.thumbs_down()), (0, 2));
        assert!(review.user_votes().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_直接加算でremoveは受け付けない(fixture: Fixture) {
        let f = fixture;
        let input = IncrementInput {
            review_id: f.review_id.clone(),
            vote_type: "remove".to_string(),
        };

        assert!(matches!(f.sut.increment(input).await, Err(ShopError::BadRequest(_))));
    }

    #[rstest]
    #[case(0)]
    #[case(6)]
    #[tokio::test]
    async fn test_評価が範囲外なら投稿できない(fixture: Fixture, #[case] rating: i64) {
        let input = CreateReviewInput {
            title: "タイトル".to_string(),
            content: "本文".to_string(),
            rating,
            product_name: "電気ケトル".to_string(),
        };

        assert!(matches!(
            fixture.sut.create_review(input).await,
            Err(ShopError::BadRequest(_))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_投稿したレビューは商品名で一覧できる(fixture: Fixture) {
        let f = fixture;
        let created = f
            .sut
            .create_review(CreateReviewInput {
                title:        "  注ぎやすい  ".to_string(),
                content:      "細口なのでドリップに向いています".to_string(),
                rating:       5,
                product_name: "電気ケトル".to_string(),
            })
            .await
            .unwrap();

        let listed = f
            .sut
            .list_reviews(Some("電気ケトル".to_string()))
            .await
            .unwrap();
        let other = f.sut.list_reviews(Some("トースター".to_string())).await.unwrap();

        assert_eq!(created.title().as_str(), "注ぎやすい");
        assert_eq!(created.thumbs_up(), 0);
        assert_eq!(listed.len(), 2);
        assert!(other.is_empty());
    }
}
