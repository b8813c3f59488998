//! # レビュー
//!
//! 商品レビューと、その「役に立った」投票を管理する。
//!
//! カウンタの更新経路は 2 つある:
//!
//! - [`Review::vote`]: 投票台帳（[`apply_vote`]）を通した監査付き投票。
//!   ユーザーごとの票を記録し、トグルとスイッチを扱う
//! - [`Review::increment`]: ユーザーを記録しない直接加算。重複防止もトグルもない
//!
//! 台帳経由でのみ更新されたレビューでは
//! `thumbs_up == like の票数` かつ `thumbs_down == dislike の票数` が成り立つ。
//! 直接加算はカウンタだけを増やすため、カウンタが票数を下回ることはない。
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use storefront_domain::review::{
//!     NewReview, ProductName, Rating, Review, ReviewContent, ReviewId, ReviewTitle, UserKey,
//!     VoteAction,
//! };
//!
//! let now = chrono::Utc::now();
//! let review = Review::new(NewReview {
//!     id: ReviewId::new(),
//!     title: ReviewTitle::new("よく切れる")?,
//!     content: ReviewContent::new("トマトが潰れずに切れます")?,
//!     rating: Rating::new(5)?,
//!     product_name: ProductName::new("三徳包丁")?,
//!     now,
//! });
//!
//! let voted = review.vote(&UserKey::new("u1")?, VoteAction::Like, now)?;
//! assert_eq!(voted.thumbs_up(), 1);
//! # Ok(())
//! # }
//! ```

mod vote;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use vote::*;

use crate::{DomainError, value_objects::Version};

/// カウンタの上限（PostgreSQL の INTEGER 列に収まる値）
pub const MAX_COUNTER: u32 = i32::MAX as u32;

define_uuid_id! {
    /// レビューの一意識別子
    pub struct ReviewId;
}

define_validated_string! {
    /// レビュータイトル（1〜200 文字）
    pub struct ReviewTitle {
        label: "タイトル",
        max_length: 200,
    }
}

define_validated_string! {
    /// レビュー本文（1〜5000 文字）
    pub struct ReviewContent {
        label: "本文",
        max_length: 5000,
    }
}

define_validated_string! {
    /// レビュー対象の商品名（1〜200 文字）
    pub struct ProductName {
        label: "商品名",
        max_length: 200,
    }
}

define_validated_string! {
    /// 投票者を識別するキー（1〜128 文字）
    ///
    /// 認証基盤を持たないため、クライアントが送る不透明な文字列をそのまま使う。
    pub struct UserKey {
        label: "ユーザー ID",
        max_length: 128,
    }
}

/// 評価の最小値
pub const MIN_RATING: i64 = 1;
/// 評価の最大値
pub const MAX_RATING: i64 = 5;

/// 星の数による評価（1〜5 の整数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(DomainError::Validation(format!(
                "評価は {MIN_RATING} 以上 {MAX_RATING} 以下の整数である必要があります"
            )));
        }
        // 範囲チェック済み
        Ok(Self(value as u8))
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

// =========================================================================
// Review（レビューエンティティ）
// =========================================================================

/// 商品レビュー
///
/// 作成後はカウンタとユーザー票（と `version`, `updated_at`）以外は変更されない。
///
/// ## 楽観的ロック
///
/// 更新メソッドは `version` を 1 つ進めた新しいインスタンスを返す。
/// 保存時は更新前の `version` を期待値としてリポジトリに渡す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    id:           ReviewId,
    title:        ReviewTitle,
    content:      ReviewContent,
    rating:       Rating,
    product_name: ProductName,
    thumbs_up:    u32,
    thumbs_down:  u32,
    user_votes:   BTreeMap<UserKey, Vote>,
    version:      Version,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

/// レビューの新規作成パラメータ
pub struct NewReview {
    pub id:           ReviewId,
    pub title:        ReviewTitle,
    pub content:      ReviewContent,
    pub rating:       Rating,
    pub product_name: ProductName,
    pub now:          DateTime<Utc>,
}

/// レビューの DB 復元パラメータ
pub struct ReviewRecord {
    pub id:           ReviewId,
    pub title:        ReviewTitle,
    pub content:      ReviewContent,
    pub rating:       Rating,
    pub product_name: ProductName,
    pub thumbs_up:    u32,
    pub thumbs_down:  u32,
    pub user_votes:   BTreeMap<UserKey, Vote>,
    pub version:      Version,
    pub created_at:   DateTime<Utc>,
    pub updated_at:   DateTime<Utc>,
}

impl Review {
    /// カウンタ 0、票なしのレビューを作成する
    pub fn new(params: NewReview) -> Self {
        Self {
            id:           params.id,
            title:        params.title,
            content:      params.content,
            rating:       params.rating,
            product_name: params.product_name,
            thumbs_up:    0,
            thumbs_down:  0,
            user_votes:   BTreeMap::new(),
            version:      Version::initial(),
            created_at:   params.now,
            updated_at:   params.now,
        }
    }

    /// 永続化された状態から復元する
    ///
    /// # Errors
    ///
    /// カウンタが記録済みの票数を下回る場合は `DomainError::Validation`。
    /// この状態から取り消しを行うとカウンタが負になるため受け付けない。
    pub fn from_db(record: ReviewRecord) -> Result<Self, DomainError> {
        let likes = count_votes(&record.user_votes, Vote::Like);
        let dislikes = count_votes(&record.user_votes, Vote::Dislike);
        if record.thumbs_up < likes || record.thumbs_down < dislikes {
            return Err(DomainError::Validation(format!(
                "レビュー {} のカウンタが票数を下回っています",
                record.id
            )));
        }

        Ok(Self {
            id:           record.id,
            title:        record.title,
            content:      record.content,
            rating:       record.rating,
            product_name: record.product_name,
            thumbs_up:    record.thumbs_up,
            thumbs_down:  record.thumbs_down,
            user_votes:   record.user_votes,
            version:      record.version,
            created_at:   record.created_at,
            updated_at:   record.updated_at,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &ReviewId {
        &self.id
    }

    pub fn title(&self) -> &ReviewTitle {
        &self.title
    }

    pub fn content(&self) -> &ReviewContent {
        &self.content
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn product_name(&self) -> &ProductName {
        &self.product_name
    }

    pub fn thumbs_up(&self) -> u32 {
        self.thumbs_up
    }

    pub fn thumbs_down(&self) -> u32 {
        self.thumbs_down
    }

    pub fn user_votes(&self) -> &BTreeMap<UserKey, Vote> {
        &self.user_votes
    }

    /// 指定ユーザーの現在の票
    pub fn vote_of(&self, user: &UserKey) -> Option<Vote> {
        self.user_votes.get(user).copied()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// 投票台帳を通して投票を適用した新しいレビューを返す
    ///
    /// # Errors
    ///
    /// - 未投票ユーザーの `Remove`: [`VoteError::NothingToRemove`]
    /// - 加算先のカウンタが [`MAX_COUNTER`]: [`VoteError::CounterLimitReached`]
    ///
    /// いずれの場合も自身は変更されない。
    pub fn vote(
        &self,
        user: &UserKey,
        action: VoteAction,
        now: DateTime<Utc>,
    ) -> Result<Self, VoteError> {
        let transition = apply_vote(self.vote_of(user), action)?;

        let mut user_votes = self.user_votes.clone();
        match transition.new_vote {
            Some(vote) => {
                user_votes.insert(user.clone(), vote);
            }
            None => {
                user_votes.remove(user);
            }
        }

        Ok(Self {
            thumbs_up: apply_delta(self.thumbs_up, transition.thumbs_up_delta)?,
            thumbs_down: apply_delta(self.thumbs_down, transition.thumbs_down_delta)?,
            user_votes,
            version: self.version.next(),
            updated_at: now,
            ..self.clone()
        })
    }

    /// ユーザーを記録せずにカウンタを 1 つ増やした新しいレビューを返す
    ///
    /// # Errors
    ///
    /// 対象のカウンタが [`MAX_COUNTER`] なら [`VoteError::CounterLimitReached`]。
    pub fn increment(&self, vote: Vote, now: DateTime<Utc>) -> Result<Self, VoteError> {
        let (thumbs_up, thumbs_down) = match vote {
            Vote::Like => (apply_delta(self.thumbs_up, 1)?, self.thumbs_down),
            Vote::Dislike => (self.thumbs_up, apply_delta(self.thumbs_down, 1)?),
        };

        Ok(Self {
            thumbs_up,
            thumbs_down,
            version: self.version.next(),
            updated_at: now,
            ..self.clone()
        })
    }
}

fn count_votes(votes: &BTreeMap<UserKey, Vote>, target: Vote) -> u32 {
    let count = votes.values().filter(|v| **v == target).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// カウンタ >= 票数が保たれている限り 0 未満にはならない
/// 減算は 0 で止め、加算は [`MAX_COUNTER`] を超えさせない
fn apply_delta(counter: u32, delta: i32) -> Result<u32, VoteError> {
    let next = counter.saturating_add_signed(delta);
    if delta > 0 && next > MAX_COUNTER {
        return Err(VoteError::CounterLimitReached);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[fixture]
    fn review(now: DateTime<Utc>) -> Review {
        Review::new(NewReview {
            id: ReviewId::new(),
            title: ReviewTitle::new("使いやすい").unwrap(),
            content: ReviewContent::new("毎日使っています").unwrap(),
            rating: Rating::new(4).unwrap(),
            product_name: ProductName::new("ステンレスケトル").unwrap(),
            now,
        })
    }

    fn user(key: &str) -> UserKey {
        UserKey::new(key).unwrap()
    }

    /// 台帳の不変条件（カウンタ == 票数）を検証する
    fn assert_ledger_invariant(review: &Review) {
        assert_eq!(
            review.thumbs_up(),
            count_votes(review.user_votes(), Vote::Like)
        );
        assert_eq!(
            review.thumbs_down(),
            count_votes(review.user_votes(), Vote::Dislike)
        );
    }

    fn record_from(review: &Review) -> ReviewRecord {
        ReviewRecord {
            id:           review.id().clone(),
            title:        review.title().clone(),
            content:      review.content().clone(),
            rating:       review.rating(),
            product_name: review.product_name().clone(),
            thumbs_up:    review.thumbs_up(),
            thumbs_down:  review.thumbs_down(),
            user_votes:   review.user_votes().clone(),
            version:      review.version(),
            created_at:   review.created_at(),
            updated_at:   review.updated_at(),
        }
    }

    #[rstest]
    fn test_新規作成の初期状態(review: Review, now: DateTime<Utc>) {
        assert_eq!(review.thumbs_up(), 0);
        assert_eq!(review.thumbs_down(), 0);
        assert!(review.user_votes().is_empty());
        assert_eq!(review.version(), Version::initial());
        assert_eq!(review.created_at(), now);
        assert_eq!(review.updated_at(), now);
    }

    #[rstest]
    fn test_シナリオ_like_dislike_remove_remove(review: Review, now: DateTime<Utc>) {
        let later = now + chrono::Duration::seconds(10);
        let u1 = user("u1");

        let s1 = review.vote(&u1, VoteAction::Like, later).unwrap();
        assert_eq!((s1.thumbs_up(), s1.thumbs_down()), (1, 0));
        assert_eq!(s1.vote_of(&u1), Some(Vote::Like));
        assert_eq!(s1.updated_at(), later);
        assert_eq!(s1.version().as_u32(), 2);

        let s2 = s1.vote(&u1, VoteAction::Dislike, later).unwrap();
        assert_eq!((s2.thumbs_up(), s2.thumbs_down()), (0, 1));
        assert_eq!(s2.vote_of(&u1), Some(Vote::Dislike));

        let s3 = s2.vote(&u1, VoteAction::Remove, later).unwrap();
        assert_eq!((s3.thumbs_up(), s3.thumbs_down()), (0, 0));
        assert_eq!(s3.vote_of(&u1), None);

        let err = s3.vote(&u1, VoteAction::Remove, later).unwrap_err();
        assert_eq!(err, VoteError::NothingToRemove);
        assert_eq!((s3.thumbs_up(), s3.thumbs_down()), (0, 0));
    }

    #[rstest]
    fn test_2回目のremoveは失敗し状態は変わらない(review: Review, now: DateTime<Utc>) {
        let u1 = user("u1");
        let voted = review.vote(&u1, VoteAction::Dislike, now).unwrap();
        let removed = voted.vote(&u1, VoteAction::Remove, now).unwrap();
        let before = removed.clone();

        let result = removed.vote(&u1, VoteAction::Remove, now);

        assert_eq!(result, Err(VoteError::NothingToRemove));
        assert_eq!(removed, before);
    }

    #[rstest]
    fn test_任意の操作列の後も不変条件が保たれる(review: Review, now: DateTime<Utc>) {
        let users = ["u1", "u2", "u3"].map(user);
        let actions = [
            VoteAction::Like,
            VoteAction::Dislike,
            VoteAction::Remove,
            VoteAction::Like,
            VoteAction::Like,
            VoteAction::Dislike,
            VoteAction::Remove,
        ];

        let mut current = review;
        for (step, action) in actions.iter().cycle().take(60).enumerate() {
            let u = &users[step % users.len()];
            if let Ok(next) = current.vote(u, *action, now) {
                current = next;
            }
            assert_ledger_invariant(&current);
        }
    }

    #[rstest]
    fn test_複数ユーザーの票は独立して集計される(review: Review, now: DateTime<Utc>) {
        let sut = review
            .vote(&user("a"), VoteAction::Like, now)
            .and_then(|r| r.vote(&user("b"), VoteAction::Like, now))
            .and_then(|r| r.vote(&user("c"), VoteAction::Dislike, now))
            .unwrap();

        assert_eq!((sut.thumbs_up(), sut.thumbs_down()), (2, 1));
        assert_ledger_invariant(&sut);
    }

    #[rstest]
    fn test_直接加算は票を記録せず重複も許す(review: Review, now: DateTime<Utc>) {
        let sut = review
            .increment(Vote::Like, now)
            .and_then(|r| r.increment(Vote::Like, now))
            .and_then(|r| r.increment(Vote::Dislike, now))
            .unwrap();

        assert_eq!((sut.thumbs_up(), sut.thumbs_down()), (2, 1));
        assert!(sut.user_votes().is_empty());
    }

    #[rstest]
    fn test_直接加算後の取り消しでもカウンタは負にならない(review: Review, now: DateTime<Utc>) {
        let u1 = user("u1");
        let sut = review
            .increment(Vote::Dislike, now)
            .and_then(|r| r.vote(&u1, VoteAction::Like, now))
            .and_then(|r| r.vote(&u1, VoteAction::Remove, now))
            .unwrap();

        assert_eq!((sut.thumbs_up(), sut.thumbs_down()), (0, 1));
    }

    fn at_counter_limit(review: &Review) -> Review {
        Review::from_db(ReviewRecord {
            thumbs_up: MAX_COUNTER,
            ..record_from(review)
        })
        .unwrap()
    }

    #[rstest]
    fn test_上限のカウンタへの直接加算は拒否される(review: Review, now: DateTime<Utc>) {
        let full = at_counter_limit(&review);

        assert_eq!(
            full.increment(Vote::Like, now),
            Err(VoteError::CounterLimitReached)
        );
        assert_eq!(full.increment(Vote::Dislike, now).unwrap().thumbs_down(), 1);
    }

    #[rstest]
    fn test_上限のカウンタへの投票は拒否されdislikeは通る(
        review: Review,
        now: DateTime<Utc>,
    ) {
        let full = at_counter_limit(&review);

        assert_eq!(
            full.vote(&user("u1"), VoteAction::Like, now),
            Err(VoteError::CounterLimitReached)
        );
        let disliked = full.vote(&user("u1"), VoteAction::Dislike, now).unwrap();
        assert_eq!(disliked.thumbs_up(), MAX_COUNTER);
    }

    #[rstest]
    fn test_from_dbで元の状態に復元できる(review: Review, now: DateTime<Utc>) {
        let voted = review.vote(&user("u1"), VoteAction::Like, now).unwrap();

        let restored = Review::from_db(record_from(&voted)).unwrap();

        assert_eq!(restored, voted);
    }

    #[rstest]
    fn test_from_dbはカウンタが票数を下回る状態を拒否する(review: Review, now: DateTime<Utc>) {
        let voted = review.vote(&user("u1"), VoteAction::Like, now).unwrap();

        let result = Review::from_db(ReviewRecord {
            thumbs_up: 0,
            ..record_from(&voted)
        });

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[rstest]
    #[case(0)]
    #[case(6)]
    #[case(-3)]
    fn test_範囲外の評価は拒否される(#[case] value: i64) {
        assert!(Rating::new(value).is_err());
    }

    #[rstest]
    #[case(1)]
    #[case(5)]
    fn test_範囲内の評価は受け付ける(#[case] value: i64) {
        assert_eq!(i64::from(Rating::new(value).unwrap().as_u8()), value);
    }

    #[test]
    fn test_タイトルは200文字まで() {
        assert!(ReviewTitle::new("あ".repeat(200)).is_ok());
        assert!(ReviewTitle::new("あ".repeat(201)).is_err());
        assert!(ReviewTitle::new("   ").is_err());
    }

    #[test]
    fn test_ユーザーキーは128文字まで() {
        assert!(UserKey::new("u".repeat(128)).is_ok());
        assert!(UserKey::new("u".repeat(129)).is_err());
    }
}
