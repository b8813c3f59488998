//! # 投票台帳（Vote Ledger）
//!
//! レビューの「役に立った / 役に立たなかった」投票の状態遷移を計算する純粋関数。
//!
//! ## 遷移表
//!
//! | 現在 \ 操作 | like | dislike | remove |
//! |---|---|---|---|
//! | なし | like, up+1 | dislike, down+1 | `NothingToRemove` |
//! | like | なし, up-1 | dislike, up-1 down+1 | なし, up-1 |
//! | dislike | like, down-1 up+1 | なし, down-1 | なし, down-1 |
//!
//! - トグル: 同じ投票をもう一度送ると取り消しになる
//! - スイッチ: 反対の投票を送るとカウントが移動する
//!
//! 呼び出し側が差分をカウンタに適用し、ユーザーの投票を設定または削除する。

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::DomainError;

/// ユーザーが投じている票
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Vote {
    Like,
    Dislike,
}

impl FromStr for Vote {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            _ => Err(DomainError::Validation(format!("不正な投票種別: {s}"))),
        }
    }
}

/// 投票リクエストの操作
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VoteAction {
    Like,
    Dislike,
    Remove,
}

impl FromStr for VoteAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            "remove" => Ok(Self::Remove),
            _ => Err(DomainError::Validation(format!("不正な投票操作: {s}"))),
        }
    }
}

/// 投票操作の失敗
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VoteError {
    /// 投票していないユーザーが取り消しを要求した
    #[error("取り消す投票がありません")]
    NothingToRemove,

    /// カウンタが [`MAX_COUNTER`](super::MAX_COUNTER) に達している
    #[error("カウンタが上限に達しています")]
    CounterLimitReached,
}

/// 1 回の投票操作による遷移結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    /// 操作後のユーザーの票（`None` は未投票）
    pub new_vote:          Option<Vote>,
    pub thumbs_up_delta:   i32,
    pub thumbs_down_delta: i32,
}

impl VoteTransition {
    const fn new(new_vote: Option<Vote>, thumbs_up_delta: i32, thumbs_down_delta: i32) -> Self {
        Self {
            new_vote,
            thumbs_up_delta,
            thumbs_down_delta,
        }
    }
}

/// 現在の票と操作から遷移を計算する
///
/// 副作用を持たない。未投票での `Remove` のみ失敗する。
pub fn apply_vote(current: Option<Vote>, action: VoteAction) -> Result<VoteTransition, VoteError> {
    use Vote::{Dislike, Like};

    let transition = match (current, action) {
        (None, VoteAction::Like) => VoteTransition::new(Some(Like), 1, 0),
        (None, VoteAction::Dislike) => VoteTransition::new(Some(Dislike), 0, 1),
        (None, VoteAction::Remove) => return Err(VoteError::NothingToRemove),

        (Some(Like), VoteAction::Like) => VoteTransition::new(None, -1, 0),
        (Some(Like), VoteAction::Dislike) => VoteTransition::new(Some(Dislike), -1, 1),
        (Some(Like), VoteAction::Remove) => VoteTransition::new(None, -1, 0),

        (Some(Dislike), VoteAction::Like) => VoteTransition::new(Some(Like), 1, -1),
        (Some(Dislike), VoteAction::Dislike) => VoteTransition::new(None, 0, -1),
        (Some(Dislike), VoteAction::Remove) => VoteTransition::new(None, 0, -1),
    };

    Ok(transition)
}
