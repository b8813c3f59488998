//! # 共通値オブジェクト
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`Version`] | `u32` | 楽観的ロック用のバージョン番号 |
//! | [`EmailAddress`] | `String` | メールアドレス（通知先、購入者） |

use serde::{Deserialize, Serialize};

use crate::DomainError;

// =========================================================================
// Version（バージョン番号）
// =========================================================================

/// バージョン番号（値オブジェクト）
///
/// 1 から始まり、永続化される更新のたびにインクリメントされる。
///
/// ```rust
/// use storefront_domain::value_objects::Version;
///
/// let v1 = Version::initial();
/// assert_eq!(v1.next().as_u32(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u32);

impl Version {
    pub fn initial() -> Self {
        Self(1)
    }

    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::Validation(
                "バージョン番号は 1 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// 次のバージョンを返す（DB の INTEGER 上限で飽和する）
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1).min(i32::MAX as u32))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// DB 互換の i32 に変換する
    pub fn as_i32(&self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl TryFrom<i32> for Version {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| {
                DomainError::Validation("バージョン番号は 1 以上である必要があります".to_string())
            })
            .and_then(Self::new)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// =========================================================================
// EmailAddress（メールアドレス）
// =========================================================================

/// メールアドレスの最大文字数（RFC 5321）
const MAX_EMAIL_LENGTH: usize = 254;

/// メールアドレス（値オブジェクト）
///
/// 厳密な RFC 準拠ではなく、`local@domain.tld` の形であることだけを検証する。
/// 到達可能性は送信時に判明する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }
        if value.chars().count() > MAX_EMAIL_LENGTH {
            return Err(DomainError::Validation(format!(
                "メールアドレスは {MAX_EMAIL_LENGTH} 文字以内である必要があります"
            )));
        }

        let well_formed = value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        });
        if !well_formed {
            return Err(DomainError::Validation(format!(
                "メールアドレスの形式が不正です: {value}"
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_初期バージョンは1() {
        assert_eq!(Version::initial().as_u32(), 1);
        assert_eq!(Version::default(), Version::initial());
    }

    #[test]
    fn test_nextでインクリメントされる() {
        assert_eq!(Version::initial().next().as_i32(), 2);
    }

    #[test]
    fn test_nextはi32上限で飽和する() {
        let max = Version::try_from(i32::MAX).unwrap();
        assert_eq!(max.next().as_i32(), i32::MAX);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    fn test_0以下のi32からは変換できない(#[case] value: i32) {
        assert!(Version::try_from(value).is_err());
    }

    #[test]
    fn test_displayはv付きで表示される() {
        assert_eq!(Version::new(3).unwrap().to_string(), "v3");
    }

    #[rstest]
    #[case("buyer@example.com")]
    #[case("  owner+shop@mail.example.co.jp ")]
    fn test_正しい形式のメールアドレスを受け付ける(#[case] input: &str) {
        let email = EmailAddress::new(input).unwrap();
        assert_eq!(email.as_str(), input.trim());
    }

    #[rstest]
    #[case("")]
    #[case("no-at-sign")]
    #[case("@example.com")]
    #[case("user@localhost")]
    #[case("user@.example.com")]
    #[case("a@b@example.com")]
    #[case("user name@example.com")]
    fn test_不正な形式のメールアドレスを拒否する(#[case] input: &str) {
        assert!(matches!(
            EmailAddress::new(input),
            Err(DomainError::Validation(_))
        ));
    }
}
