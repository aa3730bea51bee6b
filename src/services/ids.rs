//! ID Generation Service
//!
//! All opaque identifiers are minted here instead of inline at call sites:
//!
//! | Identifier | Format | Uniqueness |
//! |---|---|---|
//! | user id | `user_<uuid simple>` | DB unique constraint |
//! | admin id | `admin_<uuid simple>` | DB unique constraint |
//! | referral code | `DUB-XXXX-XXXX` (A-Z, 0-9) | DB unique constraint + retry |
//! | referral id | `ref_<uuid simple>` | none |

use rand::Rng;
use uuid::Uuid;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_GROUP_LEN: usize = 4;

/// 식별자 생성 인터페이스
pub trait IdGenerator: Send + Sync {
    fn user_id(&self) -> String;
    fn admin_id(&self) -> String;
    fn referral_code(&self) -> String;
    fn referral_id(&self) -> String;
}

/// uuid v4 + rand 기반 기본 구현
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl RandomIds {
    fn code_group<R: Rng>(rng: &mut R) -> String {
        (0..CODE_GROUP_LEN)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

impl IdGenerator for RandomIds {
    fn user_id(&self) -> String {
        format!("user_{}", Uuid::new_v4().simple())
    }

    fn admin_id(&self) -> String {
        format!("admin_{}", Uuid::new_v4().simple())
    }

    fn referral_code(&self) -> String {
        let mut rng = rand::thread_rng();
        format!(
            "DUB-{}-{}",
            Self::code_group(&mut rng),
            Self::code_group(&mut rng)
        )
    }

    fn referral_id(&self) -> String {
        format!("ref_{}", Uuid::new_v4().simple())
    }
}

/// `DUB-XXXX-XXXX` 형식 검사
pub fn is_valid_referral_code(code: &str) -> bool {
    let mut parts = code.split('-');
    let valid_group = |group: Option<&str>| {
        group.map_or(false, |g| {
            g.len() == CODE_GROUP_LEN
                && g.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        })
    };

    parts.next() == Some("DUB")
        && valid_group(parts.next())
        && valid_group(parts.next())
        && parts.next().is_none()
}
