use chrono::{DateTime, Utc};
use uuid::Uuid;

const RANDOM_SUFFIX_LEN: usize = 12;

/// Human-readable order number: the UTC second of creation followed by 48
/// random bits. The `order_no` unique index rejects the rare collision.
pub fn generate(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string().to_uppercase();
    format!(
        "{}{}",
        now.format("%Y%m%d%H%M%S"),
        &random[..RANDOM_SUFFIX_LEN]
    )
}
