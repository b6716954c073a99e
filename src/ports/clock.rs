use chrono::{DateTime, Utc};

/// 時計ポート
///
/// ドメイン層は現在時刻を自分で読まない。必要な時刻はすべてここから渡される。
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
