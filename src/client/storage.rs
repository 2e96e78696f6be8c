//! Narrow contract for the optional local key-value cache (current user,
//! session token, server config snapshots). The implementation lives outside
//! this crate; call sites that are not correctness-critical swallow failures.

use async_trait::async_trait;

#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>);
    async fn delete(&self, key: &str);
}
