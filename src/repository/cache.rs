// ==========================================
// 学员训练计划管理 - 读缓存
// ==========================================
// 职责: 按查询键缓存读取结果,过期时间显式注入
// 红线: 任何写操作后由调用方整体清空
// 容量: 写入前清理过期条目,满额时淘汰最早写入的条目
// ==========================================

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Instant,
}

pub struct TtlCache<V: Clone> {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// max_entries 至少为 1
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // 缓存内容可随时丢弃,锁中毒时直接沿用内部数据
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// 以指定时刻判定是否过期（过期条目顺带移除）
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&self, key: impl Into<String>, value: V, now: Instant) {
        let key = key.into();
        let mut entries = self.lock();
        entries.retain(|_, entry| entry.expires_at > now);
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    /// 移除以 prefix 开头的所有条目
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.lock().retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60), 16);
        let t0 = Instant::now();
        cache.insert_at("customers", vec![1, 2, 3], t0);

        assert_eq!(cache.get_at("customers", t0 + Duration::from_secs(59)), Some(vec![1, 2, 3]));
        assert_eq!(cache.get_at("customers", t0 + Duration::from_secs(60)), None);
        assert!(cache.is_empty(), "过期条目读取时移除");
    }

    #[test]
    fn test_invalidate_prefix_and_clear() {
        let cache = TtlCache::new(Duration::from_secs(60), 16);
        cache.insert("customer:C1", 1);
        cache.insert("plan:C1:2024-05-01", 2);
        cache.insert("plan:C2:2024-05-01", 3);

        cache.invalidate_prefix("plan:C1:");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("plan:C2:2024-05-01"), Some(3));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_sweeps_expired_and_evicts_oldest() {
        let cache = TtlCache::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        cache.insert_at("a", 1, t0);
        cache.insert_at("b", 2, t0 + Duration::from_secs(1));
        cache.insert_at("c", 3, t0 + Duration::from_secs(2));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(3)), None);
        assert_eq!(cache.get_at("c", t0 + Duration::from_secs(3)), Some(3));

        // 覆盖已有键不触发淘汰
        cache.insert_at("c", 30, t0 + Duration::from_secs(4));
        assert_eq!(cache.get_at("b", t0 + Duration::from_secs(4)), Some(2));

        // 未被再次读取的过期条目在下一次写入时清理
        cache.insert_at("d", 4, t0 + Duration::from_secs(120));
        assert_eq!(cache.len(), 1);
    }
}
