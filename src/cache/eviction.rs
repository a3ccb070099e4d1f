use crate::domain::CacheEntrySummary;

pub const MAX_CACHE_ENTRIES: usize = 5;
pub const MAX_CACHE_BYTES: u64 = 300 * 1024 * 1024;

/// Dual cap on the store. Either bound alone triggers trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    pub max_entries: usize,
    pub max_bytes: u64,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_entries: MAX_CACHE_ENTRIES,
            max_bytes: MAX_CACHE_BYTES,
        }
    }
}

impl CacheLimits {
    pub fn is_satisfied(&self, count: usize, total_bytes: u64) -> bool {
        count <= self.max_entries && total_bytes <= self.max_bytes
    }
}

/// URLs to delete, least recently accessed first, so that what remains fits
/// both bounds. Empty when the store already fits.
pub fn plan_eviction(entries: &[CacheEntrySummary], limits: &CacheLimits) -> Vec<String> {
    let mut remaining_count = entries.len();
    let mut remaining_bytes: u64 = entries.iter().map(|e| e.size_bytes).sum();

    if limits.is_satisfied(remaining_count, remaining_bytes) {
        return Vec::new();
    }

    let mut by_access: Vec<&CacheEntrySummary> = entries.iter().collect();
    by_access.sort_by_key(|e| e.last_accessed_at);

    let mut victims = Vec::new();
    for entry in by_access {
        if limits.is_satisfied(remaining_count, remaining_bytes) {
            break;
        }
        victims.push(entry.url.clone());
        remaining_count -= 1;
        remaining_bytes = remaining_bytes.saturating_sub(entry.size_bytes);
    }

    victims
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(name: &str, size: u64, accessed_secs: i64) -> CacheEntrySummary {
        let at = Utc.timestamp_opt(1_700_000_000 + accessed_secs, 0).unwrap();
        CacheEntrySummary {
            url: format!("https://example.com/{name}.pdf"),
            etag: None,
            size_bytes: size,
            last_accessed_at: at,
            updated_at: at - Duration::seconds(1),
        }
    }

    #[test]
    fn test_within_limits_keeps_everything() {
        let entries = vec![entry("a", 10, 0), entry("b", 10, 1)];
        assert!(plan_eviction(&entries, &CacheLimits::default()).is_empty());
    }

    #[test]
    fn test_count_cap_evicts_oldest() {
        let entries: Vec<_> = (0..7).map(|i| entry(&format!("d{i}"), 1, 10 - i)).collect();
        let victims = plan_eviction(&entries, &CacheLimits::default());
        // d6 and d5 have the oldest access times.
        assert_eq!(
            victims,
            vec!["https://example.com/d6.pdf", "https://example.com/d5.pdf"]
        );
    }

    #[test]
    fn test_byte_cap_alone_triggers() {
        let limits = CacheLimits {
            max_entries: 5,
            max_bytes: 100,
        };
        let entries = vec![entry("old", 60, 0), entry("mid", 30, 1), entry("new", 50, 2)];
        let victims = plan_eviction(&entries, &limits);
        assert_eq!(victims, vec!["https://example.com/old.pdf"]);
    }

    #[test]
    fn test_trimming_continues_until_both_hold() {
        let limits = CacheLimits {
            max_entries: 3,
            max_bytes: 50,
        };
        // Count is fixed after one removal, bytes need two more.
        let entries = vec![
            entry("a", 10, 0),
            entry("b", 40, 1),
            entry("c", 40, 2),
            entry("d", 10, 3),
            entry("e", 10, 4),
        ];
        let victims = plan_eviction(&entries, &limits);
        assert_eq!(
            victims,
            vec![
                "https://example.com/a.pdf",
                "https://example.com/b.pdf",
                "https://example.com/c.pdf",
            ]
        );
    }

    #[test]
    fn test_single_oversized_entry_empties_store() {
        let limits = CacheLimits {
            max_entries: 5,
            max_bytes: 100,
        };
        let entries = vec![entry("huge", 1_000, 0)];
        assert_eq!(plan_eviction(&entries, &limits), vec!["https://example.com/huge.pdf"]);
    }

    #[test]
    fn test_bounds_and_recency_hold_for_many_sequences() {
        let limits = CacheLimits {
            max_entries: 5,
            max_bytes: 1_000,
        };
        // Small LCG so the sequences are varied but reproducible.
        let mut seed: u64 = 0x5eed;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            seed >> 33
        };

        for round in 0..200 {
            let len = (next() % 12) as usize;
            let entries: Vec<_> = (0..len)
                .map(|i| entry(&format!("r{round}-{i}"), next() % 400, (next() % 10_000) as i64))
                .collect();

            let victims = plan_eviction(&entries, &limits);
            let kept: Vec<_> = entries.iter().filter(|e| !victims.contains(&e.url)).collect();
            let removed: Vec<_> = entries.iter().filter(|e| victims.contains(&e.url)).collect();

            let kept_bytes: u64 = kept.iter().map(|e| e.size_bytes).sum();
            assert!(limits.is_satisfied(kept.len(), kept_bytes));

            if let Some(newest_removed) = removed.iter().map(|e| e.last_accessed_at).max() {
                assert!(kept.iter().all(|e| e.last_accessed_at >= newest_removed));
            }
        }
    }
}
