use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::model::{GridCoordinate, WeatherSnapshot};

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: WeatherSnapshot,
    stored_at: DateTime<Utc>,
    grid: GridCoordinate,
}

/// Single-slot snapshot cache keyed by grid cell.
///
/// A hit requires the same cell and an entry no older than the TTL. Every
/// store replaces the slot, whatever cell it held.
#[derive(Debug)]
pub struct SnapshotCache {
    ttl: Duration,
    slot: Mutex<Option<CacheEntry>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, slot: Mutex::new(None) }
    }

    pub fn get(&self, grid: GridCoordinate, now: DateTime<Utc>) -> Option<WeatherSnapshot> {
        let slot = self.slot.lock();
        let entry = slot.as_ref()?;

        if entry.grid != grid {
            tracing::debug!(?grid, cached = ?entry.grid, "Cache miss: different grid cell");
            return None;
        }
        if now - entry.stored_at > self.ttl {
            tracing::debug!(?grid, "Cache miss: entry expired");
            return None;
        }

        Some(entry.snapshot.clone())
    }

    pub fn put(&self, snapshot: WeatherSnapshot, now: DateTime<Utc>) {
        let grid = snapshot.grid();
        *self.slot.lock() = Some(CacheEntry { snapshot, stored_at: now, grid });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(nx: i32, ny: i32) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: Some(15.0),
            humidity: None,
            wind_speed: None,
            precipitation_type: "없음".into(),
            sky_label: None,
            weather_label: "알수없음".into(),
            precipitation_1h: "강수없음".into(),
            wind_direction: None,
            icon: None,
            base_date: "20261016".into(),
            base_time: "1400".into(),
            nx,
            ny,
            latitude: 37.5665,
            longitude: 126.978,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 5, 20, 0).unwrap()
    }

    #[test]
    fn hit_within_ttl_on_same_cell() {
        let cache = SnapshotCache::new(Duration::minutes(5));
        cache.put(snapshot(60, 127), t0());

        let grid = GridCoordinate { nx: 60, ny: 127 };
        assert!(cache.get(grid, t0() + Duration::minutes(5)).is_some());
        assert!(cache.get(grid, t0() + Duration::minutes(5) + Duration::seconds(1)).is_none());
    }

    #[test]
    fn miss_on_other_cell() {
        let cache = SnapshotCache::new(Duration::minutes(5));
        cache.put(snapshot(60, 127), t0());
        assert!(cache.get(GridCoordinate { nx: 61, ny: 127 }, t0()).is_none());
    }

    #[test]
    fn store_replaces_single_slot() {
        let cache = SnapshotCache::new(Duration::minutes(5));
        cache.put(snapshot(60, 127), t0());
        cache.put(snapshot(98, 76), t0());

        assert!(cache.get(GridCoordinate { nx: 60, ny: 127 }, t0()).is_none());
        assert!(cache.get(GridCoordinate { nx: 98, ny: 76 }, t0()).is_some());
    }

    #[test]
    fn empty_cache_misses() {
        let cache = SnapshotCache::new(Duration::minutes(5));
        assert!(cache.get(GridCoordinate { nx: 60, ny: 127 }, t0()).is_none());
    }
}
