use std::collections::HashMap;

/// Client-local key/value storage (cookies, local storage, or memory in tests).
///
/// Backends swallow their own failures: a write that cannot happen is a no-op
/// and a read that cannot happen is `None`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str, max_age_secs: Option<u64>);
    fn remove(&mut self, key: &str);
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str, max_age_secs: Option<u64>) {
        (**self).set(key, value, max_age_secs)
    }

    fn remove(&mut self, key: &str) {
        (**self).remove(key)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str, _max_age_secs: Option<u64>) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Whole-degree form of an angle as it is written to storage.
pub fn persisted_angle(angle: f64) -> i32 {
    if !angle.is_finite() {
        return 0;
    }
    let normalized = (((angle % 360.0) + 360.0) % 360.0).round() as i32;
    normalized % 360
}

/// Keeps the wheel's settled angle across page reloads.
pub struct RotationStateStore<S> {
    store: S,
    key: String,
    max_age_secs: u64,
}

impl<S: KeyValueStore> RotationStateStore<S> {
    pub fn new(store: S, key: impl Into<String>, max_age_secs: u64) -> Self {
        Self {
            store,
            key: key.into(),
            max_age_secs,
        }
    }

    pub fn save(&mut self, angle: f64) -> i32 {
        let angle = persisted_angle(angle);
        self.store.set(&self.key, &angle.to_string(), Some(self.max_age_secs));
        angle
    }

    pub fn load(&self) -> Option<i32> {
        let raw = self.store.get(&self.key)?;
        let raw = raw.trim();
        let parsed = raw
            .parse::<i64>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.trunc() as i64));
        match parsed {
            Some(value) => Some(value.rem_euclid(360) as i32),
            None => {
                log::warn!("ignoring unreadable saved rotation {:?}", raw);
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.store.remove(&self.key);
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn store() -> RotationStateStore<MemoryStore> {
        RotationStateStore::new(MemoryStore::new(), "wheel_rotation", 31_536_000)
    }

    #[test]
    fn nothing_saved_loads_none() {
        assert_eq!(store().load(), None);
    }

    #[test]
    fn save_normalizes_and_rounds() {
        let mut rotation = store();
        assert_eq!(rotation.save(-30.4), 330);
        assert_eq!(rotation.load(), Some(330));
        assert_eq!(rotation.save(725.6), 6);
        assert_eq!(rotation.load(), Some(6));
        // rounding up to a full turn wraps to zero
        assert_eq!(rotation.save(359.7), 0);
    }

    #[test]
    fn round_trip_matches_normalized_angle() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut rotation = store();
        for _ in 0..1000 {
            let angle: f64 = rng.gen_range(-5000.0..5000.0);
            rotation.save(angle);
            let expected = ((((angle % 360.0) + 360.0) % 360.0).round() as i32) % 360;
            assert_eq!(rotation.load(), Some(expected));
        }
    }

    #[test]
    fn garbage_is_treated_as_absent() {
        let mut backend = MemoryStore::new();
        backend.set("wheel_rotation", "sideways", None);
        let rotation = RotationStateStore::new(backend, "wheel_rotation", 10);
        assert_eq!(rotation.load(), None);
    }

    #[test]
    fn foreign_values_are_tolerated() {
        let mut backend = MemoryStore::new();
        backend.set("wheel_rotation", " 412.9 ", None);
        let rotation = RotationStateStore::new(backend, "wheel_rotation", 10);
        assert_eq!(rotation.load(), Some(52));
    }

    #[test]
    fn clear_removes_saved_angle() {
        let mut rotation = store();
        rotation.save(90.0);
        rotation.clear();
        assert_eq!(rotation.load(), None);
        assert!(rotation.store().get("wheel_rotation").is_none());
    }

    #[test]
    fn non_finite_angle_saves_zero() {
        let mut rotation = store();
        assert_eq!(rotation.save(f64::NAN), 0);
        assert_eq!(rotation.load(), Some(0));
    }
}
