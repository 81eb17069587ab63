use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

/// Injectable source of "now", so device-flow TTL races and token expiry can
/// be driven deterministically from tests instead of sleeping real seconds.
#[derive(Clone)]
pub enum Clock {
    Wall,
    Fixed(Arc<RwLock<DateTime<Utc>>>),
}

impl Clock {
    pub fn wall() -> Self {
        Clock::Wall
    }

    pub fn fixed(at: DateTime<Utc>) -> Self {
        Clock::Fixed(Arc::new(RwLock::new(at)))
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Wall => Utc::now(),
            Clock::Fixed(shared) => *shared.read().unwrap(),
        }
    }

    pub fn now_ts(&self) -> i64 {
        self.now().timestamp()
    }

    /// Only meaningful on `Clock::Fixed`; a no-op on `Clock::Wall`.
    pub fn advance(&self, seconds: i64) {
        if let Clock::Fixed(shared) = self {
            let mut guard = shared.write().unwrap();
            *guard += chrono::Duration::seconds(seconds);
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::wall()
    }
}
