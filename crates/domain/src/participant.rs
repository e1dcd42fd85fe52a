use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::value_objects::{ParticipantName, Timestamp};

/// 房间内的参与者，靠心跳维持在线。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: ParticipantName,
    pub last_seen: Timestamp,
}

impl Participant {
    pub fn new(name: ParticipantName, joined_at: Timestamp) -> Self {
        Self {
            name,
            last_seen: joined_at,
        }
    }

    /// 记录一次心跳。时间只前进不后退。
    pub fn touch(&mut self, at: Timestamp) {
        if at > self.last_seen {
            self.last_seen = at;
        }
    }

    /// 距离上次心跳是否已超过阈值（严格大于）。
    ///
    /// 时钟回拨导致 `now` 早于 `last_seen` 时视为在线。
    pub fn is_stale(&self, now: Timestamp, threshold: Duration) -> bool {
        (now - self.last_seen)
            .to_std()
            .map(|idle| idle > threshold)
            .unwrap_or(false)
    }
}
