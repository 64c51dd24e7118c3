//! Wire schema of a serialized session. Field names are the collector contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, SessionLogError};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Average FPS of one sampling window and where the viewer was at the time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FpsData {
    pub avg: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub scene: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl LogEntry {
    pub fn now(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCount {
    pub action_name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEvent {
    pub event_name: String,
    pub event_value: String,
}

/// Point-in-time projection of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(rename = "appName")]
    pub app_name: String,
    pub version: String,
    #[serde(rename = "bundleVersionCode")]
    pub bundle_version_code: String,
    #[serde(rename = "sessionStart")]
    pub session_start: DateTime<Utc>,
    #[serde(rename = "sessionDurationSeconds")]
    pub session_duration_seconds: f32,
    #[serde(rename = "avgHighFps")]
    pub avg_high_fps: Option<FpsData>,
    #[serde(rename = "avgLowFps")]
    pub avg_low_fps: Option<FpsData>,
    pub logs: Vec<LogEntry>,
    #[serde(rename = "ActionsReceived")]
    pub actions_received: Vec<ActionCount>,
    #[serde(rename = "Completed_Percentage")]
    pub completed_percentage: f32,
    #[serde(rename = "customEvents")]
    pub custom_events: Vec<CustomEvent>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| SessionLogError::Serialization(format!("snapshot encode failed: {err}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| SessionLogError::Serialization(format!("snapshot decode failed: {err}")))
    }
}
