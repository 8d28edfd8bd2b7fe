// src/models/monitoring.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Proctoring signals reported by the exam-taking client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringEventKind {
    TabSwitch,
    Paste,
    Copy,
    Idle,
    FocusLost,
    FullscreenExit,
}

impl MonitoringEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MonitoringEventKind::TabSwitch => "tab_switch",
            MonitoringEventKind::Paste => "paste",
            MonitoringEventKind::Copy => "copy",
            MonitoringEventKind::Idle => "idle",
            MonitoringEventKind::FocusLost => "focus_lost",
            MonitoringEventKind::FullscreenExit => "fullscreen_exit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tab_switch" => Some(MonitoringEventKind::TabSwitch),
            "paste" => Some(MonitoringEventKind::Paste),
            "copy" => Some(MonitoringEventKind::Copy),
            "idle" => Some(MonitoringEventKind::Idle),
            "focus_lost" => Some(MonitoringEventKind::FocusLost),
            "fullscreen_exit" => Some(MonitoringEventKind::FullscreenExit),
            _ => None,
        }
    }
}

/// Represents the 'monitoring_events' table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringEvent {
    pub id: String,
    pub assignment_id: String,
    pub kind: MonitoringEventKind,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// DTO for the client reporting an event. The server clock is used when
/// `occurredAt` is missing.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventRequest {
    pub kind: MonitoringEventKind,
    #[validate(length(max = 500))]
    pub detail: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}
