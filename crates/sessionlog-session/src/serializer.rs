//! Projection of aggregator state into the canonical JSON document.

use sessionlog_types::{
    snapshot::{ActionCount, SessionSnapshot},
    Result,
};

use crate::aggregator::SessionAggregator;

/// A snapshot together with its encoded form.
#[derive(Debug, Clone)]
pub struct SerializedSnapshot {
    pub json: String,
    pub snapshot: SessionSnapshot,
}

impl SerializedSnapshot {
    pub fn actions_received(&self) -> &[ActionCount] {
        &self.snapshot.actions_received
    }

    pub fn completed_percentage(&self) -> f32 {
        self.snapshot.completed_percentage
    }
}

pub fn completion_ratio(completed: usize, declared: usize) -> f32 {
    if declared == 0 {
        0.0
    } else {
        completed as f32 / declared as f32
    }
}

pub fn build_snapshot(session: &SessionAggregator) -> SessionSnapshot {
    let actions_received: Vec<ActionCount> = session
        .action_counts()
        .map(|(name, count)| ActionCount {
            action_name: name.to_owned(),
            count,
        })
        .collect();
    let completed = actions_received.iter().filter(|a| a.count > 0).count();
    let app = session.app();

    SessionSnapshot {
        app_name: app.name.clone(),
        version: app.version.clone(),
        bundle_version_code: app.bundle_version_code().to_owned(),
        session_start: session.started_at(),
        session_duration_seconds: session.elapsed().as_secs_f32(),
        avg_high_fps: session.fps().highest().cloned(),
        avg_low_fps: session.fps().lowest().cloned(),
        logs: session.logs().to_vec(),
        completed_percentage: completion_ratio(completed, session.registry().len()),
        actions_received,
        custom_events: session.custom_events().entries().to_vec(),
    }
}

pub fn serialize(session: &SessionAggregator) -> Result<SerializedSnapshot> {
    let snapshot = build_snapshot(session);
    let json = snapshot.to_json()?;
    Ok(SerializedSnapshot { json, snapshot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fps::FPS_WINDOW, registry::ActionRegistry, Viewpoint};
    use sessionlog_types::{
        config::AppInfo,
        diagnostics::Severity,
        snapshot::{Quat, Vec3},
    };

    fn session(actions: &[&str]) -> SessionAggregator {
        SessionAggregator::initialize(
            AppInfo {
                name: "Demo".into(),
                version: "2.0".into(),
                bundle_version_code: None,
            },
            ActionRegistry::from_names(actions),
        )
    }

    #[test]
    fn completion_percentage_counts_touched_actions() {
        let mut s = session(&["a", "b", "c", "d", "e"]);
        s.record_event("b");
        s.record_event("b");
        s.record_event("e");
        s.record_event("zzz");
        let out = serialize(&s).unwrap();
        assert!((out.completed_percentage() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn completion_percentage_is_zero_without_actions() {
        let mut s = session(&[]);
        s.record_event("x");
        assert_eq!(serialize(&s).unwrap().completed_percentage(), 0.0);
    }

    #[test]
    fn actions_follow_declaration_order() {
        let mut s = session(&["zeta", "alpha", "mid"]);
        s.record_event("mid");
        let out = serialize(&s).unwrap();
        let names: Vec<_> = out
            .actions_received()
            .iter()
            .map(|a| a.action_name.as_str())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(out.actions_received()[2].count, 1);
    }

    #[test]
    fn empty_session_emits_empty_lists_and_null_fps() {
        let out = serialize(&session(&[])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out.json).unwrap();
        assert_eq!(value["logs"], serde_json::json!([]));
        assert_eq!(value["customEvents"], serde_json::json!([]));
        assert_eq!(value["ActionsReceived"], serde_json::json!([]));
        assert!(value["avgHighFps"].is_null());
        assert!(value["avgLowFps"].is_null());
        assert_eq!(value["bundleVersionCode"], "2.0");
    }

    #[test]
    fn json_round_trip_preserves_session_state() {
        let mut s = session(&["a", "b"]);
        s.record_event("a");
        s.record_event("b");
        s.record_event("a");
        s.record_custom_event("difficulty", "hard", false);
        s.record_custom_event("score", "10", false);
        s.record_log("Checkpoint", "reached gate");
        s.capture_diagnostic(Severity::Warning, "slow frame", "");
        let view = Viewpoint {
            position: Vec3 {
                x: 1.0,
                y: 0.0,
                z: -2.0,
            },
            rotation: Quat::IDENTITY,
            scene: "Arena".into(),
        };
        for _ in 0..FPS_WINDOW {
            s.sample_fps(58.0, Some(&view));
        }

        let out = serialize(&s).unwrap();
        let parsed = SessionSnapshot::from_json(&out.json).unwrap();

        assert_eq!(parsed.actions_received, out.snapshot.actions_received);
        assert_eq!(parsed.actions_received[0].count, 2);
        assert_eq!(parsed.custom_events, out.snapshot.custom_events);
        let kinds: Vec<_> = parsed.logs.iter().map(|l| l.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "a",
                "b",
                "a",
                "difficulty [hard] overwrite:false",
                "score [10] overwrite:false",
                "Checkpoint",
                "Warning"
            ]
        );
        assert_eq!(parsed.logs, out.snapshot.logs);
        assert_eq!(parsed.avg_high_fps.as_ref().unwrap().scene, "Arena");
        assert_eq!(parsed.avg_low_fps.as_ref().unwrap().avg, 58.0);
    }
}
