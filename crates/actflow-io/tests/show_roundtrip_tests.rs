use actflow_control::{Fixture, FixtureProfile};
use actflow_core::{
    Act, ComparisonOperator, ConditionPayload, ConditionPredicate, ConnectionKind, EngineConfig,
    MidiActTrigger, NodeKind, PlaybackEvent, PlaybackSession, Position, Scene, ScenePayload,
    SignalRef, StopReason, TrackerMode, TrackerPayload, TransitionPayload, WaitPayload,
};
use actflow_io::{load_show, save_show, Show};
use std::sync::Arc;
use tempfile::TempDir;

/// A show using every node kind
fn full_show() -> Show {
    let mut act = Act::new("Opening");
    act.description = Some("Everything at once".to_string());
    let wash = act.add_node(
        "Wash",
        NodeKind::Scene(ScenePayload::new("Wash").muting("spot")),
        Position::new(10.0, 20.0),
    );
    let fade = act.add_node(
        "Fade",
        NodeKind::Transition(TransitionPayload::default()),
        Position::new(110.0, 20.0),
    );
    let check = act.add_node(
        "Fader up?",
        NodeKind::Condition(ConditionPayload::new(ConditionPredicate::between(
            SignalRef::Osc {
                address: "/fader/1".to_string(),
            },
            0.25,
            0.75,
        ))),
        Position::new(210.0, 20.0),
    );
    let chase_a = act.add_node("Chase A", NodeKind::Scene(ScenePayload::new("Spot")), Position::default());
    let chase_b = act.add_node("Chase B", NodeKind::Scene(ScenePayload::new("Wash")), Position::default());
    let chase = act.add_node(
        "Chase",
        NodeKind::Tracker(
            TrackerPayload::new(vec![chase_a, chase_b])
                .with_mode(TrackerMode::Once)
                .with_step_delay(250),
        ),
        Position::new(310.0, 20.0),
    );
    let hold = act.add_node(
        "Hold",
        NodeKind::Wait(WaitPayload { duration_ms: 1500 }),
        Position::new(310.0, 120.0),
    );
    act.connect(&wash, &fade, ConnectionKind::Default).unwrap();
    act.connect(&fade, &check, ConnectionKind::Default).unwrap();
    act.connect_conditional(&check, &chase, "true").unwrap();
    act.connect(&check, &hold, ConnectionKind::Default).unwrap();
    act.set_start_node(&wash).unwrap();
    act.triggers.midi = Some(MidiActTrigger {
        channel: 0,
        note: 48,
        enabled: true,
    });

    let mut gate = Act::new("Gate");
    gate.add_node(
        "Time check",
        NodeKind::Condition(ConditionPayload::new(ConditionPredicate::new(
            SignalRef::Dmx { channel: 3 },
            ComparisonOperator::Less,
            10.0,
        ))),
        Position::default(),
    );

    let mut show = Show::new("Full");
    show.acts = vec![act, gate];
    show.scenes.insert(Scene::from_dense("Wash", &[200, 200, 200, 0, 0, 0]));
    show.scenes.insert(Scene::new("Spot", vec![(3, 255), (4, 255), (5, 255)]));
    show.fixtures = vec![
        Fixture::new("wash", "Wash", FixtureProfile::rgb_par(), 0, 1),
        Fixture::new("spot", "Spot", FixtureProfile::rgb_par(), 0, 4),
    ];
    show
}

#[test]
fn test_show_survives_both_formats() {
    let dir = TempDir::new().unwrap();
    let show = full_show();

    for name in ["show.ron", "show.json", "show.actflow"] {
        let path = dir.path().join(name);
        save_show(&show, &path).unwrap();
        assert_eq!(load_show(&path).unwrap(), show, "{name}");
    }
}

#[test]
fn test_loaded_acts_are_idle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("playing.ron");
    let mut show = full_show();
    show.acts[0].playback.is_playing = true;
    show.acts[0].playback.progress = 0.4;
    show.acts[0].playback.current_node_id = show.acts[0].start_node_id.clone();

    save_show(&show, &path).unwrap();
    let loaded = load_show(&path).unwrap();

    assert!(!loaded.acts[0].playback.is_playing);
    assert_eq!(loaded.acts[0].playback.current_node_id, None);
}

#[test]
fn test_loaded_show_plays() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("play.json");
    save_show(&full_show(), &path).unwrap();

    let show = load_show(&path).unwrap();
    let universe = show.build_universe().unwrap();
    let mut session = PlaybackSession::new(universe, show.scenes.clone(), EngineConfig::seeded(5));
    let act = show.find_act("Opening").unwrap().clone();
    session.play(Arc::new(act)).unwrap();
    session.run_until_idle(std::time::Duration::from_secs(10));

    // spot is muted in the wash scene; fader is absent so the act ends on Hold
    assert_eq!(&session.output().channels()[..6], &[200, 200, 200, 0, 0, 0]);
    let events = session.drain_events();
    assert!(matches!(
        events.last(),
        Some(PlaybackEvent::PlaybackStopped {
            reason: StopReason::Completed,
            ..
        })
    ));
}
