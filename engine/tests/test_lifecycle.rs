//! Lifecycle Tests
//!
//! Covers start / pause / stop / restart transitions, timing settings and
//! participants built from registered type tags.

use scenario_engine_core::{
    BehaviorError, EngineState, EventRecorder, Participant, ParticipantId, RngManager,
    ScenarioConfig, ScenarioContext, ScenarioEngine, ScenarioError, ScenarioEvent, SimTime,
    StepOutcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

/// Participant that counts its restarts and can be told to fail them
struct Vessel {
    id: ParticipantId,
    name: String,
    restarts: Arc<AtomicUsize>,
    fail_restart: bool,
}

impl Vessel {
    fn new(id: ParticipantId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            restarts: Arc::new(AtomicUsize::new(0)),
            fail_restart: false,
        }
    }
}

impl Participant for Vessel {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn set_id(&mut self, id: ParticipantId) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn do_decision(
        &mut self,
        _old_time: SimTime,
        _new_time: SimTime,
        _ctx: &mut ScenarioContext<'_>,
    ) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn do_movement(
        &mut self,
        _old_time: SimTime,
        _new_time: SimTime,
        _ctx: &mut ScenarioContext<'_>,
    ) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn do_detection(
        &mut self,
        _old_time: SimTime,
        _new_time: SimTime,
        _ctx: &mut ScenarioContext<'_>,
    ) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn restart(&mut self, _ctx: &mut ScenarioContext<'_>) -> Result<(), BehaviorError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        if self.fail_restart {
            return Err(BehaviorError::new("cannot reset"));
        }
        Ok(())
    }
}

fn create_engine(start_time: SimTime) -> (ScenarioEngine, Arc<EventRecorder>) {
    let mut engine = ScenarioEngine::new(ScenarioConfig {
        name: Some("Lifecycle".to_string()),
        start_time,
        scenario_step_ms: 1000,
        ..Default::default()
    })
    .unwrap();
    let recorder = Arc::new(EventRecorder::new());
    engine.add_running_listener(recorder.clone());
    engine.add_stepped_listener(recorder.clone());
    (engine, recorder)
}

// ============================================================================
// Start / Pause
// ============================================================================

#[test]
fn test_start_arms_driver_and_fires_started() {
    let (mut engine, recorder) = create_engine(0);
    assert_eq!(engine.state(), EngineState::Idle);

    engine.start().unwrap();

    assert_eq!(engine.state(), EngineState::Running);
    assert!(engine.is_running());
    assert_eq!(recorder.count_of("Started"), 1);
}

#[test]
fn test_start_while_running_is_noop() {
    let (mut engine, recorder) = create_engine(0);
    engine.start().unwrap();
    engine.start().unwrap();

    assert_eq!(recorder.count_of("Started"), 1);
}

#[test]
fn test_pause_disarms_and_fires_paused() {
    let (mut engine, recorder) = create_engine(0);
    engine.start().unwrap();
    engine.pause();

    assert_eq!(engine.state(), EngineState::Paused);
    assert!(!engine.is_running());
    assert_eq!(recorder.count_of("Paused"), 1);

    // resuming is just another start
    engine.start().unwrap();
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(recorder.count_of("Started"), 2);
}

#[test]
fn test_manual_steps_work_without_start() {
    let (mut engine, recorder) = create_engine(0);

    engine.step().unwrap();
    engine.step().unwrap();

    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(recorder.stepped_times(), vec![0, 1000]);
}

// ============================================================================
// Stop
// ============================================================================

#[test]
fn test_stop_finishes_on_next_step() {
    let (mut engine, recorder) = create_engine(0);
    engine.start().unwrap();
    engine.step().unwrap();

    engine.stop("mission complete");
    assert_eq!(engine.state(), EngineState::Running, "stop is deferred");

    let outcome = engine.step().unwrap();
    assert!(outcome.is_finished());
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(!engine.is_running());

    let finished: Vec<ScenarioEvent> = recorder
        .events()
        .into_iter()
        .filter(|e| matches!(e, ScenarioEvent::Finished { .. }))
        .collect();
    assert_eq!(finished.len(), 1);
    match &finished[0] {
        ScenarioEvent::Finished { reason, .. } => assert_eq!(reason, "mission complete"),
        _ => unreachable!(),
    }
    // no stepped notification for the finishing call
    assert_eq!(recorder.stepped_times(), vec![0]);
}

#[test]
fn test_finish_without_start_reports_zero_elapsed() {
    let (mut engine, _recorder) = create_engine(0);
    engine.stop("never ran");

    match engine.step().unwrap() {
        StepOutcome::Finished { elapsed, .. } => assert_eq!(elapsed, Duration::ZERO),
        other => panic!("expected finish, got {:?}", other),
    }
}

#[test]
fn test_stopped_engine_rejects_step_and_start() {
    let (mut engine, _recorder) = create_engine(0);
    engine.stop("done");
    engine.step().unwrap();

    assert!(matches!(engine.step(), Err(ScenarioError::Stopped)));
    assert!(matches!(engine.start(), Err(ScenarioError::Stopped)));
}

#[test]
fn test_stop_after_finish_is_ignored() {
    let (mut engine, recorder) = create_engine(0);
    engine.step().unwrap();
    engine.stop("first");
    assert!(engine.step().unwrap().is_finished());

    engine.stop("again");
    assert!(matches!(engine.step(), Err(ScenarioError::Stopped)));
    assert!(matches!(engine.step(), Err(ScenarioError::Stopped)));
    assert_eq!(recorder.count_of("Finished"), 1);

    // the ignored stop does not survive a restart either
    engine.restart();
    let outcome = engine.step().unwrap();
    assert!(!outcome.is_finished());
    assert_eq!(recorder.count_of("Finished"), 1);
    assert_eq!(recorder.stepped_times(), vec![0, 0]);
}

#[test]
fn test_pause_after_stop_keeps_stopped_state() {
    let (mut engine, recorder) = create_engine(0);
    engine.stop("done");
    engine.step().unwrap();

    engine.pause();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(recorder.count_of("Paused"), 1);
}

// ============================================================================
// Restart
// ============================================================================

#[test]
fn test_restart_returns_to_start_time_with_first_pass_hold() {
    let (mut engine, recorder) = create_engine(100);
    for _ in 0..5 {
        engine.step().unwrap();
    }
    assert_eq!(engine.time(), 3100);

    engine.stop("reset");
    engine.step().unwrap();
    let faults = engine.restart();
    assert!(faults.is_empty());

    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(engine.time(), 100);
    assert!(!engine.stop_pending());

    recorder.clear();
    engine.step().unwrap();
    engine.step().unwrap();
    assert_eq!(recorder.stepped_times(), vec![100, 1100]);
}

#[test]
fn test_restart_while_running_stays_running() {
    let (mut engine, _recorder) = create_engine(0);
    engine.start().unwrap();
    engine.step().unwrap();
    engine.step().unwrap();

    engine.restart();

    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.time(), 0);
}

#[test]
fn test_restart_clears_pending_stop() {
    let (mut engine, _recorder) = create_engine(0);
    engine.stop("abandon");
    engine.restart();

    let outcome = engine.step().unwrap();
    assert!(!outcome.is_finished());
}

#[test]
fn test_restart_resets_participants_and_reports_failures() {
    let (mut engine, recorder) = create_engine(0);

    let good = Vessel::new(ParticipantId(1), "good");
    let good_restarts = good.restarts.clone();
    let mut bad = Vessel::new(ParticipantId(2), "bad");
    bad.fail_restart = true;
    let bad_restarts = bad.restarts.clone();

    engine.add_participant(ParticipantId(1), Box::new(good));
    engine.add_participant(ParticipantId(2), Box::new(bad));

    let faults = engine.restart();

    assert_eq!(good_restarts.load(Ordering::SeqCst), 1);
    assert_eq!(bad_restarts.load(Ordering::SeqCst), 1);
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].id, ParticipantId(2));
    assert_eq!(recorder.count_of("Restarted"), 1);
}

#[test]
fn test_set_time_moves_restart_target() {
    let (mut engine, _recorder) = create_engine(0);
    engine.set_time(5000);
    assert_eq!(engine.time(), 5000);
    assert_eq!(engine.start_time(), 5000);

    engine.step().unwrap();
    engine.step().unwrap();
    engine.restart();
    assert_eq!(engine.time(), 5000);
}

// ============================================================================
// Timing
// ============================================================================

#[test]
fn test_step_time_change_notifies() {
    let (mut engine, recorder) = create_engine(0);
    engine.set_step_time(250);

    assert_eq!(engine.step_time(), 250);
    assert!(recorder
        .events()
        .contains(&ScenarioEvent::StepTimeChanged { delay_ms: 250 }));

    engine.set_step_duration(Duration::from_millis(40));
    assert_eq!(engine.step_time(), 40);
}

#[test]
fn test_rename_notifies_running_listeners() {
    let (mut engine, recorder) = create_engine(0);
    engine.set_name("Convoy");

    assert_eq!(engine.name(), "Convoy");
    assert_eq!(
        recorder.events(),
        vec![ScenarioEvent::NameChanged {
            name: "Convoy".to_string()
        }]
    );
}

#[test]
fn test_scenario_step_change_applies_to_next_step() {
    let (mut engine, recorder) = create_engine(0);
    engine.step().unwrap();
    engine.set_scenario_step_time(500).unwrap();
    engine.step().unwrap();
    engine.set_scenario_step_duration(Duration::from_secs(2)).unwrap();
    engine.step().unwrap();

    assert_eq!(recorder.stepped_times(), vec![0, 500, 2500]);
    assert_eq!(recorder.count_of("ScenarioStepTimeChanged"), 2);
}

#[test]
fn test_non_positive_scenario_step_rejected() {
    let (mut engine, recorder) = create_engine(0);

    assert!(matches!(
        engine.set_scenario_step_time(-1000),
        Err(ScenarioError::InvalidStepSize(-1000))
    ));
    assert!(engine.set_scenario_step_duration(Duration::ZERO).is_err());
    assert_eq!(engine.scenario_step_time(), 1000);
    assert_eq!(recorder.count_of("ScenarioStepTimeChanged"), 0);
}

// ============================================================================
// Seeding
// ============================================================================

#[test]
fn test_start_reseeds_rng() {
    let (mut engine, _recorder) = create_engine(0);
    engine.set_seed(Some(42));
    engine.rng().next();
    engine.rng().next();

    engine.start().unwrap();

    let mut expected = RngManager::new(42);
    assert_eq!(engine.rng().next(), expected.next());
    assert_eq!(engine.seed(), Some(42));
}

// ============================================================================
// Participants
// ============================================================================

#[test]
fn test_add_and_remove_participants() {
    let (mut engine, _recorder) = create_engine(0);

    let first = engine.add_participant(
        ParticipantId::UNASSIGNED,
        Box::new(Vessel::new(ParticipantId::UNASSIGNED, "a")),
    );
    let second = engine.add_participant(
        ParticipantId::UNASSIGNED,
        Box::new(Vessel::new(ParticipantId::UNASSIGNED, "b")),
    );
    assert_ne!(first, second);
    assert_eq!(engine.participant(first).unwrap().id(), first);

    let removed = engine.remove_participant(first).expect("participant present");
    assert_eq!(removed.name(), "a");
    assert!(engine.remove_participant(first).is_none());
    assert_eq!(engine.participant_ids(), vec![second]);

    engine.clear_participants();
    assert_eq!(engine.participant_count(), 0);
}

#[test]
fn test_participant_mut_allows_host_edits() {
    let (mut engine, _recorder) = create_engine(0);
    engine.add_participant(ParticipantId(3), Box::new(Vessel::new(ParticipantId(3), "x")));

    engine
        .participant_mut(ParticipantId(3))
        .unwrap()
        .set_id(ParticipantId(3));
    assert!(engine.participant_mut(ParticipantId(4)).is_none());
}

#[test]
fn test_visible_participants_view() {
    let (mut engine, _recorder) = create_engine(0);
    engine.add_participant(ParticipantId(1), Box::new(Vessel::new(ParticipantId(1), "seen")));
    engine.add_monte_carlo_participant(
        ParticipantId(2),
        Box::new(Vessel::new(ParticipantId(2), "hidden")),
    );

    let visible = engine.visible_participants();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].name(), "seen");
}

#[test]
fn test_create_new_participant_from_registered_type() {
    let (mut engine, _recorder) = create_engine(0);
    let replaced = engine.register_participant_type("SSK", |id, name| {
        Box::new(Vessel::new(id, name)) as Box<dyn Participant>
    });
    assert!(!replaced);

    let id = engine.create_new_participant("SSK").unwrap();

    let participant = engine.participant(id).unwrap();
    assert_eq!(participant.name(), format!("SSK_{}", id));
    assert_eq!(engine.factory().tags(), vec!["SSK"]);
}

#[test]
fn test_create_new_participant_unknown_type() {
    let (mut engine, _recorder) = create_engine(0);

    let result = engine.create_new_participant("SUBMARINE");

    assert!(matches!(
        result,
        Err(ScenarioError::UnknownParticipantType(ref tag)) if tag == "SUBMARINE"
    ));
    assert_eq!(engine.participant_count(), 0);
}

#[test]
fn test_engine_metadata() {
    let (mut engine, _recorder) = create_engine(0);
    assert_eq!(engine.name(), "Lifecycle");

    engine.set_name("Convoy");
    engine.set_case_id("Case_7");
    assert_eq!(engine.name(), "Convoy");
    assert_eq!(engine.case_id(), "Case_7");
}
