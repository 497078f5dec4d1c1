use chrono::{DateTime, TimeZone, Utc};
use questline_core::db::open_db_in_memory;
use questline_core::{
    ContentGenerator, ContributionOutcome, ContributionRangeError, CooldownScheduler,
    DailyMission, DifficultyRating, EngineConfig, EpicMission, EpicState, GenerationError,
    GenerationGate, GenerationOrchestrator, GenerationRequest, GenerationResponse, Goal,
    LedgerError, ManualMission, PendingGenerationTrigger, PlayerProfile, PresentationSink,
    ProgressionEvent, QuestError, QuestService, Rank, SelectionQuery, SnapshotStore,
    SqliteSnapshotStore, StoreError, SubTask, SubTaskCandidate, TickOutcome, TransportError,
    ValidationError,
};
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Default)]
struct ScriptedGenerator {
    responses: RefCell<VecDeque<Result<GenerationResponse, TransportError>>>,
    requests: RefCell<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn push(&self, response: Result<GenerationResponse, TransportError>) {
        self.responses.borrow_mut().push_back(response);
    }
}

impl ContentGenerator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(valid_response("Next step")))
    }
}

/// Records events together with the XP persisted at emit time.
struct RecordingSink<'conn> {
    conn: &'conn Connection,
    events: RefCell<Vec<(ProgressionEvent, u64)>>,
}

impl<'conn> RecordingSink<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            events: RefCell::new(Vec::new()),
        }
    }
}

impl PresentationSink for &RecordingSink<'_> {
    fn on_progression(&self, event: &ProgressionEvent) {
        let persisted: PlayerProfile = SqliteSnapshotStore::new(self.conn)
            .load("profile")
            .unwrap()
            .unwrap_or_default();
        self.events
            .borrow_mut()
            .push((event.clone(), persisted.xp));
    }
}

type TestService<'a> =
    QuestService<SqliteSnapshotStore<'a>, &'a ScriptedGenerator, &'a RecordingSink<'a>>;

fn service<'a>(
    conn: &'a Connection,
    generator: &'a ScriptedGenerator,
    sink: &'a RecordingSink<'a>,
) -> TestService<'a> {
    let orchestrator = GenerationOrchestrator::new(
        generator,
        Arc::new(GenerationGate::new()),
        EngineConfig::default(),
    );
    QuestService::new(SqliteSnapshotStore::new(conn), orchestrator, sink)
}

fn valid_response(name: &str) -> GenerationResponse {
    GenerationResponse {
        next_mission_name: name.to_string(),
        next_mission_description: format!("{name} description"),
        xp: Some(40),
        fragments: Some(2),
        sub_tasks: vec![SubTaskCandidate {
            name: "Repetitions".to_string(),
            target: 10,
            unit: Some("reps".to_string()),
        }],
        ..GenerationResponse::default()
    }
}

fn daily(name: &str, target: u32, current: u32, xp_reward: u64) -> DailyMission {
    let mut sub_task = SubTask::new("Practice", target, Some("minutes".to_string()));
    sub_task.current = current;
    DailyMission::new(name, "practice session", xp_reward, 1, vec![sub_task])
}

fn completed_daily(name: &str) -> DailyMission {
    let mut mission = daily(name, 1, 1, 10);
    mission.completed = true;
    mission.completed_at = Some(0);
    mission
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

#[test]
fn scenario_a_selector_keeps_lowest_rank_per_goal() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let rank_d =
        EpicMission::new("Chord drills", Rank::D, "Learn Piano", 5, Some(daily("d", 5, 0, 10)));
    let rank_e =
        EpicMission::new("Scale drills", Rank::E, "Learn Piano", 5, Some(daily("e", 5, 0, 10)));
    let rank_e_id = rank_e.id;
    service.insert_epic_mission(rank_d).unwrap();
    service.insert_epic_mission(rank_e).unwrap();

    let state = service.load_state().unwrap();
    let selected = state.select(&SelectionQuery::default());
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id(), rank_e_id);
}

#[test]
fn scenario_b_over_target_contribution_is_rejected_then_exact_fill_completes() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let epic =
        EpicMission::new("Reading", Rank::F, "Read more", 5, Some(daily("Chapter", 10, 7, 20)));
    let epic_id = epic.id;
    service.insert_epic_mission(epic).unwrap();

    let err = service.contribute(epic_id, 0, 4, &at(1, 9)).unwrap_err();
    assert!(matches!(
        err,
        QuestError::Contribution(LedgerError::Range(ContributionRangeError::ExceedsRemaining {
            amount: 4,
            remaining: 3
        }))
    ));
    let untouched = service.load_state().unwrap();
    assert_eq!(untouched.epic(epic_id).unwrap().daily_missions[0].sub_tasks[0].current, 7);

    let pending = match service.contribute(epic_id, 0, 3, &at(1, 9)).unwrap() {
        ContributionOutcome::CompletionPending(pending) => pending,
        other => panic!("exact fill should intercept completion, got {other:?}"),
    };
    let intercepted = service.load_state().unwrap();
    assert!(!intercepted.epic(epic_id).unwrap().daily_missions[0].completed);

    service
        .confirm_completion(&pending, DifficultyRating::Perfect, None, &at(1, 9))
        .unwrap();
    let state = service.load_state().unwrap();
    let stored = &state.epic(epic_id).unwrap().daily_missions[0];
    assert_eq!(stored.sub_tasks[0].current, 10);
    assert!(stored.completed);
    assert_eq!(stored.completed_at, Some(at(1, 9).timestamp_millis()));
}

#[test]
fn scenario_c_third_completion_reaches_quota() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let mut epic = EpicMission::new("Runs", Rank::C, "Run a 10k", 3, None);
    epic.daily_missions = vec![
        completed_daily("Run 1"),
        completed_daily("Run 2"),
        daily("Run 3", 5, 4, 30),
    ];
    let epic_id = epic.id;
    service.insert_epic_mission(epic).unwrap();

    let ContributionOutcome::CompletionPending(pending) =
        service.contribute(epic_id, 0, 1, &at(2, 7)).unwrap()
    else {
        panic!("final contribution should be intercepted");
    };
    service
        .confirm_completion(&pending, DifficultyRating::TooEasy, None, &at(2, 7))
        .unwrap();

    let state = service.load_state().unwrap();
    assert_eq!(state.epic_state(epic_id), Some(EpicState::Completed));
    assert!(state.epic(epic_id).unwrap().completed);
}

#[test]
fn scenario_d_too_hard_feedback_reaches_next_generation_request() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let epic =
        EpicMission::new("Scales", Rank::E, "Learn Piano", 4, Some(daily("Scales 1", 2, 1, 10)));
    let epic_id = epic.id;
    service.insert_epic_mission(epic).unwrap();

    let ContributionOutcome::CompletionPending(pending) =
        service.contribute(epic_id, 0, 1, &at(3, 8)).unwrap()
    else {
        panic!("final contribution should be intercepted");
    };
    service
        .confirm_completion(&pending, DifficultyRating::TooHard, Some("wrists hurt"), &at(3, 8))
        .unwrap();

    let generated = service.generate_next(epic_id, None).unwrap();
    assert_eq!(generated.name, "Next step");

    let requests = generator.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].feedback_text.contains("-0.5%"));
    assert!(requests[0].feedback_text.contains("wrists hurt"));
    assert_eq!(requests[0].history_text, "Scales 1");

    let state = service.load_state().unwrap();
    let stored = state.epic(epic_id).unwrap();
    assert!(stored.pending_feedback.is_none());
    assert_eq!(stored.active_daily().unwrap().sub_tasks[0].current, 0);
}

#[test]
fn scenario_e_response_without_valid_subtasks_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let mut epic = EpicMission::new("Scales", Rank::E, "Learn Piano", 4, None);
    epic.daily_missions.push(completed_daily("Scales 1"));
    let epic_id = epic.id;
    service.insert_epic_mission(epic).unwrap();

    let mut invalid = valid_response("Broken");
    invalid.sub_tasks = vec![SubTaskCandidate {
        name: String::new(),
        target: 5,
        unit: None,
    }];
    generator.push(Ok(invalid));

    let err = service.generate_next(epic_id, None).unwrap_err();
    assert!(matches!(
        err,
        QuestError::Generation(GenerationError::Validation(ValidationError::NoValidSubTasks {
            discarded: 1
        }))
    ));
    let state = service.load_state().unwrap();
    assert_eq!(state.epic(epic_id).unwrap().daily_missions.len(), 1);
    assert!(!service.orchestrator().gate().is_busy());
}

#[test]
fn in_flight_generation_rejects_other_missions_without_mutation() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let mut first = EpicMission::new("Laps", Rank::F, "Swim", 3, None);
    first.daily_missions.push(completed_daily("Laps 1"));
    let mut second = EpicMission::new("Scales", Rank::F, "Piano", 3, None);
    second.daily_missions.push(completed_daily("Scales 1"));
    let (first_id, second_id) = (first.id, second.id);
    service.insert_epic_mission(first).unwrap();
    service.insert_epic_mission(second).unwrap();
    let before = service.load_state().unwrap();

    let guard = service.orchestrator().gate().try_acquire(first_id).unwrap();
    let err = service.generate_next(second_id, None).unwrap_err();
    assert!(matches!(
        err,
        QuestError::Generation(GenerationError::ConcurrencyRejection(rejection))
            if rejection.in_flight == first_id && rejection.requested == second_id
    ));
    assert_eq!(service.load_state().unwrap(), before);
    assert!(generator.requests.borrow().is_empty());

    drop(guard);
    service.generate_next(second_id, None).unwrap();
}

#[test]
fn completion_emits_event_before_persisting_rewards() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    service
        .save_profile(&PlayerProfile {
            level: 1,
            xp: 70,
            ..PlayerProfile::default()
        })
        .unwrap();
    let epic =
        EpicMission::new("Push-ups", Rank::F, "Get strong", 5, Some(daily("Set", 3, 2, 50)));
    let epic_id = epic.id;
    service.insert_epic_mission(epic).unwrap();

    let ContributionOutcome::CompletionPending(pending) =
        service.contribute(epic_id, 0, 1, &at(4, 18)).unwrap()
    else {
        panic!("final contribution should be intercepted");
    };
    let event = service
        .confirm_completion(&pending, DifficultyRating::Perfect, None, &at(4, 18))
        .unwrap();

    assert!(event.level_up);
    assert_eq!(event.new_level, 2);
    assert_eq!(event.xp_gained, 50);
    assert_eq!(event.fragments_gained, 1);
    assert_eq!(event.mission_name, "Set");

    let events = sink.events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1, 70, "event must precede the profile write");

    let profile = service.load_state().unwrap().profile;
    assert_eq!(profile.level, 2);
    assert_eq!(profile.xp, 20);
    assert_eq!(profile.fragments, 1);
}

#[test]
fn manual_missions_complete_without_feedback_or_rewards() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let manual = ManualMission::new(
        "Clean desk",
        "Tidy up",
        vec![SubTask::new("Drawers", 2, None), SubTask::new("Cables", 1, None)],
    );
    let manual_id = manual.id;
    service.insert_manual_mission(manual).unwrap();

    assert_eq!(
        service.contribute(manual_id, 0, 2, &at(5, 10)).unwrap(),
        ContributionOutcome::Recorded { new_current: 2 }
    );
    assert_eq!(
        service.contribute(manual_id, 1, 1, &at(5, 10)).unwrap(),
        ContributionOutcome::ManualCompleted
    );

    let state = service.load_state().unwrap();
    assert!(state.manual(manual_id).unwrap().completed);
    assert_eq!(state.profile, PlayerProfile::default());
    assert!(sink.events.borrow().is_empty());
    assert!(generator.requests.borrow().is_empty());
}

#[test]
fn cooldown_suppresses_contributions_until_next_day() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let epic =
        EpicMission::new("Scales", Rank::E, "Learn Piano", 4, Some(daily("Scales 1", 1, 0, 10)));
    let epic_id = epic.id;
    service.insert_epic_mission(epic).unwrap();

    let ContributionOutcome::CompletionPending(pending) =
        service.contribute(epic_id, 0, 1, &at(6, 9)).unwrap()
    else {
        panic!("final contribution should be intercepted");
    };
    service
        .confirm_completion(&pending, DifficultyRating::Perfect, None, &at(6, 9))
        .unwrap();
    service.generate_next(epic_id, None).unwrap();

    let err = service.contribute(epic_id, 0, 1, &at(6, 20)).unwrap_err();
    assert!(matches!(
        err,
        QuestError::CooldownActive { until_ms, .. } if until_ms == at(7, 0).timestamp_millis()
    ));

    assert_eq!(
        service.contribute(epic_id, 0, 1, &at(7, 8)).unwrap(),
        ContributionOutcome::Recorded { new_current: 1 }
    );
}

#[test]
fn confirming_twice_is_rejected_as_stale() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let epic =
        EpicMission::new("Scales", Rank::E, "Learn Piano", 4, Some(daily("Scales 1", 1, 0, 10)));
    let epic_id = epic.id;
    service.insert_epic_mission(epic).unwrap();

    let ContributionOutcome::CompletionPending(pending) =
        service.contribute(epic_id, 0, 1, &at(8, 9)).unwrap()
    else {
        panic!("final contribution should be intercepted");
    };
    service
        .confirm_completion(&pending, DifficultyRating::Perfect, None, &at(8, 9))
        .unwrap();
    let err = service
        .confirm_completion(&pending, DifficultyRating::Perfect, None, &at(8, 9))
        .unwrap_err();
    assert!(matches!(err, QuestError::StaleCompletion(id) if id == epic_id));
    assert_eq!(sink.events.borrow().len(), 1);
}

#[test]
fn day_boundary_generates_for_awaiting_epics_only() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let mut profile = PlayerProfile::default();
    let mut goal = Goal::new("Learn Piano");
    goal.deadline = chrono::NaiveDate::from_ymd_opt(2026, 6, 30);
    profile.goals.push(goal);
    service.save_profile(&profile).unwrap();

    let mut awaiting = EpicMission::new("Scales", Rank::E, "Learn Piano", 3, None);
    awaiting.daily_missions.push(completed_daily("Scales 1"));
    let active =
        EpicMission::new("Laps", Rank::F, "Swim", 3, Some(daily("Laps 1", 4, 0, 10)));
    let mut locked = EpicMission::new("Sonata", Rank::A, "Learn Piano", 3, None);
    locked.level_requirement = 20;
    let (awaiting_id, active_id, locked_id) = (awaiting.id, active.id, locked.id);
    for epic in [awaiting, active, locked] {
        service.insert_epic_mission(epic).unwrap();
    }

    let gate = service.orchestrator().gate();
    let mut scheduler = CooldownScheduler::starting_at(&at(9, 23));
    assert_eq!(scheduler.tick(&at(9, 23), gate, &service), TickOutcome::Idle);
    assert_eq!(scheduler.tick(&at(10, 0), gate, &service), TickOutcome::Triggered);

    let state = service.load_state().unwrap();
    assert_eq!(state.epic_state(awaiting_id), Some(EpicState::Active));
    assert_eq!(state.epic(active_id).unwrap().daily_missions.len(), 1);
    assert_eq!(state.epic_state(locked_id), Some(EpicState::Locked));

    let requests = generator.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].goal_deadline, chrono::NaiveDate::from_ymd_opt(2026, 6, 30));
}

#[test]
fn breakthrough_generation_unlocks_locked_epic() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let mut locked = EpicMission::new("Sonata", Rank::A, "Learn Piano", 3, None);
    locked.level_requirement = 20;
    let locked_id = locked.id;
    service.insert_epic_mission(locked).unwrap();

    let report = service.generate_pending_missions().unwrap();
    assert!(report.generated.is_empty());

    service.generate_next(locked_id, None).unwrap();
    let state = service.load_state().unwrap();
    assert_eq!(state.epic_state(locked_id), Some(EpicState::Active));
    assert!(generator.requests.borrow()[0]
        .feedback_text
        .contains("breakthrough"));
}

#[test]
fn transport_failure_is_reported_per_mission_in_batch() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let mut first = EpicMission::new("Laps", Rank::F, "Swim", 3, None);
    first.daily_missions.push(completed_daily("Laps 1"));
    let mut second = EpicMission::new("Scales", Rank::F, "Piano", 3, None);
    second.daily_missions.push(completed_daily("Scales 1"));
    let (first_id, second_id) = (first.id, second.id);
    service.insert_epic_mission(first).unwrap();
    service.insert_epic_mission(second).unwrap();

    generator.push(Err(TransportError::new("connection reset")));
    let report = service.generate_pending_missions().unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, first_id);
    assert!(matches!(report.failed[0].1, GenerationError::Transport(_)));
    assert_eq!(report.generated.len(), 1);
    assert_eq!(report.generated[0].0, second_id);
}

#[test]
fn day_boundary_waits_for_the_service_generation_to_finish() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let mut awaiting = EpicMission::new("Scales", Rank::E, "Learn Piano", 3, None);
    awaiting.daily_missions.push(completed_daily("Scales 1"));
    let awaiting_id = awaiting.id;
    service.insert_epic_mission(awaiting).unwrap();

    let gate = service.orchestrator().gate();
    let mut scheduler = CooldownScheduler::starting_at(&at(11, 22));
    let guard = gate.try_acquire(awaiting_id).unwrap();
    assert_eq!(
        scheduler.tick(&at(12, 0), gate, &service),
        TickOutcome::DeferredInFlight
    );
    assert!(generator.requests.borrow().is_empty());
    assert_eq!(
        service.load_state().unwrap().epic_state(awaiting_id),
        Some(EpicState::Awaiting)
    );

    drop(guard);
    assert_eq!(scheduler.tick(&at(12, 1), gate, &service), TickOutcome::Triggered);
    assert_eq!(
        service.load_state().unwrap().epic_state(awaiting_id),
        Some(EpicState::Active)
    );
    assert_eq!(scheduler.tick(&at(12, 2), gate, &service), TickOutcome::Idle);
    assert_eq!(generator.requests.borrow().len(), 1);
}

#[test]
fn pending_trigger_reports_store_failures_as_store_errors() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    SqliteSnapshotStore::new(&conn)
        .put_raw("epic_missions", "{ not json")
        .unwrap();

    let err = service.generate_pending().unwrap_err();
    assert!(matches!(
        err,
        QuestError::Store(StoreError::InvalidData { ref key, .. }) if key == "epic_missions"
    ));
    assert!(generator.requests.borrow().is_empty());
}

#[test]
fn oversized_generated_reward_is_capped_before_propagation() {
    let conn = open_db_in_memory().unwrap();
    let generator = ScriptedGenerator::default();
    let sink = RecordingSink::new(&conn);
    let service = service(&conn, &generator, &sink);

    let mut epic = EpicMission::new("Scales", Rank::E, "Learn Piano", 4, None);
    epic.daily_missions.push(completed_daily("Scales 1"));
    let epic_id = epic.id;
    service.insert_epic_mission(epic).unwrap();

    let mut greedy = valid_response("Jackpot");
    greedy.xp = Some(u64::MAX);
    greedy.fragments = Some(u64::MAX);
    generator.push(Ok(greedy));
    let generated = service.generate_next(epic_id, None).unwrap();
    let config = EngineConfig::default();
    assert_eq!(generated.xp_reward, config.max_xp_reward);

    let ContributionOutcome::CompletionPending(pending) =
        service.contribute(epic_id, 0, 10, &at(13, 9)).unwrap()
    else {
        panic!("final contribution should be intercepted");
    };
    let event = service
        .confirm_completion(&pending, DifficultyRating::Perfect, None, &at(13, 9))
        .unwrap();
    assert_eq!(event.xp_gained, config.max_xp_reward);
    assert_eq!(event.fragments_gained, config.max_fragment_reward);

    let profile = service.load_state().unwrap().profile;
    assert_eq!(profile.level, event.new_level);
    assert!(profile.xp < config.xp_threshold(profile.level));
}
