//! Quest progression use-case service.
//!
//! # Responsibility
//! - Load and persist whole-collection snapshots through `SnapshotStore`.
//! - Route contributions through the ledger, intercepting daily completion
//!   until difficulty feedback is supplied.
//! - Propagate rewards, emit progression events and advance the lifecycle.
//! - Invoke the orchestrator for single and batch generation.
//!
//! # Invariants
//! - State is passed in explicitly (store + collaborators); no globals.
//! - Every write replaces the affected collection or object wholesale.
//! - The progression event is emitted before the completion is persisted.
//! - Manual missions never reach feedback, rewards or generation.

use crate::generation::generator::ContentGenerator;
use crate::generation::orchestrator::{GenerationContext, GenerationError, GenerationOrchestrator};
use crate::model::feedback::{DifficultyRating, ProgressionEvent};
use crate::model::mission::{DailyMission, EpicMission, ManualMission, MissionId, MissionRef};
use crate::model::profile::PlayerProfile;
use crate::progression::cooldown::{epic_locked_until, PendingGenerationTrigger};
use crate::progression::feedback::translate;
use crate::progression::ledger::{contribute, LedgerError};
use crate::progression::lifecycle::{complete_active, epic_state, EpicState, LifecycleError};
use crate::progression::reward::propagate;
use crate::progression::selector::{select, SelectionQuery};
use crate::repo::snapshot_repo::{
    SnapshotStore, StoreError, EPIC_MISSIONS_KEY, MANUAL_MISSIONS_KEY, PROFILE_KEY,
};
use chrono::{DateTime, TimeZone};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Presentation layer collaborator receiving completion events.
pub trait PresentationSink {
    fn on_progression(&self, event: &ProgressionEvent);
}

/// Service error for quest use-cases.
#[derive(Debug)]
pub enum QuestError {
    /// No epic or manual mission has this ID.
    MissionNotFound(MissionId),
    /// Epic is in its daily cooldown until the given epoch milliseconds.
    CooldownActive { mission_id: MissionId, until_ms: i64 },
    /// Pending completion no longer matches the stored mission.
    StaleCompletion(MissionId),
    Contribution(LedgerError),
    Lifecycle(LifecycleError),
    Generation(GenerationError),
    Store(StoreError),
}

impl Display for QuestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissionNotFound(id) => write!(f, "mission not found: {id}"),
            Self::CooldownActive {
                mission_id,
                until_ms,
            } => write!(
                f,
                "mission {mission_id} is cooling down until epoch ms {until_ms}"
            ),
            Self::StaleCompletion(id) => {
                write!(f, "pending completion is stale for mission {id}")
            }
            Self::Contribution(err) => write!(f, "{err}"),
            Self::Lifecycle(err) => write!(f, "{err}"),
            Self::Generation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QuestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Contribution(err) => Some(err),
            Self::Lifecycle(err) => Some(err),
            Self::Generation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LedgerError> for QuestError {
    fn from(value: LedgerError) -> Self {
        Self::Contribution(value)
    }
}

impl From<LifecycleError> for QuestError {
    fn from(value: LifecycleError) -> Self {
        Self::Lifecycle(value)
    }
}

impl From<GenerationError> for QuestError {
    fn from(value: GenerationError) -> Self {
        Self::Generation(value)
    }
}

impl From<StoreError> for QuestError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Snapshot of everything the engine reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestState {
    pub profile: PlayerProfile,
    pub epic_missions: Vec<EpicMission>,
    pub manual_missions: Vec<ManualMission>,
}

impl QuestState {
    pub fn epic(&self, id: MissionId) -> Option<&EpicMission> {
        self.epic_missions.iter().find(|epic| epic.id == id)
    }

    pub fn manual(&self, id: MissionId) -> Option<&ManualMission> {
        self.manual_missions.iter().find(|manual| manual.id == id)
    }

    /// Lifecycle state of one epic at the current player level.
    pub fn epic_state(&self, id: MissionId) -> Option<EpicState> {
        self.epic(id)
            .map(|epic| epic_state(epic, self.profile.level))
    }

    /// Ordered display list for `query`.
    pub fn select(&self, query: &SelectionQuery) -> Vec<MissionRef<'_>> {
        select(&self.epic_missions, &self.manual_missions, query)
    }

    fn with_epic(&self, updated: EpicMission) -> Vec<EpicMission> {
        self.epic_missions
            .iter()
            .map(|epic| {
                if epic.id == updated.id {
                    updated.clone()
                } else {
                    epic.clone()
                }
            })
            .collect()
    }
}

/// Completion intercepted by the ledger, awaiting difficulty feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCompletion {
    pub mission_id: MissionId,
    pub daily_id: MissionId,
    pub sub_task_index: usize,
    pub amount: i64,
}

/// Outcome of one contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionOutcome {
    /// Progress stored; mission still open.
    Recorded { new_current: u32 },
    /// Final contribution of a daily mission; nothing stored until
    /// `confirm_completion` receives a rating.
    CompletionPending(PendingCompletion),
    /// Manual mission finished and stored directly.
    ManualCompleted,
}

/// Per-mission result of batch pending generation.
#[derive(Debug, Default)]
pub struct PendingGenerationReport {
    pub generated: Vec<(MissionId, DailyMission)>,
    pub failed: Vec<(MissionId, GenerationError)>,
}

/// Quest progression facade over store and collaborators.
pub struct QuestService<S: SnapshotStore, G: ContentGenerator, P: PresentationSink> {
    store: S,
    orchestrator: GenerationOrchestrator<G>,
    sink: P,
}

impl<S: SnapshotStore, G: ContentGenerator, P: PresentationSink> QuestService<S, G, P> {
    pub fn new(store: S, orchestrator: GenerationOrchestrator<G>, sink: P) -> Self {
        Self {
            store,
            orchestrator,
            sink,
        }
    }

    pub fn orchestrator(&self) -> &GenerationOrchestrator<G> {
        &self.orchestrator
    }

    /// Loads all snapshots; absent keys start empty.
    pub fn load_state(&self) -> Result<QuestState, QuestError> {
        Ok(QuestState {
            profile: self.store.load(PROFILE_KEY)?.unwrap_or_default(),
            epic_missions: self.store.load(EPIC_MISSIONS_KEY)?.unwrap_or_default(),
            manual_missions: self.store.load(MANUAL_MISSIONS_KEY)?.unwrap_or_default(),
        })
    }

    pub fn save_profile(&self, profile: &PlayerProfile) -> Result<(), QuestError> {
        self.store.persist(PROFILE_KEY, profile)?;
        Ok(())
    }

    /// Stores an epic mission created by the goal-creation flow.
    pub fn insert_epic_mission(&self, epic: EpicMission) -> Result<(), QuestError> {
        let mut epics = self.load_state()?.epic_missions;
        epics.push(epic);
        self.store.persist(EPIC_MISSIONS_KEY, &epics)?;
        Ok(())
    }

    /// Stores a user-authored manual mission.
    pub fn insert_manual_mission(&self, manual: ManualMission) -> Result<(), QuestError> {
        let mut manuals = self.load_state()?.manual_missions;
        manuals.push(manual);
        self.store.persist(MANUAL_MISSIONS_KEY, &manuals)?;
        Ok(())
    }

    /// Applies `amount` to one subtask of an epic's active daily or of a
    /// manual mission.
    ///
    /// A contribution that would complete a daily mission is not stored; it
    /// is returned as `CompletionPending` for `confirm_completion`.
    pub fn contribute<Tz: TimeZone>(
        &self,
        mission_id: MissionId,
        sub_task_index: usize,
        amount: i64,
        now: &DateTime<Tz>,
    ) -> Result<ContributionOutcome, QuestError> {
        let state = self.load_state()?;

        if let Some(epic) = state.epic(mission_id) {
            if let Some(until) = epic_locked_until(epic, &now.timezone()) {
                if *now < until {
                    info!(
                        "event=contribution module=service status=rejected mission_id={mission_id} reason=cooldown"
                    );
                    return Err(QuestError::CooldownActive {
                        mission_id,
                        until_ms: until.timestamp_millis(),
                    });
                }
            }

            let index = epic
                .active_daily_index()
                .ok_or(LifecycleError::NoActiveDaily(mission_id))?;
            let daily = &epic.daily_missions[index];
            let contribution =
                contribute(&daily.sub_tasks, sub_task_index, amount).map_err(|err| {
                    info!(
                        "event=contribution module=service status=rejected mission_id={mission_id} error={err}"
                    );
                    err
                })?;

            if contribution.mission_now_complete {
                info!("event=completion module=service status=pending mission_id={mission_id}");
                return Ok(ContributionOutcome::CompletionPending(PendingCompletion {
                    mission_id,
                    daily_id: daily.id,
                    sub_task_index,
                    amount,
                }));
            }

            let mut updated = epic.clone();
            updated.daily_missions[index].sub_tasks = contribution.sub_tasks;
            self.store
                .persist(EPIC_MISSIONS_KEY, &state.with_epic(updated))?;
            info!(
                "event=contribution module=service status=ok mission_id={mission_id} new_current={}",
                contribution.new_current
            );
            return Ok(ContributionOutcome::Recorded {
                new_current: contribution.new_current,
            });
        }

        let manual = state
            .manual(mission_id)
            .ok_or(QuestError::MissionNotFound(mission_id))?;
        let contribution = contribute(&manual.sub_tasks, sub_task_index, amount)?;
        let mut updated = manual.clone();
        updated.sub_tasks = contribution.sub_tasks;
        updated.completed = contribution.mission_now_complete;

        let manuals: Vec<ManualMission> = state
            .manual_missions
            .iter()
            .map(|existing| {
                if existing.id == mission_id {
                    updated.clone()
                } else {
                    existing.clone()
                }
            })
            .collect();
        self.store.persist(MANUAL_MISSIONS_KEY, &manuals)?;

        if contribution.mission_now_complete {
            info!("event=manual_complete module=service status=ok mission_id={mission_id}");
            Ok(ContributionOutcome::ManualCompleted)
        } else {
            Ok(ContributionOutcome::Recorded {
                new_current: contribution.new_current,
            })
        }
    }

    /// Commits an intercepted daily completion with its difficulty rating.
    ///
    /// Emits the progression event to the presentation sink, then persists
    /// the profile delta and the completed daily mission.
    pub fn confirm_completion<Tz: TimeZone>(
        &self,
        pending: &PendingCompletion,
        rating: DifficultyRating,
        free_text: Option<&str>,
        now: &DateTime<Tz>,
    ) -> Result<ProgressionEvent, QuestError> {
        let state = self.load_state()?;
        let epic = state
            .epic(pending.mission_id)
            .ok_or(QuestError::MissionNotFound(pending.mission_id))?;
        let index = epic
            .active_daily_index()
            .filter(|index| epic.daily_missions[*index].id == pending.daily_id)
            .ok_or(QuestError::StaleCompletion(pending.mission_id))?;

        let daily = &epic.daily_missions[index];
        let contribution = contribute(&daily.sub_tasks, pending.sub_task_index, pending.amount)?;
        if !contribution.mission_now_complete {
            return Err(QuestError::StaleCompletion(pending.mission_id));
        }

        let mut with_progress = epic.clone();
        with_progress.daily_missions[index].sub_tasks = contribution.sub_tasks;
        let directive = translate(rating, free_text);
        let completed = complete_active(&with_progress, now.timestamp_millis(), Some(directive))?;

        let reward = propagate(
            &state.profile,
            &daily.name,
            daily.xp_reward,
            daily.item_reward,
            self.orchestrator.config(),
        );
        self.sink.on_progression(&reward.event);
        if reward.event.level_up {
            info!(
                "event=level_up module=service status=ok new_level={}",
                reward.event.new_level
            );
        }

        self.store.persist(PROFILE_KEY, &reward.profile)?;
        self.store
            .persist(EPIC_MISSIONS_KEY, &state.with_epic(completed))?;
        info!(
            "event=completion module=service status=ok mission_id={} rating={} xp_gained={}",
            pending.mission_id,
            rating.as_str(),
            reward.event.xp_gained
        );
        Ok(reward.event)
    }

    /// Requests and stores the next daily mission for one epic.
    ///
    /// `feedback` overrides the epic's pending directive when given.
    pub fn generate_next(
        &self,
        mission_id: MissionId,
        feedback: Option<(DifficultyRating, Option<&str>)>,
    ) -> Result<DailyMission, QuestError> {
        let state = self.load_state()?;
        let epic = state
            .epic(mission_id)
            .ok_or(QuestError::MissionNotFound(mission_id))?;
        let directive = feedback.map(|(rating, free_text)| translate(rating, free_text));
        let context = GenerationContext {
            goal: state.profile.goal(&epic.goal_name),
            user_level: state.profile.level,
        };

        let generated = self
            .orchestrator
            .generate_next(epic, &context, directive.as_ref())?;
        self.store
            .persist(EPIC_MISSIONS_KEY, &state.with_epic(generated.epic))?;
        Ok(generated.daily)
    }

    /// Generates for every `Awaiting` epic, one request at a time.
    ///
    /// Locked epics are skipped: they only open through an explicit
    /// breakthrough request. Failures are collected, never retried.
    pub fn generate_pending_missions(&self) -> Result<PendingGenerationReport, QuestError> {
        let initial = self.load_state()?;
        let awaiting: Vec<MissionId> = initial
            .epic_missions
            .iter()
            .filter(|epic| epic_state(epic, initial.profile.level) == EpicState::Awaiting)
            .map(|epic| epic.id)
            .collect();

        let mut report = PendingGenerationReport::default();
        for mission_id in awaiting {
            match self.generate_next(mission_id, None) {
                Ok(daily) => report.generated.push((mission_id, daily)),
                Err(QuestError::Generation(err)) => {
                    warn!(
                        "event=pending_generation module=service status=error mission_id={mission_id} error={err}"
                    );
                    report.failed.push((mission_id, err));
                }
                Err(other) => return Err(other),
            }
        }

        info!(
            "event=pending_generation module=service status=ok generated={} failed={}",
            report.generated.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

impl<S, G, P> PendingGenerationTrigger for QuestService<S, G, P>
where
    S: SnapshotStore,
    G: ContentGenerator,
    P: PresentationSink,
{
    type Error = QuestError;

    /// Per-mission generation failures are reported by
    /// `generate_pending_missions` and logged there; only load or store
    /// failures surface here.
    fn generate_pending(&self) -> Result<(), QuestError> {
        self.generate_pending_missions().map(|_| ())
    }
}
