//! Per-display reconciliation of server events with the wheel and timers.
//!
//! A `DisplaySession` is owned by exactly one page. Every inbound event and
//! every user action goes through it, one at a time, and it answers with the
//! frames the page must send back to the server.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::WheelConfig;
use crate::constants::{PARTICIPANTS, SPIN_FAILED_ERROR, TIME_EXPIRED_NOTICE};
use crate::error::SessionError;
use crate::protocol::{
    ActionAck, AddTimeRequest, ClientRequest, CurrentState, GameState, GameStateUpdate, ServerEvent, SpinAck, Task,
    TaskSelected, VerifySecretRequest, WheelSpinning,
};
use crate::rotation_store::{KeyValueStore, RotationStateStore};
use crate::slave_state;
use crate::timer::{ParticipantId, TimerReconciler, TimerUpdate};
use crate::wheel::{SpinPhase, WheelSpinEngine, WheelState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Controls,
    Slave(ParticipantId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Info, text: text.into() }
    }

    fn success(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, text: text.into() }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, text: text.into() }
    }
}

/// A request ready for the wire, with its acknowledgement id if one is expected.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub request: ClientRequest,
    pub ack: Option<u32>,
}

impl Outbound {
    pub fn encode(&self) -> String {
        self.request.encode(self.ack)
    }
}

/// One wheel slice as drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    pub index: usize,
    pub label: String,
    pub used: bool,
}

fn short_label(name: &str) -> String {
    if name.chars().count() > 15 {
        let head: String = name.chars().take(12).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlaveScreen {
    #[default]
    Waiting,
    Task,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlaveView {
    pub screen: SlaveScreen,
    pub solved: bool,
    pub input_locked: bool,
    pub submitting: bool,
    /// Locked because the countdown hit zero rather than because of a solve.
    pub expired: bool,
}

pub struct DisplaySession {
    role: Role,
    config: WheelConfig,
    tasks: Vec<Task>,
    wheel: WheelState,
    engine: WheelSpinEngine,
    timers: TimerReconciler,
    rotation_store: RotationStateStore<Box<dyn KeyValueStore>>,
    local_store: Box<dyn KeyValueStore>,
    game_state: GameState,
    current_task: Option<Task>,
    last_server_index: Option<usize>,
    saved_rotation_applied: bool,
    player_names: BTreeMap<ParticipantId, String>,
    solutions: BTreeMap<ParticipantId, bool>,
    used_count: Option<usize>,
    total_count: Option<usize>,
    controls_spin_pending: bool,
    /// Spin the server committed before the sector list arrived.
    deferred_spin: Option<(Task, usize)>,
    slave: SlaveView,
    notice: Option<Notice>,
    next_ack: u32,
    pending: BTreeMap<u32, ClientRequest>,
}

impl DisplaySession {
    pub fn new(
        role: Role,
        config: WheelConfig,
        rotation_backend: Box<dyn KeyValueStore>,
        local_backend: Box<dyn KeyValueStore>,
    ) -> Self {
        let rotation_store = RotationStateStore::new(
            rotation_backend,
            config.rotation_key.clone(),
            config.rotation_max_age_secs,
        );
        Self {
            role,
            engine: WheelSpinEngine::new(config.clone()),
            config,
            tasks: Vec::new(),
            wheel: WheelState::default(),
            timers: TimerReconciler::new(),
            rotation_store,
            local_store: local_backend,
            game_state: GameState::Waiting,
            current_task: None,
            last_server_index: None,
            saved_rotation_applied: false,
            player_names: default_player_names(),
            solutions: default_solutions(),
            used_count: None,
            total_count: None,
            controls_spin_pending: false,
            deferred_spin: None,
            slave: SlaveView::default(),
            notice: None,
            next_ack: 1,
            pending: BTreeMap::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn wheel(&self) -> &WheelState {
        &self.wheel
    }

    pub fn engine(&self) -> &WheelSpinEngine {
        &self.engine
    }

    pub fn timers(&self) -> &TimerReconciler {
        &self.timers
    }

    pub fn game_state(&self) -> GameState {
        self.game_state
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current_task.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn player_name(&self, id: ParticipantId) -> String {
        self.player_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Player {}", id))
    }

    pub fn solved(&self, id: ParticipantId) -> bool {
        self.solutions.get(&id).copied().unwrap_or(false)
    }

    pub fn solutions(&self) -> &BTreeMap<ParticipantId, bool> {
        &self.solutions
    }

    pub fn used_count(&self) -> usize {
        self.used_count.unwrap_or(self.wheel.used.len())
    }

    pub fn total_count(&self) -> usize {
        self.total_count.unwrap_or(self.tasks.len())
    }

    pub fn slave_view(&self) -> &SlaveView {
        &self.slave
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Shows a locally refused action. A repeated spin click stays silent.
    pub fn report(&mut self, err: &SessionError) {
        if *err == SessionError::SpinInFlight {
            log::debug!("{}", err);
            return;
        }
        self.notice = Some(Notice::error(err.to_string()));
    }

    pub fn sectors(&self) -> Vec<Sector> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(index, task)| Sector {
                index,
                label: short_label(&task.name),
                used: self.wheel.is_used(index),
            })
            .collect()
    }

    /// Rotation to draw right now, mid-animation or settled.
    pub fn displayed_rotation(&self, now_ms: f64) -> f64 {
        self.engine.rotation_at(&self.wheel, now_ms)
    }

    pub fn is_spinning(&self) -> bool {
        self.engine.phase() != SpinPhase::Idle
    }

    pub fn can_spin(&self) -> bool {
        let busy = match self.role {
            Role::Master => self.engine.is_busy(),
            Role::Controls => self.controls_spin_pending,
            Role::Slave(_) => return false,
        };
        !busy && self.game_state != GameState::Active
    }

    /// Requests sent right after the socket opens.
    pub fn on_connect(&mut self) -> Vec<Outbound> {
        let mut requests = Vec::new();
        if matches!(self.role, Role::Master | Role::Controls) {
            requests.push(ClientRequest::JoinMasterRoom);
        }
        requests.push(ClientRequest::GetCurrentState);
        requests.push(ClientRequest::GetTimerState);
        requests.into_iter().map(|r| self.outbound(r)).collect()
    }

    /// Restores what a reloaded page had before it went away.
    pub fn restore(&mut self) {
        if let Role::Slave(id) = self.role {
            if let Some(snapshot) = slave_state::load(&*self.local_store, id) {
                log::info!("restored player {} state", id);
                self.slave.solved = snapshot.task_solved;
                self.show_task(snapshot.current_task);
                if self.slave.solved {
                    self.slave.input_locked = true;
                    self.notice = Some(Notice::success("Task completed! (State restored)"));
                }
            }
        }
    }

    /// Installs the sector list once the task catalogue has loaded.
    ///
    /// A spin acknowledged before this point starts now, from the saved angle.
    pub fn set_tasks(&mut self, tasks: Vec<Task>, now_ms: f64) {
        self.wheel.sector_count = tasks.len();
        self.tasks = tasks;
        if !self.saved_rotation_applied {
            self.apply_saved_rotation();
            self.saved_rotation_applied = true;
        }
        if let Some((task, index)) = self.deferred_spin.take() {
            self.start_spin(task, index, now_ms);
            return;
        }
        if let Some(index) = self.last_server_index {
            if !self.is_spinning() {
                self.align_to(index);
            }
        }
    }

    /// Persists the settled angle before the page goes away.
    pub fn teardown(&mut self) {
        if self.role == Role::Master {
            self.rotation_store.save(self.wheel.rotation);
        }
    }

    pub fn handle_event(&mut self, event: ServerEvent, now_ms: f64) -> Vec<Outbound> {
        match event {
            ServerEvent::CurrentState(state) => {
                self.on_current_state(state, now_ms);
                Vec::new()
            }
            ServerEvent::TaskSelected(selected) => {
                self.on_task_selected(selected, now_ms);
                Vec::new()
            }
            ServerEvent::WheelSpinning(spin) => {
                self.on_wheel_spinning(spin, now_ms);
                Vec::new()
            }
            ServerEvent::GameStateUpdate(update) => {
                self.on_game_state_update(update, now_ms);
                vec![self.outbound(ClientRequest::GetTimerState)]
            }
            ServerEvent::TimerUpdate(timers) => {
                self.timers.ingest_snapshot(timers, now_ms);
                Vec::new()
            }
            ServerEvent::GameReset => {
                self.on_game_reset();
                Vec::new()
            }
            ServerEvent::SlavesReset => {
                if let Role::Slave(id) = self.role {
                    self.slave.solved = false;
                    self.slave.input_locked = false;
                    self.slave.submitting = false;
                    self.slave.expired = false;
                    self.notice = None;
                    self.solutions.insert(id, false);
                    if self.current_task.is_some() {
                        slave_state::save(&mut *self.local_store, id, self.current_task.as_ref(), false, now_ms);
                    }
                }
                Vec::new()
            }
            ServerEvent::RoundCanceled => {
                self.on_round_canceled();
                Vec::new()
            }
            ServerEvent::Ack(ack) => {
                match self.pending.remove(&ack.id) {
                    Some(request) => self.on_ack(request, ack.payload, now_ms),
                    None => log::warn!("ack {} matches no pending request", ack.id),
                }
                Vec::new()
            }
        }
    }

    fn on_current_state(&mut self, state: CurrentState, now_ms: f64) {
        if let Some(names) = state.player_names {
            self.player_names = names;
        }
        self.game_state = state.game_state;
        self.used_count = state.used_count.or(self.used_count);
        self.total_count = state.total_count.or(self.total_count);
        let solutions = state.slave_solutions.unwrap_or_else(default_solutions);

        match self.role {
            Role::Master => {
                if let Some(task) = state.current_task {
                    if let Some(index) = self.index_of(&task) {
                        self.last_server_index = Some(index);
                        if !self.is_spinning() {
                            self.align_to(index);
                        }
                    }
                    self.current_task = Some(task);
                }
                if let Some(used) = state.used_indices {
                    self.replace_used(used);
                }
                self.solutions = solutions;
            }
            Role::Controls => {
                self.current_task = state.current_task;
                self.solutions = solutions;
            }
            Role::Slave(id) => {
                self.solutions = solutions;
                match state.current_task {
                    Some(task) => {
                        let solved = self.solved(id);
                        slave_state::save(&mut *self.local_store, id, Some(&task), solved, now_ms);
                        self.slave.solved = solved;
                        self.show_task(Some(task));
                    }
                    None => {
                        slave_state::clear(&mut *self.local_store, id);
                        self.show_waiting();
                    }
                }
            }
        }
    }

    fn on_task_selected(&mut self, selected: TaskSelected, now_ms: f64) {
        self.used_count = selected.used_count.or(self.used_count);
        self.total_count = selected.total_count.or(self.total_count);

        match self.role {
            Role::Master => {
                if let Some(used) = selected.used_indices {
                    if !self.is_spinning() {
                        self.wheel.used = used.into_iter().collect();
                    }
                }
                let index = self.index_of(&selected.task).or(selected.task_index);
                self.current_task = Some(selected.task);
                if let Some(index) = index {
                    self.last_server_index = Some(index);
                    if !self.is_spinning() {
                        self.align_to(index);
                    }
                }
            }
            Role::Controls => {
                self.current_task = Some(selected.task);
            }
            Role::Slave(id) => {
                slave_state::save(&mut *self.local_store, id, Some(&selected.task), false, now_ms);
                self.slave.solved = false;
                self.show_task(Some(selected.task));
            }
        }
    }

    fn on_wheel_spinning(&mut self, spin: WheelSpinning, now_ms: f64) {
        if self.role != Role::Master || self.is_spinning() {
            return;
        }
        self.start_spin(spin.task, spin.task_index, now_ms);
    }

    fn on_game_state_update(&mut self, update: GameStateUpdate, now_ms: f64) {
        self.game_state = update.game_state;
        self.solutions = update.slave_solutions.unwrap_or_else(default_solutions);
        if let Some(names) = update.player_names {
            self.player_names = names;
        }

        match self.role {
            Role::Master => {
                if let Some(used) = update.used_indices {
                    self.replace_used(used);
                }
            }
            Role::Controls => {
                self.current_task = update.current_task;
                self.controls_spin_pending = false;
            }
            Role::Slave(id) => {
                if self.solved(id) && !self.slave.solved {
                    self.slave.solved = true;
                    self.slave.input_locked = true;
                    self.notice = Some(Notice::success("Task completed!"));
                    slave_state::save(&mut *self.local_store, id, self.current_task.as_ref(), true, now_ms);
                }
                if self.game_state == GameState::Waiting {
                    slave_state::clear(&mut *self.local_store, id);
                    self.show_waiting();
                }
            }
        }
    }

    fn on_game_reset(&mut self) {
        self.game_state = GameState::Waiting;
        self.current_task = None;
        self.last_server_index = None;
        self.solutions = default_solutions();
        self.used_count = None;

        match self.role {
            Role::Master => {
                self.engine.abort();
                self.deferred_spin = None;
                self.wheel.reset();
                self.rotation_store.clear();
            }
            Role::Controls => {
                self.controls_spin_pending = false;
            }
            Role::Slave(id) => {
                slave_state::clear(&mut *self.local_store, id);
                self.show_waiting();
            }
        }
    }

    fn on_round_canceled(&mut self) {
        self.game_state = GameState::Waiting;
        self.current_task = None;
        self.last_server_index = None;
        self.solutions = default_solutions();
        if let Role::Slave(id) = self.role {
            slave_state::clear(&mut *self.local_store, id);
            self.show_waiting();
        }
    }

    fn on_ack(&mut self, request: ClientRequest, payload: serde_json::Value, now_ms: f64) {
        if let ClientRequest::SpinWheel = request {
            let ack: SpinAck = serde_json::from_value(payload).unwrap_or_default();
            self.on_spin_ack(ack, now_ms);
            return;
        }

        let ack: ActionAck = serde_json::from_value(payload).unwrap_or_default();
        match request {
            ClientRequest::VerifySecret(_) => self.on_verify_ack(ack, now_ms),
            ClientRequest::ResetSlaves if ack.success => {
                self.notice = Some(Notice::info("Slaves have been reset to waiting state"));
            }
            ClientRequest::AddTimeToSlave(request) if ack.success => {
                log::info!("added {} seconds to player {}", request.seconds, request.slave_id);
            }
            other if !ack.success => {
                let reason = ack.error.unwrap_or_else(|| format!("{} failed", other.event_name()));
                log::error!("{}", reason);
                self.notice = Some(Notice::error(SessionError::Rejected(reason).to_string()));
            }
            _ => {}
        }
    }

    fn on_spin_ack(&mut self, ack: SpinAck, now_ms: f64) {
        match self.role {
            Role::Master => {
                if !ack.success {
                    let err = self.engine.spin_rejected(ack.error);
                    self.notice = Some(Notice::error(err.to_string()));
                    return;
                }
                match (ack.task, ack.task_index) {
                    (Some(task), Some(index)) => {
                        if !self.is_spinning() {
                            self.start_spin(task, index, now_ms);
                        }
                    }
                    _ => {
                        let err = self.engine.spin_rejected(None);
                        self.notice = Some(Notice::error(err.to_string()));
                    }
                }
            }
            Role::Controls => {
                if !ack.success {
                    self.controls_spin_pending = false;
                    let reason = ack.error.unwrap_or_else(|| SPIN_FAILED_ERROR.to_string());
                    self.notice = Some(Notice::error(SessionError::SpinRejected(reason).to_string()));
                }
            }
            Role::Slave(_) => {}
        }
    }

    fn on_verify_ack(&mut self, ack: ActionAck, now_ms: f64) {
        let Role::Slave(id) = self.role else {
            return;
        };
        self.slave.submitting = false;
        if ack.success {
            self.slave.solved = true;
            self.slave.input_locked = true;
            self.notice = Some(Notice::success(ack.message.unwrap_or_else(|| "Correct secret!".to_string())));
            slave_state::save(&mut *self.local_store, id, self.current_task.as_ref(), true, now_ms);
        } else {
            self.notice = Some(Notice::error(ack.error.unwrap_or_else(|| "Incorrect secret".to_string())));
        }
    }

    /// Animation frame: advances a running spin and reports it once it settles.
    pub fn on_frame(&mut self, now_ms: f64) -> Vec<Outbound> {
        let Some(settled) = self.engine.advance(&mut self.wheel, now_ms) else {
            return Vec::new();
        };
        self.current_task = self.tasks.get(settled.final_index).cloned();
        self.last_server_index = Some(settled.final_index);
        self.rotation_store.save(settled.rotation);
        vec![self.outbound(ClientRequest::WheelStopped {
            task_index: settled.final_index,
        })]
    }

    /// Render tick: the countdowns to show, or an empty map before any data.
    pub fn on_render_tick(&mut self, now_ms: f64) -> TimerUpdate {
        let shown = self.timers.compute_all(now_ms);
        if let Role::Slave(id) = self.role {
            if let Some(timer) = shown.get(&id) {
                self.apply_expiry(timer.remaining_seconds == 0);
            }
        }
        shown
    }

    /// Poll timer: asks for timers only while none have arrived.
    pub fn on_poll(&mut self) -> Option<Outbound> {
        if self.timers.has_snapshot() {
            None
        } else {
            Some(self.outbound(ClientRequest::GetTimerState))
        }
    }

    pub fn spin(&mut self) -> Result<Outbound, SessionError> {
        match self.role {
            Role::Master => {
                if self.game_state == GameState::Active {
                    return Err(SessionError::Rejected("Game is active".to_string()));
                }
                self.engine.request_spin()?;
            }
            Role::Controls => {
                if self.controls_spin_pending {
                    return Err(SessionError::SpinInFlight);
                }
                if self.game_state == GameState::Active {
                    return Err(SessionError::Rejected("Game is active".to_string()));
                }
                self.controls_spin_pending = true;
            }
            Role::Slave(_) => return Err(SessionError::Rejected("Players cannot spin".to_string())),
        }
        self.notice = None;
        Ok(self.outbound(ClientRequest::SpinWheel))
    }

    pub fn add_time(&mut self, slave_id: ParticipantId, seconds: u32) -> Result<Outbound, SessionError> {
        let request = AddTimeRequest::new(slave_id, seconds)?;
        Ok(self.outbound(ClientRequest::AddTimeToSlave(request)))
    }

    pub fn verify_secret(&mut self, secret: &str) -> Result<Outbound, SessionError> {
        let Role::Slave(id) = self.role else {
            return Err(SessionError::Rejected("Only players submit secrets".to_string()));
        };
        if self.slave.solved || self.slave.input_locked || self.slave.submitting {
            return Err(SessionError::Rejected("Input is locked".to_string()));
        }
        let request = match VerifySecretRequest::new(secret, id) {
            Ok(request) => request,
            Err(err) => {
                self.notice = Some(Notice::error(err.to_string()));
                return Err(err);
            }
        };
        self.slave.submitting = true;
        Ok(self.outbound(ClientRequest::VerifySecret(request)))
    }

    pub fn reset_game(&mut self) -> Outbound {
        self.outbound(ClientRequest::ResetGame)
    }

    pub fn reset_slaves(&mut self) -> Outbound {
        self.outbound(ClientRequest::ResetSlaves)
    }

    pub fn stop_game(&mut self) -> Outbound {
        self.outbound(ClientRequest::StopGame)
    }

    pub fn cancel_round(&mut self) -> Outbound {
        self.outbound(ClientRequest::CancelRound)
    }

    fn outbound(&mut self, request: ClientRequest) -> Outbound {
        let ack = if request.expects_ack() {
            let id = self.next_ack;
            self.next_ack = self.next_ack.wrapping_add(1).max(1);
            self.pending.insert(id, request.clone());
            Some(id)
        } else {
            None
        };
        Outbound { request, ack }
    }

    fn start_spin(&mut self, task: Task, index: usize, now_ms: f64) {
        if self.wheel.sector_count == 0 {
            log::info!("tasks not loaded yet, holding spin to {}", index);
            self.current_task = Some(task.clone());
            self.last_server_index = Some(index);
            self.deferred_spin = Some((task, index));
            return;
        }
        if self.engine.begin(&self.wheel, index, now_ms) {
            self.current_task = Some(task);
            self.last_server_index = Some(index);
        } else if self.engine.phase() == SpinPhase::Idle {
            self.notice = Some(Notice::error(SPIN_FAILED_ERROR));
        }
    }

    fn index_of(&self, task: &Task) -> Option<usize> {
        self.tasks.iter().position(|t| t.name == task.name)
    }

    fn align_to(&mut self, index: usize) {
        if self.wheel.sector_count == 0 {
            return;
        }
        self.wheel.align_to_index(index, self.config.pointer_angle);
        self.rotation_store.save(self.wheel.rotation);
    }

    fn apply_saved_rotation(&mut self) {
        if self.is_spinning() {
            return;
        }
        if let Some(angle) = self.rotation_store.load() {
            self.wheel.rotation = angle as f64;
        }
    }

    fn replace_used(&mut self, used: Vec<usize>) {
        if self.is_spinning() {
            return;
        }
        self.wheel.used = used.into_iter().collect::<BTreeSet<_>>();
        self.apply_saved_rotation();
        if let Some(index) = self.last_server_index {
            self.align_to(index);
        }
    }

    fn apply_expiry(&mut self, out_of_time: bool) {
        let view = &mut self.slave;
        if view.solved || view.screen != SlaveScreen::Task {
            return;
        }
        if out_of_time && !view.expired {
            view.expired = true;
            view.input_locked = true;
            self.notice = Some(Notice::error(TIME_EXPIRED_NOTICE));
        } else if !out_of_time && view.expired {
            // time was added after the countdown ran out
            view.expired = false;
            view.input_locked = false;
            if self.notice.as_ref().map_or(false, |n| n.text == TIME_EXPIRED_NOTICE) {
                self.notice = None;
            }
        }
    }

    fn show_task(&mut self, task: Option<Task>) {
        self.current_task = task;
        self.slave.screen = SlaveScreen::Task;
        self.slave.input_locked = self.slave.solved;
        self.slave.submitting = false;
        self.slave.expired = false;
    }

    fn show_waiting(&mut self) {
        self.slave = SlaveView::default();
        self.current_task = None;
    }
}

fn default_player_names() -> BTreeMap<ParticipantId, String> {
    PARTICIPANTS.iter().map(|id| (*id, format!("Player {}", id))).collect()
}

fn default_solutions() -> BTreeMap<ParticipantId, bool> {
    PARTICIPANTS.iter().map(|id| (*id, false)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Ack;
    use crate::rotation_store::MemoryStore;
    use crate::timer::TimerState;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.borrow().get(key)
        }

        fn set(&mut self, key: &str, value: &str, max_age_secs: Option<u64>) {
            self.0.borrow_mut().set(key, value, max_age_secs)
        }

        fn remove(&mut self, key: &str) {
            self.0.borrow_mut().remove(key)
        }
    }

    fn tasks(count: usize) -> Vec<Task> {
        (0..count)
            .map(|i| Task {
                name: format!("Task {}", i),
                category: "misc".to_string(),
                kind: "Static".to_string(),
                link: format!("task{}.zip", i),
                secret: Some(format!("secret{}", i)),
            })
            .collect()
    }

    fn session(role: Role) -> (DisplaySession, SharedStore, SharedStore) {
        let cookies = SharedStore::default();
        let local = SharedStore::default();
        let session = DisplaySession::new(
            role,
            WheelConfig::default(),
            Box::new(cookies.clone()),
            Box::new(local.clone()),
        );
        (session, cookies, local)
    }

    fn master(count: usize) -> (DisplaySession, SharedStore) {
        let (mut session, cookies, _) = session(Role::Master);
        session.set_tasks(tasks(count), 0.0);
        (session, cookies)
    }

    fn ack(outbound: &Outbound, payload: serde_json::Value) -> ServerEvent {
        ServerEvent::Ack(Ack {
            id: outbound.ack.expect("request expects an ack"),
            payload,
        })
    }

    fn settle(session: &mut DisplaySession, from: f64) -> Vec<Outbound> {
        let mut now = from;
        loop {
            let sent = session.on_frame(now);
            if !sent.is_empty() {
                return sent;
            }
            assert!(now < from + 60_000.0, "spin never settled");
            now += 16.0;
        }
    }

    #[test]
    fn connect_requests_depend_on_role() {
        let (mut controls, _, _) = session(Role::Controls);
        let names: Vec<_> = controls.on_connect().iter().map(|o| o.request.event_name()).collect();
        assert_eq!(names, ["join_master_room", "get_current_state", "get_timer_state"]);

        let (mut slave, _, _) = session(Role::Slave(1));
        let names: Vec<_> = slave.on_connect().iter().map(|o| o.request.event_name()).collect();
        assert_eq!(names, ["get_current_state", "get_timer_state"]);
    }

    #[test]
    fn master_spin_round_trip_reports_walked_sector() {
        let (mut session, cookies) = master(12);
        session.handle_event(
            ServerEvent::GameStateUpdate(GameStateUpdate {
                used_indices: Some(vec![5, 6]),
                ..Default::default()
            }),
            0.0,
        );

        let request = session.spin().unwrap();
        assert_eq!(request.request, ClientRequest::SpinWheel);
        assert_eq!(session.spin(), Err(SessionError::SpinInFlight));

        let task = session.tasks()[5].clone();
        session.handle_event(ack(&request, json!({"success": true, "task": task, "task_index": 5})), 100.0);
        assert!(session.is_spinning());

        // the room broadcast for the same spin must not restart it
        session.handle_event(
            ServerEvent::WheelSpinning(WheelSpinning { task: session.tasks()[5].clone(), task_index: 5 }),
            150.0,
        );

        let sent = settle(&mut session, 100.0);
        assert_eq!(sent, vec![Outbound { request: ClientRequest::WheelStopped { task_index: 7 }, ack: None }]);
        assert_eq!(session.current_task().unwrap().name, "Task 7");
        assert!(session.wheel().is_used(7));
        assert!(!session.is_spinning());

        let saved: i32 = cookies.get("wheel_rotation").unwrap().parse().unwrap();
        assert_eq!(saved, crate::rotation_store::persisted_angle(session.wheel().rotation));
    }

    #[test]
    fn rejected_spin_surfaces_server_reason() {
        let (mut session, _) = master(4);
        let request = session.spin().unwrap();
        session.handle_event(ack(&request, json!({"success": false, "error": "No tasks available"})), 0.0);

        assert!(!session.is_spinning());
        assert!(session.can_spin());
        assert_eq!(session.notice().unwrap().text, "No tasks available");
        assert_eq!(session.notice().unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn spin_acked_before_tasks_load_plays_once_they_arrive() {
        let (mut session, _, _) = session(Role::Master);
        let request = session.spin().unwrap();
        let task = tasks(12)[2].clone();
        session.handle_event(ack(&request, json!({"success": true, "task": task, "task_index": 2})), 0.0);
        assert!(!session.is_spinning());
        assert!(session.notice().is_none());
        assert!(!session.can_spin());

        session.set_tasks(tasks(12), 500.0);
        assert!(session.is_spinning());
        let sent = settle(&mut session, 500.0);
        assert_eq!(sent[0].request, ClientRequest::WheelStopped { task_index: 2 });
    }

    #[test]
    fn spin_outside_the_wheel_is_reported() {
        let (mut session, _) = master(4);
        let request = session.spin().unwrap();
        let task = Task { name: "Ghost".to_string(), ..Default::default() };
        session.handle_event(ack(&request, json!({"success": true, "task": task, "task_index": 9})), 0.0);
        assert!(!session.is_spinning());
        assert!(session.can_spin());
        assert_eq!(session.notice().unwrap().text, SPIN_FAILED_ERROR);
    }

    #[test]
    fn broadcast_before_ack_still_stops_once() {
        let (mut session, _) = master(12);
        let request = session.spin().unwrap();
        let task = session.tasks()[4].clone();
        session.handle_event(
            ServerEvent::WheelSpinning(WheelSpinning { task: task.clone(), task_index: 4 }),
            0.0,
        );
        session.handle_event(ack(&request, json!({"success": true, "task": task, "task_index": 4})), 40.0);

        let sent = settle(&mut session, 0.0);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].request, ClientRequest::WheelStopped { task_index: 4 });
        assert!(session.on_frame(60_000.0).is_empty());
    }

    #[test]
    fn reset_mid_spin_frees_the_wheel() {
        let (mut session, _) = master(12);
        session.spin().unwrap();
        session.handle_event(
            ServerEvent::WheelSpinning(WheelSpinning { task: session.tasks()[1].clone(), task_index: 1 }),
            0.0,
        );
        session.on_frame(1_000.0);
        session.handle_event(ServerEvent::GameReset, 1_100.0);

        assert!(!session.is_spinning());
        assert!(session.on_frame(5_000.0).is_empty());
        assert!(session.can_spin());
        assert!(session.spin().is_ok());
    }

    #[test]
    fn full_wheel_keeps_landed_sector() {
        let (mut session, _) = master(12);
        session.handle_event(
            ServerEvent::CurrentState(CurrentState {
                used_indices: Some((0..12).collect()),
                ..Default::default()
            }),
            0.0,
        );
        session.handle_event(
            ServerEvent::WheelSpinning(WheelSpinning { task: session.tasks()[3].clone(), task_index: 3 }),
            0.0,
        );
        let sent = settle(&mut session, 0.0);
        assert_eq!(sent[0].request, ClientRequest::WheelStopped { task_index: 3 });
    }

    #[test]
    fn idle_master_aligns_to_server_task() {
        let (mut session, cookies) = master(8);
        session.handle_event(
            ServerEvent::CurrentState(CurrentState {
                current_task: Some(session.tasks()[2].clone()),
                game_state: GameState::Active,
                ..Default::default()
            }),
            0.0,
        );
        assert_eq!(session.wheel().landed_index(270.0), 2);
        assert_eq!(cookies.get("wheel_rotation").as_deref(), Some("158"));
        assert!(!session.can_spin());
    }

    #[test]
    fn saved_rotation_is_restored_once_tasks_load() {
        let (mut session, cookies, _) = session(Role::Master);
        let mut seeded = cookies.clone();
        seeded.set("wheel_rotation", "123", None);
        session.set_tasks(tasks(6), 0.0);
        assert_eq!(session.wheel().rotation, 123.0);
        assert_eq!(session.displayed_rotation(0.0), 123.0);
    }

    #[test]
    fn game_reset_clears_wheel_and_saved_rotation() {
        let (mut session, cookies) = master(6);
        session.handle_event(
            ServerEvent::TaskSelected(TaskSelected {
                task: session.tasks()[4].clone(),
                task_index: None,
                used_indices: Some(vec![4]),
                used_count: Some(1),
                total_count: Some(6),
            }),
            0.0,
        );
        assert!(cookies.get("wheel_rotation").is_some());

        session.handle_event(ServerEvent::GameReset, 0.0);
        assert!(session.wheel().used.is_empty());
        assert_eq!(session.wheel().rotation, 0.0);
        assert!(cookies.get("wheel_rotation").is_none());
        assert_eq!(session.current_task(), None);
    }

    #[test]
    fn game_state_update_requests_fresh_timers() {
        let (mut session, _, _) = session(Role::Controls);
        let sent = session.handle_event(ServerEvent::GameStateUpdate(GameStateUpdate::default()), 0.0);
        assert_eq!(sent[0].request, ClientRequest::GetTimerState);
    }

    #[test]
    fn poll_stops_once_timers_arrive() {
        let (mut session, _, _) = session(Role::Controls);
        assert!(session.on_poll().is_some());
        assert!(session.on_render_tick(0.0).is_empty());

        let mut timers = TimerUpdate::new();
        timers.insert(1, TimerState { remaining_seconds: 30, running: true, max_seconds: 300 });
        session.handle_event(ServerEvent::TimerUpdate(timers), 0.0);

        assert!(session.on_poll().is_none());
        assert_eq!(session.on_render_tick(12_000.0)[&1].remaining_seconds, 18);
    }

    #[test]
    fn controls_spin_waits_for_state_update() {
        let (mut session, _, _) = session(Role::Controls);
        let request = session.spin().unwrap();
        assert!(!session.can_spin());
        assert_eq!(session.spin(), Err(SessionError::SpinInFlight));

        session.handle_event(ack(&request, json!({"success": true, "task": {"name": "x"}, "task_index": 0})), 0.0);
        assert!(!session.can_spin());

        session.handle_event(ServerEvent::GameStateUpdate(GameStateUpdate::default()), 0.0);
        assert!(session.can_spin());
    }

    #[test]
    fn add_time_is_validated_before_sending() {
        let (mut session, _, _) = session(Role::Controls);
        assert!(session.add_time(9, 30).is_err());
        let request = session.add_time(2, 60).unwrap();
        assert!(request.ack.is_some());
    }

    #[test]
    fn refused_actions_are_reported_except_double_spin() {
        let (mut session, _, _) = session(Role::Controls);
        session.report(&SessionError::SpinInFlight);
        assert!(session.notice().is_none());

        let err = session.add_time(1, 0).unwrap_err();
        session.report(&err);
        assert_eq!(session.notice().unwrap().kind, NoticeKind::Error);
        session.dismiss_notice();
        assert!(session.notice().is_none());
    }

    #[test]
    fn failed_action_becomes_notice() {
        let (mut session, _, _) = session(Role::Controls);
        let request = session.stop_game();
        session.handle_event(ack(&request, json!({"success": false, "error": "Not allowed"})), 0.0);
        assert_eq!(session.notice().unwrap().text, "Not allowed");
    }

    #[test]
    fn slave_solves_and_restores_after_reload() {
        let (mut slave, _, local) = session(Role::Slave(1));
        slave.handle_event(
            ServerEvent::TaskSelected(TaskSelected {
                task: tasks(1)[0].clone(),
                task_index: Some(0),
                used_indices: None,
                used_count: None,
                total_count: None,
            }),
            0.0,
        );
        assert_eq!(slave.slave_view().screen, SlaveScreen::Task);

        assert!(slave.verify_secret("   ").is_err());
        assert_eq!(slave.notice().unwrap().text, "Please enter a secret");

        let request = slave.verify_secret("secret0").unwrap();
        assert!(slave.verify_secret("again").is_err());
        slave.handle_event(ack(&request, json!({"success": true, "message": "Correct secret!"})), 5.0);
        assert!(slave.slave_view().solved);
        assert!(slave.slave_view().input_locked);

        let mut reloaded = DisplaySession::new(
            Role::Slave(1),
            WheelConfig::default(),
            Box::new(MemoryStore::new()),
            Box::new(local.clone()),
        );
        reloaded.restore();
        assert_eq!(reloaded.slave_view().screen, SlaveScreen::Task);
        assert!(reloaded.slave_view().solved);
        assert_eq!(reloaded.current_task().unwrap().name, "Task 0");
    }

    #[test]
    fn wrong_secret_unlocks_for_retry() {
        let (mut slave, _, _) = session(Role::Slave(2));
        slave.handle_event(
            ServerEvent::CurrentState(CurrentState {
                current_task: Some(tasks(1)[0].clone()),
                game_state: GameState::Active,
                ..Default::default()
            }),
            0.0,
        );
        let request = slave.verify_secret("nope").unwrap();
        slave.handle_event(ack(&request, json!({"success": false, "error": "Incorrect secret"})), 0.0);
        assert!(!slave.slave_view().submitting);
        assert!(!slave.slave_view().solved);
        assert!(slave.verify_secret("secret0").is_ok());
    }

    #[test]
    fn slave_input_locks_when_time_runs_out() {
        let (mut slave, _, _) = session(Role::Slave(1));
        slave.handle_event(
            ServerEvent::CurrentState(CurrentState {
                current_task: Some(tasks(1)[0].clone()),
                game_state: GameState::Active,
                ..Default::default()
            }),
            0.0,
        );
        let mut timers = TimerUpdate::new();
        timers.insert(1, TimerState { remaining_seconds: 3, running: true, max_seconds: 300 });
        slave.handle_event(ServerEvent::TimerUpdate(timers), 0.0);

        slave.on_render_tick(2_000.0);
        assert!(!slave.slave_view().input_locked);
        slave.on_render_tick(3_000.0);
        assert!(slave.slave_view().input_locked);
        assert_eq!(slave.notice().unwrap().text, TIME_EXPIRED_NOTICE);
        assert!(slave.verify_secret("secret0").is_err());

        let mut extended = TimerUpdate::new();
        extended.insert(1, TimerState { remaining_seconds: 60, running: true, max_seconds: 300 });
        slave.handle_event(ServerEvent::TimerUpdate(extended), 4_000.0);
        slave.on_render_tick(5_000.0);
        assert!(!slave.slave_view().input_locked);
        assert!(slave.notice().is_none());
    }

    #[test]
    fn slave_returns_to_waiting_without_current_task() {
        let (mut slave, _, local) = session(Role::Slave(1));
        slave.handle_event(
            ServerEvent::TaskSelected(TaskSelected {
                task: tasks(1)[0].clone(),
                task_index: None,
                used_indices: None,
                used_count: None,
                total_count: None,
            }),
            0.0,
        );
        assert!(local.get("slave_1_state").is_some());

        slave.handle_event(ServerEvent::CurrentState(CurrentState::default()), 0.0);
        assert_eq!(slave.slave_view().screen, SlaveScreen::Waiting);
        assert!(local.get("slave_1_state").is_none());
    }

    #[test]
    fn long_names_are_shortened_on_the_wheel() {
        let (mut session, _) = master(0);
        session.set_tasks(
            vec![Task {
                name: "An extremely long task name".to_string(),
                ..Default::default()
            }],
            0.0,
        );
        assert_eq!(session.sectors()[0].label, "An extremely...");
    }

    #[test]
    fn teardown_persists_current_angle() {
        let (mut session, cookies) = master(12);
        session.handle_event(
            ServerEvent::WheelSpinning(WheelSpinning { task: session.tasks()[1].clone(), task_index: 1 }),
            0.0,
        );
        session.on_frame(1_000.0);
        session.teardown();
        let saved: i32 = cookies.get("wheel_rotation").unwrap().parse().unwrap();
        assert_eq!(saved, crate::rotation_store::persisted_angle(session.wheel().rotation));
    }
}
