use gloo_render::{request_animation_frame, AnimationFrame};
use gloo_timers::callback::Interval;
use log::{error, warn};
use shared::error::SessionError;
use shared::protocol::{ServerEvent, Task};
use shared::session::{DisplaySession, Outbound, Role};
use shared::timer::{IntervalScheduler, TimerSchedule, TimerTask, TimerUpdate};
use yew::Callback;

use crate::config::{get_ws_url, wheel_config};
use crate::socket::{connect, SocketWriter};
use crate::storage::{CookieStore, LocalStore};

fn now() -> f64 {
    js_sys::Date::now()
}

/// `gloo-timers` intervals that report which job fired.
pub struct BrowserScheduler {
    on_task: Callback<TimerTask>,
}

impl IntervalScheduler for BrowserScheduler {
    type Handle = Interval;

    fn every(&mut self, task: TimerTask, period_ms: u32) -> Interval {
        let on_task = self.on_task.clone();
        Interval::new(period_ms, move || on_task.emit(task))
    }
}

/// Where a page wants the host's asynchronous work delivered.
pub struct HostCallbacks {
    pub on_text: Callback<String>,
    pub on_error: Callback<String>,
    pub on_timer: Callback<TimerTask>,
    pub on_frame: Callback<()>,
}

/// Connects one `DisplaySession` to the socket, the intervals and the
/// animation frames of the page that owns it.
pub struct SessionHost {
    session: DisplaySession,
    socket: Option<SocketWriter>,
    scheduler: BrowserScheduler,
    schedule: TimerSchedule<Interval>,
    frame: Option<AnimationFrame>,
    on_text: Callback<String>,
    on_error: Callback<String>,
    on_frame: Callback<()>,
    shown_timers: TimerUpdate,
    connection_error: Option<String>,
}

impl SessionHost {
    pub fn new(role: Role, callbacks: HostCallbacks) -> Self {
        let config = wheel_config();
        let schedule = TimerSchedule::new(config.render_tick_ms, config.snapshot_poll_ms);
        let mut session = DisplaySession::new(role, config, Box::new(CookieStore), Box::new(LocalStore));
        session.restore();

        Self {
            session,
            socket: None,
            scheduler: BrowserScheduler {
                on_task: callbacks.on_timer,
            },
            schedule,
            frame: None,
            on_text: callbacks.on_text,
            on_error: callbacks.on_error,
            on_frame: callbacks.on_frame,
            shown_timers: TimerUpdate::new(),
            connection_error: None,
        }
    }

    pub fn session(&self) -> &DisplaySession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut DisplaySession {
        &mut self.session
    }

    pub fn shown_timers(&self) -> &TimerUpdate {
        &self.shown_timers
    }

    pub fn connection_error(&self) -> Option<&str> {
        self.connection_error.as_deref()
    }

    pub fn connect(&mut self) {
        match connect(&get_ws_url(), self.on_text.clone(), self.on_error.clone()) {
            Ok(writer) => {
                writer.send_all(self.session.on_connect());
                self.socket = Some(writer);
                self.connection_error = None;
                self.schedule.start(&mut self.scheduler, self.session.timers().has_snapshot());
            }
            Err(e) => {
                error!("{}", e);
                self.connection_error = Some(e);
            }
        }
    }

    pub fn connection_lost(&mut self, reason: String) {
        self.socket = None;
        self.connection_error = Some(reason);
    }

    pub fn receive(&mut self, text: &str) {
        let event = match ServerEvent::decode(text) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(e) => {
                warn!("Dropping frame: {}", e);
                return;
            }
        };
        let is_timer_update = matches!(event, ServerEvent::TimerUpdate(_));

        let outbound = self.session.handle_event(event, now());
        self.send_all(outbound);

        if is_timer_update {
            self.schedule.on_snapshot(&mut self.scheduler);
            self.shown_timers = self.session.on_render_tick(now());
        }
        self.request_frame_if_spinning();
    }

    pub fn on_timer(&mut self, task: TimerTask) {
        match task {
            TimerTask::RenderTick => self.shown_timers = self.session.on_render_tick(now()),
            TimerTask::SnapshotPoll => {
                if let Some(outbound) = self.session.on_poll() {
                    self.send(outbound);
                }
            }
        }
    }

    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.session.set_tasks(tasks, now());
        self.request_frame_if_spinning();
    }

    pub fn on_frame(&mut self) {
        self.frame = None;
        let outbound = self.session.on_frame(now());
        self.send_all(outbound);
        self.request_frame_if_spinning();
    }

    pub fn displayed_rotation(&self) -> f64 {
        self.session.displayed_rotation(now())
    }

    /// Runs a user action and sends its request, or surfaces why it was refused.
    pub fn act<F>(&mut self, action: F)
    where
        F: FnOnce(&mut DisplaySession) -> Result<Outbound, SessionError>,
    {
        match action(&mut self.session) {
            Ok(outbound) => self.send(outbound),
            Err(e) => self.session.report(&e),
        }
    }

    pub fn send(&self, outbound: Outbound) {
        match &self.socket {
            Some(socket) => socket.send(outbound),
            None => warn!("Not connected, dropping {}", outbound.request.event_name()),
        }
    }

    fn send_all(&self, outbound: Vec<Outbound>) {
        for frame in outbound {
            self.send(frame);
        }
    }

    fn request_frame_if_spinning(&mut self) {
        if self.session.is_spinning() && self.frame.is_none() {
            let on_frame = self.on_frame.clone();
            self.frame = Some(request_animation_frame(move |_| on_frame.emit(())));
        }
    }

    pub fn teardown(&mut self) {
        self.session.teardown();
        self.schedule.stop();
        self.frame = None;
        if let Some(socket) = self.socket.take() {
            socket.close();
        }
    }
}
