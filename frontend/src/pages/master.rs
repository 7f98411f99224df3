use gloo::net::http::Request;
use gloo_events::EventListener;
use log::{error, info};
use shared::constants::PARTICIPANTS;
use shared::error::SessionError;
use shared::protocol::Task;
use shared::session::Role;
use shared::timer::TimerTask;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::components::{NoticeBanner, TimerCard, WheelView};
use crate::config::get_tasks_url;
use crate::session_host::{HostCallbacks, SessionHost};
use crate::styles;

pub enum Msg {
    Received(String),
    ConnectionError(String),
    TasksLoaded(Vec<Task>),
    TasksFailed(String),
    Timer(TimerTask),
    Frame,
    Unload,
    Spin,
    ResetSlaves,
    DismissNotice,
}

async fn fetch_tasks() -> Result<Vec<Task>, String> {
    let response = Request::get(&get_tasks_url())
        .send()
        .await
        .map_err(|e| format!("Network error: {:?}", e))?;
    if !response.ok() {
        return Err(format!("Error status: {}", response.status()));
    }
    response
        .json::<Vec<Task>>()
        .await
        .map_err(|e| format!("Error parsing task list: {:?}", e))
}

/// Projector screen: the wheel, the counters and both countdowns.
pub struct MasterPage {
    host: SessionHost,
    unload_listener: Option<EventListener>,
}

impl Component for MasterPage {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let link = ctx.link();
        let mut host = SessionHost::new(
            Role::Master,
            HostCallbacks {
                on_text: link.callback(Msg::Received),
                on_error: link.callback(Msg::ConnectionError),
                on_timer: link.callback(Msg::Timer),
                on_frame: link.callback(|_| Msg::Frame),
            },
        );
        host.connect();

        let fetch_link = link.clone();
        spawn_local(async move {
            match fetch_tasks().await {
                Ok(tasks) => fetch_link.send_message(Msg::TasksLoaded(tasks)),
                Err(e) => fetch_link.send_message(Msg::TasksFailed(e)),
            }
        });

        // destroy() does not run on reload or tab close
        let unload_listener = web_sys::window().map(|window| {
            let link = link.clone();
            EventListener::new(&window, "beforeunload", move |_| link.send_message(Msg::Unload))
        });

        Self { host, unload_listener }
    }

    fn update(&mut self, _ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Received(text) => {
                self.host.receive(&text);
                true
            }
            Msg::ConnectionError(reason) => {
                self.host.connection_lost(reason);
                true
            }
            Msg::TasksLoaded(tasks) => {
                info!("Loaded {} tasks", tasks.len());
                self.host.set_tasks(tasks);
                true
            }
            Msg::TasksFailed(e) => {
                error!("Error loading tasks: {}", e);
                self.host
                    .session_mut()
                    .report(&SessionError::Rejected("Could not load tasks".to_string()));
                true
            }
            Msg::Timer(task) => {
                self.host.on_timer(task);
                task == TimerTask::RenderTick
            }
            Msg::Frame => {
                self.host.on_frame();
                true
            }
            Msg::Unload => {
                self.host.session_mut().teardown();
                false
            }
            Msg::Spin => {
                self.host.act(|session| session.spin());
                true
            }
            Msg::ResetSlaves => {
                let outbound = self.host.session_mut().reset_slaves();
                self.host.send(outbound);
                false
            }
            Msg::DismissNotice => {
                self.host.session_mut().dismiss_notice();
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let session = self.host.session();
        let timers = self.host.shown_timers();

        html! {
            <div class={styles::CONTAINER}>
                <div class={styles::CONTAINER_LG}>
                    <h1 class={classes!(styles::TEXT_H1, "text-center", "mb-6")}>{ "Task Wheel" }</h1>

                    if let Some(error) = self.host.connection_error() {
                        <div class={classes!(styles::ALERT_ERROR, "mb-4")}>{ error }</div>
                    }
                    <NoticeBanner
                        notice={session.notice().cloned()}
                        on_dismiss={ctx.link().callback(|_| Msg::DismissNotice)}
                    />

                    <div class="grid grid-cols-1 lg:grid-cols-3 gap-6">
                        <div class={classes!(styles::CARD, "lg:col-span-2")}>
                            <WheelView
                                sectors={session.sectors()}
                                rotation={self.host.displayed_rotation()}
                                is_spinning={session.is_spinning()}
                            />
                            <div class="flex justify-center gap-4 mt-6">
                                <button
                                    onclick={ctx.link().callback(|_| Msg::Spin)}
                                    disabled={!session.can_spin()}
                                    class={classes!(styles::BUTTON_PRIMARY, (!session.can_spin()).then_some(styles::DISABLED))}
                                >
                                    { if session.is_spinning() { "Spinning..." } else { "Spin" } }
                                </button>
                                <button onclick={ctx.link().callback(|_| Msg::ResetSlaves)} class={styles::BUTTON_SECONDARY}>
                                    { "Reset players" }
                                </button>
                            </div>
                        </div>

                        <div class="space-y-4">
                            <div class={styles::CARD}>
                                <p class={styles::TEXT_SMALL}>{ format!("Game: {}", session.game_state().as_str()) }</p>
                                <p class={styles::TEXT_SMALL}>
                                    { format!("Used: {} / {}", session.used_count(), session.total_count()) }
                                </p>
                                if let Some(task) = session.current_task() {
                                    <h2 class={classes!(styles::TEXT_H3, "mt-2")}>{ &task.name }</h2>
                                    <p class={styles::TEXT_SECONDARY}>{ format!("{} · {}", task.category, task.kind) }</p>
                                }
                            </div>
                            { for PARTICIPANTS.iter().map(|id| html! {
                                <TimerCard
                                    participant={*id}
                                    name={session.player_name(*id)}
                                    timer={timers.get(id).copied()}
                                    solved={session.solved(*id)}
                                />
                            }) }
                        </div>
                    </div>
                </div>
            </div>
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.unload_listener = None;
        self.host.teardown();
    }
}
