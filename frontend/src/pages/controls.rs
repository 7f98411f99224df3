use shared::constants::PARTICIPANTS;
use shared::error::SessionError;
use shared::session::Role;
use shared::timer::{ParticipantId, TimerTask};
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::{NoticeBanner, TimerCard};
use crate::session_host::{HostCallbacks, SessionHost};
use crate::styles;

const ADD_TIME_PRESETS: [u32; 2] = [60, 300];

pub enum Msg {
    Received(String),
    ConnectionError(String),
    Timer(TimerTask),
    Spin,
    AddTimeInput(String),
    AddTime(ParticipantId, Option<u32>),
    ResetGame,
    ResetSlaves,
    StopGame,
    CancelRound,
    DismissNotice,
}

/// Operator console. Drives the round without showing the wheel itself.
pub struct ControlsPage {
    host: SessionHost,
    add_time_input: String,
}

impl ControlsPage {
    fn custom_seconds(&self) -> Result<u32, SessionError> {
        self.add_time_input
            .trim()
            .parse::<u32>()
            .map_err(|_| SessionError::InvalidRequest("Enter a number of seconds".to_string()))
    }
}

impl Component for ControlsPage {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let link = ctx.link();
        let mut host = SessionHost::new(
            Role::Controls,
            HostCallbacks {
                on_text: link.callback(Msg::Received),
                on_error: link.callback(Msg::ConnectionError),
                on_timer: link.callback(Msg::Timer),
                on_frame: link.callback(|_| Msg::Timer(TimerTask::RenderTick)),
            },
        );
        host.connect();

        Self {
            host,
            add_time_input: String::new(),
        }
    }

    fn update(&mut self, _ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Received(text) => self.host.receive(&text),
            Msg::ConnectionError(reason) => self.host.connection_lost(reason),
            Msg::Timer(task) => {
                self.host.on_timer(task);
                return task == TimerTask::RenderTick;
            }
            Msg::Spin => self.host.act(|session| session.spin()),
            Msg::AddTimeInput(value) => {
                self.add_time_input = value;
                return false;
            }
            Msg::AddTime(slave_id, preset) => {
                let seconds = match preset {
                    Some(seconds) => Ok(seconds),
                    None => self.custom_seconds(),
                };
                match seconds {
                    Ok(seconds) => self.host.act(|session| session.add_time(slave_id, seconds)),
                    Err(e) => self.host.session_mut().report(&e),
                }
            }
            Msg::ResetGame => self.host.act(|session| Ok(session.reset_game())),
            Msg::ResetSlaves => self.host.act(|session| Ok(session.reset_slaves())),
            Msg::StopGame => self.host.act(|session| Ok(session.stop_game())),
            Msg::CancelRound => self.host.act(|session| Ok(session.cancel_round())),
            Msg::DismissNotice => self.host.session_mut().dismiss_notice(),
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let session = self.host.session();
        let timers = self.host.shown_timers();
        let link = ctx.link();

        let on_input = link.callback(|e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            Msg::AddTimeInput(input.value())
        });

        let player_rows = PARTICIPANTS.iter().map(|id| {
            let id = *id;
            html! {
                <div class="space-y-2">
                    <TimerCard
                        participant={id}
                        name={session.player_name(id)}
                        timer={timers.get(&id).copied()}
                        solved={session.solved(id)}
                    />
                    <div class="flex flex-wrap gap-2">
                        { for ADD_TIME_PRESETS.iter().map(|seconds| {
                            let seconds = *seconds;
                            html! {
                                <button
                                    onclick={link.callback(move |_| Msg::AddTime(id, Some(seconds)))}
                                    class={styles::BUTTON_SECONDARY}
                                >
                                    { format!("+{} min", seconds / 60) }
                                </button>
                            }
                        }) }
                        <button onclick={link.callback(move |_| Msg::AddTime(id, None))} class={styles::BUTTON_SECONDARY}>
                            { "+ custom" }
                        </button>
                    </div>
                </div>
            }
        });

        html! {
            <div class={styles::CONTAINER}>
                <div class={styles::CONTAINER_LG}>
                    <h1 class={classes!(styles::TEXT_H1, "mb-6")}>{ "Controls" }</h1>

                    if let Some(error) = self.host.connection_error() {
                        <div class={classes!(styles::ALERT_ERROR, "mb-4")}>{ error }</div>
                    }
                    <NoticeBanner notice={session.notice().cloned()} on_dismiss={link.callback(|_| Msg::DismissNotice)} />

                    <div class={classes!(styles::CARD, "mb-6")}>
                        <p class={styles::TEXT_SMALL}>{ format!("Game: {}", session.game_state().as_str()) }</p>
                        {
                            match session.current_task() {
                                Some(task) => html! {
                                    <>
                                        <h2 class={classes!(styles::TEXT_H2, "mt-2")}>{ &task.name }</h2>
                                        <p class={styles::TEXT_SECONDARY}>{ format!("{} · {}", task.category, task.kind) }</p>
                                    </>
                                },
                                None => html! { <p class={styles::TEXT_SECONDARY}>{ "No task selected" }</p> },
                            }
                        }
                        <div class="flex flex-wrap gap-3 mt-4">
                            <button
                                onclick={link.callback(|_| Msg::Spin)}
                                disabled={!session.can_spin()}
                                class={classes!(styles::BUTTON_PRIMARY, (!session.can_spin()).then_some(styles::DISABLED))}
                            >
                                { "Spin" }
                            </button>
                            <button onclick={link.callback(|_| Msg::StopGame)} class={styles::BUTTON_SECONDARY}>{ "Stop game" }</button>
                            <button onclick={link.callback(|_| Msg::CancelRound)} class={styles::BUTTON_SECONDARY}>{ "Cancel round" }</button>
                            <button onclick={link.callback(|_| Msg::ResetSlaves)} class={styles::BUTTON_SECONDARY}>{ "Reset players" }</button>
                            <button onclick={link.callback(|_| Msg::ResetGame)} class={styles::BUTTON_DANGER}>{ "Reset game" }</button>
                        </div>
                    </div>

                    <div class={classes!(styles::CARD, "mb-6")}>
                        <label class={styles::TEXT_LABEL} for="add-time-seconds">{ "Custom time (seconds)" }</label>
                        <input
                            id="add-time-seconds"
                            type="number"
                            min="1"
                            max="3600"
                            class={styles::INPUT}
                            value={self.add_time_input.clone()}
                            oninput={on_input}
                        />
                    </div>

                    <div class="grid grid-cols-1 md:grid-cols-2 gap-6">
                        { for player_rows }
                    </div>
                </div>
            </div>
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.host.teardown();
    }
}
