use shared::protocol::is_participant;
use shared::session::{Role, SlaveScreen};
use shared::timer::{ParticipantId, TimerTask};
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::components::{NoticeBanner, TimerCard};
use crate::session_host::{HostCallbacks, SessionHost};
use crate::styles;

#[derive(Properties, PartialEq)]
pub struct SlavePageProps {
    pub id: ParticipantId,
}

pub enum Msg {
    Received(String),
    ConnectionError(String),
    Timer(TimerTask),
    SecretInput(String),
    Submit,
    DismissNotice,
}

/// A player's screen: waits for a task, then takes the secret that solves it.
pub struct SlavePage {
    id: ParticipantId,
    host: SessionHost,
    secret: String,
}

impl Component for SlavePage {
    type Message = Msg;
    type Properties = SlavePageProps;

    fn create(ctx: &Context<Self>) -> Self {
        let id = ctx.props().id;
        let link = ctx.link();
        let mut host = SessionHost::new(
            Role::Slave(id),
            HostCallbacks {
                on_text: link.callback(Msg::Received),
                on_error: link.callback(Msg::ConnectionError),
                on_timer: link.callback(Msg::Timer),
                on_frame: link.callback(|_| Msg::Timer(TimerTask::RenderTick)),
            },
        );
        if is_participant(id) {
            host.connect();
        } else {
            log::error!("Unknown player id {}", id);
        }

        Self {
            id,
            host,
            secret: String::new(),
        }
    }

    fn update(&mut self, _ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Received(text) => {
                self.host.receive(&text);
                if self.host.session().slave_view().solved {
                    self.secret.clear();
                }
            }
            Msg::ConnectionError(reason) => self.host.connection_lost(reason),
            Msg::Timer(task) => {
                self.host.on_timer(task);
                return task == TimerTask::RenderTick;
            }
            Msg::SecretInput(value) => self.secret = value,
            Msg::Submit => {
                let secret = self.secret.clone();
                self.host.act(move |session| session.verify_secret(&secret));
            }
            Msg::DismissNotice => self.host.session_mut().dismiss_notice(),
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        if !is_participant(self.id) {
            return html! {
                <div class={styles::CONTAINER}>
                    <div class={classes!(styles::ALERT_ERROR, "mt-8")}>{ format!("Unknown player {}", self.id) }</div>
                </div>
            };
        }

        let session = self.host.session();
        let view = session.slave_view();
        let link = ctx.link();

        let body = match (view.screen, session.current_task()) {
            (SlaveScreen::Task, Some(task)) => {
                let locked = view.input_locked || view.solved || view.submitting;
                let on_input = link.callback(|e: InputEvent| {
                    let input: HtmlInputElement = e.target_unchecked_into();
                    Msg::SecretInput(input.value())
                });
                let on_submit = link.callback(|e: SubmitEvent| {
                    e.prevent_default();
                    Msg::Submit
                });
                html! {
                    <div class={styles::CARD}>
                        <h2 class={styles::TEXT_H2}>{ &task.name }</h2>
                        <p class={classes!(styles::TEXT_SECONDARY, "mb-2")}>{ format!("{} · {}", task.category, task.kind) }</p>
                        if !task.link.is_empty() {
                            <a href={task.link.clone()} target="_blank" rel="noopener noreferrer" class={styles::LINK}>
                                { "Open task" }
                            </a>
                        }
                        <form onsubmit={on_submit} class={styles::FORM}>
                            <label class={styles::TEXT_LABEL} for="secret">{ "Secret" }</label>
                            <input
                                id="secret"
                                type="text"
                                autocomplete="off"
                                class={styles::INPUT}
                                value={self.secret.clone()}
                                oninput={on_input}
                                disabled={locked}
                            />
                            <button
                                type="submit"
                                disabled={locked}
                                class={classes!(styles::BUTTON_PRIMARY, locked.then_some(styles::DISABLED))}
                            >
                                { if view.submitting { "Checking..." } else { "Submit" } }
                            </button>
                        </form>
                    </div>
                }
            }
            _ => html! {
                <div class={classes!(styles::CARD, "text-center")}>
                    <h2 class={styles::TEXT_H2}>{ "Waiting for the wheel..." }</h2>
                    <p class={styles::TEXT_SECONDARY}>{ "Your task will appear here once it is selected." }</p>
                </div>
            },
        };

        html! {
            <div class={styles::CONTAINER}>
                <div class={styles::CONTAINER_SM}>
                    <h1 class={classes!(styles::TEXT_H1, "mb-4")}>{ session.player_name(self.id) }</h1>

                    if let Some(error) = self.host.connection_error() {
                        <div class={classes!(styles::ALERT_ERROR, "mb-4")}>{ error }</div>
                    }
                    <NoticeBanner notice={session.notice().cloned()} on_dismiss={link.callback(|_| Msg::DismissNotice)} />

                    <div class="mb-4">
                        <TimerCard
                            participant={self.id}
                            name={session.player_name(self.id)}
                            timer={self.host.shown_timers().get(&self.id).copied()}
                            solved={session.solved(self.id)}
                        />
                    </div>
                    { body }
                </div>
            </div>
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.host.teardown();
    }
}
