pub mod components;
pub mod config;
pub mod pages;
pub mod session_host;
pub mod socket;
pub mod storage;
pub mod styles;

use shared::constants::PARTICIPANTS;
use shared::timer::ParticipantId;
use yew::prelude::*;
use yew_router::prelude::*;

use crate::pages::{ControlsPage, MasterPage, SlavePage};

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/master")]
    Master,
    #[at("/controls")]
    Controls,
    #[at("/slave/:id")]
    Slave { id: ParticipantId },
    #[not_found]
    #[at("/404")]
    NotFound,
}

#[function_component(Home)]
fn home() -> Html {
    html! {
        <div class={styles::FLEX_CENTER}>
            <div class={classes!(styles::CARD, "max-w-sm", "w-full", "mx-auto", "space-y-3", "text-center")}>
                <h1 class={styles::TEXT_H1}>{ "Task Wheel" }</h1>
                <Link<Route> to={Route::Master} classes={classes!(styles::LINK)}>{ "Wheel display" }</Link<Route>>
                <br />
                <Link<Route> to={Route::Controls} classes={classes!(styles::LINK)}>{ "Controls" }</Link<Route>>
                { for PARTICIPANTS.iter().map(|id| html! {
                    <>
                        <br />
                        <Link<Route> to={Route::Slave { id: *id }} classes={classes!(styles::LINK)}>
                            { format!("Player {}", id) }
                        </Link<Route>>
                    </>
                }) }
            </div>
        </div>
    }
}

#[function_component(App)]
pub fn app() -> Html {
    html! {
        <BrowserRouter>
            <div class="min-h-screen w-full">
                <Switch<Route> render={switch} />
            </div>
        </BrowserRouter>
    }
}

pub fn switch(route: Route) -> Html {
    match route {
        Route::Home => html! { <Home /> },
        Route::Master => html! { <MasterPage /> },
        Route::Controls => html! { <ControlsPage /> },
        Route::Slave { id } => html! { <SlavePage {id} /> },
        Route::NotFound => html! {
            <div class={styles::FLEX_CENTER}>
                <p class={styles::TEXT_H2}>{ "Page not found" }</p>
            </div>
        },
    }
}
