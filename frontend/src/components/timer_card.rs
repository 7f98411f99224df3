use shared::timer::{format_clock, ParticipantId, TimerState, Urgency};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct TimerCardProps {
    pub participant: ParticipantId,
    pub name: String,
    pub timer: Option<TimerState>,
    #[prop_or(false)]
    pub solved: bool,
}

fn urgency_classes(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Critical => "text-red-600 dark:text-red-400 animate-pulse",
        Urgency::Warning => "text-amber-600 dark:text-amber-400",
        Urgency::Normal => "text-gray-900 dark:text-white",
    }
}

#[function_component(TimerCard)]
pub fn timer_card(props: &TimerCardProps) -> Html {
    let (clock, urgency, running) = match props.timer {
        Some(timer) => (
            format_clock(timer.remaining_seconds),
            Urgency::for_remaining(timer.remaining_seconds),
            timer.running,
        ),
        None => ("--:--".to_string(), Urgency::Normal, false),
    };

    html! {
        <div class={classes!("rounded-lg", "p-4", "shadow", "bg-white", "dark:bg-gray-800", urgency.css_class())}>
            <div class="flex items-center justify-between">
                <span class="font-semibold text-gray-700 dark:text-gray-300">
                    { format!("{} (#{})", props.name, props.participant) }
                </span>
                if props.solved {
                    <span class="text-xs font-bold px-2 py-1 rounded bg-green-100 text-green-700 dark:bg-green-900 dark:text-green-200">
                        { "Solved" }
                    </span>
                }
            </div>
            <div class={classes!("text-4xl", "font-mono", "mt-2", urgency_classes(urgency))}>
                { clock }
            </div>
            <div class="text-xs text-gray-500 dark:text-gray-400 mt-1">
                { if running { "Running" } else { "Paused" } }
            </div>
        </div>
    }
}
