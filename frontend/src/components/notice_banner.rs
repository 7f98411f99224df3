use shared::session::{Notice, NoticeKind};
use yew::prelude::*;

use crate::styles;

#[derive(Properties, PartialEq)]
pub struct NoticeBannerProps {
    pub notice: Option<Notice>,
    pub on_dismiss: Callback<()>,
}

#[function_component(NoticeBanner)]
pub fn notice_banner(props: &NoticeBannerProps) -> Html {
    let Some(notice) = &props.notice else {
        return html! {};
    };
    let class = match notice.kind {
        NoticeKind::Error => styles::ALERT_ERROR,
        NoticeKind::Success => styles::ALERT_SUCCESS,
        NoticeKind::Info => styles::ALERT_INFO,
    };
    let on_dismiss = props.on_dismiss.reform(|_: MouseEvent| ());

    html! {
        <div class={classes!(class, "flex", "items-center", "justify-between", "mb-4")}>
            <span>{ &notice.text }</span>
            <button onclick={on_dismiss} class="ml-4 text-sm opacity-70 hover:opacity-100">{ "✕" }</button>
        </div>
    }
}
