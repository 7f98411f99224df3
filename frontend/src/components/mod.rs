pub mod notice_banner;
pub mod timer_card;
pub mod wheel;

pub use notice_banner::NoticeBanner;
pub use timer_card::TimerCard;
pub use wheel::WheelView;
