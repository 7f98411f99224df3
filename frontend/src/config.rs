use shared::config::WheelConfig;
use web_sys::window;

const DEV_API_BASE: &str = "http://127.0.0.1:3000";

pub fn get_api_base_url() -> String {
    if let Some(window) = window() {
        if let Ok(host) = window.location().host() {
            if !host.is_empty() {
                // Same origin as the page so other machines on the LAN can reach it
                let protocol = window.location().protocol().unwrap_or_else(|_| "http:".to_string());
                return format!("{}//{}", protocol, host);
            }
        }
    }

    DEV_API_BASE.to_string()
}

pub fn get_ws_url() -> String {
    let base = get_api_base_url();
    let ws_base = base.replacen("https://", "wss://", 1).replacen("http://", "ws://", 1);
    format!("{}/ws", ws_base)
}

pub fn get_tasks_url() -> String {
    format!("{}/api/tasks", get_api_base_url())
}

pub fn wheel_config() -> WheelConfig {
    WheelConfig::default()
}
