use shared::rotation_store::KeyValueStore;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlDocument, Storage};

fn html_document() -> Option<HtmlDocument> {
    window()?.document()?.dyn_into::<HtmlDocument>().ok()
}

fn local_storage() -> Option<Storage> {
    window().and_then(|w| w.local_storage().ok().flatten())
}

/// `document.cookie` backed store, used for the wheel angle.
#[derive(Debug, Default, Clone, Copy)]
pub struct CookieStore;

impl KeyValueStore for CookieStore {
    fn get(&self, key: &str) -> Option<String> {
        let cookies = html_document()?.cookie().ok()?;
        cookies.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == key).then(|| value.to_string())
        })
    }

    fn set(&mut self, key: &str, value: &str, max_age_secs: Option<u64>) {
        let Some(document) = html_document() else {
            return;
        };
        let mut cookie = format!("{}={}; path=/; SameSite=Lax", key, value);
        if let Some(max_age) = max_age_secs {
            cookie.push_str(&format!("; max-age={}", max_age));
        }
        if let Err(e) = document.set_cookie(&cookie) {
            log::error!("Failed to write cookie {}: {:?}", key, e);
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(document) = html_document() {
            let _ = document.set_cookie(&format!("{}=; path=/; max-age=0", key));
        }
    }
}

/// Browser local storage, used for the per-player reload snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStore;

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        local_storage()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str, _max_age_secs: Option<u64>) {
        let Some(storage) = local_storage() else {
            return;
        };
        if let Err(e) = storage.set_item(key, value) {
            log::error!("Failed to write local storage {}: {:?}", key, e);
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(storage) = local_storage() {
            let _ = storage.remove_item(key);
        }
    }
}
