use std::{collections::HashMap, fs};

/// Connection settings for the hosted guest store.
///
/// The store exposes three sibling surfaces under one base URL: the REST
/// table interface, the password-grant auth endpoint, and the realtime
/// websocket. Each can also be overridden individually.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub rest_url: String,
    pub auth_url: String,
    pub realtime_url: String,
    pub api_key: String,
    pub admin_email: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let mut settings = Self {
            rest_url: String::new(),
            auth_url: String::new(),
            realtime_url: String::new(),
            api_key: "dev-anon-key".into(),
            admin_email: "admin@example.com".into(),
        };
        apply_base_url(&mut settings, "http://127.0.0.1:54321");
        settings
    }
}

pub fn load_settings() -> StoreSettings {
    let mut settings = StoreSettings::default();

    if let Ok(raw) = fs::read_to_string("store.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("base_url") {
                apply_base_url(&mut settings, v);
            }
            if let Some(v) = file_cfg.get("rest_url") {
                settings.rest_url = v.clone();
            }
            if let Some(v) = file_cfg.get("auth_url") {
                settings.auth_url = v.clone();
            }
            if let Some(v) = file_cfg.get("realtime_url") {
                settings.realtime_url = v.clone();
            }
            if let Some(v) = file_cfg.get("api_key") {
                settings.api_key = v.clone();
            }
            if let Some(v) = file_cfg.get("admin_email") {
                settings.admin_email = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("STORE_URL") {
        apply_base_url(&mut settings, &v);
    }
    if let Ok(v) = std::env::var("APP__STORE_URL") {
        apply_base_url(&mut settings, &v);
    }

    if let Ok(v) = std::env::var("STORE_REST_URL") {
        settings.rest_url = v;
    }
    if let Ok(v) = std::env::var("STORE_AUTH_URL") {
        settings.auth_url = v;
    }
    if let Ok(v) = std::env::var("STORE_REALTIME_URL") {
        settings.realtime_url = v;
    }

    if let Ok(v) = std::env::var("STORE_API_KEY") {
        settings.api_key = v;
    }
    if let Ok(v) = std::env::var("APP__STORE_API_KEY") {
        settings.api_key = v;
    }

    if let Ok(v) = std::env::var("STORE_ADMIN_EMAIL") {
        settings.admin_email = v;
    }
    if let Ok(v) = std::env::var("APP__STORE_ADMIN_EMAIL") {
        settings.admin_email = v;
    }

    settings
}

/// Derive the three endpoint URLs from one base URL.
///
/// Leaves the settings untouched (with a warning) when the base carries a
/// scheme the websocket swap cannot handle.
pub fn apply_base_url(settings: &mut StoreSettings, base_url: &str) {
    let base = base_url.trim().trim_end_matches('/');
    let Some(ws_base) = swap_to_websocket_scheme(base) else {
        tracing::warn!(base_url, "store base url must start with http:// or https://");
        return;
    };

    settings.rest_url = format!("{base}/rest/v1");
    settings.auth_url = format!("{base}/auth/v1");
    settings.realtime_url = format!("{ws_base}/realtime/v1/websocket");
}

fn swap_to_websocket_scheme(base: &str) -> Option<String> {
    if let Some(rest) = base.strip_prefix("https://") {
        Some(format!("wss://{rest}"))
    } else {
        base.strip_prefix("http://")
            .map(|rest| format!("ws://{rest}"))
    }
}
