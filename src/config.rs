use dotenvy::dotenv;
use std::env;
use std::sync::{Arc, OnceLock};

/// ✅ Global Config stored in `OnceLock`
static CONFIG: OnceLock<Arc<Config>> = OnceLock::new();

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// How long after the fact an audit entry may still be undone.
    pub undo_window_hours: i64,
    /// Lookahead window for "expiring soon" reminders, in days.
    pub reminder_lookahead_days: i64,
    /// Lookback window for installment completion follow-up, in days.
    pub reminder_lookback_days: i64,
}

impl Config {
    /// ✅ Load environment variables and set defaults
    pub fn from_env() -> Self {
        dotenv().ok(); // Load .env only once

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            undo_window_hours: env_i64("UNDO_WINDOW_HOURS", 24),
            reminder_lookahead_days: env_i64("REMINDER_LOOKAHEAD_DAYS", 10),
            reminder_lookback_days: env_i64("REMINDER_LOOKBACK_DAYS", 60),
        }
    }

    /// ✅ Initialize the global config
    pub fn init() {
        CONFIG
            .set(Arc::new(Self::from_env()))
            .expect("Config already initialized");
    }

    /// ✅ Safe access to Config
    pub fn get() -> Arc<Config> {
        CONFIG.get().expect("Config not initialized").clone()
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
