use anyhow::Result;
use chrono::Utc;

use screen_guard::security::{SessionPolicy, SessionRecord};
use screen_guard::store::{self, RecordKey};
use screen_guard::timer::{TimerSnapshot, format_time_left};

use super::Environment;
use super::utils::format_duration;

/// Show persisted session and timer state without modifying it
pub fn status(env: &Environment) -> Result<()> {
    let now = Utc::now();
    let store = env.store.as_ref();

    println!("Screen Guard Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Config:       {}", env.config_path.display());
    println!("Data dir:     {}", env.data_dir.display());
    println!();

    let policy = SessionPolicy::from(&env.config.session);
    match store::load_record::<SessionRecord>(store, RecordKey::Session) {
        Ok(Some(record)) if record.authenticated => {
            let expires_at = record.authenticated_at + policy.timeout_for(record.emergency);
            let kind = if record.emergency { "emergency" } else { "parent" };

            if now < expires_at {
                println!(
                    "Mode:         {} (expires in {})",
                    kind,
                    format_duration(expires_at - now)
                );
            } else {
                println!("Mode:         child ({} session expired)", kind);
            }
        }
        Ok(_) => println!("Mode:         child"),
        Err(e) => println!("Mode:         child ({})", e),
    }

    match store::load_record::<TimerSnapshot>(store, RecordKey::Timer) {
        Ok(Some(snapshot)) if snapshot.is_active => {
            let remaining = snapshot.remaining_at(now);
            let phase = if snapshot.is_paused { "paused" } else { "running" };

            if remaining == 0 {
                println!("Timer:        expired (device locks on next start)");
            } else {
                println!(
                    "Timer:        {} ({} of {} left)",
                    phase,
                    format_time_left(remaining),
                    format_time_left(snapshot.duration)
                );
            }
        }
        Ok(_) => println!("Timer:        idle"),
        Err(e) => println!("Timer:        idle ({})", e),
    }

    Ok(())
}
