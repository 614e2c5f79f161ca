use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::sync::Arc;

use screen_guard::clock::ManualClock;
use screen_guard::config::AppConfig;
use screen_guard::security::AuthMethod;
use screen_guard::store::FileStore;
use screen_guard::timer::TimerPhase;
use screen_guard::{LockCoordinator, LockState, Mode};

fn open(temp: &TempDir, clock: &Arc<ManualClock>) -> LockCoordinator {
    let store = Arc::new(FileStore::new(temp.path()));
    LockCoordinator::from_config(&AppConfig::default(), clock.clone(), store)
}

#[test]
fn running_timer_catches_up_after_restart() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());

    let mut coordinator = open(&temp, &clock);
    coordinator.login(AuthMethod::Pin, "1234").unwrap();
    coordinator.start_timer(15).unwrap();
    for _ in 0..60 {
        clock.advance_secs(1);
        coordinator.tick();
    }
    drop(coordinator);

    temp.child("timer.json")
        .assert(predicate::str::contains(r#""timeLeft":840"#))
        .assert(predicate::str::contains(r#""duration":900"#));

    clock.advance_secs(120);
    let coordinator = open(&temp, &clock);
    assert_eq!(coordinator.timer().phase(), TimerPhase::Running);
    assert_eq!(coordinator.timer().time_left(), 720);
}

#[test]
fn expired_budget_locks_on_restart() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());

    let mut coordinator = open(&temp, &clock);
    coordinator.login(AuthMethod::Pin, "1234").unwrap();
    coordinator.start_timer(1).unwrap();
    coordinator.logout();
    drop(coordinator);

    clock.advance_secs(5 * 60);
    let mut coordinator = open(&temp, &clock);
    assert_eq!(
        coordinator.state(),
        LockState {
            locked: true,
            effective_mode: Mode::Child
        }
    );
    temp.child("timer.json").assert(predicate::path::missing());
}

#[test]
fn paused_timer_survives_restart() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());

    let mut coordinator = open(&temp, &clock);
    coordinator.login(AuthMethod::Pin, "1234").unwrap();
    coordinator.start_timer(10).unwrap();
    coordinator.pause_timer().unwrap();
    drop(coordinator);

    clock.advance_secs(3600);
    let coordinator = open(&temp, &clock);
    assert_eq!(coordinator.timer().phase(), TimerPhase::Paused);
    assert_eq!(coordinator.timer().time_left(), 600);
    assert!(!coordinator.is_locked());
}

#[test]
fn parent_session_persists_until_timeout() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());

    let mut coordinator = open(&temp, &clock);
    coordinator.login(AuthMethod::Voice, "Parent override").unwrap();
    drop(coordinator);

    temp.child("session.json")
        .assert(predicate::str::contains(r#""authenticated":true"#));

    clock.advance_secs(10 * 60);
    let mut coordinator = open(&temp, &clock);
    assert_eq!(coordinator.state().effective_mode, Mode::Parent);

    clock.advance_secs(20 * 60);
    assert_eq!(coordinator.state().effective_mode, Mode::Child);
    temp.child("session.json").assert(predicate::path::missing());
}

#[test]
fn custom_pin_is_stored_hashed() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());

    let mut coordinator = open(&temp, &clock);
    coordinator.login(AuthMethod::Pin, "1234").unwrap();
    coordinator.change_pin(None, "482913", "482913").unwrap();
    coordinator.logout();
    drop(coordinator);

    temp.child("pin.json")
        .assert(predicate::str::contains("$argon2"))
        .assert(predicate::str::contains("482913").not());

    let mut coordinator = open(&temp, &clock);
    assert!(coordinator.login(AuthMethod::Pin, "1234").is_err());
    coordinator.login(AuthMethod::Pin, "482913").unwrap();
}

#[test]
fn malformed_records_fall_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    temp.child("session.json").write_str("{not json").unwrap();
    temp.child("timer.json")
        .write_str(r#"{"timeLeft":"soon"}"#)
        .unwrap();

    let clock = Arc::new(ManualClock::default());
    let mut coordinator = open(&temp, &clock);

    assert_eq!(
        coordinator.state(),
        LockState {
            locked: false,
            effective_mode: Mode::Child
        }
    );
    assert_eq!(coordinator.timer().phase(), TimerPhase::Idle);
    temp.child("session.json").assert(predicate::path::missing());
    temp.child("timer.json").assert(predicate::path::missing());
}

#[test]
fn plain_pin_record_does_not_lock_out_parent() {
    let temp = TempDir::new().unwrap();
    temp.child("pin.json").write_str(r#""5678""#).unwrap();

    let clock = Arc::new(ManualClock::default());
    let mut coordinator = open(&temp, &clock);

    assert!(!coordinator.session().has_custom_pin());
    temp.child("pin.json").assert(predicate::path::missing());
    coordinator.login(AuthMethod::Pin, "1234").unwrap();
}
