use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use screen_guard::clock::{Clock, SystemClock};
use screen_guard::error::ControlError;
use screen_guard::lock::{EventSink, LockCoordinator, Mode};
use screen_guard::timer::{TickSchedule, WarningTracker, format_time_left};

use super::Environment;
use super::shell::{self, HELP, ShellCommand};
use super::utils::format_duration;

/// Prints warnings and lock changes as the countdown advances
struct ConsoleSink {
    warnings: WarningTracker,
}

impl EventSink for ConsoleSink {
    fn on_update(&mut self, time_left: u32, active: bool) {
        if let Some(warning) = self.warnings.observe(time_left, active) {
            let marker = if warning.is_urgent() { "!!" } else { "⏰" };
            println!();
            println!("{} {}: {}", marker, warning.title(), warning.message());
        }
    }

    fn on_lock(&mut self, locked: bool) {
        if locked {
            self.warnings.reset();
            println!();
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("🔒 Screen time is up. This device is locked.");
            println!("   Ask a parent to unlock it.");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        }
    }
}

/// Whether the loop should keep reading commands
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Run the interactive controller until `quit`, end of input or Ctrl+C
pub fn run(env: &Environment) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run_loop(env))
}

async fn run_loop(env: &Environment) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut coordinator = LockCoordinator::from_config(&env.config, clock, env.store.clone());
    coordinator.add_sink(Box::new(ConsoleSink {
        warnings: WarningTracker::new(env.config.timer.warnings_seconds.clone()),
    }));

    info!("Controller started, data directory: {}", env.data_dir.display());

    println!("Screen Guard v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for commands.");
    print_status(&mut coordinator);

    let mut schedule = TickSchedule::new();
    schedule.sync(coordinator.timer_running());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = schedule.next() => {
                coordinator.tick();
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    info!("End of input");
                    break;
                };

                if handle_line(&mut coordinator, &line) == Flow::Quit {
                    break;
                }
            }
            _ = &mut shutdown => {
                println!();
                info!("Interrupted");
                break;
            }
        }

        schedule.sync(coordinator.timer_running());
    }

    schedule.disarm();
    info!("Controller stopped");
    Ok(())
}

fn handle_line(coordinator: &mut LockCoordinator, line: &str) -> Flow {
    let command = match shell::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Flow::Continue,
        Err(e) => {
            println!("✗ {}", e);
            return Flow::Continue;
        }
    };

    if coordinator.is_locked() && !command.allowed_while_locked() {
        println!("🔒 Device is locked. Use 'unlock', 'unlock-voice' or 'emergency'.");
        return Flow::Continue;
    }

    match execute(coordinator, command) {
        Ok(flow) => flow,
        Err(e) => {
            println!("✗ {}", e);
            Flow::Continue
        }
    }
}

fn execute(coordinator: &mut LockCoordinator, command: ShellCommand) -> Result<Flow, ControlError> {
    match command {
        ShellCommand::Auth { method, input } => {
            coordinator.login(method, &input)?;
            println!("✓ Parent mode");
        }
        ShellCommand::Logout => {
            coordinator.logout();
            println!("✓ Child mode");
        }
        ShellCommand::Start { minutes } => {
            coordinator.start_timer(minutes)?;
            println!("✓ Timer started for {} minutes", minutes);
        }
        ShellCommand::Pause => {
            coordinator.pause_timer()?;
            println!("✓ Timer paused at {}", format_time_left(coordinator.timer().time_left()));
        }
        ShellCommand::Resume => {
            coordinator.resume_timer()?;
            println!("✓ Timer resumed");
        }
        ShellCommand::Stop => {
            coordinator.stop_timer()?;
            println!("✓ Timer stopped");
        }
        ShellCommand::Reset => {
            coordinator.reset_timer()?;
            println!("✓ Timer reset");
        }
        ShellCommand::Unlock { method, input } => {
            coordinator.unlock(method, &input)?;
            println!("🔓 Device unlocked");
        }
        ShellCommand::Emergency { code } => {
            coordinator.emergency_unlock(&code)?;
            println!("🔓 Emergency access granted");
        }
        ShellCommand::SetPin {
            new_pin,
            confirm,
            current,
        } => {
            coordinator.change_pin(current.as_deref(), &new_pin, &confirm)?;
            println!("✓ Parent PIN updated");
        }
        ShellCommand::ResetPin { current } => {
            coordinator.reset_pin(current.as_deref())?;
            println!("✓ Parent PIN reset to defaults");
        }
        ShellCommand::Status => print_status(coordinator),
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

fn print_status(coordinator: &mut LockCoordinator) {
    let state = coordinator.state();
    let status = coordinator.timer().status();

    match state.effective_mode {
        Mode::Parent => {
            let kind = if coordinator.session().is_emergency() {
                "emergency"
            } else {
                "parent"
            };
            print!("Mode: {}", kind);
            if let Some(expires_at) = coordinator.session().expires_at() {
                print!(" (expires in {})", format_duration(expires_at - chrono::Utc::now()));
            }
            println!();
        }
        Mode::Child => println!("Mode: child"),
    }

    println!(
        "Timer: {} ({})",
        status.phase.label(),
        format_time_left(status.time_left)
    );

    if state.locked {
        println!("Device: 🔒 locked");
        if let Some(remaining) = coordinator.retry_after() {
            println!("Unlock blocked for {}", format_duration(remaining));
        }
    } else {
        println!("Device: unlocked");
    }
}
