use anyhow::{Context, Result, bail};

use screen_guard::security::AuthMethod;

/// A line typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Auth { method: AuthMethod, input: String },
    Logout,
    Start { minutes: u32 },
    Pause,
    Resume,
    Stop,
    Reset,
    Unlock { method: AuthMethod, input: String },
    Emergency { code: String },
    SetPin { new_pin: String, confirm: String, current: Option<String> },
    ResetPin { current: Option<String> },
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    /// Commands offered by the lock screen
    pub fn allowed_while_locked(&self) -> bool {
        matches!(
            self,
            Self::Unlock { .. } | Self::Emergency { .. } | Self::Status | Self::Help | Self::Quit
        )
    }
}

pub const HELP: &str = "\
Parent access:
  auth pin <PIN>                   Switch to parent mode with a PIN
  auth voice <PHRASE>              Switch to parent mode with a voice phrase
  logout                           Return to child mode
Timer (parent only):
  start <MINUTES>                  Start a countdown
  pause | resume | stop | reset    Control the countdown
PIN (parent only):
  pin set <NEW> <CONFIRM> [CURRENT]
  pin reset [CURRENT]
Lock screen:
  unlock <PIN>                     Unlock with a PIN
  unlock-voice <PHRASE>            Unlock with a voice phrase
  emergency <CODE>                 Emergency access
Other:
  status | help | quit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ShellCommand>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match verb.to_lowercase().as_str() {
        "auth" | "login" => match rest.split_first() {
            Some((&"pin", [pin])) => ShellCommand::Auth {
                method: AuthMethod::Pin,
                input: pin.to_string(),
            },
            Some((&"voice", phrase)) if !phrase.is_empty() => ShellCommand::Auth {
                method: AuthMethod::Voice,
                input: phrase.join(" "),
            },
            _ => bail!("Usage: auth pin <PIN> | auth voice <PHRASE>"),
        },
        "logout" => ShellCommand::Logout,
        "start" => {
            let [minutes] = rest.as_slice() else {
                bail!("Usage: start <MINUTES>");
            };
            let minutes = minutes
                .parse()
                .with_context(|| format!("Not a number of minutes: {}", minutes))?;
            ShellCommand::Start { minutes }
        }
        "pause" => ShellCommand::Pause,
        "resume" => ShellCommand::Resume,
        "stop" => ShellCommand::Stop,
        "reset" => ShellCommand::Reset,
        "unlock" => match rest.as_slice() {
            [pin] => ShellCommand::Unlock {
                method: AuthMethod::Pin,
                input: pin.to_string(),
            },
            _ => bail!("Usage: unlock <PIN>"),
        },
        "unlock-voice" if !rest.is_empty() => ShellCommand::Unlock {
            method: AuthMethod::Voice,
            input: rest.join(" "),
        },
        "unlock-voice" => bail!("Usage: unlock-voice <PHRASE>"),
        "emergency" => match rest.as_slice() {
            [code] => ShellCommand::Emergency {
                code: code.to_string(),
            },
            _ => bail!("Usage: emergency <CODE>"),
        },
        "pin" => match rest.as_slice() {
            ["set", new_pin, confirm] => ShellCommand::SetPin {
                new_pin: new_pin.to_string(),
                confirm: confirm.to_string(),
                current: None,
            },
            ["set", new_pin, confirm, current] => ShellCommand::SetPin {
                new_pin: new_pin.to_string(),
                confirm: confirm.to_string(),
                current: Some(current.to_string()),
            },
            ["reset"] => ShellCommand::ResetPin { current: None },
            ["reset", current] => ShellCommand::ResetPin {
                current: Some(current.to_string()),
            },
            _ => bail!("Usage: pin set <NEW> <CONFIRM> [CURRENT] | pin reset [CURRENT]"),
        },
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => bail!("Unknown command: {} (type 'help')", other),
    };

    Ok(Some(command))
}
