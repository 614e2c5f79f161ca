use crate::timer::snapshot::format_time_left;

/// A remaining-time mark that has just been crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWarning {
    pub seconds_left: u32,
}

impl TimeWarning {
    pub fn title(&self) -> String {
        match self.seconds_left {
            s if s >= 60 && s % 60 == 0 => {
                let minutes = s / 60;
                format!("{} minute{} remaining", minutes, if minutes == 1 { "" } else { "s" })
            }
            s => format!("{} left", format_time_left(s)),
        }
    }

    pub fn message(&self) -> &'static str {
        match self.seconds_left {
            s if s > 300 => "Please start finishing up your current activity.",
            s if s > 120 => "Time to wrap up and prepare to put the device away.",
            s if s > 30 => "Device will lock soon. Save your progress.",
            _ => "Device locking now.",
        }
    }

    /// Whether the warning should be shown prominently
    pub fn is_urgent(&self) -> bool {
        self.seconds_left <= 120
    }
}

/// Turns countdown updates into one-shot warnings at fixed marks
#[derive(Debug, Clone)]
pub struct WarningTracker {
    thresholds: Vec<u32>,
    shown: Vec<u32>,
}

impl WarningTracker {
    pub fn new(mut thresholds: Vec<u32>) -> Self {
        thresholds.sort_unstable_by(|a, b| b.cmp(a));
        thresholds.dedup();
        Self {
            thresholds,
            shown: Vec::new(),
        }
    }

    /// Feed a countdown update; returns the warning crossed, if any
    pub fn observe(&mut self, time_left: u32, active: bool) -> Option<TimeWarning> {
        if !active {
            return None;
        }

        // The timer was restarted with more time than a mark already shown
        self.shown.retain(|&mark| mark >= time_left);

        let mark = self
            .thresholds
            .iter()
            .copied()
            .filter(|&mark| time_left <= mark && !self.shown.contains(&mark))
            .min()?;

        // Marks above this one were skipped (e.g. a short timer); never show them late
        for &skipped in self.thresholds.iter().filter(|&&m| m >= mark) {
            if !self.shown.contains(&skipped) {
                self.shown.push(skipped);
            }
        }

        Some(TimeWarning { seconds_left: mark })
    }

    /// Re-arm every mark
    pub fn reset(&mut self) {
        self.shown.clear();
    }
}
