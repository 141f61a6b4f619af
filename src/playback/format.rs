//! Time and status formatting for renderers

use super::state::{PlaybackSnapshot, PlaybackStatus};

/// Format seconds as `M:SS` (minutes are not wrapped into hours)
pub fn format_clock(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Fraction of `total` covered by `elapsed`, 0 when there is nothing to play
pub fn progress(elapsed: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (elapsed / total).clamp(0.0, 1.0)
}

/// One-line player status, e.g. `▶ 0:15 / 2:00 [muted]`
pub fn status_line(snapshot: &PlaybackSnapshot) -> String {
    let icon = match snapshot.status {
        PlaybackStatus::Playing => "▶",
        PlaybackStatus::Paused => "❚❚",
        PlaybackStatus::Loading => "…",
        PlaybackStatus::Ended => "■",
        PlaybackStatus::Error => "!",
        PlaybackStatus::Idle => "▷",
    };

    let mut line = format!(
        "{} {} / {}",
        icon,
        format_clock(snapshot.elapsed_seconds),
        format_clock(snapshot.total_duration)
    );
    if snapshot.is_muted {
        line.push_str(" [muted]");
    }
    if let Some(error) = &snapshot.error {
        line.push_str(&format!(" ({})", error));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::state::PlaybackState;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(9.99), "0:09");
        assert_eq!(format_clock(75.0), "1:15");
        assert_eq!(format_clock(120.0), "2:00");
        assert_eq!(format_clock(3725.0), "62:05");
    }

    #[test]
    fn test_format_clock_rejects_garbage() {
        assert_eq!(format_clock(-3.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }

    #[test]
    fn test_progress() {
        assert_eq!(progress(30.0, 120.0), 0.25);
        assert_eq!(progress(5.0, 0.0), 0.0);
        assert_eq!(progress(200.0, 120.0), 1.0);
    }

    #[test]
    fn test_status_line() {
        let mut state = PlaybackState::new();
        state.status = PlaybackStatus::Playing;
        state.total_duration = 120.0;
        state.elapsed_seconds = 15.4;
        assert_eq!(status_line(&state.snapshot()), "▶ 0:15 / 2:00");

        state.is_muted = true;
        state.status = PlaybackStatus::Paused;
        assert_eq!(status_line(&state.snapshot()), "❚❚ 0:15 / 2:00 [muted]");
    }
}
