//! Platform detection utilities

use log::debug;
use once_cell::sync::Lazy;
use std::fs;

/// WSL is detected once; backend probing and the event loop both ask
static WSL: Lazy<bool> = Lazy::new(detect_wsl);

/// Whether we run under WSL (Windows Subsystem for Linux)
///
/// WSL changes both which speech backend works (espeak-ng over WSLg
/// PulseAudio) and how stdin can be polled (no epoll on TTYs).
pub fn is_wsl() -> bool {
    *WSL
}

fn detect_wsl() -> bool {
    let from_kernel = fs::read_to_string("/proc/version")
        .map(|contents| {
            let lower = contents.to_lowercase();
            lower.contains("microsoft") || lower.contains("wsl")
        })
        .unwrap_or(false);

    let detected = from_kernel || std::env::var("WSL_DISTRO_NAME").is_ok();
    debug!("WSL detected: {}", detected);
    detected
}
