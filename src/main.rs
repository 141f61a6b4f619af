//! Narrate main entry point
//!
//! The player's main loop waits on stdin (user keys) with a timeout sized
//! by the controller's next sampler tick or deferred step, then lets the
//! controller apply narrator events and timers. Every snapshot the
//! controller publishes is rendered as a status line or a JSON object.

use anyhow::{bail, Context};
use log::{debug, error, info, warn};
use mio::{Events, Interest, Poll, Token};
use narrate::config::Config;
use narrate::input::{create_default_keymap, parse_keys, KeyAction};
use narrate::platform::is_wsl;
use narrate::playback::{status_line, NarrationController, PlaybackSettings, PlaybackStatus};
use narrate::speech::create_backend;
use narrate::terminal::{is_tty, TermiosGuard};
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::process;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

/// Token for stdin in mio poll
const STDIN: Token = Token(0);

/// Longest the loop sleeps when nothing is scheduled
const MAX_WAIT: Duration = Duration::from_millis(100);

/// Command line options
struct Options {
    debug: bool,
    json: bool,
    file: String,
}

fn parse_args() -> Option<Options> {
    let mut debug = false;
    let mut json = false;
    let mut file = None;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--debug" | "-d" => debug = true,
            "--json" => json = true,
            _ if file.is_none() && !arg.starts_with('-') => file = Some(arg),
            _ => return None,
        }
    }

    file.map(|file| Options { debug, json, file })
}

fn main() {
    let options = match parse_args() {
        Some(options) => options,
        None => {
            eprintln!("Usage: {} [--debug] [--json] <file>", narrate::APP_NAME);
            process::exit(2);
        }
    };

    // Initialize logger
    if options.debug {
        // Debug mode: write to narrate.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("narrate.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open narrate.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "narrate version {} starting (debug mode, logging to narrate.log)",
            narrate::VERSION
        );
    } else {
        // Normal mode: minimal logging to stderr, only errors
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }

    if let Err(e) = run(&options) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(options: &Options) -> anyhow::Result<()> {
    let markup = std::fs::read_to_string(&options.file)
        .with_context(|| format!("Failed to read {}", options.file))?;

    let settings = match Config::load() {
        Ok(config) => {
            info!("Config loaded from {:?}", config.path());
            config.playback_settings()
        }
        Err(e) => {
            warn!("Using default settings: {}", e);
            PlaybackSettings::default()
        }
    };

    let backend = match create_backend() {
        Ok(backend) => Some(backend),
        Err(e) => {
            eprintln!("{} (controls are disabled)", e);
            None
        }
    };

    let mut controller = NarrationController::new(backend, settings);
    let source = controller.load_content(&markup);
    info!("Narrating {} ({} words)", options.file, source.word_count());
    let snapshots = controller.subscribe();

    let stdin_fd = io::stdin().as_raw_fd();
    if !is_tty(stdin_fd) {
        bail!("narrate requires an interactive terminal (stdin is not a TTY)");
    }
    let _guard = TermiosGuard::new(stdin_fd)?;

    if !options.json {
        println!("space/p play-pause  s stop  \u{2190}/j back  \u{2192}/l forward  m mute  q quit");
    }

    let mut waiter = InputWaiter::new(stdin_fd)?;
    let keymap = create_default_keymap();
    info!("Key handler initialized with {} bindings", keymap.len());

    loop {
        let now = Instant::now();
        controller.poll(now);
        render(&snapshots, options.json)?;

        let timeout = controller
            .time_until_next_wakeup(now)
            .map_or(MAX_WAIT, |d| d.min(MAX_WAIT));

        if !waiter.wait(timeout)? {
            continue;
        }

        let mut buf = [0u8; 64];
        let n = io::stdin().read(&mut buf)?;
        if n == 0 {
            info!("stdin closed");
            break;
        }

        let mut quit = false;
        for action in parse_keys(&keymap, &buf[..n]) {
            debug!("Key action {:?}", action);
            if !dispatch(&mut controller, action, Instant::now()) {
                quit = true;
                break;
            }
        }
        render(&snapshots, options.json)?;
        if quit {
            break;
        }
    }

    drop(controller);
    if !options.json {
        println!();
    }
    Ok(())
}

/// Apply one key action; false means quit
fn dispatch(controller: &mut NarrationController, action: KeyAction, now: Instant) -> bool {
    match action {
        KeyAction::PlayPause => match controller.status() {
            PlaybackStatus::Idle => {
                let from = controller.state().elapsed_seconds;
                controller.play(from, now);
            }
            PlaybackStatus::Ended | PlaybackStatus::Error => controller.play(0.0, now),
            PlaybackStatus::Playing | PlaybackStatus::Paused => controller.pause_or_resume(now),
            PlaybackStatus::Loading => {}
        },
        KeyAction::Stop => controller.stop(),
        KeyAction::SkipBack => controller.skip_back(now),
        KeyAction::SkipForward => controller.skip_forward(now),
        KeyAction::ToggleMute => controller.toggle_mute(now),
        KeyAction::Quit => return false,
    }
    true
}

/// Draw every snapshot published since the last call
fn render(snapshots: &Receiver<narrate::playback::PlaybackSnapshot>, json: bool) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    for snapshot in snapshots.try_iter() {
        if json {
            writeln!(stdout, "{}", snapshot.to_json()?)?;
        } else {
            write!(stdout, "\r\x1b[K{}", status_line(&snapshot))?;
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Waits for stdin to become readable
///
/// WSL doesn't support epoll on TTY file descriptors, so select() is used
/// there instead of mio.
enum InputWaiter {
    Mio { poll: Poll, events: Events },
    Select { fd: RawFd },
}

impl InputWaiter {
    fn new(stdin_fd: RawFd) -> io::Result<Self> {
        if is_wsl() {
            debug!("Using select() for event loop (WSL mode)");
            return Ok(InputWaiter::Select { fd: stdin_fd });
        }

        debug!("Using mio::Poll for event loop");
        let poll = Poll::new()?;
        let mut stdin_source = mio::unix::SourceFd(&stdin_fd);
        poll.registry()
            .register(&mut stdin_source, STDIN, Interest::READABLE)?;
        Ok(InputWaiter::Mio {
            poll,
            events: Events::with_capacity(16),
        })
    }

    /// True if stdin is readable before `timeout` passes
    fn wait(&mut self, timeout: Duration) -> io::Result<bool> {
        match self {
            InputWaiter::Mio { poll, events } => {
                match poll.poll(events, Some(timeout)) {
                    Ok(()) => Ok(events.iter().any(|event| event.token() == STDIN)),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(false),
                    Err(e) => Err(e),
                }
            }
            InputWaiter::Select { fd } => {
                use nix::sys::select::{select, FdSet};
                use nix::sys::time::{TimeVal, TimeValLike};
                use std::os::unix::io::BorrowedFd;

                let stdin_borrowed = unsafe { BorrowedFd::borrow_raw(*fd) };
                let mut read_fds = FdSet::new();
                read_fds.insert(stdin_borrowed);
                let mut timeout = TimeVal::milliseconds(timeout.as_millis() as i64);

                match select(None, Some(&mut read_fds), None, None, Some(&mut timeout)) {
                    Ok(_) => Ok(read_fds.contains(stdin_borrowed)),
                    Err(nix::errno::Errno::EINTR) => Ok(false),
                    Err(e) => Err(io::Error::from_raw_os_error(e as i32)),
                }
            }
        }
    }
}
