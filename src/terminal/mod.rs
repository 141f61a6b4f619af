//! Terminal mode handling for the interactive player

pub mod util;

pub use util::{is_tty, restore_termios, set_raw_mode, TermiosGuard};
