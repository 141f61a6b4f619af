//! Default key bindings for the player

use std::collections::HashMap;

/// Key sequence type
pub type KeySequence = Vec<u8>;

/// Transport command triggered by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Play from idle/ended, otherwise pause or resume
    PlayPause,
    Stop,
    SkipBack,
    SkipForward,
    ToggleMute,
    Quit,
}

/// Create the default keymap
pub fn create_default_keymap() -> HashMap<KeySequence, KeyAction> {
    let mut map = HashMap::new();

    map.insert(b" ".to_vec(), KeyAction::PlayPause);
    map.insert(b"p".to_vec(), KeyAction::PlayPause);
    map.insert(b"s".to_vec(), KeyAction::Stop);
    map.insert(b"m".to_vec(), KeyAction::ToggleMute);

    // Skip (arrows and vi keys)
    map.insert(b"j".to_vec(), KeyAction::SkipBack);
    map.insert(b"l".to_vec(), KeyAction::SkipForward);
    map.insert(b"\x1b[D".to_vec(), KeyAction::SkipBack);
    map.insert(b"\x1b[C".to_vec(), KeyAction::SkipForward);
    map.insert(b"\x1bOD".to_vec(), KeyAction::SkipBack);
    map.insert(b"\x1bOC".to_vec(), KeyAction::SkipForward);

    map.insert(b"q".to_vec(), KeyAction::Quit);
    map.insert(b"\x03".to_vec(), KeyAction::Quit); // Ctrl-C in raw mode

    map
}

/// Split raw terminal input into actions
///
/// Several keys can arrive in one read. The longest binding wins at each
/// position; unbound bytes are skipped.
pub fn parse_keys(keymap: &HashMap<KeySequence, KeyAction>, input: &[u8]) -> Vec<KeyAction> {
    let longest = keymap.keys().map(Vec::len).max().unwrap_or(0);
    let mut actions = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let max_len = longest.min(input.len() - pos);
        let matched = (1..=max_len)
            .rev()
            .find_map(|len| keymap.get(&input[pos..pos + len]).map(|action| (len, *action)));

        match matched {
            Some((len, action)) => {
                actions.push(action);
                pos += len;
            }
            None => pos += 1,
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keys() {
        let keymap = create_default_keymap();
        assert_eq!(parse_keys(&keymap, b" "), vec![KeyAction::PlayPause]);
        assert_eq!(parse_keys(&keymap, b"\x03"), vec![KeyAction::Quit]);
    }

    #[test]
    fn test_arrow_sequences() {
        let keymap = create_default_keymap();
        assert_eq!(parse_keys(&keymap, b"\x1b[D"), vec![KeyAction::SkipBack]);
        assert_eq!(parse_keys(&keymap, b"\x1bOC"), vec![KeyAction::SkipForward]);
    }

    #[test]
    fn test_batched_input() {
        let keymap = create_default_keymap();
        assert_eq!(
            parse_keys(&keymap, b"l\x1b[Cmx"),
            vec![
                KeyAction::SkipForward,
                KeyAction::SkipForward,
                KeyAction::ToggleMute
            ]
        );
    }

    #[test]
    fn test_unbound_bytes_skipped() {
        let keymap = create_default_keymap();
        assert!(parse_keys(&keymap, b"xyz\x1b[A").is_empty());
    }
}
