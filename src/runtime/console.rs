//! Line-oriented console control.
//!
//! Commands are read from stdin one per line and applied to the coordinator
//! by the event loop.

use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::coordinator::Coordinator;

#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleCmd {
    PlayPause,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Shuffle,
    Seek(Duration),
    SeekFraction(f32),
    /// 1-based position in the active order.
    PlayAt(usize),
    List,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  p | space     toggle play/pause
  play | pause  resume / pause
  stop          pause and rewind
  n | next      next track
  b | prev      previous track
  s | shuffle   toggle shuffle
  seek <secs>   jump to a position
  at <0..1>     jump to a fraction of the track
  go <n>        play the n-th listed track
  ls            list tracks
  q | quit      exit";

pub fn parse(line: &str) -> Option<ConsoleCmd> {
    if line == " " {
        return Some(ConsoleCmd::PlayPause);
    }
    let mut words = line.split_whitespace();
    let cmd = words.next()?;
    let arg = words.next();

    match (cmd, arg) {
        ("p" | "toggle", None) => Some(ConsoleCmd::PlayPause),
        ("play", None) => Some(ConsoleCmd::Play),
        ("pause", None) => Some(ConsoleCmd::Pause),
        ("stop", None) => Some(ConsoleCmd::Stop),
        ("n" | "next", None) => Some(ConsoleCmd::Next),
        ("b" | "prev" | "previous", None) => Some(ConsoleCmd::Previous),
        ("s" | "shuffle", None) => Some(ConsoleCmd::Shuffle),
        ("seek", Some(secs)) => secs
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(|s| ConsoleCmd::Seek(Duration::from_secs_f64(s))),
        ("at", Some(f)) => f.parse::<f32>().ok().map(ConsoleCmd::SeekFraction),
        ("go", Some(n)) => n
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(ConsoleCmd::PlayAt),
        ("ls" | "list", None) => Some(ConsoleCmd::List),
        ("h" | "help" | "?", None) => Some(ConsoleCmd::Help),
        ("q" | "quit" | "exit", None) => Some(ConsoleCmd::Quit),
        _ => None,
    }
}

/// Apply `cmd`. Returns `false` when the user asked to quit.
pub fn apply(coordinator: &Coordinator, cmd: ConsoleCmd) -> bool {
    match cmd {
        ConsoleCmd::PlayPause => coordinator.toggle_play_pause(),
        ConsoleCmd::Play => coordinator.resume(),
        ConsoleCmd::Pause => coordinator.pause(),
        ConsoleCmd::Stop => coordinator.stop(),
        ConsoleCmd::Next => coordinator.play_next(),
        ConsoleCmd::Previous => coordinator.play_previous(),
        ConsoleCmd::Shuffle => coordinator.toggle_shuffle(),
        ConsoleCmd::Seek(position) => coordinator.seek(position),
        ConsoleCmd::SeekFraction(f) => coordinator.seek_to_fraction(f),
        ConsoleCmd::PlayAt(n) => match coordinator.tracks().get(n - 1) {
            Some(track) => coordinator.play(track),
            None => log::warn!("no track at {n}"),
        },
        ConsoleCmd::List => {
            let current = coordinator.current();
            for (i, track) in coordinator.tracks().iter().enumerate() {
                let marker = if current.as_ref().is_some_and(|c| c.same_as(track)) {
                    '>'
                } else {
                    ' '
                };
                println!("{marker}{:>4}  {}", i + 1, describe(track));
            }
        }
        ConsoleCmd::Help => println!("{HELP}"),
        ConsoleCmd::Quit => return false,
    }
    true
}

pub fn describe(track: &crate::library::Track) -> String {
    match &track.artist {
        Some(artist) => format!("{artist} - {}", track.title),
        None => track.title.clone(),
    }
}

/// Read stdin on a background thread. The thread ends at EOF; the sender is
/// dropped with it.
pub fn spawn_reader(tx: Sender<ConsoleCmd>) {
    let spawned = thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() && line != " " {
                    continue;
                }
                match parse(&line) {
                    Some(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    None => println!("unknown command: {} (try `help`)", line.trim()),
                }
            }
            log::debug!("console input closed");
        });
    if let Err(e) = spawned {
        log::warn!("console control unavailable: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_words() {
        assert_eq!(parse("p"), Some(ConsoleCmd::PlayPause));
        assert_eq!(parse(" "), Some(ConsoleCmd::PlayPause));
        assert_eq!(parse("next"), Some(ConsoleCmd::Next));
        assert_eq!(parse("  b  "), Some(ConsoleCmd::Previous));
        assert_eq!(parse("q"), Some(ConsoleCmd::Quit));
        assert_eq!(parse("dance"), None);
        assert_eq!(parse("next 2"), None);
    }

    #[test]
    fn parses_arguments() {
        assert_eq!(parse("seek 12.5"), Some(ConsoleCmd::Seek(Duration::from_millis(12_500))));
        assert_eq!(parse("seek -1"), None);
        assert_eq!(parse("seek"), None);
        assert_eq!(parse("at 0.5"), Some(ConsoleCmd::SeekFraction(0.5)));
        assert_eq!(parse("go 3"), Some(ConsoleCmd::PlayAt(3)));
        assert_eq!(parse("go 0"), None);
    }
}
