//! Preview surfaces for the capture session.

use crate::terminal::TerminalScreen;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use image::RgbImage;
use std::io;
use std::time::Duration;
use tracing::debug;

/// What the user asked for while a preview is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayCommand {
    /// Save the current frame pair and build the cloud.
    Capture,
    /// Stop without saving anything.
    Interrupt,
}

/// Shows color frames and reports user commands.
pub trait FrameDisplay {
    /// Present a frame.
    fn show(&mut self, frame: &RgbImage) -> io::Result<()>;

    /// Return a pending command without blocking.
    fn poll_command(&mut self) -> io::Result<Option<DisplayCommand>>;

    /// Release the surface. Safe to call more than once.
    fn close(&mut self);
}

impl<D: FrameDisplay + ?Sized> FrameDisplay for Box<D> {
    fn show(&mut self, frame: &RgbImage) -> io::Result<()> {
        (**self).show(frame)
    }

    fn poll_command(&mut self) -> io::Result<Option<DisplayCommand>> {
        (**self).poll_command()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

const CAPTURE_HELP: &str = "'q'/Enter/Space capture | Esc/Ctrl+C quit";

/// Interactive preview in the terminal.
pub struct TerminalDisplay {
    screen: TerminalScreen,
    frames: u64,
}

impl TerminalDisplay {
    pub fn open() -> io::Result<Self> {
        Ok(Self {
            screen: TerminalScreen::open()?,
            frames: 0,
        })
    }
}

impl FrameDisplay for TerminalDisplay {
    fn show(&mut self, frame: &RgbImage) -> io::Result<()> {
        self.frames += 1;
        let status = format!("{} | frame {}", CAPTURE_HELP, self.frames);
        self.screen.draw(Some(frame), &status)
    }

    fn poll_command(&mut self) -> io::Result<Option<DisplayCommand>> {
        Ok(self.screen.next_key(Duration::ZERO)?.and_then(command_for_key))
    }

    fn close(&mut self) {
        self.screen.restore();
    }
}

/// Map a key press to a capture command.
pub fn command_for_key(key: KeyEvent) -> Option<DisplayCommand> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(DisplayCommand::Interrupt);
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Enter | KeyCode::Char(' ') => {
            Some(DisplayCommand::Capture)
        }
        KeyCode::Esc => Some(DisplayCommand::Interrupt),
        _ => None,
    }
}

/// Headless display that issues a command once enough frames were shown.
#[derive(Debug)]
pub struct AutoTrigger {
    after: u64,
    command: DisplayCommand,
    shown: u64,
    closed: bool,
}

impl AutoTrigger {
    /// Capture once `frames` frames were shown (at least one).
    pub fn new(frames: u64) -> Self {
        Self {
            after: frames.max(1),
            command: DisplayCommand::Capture,
            shown: 0,
            closed: false,
        }
    }

    /// Interrupt instead of capturing.
    pub fn interrupting(frames: u64) -> Self {
        Self {
            command: DisplayCommand::Interrupt,
            ..Self::new(frames)
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameDisplay for AutoTrigger {
    fn show(&mut self, frame: &RgbImage) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::other("display is closed"));
        }
        self.shown += 1;
        debug!("Frame {} shown ({}x{})", self.shown, frame.width(), frame.height());
        Ok(())
    }

    fn poll_command(&mut self) -> io::Result<Option<DisplayCommand>> {
        Ok((self.shown >= self.after).then_some(self.command))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(command_for_key(key(KeyCode::Char('q'))), Some(DisplayCommand::Capture));
        assert_eq!(command_for_key(key(KeyCode::Enter)), Some(DisplayCommand::Capture));
        assert_eq!(command_for_key(key(KeyCode::Char(' '))), Some(DisplayCommand::Capture));
        assert_eq!(command_for_key(key(KeyCode::Esc)), Some(DisplayCommand::Interrupt));
        assert_eq!(command_for_key(key(KeyCode::Char('x'))), None);
        assert_eq!(
            command_for_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(DisplayCommand::Interrupt)
        );
        assert_eq!(command_for_key(key(KeyCode::Char('c'))), None);
    }

    #[test]
    fn test_auto_trigger() {
        let frame = RgbImage::new(2, 2);
        let mut display = AutoTrigger::new(3);
        assert_eq!(display.poll_command().unwrap(), None);
        display.show(&frame).unwrap();
        display.show(&frame).unwrap();
        assert_eq!(display.poll_command().unwrap(), None);
        display.show(&frame).unwrap();
        assert_eq!(display.poll_command().unwrap(), Some(DisplayCommand::Capture));

        display.close();
        display.close();
        assert!(display.is_closed());
        assert!(display.show(&frame).is_err());
    }

    #[test]
    fn test_auto_trigger_zero_frames_waits_for_one() {
        let mut display = AutoTrigger::interrupting(0);
        assert_eq!(display.poll_command().unwrap(), None);
        display.show(&RgbImage::new(1, 1)).unwrap();
        assert_eq!(display.poll_command().unwrap(), Some(DisplayCommand::Interrupt));
    }
}
