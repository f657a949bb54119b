use std::time::Duration;

use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode};

use crate::domain::{Config, DirectoryError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &Config) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DirectoryError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            // While one of the criteria inputs is active the model owns
            // every keystroke.
            if model.raw_keyevents() {
                return Ok(Some(Message::RawKey(key)));
            }
            return Ok(self.handle_key(key));
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('/') => Some(Message::EditSearch),
            KeyCode::Char('f') => Some(Message::EditFaculty),
            KeyCode::Char('c') => Some(Message::ClearFilters),
            KeyCode::Char('n') | KeyCode::Char(']') | KeyCode::PageDown => {
                Some(Message::NextPage)
            }
            KeyCode::Char('p') | KeyCode::Char('[') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Char('y') => Some(Message::CopyCard),
            KeyCode::Char('d') => Some(Message::Export),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
