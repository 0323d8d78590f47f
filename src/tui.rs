use std::io::{self, Stderr};
use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEvent, KeyEventKind, MouseEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Terminal input the chat screen reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize,
}

impl InputEvent {
    /// Keep key presses, mouse and resizes; drop releases, repeats, focus and paste.
    pub fn from_terminal(event: Event) -> Option<Self> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(Self::Key(key)),
            Event::Mouse(mouse) => Some(Self::Mouse(mouse)),
            Event::Resize(_, _) => Some(Self::Resize),
            _ => None,
        }
    }
}

/// Forwards terminal input from a background reader task.
///
/// Animation ticks are not produced here: the run loop only ticks while a
/// correction is outstanding, so an idle chat does not redraw.
pub struct TerminalEvents {
    rx: mpsc::UnboundedReceiver<InputEvent>,
}

impl TerminalEvents {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut reader = EventStream::new();
            while let Some(event) = reader.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "terminal event stream error");
                        continue;
                    }
                };
                if let Some(input) = InputEvent::from_terminal(event) {
                    if tx.send(input).is_err() {
                        break;
                    }
                }
            }
            debug!("terminal event reader stopped");
        });

        Self { rx }
    }

    pub async fn next(&mut self) -> Option<InputEvent> {
        self.rx.recv().await
    }
}

/// Raw mode, alternate screen and mouse capture for as long as this lives.
pub struct Screen {
    pub terminal: Tui,
}

impl Screen {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(io::stderr()))?;
        Ok(Self { terminal })
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        if let Err(e) = leave() {
            warn!(error = %e, "failed to restore terminal");
        }
    }
}

fn leave() -> Result<()> {
    execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Put the terminal back before the panic message is printed.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = leave();
        original_hook(panic_info);
    }));
}
