use ratatui::layout::Rect;
use grammar_chat::{CorrectionPipeline, Message, MessageStore, PipelineEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Transcript
    pub store: MessageStore,
    pub pipeline: CorrectionPipeline,
    pub selected: Option<usize>, // index into the chronological list

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16,      // Inner height of chat area, set by the renderer
    pub chat_total_lines: u16, // Wrapped line count of the last rendered transcript
    pub follow_bottom: bool,   // Pin the view to the newest message on next render
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // One-line feedback such as "Copied correction"
    pub flash: Option<String>,

    pub model: String,
}

impl App {
    pub fn new(pipeline: CorrectionPipeline, model: &str, has_api_key: bool) -> Self {
        let mut store = MessageStore::new();
        if !has_api_key {
            store.append(Message::notice(
                "No Gemini API key configured. Set GEMINI_API_KEY or add \"api_key\" to the config file.",
            ));
        }

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            input_cursor: 0,

            store,
            pipeline,
            selected: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            follow_bottom: true,
            chat_area: None,

            animation_frame: 0,
            flash: None,
            model: model.to_string(),
        }
    }

    /// Hand the input box to the pipeline and clear it.
    pub fn send_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        self.flash = None;

        if self.pipeline.submit(&mut self.store, &text).is_some() {
            self.selected = None;
            self.scroll_to_bottom();
        }
    }

    pub fn on_pipeline_event(&mut self, event: &PipelineEvent) {
        if let PipelineEvent::Corrected { .. } | PipelineEvent::Failed { .. } = event {
            // Only follow the conversation if the user hasn't picked a message to look at
            if self.selected.is_none() {
                self.scroll_to_bottom();
            }
        }
    }

    pub fn selected_message(&self) -> Option<&Message> {
        let idx = self.selected?;
        self.store.iter_chronological().nth(idx)
    }

    pub fn select_next(&mut self) {
        let count = self.store.len();
        if count == 0 {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) => (i + 1).min(count - 1),
            None => count - 1,
        });
    }

    pub fn select_prev(&mut self) {
        let count = self.store.len();
        if count == 0 {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) => i.saturating_sub(1),
            None => count - 1,
        });
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_bottom = self.chat_scroll == self.max_scroll();
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_bottom = false;
    }

    /// Jump to the newest message and keep following it as lines are added.
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.chat_scroll = self.max_scroll();
    }

    /// Record the measured transcript height and re-clamp the scroll offset.
    pub fn set_chat_metrics(&mut self, total_lines: u16, viewport_height: u16) {
        self.chat_total_lines = total_lines;
        self.chat_height = viewport_height;
        self.chat_scroll = if self.follow_bottom {
            self.max_scroll()
        } else {
            self.chat_scroll.min(self.max_scroll())
        };
    }

    fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
    }

    /// Something on screen is waiting on the network, so the ellipsis should move.
    pub fn is_animating(&self) -> bool {
        self.pipeline.is_busy() || self.store.messages().iter().any(|m| m.is_awaiting())
    }
}
