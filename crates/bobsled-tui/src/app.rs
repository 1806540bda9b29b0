//! Application state and main event loop.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use bobsled_core::{PageId, ViewModel};
use bobsled_ui::Theme;

use crate::event::{BackendCommand, Generation, UiEvent};
use crate::page::Page;
use crate::ui;

/// Main application with the mounted page and channel handles.
pub struct App {
    /// The mounted page.
    page: Page,

    /// Pages to return to on Esc, most recent last.
    history: Vec<PageId>,

    /// Last generation handed out.
    generation: Generation,

    /// Colors and styles.
    theme: Theme,

    /// Receiver for events from the backend.
    ui_rx: mpsc::Receiver<UiEvent>,

    /// Sender for commands to the backend.
    cmd_tx: mpsc::Sender<BackendCommand>,
}

impl App {
    /// Create the application and mount the start page.
    pub fn new(
        start: PageId,
        ui_rx: mpsc::Receiver<UiEvent>,
        cmd_tx: mpsc::Sender<BackendCommand>,
    ) -> Self {
        let mut app = Self {
            page: Page::new(&start, 0),
            history: Vec::new(),
            generation: 0,
            theme: Theme::default(),
            ui_rx,
            cmd_tx,
        };
        app.mount(start);
        app
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// Run the main event loop.
    ///
    /// This runs on the main thread and handles:
    /// - Drawing the UI
    /// - Processing keyboard input
    /// - Applying updates from the backend, one at a time
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> std::io::Result<()> {
        loop {
            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key.code) {
                        break;
                    }
                }
            }

            self.drain_events();
        }

        let _ = self.cmd_tx.blocking_send(BackendCommand::Quit);
        Ok(())
    }

    /// Apply every queued backend event, in arrival order.
    fn drain_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.page.apply_event(event);
        }
    }

    fn next_generation(&mut self) -> Generation {
        self.generation += 1;
        self.generation
    }

    /// Mount a fresh page, replacing the current one.
    fn mount(&mut self, page: PageId) {
        let generation = self.next_generation();
        info!(page = %page, generation, "Mounting page");
        self.page = Page::new(&page, generation);
        self.send(BackendCommand::Mount { page, generation });
    }

    /// Open a page, remembering the current one for Esc.
    fn navigate(&mut self, page: PageId) {
        if page == self.page.id() {
            return;
        }
        self.history.push(self.page.id());
        self.mount(page);
    }

    fn back(&mut self) {
        if let Some(page) = self.history.pop() {
            self.mount(page);
        }
    }

    /// Re-run the connect sequence for the current page.
    fn refresh(&mut self) {
        let generation = self.next_generation();
        debug!(page = %self.page.id(), generation, "Refreshing page");
        self.page.remount(generation);
        self.send(BackendCommand::Mount {
            page: self.page.id(),
            generation,
        });
    }

    fn start_run(&mut self) {
        if let ViewModel::Task(view) = &self.page.view {
            let cmd = BackendCommand::StartRun {
                task: view.name.clone(),
                generation: self.page.generation,
            };
            self.send(cmd);
        }
    }

    fn stop_run(&mut self) {
        let Some(run) = self.page.current_run() else {
            return;
        };
        if run.is_terminal() {
            return;
        }
        let cmd = BackendCommand::StopRun {
            uuid: run.uuid.clone(),
            generation: self.page.generation,
        };
        self.send(cmd);
    }

    fn send(&self, cmd: BackendCommand) {
        let _ = self.cmd_tx.blocking_send(cmd);
    }

    /// Handle a key press.
    ///
    /// Returns true if the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return true,

            // Back, or quit from the first page
            KeyCode::Esc => {
                if !self.can_go_back() {
                    return true;
                }
                self.back();
            }

            KeyCode::Up | KeyCode::Char('k') => self.page.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.page.select_next(),

            KeyCode::Enter => {
                if let Some(target) = self.page.selected_target() {
                    self.navigate(target);
                }
            }

            KeyCode::Char('i') => self.navigate(PageId::Index),
            KeyCode::Char('l') => self.navigate(PageId::LatestRuns),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('s') => self.start_run(),
            KeyCode::Char('x') => self.stop_run(),

            _ => {}
        }
        false
    }
}
