use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
};
use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::{
    action::Action,
    components::{
        Component,
        query_bar::QueryBar,
        query_preview::QueryPreview,
        screen_layout::{render_instructions, split_instructions},
    },
    config::{Config, Mode},
    expression::Expression,
    schema::Schema,
    serializer::{MultiValuePolicy, serialize},
    theme::Theme,
    tui::{Event, Tui},
};

/// Ticks the loading indicator stays on after a search.
const LOADING_TICKS: u16 = 8;

/// Owns the expression collection and routes events and actions to the components.
pub struct App {
    config: Config,
    tick_rate: f64,
    frame_rate: f64,
    query_bar: QueryBar,
    preview: QueryPreview,
    expressions: Vec<Expression>,
    policy: MultiValuePolicy,
    theme: Theme,
    show_instructions: bool,
    loading_ticks: u16,
    should_quit: bool,
    should_suspend: bool,
    action_tx: UnboundedSender<Action>,
    action_rx: UnboundedReceiver<Action>,
}

impl App {
    pub fn new(config: Config, schema: Schema, tick_rate: f64, frame_rate: f64) -> Result<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let expressions = config.query.initial.clone();
        let policy = config.query.multi_value_keys.clone();
        let mut app = Self {
            tick_rate,
            frame_rate,
            query_bar: QueryBar::new(schema),
            preview: QueryPreview::new(policy.clone()),
            expressions: expressions.clone(),
            policy,
            theme: Theme::named(&config.query.theme),
            show_instructions: true,
            loading_ticks: 0,
            should_quit: false,
            should_suspend: false,
            action_tx,
            action_rx,
            config,
        };
        let action_tx = app.action_tx.clone();
        let config = app.config.clone();
        for component in app.components_mut() {
            component.register_action_handler(action_tx.clone())?;
            component.register_config_handler(config.clone())?;
            component.update(Action::SyncExpressions(expressions.clone()))?;
        }
        Ok(app)
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// The collection flattened into the query map.
    pub fn query(&self) -> Map<String, Value> {
        serialize(&self.expressions, &self.policy)
    }

    pub fn query_bar(&self) -> &QueryBar {
        &self.query_bar
    }

    fn components_mut(&mut self) -> [&mut dyn Component; 2] {
        [&mut self.query_bar, &mut self.preview]
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?
            .mouse(true)
            .paste(true)
            .tick_rate(self.tick_rate)
            .frame_rate(self.frame_rate);
        tui.enter()?;

        let size = tui.size()?;
        for component in self.components_mut() {
            component.init(size)?;
        }

        let action_tx = self.action_tx.clone();
        loop {
            self.handle_events(&mut tui).await?;
            self.handle_actions(&mut tui)?;
            if self.should_suspend {
                tui.suspend()?;
                action_tx.send(Action::Resume)?;
                action_tx.send(Action::ClearScreen)?;
                tui.enter()?;
            } else if self.should_quit {
                tui.stop()?;
                break;
            }
        }
        tui.exit()?;
        info!(expressions = self.expressions.len(), "query bar closed");
        Ok(())
    }

    async fn handle_events(&mut self, tui: &mut Tui) -> Result<()> {
        let Some(event) = tui.next_event().await else {
            return Ok(());
        };
        let action_tx = self.action_tx.clone();
        match event {
            Event::Quit => action_tx.send(Action::Quit)?,
            Event::Tick => action_tx.send(Action::Tick)?,
            Event::Render => action_tx.send(Action::Render)?,
            Event::Resize(x, y) => action_tx.send(Action::Resize(x, y))?,
            Event::Key(key) => self.handle_key_event(key)?,
            _ => {}
        }
        for component in self.components_mut() {
            if let Some(action) = component.handle_events(Some(event.clone()))? {
                action_tx.send(action)?;
            }
        }
        Ok(())
    }

    /// Global bindings apply whatever has focus.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if let Some(action) = self.config.action_for_key(Mode::Global, key) {
            debug!("Global action: {action}");
            self.action_tx.send(action)?;
        }
        Ok(())
    }

    fn handle_actions(&mut self, tui: &mut Tui) -> Result<()> {
        while let Ok(action) = self.action_rx.try_recv() {
            match action {
                Action::ClearScreen => tui.terminal.clear()?,
                Action::Resize(w, h) => {
                    tui.resize(Rect::new(0, 0, w, h))?;
                    self.render(tui)?;
                }
                Action::Render => self.render(tui)?,
                _ => {}
            }
            self.process(action)?;
        }
        Ok(())
    }

    /// Apply one action to the host state, then hand it to every component.
    pub fn process(&mut self, action: Action) -> Result<()> {
        if !matches!(action, Action::Tick | Action::Render) {
            debug!("{action:?}");
        }
        match &action {
            Action::Quit => self.should_quit = true,
            Action::Suspend => self.should_suspend = true,
            Action::Resume => self.should_suspend = false,
            Action::Error(msg) => error!("{msg}"),
            Action::ExpressionsChanged(expressions) => {
                self.expressions = expressions.clone();
                self.action_tx.send(Action::SyncExpressions(expressions.clone()))?;
            }
            Action::Search(text) => {
                info!(%text, "search submitted");
                self.loading_ticks = LOADING_TICKS;
                self.action_tx.send(Action::SetLoading(true))?;
            }
            Action::Tick if self.loading_ticks > 0 => {
                self.loading_ticks -= 1;
                if self.loading_ticks == 0 {
                    self.action_tx.send(Action::SetLoading(false))?;
                }
            }
            Action::CopyQuery => self.copy_query(),
            Action::ToggleInstructions => self.show_instructions = !self.show_instructions,
            _ => {}
        }
        let action_tx = self.action_tx.clone();
        for component in self.components_mut() {
            if let Some(action) = component.update(action.clone())? {
                action_tx.send(action)?;
            }
        }
        Ok(())
    }

    fn copy_query(&self) {
        let text = match serde_json::to_string_pretty(&self.query()) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize query: {e}");
                return;
            }
        };
        if let Err(e) = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            error!("Failed to copy to clipboard: {}", e);
        }
    }

    fn instructions(&self) -> String {
        self.config.actions_to_instructions(&[
            (Mode::QueryBar, Action::FocusQueryBar),
            (Mode::Global, Action::ClearExpressions),
            (Mode::Global, Action::CopyQuery),
            (Mode::Global, Action::ToggleInstructions),
            (Mode::Global, Action::Quit),
        ])
    }

    fn render(&mut self, tui: &mut Tui) -> Result<()> {
        tui.draw(|frame| {
            if let Err(err) = self.draw(frame) {
                let _ = self.action_tx.send(Action::Error(format!("Failed to draw: {err:?}")));
            }
        })?;
        Ok(())
    }

    pub fn draw(&mut self, frame: &mut Frame) -> Result<()> {
        let instructions = self.instructions();
        let layout = split_instructions(frame.area(), self.show_instructions, &instructions);
        let content = layout.content_area;
        let bar_height = self.query_bar.height_for(content.width).min(content.height);
        let [bar_area, preview_area] =
            Layout::vertical([Constraint::Length(bar_height), Constraint::Min(0)]).areas(content);

        self.preview.draw(frame, preview_area)?;
        if let Some(area) = layout.instructions_area {
            render_instructions(frame, area, &instructions, &self.theme);
        }
        // last, so the option list overlays the panels below
        self.query_bar.draw(frame, bar_area)?;
        Ok(())
    }
}
