use crate::client::ChatClient;
use crate::conversation::{ChatMessage, Conversation, Origin};
use crate::protocol::{ChatEvent, ConnectionStatus};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

const INPUT_HEIGHT: u16 = 6;

// Restores terminal settings even if the loop exits early.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Self {
        Self
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = io::stdout().flush();
    }
}

#[derive(Debug, Clone)]
struct LineSpec {
    text: String,
    style: Style,
}

impl LineSpec {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

fn line_specs(message: &ChatMessage, assistant: &str) -> Vec<LineSpec> {
    let (label, color) = match message.origin() {
        Origin::User => ("You".to_string(), Color::Blue),
        Origin::Assistant => (assistant.to_string(), Color::Yellow),
    };
    let header_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    let body_style = Style::default().fg(color);
    let mut lines = vec![LineSpec::new(format!("{label}:"), header_style)];

    if message.is_pending() && message.text().is_empty() {
        lines.push(LineSpec::new(
            "  typing...",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        ));
        return lines;
    }

    for line in message.text().lines() {
        lines.push(LineSpec::new(format!("  {}", line), body_style));
    }
    if message.is_pending() {
        if let Some(last) = lines.last_mut() {
            last.text.push_str(" ▍");
        }
    }
    lines
}

fn rendered_height(specs: &[LineSpec], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let mut total = 0usize;
    for spec in specs {
        let len = spec.text.chars().count().max(1);
        total += len.div_ceil(width);
    }
    total.min(u16::MAX as usize) as u16
}

#[derive(Debug)]
pub enum UiEvent {
    Chat(ChatEvent),
    Connection(ConnectionStatus),
    ModelInfo(String),
    Models(Vec<String>),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    Clear,
    ModelInfo,
    Models,
    Connection,
    Usage,
    Quit,
    Unknown(String),
}

impl SlashCommand {
    fn parse(input: &str) -> Option<Self> {
        let command = input.trim().strip_prefix('/')?;
        Some(match command.split_whitespace().next().unwrap_or_default() {
            "clear" => SlashCommand::Clear,
            "model" => SlashCommand::ModelInfo,
            "models" => SlashCommand::Models,
            "connection" => SlashCommand::Connection,
            "usage" => SlashCommand::Usage,
            "quit" | "exit" => SlashCommand::Quit,
            other => SlashCommand::Unknown(other.to_string()),
        })
    }
}

struct InputBuffer {
    lines: Vec<String>,
    cursor_x: usize,
    cursor_y: usize,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_x: 0,
            cursor_y: 0,
        }
    }

    fn clear(&mut self) {
        self.lines = vec![String::new()];
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    fn byte_index(&self) -> usize {
        self.lines[self.cursor_y]
            .char_indices()
            .nth(self.cursor_x)
            .map(|(i, _)| i)
            .unwrap_or(self.lines[self.cursor_y].len())
    }

    fn line_chars(&self, y: usize) -> usize {
        self.lines[y].chars().count()
    }

    fn insert_char(&mut self, c: char) {
        let index = self.byte_index();
        self.lines[self.cursor_y].insert(index, c);
        self.cursor_x += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
            let index = self.byte_index();
            self.lines[self.cursor_y].remove(index);
        } else if self.cursor_y > 0 {
            let prev_line = self.lines.remove(self.cursor_y);
            self.cursor_y -= 1;
            self.cursor_x = self.line_chars(self.cursor_y);
            self.lines[self.cursor_y].push_str(&prev_line);
        }
    }

    fn new_line(&mut self) {
        let line = &self.lines[self.cursor_y];
        let remaining: String = line.chars().skip(self.cursor_x).collect();
        self.lines[self.cursor_y] = line.chars().take(self.cursor_x).collect();
        self.lines.insert(self.cursor_y + 1, remaining);
        self.cursor_y += 1;
        self.cursor_x = 0;
    }

    fn move_left(&mut self) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.line_chars(self.cursor_y);
        }
    }

    fn move_right(&mut self) {
        if self.cursor_x < self.line_chars(self.cursor_y) {
            self.cursor_x += 1;
        } else if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = 0;
        }
    }

    fn move_up(&mut self) {
        if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.cursor_x.min(self.line_chars(self.cursor_y));
        }
    }

    fn move_down(&mut self) {
        if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = self.cursor_x.min(self.line_chars(self.cursor_y));
        }
    }

    fn to_string(&self) -> String {
        self.lines.join("\n")
    }

    fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    fn render(&self) -> Text<'static> {
        if self.is_empty() {
            return Text::from(Span::styled(
                "Type your message here... (/clear /model /models /connection /usage /quit)",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Text::from(
            self.lines
                .iter()
                .map(|l| Line::from(l.clone()))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct App {
    conversation: Conversation,
    input: InputBuffer,
    should_quit: bool,
    sender: mpsc::Sender<UiEvent>,
    receiver: mpsc::Receiver<UiEvent>,
    client: ChatClient,
    status: String,
}

impl App {
    pub fn new(client: ChatClient) -> Self {
        let (sender, receiver) = mpsc::channel(100);

        Self {
            conversation: Conversation::new(),
            input: InputBuffer::new(),
            should_quit: false,
            sender,
            receiver,
            client,
            status: "Connecting...".to_string(),
        }
    }

    fn is_waiting(&self) -> bool {
        self.conversation.pending().is_some()
    }

    fn draw(&mut self, f: &mut Frame) {
        let [messages_area, input_area] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(INPUT_HEIGHT)]).areas(f.area());

        let backend = self.client.backend();
        let assistant = backend.name();
        let specs: Vec<LineSpec> = self
            .conversation
            .messages()
            .iter()
            .flat_map(|message| {
                let mut specs = line_specs(message, assistant);
                specs.push(LineSpec::new("", Style::default()));
                specs
            })
            .collect();

        let inner_height = messages_area.height.saturating_sub(2);
        let scroll = rendered_height(&specs, messages_area.width.saturating_sub(2))
            .saturating_sub(inner_height);
        let text = Text::from(
            specs
                .into_iter()
                .map(|spec| Line::from(Span::styled(spec.text, spec.style)))
                .collect::<Vec<_>>(),
        );
        let messages = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} · {} ", backend.name(), backend.model())),
            )
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));
        f.render_widget(messages, messages_area);

        let title = if self.is_waiting() {
            format!(" Input (Enter to send, Esc to quit) [Thinking...] {} ", self.status)
        } else {
            format!(" Input (Enter to send, Esc to quit) {} ", self.status)
        };
        let input_paragraph = Paragraph::new(self.input.render())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(input_paragraph, input_area);

        let cursor_x = (self.input.cursor_x + 1) as u16;
        let cursor_y = self.input.cursor_y as u16;
        let x = (input_area.x + cursor_x).min(input_area.x + input_area.width - 2);
        let y = (input_area.y + 1 + cursor_y).min(input_area.y + input_area.height - 2);
        f.set_cursor_position((x, y));
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Chat(event) => {
                if let ChatEvent::Error(err) = &event {
                    self.status = format!("Error: {}", err);
                }
                self.conversation.apply(&event);
            }
            UiEvent::Connection(status) => {
                info!(connected = status.connected, message = %status.message, "connection probe");
                if status.connected && self.conversation.is_empty() {
                    let backend = self.client.backend();
                    self.conversation.push_assistant(format!(
                        "Hello! I'm powered by {} ({}). How can I help you today?",
                        backend.name(),
                        backend.model()
                    ));
                }
                self.status = if status.connected {
                    format!("✅ {}", status.message)
                } else {
                    format!("❌ {} (/connection to retry)", status.message)
                };
            }
            UiEvent::ModelInfo(info) => {
                self.conversation.push_assistant(info);
            }
            UiEvent::Models(models) => {
                if models.is_empty() {
                    self.status = "Model list unavailable".to_string();
                } else {
                    self.conversation
                        .push_assistant(format!("Available models:\n{}", models.join("\n")));
                }
            }
            UiEvent::Quit => {
                self.should_quit = true;
            }
        }
    }

    fn submit(&mut self) {
        let text = self.input.to_string();
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        if let Some(command) = SlashCommand::parse(text) {
            self.input.clear();
            self.run_command(command);
            return;
        }

        if self.is_waiting() {
            self.status = "Wait for the current reply to finish".to_string();
            return;
        }

        self.conversation.push_user(text);
        self.conversation.begin_pending();
        let mut stream = self.client.send_message(text);
        self.input.clear();

        let sender = self.sender.clone();
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let terminal = event.is_terminal();
                if sender.send(UiEvent::Chat(event)).await.is_err() || terminal {
                    break;
                }
            }
        });
    }

    fn run_command(&mut self, command: SlashCommand) {
        let client = self.client.clone();
        let sender = self.sender.clone();
        match command {
            SlashCommand::Clear => {
                if self.is_waiting() {
                    self.status = "Wait for the current reply to finish".to_string();
                } else {
                    self.conversation.clear();
                    self.status = "Chat cleared".to_string();
                }
            }
            SlashCommand::ModelInfo => {
                tokio::spawn(async move {
                    let _ = sender.send(UiEvent::ModelInfo(client.model_info().await)).await;
                });
            }
            SlashCommand::Models => {
                tokio::spawn(async move {
                    let _ = sender.send(UiEvent::Models(client.list_models().await)).await;
                });
            }
            SlashCommand::Connection => {
                self.status = "Connecting...".to_string();
                self.spawn_probe();
            }
            SlashCommand::Usage => {
                self.conversation.push_assistant(self.client.usage_note());
            }
            SlashCommand::Quit => {
                self.should_quit = true;
            }
            SlashCommand::Unknown(name) => {
                self.status = format!("Unknown command: /{}", name);
            }
        }
    }

    fn spawn_probe(&self) {
        let client = self.client.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let _ = sender
                .send(UiEvent::Connection(client.check_connection().await))
                .await;
        });
    }

    fn handle_events(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event);
            if self.should_quit {
                return Ok(false);
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    let _ = self.sender.try_send(UiEvent::Quit);
                    self.should_quit = true;
                    return Ok(false);
                }

                match key.code {
                    KeyCode::Esc => {
                        self.should_quit = true;
                        return Ok(false);
                    }
                    KeyCode::Enter => {
                        if key.modifiers.contains(KeyModifiers::SHIFT) {
                            self.input.new_line();
                        } else if !self.input.is_empty() {
                            self.submit();
                        }
                    }
                    KeyCode::Char(c) => {
                        self.input.insert_char(c);
                    }
                    KeyCode::Backspace => {
                        self.input.delete_char();
                    }
                    KeyCode::Left => {
                        self.input.move_left();
                    }
                    KeyCode::Right => {
                        self.input.move_right();
                    }
                    KeyCode::Up => {
                        self.input.move_up();
                    }
                    KeyCode::Down => {
                        self.input.move_down();
                    }
                    KeyCode::Home => {
                        self.input.cursor_x = 0;
                    }
                    KeyCode::End => {
                        self.input.cursor_x = self.input.line_chars(self.input.cursor_y);
                    }
                    _ => {}
                }
            }
        }

        Ok(!self.should_quit)
    }
}

/// Runs the interactive chat until the user quits. Must be called from within
/// a tokio runtime.
pub fn run_tui(client: ChatClient) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard::new();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(client);
    app.spawn_probe();

    terminal.draw(|f| app.draw(f))?;

    while !app.should_quit {
        if !app.handle_events()? {
            break;
        }

        terminal.draw(|f| app.draw(f))?;

        std::thread::sleep(Duration::from_millis(10));
    }

    terminal.show_cursor()?;
    Ok(())
}
