use std::{error::Error, io::Write};

use log::debug;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc::UnboundedReceiver,
};

use crate::{
    api::PostsApi,
    app::{App, Event, UiEvent},
    components::Key,
    config::OutputFormat,
    identity::Identity,
};

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Type the text and press Enter.
    Submit(String),
    /// Only change the input field.
    Type(String),
    /// Click the "Post" button.
    Click,
    Refresh,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.trim() {
            ":q" | ":quit" => return Self::Quit,
            ":r" | ":refresh" => return Self::Refresh,
            ":post" => return Self::Click,
            _ => {}
        }
        if line == ":type" {
            return Self::Type(String::new());
        }
        match line.strip_prefix(":type ") {
            Some(rest) => Self::Type(rest.to_string()),
            None => Self::Submit(line.to_string()),
        }
    }

    /// What the command does to the page, as the keystrokes and clicks it stands for.
    pub fn ui_events(self) -> Vec<UiEvent> {
        match self {
            // typing ends on an ordinary key, which never submits
            Self::Type(text) => vec![UiEvent::Input(text), UiEvent::KeyDown(Key::Other)],
            Self::Submit(text) => vec![UiEvent::Input(text), UiEvent::KeyDown(Key::Enter)],
            Self::Click => vec![UiEvent::ClickPost],
            Self::Refresh | Self::Quit => vec![],
        }
    }
}

/// Interactive loop: re-render after every typed command and every network
/// completion until stdin closes or `:quit`.
pub async fn run<A: PostsApi, I: Identity>(
    mut app: App<A, I>,
    mut events: UnboundedReceiver<Event>,
    input: impl AsyncBufRead + Unpin,
    out: &mut impl Write,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    let mut lines = input.lines();
    app.mount();
    app.render(out, format)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let command = ShellCommand::parse(&line);
                debug!("{:?}", command);
                if command == ShellCommand::Quit {
                    break;
                }
                for event in command.ui_events() {
                    app.handle(Event::Ui(event));
                }
            }
            Some(event) = events.recv() => app.handle(event),
        }
        app.render(out, format)?;
    }

    Ok(())
}
