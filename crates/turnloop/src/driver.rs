//! The console loop around the engine.

use std::io;

use owo_colors::OwoColorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use turnloop_core::{Engine, Session, TurnOutcome};
use turnloop_model::{Message, Role};

/// Inputs that end the conversation, matched case-insensitively.
pub const EXIT_TOKENS: [&str; 4] = ["exit", "quit", "bye", "q"];

/// The prompt sent once after a failed turn, so the user still gets a hint
/// on how to continue.
pub const FALLBACK_PROMPT: &str = "Assume the role of a helpful assistant. \
Tell me how do I interact with you to ask you questions?";

const BAR_CHAR: &str = "▎";

/// Returns `true` if `input` asks to end the conversation.
#[inline]
pub fn is_exit_token(input: &str) -> bool {
    let input = input.trim();
    EXIT_TOKENS
        .iter()
        .any(|token| token.eq_ignore_ascii_case(input))
}

/// Why the driver stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverExit {
    /// The user entered one of the [`EXIT_TOKENS`].
    ExitToken,
    /// The input reached its end.
    EndOfInput,
}

/// An error that stops the driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading input or writing output failed.
    #[error("console I/O failed: {0}")]
    Io(#[from] io::Error),
    /// A turn failed. The fallback prompt has been sent already.
    #[error(transparent)]
    Engine(#[from] turnloop_core::Error),
}

/// Reads user input line by line and runs a turn for each of them, printing
/// what the turn added to the session.
pub struct Driver<R, W> {
    engine: Engine,
    input: R,
    output: W,
    welcome: Option<String>,
    colors: bool,
    #[cfg(feature = "cli")]
    spinner: bool,
}

impl<R, W> Driver<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a driver with plain output and no welcome banner.
    pub fn new(engine: Engine, input: R, output: W) -> Self {
        Self {
            engine,
            input,
            output,
            welcome: None,
            colors: false,
            #[cfg(feature = "cli")]
            spinner: false,
        }
    }

    /// Sets a banner printed once when the driver starts. It is not part of
    /// the session.
    #[inline]
    pub fn with_welcome<S: Into<String>>(mut self, welcome: S) -> Self {
        self.welcome = Some(welcome.into());
        self
    }

    /// Enables colored output.
    #[inline]
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Shows a spinner while a turn is running.
    #[cfg(feature = "cli")]
    #[inline]
    pub fn with_spinner(mut self, spinner: bool) -> Self {
        self.spinner = spinner;
        self
    }

    /// Consumes the driver and returns the output.
    #[inline]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until an exit token, the end of input, or a failed turn.
    ///
    /// A failed turn is answered with [`FALLBACK_PROMPT`] once, then the
    /// original error is returned.
    pub async fn run(
        &mut self,
        session: &mut Session,
    ) -> Result<DriverExit, Error> {
        if let Some(welcome) = self.welcome.clone() {
            self.print_assistant(&welcome).await?;
        }

        let mut line = String::new();
        loop {
            self.output.write_all(b"> ").await?;
            self.output.flush().await?;

            line.clear();
            if self.input.read_line(&mut line).await? == 0 {
                debug!("end of input");
                return Ok(DriverExit::EndOfInput);
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if is_exit_token(input) {
                self.output.write_all(b"Goodbye!\n").await?;
                self.output.flush().await?;
                return Ok(DriverExit::ExitToken);
            }

            let start = session.messages().len();
            let result = self.run_turn(session, input).await;
            self.print_messages(&session.messages()[start..]).await?;

            if let Err(err) = result {
                error!("turn failed: {err}");
                let text = format!("Something went wrong: {err}");
                let line = self.paint_error(&text);
                self.print_line(&line).await?;
                if let Err(io_err) = self.recover(session).await {
                    warn!("failed to print the fallback reply: {io_err}");
                }
                return Err(err.into());
            }
        }
    }

    /// Sends the fallback prompt and prints whatever comes back.
    async fn recover(&mut self, session: &mut Session) -> io::Result<()> {
        let start = session.messages().len();
        let result = self.run_turn(session, FALLBACK_PROMPT).await;
        if let Err(err) = &result {
            warn!("fallback prompt failed too: {err}");
        }
        self.print_messages(&session.messages()[start..]).await
    }

    async fn run_turn(
        &self,
        session: &mut Session,
        input: &str,
    ) -> Result<TurnOutcome, turnloop_core::Error> {
        #[cfg(feature = "cli")]
        if self.spinner {
            return spinner::run_turn(&self.engine, session, input).await;
        }
        self.engine.run_turn(session, input).await
    }

    async fn print_messages(&mut self, messages: &[Message]) -> io::Result<()> {
        for msg in messages {
            match msg.role {
                // The user typed it already.
                Role::User => {}
                Role::Assistant => {
                    if !msg.content.is_empty() {
                        self.print_assistant(&msg.content).await?;
                    }
                    for call in &msg.tool_calls {
                        let args =
                            serde_json::Value::Object(call.arguments.clone());
                        let line =
                            self.paint_dim(&format!("→ {}({args})", call.name));
                        self.print_line(&line).await?;
                    }
                }
                Role::Tool => {
                    for line in msg.content.lines() {
                        let line = self.paint_dim(&format!("  {line}"));
                        self.print_line(&line).await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn print_assistant(&mut self, text: &str) -> io::Result<()> {
        let line = if self.colors {
            format!("{}🤖 {}", BAR_CHAR.bright_cyan(), text.bright_white())
        } else {
            format!("{BAR_CHAR}🤖 {text}")
        };
        self.print_line(&line).await
    }

    async fn print_line(&mut self, line: &str) -> io::Result<()> {
        self.output.write_all(line.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    fn paint_dim(&self, text: &str) -> String {
        if self.colors {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }

    fn paint_error(&self, text: &str) -> String {
        if self.colors {
            text.bright_red().to_string()
        } else {
            text.to_owned()
        }
    }
}

#[cfg(feature = "cli")]
mod spinner {
    use std::time::Duration;

    use indicatif::{ProgressBar, ProgressStyle};
    use turnloop_core::{Engine, Error, Session, TurnOutcome};

    pub async fn run_turn(
        engine: &Engine,
        session: &mut Session,
        input: &str,
    ) -> Result<TurnOutcome, Error> {
        let progress_bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg}")
        {
            progress_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        progress_bar.set_message("🤔 Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let result = engine.run_turn(session, input).await;

        // Clear the spinner before anything else is printed.
        progress_bar.finish_and_clear();
        result
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use turnloop_core::EngineBuilder;
    use turnloop_model::{ErrorKind, ToolCall};
    use turnloop_test_model::{PresetResponse, TestModelProvider};

    use super::*;
    use crate::engine_builder;
    use crate::tools::RegistrationDesk;

    async fn drive(
        engine: Engine,
        input: &str,
    ) -> (Result<DriverExit, Error>, Session, String) {
        let mut session = engine.open_session(None).await.unwrap();
        let mut driver = Driver::new(engine, input.as_bytes(), Vec::new());
        let result = driver.run(&mut session).await;
        let output = String::from_utf8(driver.into_output()).unwrap();
        (result, session, output)
    }

    #[test]
    fn test_exit_tokens() {
        for input in ["exit", "Exit", "QUIT", "q", "bye", "  Bye \n"] {
            assert!(is_exit_token(input), "{input:?}");
        }
        for input in ["", "exit now", "goodbye", "quit!"] {
            assert!(!is_exit_token(input), "{input:?}");
        }
    }

    #[tokio::test]
    async fn test_exit_without_model() {
        let provider = TestModelProvider::default();
        let engine =
            EngineBuilder::with_model_provider(provider.clone()).build();

        let (result, session, output) = drive(engine, "\n  \nQUIT\nhi\n").await;
        assert_eq!(result.unwrap(), DriverExit::ExitToken);
        assert_eq!(provider.request_count(), 0);
        assert!(session.messages().is_empty());
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn test_end_of_input() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::text("Hello!"));
        let engine = EngineBuilder::with_model_provider(provider).build();

        let (result, session, output) = drive(engine, "hi").await;
        assert_eq!(result.unwrap(), DriverExit::EndOfInput);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(output, "> ▎🤖 Hello!\n> ");
    }

    #[tokio::test]
    async fn test_welcome_not_persisted() {
        let provider = TestModelProvider::default();
        let engine = EngineBuilder::with_model_provider(provider).build();
        let mut session = engine.open_session(None).await.unwrap();

        let mut driver = Driver::new(engine, "bye\n".as_bytes(), Vec::new())
            .with_welcome("Welcome!");
        driver.run(&mut session).await.unwrap();

        let output = String::from_utf8(driver.into_output()).unwrap();
        assert!(output.starts_with("▎🤖 Welcome!\n"));
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_prints_tool_round() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::tool_calls([ToolCall::new(
            "call_1",
            "register",
            json!({ "attendee": "Ada", "topic": "Testing Strategies" }),
        )]));
        provider.add_response(PresetResponse::text("You're all set, Ada."));
        let engine =
            engine_builder(provider, &RegistrationDesk::default()).build();

        let (result, _, output) =
            drive(engine, "Register Ada for testing\nbye\n").await;
        assert_eq!(result.unwrap(), DriverExit::ExitToken);
        assert_eq!(
            output,
            "> → register({\"attendee\":\"Ada\",\"topic\":\"Testing Strategies\"})\n\
             \x20 Registered Ada for Testing Strategies.\n\
             ▎🤖 You're all set, Ada.\n\
             > Goodbye!\n"
        );
    }

    #[tokio::test]
    async fn test_fallback_after_error() {
        let mut provider = TestModelProvider::default();
        provider.add_response(
            PresetResponse::text("Just type a question.").with_failures(1),
        );
        let engine =
            EngineBuilder::with_model_provider(provider.clone()).build();

        let (result, session, output) = drive(engine, "hi\nhello\n").await;
        let Err(Error::Engine(err)) = result else {
            panic!("expected an engine error");
        };
        assert_eq!(err.model_error_kind(), Some(ErrorKind::Other));
        assert_eq!(provider.request_count(), 2);
        assert_eq!(provider.requests()[1].messages.len(), 2);
        assert_eq!(session.messages()[1].content, FALLBACK_PROMPT);
        assert!(output.contains("Something went wrong"));
        assert!(output.ends_with("▎🤖 Just type a question.\n"));
    }
}
