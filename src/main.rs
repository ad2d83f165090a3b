use chatai::config::{Command, Config};
use chatai::{ChatCallback, ChatClient, ChatError, ui};
use clap::Parser;
use std::io::Write;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let config = Config::parse();
    let _log_guard = init_logging(&config);

    let backend = config.build_backend()?;
    let options = config.request_options(backend.as_ref());
    let client = ChatClient::new(backend).with_options(options);
    info!(
        backend = client.backend().name(),
        model = client.backend().model(),
        streaming = options.use_streaming,
        "starting chatai"
    );

    match config.command() {
        Command::Chat => ui::run_tui(client),
        Command::Ask { message } => ask(&client, message).await,
        Command::Models => {
            let models = client.list_models().await;
            if models.is_empty() {
                println!("No models reported (server unreachable or list unavailable)");
            }
            for model in models {
                println!("{}", model);
            }
            Ok(())
        }
        Command::Check => {
            let status = client.check_connection().await;
            if !status.connected {
                return Err(status.message.into());
            }
            println!("{}", status.message);
            Ok(())
        }
        Command::Info => {
            println!("{}", client.model_info().await);
            Ok(())
        }
        Command::Usage => {
            println!("{}", client.usage_note());
            Ok(())
        }
    }
}

/// Prints a reply as it streams in. Partial updates are cumulative, so only
/// the part not yet shown is written.
#[derive(Default)]
struct StdoutPrinter {
    printed: usize,
    error: Option<ChatError>,
}

impl StdoutPrinter {
    fn print_from(&mut self, text: &str) {
        let unseen = text.get(self.printed..).unwrap_or(text);
        print!("{}", unseen);
        let _ = std::io::stdout().flush();
        self.printed = text.len();
    }
}

impl ChatCallback for StdoutPrinter {
    fn on_partial_response(&mut self, text: &str) {
        self.print_from(text);
    }

    fn on_response(&mut self, text: &str) {
        self.print_from(text);
        println!();
    }

    fn on_error(&mut self, error: &ChatError) {
        self.error = Some(error.clone());
    }
}

async fn ask(
    client: &ChatClient,
    message: String,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut printer = StdoutPrinter::default();
    client.send_message(message).deliver(&mut printer).await;
    match printer.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

// The TUI owns the terminal, so logs go to a file.
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let dir = config.log_dir.clone().unwrap_or_else(std::env::temp_dir);
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("chatai.log")
        .build(&dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let default_filter = if config.verbose {
        "chatai=debug"
    } else {
        "chatai=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();

    Some(guard)
}
