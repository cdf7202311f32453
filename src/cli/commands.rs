use crate::cli::args::{Args, Command, ConfigCommand, DataFormat, OutputFormat};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::formatter::{DisplayMode, MessageDirection, MessageFormatter};
use crate::core::history::CommandHistory;
use crate::core::negotiator::BaudRateNegotiator;
use crate::core::port::PortFactory;
use crate::core::session::SerialSessionManager;
use crate::domain::config::{LineSettings, SerialTalkerConfig};
use crate::domain::error::{SerialTalkerError, SerialTalkerResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::SystemPorts;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Execute CLI command
pub async fn execute_command(args: Args) -> SerialTalkerResult<()> {
    let writer = ConsoleWriter::new(args.output);

    let config_manager = match &args.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let config = config_manager.load_config()?;

    if !args.quiet {
        let level = if args.verbose { "debug" } else { config.global.log_level.as_str() };
        init_logging(level)?;
    }

    let ports = Arc::new(SystemPorts::new());

    match args.command {
        Command::Ports => {
            let manager = SerialSessionManager::new(ports.clone(), ports);
            let names = manager.list_ports()?;
            writer.write_ports(&names)?;
            Ok(())
        }
        Command::Negotiate { port, framing } => {
            let settings = framing.apply_to(config.serial.line);
            let baud_rate = negotiate_on(ports, &port, settings, settle_time(&config)).await?;
            match writer.format() {
                OutputFormat::Json => {
                    let output = serde_json::json!({ "port": port, "baud_rate": baud_rate });
                    println!("{}", output);
                }
                _ => writer.write_message(&format!("{} answers at {} baud", port, baud_rate))?,
            }
            Ok(())
        }
        Command::Send {
            port,
            baud,
            framing,
            data,
            format,
            wait,
        } => {
            let payload = payload_text(parse_data(&data, format)?)?;
            let mut settings = framing.apply_to(config.serial.line);
            if let Some(baud) = baud {
                settings.baud_rate = baud;
            }
            execute_send(ports, &writer, &config, port, settings, payload, wait).await
        }
        Command::Connect {
            port,
            baud,
            auto,
            framing,
            display,
        } => {
            let port = port
                .or_else(|| config.global.last_port.clone())
                .ok_or_else(|| SerialTalkerError::InvalidInput("No port given and no previous port recorded".to_string()))?;
            let mut settings = framing.apply_to(config.serial.line);
            if let Some(baud) = baud {
                settings.baud_rate = baud;
            }
            let negotiate = auto || (baud.is_none() && config.global.auto_negotiate);
            let display_mode = display.map(DisplayMode::from).unwrap_or(config.global.display_mode);

            let session = TerminalSession {
                port,
                settings,
                negotiate,
                display_mode,
            };
            run_terminal(ports, writer, &config_manager, config, session).await
        }
        Command::Config(config_args) => match config_args.command {
            ConfigCommand::Show => {
                writer.write_config(&config)?;
                Ok(())
            }
            ConfigCommand::Init => {
                config_manager.init_config()?;
                writer.write_message(&format!(
                    "Configuration initialized at '{}'",
                    config_manager.config_path().display()
                ))?;
                Ok(())
            }
            ConfigCommand::Path => {
                writer.write_message(&config_manager.config_path().display().to_string())?;
                Ok(())
            }
        },
        Command::Version => {
            writer.write_message(&format!("serialtalker {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

fn settle_time(config: &SerialTalkerConfig) -> Duration {
    Duration::from_millis(config.negotiation.settle_ms)
}

/// Open `port_name` just long enough to run a negotiation
async fn negotiate_on(
    factory: Arc<SystemPorts>,
    port_name: &str,
    settings: LineSettings,
    settle_time: Duration,
) -> SerialTalkerResult<u32> {
    let port_name = port_name.to_string();
    tokio::task::spawn_blocking(move || {
        let port = factory.create(&port_name)?;
        port.open()?;
        let result = BaudRateNegotiator::with_settle_time(settle_time).negotiate(
            port.as_ref(),
            settings.data_bits,
            settings.stop_bits,
            settings.parity,
        );
        if let Err(e) = port.close() {
            warn!("Failed to close '{}' after negotiation: {}", port_name, e);
        }
        result
    })
    .await
    .map_err(join_error)?
}

async fn execute_send(
    ports: Arc<SystemPorts>,
    writer: &ConsoleWriter,
    config: &SerialTalkerConfig,
    port: String,
    settings: LineSettings,
    payload: String,
    wait_ms: u64,
) -> SerialTalkerResult<()> {
    let formatter = MessageFormatter::new(config.global.display_mode);
    let (tx, rx) = mpsc::channel::<String>();

    let sent = payload.clone();
    let received = tokio::task::spawn_blocking(move || -> SerialTalkerResult<Vec<String>> {
        let manager = SerialSessionManager::new(ports.clone(), ports).on_data_received(move |text| {
            let _ = tx.send(text.to_string());
        });
        manager.connect(&port, settings)?;
        let result = manager.send_message(&sent);
        if result.is_ok() {
            std::thread::sleep(Duration::from_millis(wait_ms));
        }
        manager.disconnect();
        result?;
        Ok(rx.try_iter().collect())
    })
    .await
    .map_err(join_error)??;

    writer.write_message(&formatter.format(&payload, MessageDirection::Sent))?;
    for chunk in received {
        writer.write_message(&formatter.format(&chunk, MessageDirection::Received))?;
    }
    Ok(())
}

struct TerminalSession {
    port: String,
    settings: LineSettings,
    negotiate: bool,
    display_mode: DisplayMode,
}

async fn run_terminal(
    ports: Arc<SystemPorts>,
    writer: ConsoleWriter,
    config_manager: &ConfigManager,
    mut config: SerialTalkerConfig,
    mut session: TerminalSession,
) -> SerialTalkerResult<()> {
    if session.negotiate {
        writer.write_message(&format!("Negotiating baud rate on {}...", session.port))?;
        match negotiate_on(ports.clone(), &session.port, session.settings, settle_time(&config)).await {
            Ok(baud_rate) => session.settings.baud_rate = baud_rate,
            Err(SerialTalkerError::NegotiationExhausted) => {
                writer.write_error(&format!(
                    "No response at any candidate rate, using {} baud",
                    session.settings.baud_rate
                ))?;
            }
            Err(e) => return Err(e),
        }
    }

    let format = writer.format();
    let formatter = Arc::new(Mutex::new(MessageFormatter::new(session.display_mode)));
    let lost = Arc::new(Notify::new());

    let rx_formatter = formatter.clone();
    let lost_signal = lost.clone();
    let live = Arc::new(LiveErrors::default());
    let (error_gate, connect_gate) = (live.clone(), live);
    let manager = Arc::new(
        SerialSessionManager::new(ports.clone(), ports)
            .on_data_received(move |text| {
                if let Ok(formatter) = rx_formatter.lock() {
                    let _ = ConsoleWriter::new(format).write_message(&formatter.format(text, MessageDirection::Received));
                }
            })
            .on_error(move |message| {
                if error_gate.is_open() {
                    let _ = ConsoleWriter::new(format).write_error(message);
                }
            })
            .on_connected(move |port| {
                connect_gate.open();
                let _ = ConsoleWriter::new(format).write_message(&format!("Connected to {}", port));
            })
            .on_disconnected(move |reason| {
                let _ = ConsoleWriter::new(format).write_message(reason);
                lost_signal.notify_one();
            }),
    );

    let connecting = manager.clone();
    let port = session.port.clone();
    let settings = session.settings;
    tokio::task::spawn_blocking(move || connecting.connect(&port, settings))
        .await
        .map_err(join_error)??;

    if let Err(e) = config_manager.remember_last_port(&mut config, &session.port) {
        warn!("Could not record last port: {}", e);
    }

    writer.write_message(&format!(
        "{} at {}. Type :quit to exit.",
        session.port, session.settings
    ))?;

    let mut history = CommandHistory::with_capacity(config.global.history_limit);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = lost.notified() => {
                info!("Session on '{}' ended", session.port);
                break;
            }
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            manager.disconnect();
            break;
        };

        match interpret(&line) {
            TerminalInput::Quit => {
                manager.disconnect();
                break;
            }
            TerminalInput::Stats => match manager.session_info() {
                Some(info) => writer.write_session_info(&info)?,
                None => writer.write_error("Not connected")?,
            },
            TerminalInput::History => {
                for (index, entry) in history.entries().enumerate() {
                    writer.write_message(&format!("{:>3}  {}", index + 1, entry))?;
                }
            }
            TerminalInput::Mode(mode) => {
                if let Ok(mut formatter) = formatter.lock() {
                    formatter.set_display_mode(mode);
                }
                writer.write_message(&format!("Display mode: {}", mode))?;
            }
            TerminalInput::Previous => {
                let previous = history.previous().to_string();
                history.reset();
                if previous.is_empty() {
                    writer.write_error("History is empty")?;
                } else {
                    send_line(&manager, &writer, &formatter, &mut history, &config, &previous)?;
                }
            }
            TerminalInput::Clear => {
                history.clear();
                writer.write_message("History cleared")?;
            }
            TerminalInput::Send(text) => {
                send_line(&manager, &writer, &formatter, &mut history, &config, &text)?;
            }
            TerminalInput::Invalid(message) => writer.write_error(&message)?,
        }
    }

    Ok(())
}

/// Errors raised before the session is up are returned from `connect`
/// and printed by the caller, so the terminal only echoes later ones
#[derive(Debug, Default)]
struct LiveErrors {
    open: AtomicBool,
}

impl LiveErrors {
    fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

fn send_line(
    manager: &SerialSessionManager,
    writer: &ConsoleWriter,
    formatter: &Mutex<MessageFormatter>,
    history: &mut CommandHistory,
    config: &SerialTalkerConfig,
    text: &str,
) -> SerialTalkerResult<()> {
    history.add(text);
    let outgoing = format!("{}{}", text, config.serial.line_ending);
    match manager.send_message(&outgoing) {
        Ok(()) => {
            if let Ok(formatter) = formatter.lock() {
                writer.write_message(&formatter.format(text, MessageDirection::Sent))?;
            }
        }
        Err(e) => writer.write_error(&e.to_string())?,
    }
    Ok(())
}

/// One line typed into the interactive terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalInput {
    Quit,
    Stats,
    History,
    Mode(DisplayMode),
    Previous,
    Clear,
    Send(String),
    Invalid(String),
}

/// Lines starting with `:` are terminal commands, anything else is sent
pub fn interpret(line: &str) -> TerminalInput {
    let Some(command) = line.strip_prefix(':') else {
        return TerminalInput::Send(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("quit") | Some("q"), None) => TerminalInput::Quit,
        (Some("stats"), None) => TerminalInput::Stats,
        (Some("history"), None) => TerminalInput::History,
        (Some("prev"), None) => TerminalInput::Previous,
        (Some("clear"), None) => TerminalInput::Clear,
        (Some("mode"), Some(mode)) => match mode.parse::<DisplayMode>() {
            Ok(mode) => TerminalInput::Mode(mode),
            Err(e) => TerminalInput::Invalid(e.to_string()),
        },
        (Some("mode"), None) => TerminalInput::Invalid("Usage: :mode <ascii|hex|hex-ascii>".to_string()),
        _ => TerminalInput::Invalid(format!("Unknown command '{}'", line.trim())),
    }
}

pub fn parse_data(data: &str, format: DataFormat) -> SerialTalkerResult<Vec<u8>> {
    match format {
        DataFormat::Text => Ok(data.as_bytes().to_vec()),
        DataFormat::Hex => {
            let cleaned = data.replace([' ', '\n'], "");
            hex::decode(&cleaned).map_err(|e| SerialTalkerError::InvalidInput(format!("Invalid hex data: {}", e)))
        }
        DataFormat::Base64 => {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| SerialTalkerError::InvalidInput(format!("Invalid base64 data: {}", e)))
        }
    }
}

/// Ports carry text, so decoded payloads must be valid UTF-8
fn payload_text(bytes: Vec<u8>) -> SerialTalkerResult<String> {
    String::from_utf8(bytes).map_err(|e| {
        debug!("Rejected payload bytes: {:02X?}", e.as_bytes());
        SerialTalkerError::InvalidInput("Payload is not valid UTF-8 text".to_string())
    })
}

fn join_error(e: tokio::task::JoinError) -> SerialTalkerError {
    SerialTalkerError::Io(std::io::Error::other(e))
}
