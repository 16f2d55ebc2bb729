mod config;
mod recorder;
mod stt;

use crate::config::{Config, PresenceSettings};
use crate::recorder::CpalRecorder;
use crate::stt::HttpTranscriber;
use anyhow::{Context, Result};
use clap::Parser;
use rehearse_core::Command;
use rehearse_core::capture::{CaptureMode, CaptureTurnController, NudgeConfig};
use rehearse_core::orchestrator::SessionOrchestrator;
use rehearse_core::presence::{ChannelEvent, PresenceSession, PresenceSignal};
use rehearse_core::protocol::{InterviewProtocolSession, ProtocolClient};
use rehearse_core::record::{InterviewSetup, JsonFileStore, SnapshotStore, Style};
use rehearse_core::turn::{Role, TurnId};
use rehearse_presence::{TokenClient, WsPresenceChannel};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(name = "rehearse", about = "Turn-based mock-interview practice from the terminal")]
struct Cli {
    /// Render the interviewer through the streaming avatar service
    #[arg(long)]
    presence: bool,
    /// Interviewer tone for this session
    #[arg(long, value_enum)]
    style: Option<StyleArg>,
    /// Print the stored review snapshot and exit
    #[arg(long)]
    review: bool,
    /// Clear the stored review snapshot and exit
    #[arg(long)]
    clear_review: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum StyleArg {
    Supportive,
    Neutral,
    Cold,
}

impl From<StyleArg> for Style {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Supportive => Style::Supportive,
            StyleArg::Neutral => Style::Neutral,
            StyleArg::Cold => Style::Cold,
        }
    }
}

/// Requests routed to the presence task.
enum PresenceRequest {
    Speak { text: String, turn: TurnId },
    Retry,
    Teardown,
}

/// State changes the presence task reports back.
enum PresenceUpdate {
    Ready,
    Lost,
    SpeakFinished(TurnId),
    Failed(String),
}

#[derive(PartialEq)]
enum Flow {
    Continue,
    Quit,
}

type Orchestrator =
    SessionOrchestrator<ProtocolClient, CpalRecorder, HttpTranscriber, JsonFileStore>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let args = Cli::parse();
    let store = JsonFileStore::new(&config.data_dir);

    if args.review {
        return print_review(&store);
    }
    if args.clear_review {
        store
            .clear_record()
            .context("failed to clear review snapshot")?;
        println!("Review snapshot cleared.");
        return Ok(());
    }

    // Stored setup choices are the defaults; flags override per run.
    let mut setup = store.load_setup().unwrap_or(None).unwrap_or_default();
    if let Some(style) = args.style {
        setup.style = style.into();
    }
    if args.presence {
        setup.presence_enabled = true;
    }
    if !setup.consent {
        setup.consent = ask_consent()?;
    }
    if !setup.consent {
        println!("Consent is required to run an interview.");
        return Ok(());
    }
    if let Err(e) = store.save_setup(&setup) {
        tracing::warn!("could not persist setup: {e}");
    }

    let (update_tx, mut updates) = mpsc::channel::<PresenceUpdate>(32);
    let presence_requests = if setup.presence_enabled {
        let settings = config
            .presence()
            .context("presence mode selected but not configured")?;
        let (request_tx, request_rx) = mpsc::channel(32);
        tokio::spawn(presence_task(
            settings,
            config.stabilization,
            request_rx,
            update_tx.clone(),
        ));
        Some(request_tx)
    } else {
        None
    };

    // Command channel decouples the core logic from runtime side effects.
    let (command_tx, mut commands) = mpsc::channel::<Command>(64);

    let recorder = CpalRecorder::new().context("audio capture unavailable")?;
    let transcriber = HttpTranscriber::new(config.stt_api_url.clone());
    let nudges = NudgeConfig {
        enabled: setup.nudges_enabled,
        interval: config.nudge_interval,
        sound: setup.nudge_sound,
        haptics: setup.nudge_haptics,
    };
    let capture = CaptureTurnController::new(recorder, transcriber, nudges, command_tx.clone());
    let protocol = InterviewProtocolSession::new(ProtocolClient::new(
        config.interview_api_url.clone(),
    ));
    let orchestrator = SessionOrchestrator::new(
        setup.clone(),
        protocol,
        capture,
        JsonFileStore::new(&config.data_dir),
        command_tx.clone(),
    );

    let mut runtime = Runtime {
        orchestrator,
        presence_requests,
        presence_up: false,
    };

    print_welcome(&setup);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if runtime.handle_line(line.trim()).await == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("stdin read failed: {e}");
                    break;
                }
            },
            Some(command) = commands.recv() => {
                if runtime.execute(command).await == Flow::Quit {
                    break;
                }
            }
            Some(update) = updates.recv() => {
                runtime.apply_presence_update(update).await;
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                tracing::info!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }

    // Teardown runs on the way out no matter how the session ended; the
    // finalize latch and the presence state guard make both idempotent.
    runtime.shutdown().await;
    Ok(())
}

struct Runtime {
    orchestrator: Orchestrator,
    presence_requests: Option<mpsc::Sender<PresenceRequest>>,
    presence_up: bool,
}

impl Runtime {
    async fn handle_line(&mut self, line: &str) -> Flow {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command {
            "" => {}
            "start" => {
                if let Err(e) = self.orchestrator.request_start().await {
                    eprintln!("Could not start: {e:#}");
                }
            }
            "record" | "r" => self.start_capture(CaptureMode::Answer),
            "clarify" => self.start_capture(CaptureMode::Clarification),
            "stop" | "s" => {
                if let Err(e) = self.orchestrator.stop_recording().await {
                    eprintln!("Capture failed: {e:#}");
                }
            }
            "say" => {
                if let Err(e) = self.orchestrator.send_draft(rest).await {
                    eprintln!("Could not send: {e:#}");
                }
            }
            "ask" => {
                if let Err(e) = self.orchestrator.send_clarification_draft(rest).await {
                    eprintln!("Could not send: {e:#}");
                }
            }
            "style" => match parse_style(rest) {
                Some(style) => match self.orchestrator.switch_style(style).await {
                    Ok(()) => println!("Style: {}", style.label()),
                    Err(e) => eprintln!("Style switch failed: {e:#}"),
                },
                None => println!("Usage: style supportive|neutral|cold"),
            },
            "replay" => self.orchestrator.replay_question().await,
            "auto-listen" => match parse_toggle(rest) {
                Some(enabled) => self.orchestrator.set_auto_listen(enabled),
                None => println!("Usage: auto-listen on|off"),
            },
            "auto-send" => match parse_toggle(rest) {
                Some(enabled) => self.orchestrator.set_auto_send(enabled),
                None => println!("Usage: auto-send on|off"),
            },
            "retry" => self.request_presence(PresenceRequest::Retry).await,
            "tips" => self.print_tips(),
            "transcript" => self.print_transcript(),
            "end" => self.orchestrator.request_end().await,
            "help" => print_help(),
            "quit" | "exit" => return Flow::Quit,
            other => println!("Unknown command {other:?}; type 'help' for the list."),
        }
        Flow::Continue
    }

    fn start_capture(&mut self, mode: CaptureMode) {
        match self.orchestrator.start_recording(mode) {
            Ok(true) => println!("Recording — speak naturally, then 'stop'."),
            Ok(false) => println!("Not ready to record; is a question live?"),
            Err(e) => eprintln!("Microphone unavailable: {e}"),
        }
    }

    async fn execute(&mut self, command: Command) -> Flow {
        match command {
            Command::SpeakText { text, turn } => {
                println!();
                println!("Interviewer: {text}");
                if self.presence_up {
                    self.request_presence(PresenceRequest::Speak { text, turn })
                        .await;
                }
            }
            Command::TranscriptReady { text, .. } => {
                println!("Transcript (draft): {text}");
                println!("Submit it with: say {text}");
            }
            Command::Nudge { message, sound, .. } => {
                if sound {
                    print!("\x07");
                }
                println!("· {message}");
            }
            Command::SessionComplete {
                session_id,
                record_saved,
            } => {
                println!();
                match session_id {
                    Some(id) => println!("Interview over (session {id})."),
                    None => println!("Interview over."),
                }
                if record_saved {
                    println!("Your session is saved — run `rehearse --review` to go over it.");
                } else {
                    println!("The session could not be saved for review.");
                }
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    async fn apply_presence_update(&mut self, update: PresenceUpdate) {
        match update {
            PresenceUpdate::Ready => {
                self.presence_up = true;
                println!("Presence ready.");
                if let Err(e) = self.orchestrator.on_presence_ready().await {
                    eprintln!("Could not start after presence became ready: {e:#}");
                }
            }
            PresenceUpdate::Lost => {
                self.presence_up = false;
                self.orchestrator.on_presence_lost();
                println!("Presence connection lost; type 'retry' to reconnect.");
            }
            PresenceUpdate::SpeakFinished(turn) => {
                self.orchestrator.on_speak_finished(turn).await;
            }
            PresenceUpdate::Failed(message) => {
                self.presence_up = false;
                self.orchestrator.on_presence_lost();
                println!("Presence failed: {message}");
                println!("Type 'retry' to try again.");
            }
        }
    }

    async fn request_presence(&mut self, request: PresenceRequest) {
        match &self.presence_requests {
            Some(tx) => {
                if tx.send(request).await.is_err() {
                    tracing::warn!("presence task is gone");
                }
            }
            None => {
                if matches!(request, PresenceRequest::Retry) {
                    println!("Presence is disabled for this session.");
                }
            }
        }
    }

    fn print_tips(&self) {
        let tips = self.orchestrator.protocol().tips();
        if tips.is_empty() {
            println!("No tips yet.");
            return;
        }
        for tip in tips {
            println!("- {}: {}", tip.summary, tip.detail);
        }
    }

    fn print_transcript(&self) {
        for message in self.orchestrator.protocol().messages() {
            println!(
                "[{}] {}: {}",
                message.turn,
                role_label(message.role),
                message.content
            );
        }
    }

    async fn shutdown(&mut self) {
        self.orchestrator.request_end().await;
        if let Some(tx) = &self.presence_requests {
            let _ = tx.send(PresenceRequest::Teardown).await;
        }
    }
}

/// Owns the presence session on its own task; the main loop talks to it
/// through request/update channels. Initialization failures surface a retry
/// affordance instead of looping against the paid service.
async fn presence_task(
    settings: PresenceSettings,
    stabilization: Duration,
    mut requests: mpsc::Receiver<PresenceRequest>,
    updates: mpsc::Sender<PresenceUpdate>,
) {
    let channel = WsPresenceChannel::new(settings.ws_url, settings.avatar);
    let tokens = TokenClient::new(settings.api_url, settings.api_key);
    let mut session = PresenceSession::new(channel, tokens, stabilization);

    let mut events = match session.initialize().await {
        Ok(()) => {
            let _ = updates.send(PresenceUpdate::Ready).await;
            session.take_events()
        }
        Err(e) => {
            let _ = updates.send(PresenceUpdate::Failed(e.to_string())).await;
            None
        }
    };

    loop {
        tokio::select! {
            request = requests.recv() => match request {
                None | Some(PresenceRequest::Teardown) => {
                    session.teardown().await;
                    break;
                }
                Some(PresenceRequest::Speak { text, turn }) => {
                    if let Err(e) = session.speak(&text, turn).await {
                        tracing::warn!("presence speak failed: {e}");
                        // Report completion anyway so the turn loop is not
                        // stranded waiting on an utterance that never began.
                        let _ = updates.send(PresenceUpdate::SpeakFinished(turn)).await;
                    }
                }
                Some(PresenceRequest::Retry) => match session.initialize().await {
                    Ok(()) => {
                        events = session.take_events();
                        let _ = updates.send(PresenceUpdate::Ready).await;
                    }
                    Err(e) => {
                        let _ = updates.send(PresenceUpdate::Failed(e.to_string())).await;
                    }
                },
            },
            event = next_channel_event(&mut events), if events.is_some() => match event {
                Some(event) => match session.apply(event) {
                    Some(PresenceSignal::ReadyLost) => {
                        events = None;
                        let _ = updates.send(PresenceUpdate::Lost).await;
                    }
                    Some(PresenceSignal::SpeakFinished(turn)) => {
                        let _ = updates.send(PresenceUpdate::SpeakFinished(turn)).await;
                    }
                    Some(PresenceSignal::UserSpeaking(active)) => {
                        tracing::trace!("user speaking: {active}");
                    }
                    None => {}
                },
                None => {
                    events = None;
                }
            },
        }
    }
}

async fn next_channel_event(
    events: &mut Option<mpsc::Receiver<ChannelEvent>>,
) -> Option<ChannelEvent> {
    match events.as_mut() {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

fn ask_consent() -> Result<bool> {
    println!("This session records your microphone locally to transcribe answers,");
    println!("and stores the transcript on this machine for your own review.");
    print!("Do you consent? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_review(store: &JsonFileStore) -> Result<()> {
    match store
        .load_record()
        .context("failed to read review snapshot")?
    {
        None => println!("No session is waiting for review."),
        Some(record) => {
            println!(
                "Session {} — {} interviewer",
                record.session_id,
                record.style.label()
            );
            for message in &record.messages {
                println!(
                    "[{}] {}: {}",
                    message.turn,
                    role_label(message.role),
                    message.content
                );
            }
            if !record.tips.is_empty() {
                println!();
                println!("Tips:");
                for tip in &record.tips {
                    println!("- {}: {}", tip.summary, tip.detail);
                }
            }
        }
    }
    Ok(())
}

fn print_welcome(setup: &InterviewSetup) {
    println!(
        "rehearse — {} interviewer{}",
        setup.style.label(),
        if setup.presence_enabled {
            " with avatar presence"
        } else {
            ""
        }
    );
    println!("{}", setup.style.help());
    if setup.presence_enabled {
        println!("Presence is initializing; 'start' will begin once it is ready.");
    }
    println!("Type 'start' to begin, 'help' for commands.");
}

fn print_help() {
    println!("Commands:");
    println!("  start               begin the interview");
    println!("  record | r          answer the live question by voice");
    println!("  clarify             ask for clarification by voice");
    println!("  stop | s            stop recording and transcribe");
    println!("  say <text>          submit a typed answer");
    println!("  ask <text>          submit a typed clarification request");
    println!("  replay              hear the current question again");
    println!("  style <name>        switch tone: supportive, neutral, cold");
    println!("  auto-listen on|off  re-arm recording after each question");
    println!("  auto-send on|off    submit transcripts automatically");
    println!("  tips                show coaching tips so far");
    println!("  transcript          show the conversation so far");
    println!("  retry               retry the presence connection");
    println!("  end                 end the session and save it for review");
    println!("  quit                leave without ending formally");
}

fn parse_style(name: &str) -> Option<Style> {
    match name.to_lowercase().as_str() {
        "supportive" => Some(Style::Supportive),
        "neutral" => Some(Style::Neutral),
        "cold" => Some(Style::Cold),
        _ => None,
    }
}

fn parse_toggle(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" => Some(true),
        "off" | "false" => Some(false),
        _ => None,
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Interviewer => "Interviewer",
    }
}
