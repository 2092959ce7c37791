//! REPL – Read-Eval-Print Loop for the SimBot operator console.
//!
//! Supported slash-commands:
//!   /help         – show this list
//!   /demo         – submit a short inspection mission
//!   /home         – submit a return-to-home mission
//!   /status       – poll robot, mission and task status (each task poll
//!                   waits the simulated API delay)
//!   /pause        – pause the running mission
//!   /resume       – resume a paused mission
//!   /stop         – stop the running mission
//!   /telemetry    – toggle the live telemetry stream
//!   /settings     – print the effective settings
//!   /quit | /exit – stop everything and exit

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use simbot_driver::{PublisherHandle, Robot, TelemetryMessage};
use simbot_types::{Frame, Mission, Position, RobotError, Task, TaskKind};
use tokio::sync::broadcast;
use tracing::warn;

const ISAR_ID: &str = "simbot-isar";
const ROBOT_NAME: &str = "SimBot";
const TELEMETRY_CAPACITY: usize = 64;

/// `/help` rows: command, description.
const HELP: [(&str, &str); 9] = [
    ("/demo", "submit a two-inspection demo mission"),
    ("/home", "submit a return-to-home mission"),
    ("/status", "poll robot, mission and task status (waits the API delay per task)"),
    ("/pause", "pause the running mission"),
    ("/resume", "resume a paused mission"),
    ("/stop", "stop the running mission"),
    ("/telemetry", "toggle live telemetry output"),
    ("/settings", "show the effective settings"),
    ("/quit", "exit the console (also /exit)"),
];

/// A parsed REPL input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Demo,
    Home,
    Status,
    Pause,
    Resume,
    Stop,
    Telemetry,
    Settings,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Command::Empty,
            "/help" | "/?" => Command::Help,
            "/demo" => Command::Demo,
            "/home" => Command::Home,
            "/status" => Command::Status,
            "/pause" => Command::Pause,
            "/resume" => Command::Resume,
            "/stop" => Command::Stop,
            "/telemetry" => Command::Telemetry,
            "/settings" => Command::Settings,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Running telemetry publishers plus the thread echoing their output.
struct TelemetryStream {
    publishers: Vec<PublisherHandle>,
    printer: JoinHandle<()>,
}

impl TelemetryStream {
    fn start(robot: &Robot) -> Result<Self, RobotError> {
        let (sender, mut receiver) = broadcast::channel::<TelemetryMessage>(TELEMETRY_CAPACITY);
        let publishers = robot.get_telemetry_publishers(&sender, ISAR_ID, ROBOT_NAME)?;
        // The publishers hold their own senders; the channel closes once
        // they have all stopped.
        drop(sender);

        let printer = thread::spawn(move || {
            loop {
                match receiver.blocking_recv() {
                    Ok(message) => println!("  {} {}", message.topic.dimmed(), message.payload),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "telemetry printer fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Self { publishers, printer })
    }

    fn stop(self) {
        for publisher in self.publishers {
            publisher.stop();
        }
        if self.printer.join().is_err() {
            warn!("telemetry printer thread panicked");
        }
    }
}

/// REPL state shared across commands.
struct Session<'a> {
    robot: &'a Robot,
    /// Tasks of the most recently submitted mission.
    tasks: Vec<Task>,
    telemetry: Option<TelemetryStream>,
}

/// Entry point for the interactive REPL.  Returns on `/quit` or EOF.
pub fn run(robot: &Robot) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut session = Session {
        robot,
        tasks: Vec::new(),
        telemetry: None,
    };

    loop {
        print!("{} ", "simbot>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        match Command::parse(&line) {
            Command::Empty => continue,
            Command::Help => cmd_help(),
            Command::Demo => cmd_submit(&mut session, demo_mission()),
            Command::Home => cmd_submit(&mut session, home_mission()),
            Command::Status => cmd_status(&session),
            Command::Pause => report("Mission paused", session.robot.pause()),
            Command::Resume => report("Mission resumed", session.robot.resume()),
            Command::Stop => {
                println!("  Stopping mission …");
                report("Mission stopped", session.robot.stop());
            }
            Command::Telemetry => cmd_telemetry(&mut session),
            Command::Settings => cmd_settings(session.robot),
            Command::Quit => break,
            Command::Unknown(other) => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }

    shutdown(session);
}

fn shutdown(session: Session<'_>) {
    if let Some(stream) = session.telemetry {
        stream.stop();
    }
    if session.robot.simulation().is_some_and(|s| !s.is_done()) {
        println!("  Stopping running mission …");
        report("Mission stopped", session.robot.stop());
    }
    println!("{}", "Goodbye.".green());
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "SimBot Commands".bold().underline());
    for (command, description) in HELP {
        println!("  {} – {}", format!("{command:<11}").bold().cyan(), description);
    }
    println!();
}

fn cmd_submit(session: &mut Session<'_>, mission: Mission) {
    println!("  Submitting mission {} …", mission.name.bold());
    let tasks = mission.tasks.clone();
    match session.robot.initiate_mission(mission) {
        Ok(()) => {
            println!("{} ({} task(s))", "  ✓ Mission started".green(), tasks.len());
            session.tasks = tasks;
        }
        Err(e) => println!("  {} {}", "✗".red().bold(), e),
    }
}

fn cmd_status(session: &Session<'_>) {
    let robot = session.robot;
    println!("{}", "Status".bold().underline());
    println!("  Robot   : {}", format!("{:?}", robot.robot_status()).yellow());
    match robot.mission_status() {
        Ok(status) => println!("  Mission : {}", format!("{status:?}").yellow()),
        Err(e) => {
            println!("  Mission : {}", e.to_string().dimmed());
            return;
        }
    }
    if session.tasks.is_empty() {
        return;
    }
    let max_delay = robot.settings().mission_simulation_api_delay_modifier;
    if max_delay > 0.0 {
        println!(
            "  {}",
            format!("polling {} task(s), up to {max_delay}s each …", session.tasks.len()).dimmed()
        );
    }
    // Polling through the driver also delivers inspections and tracks home.
    for task in &session.tasks {
        let status = match robot.task_status(&task.id) {
            Ok(status) => format!("{status:?}").yellow().to_string(),
            Err(e) => e.to_string().red().to_string(),
        };
        println!("    {:<22} {}", task_label(&task.kind), status);
    }
}

fn cmd_telemetry(session: &mut Session<'_>) {
    match session.telemetry.take() {
        Some(stream) => {
            stream.stop();
            println!("{}", "  ✓ Telemetry stream stopped.".green());
        }
        None => match TelemetryStream::start(session.robot) {
            Ok(stream) => {
                println!("{}", "  ✓ Telemetry stream started (run /telemetry again to stop).".green());
                session.telemetry = Some(stream);
            }
            Err(e) => println!("  {} {}", "✗".red().bold(), e),
        },
    }
}

fn cmd_settings(robot: &Robot) {
    println!("{}", "Effective Settings".bold().underline());
    println!(
        "  {}",
        format!("file: {}", simbot_config::config_path().display()).dimmed()
    );
    match toml::to_string_pretty(robot.settings()) {
        Ok(rendered) => {
            for line in rendered.lines() {
                println!("  {line}");
            }
        }
        Err(e) => println!("{}: {}", "Error rendering settings".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn report(done: &str, result: Result<(), RobotError>) {
    match result {
        Ok(()) => println!("  {} {}", "✓".green().bold(), done.green()),
        Err(e) => println!("  {} {}", "✗".red().bold(), e),
    }
}

fn task_label(kind: &TaskKind) -> &'static str {
    match kind {
        TaskKind::TakeImage => "take image",
        TaskKind::TakeThermalImage => "take thermal image",
        TaskKind::TakeVideo => "take video",
        TaskKind::TakeThermalVideo { .. } => "take thermal video",
        TaskKind::RecordAudio { .. } => "record audio",
        TaskKind::TakeCo2Measurement => "take CO2 measurement",
        TaskKind::ReturnToHome => "return to home",
    }
}

fn demo_mission() -> Mission {
    let target = Position::new(2.0, 3.5, 1.0, Frame::asset());
    Mission::new(
        "demo inspection",
        vec![
            Task::new(TaskKind::TakeImage)
                .with_target(target.clone())
                .with_tag_id("313-PA-101A")
                .with_inspection_description("Pump inlet valve"),
            Task::new(TaskKind::TakeThermalImage)
                .with_target(target)
                .with_tag_id("313-PA-101A")
                .with_inspection_description("Pump bearing temperature"),
        ],
    )
}

fn home_mission() -> Mission {
    Mission::new("return to home", vec![Task::return_to_home()])
}
