//! `simbot-cli` – SimBot operator console
//!
//! Interactive front end for the simulated robot driver.  It:
//!
//! 1. Initialises structured logging (see `simbot_runtime::logging`).
//! 2. Loads [`Settings`][simbot_config::Settings] from `simbot.toml` (or
//!    `$SIMBOT_CONFIG`) with `ROBOT_*` environment overrides.
//! 3. Builds a [`Robot`] with an inspection callback that prints every
//!    delivered inspection.
//! 4. Drops the operator into a REPL with slash-commands (`/demo`, `/home`,
//!    `/status`, `/pause`, `/resume`, `/stop`, `/telemetry`, `/settings`,
//!    `/help`, `/quit`).
//! 5. Intercepts **Ctrl-C** to stop any running mission before exiting.

mod repl;

use colored::Colorize;
use std::sync::Arc;
use tracing::warn;

use simbot_driver::Robot;

fn main() {
    let _tracing_guard = simbot_runtime::init_tracing("simbot");

    print_banner();

    // ── Settings ──────────────────────────────────────────────────────────
    let settings = match simbot_config::load() {
        Ok(settings) => {
            println!(
                "  Settings loaded (file: {})",
                simbot_config::config_path().display().to_string().bold()
            );
            settings
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default settings.");
            let mut settings = simbot_config::Settings::default();
            simbot_config::apply_env_overrides(&mut settings);
            settings
        }
    };

    // ── Robot ─────────────────────────────────────────────────────────────
    let mut robot = Robot::new(settings);
    robot.register_inspection_callback(|inspection, mission| {
        println!(
            "\n  {} {} ({}) for mission {}",
            "◆ inspection".magenta().bold(),
            inspection.id().bold(),
            inspection.metadata().file_type,
            mission.name.bold()
        );
    });
    let robot = Arc::new(robot);

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let robot_ctrlc = Arc::clone(&robot);

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping robot …".yellow().bold());
        match robot_ctrlc.stop() {
            Ok(()) => println!("{}", "  ✓ Mission stopped.".green()),
            Err(e) => println!("  {}", e.to_string().dimmed()),
        }
        println!("{}", "  ✓ Exiting SimBot.".green());
        std::process::exit(130);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; running missions will not be stopped on Ctrl-C");
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&robot);
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _____ _           ____        __ "#.bold().cyan());
    println!("{}", r#"  / ___/(_)___ ___  / __ )____  / /_"#.bold().cyan());
    println!("{}", r#"  \__ \/ / __ `__ \/ __  / __ \/ __/"#.bold().cyan());
    println!("{}", r#" ___/ / / / / / / / /_/ / /_/ / /_  "#.bold().cyan());
    println!("{}", r#"/____/_/_/ /_/ /_/_____/\____/\__/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "SimBot".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Simulated inspection robot driver");
    println!();
}
