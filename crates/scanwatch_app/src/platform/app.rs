use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use scan_logging::{observed_scan_label, scan_error, scan_info, scan_warn, set_observed_scan};
use scanwatch_client::ClientSettings;
use scanwatch_core::{update, AppState, Msg, Phase, ScanForm};

use super::cli::{Cli, Command};
use super::config::{self, AppConfig};
use super::effects::EffectRunner;
use super::logging;
use super::render::{render, RenderOptions};

/// How long the loop waits for a client event before sending a tick.
const EVENT_WAIT: Duration = Duration::from_millis(75);

pub fn run_app() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let (mut config, config_problem) = match config::read(&cli.config) {
        Ok(found) => (found.unwrap_or_default(), None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    config.apply_cli(&cli);
    logging::initialize(config.log_destination, logging::level_for(config.verbose));
    if let Some(err) = config_problem {
        scan_warn!("Ignoring config file: {}", err);
    }
    scan_info!("Using scanning service at {}", config.server_url);

    let runner = start_runner(config.client_settings())?;
    let goal = Goal::for_command(&cli.command);
    let mut session = Session::new(runner, goal);
    session.run(initial_msg(cli.command));
    Ok(session.exit_code())
}

fn start_runner(settings: ClientSettings) -> anyhow::Result<EffectRunner> {
    match EffectRunner::new(settings) {
        Ok(runner) => Ok(runner),
        Err(err) => {
            scan_error!("Could not start the scanwatch client: {}", err);
            Err(err).context("failed to start the scanwatch client")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goal {
    /// Run until the observed scan is settled.
    FollowScan,
    /// Run until the history list has loaded.
    LoadHistory,
}

impl Goal {
    fn for_command(command: &Command) -> Self {
        match command {
            Command::Scan { .. } | Command::Inspect { .. } => Goal::FollowScan,
            Command::History => Goal::LoadHistory,
        }
    }

    fn render_options(self) -> RenderOptions {
        RenderOptions {
            status: self == Goal::FollowScan,
            history: self == Goal::LoadHistory,
        }
    }
}

fn initial_msg(command: Command) -> Msg {
    match command {
        Command::Scan {
            target,
            ports,
            rate,
        } => Msg::SubmitRequested(ScanForm::new(target, ports, rate)),
        Command::Inspect { scan_id } => Msg::HistorySelected { scan_id },
        Command::History => Msg::HistoryRefreshRequested,
    }
}

/// Single-threaded event loop: every message goes through `update`, its
/// effects go to the client runtime, and a changed view is printed.
struct Session {
    state: AppState,
    runner: EffectRunner,
    goal: Goal,
    last_frame: Vec<String>,
}

impl Session {
    fn new(runner: EffectRunner, goal: Goal) -> Self {
        Self {
            state: AppState::new(),
            runner,
            goal,
            last_frame: Vec::new(),
        }
    }

    fn run(&mut self, first: Msg) {
        self.dispatch(first);
        while !self.is_done() {
            let msg = self.runner.next_msg(EVENT_WAIT).unwrap_or(Msg::Tick);
            self.dispatch(msg);
        }
        scan_info!(
            "[{}] Finished with phase {:?}",
            observed_scan_label(),
            self.state.status().phase()
        );
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        set_observed_scan(state.status().scan_id());
        let was_dirty = state.consume_dirty();
        self.state = state;

        self.runner.enqueue(effects);
        if was_dirty {
            self.print_frame();
        }
    }

    fn print_frame(&mut self) {
        let frame = render(&self.state.view(), self.goal.render_options());
        if frame == self.last_frame {
            return;
        }
        for line in &frame {
            println!("{line}");
        }
        self.last_frame = frame;
    }

    fn is_done(&self) -> bool {
        match self.goal {
            Goal::FollowScan => self.state.is_settled(),
            Goal::LoadHistory => !self.state.history().is_refreshing(),
        }
    }

    fn exit_code(&self) -> ExitCode {
        let failed = match self.goal {
            Goal::FollowScan => !matches!(
                self.state.status().phase(),
                Some(Phase::Starting | Phase::Running | Phase::Completed)
            ),
            Goal::LoadHistory => self.state.history().last_error().is_some(),
        };
        if failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}
