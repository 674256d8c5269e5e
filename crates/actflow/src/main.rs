//! ActFlow - node-based act playback for DMX lighting
//!
//! Command line front end: plays acts from a show file over Art-Net, checks
//! act graphs and prints show contents.

mod config;
mod logging_setup;

use crate::config::AppConfig;
use actflow_control::{ArtNetSender, DmxUniverse, ShowRunner};
use actflow_core::{validate, PlaybackSession, Severity};
use actflow_io::{load_show, Show};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play an act from a show file
    Play {
        show: PathBuf,
        /// Act id or name
        #[arg(long)]
        act: String,
        /// Stop after this many seconds instead of when the act ends
        #[arg(long = "for", value_name = "SECONDS")]
        duration: Option<f64>,
    },
    /// Check every act graph in a show file
    Validate { show: PathBuf },
    /// Print the acts, scenes and fixtures of a show file
    Inspect { show: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    let _log_guard = logging_setup::init(&config.logging)?;

    match cli.command {
        Command::Play {
            show,
            act,
            duration,
        } => play(&config, &show, &act, duration).await,
        Command::Validate { show } => {
            let show = load(&show)?;
            let errors = print_issues(&show);
            if errors > 0 {
                bail!("{} act graph error(s) in show '{}'", errors, show.name);
            }
            Ok(())
        }
        Command::Inspect { show } => {
            inspect(&load(&show)?);
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<Show> {
    load_show(path).with_context(|| format!("Failed to load show: {:?}", path))
}

/// Parse a `--for` value, rejecting negative, non-finite and out-of-range seconds
fn play_duration(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("invalid duration: {} seconds", seconds))
}

async fn play(config: &AppConfig, path: &Path, act: &str, duration: Option<f64>) -> Result<()> {
    let duration = duration.map(play_duration).transpose()?;
    let mut show = load(path)?;
    if let Some(universe) = config.output.universe {
        show.universe = universe;
    }
    let Some(found) = show.find_act(act) else {
        bail!("show '{}' has no act '{}'", show.name, act);
    };
    for issue in validate(found) {
        if issue.severity() >= Severity::Warning {
            warn!(act = %found.name, "{}", issue);
        }
    }

    let universe = show.build_universe()?;
    let session = PlaybackSession::new(universe, show.scenes.clone(), config.engine.clone());
    let artnet = if config.output.enabled {
        let mut sender = ArtNetSender::new(show.universe, &config.output.artnet_target)?;
        sender.set_refresh_rate(config.output.refresh_hz);
        info!(target = %sender.target(), universe = show.universe, "Art-Net output enabled");
        Some(sender)
    } else {
        None
    };

    let acts = show.acts.into_iter().map(Arc::new).collect();
    let (mut runner, handle) = ShowRunner::new(session, acts, artnet);
    runner.start_act(act)?;

    let task = match duration {
        Some(limit) => {
            let task = tokio::spawn(runner.run());
            tokio::select! {
                _ = tokio::time::sleep(limit) => {}
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
            handle.shutdown()?;
            task
        }
        None => {
            let mut task = tokio::spawn(runner.exit_when_idle(true).run());
            tokio::select! {
                session = &mut task => {
                    report(&session?);
                    return Ok(());
                }
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
            handle.shutdown()?;
            task
        }
    };

    report(&task.await?);
    Ok(())
}

fn report(session: &PlaybackSession<DmxUniverse>) {
    let lit = session
        .output()
        .channels()
        .iter()
        .filter(|value| **value > 0)
        .count();
    info!(
        elapsed_ms = session.now().as_millis() as u64,
        lit_channels = lit,
        "playback finished"
    );
}

/// Print every finding; returns the number of errors
fn print_issues(show: &Show) -> usize {
    let mut errors = 0;
    for act in &show.acts {
        let issues = validate(act);
        if issues.is_empty() {
            println!("{}: ok", act.name);
            continue;
        }
        println!("{}:", act.name);
        for issue in issues {
            let severity = issue.severity();
            if severity == Severity::Error {
                errors += 1;
            }
            println!("  {:<7} {}", format!("{:?}", severity).to_lowercase(), issue);
        }
    }
    errors
}

fn inspect(show: &Show) {
    println!("Show: {} (universe {})", show.name, show.universe);

    println!("Acts ({}):", show.acts.len());
    for act in &show.acts {
        println!(
            "  {} [{}] - {} nodes, {} connections",
            act.name,
            act.id,
            act.nodes.len(),
            act.connections.len()
        );
        for node in &act.nodes {
            let start = act.start_node_id.as_ref() == Some(&node.id);
            println!(
                "    {}{:<10} {}",
                if start { "*" } else { " " },
                node.kind.label(),
                node.name
            );
        }
        if let Some(osc) = &act.triggers.osc {
            println!("    osc trigger {} (enabled: {})", osc.address, osc.enabled);
        }
        if let Some(midi) = &act.triggers.midi {
            println!(
                "    midi trigger ch {} note {} (enabled: {})",
                midi.channel, midi.note, midi.enabled
            );
        }
    }

    println!("Scenes ({}):", show.scenes.len());
    for scene in show.scenes.scenes() {
        println!("  {} - {} channels", scene.name, scene.channel_values.len());
    }

    println!("Fixtures ({}):", show.fixtures.len());
    for fixture in &show.fixtures {
        println!(
            "  {} {} @ {}-{} ({})",
            fixture.id,
            fixture.name,
            fixture.start_address,
            fixture.end_address(),
            fixture.profile.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_play() {
        let cli = Cli::try_parse_from([
            "actflow", "play", "show.ron", "--act", "Intro", "--for", "2.5",
        ])
        .unwrap();
        match cli.command {
            Command::Play {
                show,
                act,
                duration,
            } => {
                assert_eq!(show, PathBuf::from("show.ron"));
                assert_eq!(act, "Intro");
                assert_eq!(duration, Some(2.5));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_play_duration_rejects_unrepresentable_values() {
        assert_eq!(play_duration(2.5).unwrap(), Duration::from_millis(2500));
        assert_eq!(play_duration(0.0).unwrap(), Duration::ZERO);
        assert!(play_duration(f64::INFINITY).is_err());
        assert!(play_duration(1e20).is_err());
        assert!(play_duration(-1.0).is_err());
        assert!(play_duration(f64::NAN).is_err());
    }

    #[test]
    fn test_play_requires_act() {
        assert!(Cli::try_parse_from(["actflow", "play", "show.ron"]).is_err());
    }

    #[test]
    fn test_print_issues_counts_errors() {
        let mut show = Show::new("Check");
        show.acts.push(actflow_core::Act::new("Empty"));
        assert_eq!(print_issues(&show), 1);
    }
}
