use log::info;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

use super::DashboardView;

pub const HELP: &str = "\
Commands:
  coins <id>[,<id>...]   select one or more coins (e.g. coins bitcoin,ethereum)
  range <days>           select the number of trailing days
  refresh                fetch the current selection now
  help                   show this message
  quit                   exit
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Coins(Vec<String>),
    Range(u32),
    Refresh,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match name.to_lowercase().as_str() {
            "coins" | "coin" => {
                let coins: Vec<String> = rest
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                if coins.is_empty() {
                    return Err(Error::ValidationError("usage: coins <id>[,<id>...]".into()));
                }
                Ok(Command::Coins(coins))
            }
            "range" | "days" => rest
                .parse::<u32>()
                .map(Command::Range)
                .map_err(|_| Error::ValidationError("usage: range <days>".into())),
            "refresh" | "r" => Ok(Command::Refresh),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(Error::ValidationError(format!(
                "Unknown command '{}', type help for a list",
                other
            ))),
        }
    }
}

async fn apply<W>(view: &mut DashboardView, command: Command, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match command {
        Command::Coins(coins) => view.select_coins(coins).await,
        Command::Range(days) => view.select_range(days).await,
        Command::Refresh => view.refresh().await.map(|_| ()),
        Command::Help => {
            output.write_all(HELP.as_bytes()).await?;
            Ok(())
        }
        Command::Quit => Ok(()),
    }
}

/// Drives `view` from line commands on `input`, writing a fresh rendering
/// to `output` every time the dashboard state changes. Returns on `quit`
/// or end of input.
pub async fn run<R, W>(mut view: DashboardView, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut updates = view.orchestrator().subscribe();

    output.write_all(HELP.as_bytes()).await?;
    output.flush().await?;
    view.refresh().await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = apply(&mut view, command, &mut output).await {
                            output.write_all(format!("{}\n", e).as_bytes()).await?;
                        }
                    }
                    Err(e) => output.write_all(format!("{}\n", e).as_bytes()).await?,
                }
                output.flush().await?;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                output.write_all(view.render(&state).as_bytes()).await?;
                output.flush().await?;
            }
        }
    }

    info!("Dashboard closed");
    view.shutdown().await;
    Ok(())
}
