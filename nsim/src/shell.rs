//! The command loop: a namespace, a current directory, and a line reader.

use crate::command::{self, Command, USAGE};
use crate::output::{CommandOutput, Outcome, OutputWriter};
use anyhow::{Context, Result};
use nsim_core::{MoveOutcome, Namespace, NamespaceConfig, NodeId};
use std::io::{BufRead, Write};

/// Result code reported for lines that fail to parse.
const USAGE_ERROR: u8 = 1;

/// Options for [`Shell::run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Print `cd <dir>> ` before reading each line.
    pub prompt: bool,
    /// Repeat each line before executing it.
    pub echo: bool,
}

/// A namespace together with the caller's current directory.
pub struct Shell {
    ns: Namespace,
    cwd: NodeId,
}

impl Shell {
    /// Start a session in the root of a fresh namespace.
    pub fn new(config: NamespaceConfig) -> nsim_core::Result<Self> {
        let ns = Namespace::new(config)?;
        let cwd = ns.root();
        Ok(Self { ns, cwd })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    /// Prompt showing the current directory's name.
    pub fn prompt(&self) -> String {
        let name = self.ns.node(self.cwd).map(|n| n.name()).unwrap_or("?");
        format!("cd {}> ", name)
    }

    /// Run one command against the namespace.
    pub fn execute(&mut self, command: &Command) -> nsim_core::Result<Outcome> {
        let cwd = self.cwd;
        let ns = &mut self.ns;

        let outcome = match command {
            Command::Mkdir(name) => {
                ns.create_directory(cwd, name)?;
                Outcome::Created { name: name.clone() }
            }
            Command::Touch(name) => {
                ns.touch(cwd, name)?;
                Outcome::Created { name: name.clone() }
            }
            Command::Ls => Outcome::Listing {
                entries: ns.list(cwd)?,
            },
            Command::Tree => Outcome::Tree {
                entries: ns.walk(cwd)?,
            },
            Command::Cd(target) => {
                self.cwd = match target {
                    Some(target) => ns.change_directory(cwd, target)?,
                    None => ns.root(),
                };
                Outcome::Changed {
                    path: ns.path(self.cwd)?,
                }
            }
            Command::Pwd => Outcome::Location {
                path: ns.path(cwd)?,
            },
            Command::Cat(name) => Outcome::Content {
                name: name.clone(),
                content: ns.read_content(cwd, name)?.map(str::to_string),
            },
            Command::Echo { text, file: None } => Outcome::Echo { text: text.clone() },
            Command::Echo {
                text,
                file: Some(name),
            } => {
                ns.write_content(cwd, name, text)?;
                Outcome::Written {
                    name: name.clone(),
                    bytes: text.len(),
                }
            }
            Command::Stat(name) => Outcome::Info {
                info: ns.stat(cwd, name)?,
            },
            Command::Rm(name) => Outcome::Removed {
                name: name.clone(),
                released: ns.remove(cwd, name)?,
            },
            Command::Mv { source, target } => match ns.move_or_rename(cwd, source, target)? {
                MoveOutcome::Moved { into } => Outcome::Moved {
                    name: source.clone(),
                    into: ns.node(into)?.name().to_string(),
                },
                MoveOutcome::Renamed => Outcome::Renamed {
                    from: source.clone(),
                    to: target.clone(),
                },
            },
            Command::Cp { source, dest } => {
                ns.copy(cwd, source, dest)?;
                Outcome::Copied {
                    from: source.clone(),
                    to: dest.clone(),
                }
            }
            Command::Help => Outcome::Help {
                commands: USAGE.to_vec(),
            },
            Command::Exit => Outcome::Exit,
        };

        Ok(outcome)
    }

    /// Read commands from `input` until `exit` or end of input.
    ///
    /// Command errors are reported through `output` and never stop the loop;
    /// only I/O failures are returned.
    pub fn run<R: BufRead, O: Write, E: Write>(
        &mut self,
        input: R,
        output: &mut OutputWriter<O, E>,
        options: RunOptions,
    ) -> Result<()> {
        let mut lines = input.lines();

        loop {
            if options.prompt {
                output.write_raw(&self.prompt())?;
            }

            let Some(line) = lines.next() else {
                break;
            };
            let line = line.context("Failed to read command")?;

            if options.echo {
                output.write_raw(&format!("{}\n", line))?;
            }

            let command = match command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    output.write_error(&e, USAGE_ERROR);
                    continue;
                }
            };

            tracing::debug!(command = command.name(), "executing");
            match self.execute(&command) {
                Ok(Outcome::Exit) => break,
                Ok(outcome) => {
                    let data = CommandOutput {
                        success: true,
                        result_code: 0,
                        command: command.name(),
                        data: &outcome,
                    };
                    output.write(&data, || outcome.to_text())?;
                }
                Err(e) => {
                    tracing::debug!(command = command.name(), error = %e, "command failed");
                    output.write_error(&e, e.code());
                }
            }
        }

        if options.prompt && !output.is_json() {
            output.write_raw("\n")?;
        }
        Ok(())
    }
}
