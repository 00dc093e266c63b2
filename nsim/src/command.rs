//! Parsing of shell command lines.

use anyhow::{Result, bail};

/// One line of shell input, tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mkdir(String),
    Touch(String),
    Ls,
    Tree,
    /// `None` goes to the root.
    Cd(Option<String>),
    Pwd,
    Cat(String),
    /// Write `text` into `file`, or print it when there is no file.
    Echo { text: String, file: Option<String> },
    Stat(String),
    Rm(String),
    Mv { source: String, target: String },
    Cp { source: String, dest: String },
    Help,
    Exit,
}

impl Command {
    /// Name of the command word, for JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Mkdir(_) => "mkdir",
            Command::Touch(_) => "touch",
            Command::Ls => "ls",
            Command::Tree => "tree",
            Command::Cd(_) => "cd",
            Command::Pwd => "pwd",
            Command::Cat(_) => "cat",
            Command::Echo { .. } => "echo",
            Command::Stat(_) => "stat",
            Command::Rm(_) => "rm",
            Command::Mv { .. } => "mv",
            Command::Cp { .. } => "cp",
            Command::Help => "help",
            Command::Exit => "exit",
        }
    }
}

/// Usage lines shown by `help`.
pub const USAGE: &[&str] = &[
    "mkdir <name>            create a directory",
    "touch <name>            create an empty file",
    "ls                      list the current directory",
    "tree                    list everything below the current directory",
    "cd <name> | cd ..       change directory (no argument: root)",
    "pwd                     print the current path",
    "cat <file>              print a file's content",
    "echo <text> > <file>    write text into a file",
    "echo <text> <file>      write text into a file (last word is the file)",
    "echo <text>             print text",
    "stat <name>             show metadata",
    "rm <name>               remove a file or directory",
    "mv <source> <target>    move into a directory or rename",
    "cp <source> <dest>      copy a file",
    "help                    show this help",
    "exit                    leave the shell",
];

/// Parse one input line. Blank lines and `#` comments yield `None`.
///
/// Single-name commands take the rest of the line as the name, so names may
/// contain spaces; `mv` and `cp` take exactly two words.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "mkdir" => Command::Mkdir(required(word, rest)?),
        "touch" => Command::Touch(required(word, rest)?),
        "cat" => Command::Cat(required(word, rest)?),
        "stat" => Command::Stat(required(word, rest)?),
        "rm" => Command::Rm(required(word, rest)?),
        "ls" => Command::Ls,
        "tree" => Command::Tree,
        "pwd" => Command::Pwd,
        "help" => Command::Help,
        "exit" => Command::Exit,
        "cd" if rest.is_empty() => Command::Cd(None),
        "cd" => Command::Cd(Some(rest.to_string())),
        "echo" => parse_echo(rest)?,
        "mv" => {
            let (source, target) = pair(word, rest)?;
            Command::Mv { source, target }
        }
        "cp" => {
            let (source, dest) = pair(word, rest)?;
            Command::Cp { source, dest }
        }
        other => bail!("Unknown command '{}' (try 'help')", other),
    };

    Ok(Some(command))
}

fn required(word: &str, rest: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("Usage: {} <name>", word);
    }
    Ok(rest.to_string())
}

fn pair(word: &str, rest: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    match parts.as_slice() {
        [first, second] => Ok((first.to_string(), second.to_string())),
        _ => bail!("Usage: {} <source> <destination>", word),
    }
}

fn parse_echo(rest: &str) -> Result<Command> {
    if rest.is_empty() {
        bail!("Usage: echo <text> [> <file>]");
    }

    if rest == ">" || rest.ends_with(" >") {
        bail!("Usage: echo <text> > <file>");
    }

    if let Some((text, file)) = rest.rsplit_once(" > ") {
        let file = file.trim();
        if file.is_empty() {
            bail!("Usage: echo <text> > <file>");
        }
        return Ok(Command::Echo {
            text: text.to_string(),
            file: Some(file.to_string()),
        });
    }

    match rest.rsplit_once(char::is_whitespace) {
        Some((text, file)) => Ok(Command::Echo {
            text: text.trim_end().to_string(),
            file: Some(file.to_string()),
        }),
        None => Ok(Command::Echo {
            text: rest.to_string(),
            file: None,
        }),
    }
}
