use std::{future::Future, io::Write, path::PathBuf};

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{cli::read_file_input, session::CaptionSession, view};

pub const HELP: &str = "\
Commands:
  key <value>               set the API key (blank clears it)
  file <path>               select an image (blank clears the selection)
  file-as <type> <path>     select an image declaring its media type
  submit                    generate alt text
  cancel                    reset everything
  status                    show the current state
  help                      show this help
  quit                      leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Key(String),
    File(Option<PathBuf>),
    FileAs { media_type: String, path: PathBuf },
    Submit,
    Cancel,
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim_start();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest),
            None => (line.trim_end(), ""),
        };

        match word {
            "key" => Ok(Self::Key(rest.to_string())),
            "file" => {
                let path = rest.trim();
                Ok(Self::File((!path.is_empty()).then(|| PathBuf::from(path))))
            }
            "file-as" => match rest.trim().split_once(char::is_whitespace) {
                Some((media_type, path)) => Ok(Self::FileAs {
                    media_type: media_type.to_string(),
                    path: PathBuf::from(path.trim()),
                }),
                None => Err("usage: file-as <type> <path>".to_string()),
            },
            "submit" | "generate" => Ok(Self::Submit),
            "cancel" => Ok(Self::Cancel),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("Unknown command: {other}. Type 'help' for the list.")),
        }
    }
}

enum Event {
    Line(Option<String>),
    Response(bool),
}

/// Reads commands from `input` and applies caption responses as they arrive.
/// On end of input any in-flight request is awaited before returning. When
/// `shutdown` resolves the loop stops at once so the caller can drop the
/// session and release its preview.
pub async fn run<R, W, S>(
    session: &mut CaptionSession,
    input: R,
    out: &mut W,
    shutdown: S,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut input_open = true;
    tokio::pin!(shutdown);
    writeln!(out, "hurai shell ({})", session.provider_name())?;
    writeln!(out, "{HELP}")?;

    loop {
        let busy = session.workflow().is_busy();
        if !input_open && !busy {
            break;
        }

        let event = tokio::select! {
            () = &mut shutdown => {
                tracing::debug!("shell interrupted");
                writeln!(out, "Interrupted.")?;
                break;
            }
            line = lines.next_line(), if input_open => Event::Line(line?),
            applied = session.next_response(), if busy => Event::Response(applied),
        };

        match event {
            Event::Line(None) => input_open = false,
            Event::Line(Some(line)) if line.trim().is_empty() => {}
            Event::Line(Some(line)) => match ShellCommand::parse(&line) {
                Ok(ShellCommand::Quit) => break,
                Ok(command) => {
                    execute(session, command, out)?;
                }
                Err(message) => writeln!(out, "{message}")?,
            },
            Event::Response(true) => write!(out, "{}", view::render(session.workflow()))?,
            Event::Response(false) => {}
        }
        out.flush()?;
    }
    Ok(())
}

fn execute<W: Write>(session: &mut CaptionSession, command: ShellCommand, out: &mut W) -> Result<()> {
    let busy = session.workflow().is_busy();
    match command {
        ShellCommand::Key(value) => {
            if busy {
                writeln!(out, "Busy: wait for the current request to settle.")?;
                return Ok(());
            }
            session.workflow_mut().set_credential(value);
        }
        ShellCommand::File(None) => {
            session.workflow_mut().select_file(None)?;
        }
        ShellCommand::File(Some(path)) => select_path(session, &path, None, out)?,
        ShellCommand::FileAs { media_type, path } => {
            select_path(session, &path, Some(&media_type), out)?;
        }
        ShellCommand::Submit => {
            if busy {
                writeln!(out, "Busy: a request is already in flight.")?;
                return Ok(());
            }
            session.submit();
        }
        ShellCommand::Cancel => {
            if busy {
                writeln!(out, "Busy: cancel is available once the request settles.")?;
                return Ok(());
            }
            session.workflow_mut().cancel();
        }
        ShellCommand::Status => {}
        ShellCommand::Help => {
            writeln!(out, "{HELP}")?;
            return Ok(());
        }
        ShellCommand::Quit => return Ok(()),
    }
    write!(out, "{}", view::render(session.workflow()))?;
    Ok(())
}

fn select_path<W: Write>(
    session: &mut CaptionSession,
    path: &std::path::Path,
    media_type: Option<&str>,
    out: &mut W,
) -> Result<()> {
    if session.workflow().is_busy() {
        writeln!(out, "Busy: wait for the current request to settle.")?;
        return Ok(());
    }
    match read_file_input(path, media_type) {
        // a rejected type is recorded on the workflow and rendered with it
        Ok(input) => {
            let _ = session.workflow_mut().select_file(Some(input));
        }
        Err(err) => writeln!(out, "Error: {err:#}")?,
    }
    Ok(())
}
