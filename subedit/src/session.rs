//! Line-oriented editing session for the `edit` subcommand

use anyhow::{anyhow, bail, Context as _};
use owo_colors::OwoColorize as _;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use subedit_core::{write_srt_file, SplitAt, SubtitleEditor, SubtitleEntry, Timestamp};
use tracing::{info, warn};

pub const HELP: &str = "\
Commands (N is the subtitle number as shown by `list`):
  list                 show all subtitles
  show N               show one subtitle
  text N TEXT          replace the text (use \\n for a line break)
  start N TIME         move the start, e.g. start 3 00:00:12,500
  end N TIME           move the end
  split N [CHAR]       split at the middle or before character CHAR
  merge N              merge N with the next subtitle
  delete N             delete a subtitle
  insert N             insert an empty subtitle after N
  select N[-M]         select one subtitle or a range
  toggle N             add or remove N from the selection
  clear                clear the selection
  merge-sel            merge the selected subtitles
  delete-sel           delete the selected subtitles
  shift MS [FROM]      shift subtitles FROM.. (default all) by MS milliseconds
  at TIME              which subtitle is shown at TIME
  undo / redo          step through the edit history
  save [FILE]          write the subtitles
  help                 show this help
  quit                 leave the session";

/// One parsed session command. Positions are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Show(usize),
    Text(usize, String),
    Start(usize, Timestamp),
    End(usize, Timestamp),
    Split(usize, Option<usize>),
    Merge(usize),
    Delete(usize),
    Insert(usize),
    Select(usize, Option<usize>),
    Toggle(usize),
    Clear,
    MergeSelection,
    DeleteSelection,
    Shift(i64, usize),
    At(Timestamp),
    Undo,
    Redo,
    Save(Option<PathBuf>),
    Help,
    Quit,
}

/// Parse a 1-based subtitle number into a position
fn position(arg: Option<&str>) -> anyhow::Result<usize> {
    let arg = arg.ok_or_else(|| anyhow!("missing subtitle number"))?;
    let number: usize = arg
        .parse()
        .with_context(|| format!("'{}' is not a subtitle number", arg))?;
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("subtitle numbers start at 1"))
}

fn timestamp(arg: Option<&str>) -> anyhow::Result<Timestamp> {
    let arg = arg.ok_or_else(|| anyhow!("missing time (HH:MM:SS,mmm)"))?;
    Ok(arg.parse()?)
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();

        let command = match name {
            "list" | "ls" => Command::List,
            "show" => Command::Show(position(args.next())?),
            "text" => {
                let pos = position(args.next())?;
                let (_, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Command::Text(pos, text.trim().replace("\\n", "\n"))
            }
            "start" => Command::Start(position(args.next())?, timestamp(args.next())?),
            "end" => Command::End(position(args.next())?, timestamp(args.next())?),
            "split" => {
                let pos = position(args.next())?;
                let at = args
                    .next()
                    .map(|c| c.parse::<usize>())
                    .transpose()
                    .context("split offset must be a character count")?;
                Command::Split(pos, at)
            }
            "merge" => Command::Merge(position(args.next())?),
            "delete" | "rm" => Command::Delete(position(args.next())?),
            "insert" => Command::Insert(position(args.next())?),
            "select" => {
                let arg = args.next();
                match arg.and_then(|s| s.split_once('-')) {
                    Some((a, b)) => Command::Select(position(Some(a))?, Some(position(Some(b))?)),
                    None => Command::Select(position(arg)?, None),
                }
            }
            "toggle" => Command::Toggle(position(args.next())?),
            "clear" => Command::Clear,
            "merge-sel" => Command::MergeSelection,
            "delete-sel" => Command::DeleteSelection,
            "shift" => {
                let offset = args
                    .next()
                    .ok_or_else(|| anyhow!("missing offset in milliseconds"))?;
                let offset: i64 = offset
                    .parse()
                    .with_context(|| format!("'{}' is not a number of milliseconds", offset))?;
                let from = match args.next() {
                    Some(from) => position(Some(from))?,
                    None => 0,
                };
                Command::Shift(offset, from)
            }
            "at" => Command::At(timestamp(args.next())?),
            "undo" | "u" => Command::Undo,
            "redo" | "r" => Command::Redo,
            "save" | "w" => Command::Save(args.next().map(PathBuf::from)),
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command '{}', try 'help'", other),
        };
        Ok(command)
    }
}

/// What the input loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// An editor bound to the file it saves to
pub struct Session {
    editor: SubtitleEditor,
    output: PathBuf,
    saved: Vec<SubtitleEntry>,
}

impl Session {
    pub fn new(editor: SubtitleEditor, output: PathBuf) -> Self {
        let saved = editor.entries().to_vec();
        Self {
            editor,
            output,
            saved,
        }
    }

    #[cfg(test)]
    pub fn editor(&self) -> &SubtitleEditor {
        &self.editor
    }

    /// Whether the entries differ from what was loaded or last saved
    pub fn is_dirty(&self) -> bool {
        self.editor.entries() != self.saved.as_slice()
    }

    fn print_entry<W: Write>(&self, out: &mut W, pos: usize) -> anyhow::Result<()> {
        let Some(entry) = self.editor.entry(pos) else {
            bail!("no subtitle {}", pos + 1);
        };
        let marker = if self.editor.is_selected(pos) { "*" } else { " " };
        writeln!(
            out,
            "{}{} {} --> {}  {}",
            marker.yellow(),
            format!("{:>4}", entry.index).cyan(),
            entry.start_time,
            entry.end_time,
            entry.text.replace('\n', " / ")
        )?;
        Ok(())
    }

    /// Run one command, writing any listing to `out`
    pub async fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> anyhow::Result<Outcome> {
        let editor = &mut self.editor;
        match command {
            Command::List => {
                if self.editor.is_empty() {
                    writeln!(out, "(no subtitles)")?;
                }
                for pos in 0..self.editor.len() {
                    self.print_entry(out, pos)?;
                }
            }
            Command::Show(pos) => self.print_entry(out, pos)?,
            Command::Text(pos, text) => editor.update_text(pos, text)?,
            Command::Start(pos, ts) => editor.set_start(pos, ts)?,
            Command::End(pos, ts) => editor.set_end(pos, ts)?,
            Command::Split(pos, at) => {
                editor.split(pos, at.map(SplitAt::Char).unwrap_or(SplitAt::Middle))?
            }
            Command::Merge(pos) => editor.merge(pos)?,
            Command::Delete(pos) => editor.delete(pos)?,
            Command::Insert(pos) => {
                let new_pos = editor.insert_after(pos)?;
                writeln!(out, "Inserted subtitle {}", new_pos + 1)?;
            }
            Command::Select(a, Some(b)) => editor.select_range(a, b)?,
            Command::Select(a, None) => editor.select(a)?,
            Command::Toggle(pos) => editor.toggle(pos)?,
            Command::Clear => editor.clear_selection(),
            Command::MergeSelection => editor.merge_selection()?,
            Command::DeleteSelection => editor.delete_selection()?,
            Command::Shift(offset, from) => editor.shift(from, offset)?,
            Command::At(ts) => match editor.entry_at(ts) {
                Some(pos) => self.print_entry(out, pos)?,
                None => writeln!(out, "No subtitle at {}", ts)?,
            },
            Command::Undo => {
                if !editor.undo() {
                    bail!("nothing to undo");
                }
            }
            Command::Redo => {
                if !editor.redo() {
                    bail!("nothing to redo");
                }
            }
            Command::Save(path) => {
                if let Some(path) = path {
                    self.output = path;
                }
                write_srt_file(&self.output, self.editor.entries()).await?;
                self.saved = self.editor.entries().to_vec();
                info!(
                    "Saved {} subtitles to {}",
                    self.editor.len(),
                    self.output.display()
                );
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => {
                self.warn_if_dirty();
                return Ok(Outcome::Quit);
            }
        }
        Ok(Outcome::Continue)
    }

    pub fn warn_if_dirty(&self) {
        if self.is_dirty() {
            warn!(
                "Leaving with unsaved changes; {} was not updated",
                self.output.display()
            );
        }
    }
}
