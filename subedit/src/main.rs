//! subedit - subtitle editing command-line interface
mod fmt;
mod session;

use clap::{Parser, Subcommand};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize as _;
use std::io::{self, BufRead as _, IsTerminal as _, Write as _};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use subedit_core::{
    check, config::API_KEY_ENV, read_srt_file, to_srt, transcribe_audio_file,
    translate_subtitles, SubEditConfig, SubtitleEditor, SubtitleEntry, TimeRange, Timestamp,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::fmt::MyFormatter;
use crate::session::{Command, Outcome, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::builder().parse("info,reqwest=warn,hyper=warn"))?;
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_env_filter(filter)
            .compact()
            .without_time()
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_target(false)
            .event_format(MyFormatter)
            .with_writer(std::io::stderr)
            .init();
    }
    debug!("Command line arguments: {:?}", cli);

    if let Err(e) = handle_command(cli.command).await {
        error!("{:#}", e);
        process::exit(1);
    }
    Ok(())
}

const ABOUT: &str = "Edit, transcribe and translate SRT subtitles";

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), author = env!("CARGO_PKG_AUTHORS"))]
#[command(about = ABOUT)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe an audio file into subtitles with Gemini
    Transcribe {
        /// Audio file (mp3, wav, m4a, aac, ogg, flac, webm)
        #[arg(value_name = "AUDIO_FILE")]
        audio_file: PathBuf,

        /// Only transcribe from this time on (HH:MM:SS,mmm)
        #[arg(long, requires = "to")]
        from: Option<Timestamp>,

        /// Only transcribe up to this time (HH:MM:SS,mmm)
        #[arg(long)]
        to: Option<Timestamp>,

        /// Gemini model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "srt")]
        output: OutputFormat,

        /// Output file path (writes to file instead of stdout)
        #[arg(short = 'f', long = "output-file")]
        output_file: Option<PathBuf>,
    },
    /// Translate the text of an SRT file, keeping its timing
    Translate {
        #[arg(value_name = "SRT_FILE")]
        srt_file: PathBuf,

        /// Target language, e.g. "German" or "pt-BR"
        #[arg(short, long)]
        language: String,

        /// Gemini model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,

        /// Output file path (writes to file instead of stdout)
        #[arg(short = 'f', long = "output-file")]
        output_file: Option<PathBuf>,
    },
    /// Edit an SRT file with line commands read from stdin
    Edit {
        #[arg(value_name = "SRT_FILE")]
        srt_file: PathBuf,

        /// Save to this file instead of overwriting the input
        #[arg(short = 'f', long = "output-file")]
        output_file: Option<PathBuf>,

        /// Do not adjust neighbouring subtitles when moving times
        #[arg(long)]
        no_cascade: bool,
    },
    /// Report timing, numbering and text problems
    Check {
        #[arg(value_name = "SRT_FILE")]
        srt_file: PathBuf,
    },
    /// Move subtitles by a number of milliseconds
    Shift {
        #[arg(value_name = "SRT_FILE")]
        srt_file: PathBuf,

        /// Offset in milliseconds, negative to move earlier
        #[arg(value_name = "OFFSET_MS", allow_negative_numbers = true)]
        offset_ms: i64,

        /// First subtitle number to move (default 1)
        #[arg(long, value_name = "N")]
        from: Option<usize>,

        /// Output file path (writes to file instead of stdout)
        #[arg(short = 'f', long = "output-file")]
        output_file: Option<PathBuf>,
    },
    /// Configuration file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
    /// Write a configuration file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Output format options
#[derive(Clone, Debug, clap::ValueEnum)]
enum OutputFormat {
    /// SRT subtitle format
    Srt,
    /// JSON array of entries
    Json,
    /// One line per entry with its time range
    Text,
}

/// Handle subcommands
async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Transcribe {
            audio_file,
            from,
            to,
            model,
            output,
            output_file,
        } => {
            if !audio_file.exists() {
                anyhow::bail!("Audio file not found: {}", audio_file.display());
            }
            let range = match to {
                Some(to) => Some(TimeRange::new(from.unwrap_or(Timestamp::ZERO), to)?),
                None => None,
            };
            let config = load_config(model).await?;

            let progress = spinner(match range {
                Some(range) => format!("Transcribing {} ({})", audio_file.display(), range),
                None => format!("Transcribing {}", audio_file.display()),
            })?;
            let result = transcribe_audio_file(&audio_file, range, Some(config)).await;
            let elapsed = progress.elapsed();
            progress.finish_and_clear();
            let entries = result?;

            info!(
                "Transcribed {} subtitles in {:#}",
                entries.len(),
                HumanDuration(elapsed)
            );
            write_output(&format_entries(&entries, &output)?, output_file.as_deref()).await
        }
        Commands::Translate {
            srt_file,
            language,
            model,
            output_file,
        } => {
            let entries = read_srt_file(&srt_file).await?;
            let config = load_config(model).await?;

            let progress = spinner(format!(
                "Translating {} subtitles into {}",
                entries.len(),
                language
            ))?;
            let result = translate_subtitles(&entries, &language, Some(config)).await;
            let elapsed = progress.elapsed();
            progress.finish_and_clear();
            let translated = result?;

            info!(
                "Translated {} subtitles in {:#}",
                translated.len(),
                HumanDuration(elapsed)
            );
            write_output(&to_srt(&translated), output_file.as_deref()).await
        }
        Commands::Edit {
            srt_file,
            output_file,
            no_cascade,
        } => {
            let mut config = SubEditConfig::load().await?.editor;
            if no_cascade {
                config = config.with_cascade(false);
            }
            let entries = read_srt_file(&srt_file).await?;
            let editor = SubtitleEditor::new(entries, config);
            info!(
                "Loaded {} subtitles from {}, type 'help' for commands",
                editor.len(),
                srt_file.display()
            );

            let session = Session::new(editor, output_file.unwrap_or(srt_file));
            run_session(session).await
        }
        Commands::Check { srt_file } => {
            let entries = read_srt_file(&srt_file).await?;
            let issues = check(&entries);
            if issues.is_empty() {
                println!(
                    "{} {} subtitles, no issues found.",
                    "Success:".green().bold(),
                    entries.len()
                );
                return Ok(());
            }

            for issue in &issues {
                println!("{} {}", "Issue:".yellow().bold(), issue);
            }
            anyhow::bail!(
                "{} issue(s) in {}",
                issues.len(),
                srt_file.display()
            )
        }
        Commands::Shift {
            srt_file,
            offset_ms,
            from,
            output_file,
        } => {
            let from = match from {
                Some(0) => anyhow::bail!("subtitle numbers start at 1"),
                Some(n) => n - 1,
                None => 0,
            };
            let config = SubEditConfig::load().await?.editor;
            let mut editor = SubtitleEditor::new(read_srt_file(&srt_file).await?, config);
            if editor.is_empty() {
                info!("{} has no subtitles to shift", srt_file.display());
            } else {
                editor.shift(from, offset_ms)?;
            }
            write_output(&to_srt(editor.entries()), output_file.as_deref()).await
        }
        Commands::Config { command } => handle_config_command(command).await,
    }
}

/// Handle configuration subcommands
async fn handle_config_command(command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let mut config = SubEditConfig::load().await?;
            config.gemini.api_key = config.gemini.api_key.as_deref().map(mask_key);
            println!("{}", serde_json::to_string_pretty(&config)?);
            if config.gemini.api_key.is_none() {
                println!(
                    "{} No API key configured. Set {} to use transcription and translation.",
                    "Notice:".yellow().bold(),
                    API_KEY_ENV.cyan()
                );
            }
        }
        ConfigCommands::Path => {
            println!("{}", SubEditConfig::config_path()?.display());
        }
        ConfigCommands::Init { force } => {
            let path = SubEditConfig::config_path()?;
            if path.exists() && !force {
                println!(
                    "{} Configuration already exists at {} (use --force to overwrite).",
                    "Info:".blue().bold(),
                    path.display()
                );
                return Ok(());
            }
            let path = SubEditConfig::default().save().await?;
            println!(
                "{} Configuration written to {}",
                "Success:".green().bold(),
                path.display()
            );
        }
    }
    Ok(())
}

/// Read session commands from stdin until `quit` or end of input
async fn run_session(mut session: Session) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        if interactive {
            write!(stdout, "{} ", ">".cyan().bold())?;
            stdout.flush()?;
        }

        let Some(line) = lines.next() else {
            session.warn_if_dirty();
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                error!("{:#}", e);
                continue;
            }
        };
        match session.execute(command, &mut stdout).await {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Continue) => {}
            Err(e) => error!("{:#}", e),
        }
    }
    Ok(())
}

/// Load the configuration, letting `--model` override it
async fn load_config(model: Option<String>) -> anyhow::Result<SubEditConfig> {
    let mut config = SubEditConfig::load().await?;
    if let Some(model) = model {
        config.gemini = config.gemini.with_model(model);
    }
    debug!("Using model {}", config.gemini.model);
    Ok(config)
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    Ok(progress)
}

fn format_entries(entries: &[SubtitleEntry], format: &OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Srt => to_srt(entries),
        OutputFormat::Json => serde_json::to_string_pretty(entries)? + "\n",
        OutputFormat::Text => entries
            .iter()
            .map(|e| {
                format!(
                    "[{} -> {}] {}\n",
                    e.start_time,
                    e.end_time,
                    e.text.replace('\n', " ")
                )
            })
            .collect(),
    })
}

/// Write output to file or stdout
async fn write_output(content: &str, output_file: Option<&Path>) -> anyhow::Result<()> {
    match output_file {
        Some(path) => {
            tokio::fs::write(path, content).await?;
            println!(
                "{} Output written to: {}",
                "Success:".green().bold(),
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Hide all but the last four characters of an API key
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("", "")]
    #[case("short", "*****")]
    #[case("AIzaSyExampleKey1234", "****************1234")]
    fn test_mask_key(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(mask_key(key), expected);
    }

    #[test]
    fn test_format_entries() {
        let entries = vec![
            SubtitleEntry::new(
                1,
                Timestamp::from_millis(0),
                Timestamp::from_millis(1_500),
                "Hello\nthere",
            ),
            SubtitleEntry::new(
                2,
                Timestamp::from_millis(2_000),
                Timestamp::from_millis(3_000),
                "again",
            ),
        ];

        assert_eq!(
            format_entries(&entries, &OutputFormat::Text).unwrap(),
            "[00:00:00,000 -> 00:00:01,500] Hello there\n[00:00:02,000 -> 00:00:03,000] again\n"
        );
        assert_eq!(
            format_entries(&entries, &OutputFormat::Srt).unwrap(),
            to_srt(&entries)
        );

        let json: serde_json::Value =
            serde_json::from_str(&format_entries(&entries, &OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json[1]["startTime"], "00:00:02,000");
        assert_eq!(json[0]["text"], "Hello\nthere");
    }

    #[test]
    fn test_shift_accepts_negative_offset() {
        let cli = Cli::try_parse_from(["subedit", "shift", "in.srt", "-250", "--from", "2"]).unwrap();
        match cli.command {
            Commands::Shift {
                offset_ms, from, ..
            } => {
                assert_eq!(offset_ms, -250);
                assert_eq!(from, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_transcribe_range_arguments() {
        let cli = Cli::try_parse_from([
            "subedit",
            "transcribe",
            "talk.mp3",
            "--from",
            "00:01:00,000",
            "--to",
            "00:02:00",
        ])
        .unwrap();
        match cli.command {
            Commands::Transcribe { from, to, .. } => {
                assert_eq!(from, Some(Timestamp::from_millis(60_000)));
                assert_eq!(to, Some(Timestamp::from_millis(120_000)));
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["subedit", "transcribe", "talk.mp3", "--from", "00:01:00"]).is_err());
    }
}
