//! Integration tests for subedit

use assert_cmd::Command;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SAMPLE: &str = "\
1
00:00:01,000 --> 00:00:02,000
Hello there

2
00:00:02,000 --> 00:00:04,000
General Kenobi

3
00:00:05,000 --> 00:00:06,500
You are a bold one
";

/// A command isolated from the user's configuration and API key
fn subedit(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("subedit").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("GEMINI_API_KEY")
        .env_remove("SUBEDIT_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

fn sample_file(temp_dir: &TempDir) -> PathBuf {
    let path = temp_dir.path().join("sample.srt");
    fs::write(&path, SAMPLE).unwrap();
    path
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8(output.stdout).unwrap()
}

/// Test CLI argument parsing
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("subedit").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

/// Test CLI version
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("subedit").unwrap();
    cmd.arg("--version");
    cmd.assert().success();
}

/// Test invalid arguments
#[rstest]
#[case(&["--invalid-flag"])]
#[case(&[])]
#[case(&["translate", "in.srt"])]
#[case(&["shift", "in.srt", "soon"])]
#[case(&["transcribe", "talk.mp3", "--from", "00:00:10"])]
fn test_invalid_arguments(#[case] args: &[&str]) {
    let mut cmd = Command::cargo_bin("subedit").unwrap();
    cmd.args(args);
    cmd.assert().failure();
}

#[test]
fn test_check_clean_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = sample_file(&temp_dir);

    let stdout = stdout_of(subedit(temp_dir.path()).arg("check").arg(&path));
    assert!(stdout.contains("3 subtitles, no issues found."));
}

#[test]
fn test_check_reports_issues() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.srt");
    fs::write(
        &path,
        "1\n00:00:01,000 --> 00:00:03,000\nOne\n\n7\n00:00:02,000 --> 00:00:04,000\nTwo\n",
    )
    .unwrap();

    let output = subedit(temp_dir.path())
        .arg("check")
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("entry 2: numbered 7"));
    assert!(stdout.contains("entry 2: starts before the previous entry ends at 00:00:03,000"));
}

#[test]
fn test_missing_srt_file() {
    let temp_dir = TempDir::new().unwrap();
    subedit(temp_dir.path())
        .arg("check")
        .arg(temp_dir.path().join("nope.srt"))
        .assert()
        .failure();
}

#[test]
fn test_shift_to_stdout() {
    let temp_dir = TempDir::new().unwrap();
    let path = sample_file(&temp_dir);

    let stdout = stdout_of(
        subedit(temp_dir.path())
            .arg("shift")
            .arg(&path)
            .arg("-500")
            .arg("--from")
            .arg("2"),
    );
    assert!(stdout.starts_with("1\n00:00:01,000 --> 00:00:01,500\nHello there\n\n"));
    assert!(stdout.contains("2\n00:00:01,500 --> 00:00:03,500\nGeneral Kenobi"));
    assert!(stdout.contains("3\n00:00:04,500 --> 00:00:06,000\nYou are a bold one"));
}

#[test]
fn test_shift_empty_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.srt");
    fs::write(&path, "").unwrap();
    let output_file = temp_dir.path().join("shifted.srt");

    subedit(temp_dir.path())
        .arg("shift")
        .arg(&path)
        .arg("1000")
        .arg("-f")
        .arg(&output_file)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&output_file).unwrap(), "");
}

#[test]
fn test_shift_before_zero_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = sample_file(&temp_dir);
    let output_file = temp_dir.path().join("shifted.srt");

    subedit(temp_dir.path())
        .arg("shift")
        .arg(&path)
        .arg("-2000")
        .arg("-f")
        .arg(&output_file)
        .assert()
        .failure();
    assert!(!output_file.exists());
}

/// Run a scripted edit session and check the saved file
#[test]
fn test_edit_session_saves() {
    let temp_dir = TempDir::new().unwrap();
    let path = sample_file(&temp_dir);
    let output_file = temp_dir.path().join("edited.srt");

    let script = "\
# join the first two lines and split them again at \"General\"
merge 1
text 2 You are a bold one.
split 1 12
undo
redo
save
list
quit
";
    let stdout = stdout_of(
        subedit(temp_dir.path())
            .arg("edit")
            .arg(&path)
            .arg("-f")
            .arg(&output_file)
            .write_stdin(script),
    );
    assert!(stdout.contains("You are a bold one."));

    let saved = fs::read_to_string(&output_file).unwrap();
    assert_eq!(
        saved,
        "1\n00:00:01,000 --> 00:00:02,384\nHello there\n\n\
         2\n00:00:02,384 --> 00:00:04,000\nGeneral Kenobi\n\n\
         3\n00:00:05,000 --> 00:00:06,500\nYou are a bold one.\n\n"
    );
    // the input is left alone
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
}

/// Bad commands are reported and the session carries on
#[test]
fn test_edit_session_survives_errors() {
    let temp_dir = TempDir::new().unwrap();
    let path = sample_file(&temp_dir);

    let script = "frobnicate\nmerge 3\ndelete 9\ndelete 3\nsave\n";
    subedit(temp_dir.path())
        .arg("edit")
        .arg(&path)
        .write_stdin(script)
        .assert()
        .success();

    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.contains("General Kenobi"));
    assert!(!saved.contains("bold one"));
}

/// Leaving without `save` keeps the file unchanged
#[test]
fn test_edit_session_without_save() {
    let temp_dir = TempDir::new().unwrap();
    let path = sample_file(&temp_dir);

    let output = subedit(temp_dir.path())
        .arg("edit")
        .arg(&path)
        .write_stdin("delete 1\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("unsaved changes"));
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
}

/// Edits that leave the text as it was do not count as unsaved changes
#[test]
fn test_edit_session_unchanged_text() {
    let temp_dir = TempDir::new().unwrap();
    let path = sample_file(&temp_dir);

    let output = subedit(temp_dir.path())
        .arg("edit")
        .arg(&path)
        .write_stdin("text 1 Hello there\nquit\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(!String::from_utf8(output.stderr)
        .unwrap()
        .contains("unsaved changes"));
}

#[test]
fn test_transcribe_missing_audio_file() {
    let temp_dir = TempDir::new().unwrap();
    subedit(temp_dir.path())
        .arg("transcribe")
        .arg(temp_dir.path().join("nonexistent_file.wav"))
        .assert()
        .failure();
}

/// Without GEMINI_API_KEY the service is never contacted
#[rstest]
#[case("srt")]
#[case("json")]
#[case("text")]
fn test_transcribe_without_api_key(#[case] format: &str) {
    let temp_dir = TempDir::new().unwrap();
    let audio_file = temp_dir.path().join("test.wav");
    fs::write(&audio_file, b"dummy audio data").unwrap();

    let output = subedit(temp_dir.path())
        .arg("transcribe")
        .arg(&audio_file)
        .arg("--output")
        .arg(format)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("GEMINI_API_KEY"));
}

#[test]
fn test_translate_without_api_key() {
    let temp_dir = TempDir::new().unwrap();
    let path = sample_file(&temp_dir);

    subedit(temp_dir.path())
        .arg("translate")
        .arg(&path)
        .arg("--language")
        .arg("German")
        .assert()
        .failure();
}

#[test]
fn test_config_init_and_show() {
    let temp_dir = TempDir::new().unwrap();

    let path = stdout_of(subedit(temp_dir.path()).arg("config").arg("path"));
    let path = PathBuf::from(path.trim());
    assert!(path.starts_with(temp_dir.path()));
    assert!(!path.exists());

    subedit(temp_dir.path())
        .arg("config")
        .arg("init")
        .assert()
        .success();
    assert!(path.exists());

    let shown = stdout_of(
        subedit(temp_dir.path())
            .env("GEMINI_API_KEY", "AIzaSyExampleKey1234")
            .arg("config")
            .arg("show"),
    );
    assert!(shown.contains("\"model\": \"gemini-2.5-flash\""));
    assert!(shown.contains("1234"));
    assert!(!shown.contains("AIzaSyExampleKey1234"));
}
