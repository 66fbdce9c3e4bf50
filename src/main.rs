//! smallsh: 最小限のジョブ制御を持つ対話シェル
//!
//! REPL ループ: プロンプト表示 → 1 行読み取り → パース → 実行 → ループ
//!
//! バックグラウンドジョブの完了通知とフォアグラウンド専用モードの切り替えは
//! シグナルハンドラ側で行うため、ループ内で reap はしない。

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use smallsh::config::{self, Cli, Config};
use smallsh::input::{self, ReadOutcome, MAX_LINE_LENGTH};
use smallsh::mode;
use smallsh::shell::Shell;
use smallsh::signals;

fn run(config: Config) -> anyhow::Result<()> {
    config::init_logging(&config.log_filter)?;

    // ハンドラがプロンプトを再表示するため、登録前に設定する
    mode::set_prompt(&config.prompt);
    signals::install().context("failed to install signal handlers")?;

    let mut shell = Shell::new();
    tracing::debug!(pid = shell.pid, "smallsh started");

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut stdout = io::stdout();

    if config.banner {
        writeln!(stdout, "$ smallsh")?;
    }

    loop {
        match input::read_line(&mut reader, &mut stdout, &config.prompt)? {
            ReadOutcome::Line(line) => shell.run_line(&line, &mut stdout)?,
            ReadOutcome::TooLong(len) => {
                tracing::warn!(len, "discarding over-long line");
                eprintln!("smallsh: line too long (max {MAX_LINE_LENGTH} bytes)");
            }
            ReadOutcome::Eof => {
                // EOF (Ctrl+D): 改行を出力して正常終了
                writeln!(stdout)?;
                break;
            }
        }

        if shell.should_exit {
            break;
        }
    }

    tracing::debug!("smallsh exiting");
    Ok(())
}

fn main() -> ExitCode {
    let config = Config::from(Cli::parse());
    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("smallsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}
