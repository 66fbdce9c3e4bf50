//! 外部コマンドの実行: フォアグラウンド（完了まで待機）とバックグラウンド（即座に復帰）。
//!
//! - [`execute`]: `Command::background` に従って振り分ける
//! - foreground: `SIGCHLD` をブロックした区間で fork し、その子だけを `waitpid` で待つ
//! - background: `SIGCHLD` をブロックしたまま PID を表示し、以降の回収は
//!   [`job::handle_sigchld`](crate::job::handle_sigchld) に任せる
//!
//! ビルトインの判定はここでは行わない。呼び出し側（[`Shell`](crate::shell::Shell)）が
//! [`CommandKind`](crate::command::CommandKind) で振り分けた外部コマンドだけが渡される。

use std::io::{self, Write};

use libc::pid_t;
use thiserror::Error;

use crate::command::Command;
use crate::signals::ChildSignalBlock;
use crate::spawn::{self, Placement, SpawnError};
use crate::status::Status;

/// 外部コマンド実行の失敗。
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error("waitpid({pid}) failed: {source}")]
    Wait { pid: pid_t, source: io::Error },
    #[error("cannot write to output: {0}")]
    Output(#[from] io::Error),
}

impl ExecError {
    /// シェル自体を終了させるべきエラーか。`fork` 失敗のみ。
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Spawn(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// 実行結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// フォアグラウンドで完了した。直前ステータスを更新する。
    Foreground(Status),
    /// バックグラウンドで起動した。直前ステータスは更新しない。
    Background(pid_t),
}

/// 外部コマンドを実行する。
///
/// `out` はバックグラウンド起動時の PID 表示先。fork 前に flush し、
/// バッファ済みの出力が子プロセスの出力より後ろに回らないようにする。
pub fn execute(cmd: &Command, out: &mut dyn Write) -> Result<Outcome, ExecError> {
    out.flush()?;
    if cmd.background {
        run_background(cmd, out).map(Outcome::Background)
    } else {
        run_foreground(cmd).map(Outcome::Foreground)
    }
}

/// 子プロセスを起動し、完了までブロックする。
fn run_foreground(cmd: &Command) -> Result<Status, ExecError> {
    let _block = ChildSignalBlock::new();
    let pid = spawn::spawn(cmd, Placement::Foreground)?;
    let status = wait_for(pid)?;
    tracing::debug!(pid, %status, "foreground child finished");
    Ok(status)
}

/// 子プロセスを起動し、PID を表示して即座に返る。
fn run_background(cmd: &Command, out: &mut dyn Write) -> Result<pid_t, ExecError> {
    // PID 表示が完了通知より先に出るよう、表示し終えるまで reaper を止める
    let _block = ChildSignalBlock::new();
    let pid = spawn::spawn(cmd, Placement::Background)?;
    writeln!(out, "background pid is {pid}")?;
    out.flush()?;
    Ok(pid)
}

/// 特定の子プロセスの終了を待つ。`EINTR` は再試行する。
fn wait_for(pid: pid_t) -> Result<Status, ExecError> {
    loop {
        let mut raw_status: libc::c_int = 0;
        let ret = unsafe { libc::waitpid(pid, &mut raw_status, 0) };
        if ret == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(ExecError::Wait { pid, source: err });
        }
        if let Some(status) = Status::from_raw(raw_status) {
            return Ok(status);
        }
    }
}
