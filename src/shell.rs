//! シェルの実行状態と 1 行分のディスパッチ。
//!
//! 入力行 → [`parser::parse`] → [`Command`] →（ビルトイン | [`executor::execute`]）→ 直前ステータス。
//! フォアグラウンド専用モードはディスパッチ直前に 1 回だけ読む。

use std::io::Write;

use crate::builtins;
use crate::command::{Command, CommandKind};
use crate::executor::{self, ExecError, Outcome};
use crate::mode::ForegroundMode;
use crate::parser;
use crate::status::Status;

/// シェルの実行状態。REPL ループ全体で共有される。
pub struct Shell {
    /// 直前のフォアグラウンド外部コマンドの終了状態。`status` ビルトインが表示する。
    pub last_status: Status,
    /// `exit` ビルトインで true にセットされ、REPL ループを終了させる。
    pub should_exit: bool,
    /// シェル自身の PID。`$$` 展開に使う。
    pub pid: u32,
    /// フォアグラウンド専用モード。
    pub mode: ForegroundMode,
}

impl Shell {
    pub fn new() -> Self {
        Self {
            last_status: Status::default(),
            should_exit: false,
            pid: std::process::id(),
            mode: ForegroundMode,
        }
    }

    /// 1 行をパースして実行する。
    ///
    /// 構文エラーや個々のコマンドの失敗は stderr に報告して `Ok(())` を返す。
    /// `Err` はシェルを継続できない失敗（`fork` 失敗）のみ。
    pub fn run_line(&mut self, line: &str, out: &mut dyn Write) -> Result<(), ExecError> {
        let mut cmd = match parser::parse(line, self.pid) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Ok(()),
            Err(e) => {
                eprintln!("smallsh: {}", e);
                return Ok(());
            }
        };
        tracing::debug!(?cmd, "parsed");

        if self.mode.is_active() && cmd.background {
            tracing::debug!("foreground-only mode: ignoring &");
            cmd.force_foreground();
        }
        self.dispatch(&cmd, out)
    }

    /// パース済みコマンドを実行する。
    pub fn dispatch(&mut self, cmd: &Command, out: &mut dyn Write) -> Result<(), ExecError> {
        match cmd.kind() {
            CommandKind::Builtin(builtin) => {
                if let Err(e) = builtins::exec(self, builtin, cmd.args(), out) {
                    eprintln!("smallsh: {}", e);
                }
                Ok(())
            }
            CommandKind::External => match executor::execute(cmd, out) {
                Ok(Outcome::Foreground(status)) => {
                    self.last_status = status;
                    Ok(())
                }
                Ok(Outcome::Background(_)) => Ok(()),
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => {
                    eprintln!("smallsh: {}", e);
                    Ok(())
                }
            },
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::fs;

    fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path.display().to_string()
    }

    fn status_line(shell: &mut Shell) -> String {
        let mut out = Vec::new();
        shell.run_line("status", &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    #[serial]
    fn status_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let exit2 = script(&dir, "exit2.sh", "exit 2\n");
        let kill9 = script(&dir, "kill9.sh", "kill -9 $$\n");
        let mut shell = Shell::new();
        let mut out = Vec::new();

        shell.run_line(&format!("sh {exit2}"), &mut out).unwrap();
        assert_eq!(status_line(&mut shell), "exit value 2\n");

        shell.run_line(&format!("sh {kill9}"), &mut out).unwrap();
        assert_eq!(status_line(&mut shell), "terminated by signal 9\n");
    }

    #[test]
    #[serial]
    fn comment_and_blank_lines_are_no_ops() {
        let mut shell = Shell::new();
        shell.last_status = Status::Exited(4);
        let mut out = Vec::new();
        for line in ["", "   ", "# false", "#"] {
            shell.run_line(line, &mut out).unwrap();
        }
        assert!(out.is_empty());
        assert_eq!(shell.last_status, Status::Exited(4));
        assert!(!shell.should_exit);
    }

    #[test]
    #[serial]
    fn syntax_error_keeps_status() {
        let mut shell = Shell::new();
        shell.last_status = Status::Exited(4);
        let mut out = Vec::new();
        shell.run_line("cat <", &mut out).unwrap();
        assert_eq!(shell.last_status, Status::Exited(4));
    }

    #[test]
    #[serial]
    fn failed_cd_keeps_status() {
        let mut shell = Shell::new();
        shell.last_status = Status::Exited(3);
        let mut out = Vec::new();
        shell.run_line("cd /smallsh/no/such/dir", &mut out).unwrap();
        assert_eq!(shell.last_status, Status::Exited(3));
    }

    #[test]
    #[serial]
    fn background_does_not_touch_status() {
        let dir = tempfile::tempdir().unwrap();
        let exit2 = script(&dir, "exit2.sh", "exit 2\n");
        let mut shell = Shell::new();
        let mut out = Vec::new();
        shell.run_line(&format!("sh {exit2} &"), &mut out).unwrap();
        assert_eq!(shell.last_status, Status::Exited(0));

        let printed = String::from_utf8(out).unwrap();
        let pid: libc::pid_t = printed
            .trim()
            .strip_prefix("background pid is ")
            .unwrap()
            .parse()
            .unwrap();
        let mut raw = 0;
        unsafe { libc::waitpid(pid, &mut raw, 0) };
        assert_eq!(Status::from_raw(raw), Some(Status::Exited(2)));
    }

    #[test]
    #[serial]
    fn foreground_only_mode_overrides_background() {
        let dir = tempfile::tempdir().unwrap();
        let exit2 = script(&dir, "exit2.sh", "exit 2\n");
        let mut shell = Shell::new();
        let mut out = Vec::new();

        if !shell.mode.is_active() {
            shell.mode.toggle();
        }
        let result = shell.run_line(&format!("sh {exit2} &"), &mut out);
        shell.mode.toggle();

        result.unwrap();
        assert!(out.is_empty(), "no background pid line expected");
        assert_eq!(shell.last_status, Status::Exited(2));
    }

    #[test]
    #[serial]
    fn exit_requests_termination() {
        let mut shell = Shell::new();
        let mut out = Vec::new();
        shell.run_line("exit", &mut out).unwrap();
        assert!(shell.should_exit);
    }

    #[test]
    #[serial]
    fn unknown_command_records_exit_one() {
        let mut shell = Shell::new();
        let mut out = Vec::new();
        shell.run_line("smallsh-no-such-program", &mut out).unwrap();
        assert_eq!(shell.last_status, Status::Exited(1));
    }
}
