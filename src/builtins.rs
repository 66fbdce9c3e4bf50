//! ビルトインコマンドの実装。
//!
//! ビルトインは fork/exec を経由せずプロセス内で直接実行される。
//! 種別はパース時に [`Builtin`] として確定しているため、ここでは名前の比較をしない。
//! リダイレクトと `&` はビルトインには適用されず、直前ステータスも更新しない。

use std::env;
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use crate::command::Builtin;
use crate::shell::Shell;

/// ビルトインの失敗。いずれもシェルは継続する。
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("cd: HOME not set")]
    HomeNotSet,
    #[error("cd: {path}: {source}")]
    Cd { path: String, source: io::Error },
    #[error("{builtin}: cannot write output: {source}")]
    Output {
        builtin: &'static str,
        source: io::Error,
    },
}

/// ビルトインを実行する。`args[0]` はコマンド名。
pub fn exec(
    shell: &mut Shell,
    builtin: Builtin,
    args: &[String],
    out: &mut dyn Write,
) -> Result<(), BuiltinError> {
    match builtin {
        Builtin::Exit => {
            builtin_exit(shell);
            Ok(())
        }
        Builtin::Cd => builtin_cd(args),
        Builtin::Status => builtin_status(shell, out).map_err(|source| BuiltinError::Output {
            builtin: builtin.name(),
            source,
        }),
    }
}

/// `exit`: REPL ループに終了を要求する。バックグラウンドの子は kill しない。
fn builtin_exit(shell: &mut Shell) {
    shell.should_exit = true;
}

/// `cd [dir]`: カレントディレクトリを変更する。引数省略時は `$HOME` に移動。
/// 2 つ目以降の引数は無視する。
fn builtin_cd(args: &[String]) -> Result<(), BuiltinError> {
    let target = match args.get(1) {
        Some(dir) => dir.clone(),
        None => env::var("HOME").map_err(|_| BuiltinError::HomeNotSet)?,
    };

    env::set_current_dir(Path::new(&target)).map_err(|source| BuiltinError::Cd {
        path: target.clone(),
        source,
    })?;
    tracing::debug!(dir = %target, "changed directory");
    Ok(())
}

/// `status`: 直前のフォアグラウンドコマンドの終了状態を表示する。
fn builtin_status(shell: &Shell, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", shell.last_status)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// カレントディレクトリと HOME をテスト後に戻すガード。
    struct CwdGuard {
        cwd: std::path::PathBuf,
        home: Option<String>,
    }

    impl CwdGuard {
        fn new() -> Self {
            Self {
                cwd: env::current_dir().unwrap(),
                home: env::var("HOME").ok(),
            }
        }
    }

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = env::set_current_dir(&self.cwd);
            match &self.home {
                Some(h) => env::set_var("HOME", h),
                None => env::remove_var("HOME"),
            }
        }
    }

    #[test]
    fn status_reports_exit_value() {
        let mut shell = Shell::new();
        shell.last_status = Status::Exited(2);
        let mut buf = Vec::new();
        exec(&mut shell, Builtin::Status, &args(&["status"]), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "exit value 2\n");
        assert_eq!(shell.last_status, Status::Exited(2));
    }

    #[test]
    fn status_reports_signal() {
        let mut shell = Shell::new();
        shell.last_status = Status::Signaled(9);
        let mut buf = Vec::new();
        exec(&mut shell, Builtin::Status, &args(&["status"]), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "terminated by signal 9\n");
    }

    #[test]
    fn status_initially_zero() {
        let mut shell = Shell::new();
        let mut buf = Vec::new();
        exec(&mut shell, Builtin::Status, &args(&["status"]), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "exit value 0\n");
    }

    #[test]
    fn exit_sets_flag_only() {
        let mut shell = Shell::new();
        shell.last_status = Status::Exited(3);
        let mut buf = Vec::new();
        exec(&mut shell, Builtin::Exit, &args(&["exit", "5"]), &mut buf).unwrap();
        assert!(shell.should_exit);
        assert_eq!(shell.last_status, Status::Exited(3));
        assert!(buf.is_empty());
    }

    #[test]
    #[serial]
    fn cd_to_argument() {
        let _guard = CwdGuard::new();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();
        builtin_cd(&args(&["cd", target.to_str().unwrap()])).unwrap();
        assert_eq!(env::current_dir().unwrap(), target);
    }

    #[test]
    #[serial]
    fn cd_without_argument_goes_home() {
        let _guard = CwdGuard::new();
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().canonicalize().unwrap();
        env::set_var("HOME", &home);
        builtin_cd(&args(&["cd"])).unwrap();
        assert_eq!(env::current_dir().unwrap(), home);
    }

    #[test]
    #[serial]
    fn cd_home_not_set() {
        let _guard = CwdGuard::new();
        env::remove_var("HOME");
        let err = builtin_cd(&args(&["cd"])).unwrap_err();
        assert_eq!(err.to_string(), "cd: HOME not set");
    }

    #[test]
    #[serial]
    fn cd_nonexistent_keeps_cwd() {
        let _guard = CwdGuard::new();
        let before = env::current_dir().unwrap();
        let err = builtin_cd(&args(&["cd", "/smallsh/no/such/dir"])).unwrap_err();
        assert!(matches!(err, BuiltinError::Cd { .. }));
        assert!(err.to_string().starts_with("cd: /smallsh/no/such/dir: "));
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    #[serial]
    fn cd_ignores_extra_arguments() {
        let _guard = CwdGuard::new();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();
        builtin_cd(&args(&["cd", target.to_str().unwrap(), "ignored"])).unwrap();
        assert_eq!(env::current_dir().unwrap(), target);
    }
}
