//! `fork()` + `execvp()` による子プロセス起動。
//!
//! 子プロセス側でシグナル設定・リダイレクト・exec を行う。
//! fork 後の子では非同期シグナル安全な呼び出しだけを使い、ヒープ確保が必要なもの
//! （argv、パス、エラーメッセージ）はすべて fork 前に親で用意しておく。
//!
//! ## 構成
//!
//! | 型 | 役割 |
//! |-----|------|
//! | [`Placement`] | フォアグラウンド / バックグラウンドの別（子のシグナル設定と既定の入出力先を決める） |
//! | [`CStringVec`] | argv 用の NULL 終端ポインタ配列 |
//! | [`Redirect`] | 子で開いて stdin/stdout に `dup2` するファイル |
//! | [`spawn`] | 上記を組み合わせて fork + exec する公開関数 |

use std::ffi::CString;
use std::io;

use thiserror::Error;

use crate::command::Command;
use crate::signals;

/// バックグラウンドジョブでリダイレクト指定がない stdin/stdout の接続先。
const NULL_DEVICE: &str = "/dev/null";

/// 出力リダイレクト先を新規作成する際のパーミッション。
const OUTPUT_MODE: libc::c_uint = 0o644;

// ── エラー型 ──────────────────────────────────────────────────────

/// 子プロセス起動の失敗。
#[derive(Debug, Error)]
pub enum SpawnError {
    /// `fork()` 自体が失敗した。シェルを継続できない。
    #[error("fork failed: {0}")]
    Fork(#[source] io::Error),
    /// 引数またはリダイレクト先に NUL バイトが含まれ、exec に渡せない。
    #[error("{program}: argument contains a NUL byte: {arg:?}")]
    InvalidArgument { program: String, arg: String },
}

impl SpawnError {
    /// シェル自体を終了させるべきエラーか。
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fork(_))
    }
}

/// 子プロセスの実行形態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `SIGINT` は既定動作（Ctrl+C で終了）。stdin/stdout は端末を継承する。
    Foreground,
    /// `SIGINT` を無視する。リダイレクト指定のない stdin/stdout は `/dev/null` に繋ぐ。
    Background,
}

// ── CStringVec ────────────────────────────────────────────────────

/// argv 用の CString ベクタ。NULL 終端のポインタ配列を構築する。
struct CStringVec {
    _strings: Vec<CString>,
    ptrs: Vec<*const libc::c_char>,
}

impl CStringVec {
    fn new(strings: Vec<CString>) -> Self {
        let mut ptrs: Vec<*const libc::c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        ptrs.push(std::ptr::null()); // NULL 終端
        Self {
            _strings: strings,
            ptrs,
        }
    }

    fn program(&self) -> *const libc::c_char {
        self.ptrs[0]
    }

    fn as_ptr(&self) -> *const *const libc::c_char {
        self.ptrs.as_ptr()
    }
}

// ── Redirect ──────────────────────────────────────────────────────

/// 子プロセスで開いて `target_fd` に `dup2` するファイル。
struct Redirect {
    path: CString,
    target_fd: libc::c_int,
    flags: libc::c_int,
    /// open 失敗時に理由の前に出力するメッセージ。
    message: Vec<u8>,
}

impl Redirect {
    fn input(path: &str, program: &str) -> Result<Self, SpawnError> {
        Ok(Self {
            path: to_cstring(path, program)?,
            target_fd: libc::STDIN_FILENO,
            flags: libc::O_RDONLY,
            message: format!("smallsh: cannot open {path} for input: ").into_bytes(),
        })
    }

    fn output(path: &str, program: &str) -> Result<Self, SpawnError> {
        Ok(Self {
            path: to_cstring(path, program)?,
            target_fd: libc::STDOUT_FILENO,
            flags: libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
            message: format!("smallsh: cannot open {path} for output: ").into_bytes(),
        })
    }

    /// 子プロセス内で実行する。失敗したらメッセージを出して `_exit(1)`。
    unsafe fn apply(&self) {
        let fd = libc::open(self.path.as_ptr(), self.flags, OUTPUT_MODE);
        if fd < 0 {
            child_fail(&self.message, open_reason(signals::errno()));
        }
        // 対象 fd が閉じていた場合は open がそのまま同じ番号を返す
        if fd != self.target_fd {
            if libc::dup2(fd, self.target_fd) < 0 {
                child_fail(&self.message, "dup2 failed");
            }
            libc::close(fd);
        }
    }
}

fn to_cstring(s: &str, program: &str) -> Result<CString, SpawnError> {
    CString::new(s).map_err(|_| SpawnError::InvalidArgument {
        program: program.to_string(),
        arg: s.to_string(),
    })
}

fn open_reason(errno: libc::c_int) -> &'static str {
    match errno {
        libc::ENOENT => "no such file or directory",
        libc::EACCES => "permission denied",
        libc::EISDIR => "is a directory",
        libc::ENOTDIR => "not a directory",
        _ => "open failed",
    }
}

fn exec_reason(errno: libc::c_int) -> &'static str {
    match errno {
        libc::ENOENT => "command not found",
        libc::EACCES => "permission denied",
        _ => "exec failed",
    }
}

/// 子プロセス内でエラーを stderr に出して終了する。
unsafe fn child_fail(message: &[u8], reason: &str) -> ! {
    signals::write_all_raw(libc::STDERR_FILENO, message);
    signals::write_all_raw(libc::STDERR_FILENO, reason.as_bytes());
    signals::write_all_raw(libc::STDERR_FILENO, b"\n");
    libc::_exit(1)
}

// ── spawn 関数 ────────────────────────────────────────────────────

/// fork 前に組み立てる子プロセスの実行計画。
struct ChildPlan {
    argv: CStringVec,
    redirects: Vec<Redirect>,
    placement: Placement,
    exec_message: Vec<u8>,
}

impl ChildPlan {
    fn new(cmd: &Command, placement: Placement) -> Result<Self, SpawnError> {
        let program = cmd.program();
        let argv = cmd
            .to_cstrings()
            .map_err(|arg| SpawnError::InvalidArgument {
                program: program.to_string(),
                arg,
            })?;

        let background = placement == Placement::Background;
        let input = match cmd.input.as_deref() {
            Some(path) => Some(path),
            None if background => Some(NULL_DEVICE),
            None => None,
        };
        let output = match cmd.output.as_deref() {
            Some(path) => Some(path),
            None if background => Some(NULL_DEVICE),
            None => None,
        };

        let mut redirects = Vec::with_capacity(2);
        if let Some(path) = input {
            redirects.push(Redirect::input(path, program)?);
        }
        if let Some(path) = output {
            redirects.push(Redirect::output(path, program)?);
        }

        Ok(Self {
            argv: CStringVec::new(argv),
            redirects,
            placement,
            exec_message: format!("smallsh: {program}: ").into_bytes(),
        })
    }

    /// fork 後の子プロセスで実行する。戻らない。
    unsafe fn exec(&self) -> ! {
        // シェル本体のハンドラは子に不要。exec 前に届いても何もしないよう既定に戻す
        libc::signal(libc::SIGCHLD, libc::SIG_DFL);
        // Rust ランタイムが無視に設定した SIGPIPE を子に引き継がない
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        // Ctrl+Z は子を停止させず、シェルのモード切り替えだけに使う
        libc::signal(libc::SIGTSTP, libc::SIG_IGN);
        match self.placement {
            Placement::Foreground => libc::signal(libc::SIGINT, libc::SIG_DFL),
            Placement::Background => libc::signal(libc::SIGINT, libc::SIG_IGN),
        };
        signals::unblock_child_signal();

        for redirect in &self.redirects {
            redirect.apply();
        }

        libc::execvp(self.argv.program(), self.argv.as_ptr());
        child_fail(&self.exec_message, exec_reason(signals::errno()))
    }
}

/// `cmd` を子プロセスとして起動し、子の PID を返す。待機はしない。
///
/// リダイレクト先を開けない場合や exec に失敗した場合、子は stderr に理由を出して
/// 終了コード 1 で終わる。親には `Ok(pid)` が返り、失敗は `waitpid` の結果として観測される。
pub fn spawn(cmd: &Command, placement: Placement) -> Result<libc::pid_t, SpawnError> {
    let plan = ChildPlan::new(cmd, placement)?;

    match unsafe { libc::fork() } {
        -1 => Err(SpawnError::Fork(io::Error::last_os_error())),
        0 => unsafe { plan.exec() },
        pid => {
            tracing::debug!(pid, program = cmd.program(), ?placement, "spawned");
            Ok(pid)
        }
    }
}
