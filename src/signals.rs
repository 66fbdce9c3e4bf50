//! シグナルハンドラの登録と、ハンドラ内で使える非同期シグナル安全な出力。
//!
//! シェル本体のシグナル設定:
//!
//! | シグナル | 動作 |
//! |---------|------|
//! | `SIGINT` | 無視（フォアグラウンドの子は `SIG_DFL` に戻して起動する） |
//! | `SIGTSTP` | [`mode::handle_sigtstp`] でフォアグラウンド専用モードを切り替える |
//! | `SIGCHLD` | [`job::handle_sigchld`] で終了したバックグラウンドプロセスを reap する |
//!
//! ハンドラ内では `write(2)` / `waitpid(2)` などの非同期シグナル安全な呼び出しと、
//! ヒープ確保を伴わないスタック上のフォーマット（[`SigBuf`]）だけを使う。

use std::fmt;
use std::io;
use std::mem;
use std::ptr;

use crate::job;
use crate::mode;

// ── 登録 ─────────────────────────────────────────────────────────────

/// シェル起動時に 1 度だけ呼ぶ。
///
/// 両ハンドラの実行中は `SIGCHLD` と `SIGTSTP` をマスクし、出力が交錯しないようにする。
pub fn install() -> io::Result<()> {
    ignore(libc::SIGINT)?;
    set_handler(libc::SIGTSTP, mode::handle_sigtstp, libc::SA_RESTART)?;
    set_handler(
        libc::SIGCHLD,
        job::handle_sigchld,
        libc::SA_RESTART | libc::SA_NOCLDSTOP,
    )?;
    tracing::debug!("signal handlers installed");
    Ok(())
}

fn ignore(sig: libc::c_int) -> io::Result<()> {
    unsafe {
        let mut sa: libc::sigaction = mem::zeroed();
        sa.sa_sigaction = libc::SIG_IGN;
        libc::sigemptyset(&mut sa.sa_mask);
        check(libc::sigaction(sig, &sa, ptr::null_mut()))
    }
}

fn set_handler(
    sig: libc::c_int,
    handler: extern "C" fn(libc::c_int),
    flags: libc::c_int,
) -> io::Result<()> {
    unsafe {
        let mut sa: libc::sigaction = mem::zeroed();
        sa.sa_sigaction = handler as libc::sighandler_t;
        sa.sa_flags = flags;
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaddset(&mut sa.sa_mask, libc::SIGCHLD);
        libc::sigaddset(&mut sa.sa_mask, libc::SIGTSTP);
        check(libc::sigaction(sig, &sa, ptr::null_mut()))
    }
}

fn check(ret: libc::c_int) -> io::Result<()> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

// ── SIGCHLD マスク ───────────────────────────────────────────────────

/// 生存中 `SIGCHLD` をブロックする RAII ガード。Drop で元のマスクに戻す。
///
/// フォアグラウンド子プロセスの fork から `waitpid` 完了までを囲み、
/// reaper（`waitpid(-1)`）がフォアグラウンドの子を横取りしないようにする。
/// バックグラウンド起動では PID 表示が完了通知より先に出ることを保証する。
pub struct ChildSignalBlock {
    old: libc::sigset_t,
}

impl ChildSignalBlock {
    pub fn new() -> Self {
        unsafe {
            let mut set: libc::sigset_t = mem::zeroed();
            let mut old: libc::sigset_t = mem::zeroed();
            libc::sigemptyset(&mut set);
            libc::sigaddset(&mut set, libc::SIGCHLD);
            libc::sigprocmask(libc::SIG_BLOCK, &set, &mut old);
            Self { old }
        }
    }
}

impl Default for ChildSignalBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ChildSignalBlock {
    fn drop(&mut self) {
        unsafe {
            libc::sigprocmask(libc::SIG_SETMASK, &self.old, ptr::null_mut());
        }
    }
}

/// 子プロセス側で `SIGCHLD` のブロックを解除する。fork 直後の子から呼ぶ。
///
/// シグナルマスクは exec 後も引き継がれるため、解除しないと子のプログラムが
/// 自分の子の終了を受け取れない。
pub(crate) fn unblock_child_signal() {
    unsafe {
        let mut set: libc::sigset_t = mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGCHLD);
        libc::sigprocmask(libc::SIG_UNBLOCK, &set, ptr::null_mut());
    }
}

// ── 非同期シグナル安全な出力 ─────────────────────────────────────────

/// ハンドラ中で errno を保存し、Drop で復元する。
///
/// ハンドラ内の `write` / `waitpid` が errno を書き換えると、
/// 割り込まれたメインフロー側の errno 判定が壊れる。
pub(crate) struct ErrnoGuard(libc::c_int);

impl ErrnoGuard {
    pub(crate) fn save() -> Self {
        Self(unsafe { *errno_location() })
    }
}

impl Drop for ErrnoGuard {
    fn drop(&mut self) {
        unsafe { *errno_location() = self.0 }
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "emscripten"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__errno_location()
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__error()
}

/// 現在の errno を読む。fork 後の子でも安全に使える。
pub(crate) fn errno() -> libc::c_int {
    unsafe { *errno_location() }
}

/// スタック上の固定長バッファ。[`fmt::Write`] を実装し、ヒープ確保なしでフォーマットできる。
///
/// 容量を超えた分は切り捨て、`write_str` は `fmt::Error` を返す。
pub struct SigBuf<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> SigBuf<N> {
    pub const fn new() -> Self {
        Self { buf: [0; N], len: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl<const N: usize> Default for SigBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Write for SigBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let room = N - self.len;
        let n = bytes.len().min(room);
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        if n < bytes.len() {
            Err(fmt::Error)
        } else {
            Ok(())
        }
    }
}

/// `write(2)` で全バイトを書き出す。`EINTR` と部分書き込みを再試行する。
pub(crate) fn write_all_raw(fd: libc::c_int, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        let n = unsafe { libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len()) };
        if n < 0 {
            if errno() == libc::EINTR {
                continue;
            }
            return;
        }
        bytes = &bytes[n as usize..];
    }
}
