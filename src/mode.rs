//! フォアグラウンド専用モード。
//!
//! `SIGTSTP`（Ctrl+Z）を受けるたびにモードを反転する。モード中は行末の `&` を無視し、
//! すべてのコマンドをフォアグラウンドで実行する。
//!
//! 状態は [`FOREGROUND_ONLY`] の 1 ワードのみで、書き込みはハンドラ内の `fetch_xor` 1 回、
//! 読み取りは REPL ループがディスパッチ直前に行う 1 回の load だけ。

use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::signals::{self, ErrnoGuard, SigBuf};

const ENTER_NOTICE: &str = "Entering foreground-only mode (& is now ignored)";
const EXIT_NOTICE: &str = "Exiting foreground-only mode";

/// プロンプトの最大バイト数。切り替え通知がスタック上のバッファに収まる上限。
pub const MAX_PROMPT_LENGTH: usize = 128;

const NOTICE_CAPACITY: usize = ENTER_NOTICE.len() + MAX_PROMPT_LENGTH + 2;

static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

/// ハンドラが通知の後に再表示するプロンプト。未設定なら `": "`。
static PROMPT: OnceLock<Box<str>> = OnceLock::new();

/// プロセス全体で共有されるフォアグラウンド専用モードへのハンドル。
#[derive(Debug, Clone, Copy, Default)]
pub struct ForegroundMode;

impl ForegroundMode {
    pub fn is_active(self) -> bool {
        FOREGROUND_ONLY.load(Ordering::SeqCst)
    }

    /// モードを反転し、反転後の状態を返す。
    pub fn toggle(self) -> bool {
        !FOREGROUND_ONLY.fetch_xor(true, Ordering::SeqCst)
    }
}

/// ハンドラが使うプロンプトを設定する。ハンドラ登録前に 1 度だけ呼ぶ。2 回目以降は無視される。
pub fn set_prompt(prompt: &str) {
    if PROMPT.set(prompt.into()).is_err() {
        tracing::warn!("prompt already set; keeping the first one");
    }
}

fn prompt() -> &'static str {
    PROMPT.get().map(|p| &**p).unwrap_or(": ")
}

/// 切り替え通知（改行 + 通知 + 改行 + プロンプト）を組み立てる。
///
/// `prompt` が [`MAX_PROMPT_LENGTH`] を超える分は切り詰められる。
fn toggle_notice(active: bool, prompt: &str) -> SigBuf<NOTICE_CAPACITY> {
    let mut buf = SigBuf::new();
    let notice = if active { ENTER_NOTICE } else { EXIT_NOTICE };
    let _ = write!(buf, "\n{notice}\n{prompt}");
    buf
}

/// `SIGTSTP` ハンドラ。
pub extern "C" fn handle_sigtstp(_sig: libc::c_int) {
    let _errno = ErrnoGuard::save();
    let active = ForegroundMode.toggle();
    signals::write_all_raw(libc::STDOUT_FILENO, toggle_notice(active, prompt()).as_bytes());
}
