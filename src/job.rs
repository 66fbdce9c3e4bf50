//! バックグラウンドジョブの reap と完了通知。
//!
//! ジョブテーブルは持たない。OS が PID 単位で追跡している子プロセスを
//! `SIGCHLD` ハンドラ内で `waitpid(-1, WNOHANG)` により回収し、その場で通知する。
//!
//! フォアグラウンドの子は [`ChildSignalBlock`](crate::signals::ChildSignalBlock) で
//! `SIGCHLD` をブロックした区間内で `waitpid(pid)` されるため、ここで回収されるのは
//! バックグラウンドの子だけになる。

use std::fmt::Write;

use libc::pid_t;

use crate::signals::{self, ErrnoGuard, SigBuf};
use crate::status::Status;

/// 完了通知 1 行分。`background pid N is done: exit value M` 形式。
pub fn done_report(pid: pid_t, status: Status) -> SigBuf<96> {
    let mut buf = SigBuf::new();
    let _ = write!(buf, "\nbackground pid {pid} is done: {status}\n");
    buf
}

/// 終了済みの子プロセスをすべて非ブロッキングで回収し、それぞれ `report` に渡す。
///
/// ハンドラ呼び出しの間に複数の子が終了していることがあるため、
/// reap できるものがなくなるまで繰り返す。回収した数を返す。
pub fn reap_finished(mut report: impl FnMut(pid_t, Status)) -> usize {
    let mut reaped = 0;
    loop {
        let mut raw_status: libc::c_int = 0;
        let pid = unsafe { libc::waitpid(-1, &mut raw_status, libc::WNOHANG) };
        if pid <= 0 {
            break;
        }
        if let Some(status) = Status::from_raw(raw_status) {
            report(pid, status);
            reaped += 1;
        }
    }
    reaped
}

/// `SIGCHLD` ハンドラ。
pub extern "C" fn handle_sigchld(_sig: libc::c_int) {
    let _errno = ErrnoGuard::save();
    reap_finished(|pid, status| {
        signals::write_all_raw(libc::STDOUT_FILENO, done_report(pid, status).as_bytes());
    });
}
