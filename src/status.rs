//! 終了ステータスの表現と `waitpid` の raw status の解釈。

use std::fmt;

/// 子プロセスの終了状態。`status` ビルトインとバックグラウンド完了通知で表示される。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 正常終了。終了コード 0〜255。
    Exited(u8),
    /// シグナルによる終了。シグナル番号。
    Signaled(u32),
}

impl Status {
    /// `waitpid` が返した raw status を解釈する。
    ///
    /// 終了でもシグナル終了でもない報告（停止・再開）は `None`。
    /// `WUNTRACED` / `WCONTINUED` を指定しない限り現れない。
    pub fn from_raw(raw: libc::c_int) -> Option<Self> {
        if libc::WIFEXITED(raw) {
            Some(Self::Exited(libc::WEXITSTATUS(raw) as u8))
        } else if libc::WIFSIGNALED(raw) {
            Some(Self::Signaled(libc::WTERMSIG(raw) as u32))
        } else {
            None
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Exited(0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit value {code}"),
            Self::Signaled(sig) => write!(f, "terminated by signal {sig}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_exit() {
        assert_eq!(Status::Exited(2).to_string(), "exit value 2");
        assert_eq!(Status::default().to_string(), "exit value 0");
    }

    #[test]
    fn display_signal() {
        assert_eq!(Status::Signaled(9).to_string(), "terminated by signal 9");
    }

    #[test]
    fn decode_exit_code() {
        // 正常終了の raw status は `code << 8`
        assert_eq!(Status::from_raw(2 << 8), Some(Status::Exited(2)));
        assert_eq!(Status::from_raw(255 << 8), Some(Status::Exited(255)));
    }

    #[test]
    fn decode_signal() {
        assert_eq!(Status::from_raw(libc::SIGKILL), Some(Status::Signaled(9)));
        assert_eq!(Status::from_raw(libc::SIGTERM), Some(Status::Signaled(15)));
    }

    #[test]
    fn decode_stopped_is_none() {
        assert_eq!(Status::from_raw((libc::SIGTSTP << 8) | 0x7f), None);
    }
}
