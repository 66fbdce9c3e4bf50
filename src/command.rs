//! パース済みコマンドのデータモデル。
//!
//! [`Command`] は 1 行分の入力から [`parser`](crate::parser) が構築し、
//! REPL ループが 1 回のディスパッチで消費する。
//! ビルトイン判定はパース時に 1 度だけ行い、[`CommandKind`] として保持する。

use std::ffi::CString;

/// プロセス内で実行するビルトインコマンド。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `exit`: REPL ループの終了を要求する。
    Exit,
    /// `cd [dir]`: カレントディレクトリを変更する。
    Cd,
    /// `status`: 直前のフォアグラウンドコマンドの終了状態を表示する。
    Status,
}

impl Builtin {
    /// コマンド名からビルトインを引く。大文字小文字を区別し、前方一致はしない。
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "exit" => Some(Self::Exit),
            "cd" => Some(Self::Cd),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Cd => "cd",
            Self::Status => "status",
        }
    }
}

/// コマンドの種別。ビルトインか外部コマンドか。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Builtin(Builtin),
    External,
}

/// 1 行分のパース済みコマンド。
///
/// `args[0]` は常にコマンド名で、`execvp` の argv にそのまま渡る。
/// コマンド名を別フィールドで持たず [`program`](Command::program) で `args[0]` を返すため、
/// 「コマンド名 == 第 0 引数」は構造的に崩れない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<String>,
    /// `< file` で指定された stdin の差し替え先。
    pub input: Option<String>,
    /// `> file` で指定された stdout の差し替え先。
    pub output: Option<String>,
    /// 行末が `&` の場合に `true`。
    pub background: bool,
    kind: CommandKind,
}

impl Command {
    /// コマンド名から新しいコマンドを作る。`program` は空であってはならない。
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        debug_assert!(!program.is_empty());
        let kind = match Builtin::lookup(&program) {
            Some(b) => CommandKind::Builtin(b),
            None => CommandKind::External,
        };
        Self {
            args: vec![program],
            input: None,
            output: None,
            background: false,
            kind,
        }
    }

    pub fn program(&self) -> &str {
        &self.args[0]
    }

    /// `args[0]`（コマンド名）を含む全引数。長さは常に 1 以上。
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn push_arg(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// 各引数を書き換える。書き換え後にビルトイン判定をやり直す。
    pub(crate) fn map_args(&mut self, mut f: impl FnMut(&str) -> Option<String>) {
        for arg in &mut self.args {
            if let Some(new) = f(arg.as_str()) {
                *arg = new;
            }
        }
        self.kind = match Builtin::lookup(&self.args[0]) {
            Some(b) => CommandKind::Builtin(b),
            None => CommandKind::External,
        };
    }

    /// フォアグラウンド専用モード中はバックグラウンド指定を打ち消す。
    pub fn force_foreground(&mut self) {
        self.background = false;
    }

    /// `execvp` 用の NUL 終端文字列列に変換する。内部に NUL を含む引数があれば `Err` でその引数を返す。
    pub fn to_cstrings(&self) -> Result<Vec<CString>, String> {
        self.args
            .iter()
            .map(|a| CString::new(a.as_str()).map_err(|_| a.clone()))
            .collect()
    }
}
