//! トークナイザ + パーサー: 入力行から [`Command`] を構築する。
//!
//! ## 対応構文
//!
//! ```text
//! command ::= WORD (WORD | "<" WORD | ">" WORD)* ["&"]
//! ```
//!
//! - トークンは空白区切り。クォートやエスケープは扱わない
//! - リダイレクト: `<`（stdin）、`>`（stdout、作成 + 切り詰め）
//! - バックグラウンド実行: 行末の `&` のみ。途中の `&` は次のトークンと共に通常の引数になる
//! - PID 展開: 引数中の `$$` をシェル自身の PID に置換する
//! - コメント: 最初の非空白文字が `#` の行は何もしない

use std::borrow::Cow;

use thiserror::Error;

use crate::command::Command;

/// 展開マーカー。
const PID_MARKER: &str = "$$";

// ── Error ───────────────────────────────────────────────────────────

/// パース時に発生しうるエラー。
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// リダイレクト演算子の後にターゲットファイル名がない。引数は演算子。
    #[error("syntax error: missing file name after `{0}`")]
    MissingRedirectTarget(char),
}

// ── PID expansion ───────────────────────────────────────────────────

/// `$$` を `pid` の 10 進表記に置換する。
///
/// 左から右へ重ならない出現をすべて置換する（`a$$b$$` → `a<pid>b<pid>`）。
/// `$$` を含まなければゼロコピーの `Cow::Borrowed` を返す。
pub fn expand_pid(s: &str, pid: u32) -> Cow<'_, str> {
    if !s.contains(PID_MARKER) {
        return Cow::Borrowed(s);
    }

    let pid = pid.to_string();
    let mut result = String::with_capacity(s.len() + pid.len());
    let mut rest = s;
    while let Some(at) = rest.find(PID_MARKER) {
        result.push_str(&rest[..at]);
        result.push_str(&pid);
        rest = &rest[at + PID_MARKER.len()..];
    }
    result.push_str(rest);
    Cow::Owned(result)
}

// ── Parser ──────────────────────────────────────────────────────────

/// 空行またはコメント行なら `true`。
pub fn is_blank_or_comment(input: &str) -> bool {
    let trimmed = input.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// 入力行をパースして [`Command`] を返す。
///
/// - 空行・コメント行 → `Ok(None)`
/// - 正常なコマンド → `Ok(Some(Command))`
/// - 構文エラー → `Err(ParseError)`
///
/// `pid` は `$$` 展開に使用される。
pub fn parse(input: &str, pid: u32) -> Result<Option<Command>, ParseError> {
    if is_blank_or_comment(input) {
        return Ok(None);
    }

    let mut tokens = input.split_ascii_whitespace();
    let Some(program) = tokens.next() else {
        return Ok(None);
    };
    let mut cmd = Command::new(program);

    while let Some(token) = tokens.next() {
        match token {
            "<" => {
                let target = tokens.next().ok_or(ParseError::MissingRedirectTarget('<'))?;
                cmd.input = Some(target.to_string());
            }
            ">" => {
                let target = tokens.next().ok_or(ParseError::MissingRedirectTarget('>'))?;
                cmd.output = Some(target.to_string());
            }
            "&" => match tokens.next() {
                None => {
                    cmd.background = true;
                    break;
                }
                // 行末ではない `&` はリテラル。直後のトークンも演算子として解釈しない
                Some(next) => {
                    cmd.push_arg("&");
                    cmd.push_arg(next);
                }
            },
            word => cmd.push_arg(word),
        }
    }

    cmd.map_args(|arg| match expand_pid(arg, pid) {
        Cow::Owned(expanded) => Some(expanded),
        Cow::Borrowed(_) => None,
    });

    Ok(Some(cmd))
}

// ── Tests ───────────────────────────────────────────────────────────
