//! プロンプト表示と 1 行の読み取り。
//!
//! 端末の raw モードや行編集は行わない。cooked モードの端末（またはパイプ）から
//! 改行までをブロッキングで読む。

use std::io::{self, BufRead, Read, Write};

/// 1 行の最大バイト数（改行を除く）。
pub const MAX_LINE_LENGTH: usize = 2048;

/// [`read_line`] の結果。
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// 末尾の改行を除いた 1 行。
    Line(String),
    /// [`MAX_LINE_LENGTH`] を超えた行。引数は改行を除いた実際のバイト数。行は破棄される。
    TooLong(usize),
    /// 入力の終わり（Ctrl+D / パイプの close）。
    Eof,
}

/// `prompt` を表示して 1 行読む。
///
/// シグナルで中断された読み取りは `BufRead::read_until` 内で再試行される。
/// UTF-8 として不正なバイトは置換文字に変換する。
/// 保持するのは最大 `MAX_LINE_LENGTH + 2` バイト（`\r\n` 分）までで、超えた残りは読み捨てる。
pub fn read_line(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    prompt: &str,
) -> io::Result<ReadOutcome> {
    write!(out, "{prompt}")?;
    out.flush()?;

    let limit = MAX_LINE_LENGTH + 2;
    let mut buf = Vec::new();
    if reader.by_ref().take(limit as u64).read_until(b'\n', &mut buf)? == 0 {
        return Ok(ReadOutcome::Eof);
    }
    if buf.last() != Some(&b'\n') && buf.len() == limit {
        let rest = discard_line(reader)?;
        return Ok(ReadOutcome::TooLong(buf.len() + rest));
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > MAX_LINE_LENGTH {
        return Ok(ReadOutcome::TooLong(buf.len()));
    }
    Ok(ReadOutcome::Line(String::from_utf8_lossy(&buf).into_owned()))
}

/// 次の改行（または EOF）までを読み捨て、改行を除いたバイト数を返す。
fn discard_line(reader: &mut impl BufRead) -> io::Result<usize> {
    let mut skipped = 0;
    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(skipped);
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(i) => {
                reader.consume(i + 1);
                return Ok(skipped + i);
            }
            None => {
                let n = available.len();
                reader.consume(n);
                skipped += n;
            }
        }
    }
}
