//! smallsh ライブラリ: テスト・ベンチマーク用にモジュールを公開する。
//!
//! バイナリ本体は `main.rs` の REPL ループ。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |-----------|------|
//! | [`command`] | パース済みコマンド（引数、リダイレクト先、バックグラウンド指定、ビルトイン種別） |
//! | [`parser`] | 構文解析（空白区切り、`<` / `>` リダイレクト、行末 `&`、`$$` の PID 展開、コメント） |
//! | [`status`] | 終了ステータス（`exit value N` / `terminated by signal N`） |
//! | [`builtins`] | ビルトイン（`exit`, `cd`, `status`） |
//! | [`spawn`] | `fork` + `execvp` ラッパー（子のシグナル設定、リダイレクト、`/dev/null` 接続） |
//! | [`executor`] | 外部コマンド実行（フォアグラウンド待機、バックグラウンド起動） |
//! | [`job`] | バックグラウンドプロセスの reap と完了通知（`SIGCHLD` ハンドラ） |
//! | [`mode`] | フォアグラウンド専用モード（`SIGTSTP` ハンドラ） |
//! | [`signals`] | ハンドラ登録、`SIGCHLD` マスク、非同期シグナル安全な出力 |
//! | [`input`] | プロンプト表示と行読み取り |
//! | [`config`] | コマンドライン設定とログ初期化 |
//! | [`shell`] | シェルの状態（直前ステータス、終了要求）と 1 行分のディスパッチ |

pub mod builtins;
pub mod command;
pub mod config;
pub mod executor;
pub mod input;
pub mod job;
pub mod mode;
pub mod parser;
pub mod shell;
pub mod signals;
pub mod spawn;
pub mod status;
