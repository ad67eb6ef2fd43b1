//! Claude CLI連携モジュール
//!
//! ローカルの `claude` コマンドをサブプロセスとして呼び出す。
//! 出力トークン上限はCLI側の設定に従う。

use super::types::{AiError, TextService};
use std::process::Command;

pub struct ClaudeCli {
    verbose: bool,
}

impl ClaudeCli {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TextService for ClaudeCli {
    fn name(&self) -> &str {
        "claude-cli"
    }

    fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, AiError> {
        run_claude_cli(prompt, self.verbose)
    }
}

fn run_claude_cli(prompt: &str, verbose: bool) -> Result<String, AiError> {
    // Claude CLI呼び出し（Windowsではcmd /c経由、改行と引用符をエスケープ）
    #[cfg(windows)]
    let output = {
        let escaped = prompt.replace('\n', " ").replace('"', "\\\"");
        Command::new("cmd")
            .args(["/c", "claude", "-p", &escaped, "--output-format", "text"])
            .output()
    };

    #[cfg(not(windows))]
    let output = Command::new("claude")
        .args(["-p", prompt, "--output-format", "text"])
        .output();

    let output = output.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AiError::Unavailable("claude コマンドが見つかりません".into())
        } else {
            AiError::Request(format!("Claude CLI実行エラー: {}", e))
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AiError::Request(format!(
            "Claude CLI failed (code {:?}): {}",
            output.status.code(),
            stderr.trim()
        )));
    }

    let response = String::from_utf8_lossy(&output.stdout).to_string();

    if verbose {
        let preview: String = response.chars().take(500).collect();
        tracing::debug!(len = response.len(), "Claude CLIレスポンス: {}", preview);
    }

    if response.trim().is_empty() {
        return Err(AiError::Blocked {
            finish_reason: "EMPTY_OUTPUT".into(),
            block_reason: "N/A".into(),
        });
    }

    Ok(response)
}
