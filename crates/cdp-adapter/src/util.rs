use anyhow::{anyhow, Result};
use chromiumoxide::async_process::Child;
use futures::io::{AsyncBufReadExt, BufReader};
use futures::stream::StreamExt;
use tokio::time::{timeout, Duration};

const WS_URL_WAIT: Duration = Duration::from_secs(20);

/// Reads the browser's stderr until it announces its DevTools websocket.
pub async fn extract_ws_url(child: &mut Child) -> Result<String> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("browser process has no stderr handle"))?;
    let mut lines = BufReader::new(stderr).lines();
    let mut seen = Vec::new();

    let scan = async {
        while let Some(line) = lines.next().await {
            let line = line?;
            if let Some(url) = parse_listening_line(&line) {
                return Ok(url);
            }
            if seen.len() < 8 {
                seen.push(line);
            }
        }
        Err(anyhow!(
            "browser exited before announcing a devtools websocket: {}",
            seen.join(" | ")
        ))
    };

    timeout(WS_URL_WAIT, scan)
        .await
        .map_err(|_| anyhow!("timed out waiting for the devtools websocket url"))?
}

fn parse_listening_line(line: &str) -> Option<String> {
    let (_, tail) = line.rsplit_once("listening on ")?;
    let url = tail.trim();
    (url.starts_with("ws") && url.contains("devtools/browser")).then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::parse_listening_line;

    #[test]
    fn picks_browser_websocket_from_stderr_line() {
        let line = "DevTools listening on ws://127.0.0.1:9222/devtools/browser/abc";
        assert_eq!(
            parse_listening_line(line).as_deref(),
            Some("ws://127.0.0.1:9222/devtools/browser/abc")
        );
        assert!(parse_listening_line("listening on http://localhost").is_none());
    }
}
