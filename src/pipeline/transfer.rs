// Streaming byte transfer to disk with cancellation and progress

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::errors::{PipelineError, PipelineResult};
use super::models::ProgressFn;

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Suffix for in-flight downloads; the rename to the final name happens only
/// after the last byte is written
const PART_SUFFIX: &str = ".part";

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Stream `url` into `dest`.
///
/// Bytes land in a `.part` sibling first and are renamed into place on
/// completion, so `dest` never holds a truncated file. The token is checked
/// between chunks; on cancellation or failure the partial file is removed and
/// the error returned.
///
/// `progress` is called with the completed fraction when the remote reports a
/// content length, and not at all when it does not.
pub async fn download_to_file(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: Option<&ProgressFn>,
    token: &CancellationToken,
) -> PipelineResult<()> {
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(PipelineError::TransferFailed(format!(
            "{} fetching {}",
            response.status(),
            url
        )));
    }

    let total = response.content_length();
    let partial = part_path(dest);
    debug!("[transfer] {} -> {}", url, partial.display());

    let result = write_body(response, &partial, total, progress, token).await;
    if let Err(e) = &result {
        if let Err(rm) = tokio::fs::remove_file(&partial).await {
            if rm.kind() != std::io::ErrorKind::NotFound {
                warn!("[transfer] could not remove partial file: {}", rm);
            }
        }
        debug!("[transfer] aborted: {}", e);
        return result;
    }

    tokio::fs::rename(&partial, dest).await?;
    debug!("[transfer] complete: {}", dest.display());
    Ok(())
}

async fn write_body(
    response: reqwest::Response,
    partial: &Path,
    total: Option<u64>,
    progress: Option<&ProgressFn>,
    token: &CancellationToken,
) -> PipelineResult<()> {
    let file = tokio::fs::File::create(partial).await?;
    let mut writer = tokio::io::BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;

        if let (Some(report), Some(total)) = (progress, total) {
            if total > 0 {
                report((written as f64 / total as f64) as f32);
            }
        }
    }

    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Minimal one-shot HTTP server so transfer tests stay off the network
    async fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let header = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            socket.write_all(header.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
        });
        format!("http://{}/media.mp4", addr)
    }

    #[tokio::test]
    async fn transfer_lands_complete_file_and_no_part_remains() {
        let url = serve_once("HTTP/1.1 200 OK", b"0123456789").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("media.mp4");

        let reported = Arc::new(Mutex::new(Vec::<f32>::new()));
        let sink = reported.clone();
        let progress: ProgressFn = Arc::new(move |f| sink.lock().unwrap().push(f));

        download_to_file(
            &reqwest::Client::new(),
            &url,
            &dest,
            Some(&progress),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"0123456789");
        assert!(!part_path(&dest).exists());

        let reported = reported.lock().unwrap();
        assert_eq!(reported.last().copied(), Some(1.0));
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn http_error_status_fails_the_transfer() {
        let url = serve_once("HTTP/1.1 404 Not Found", b"").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("media.mp4");

        let err = download_to_file(
            &reqwest::Client::new(),
            &url,
            &dest,
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::TransferFailed(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn cancelled_token_aborts_and_cleans_up() {
        let url = serve_once("HTTP/1.1 200 OK", &[0u8; 256 * 1024]).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("media.mp4");

        let token = CancellationToken::new();
        token.cancel();

        let err = download_to_file(&reqwest::Client::new(), &url, &dest, None, &token)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
