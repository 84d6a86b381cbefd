//! Local JSON-RPC endpoint for client tests.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::protocol::{RpcRequest, RpcResponse};

/// Serve JSON-RPC on an ephemeral port, answering every call through `handler`.
///
/// Understands only `Content-Length` POST bodies on keep-alive connections
/// (what reqwest sends); no chunked encoding, no batches. Returns the URL.
pub(crate) async fn serve<F>(handler: F) -> String
where
    F: Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let (reader, mut writer) = stream.into_split();
                let mut reader = BufReader::new(reader);
                while let Some(body) = read_body(&mut reader).await {
                    let request: RpcRequest = serde_json::from_slice(&body).unwrap();
                    let params = request.params.unwrap_or(Value::Null);
                    let response = match handler(&request.method, &params) {
                        Ok(result) => RpcResponse::success(request.id, result),
                        Err((code, message)) => RpcResponse::error(request.id, code, message),
                    };
                    let payload = serde_json::to_string(&response).unwrap();
                    let http = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{payload}",
                        payload.len()
                    );
                    if writer.write_all(http.as_bytes()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    format!("http://{addr}")
}

/// Next request body, `None` once the peer closes.
async fn read_body<R: AsyncBufReadExt + AsyncReadExt + Unpin>(reader: &mut R) -> Option<Vec<u8>> {
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok()?;
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await.ok()?;
    Some(body)
}
