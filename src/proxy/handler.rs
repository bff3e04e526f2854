//! Per-connection request handling.

use http::{Method, StatusCode};

use crate::config::RelayConfig;
use crate::error::{Result, StreamError};
use crate::http::{Request, Response};
use crate::lifecycle::Shutdown;
use crate::net::Address;
use crate::observability::metrics;
use crate::stream::DuplexStream;
use crate::tunnel::Tunnel;

/// Serves requests from `client` until it closes, asks to close, or shutdown
/// is triggered between requests.
pub async fn serve_connection(
    mut client: DuplexStream,
    config: &RelayConfig,
    shutdown: &Shutdown,
) -> Result<()> {
    loop {
        let request = tokio::select! {
            _ = shutdown.wait() => break,
            request = client.input().read_request() => request,
        };
        let request = match request {
            Ok(request) => request,
            Err(err) if err.is_eof() => {
                tracing::debug!("Client closed connection");
                break;
            }
            Err(StreamError::Format(err)) => {
                tracing::warn!(error = %err, "Malformed request");
                reply_error(&mut client, StatusCode::BAD_REQUEST).await?;
                break;
            }
            Err(err) => return Err(err),
        };
        tracing::debug!(method = %request.method, request_target = %request.target, "Request received");

        if request.is_connect() {
            return tunnel(client, &request, config).await;
        }
        if !forward(&mut client, request, config).await? {
            break;
        }
    }
    client.close().await;
    Ok(())
}

/// Answers CONNECT and relays blindly until both sides close.
async fn tunnel(mut client: DuplexStream, request: &Request, config: &RelayConfig) -> Result<()> {
    let target = match Address::parse(&request.target) {
        Ok(Some(target)) => target,
        _ => {
            metrics::record_request(&request.method, 400);
            reply_error(&mut client, StatusCode::BAD_REQUEST).await?;
            client.close().await;
            return Ok(());
        }
    };

    let upstream = match dial(&target, config).await {
        Ok(upstream) => upstream,
        Err(err) => {
            tracing::warn!(tunnel_target = %target.fullname(), error = %err, "Tunnel dial failed");
            metrics::record_request(&request.method, 502);
            reply_error(&mut client, StatusCode::BAD_GATEWAY).await?;
            client.close().await;
            return Ok(());
        }
    };

    let established = Response::with_phrase(StatusCode::OK, "Connection established");
    client.output().write_message(&established).await?;
    metrics::record_request(&request.method, 200);

    let stats = Tunnel::new(client, upstream)
        .with_chunk_size(config.stream.relay_chunk_size)
        .run()
        .await?;
    tracing::info!(
        tunnel_target = %target.fullname(),
        sent = stats.left_to_right,
        received = stats.right_to_left,
        "Tunnel closed"
    );
    Ok(())
}

/// Forwards one request to the origin named by its Host header and streams the
/// response back. Returns whether the client connection may be reused.
async fn forward(client: &mut DuplexStream, mut request: Request, config: &RelayConfig) -> Result<bool> {
    // Both framings at once would let client and origin disagree on where
    // the body ends.
    if request.is_chunked() && request.headers.contains("Content-Length") {
        tracing::warn!(request_target = %request.target, "Request with both Content-Length and chunked framing");
        metrics::record_request(&request.method, 400);
        reply_error(client, StatusCode::BAD_REQUEST).await?;
        return Ok(false);
    }
    let origin = match request.headers.get("Host").map(Address::parse) {
        Some(Ok(Some(origin))) => origin,
        _ => {
            tracing::warn!(request_target = %request.target, "Request without usable Host header");
            metrics::record_request(&request.method, 400);
            reply_error(client, StatusCode::BAD_REQUEST).await?;
            return Ok(false);
        }
    };
    let client_close = request.headers.has_token("Connection", "close");
    request.target = origin_form(&request.target).to_string();

    let mut upstream = match dial(&origin, config).await {
        Ok(upstream) => upstream,
        Err(err) => {
            tracing::warn!(origin = %origin.fullname(), error = %err, "Origin dial failed");
            metrics::record_request(&request.method, 502);
            reply_error(client, StatusCode::BAD_GATEWAY).await?;
            return Ok(false);
        }
    };

    upstream.output().write_message(&request).await?;
    if request.body_pending {
        if request.is_chunked() {
            upstream.output().copy_chunks(client.input()).await?;
            upstream.output().copy_lines(client.input()).await?;
        } else if let Some(length) = request.content_length()? {
            upstream.output().copy_bytes(client.input(), length).await?;
        }
    }

    let mut response = Response::default();
    upstream.input().read_head(&mut response).await?;
    // Interim responses go straight through; the final one follows.
    while response.code / 100 == 1 && response.code != 101 {
        client.output().write_message(&response).await?;
        response = Response::default();
        upstream.input().read_head(&mut response).await?;
    }
    client.output().write_message(&response).await?;

    let mut close_delimited = false;
    if !(response.is_bodyless() || request.method == Method::HEAD.as_str()) {
        if response.is_chunked() {
            client.output().copy_chunks(upstream.input()).await?;
            client.output().copy_lines(upstream.input()).await?;
        } else if let Some(length) = response.content_length()? {
            client.output().copy_bytes(upstream.input(), length).await?;
        } else {
            client.output().copy_all(upstream.input()).await?;
            close_delimited = true;
        }
    }
    upstream.close().await;

    metrics::record_request(&request.method, response.code);
    tracing::debug!(
        method = %request.method,
        origin = %origin,
        code = response.code,
        "Request forwarded"
    );

    let origin_close = response.headers.has_token("Connection", "close");
    Ok(!(client_close || origin_close || close_delimited || response.code == 101))
}

async fn dial(address: &Address, config: &RelayConfig) -> Result<DuplexStream> {
    DuplexStream::connect_within(
        address.clone(),
        config.stream.buffer_limit,
        config.timeouts.connect(),
    )
    .await
}

/// Strips scheme and authority from an absolute-form target.
fn origin_form(target: &str) -> &str {
    match target.strip_prefix("http://") {
        Some(rest) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => target,
    }
}

async fn reply_error(client: &mut DuplexStream, status: StatusCode) -> Result<()> {
    let mut response = Response::new(status);
    response.headers.append("Connection", "close");
    response.set_body(status.canonical_reason().unwrap_or_default());
    client.output().write_message(&response).await?;
    Ok(())
}
