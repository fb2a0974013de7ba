use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use onoff_runner::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Answers every request on a connection with the same response, keeping the connection open.
async fn start_target(response: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let accepted = connections.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(serve_connection(stream, response));
        }
    });

    (format!("http://{addr}/admin/test"), connections)
}

async fn serve_connection(mut stream: TcpStream, response: &'static str) {
    let mut pending = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        pending.extend_from_slice(&buf[..n]);

        // GET requests have no body, so every header terminator ends one request.
        while let Some(end) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
            pending.drain(..end + 4);
            if stream.write_all(response.as_bytes()).await.is_err() {
                return;
            }
        }
    }
}

fn config_for(url: String) -> RunConfig {
    RunConfig {
        target_url: url,
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn reuses_connection_across_requests() {
    let (url, connections) = start_target(
        "HTTP/1.1 200 OK\r\nContent-Length: 11\r\nContent-Type: text/plain\r\n\r\nhello world",
    )
    .await;
    let mut issuer = HttpRequestIssuer::new(&config_for(url)).unwrap();

    for _ in 0..10 {
        issuer.issue().await.unwrap();
    }

    let opened = connections.load(Ordering::SeqCst);
    assert!((1..10).contains(&opened), "opened {opened} connection(s)");
}

#[tokio::test(flavor = "multi_thread")]
async fn error_status_is_not_a_transport_error() {
    let (url, _) = start_target(
        "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\n\r\nbusy",
    )
    .await;
    let mut issuer = HttpRequestIssuer::new(&config_for(url)).unwrap();

    issuer.issue().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_connection_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut issuer = HttpRequestIssuer::new(&config_for(format!("http://{addr}/"))).unwrap();

    let err = issuer.issue().await.unwrap_err();
    assert!(matches!(err, TransportError::Connect { .. }), "{err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_target_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections but never answer
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let config = RunConfig {
        request_timeout: Duration::from_millis(200),
        ..config_for(format!("http://{addr}/"))
    };
    let mut issuer = HttpRequestIssuer::new(&config).unwrap();

    let err = issuer.issue().await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout { .. }), "{err:?}");
}

#[test]
fn run_against_http_target() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (url, connections) = runtime.block_on(start_target(
        "HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n",
    ));

    let config = RunConfig {
        run_id: "http".to_string(),
        worker_count: 2,
        on_rate: 0.1,
        off_rate: 2.0,
        duration: Duration::from_secs(1),
        no_progress: true,
        ..config_for(url)
    };

    let outcome = run(&config, |config, _| HttpRequestIssuer::new(config)).unwrap();

    assert!(outcome.aggregate.request_count > 0);
    assert!(outcome.workers.iter().all(|w| w.request_count > 0));
    // Pooled connections are reused rather than opened per request
    let opened = connections.load(Ordering::SeqCst) as u64;
    assert!(opened < outcome.aggregate.request_count, "opened {opened} connection(s)");
}
