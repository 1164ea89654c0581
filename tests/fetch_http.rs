// tests/fetch_http.rs
use board_watch::config::TransportProfile;
use board_watch::{FetchError, HttpFetcher, PageFetcher};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// "한글" in EUC-KR.
const HANGUL_EUC_KR: &[u8] = &[0xC7, 0xD1, 0xB1, 0xDB];

#[derive(Default)]
struct Hits(Mutex<HashMap<String, usize>>);

impl Hits {
    fn bump(&self, path: &str) -> usize {
        let mut m = self.0.lock().unwrap();
        let n = m.entry(path.to_string()).or_default();
        *n += 1;
        *n
    }

    fn get(&self, path: &str) -> usize {
        self.0.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

fn response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n", body.len());
    for (k, v) in headers {
        out.push_str(&format!("{k}: {v}\r\n"));
    }
    out.push_str("\r\n");
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

async fn handle(mut sock: TcpStream, hits: Arc<Hits>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match sock.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let head = String::from_utf8_lossy(&buf).to_string();
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let n = hits.bump(&path);

    let resp = match path.as_str() {
        "/old" => response("302 Found", &[("Location", "/board/list")], b""),
        "/board/list" => response("200 OK", &[("Content-Type", "text/html; charset=utf-8")], b"<p>moved</p>"),
        "/euckr-header" => response("200 OK", &[("Content-Type", "text/html; charset=EUC-KR")], HANGUL_EUC_KR),
        "/euckr-latin1" => response(
            "200 OK",
            &[("Content-Type", "text/html; charset=ISO-8859-1")],
            HANGUL_EUC_KR,
        ),
        "/euckr-plain" => response("200 OK", &[("Content-Type", "text/html")], HANGUL_EUC_KR),
        "/down" => response("503 Service Unavailable", &[], b"down"),
        "/flaky" if n == 1 => response("500 Internal Server Error", &[], b"oops"),
        "/flaky" => response("200 OK", &[("Content-Type", "text/html")], b"<p>ok</p>"),
        "/echo-ua" => {
            let ua = head
                .lines()
                .find_map(|l| l.strip_prefix("user-agent: ").or_else(|| l.strip_prefix("User-Agent: ")))
                .unwrap_or("")
                .to_string();
            response("200 OK", &[("Content-Type", "text/plain")], ua.as_bytes())
        }
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            response("200 OK", &[], b"late")
        }
        _ => response("404 Not Found", &[], b"nope"),
    };
    let _ = sock.write_all(&resp).await;
    let _ = sock.shutdown().await;
}

async fn serve() -> (String, Arc<Hits>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(Hits::default());
    let h = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((sock, _)) = listener.accept().await else { break };
            tokio::spawn(handle(sock, h.clone()));
        }
    });
    (base, hits)
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new().unwrap().with_backoff(Duration::from_millis(10))
}

#[tokio::test]
async fn follows_redirect_and_reports_final_url() {
    let (base, _) = serve().await;
    let page = fetcher()
        .fetch(&format!("{base}/old"), &TransportProfile::default())
        .await
        .unwrap();
    assert_eq!(page.final_url, format!("{base}/board/list"));
    assert_eq!(page.body, "<p>moved</p>");
    assert_eq!(page.encoding, "utf-8");
}

#[tokio::test]
async fn decodes_with_header_charset() {
    let (base, _) = serve().await;
    let page = fetcher()
        .fetch(&format!("{base}/euckr-header"), &TransportProfile::default())
        .await
        .unwrap();
    assert_eq!(page.encoding, "euc-kr");
    assert_eq!(page.body, "한글");
}

#[tokio::test]
async fn profile_charset_applies_when_header_is_silent() {
    let (base, _) = serve().await;
    let profile = TransportProfile {
        charset: Some("euc-kr".into()),
        ..TransportProfile::default()
    };
    let page = fetcher()
        .fetch(&format!("{base}/euckr-plain"), &profile)
        .await
        .unwrap();
    assert_eq!(page.body, "한글");

    // without the hint the bytes are not valid UTF-8
    let lossy = fetcher()
        .fetch(&format!("{base}/euckr-plain"), &TransportProfile::default())
        .await
        .unwrap();
    assert_ne!(lossy.body, "한글");
}

#[tokio::test]
async fn latin1_header_does_not_override_profile_charset() {
    let (base, _) = serve().await;
    let profile = TransportProfile {
        charset: Some("euc-kr".into()),
        ..TransportProfile::default()
    };
    let page = fetcher()
        .fetch(&format!("{base}/euckr-latin1"), &profile)
        .await
        .unwrap();
    assert_eq!(page.encoding, "euc-kr");
    assert_eq!(page.body, "한글");
}

#[tokio::test]
async fn sends_configured_user_agent() {
    let (base, _) = serve().await;
    let profile = TransportProfile {
        user_agent: "board-watch-test/1".into(),
        ..TransportProfile::default()
    };
    let page = fetcher().fetch(&format!("{base}/echo-ua"), &profile).await.unwrap();
    assert_eq!(page.body, "board-watch-test/1");
}

#[tokio::test]
async fn server_error_is_retried() {
    let (base, hits) = serve().await;
    let profile = TransportProfile {
        retries: 1,
        ..TransportProfile::default()
    };
    let page = fetcher().fetch(&format!("{base}/flaky"), &profile).await.unwrap();
    assert_eq!(page.body, "<p>ok</p>");
    assert_eq!(hits.get("/flaky"), 2);
}

#[tokio::test]
async fn maximum_retry_count_terminates() {
    let (base, hits) = serve().await;
    let profile = TransportProfile {
        retries: u8::MAX,
        ..TransportProfile::default()
    };
    let err = HttpFetcher::new()
        .unwrap()
        .with_backoff(Duration::ZERO)
        .fetch(&format!("{base}/down"), &profile)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert_eq!(hits.get("/down"), usize::from(u8::MAX) + 1);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let (base, hits) = serve().await;
    let profile = TransportProfile {
        retries: 3,
        ..TransportProfile::default()
    };
    let err = fetcher()
        .fetch(&format!("{base}/missing"), &profile)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert!(!err.is_transient());
    assert_eq!(hits.get("/missing"), 1);
}

#[tokio::test]
async fn slow_server_times_out() {
    let (base, hits) = serve().await;
    let profile = TransportProfile {
        timeout_secs: 1,
        retries: 0,
        ..TransportProfile::default()
    };
    let err = fetcher().fetch(&format!("{base}/slow"), &profile).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }), "{err:?}");
    assert_eq!(hits.get("/slow"), 1);
}
