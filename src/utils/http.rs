use anyhow::Result;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER, USER_AGENT};
use std::time::Duration;

use crate::error::FetchError;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:145.0) Gecko/20100101 Firefox/145.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// 东方财富行情 HTTP client，进程内只构建一次，所有请求共用连接池。
/// `accept_invalid_certs` 打开时跳过证书校验（部分行情节点证书不规范）。
pub fn build_quote_client(timeout_secs: u64, accept_invalid_certs: bool) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en-US;q=0.3,en;q=0.2"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(REFERER, HeaderValue::from_static("https://quote.eastmoney.com/"));

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .build()?;
    Ok(client)
}

/// GET 并返回响应正文，非 2xx 状态按 FetchError 分类
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let resp = client.get(url).send().await?.error_for_status()?;
    Ok(resp.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 本地起一个只处理一次连接的服务端，读完请求后按 `respond` 处理 socket
    async fn serve_once<F, Fut>(respond: F) -> String
    where
        F: FnOnce(tokio::net::TcpStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            respond(sock).await;
        });
        format!("http://{}/api/qt/stock/get", addr)
    }

    async fn reply_with(mut sock: tokio::net::TcpStream, response: &'static str) {
        let mut buf = [0u8; 4096];
        let _ = sock.read(&mut buf).await;
        let _ = sock.write_all(response.as_bytes()).await;
        let _ = sock.shutdown().await;
    }

    #[test]
    fn test_random_user_agent_from_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn test_build_quote_client() {
        assert!(build_quote_client(10, false).is_ok());
        assert!(build_quote_client(30, true).is_ok());
    }

    #[tokio::test]
    async fn test_get_text_ok() {
        let url = serve_once(|sock| {
            reply_with(sock, "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}")
        })
        .await;
        let client = build_quote_client(5, false).unwrap();
        assert_eq!(get_text(&client, &url).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_reset_mid_request_is_connect() {
        // 只读一部分请求就关闭，未读数据会让内核发 RST
        let url = serve_once(|mut sock| async move {
            let mut buf = [0u8; 16];
            let _ = sock.read_exact(&mut buf).await;
            drop(sock);
        })
        .await;
        let client = build_quote_client(5, false).unwrap();
        let err = get_text(&client, &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Connect(_)), "got {:?}", err);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_closed_without_response_is_connect() {
        let url = serve_once(|mut sock| async move {
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            let _ = sock.shutdown().await;
        })
        .await;
        let client = build_quote_client(5, false).unwrap();
        let err = get_text(&client, &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Connect(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_refused_port_is_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = build_quote_client(5, false).unwrap();
        let err = get_text(&client, &format!("http://{}/", addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Connect(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_5xx_is_server() {
        let url = serve_once(|sock| {
            reply_with(
                sock,
                "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            )
        })
        .await;
        let client = build_quote_client(5, false).unwrap();
        assert_eq!(get_text(&client, &url).await.unwrap_err(), FetchError::Server(503));
    }

    #[tokio::test]
    async fn test_4xx_is_status() {
        let url = serve_once(|sock| {
            reply_with(sock, "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
        })
        .await;
        let client = build_quote_client(5, false).unwrap();
        let err = get_text(&client, &url).await.unwrap_err();
        assert_eq!(err, FetchError::Status(404));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_stalled_server_is_timeout() {
        let url = serve_once(|mut sock| async move {
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        let client = build_quote_client(1, false).unwrap();
        let err = get_text(&client, &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_bad_url_is_not_transient() {
        let client = build_quote_client(5, false).unwrap();
        let err = get_text(&client, "not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::Body(_)), "got {:?}", err);
        assert!(!err.is_transient());
    }
}
