//! Chat-completions client against an in-process HTTP endpoint

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use toolbridge::core::config::LlmConfig;
use toolbridge::core::Message;
use toolbridge::llm::{ChatCompletionsClient, ChatModel, FALLBACK_REPLY};

/// Canned HTTP response
#[derive(Clone)]
struct Reply {
    status: u16,
    body: String,
}

impl Reply {
    fn ok(content: &str) -> Self {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }],
            "usage": { "prompt_tokens": 12, "total_tokens": 20 }
        });
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    fn error(status: u16) -> Self {
        Self {
            status,
            body: r#"{"error":"boom"}"#.to_string(),
        }
    }

    fn raw(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }
}

struct Endpoint {
    url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

/// Serve the replies in order, one per connection. The last reply repeats.
async fn serve(replies: Vec<Reply>) -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let server_hits = hits.clone();
    let server_requests = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let n = server_hits.fetch_add(1, Ordering::SeqCst);
            let reply = replies[n.min(replies.len() - 1)].clone();

            let (head, body) = read_request(&mut stream).await;
            let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
            server_requests.lock().unwrap().push((head, json));

            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.status,
                reply.body.len(),
                reply.body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    Endpoint {
        url: format!("http://{}/openai/v1/chat/completions", addr),
        hits,
        requests,
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> (String, Vec<u8>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return (String::from_utf8_lossy(&buf).into_owned(), Vec::new());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    (head, body)
}

fn client(url: &str) -> ChatCompletionsClient {
    let config = LlmConfig {
        endpoint: url.to_string(),
        model: "qwen-qwq-32b".to_string(),
        api_key_env: "LLM_API_KEY".to_string(),
        timeout_secs: 5,
        max_attempts: 3,
        retry_delay_ms: 0,
    };
    ChatCompletionsClient::from_config(&config, "test-key").unwrap()
}

fn transcript() -> Vec<Message> {
    vec![Message::system("be brief"), Message::user("hi")]
}

#[tokio::test]
async fn success_returns_extracted_content() {
    let endpoint = serve(vec![Reply::ok("<think>hmm</think>\nHello there.")]).await;
    let client = client(&endpoint.url);

    let reply = client.chat(&transcript()).await;

    assert_eq!(reply, "Hello there.");
    assert_eq!(endpoint.hits.load(Ordering::SeqCst), 1);

    let requests = endpoint.requests.lock().unwrap();
    let (head, body) = &requests[0];
    assert!(head.to_lowercase().contains("authorization: bearer test-key"));
    assert_eq!(body["model"], "qwen-qwq-32b");
    assert_eq!(body["messages"][1]["content"], "hi");
    assert_eq!(body["stream"], false);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let endpoint = serve(vec![
        Reply::error(500),
        Reply::error(503),
        Reply::ok("third time lucky"),
    ])
    .await;
    let client = client(&endpoint.url);

    assert_eq!(client.chat(&transcript()).await, "third time lucky");
    assert_eq!(endpoint.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retries_return_fallback() {
    let endpoint = serve(vec![Reply::error(500)]).await;
    let client = client(&endpoint.url);

    assert_eq!(client.chat(&transcript()).await, FALLBACK_REPLY);
    assert_eq!(endpoint.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn undecodable_body_is_not_retried() {
    let endpoint = serve(vec![Reply::raw("not json at all")]).await;
    let client = client(&endpoint.url);

    assert_eq!(client.chat(&transcript()).await, FALLBACK_REPLY);
    assert_eq!(endpoint.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn json_object_in_content_is_extracted() {
    let content = r#"Sure. {"mcptools":[{"server":"fs","tool":"save","arguments":{}}]} done"#;
    let endpoint = serve(vec![Reply::ok(content)]).await;
    let client = client(&endpoint.url);

    assert_eq!(
        client.chat(&transcript()).await,
        r#"{"mcptools":[{"server":"fs","tool":"save","arguments":{}}]}"#
    );
}

#[tokio::test]
async fn unreachable_endpoint_returns_fallback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{}/v1/chat/completions", addr));
    assert_eq!(client.chat(&transcript()).await, FALLBACK_REPLY);
}
