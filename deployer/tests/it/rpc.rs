use std::sync::{Arc, Mutex};

use mockito::{Mock, ServerGuard};
use serde_json::{Value, json};
use url::Url;

type Handler = dyn Fn(&str, &[Value]) -> Result<Value, String> + Send + Sync;

/// A JSON-RPC node answering every call through `handler`. Records the parameters
/// of each request by method.
pub struct MockNode {
    server: ServerGuard,
    _mock: Mock,
    requests: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
}

impl MockNode {
    pub async fn start(
        handler: impl Fn(&str, &[Value]) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        let handler: Arc<Handler> = Arc::new(handler);
        let requests = Arc::new(Mutex::new(vec![]));
        let mut server = mockito::Server::new_async().await;

        let recorded = requests.clone();
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |request| {
                let body: Value = serde_json::from_slice(request.body().unwrap()).unwrap();
                let method = body["method"].as_str().unwrap().to_owned();
                let params = body["params"].as_array().cloned().unwrap_or_default();
                recorded
                    .lock()
                    .unwrap()
                    .push((method.clone(), params.clone()));

                let response = match handler(&method, &params) {
                    Ok(result) => json!({ "jsonrpc": "2.0", "id": body["id"], "result": result }),
                    Err(message) => json!({
                        "jsonrpc": "2.0",
                        "id": body["id"],
                        "error": { "code": -32601, "message": message },
                    }),
                };
                response.to_string().into_bytes()
            })
            .create_async()
            .await;

        Self {
            server,
            _mock: mock,
            requests,
        }
    }

    pub fn url(&self) -> Url {
        self.server.url().parse().unwrap()
    }

    /// Parameters of every `method` call, oldest first.
    pub fn requests(&self, method: &str) -> Vec<Vec<Value>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}
