//! Common test utilities and fixtures.

use std::net::TcpListener;
use std::time::Duration;

use reqwest::header::SET_COOKIE;
use reqwest::{redirect, Client, Response};
use spid_handshake::CorrelationStore;
use tokio::sync::oneshot;
use tokio::time::sleep;

use spid_server::{Server, ServerConfig};

/// Identity providers registered with the test server.
pub const REGISTRY: &str = r#"[
    {
        "name": "TestIdP",
        "entity_id": "https://idp.test.it",
        "authn_endpoint": "https://idp.test.it/sso",
        "logout_endpoint": "https://idp.test.it/slo"
    }
]"#;

/// Test environment that manages the configuration files and server.
pub struct TestEnv {
    /// Directory holding credential and registry files.
    _dir: tempfile::TempDir,
    /// Base URL of the running server.
    pub base_url: String,
    /// HTTP client for testing.
    pub client: Client,
    /// Store sharing the server's cookie secret.
    pub store: CorrelationStore,
    /// Public key matching the server's signing key.
    pub public_key_der: Vec<u8>,
    /// Server shutdown signal.
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestEnv {
    /// Writes fresh configuration files and starts a server.
    pub async fn new() -> anyhow::Result<Self> {
        // Initialize tracing for tests
        let _ = tracing_subscriber::fmt()
            .with_env_filter("spid_server=debug,spid_handshake=debug")
            .try_init();

        let dir = tempfile::tempdir()?;
        let key = spid_crypto::test_util::generate_rsa_key();
        std::fs::write(dir.path().join("sp.crt"), key.certificate_pem("sp.example.it"))?;
        std::fs::write(dir.path().join("sp.key"), key.private_key_pem())?;
        std::fs::write(dir.path().join("idps.json"), REGISTRY)?;

        // Find available port for server
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let server_port = listener.local_addr()?.port();
        drop(listener);

        let base_url = format!("http://127.0.0.1:{}", server_port);

        let mut config = ServerConfig::for_testing(dir.path());
        config.port = server_port;
        config.base_url = base_url.clone();

        let store = CorrelationStore::new(config.cookie_secret.expose(), config.cookie_ttl())?;

        let (_shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = Server::new(config)?;
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = server.run_until(shutdown).await {
                tracing::error!("Server error: {}", e);
            }
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(redirect::Policy::none())
            .build()?;

        wait_for_server(&client, &base_url).await?;

        Ok(Self {
            _dir: dir,
            base_url,
            client,
            store,
            public_key_der: key.public_key_der,
            _shutdown_tx,
        })
    }

    /// Sends a GET request, presenting `cookie` as the correlation cookie.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> anyhow::Result<Response> {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(cookie) = cookie {
            request = request.header("cookie", format!("SPID_COOKIE={cookie}"));
        }
        Ok(request.send().await?)
    }
}

/// Returns the `Set-Cookie` header of a response.
pub fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Extracts the cookie value from a `Set-Cookie` header.
pub fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("SPID_COOKIE="))
        .unwrap_or_default()
        .to_string()
}

/// Extracts the decoded `SAMLRequest` from an auto-submit form.
pub fn saml_request(html: &str) -> String {
    use base64::Engine;

    let marker = r#"name="SAMLRequest" value=""#;
    let start = html.find(marker).expect("SAMLRequest input") + marker.len();
    let end = start + html[start..].find('"').expect("closing quote");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&html[start..end])
        .expect("base64 SAMLRequest");
    String::from_utf8(bytes).expect("UTF-8 SAMLRequest")
}

async fn wait_for_server(client: &Client, base_url: &str) -> anyhow::Result<()> {
    for _ in 0..50 {
        if let Ok(response) = client.get(format!("{base_url}/health")).send().await {
            if response.status().is_success() {
                return Ok(());
            }
        }
        sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("server did not become ready at {base_url}")
}
