use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

/// Status and body of one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Plain GET client for endpoints published on the loopback interface.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("imagecheck/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }

    pub fn get(&self, port: u16, path: &str) -> Result<HttpResponse> {
        let url = url_for(port, path);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("GET {url}"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("reading body of {url}"))?;
        Ok(HttpResponse { status, body })
    }
}

pub fn url_for(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{port}{path}")
}

/// Whether something accepts TCP connections on the loopback port.
pub fn port_open(port: u16, timeout: Duration) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    TcpStream::connect_timeout(&addr, timeout).is_ok()
}
