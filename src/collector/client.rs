use anyhow::Context;
use reqwest::{Certificate, Client, Identity};

use crate::config::GoRuntimeConfig;

/// Installs `ring` as the process-wide rustls provider.
///
/// rustls >= 0.23 refuses to pick a provider on its own when more
/// than one backend is compiled in. Later calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Builds the HTTP client shared by every endpoint task.
///
/// Proxy settings are taken from the environment (reqwest default).
/// The request timeout bounds each fetch, including a peer that
/// accepts the connection and never answers. A zero timeout means
/// no limit.
pub async fn build_client(cfg: &GoRuntimeConfig) -> anyhow::Result<Client> {
    install_crypto_provider();

    let tls = &cfg.tls;

    let mut builder = Client::builder()
        .user_agent(concat!("goruntime-collector/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(tls.insecure_skip_verify);

    if !cfg.timeout.is_zero() {
        builder = builder.timeout(cfg.timeout);
    }

    if let Some(ca) = &tls.tls_ca {
        let pem = tokio::fs::read(ca)
            .await
            .with_context(|| format!("reading tls_ca {}", ca.display()))?;
        let cert = Certificate::from_pem(&pem)
            .with_context(|| format!("parsing tls_ca {}", ca.display()))?;
        builder = builder.add_root_certificate(cert);
    }

    if let (Some(cert), Some(key)) = (&tls.tls_cert, &tls.tls_key) {
        let mut pem = tokio::fs::read(cert)
            .await
            .with_context(|| format!("reading tls_cert {}", cert.display()))?;
        pem.push(b'\n');
        pem.extend(
            tokio::fs::read(key)
                .await
                .with_context(|| format!("reading tls_key {}", key.display()))?,
        );
        let identity = Identity::from_pem(&pem).context("parsing client certificate/key")?;
        builder = builder.identity(identity);
    }

    builder.build().context("building HTTP client")
}
