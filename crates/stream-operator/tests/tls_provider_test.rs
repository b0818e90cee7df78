//! Both HTTP stacks the operator builds (kube and the stream service client)
//! need a rustls crypto provider compiled in. A missing feature flag panics on
//! first use, so construct both here.

#[tokio::test]
async fn kube_client_initialises_tls() {
    let config = kube::Config {
        cluster_url: "https://localhost:6443".parse().unwrap(),
        default_namespace: "default".into(),
        root_cert: None,
        connect_timeout: None,
        read_timeout: None,
        write_timeout: None,
        accept_invalid_certs: true,
        auth_info: Default::default(),
        proxy_url: None,
        tls_server_name: None,
        disable_compression: false,
        headers: vec![],
    };

    assert!(
        kube::Client::try_from(config).is_ok(),
        "kube client failed to initialise TLS"
    );
}

#[test]
fn stream_client_accepts_https_endpoint() {
    let client = stream_api::KinesisClient::new("https://kinesis.us-west-2.amazonaws.com");
    assert!(client.is_ok(), "stream client failed to initialise TLS");
}
