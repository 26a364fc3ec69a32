use socialql::engine::config::Config;
use socialql::{Client, Engine};

#[allow(dead_code)]
pub(crate) fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub(crate) fn load_config(config: &str) -> Config {
    Config::from_file(config).expect("Could not load test config file.")
}

#[allow(dead_code)]
pub(crate) fn test_engine(config: &str) -> Engine {
    Engine::new(load_config(config))
        .with_version("0.0.0-test".to_string())
        .build()
        .expect("Could not create socialql engine.")
}

// Rust's dead code detection seems not to process all integration test crates,
// leading to a false positive on this function.
#[allow(dead_code)]
pub(crate) fn test_client(config: &str) -> Client {
    Client::new_with_engine(test_engine(config), None)
}

/// Logs `client` in as the tutorial user with the given email
#[allow(dead_code)]
pub(crate) async fn login_as(client: &mut Client, email: &str) {
    let token = client
        .login(email, "123456")
        .await
        .expect("Expected tutorial login to succeed.");
    client.set_token(&token).expect("Expected a valid token.");
}
