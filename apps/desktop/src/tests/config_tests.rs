use super::*;

#[test]
fn file_values_override_defaults() {
    let mut settings = ClientSettings::default();
    apply_file(
        &mut settings,
        r#"
node_url = "http://127.0.0.1:8080"
signer_url = "http://127.0.0.1:9000"
confirmation_timeout_secs = 45
"#,
    );

    assert_eq!(settings.node_url, "http://127.0.0.1:8080");
    assert_eq!(settings.signer_url.as_deref(), Some("http://127.0.0.1:9000"));
    assert_eq!(settings.confirmation_timeout_secs, 45);
    assert_eq!(settings.poll_interval_ms, 500);
}

#[test]
fn malformed_file_is_ignored() {
    let mut settings = ClientSettings::default();
    apply_file(&mut settings, "node_url = ");
    assert_eq!(settings, ClientSettings::default());
}

#[test]
fn env_overrides_use_app_prefix_and_skip_bad_numbers() {
    let mut settings = ClientSettings::default();
    apply_env(&mut settings, |key| match key {
        "APP__MODULE_ADDRESS" => Some("0x42".to_string()),
        "APP__POLL_INTERVAL_MS" => Some("fast".to_string()),
        "APP__CONNECT_TIMEOUT_SECS" => Some("0".to_string()),
        _ => None,
    });

    assert_eq!(settings.module_address, "0x42");
    assert_eq!(settings.poll_interval_ms, 500);
    assert_eq!(settings.connect_timeout_secs, Some(120));
}

#[test]
fn zero_durations_keep_defaults() {
    let mut settings = ClientSettings::default();
    apply_file(
        &mut settings,
        r#"
confirmation_timeout_secs = 0
poll_interval_ms = 0
connect_timeout_secs = 0
"#,
    );

    assert_eq!(settings.confirmation_timeout_secs, 20);
    assert_eq!(settings.poll_interval_ms, 500);
    assert_eq!(settings.connect_timeout_secs, Some(120));
}

#[test]
fn client_config_carries_timeouts_and_module() {
    let settings = ClientSettings {
        confirmation_timeout_secs: 7,
        connect_timeout_secs: Some(3),
        ..ClientSettings::default()
    };

    let config = settings.client_config().expect("config");

    assert_eq!(config.orchestrator.confirmation_timeout, Duration::from_secs(7));
    assert_eq!(config.connect_timeout, Some(Duration::from_secs(3)));
    assert_eq!(
        config.orchestrator.module_address.as_str(),
        DEFAULT_MODULE_ADDRESS
    );
}

#[test]
fn invalid_module_address_is_rejected() {
    let settings = ClientSettings {
        module_address: "not-an-address".into(),
        ..ClientSettings::default()
    };
    assert!(settings.client_config().is_err());
}
