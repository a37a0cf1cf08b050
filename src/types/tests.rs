use super::keycode;
use super::{COMMAND_PORT, PAIRING_PORT, RemoteConfig, TvDevice};
use std::net::{IpAddr, Ipv4Addr};

#[test]
fn device_equality_is_by_address() {
    let mut a = TvDevice::from_ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)));
    let b = TvDevice::from_ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)));
    let c = TvDevice::from_ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 11)));

    a.name = "Living Room TV".to_string();
    a.model_name = Some("Bravia".to_string());

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn device_defaults_use_protocol_ports() {
    let device = TvDevice::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(device.pairing_port, PAIRING_PORT);
    assert_eq!(device.command_port, COMMAND_PORT);
    assert!(!device.paired);
}

#[test]
fn display_name_prefers_model() {
    let mut device = TvDevice::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
    device.name = "instance".to_string();
    assert_eq!(device.display_name(), "instance");
    device.model_name = Some("Bravia".to_string());
    assert_eq!(device.display_name(), "Bravia");
}

#[test]
fn config_defaults_match_protocol_timeouts() {
    let config = RemoteConfig::default();
    assert_eq!(config.pairing_connect_timeout.as_secs(), 10);
    assert_eq!(config.pairing_code_timeout.as_secs(), 300);
    assert_eq!(config.connect_timeout.as_secs(), 5);
    assert_eq!(config.connect_attempts, 3);
    assert_eq!(config.reconnect_delay.as_millis(), 500);
}

#[test]
fn builder_overrides() {
    let config = RemoteConfig::builder()
        .client_name("test-host")
        .app_id("example")
        .connect_attempts(1)
        .build();
    assert_eq!(config.resolved_client_name(), "test-host");
    assert_eq!(config.app_id, "example");
    assert_eq!(config.connect_attempts, 1);
}

#[test]
fn digit_keycodes() {
    assert_eq!(keycode::digit(0), Some(keycode::DIGIT_0));
    assert_eq!(keycode::digit(9), Some(keycode::DIGIT_9));
    assert_eq!(keycode::digit(10), None);
}
