use super::browser::resolve_device;
use crate::registry::{MemoryStore, PairedRegistry};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

fn service_info(instance: &str, ip: &str, port: u16, txt: &[(&str, &str)]) -> mdns_sd::ServiceInfo {
    let properties: HashMap<String, String> = txt
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    mdns_sd::ServiceInfo::new(
        super::SERVICE_TYPE,
        instance,
        "tv-host.local.",
        ip,
        port,
        properties,
    )
    .expect("valid service info")
}

#[test]
fn resolve_extracts_name_address_and_txt_keys() {
    let info = service_info(
        "LivingRoomTV",
        "192.0.2.10",
        6466,
        &[("mn", "Bravia"), ("md", "Sony")],
    );

    let device = resolve_device(&info, None).unwrap();
    assert_eq!(device.name, "LivingRoomTV");
    assert_eq!(device.ip, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)));
    assert_eq!(device.command_port, 6466);
    assert_eq!(device.pairing_port, 6467);
    assert_eq!(device.model_name.as_deref(), Some("Bravia"));
    assert_eq!(device.manufacturer.as_deref(), Some("Sony"));
    assert!(!device.paired);
}

#[test]
fn resolve_without_txt_keys() {
    let info = service_info("BareTV", "192.0.2.20", 6466, &[]);
    let device = resolve_device(&info, None).unwrap();
    assert_eq!(device.model_name, None);
    assert_eq!(device.manufacturer, None);
}

#[test]
fn resolve_marks_paired_devices() {
    let registry = Arc::new(PairedRegistry::new(Box::new(MemoryStore::new())).unwrap());
    registry
        .add(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)))
        .unwrap();

    let info = service_info("LivingRoomTV", "192.0.2.10", 6466, &[]);
    let device = resolve_device(&info, Some(&registry)).unwrap();
    assert!(device.paired);

    let other = service_info("OtherTV", "192.0.2.11", 6466, &[]);
    let device = resolve_device(&other, Some(&registry)).unwrap();
    assert!(!device.paired);
}

#[test]
fn devices_deduplicate_by_address() {
    let a = resolve_device(&service_info("TV", "192.0.2.10", 6466, &[]), None).unwrap();
    let b = resolve_device(
        &service_info("TV-renamed", "192.0.2.10", 6466, &[("mn", "Bravia")]),
        None,
    )
    .unwrap();

    // equality is by ip, so a list keyed on the device itself dedupes
    assert_eq!(a, b);
}
