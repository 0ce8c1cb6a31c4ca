use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tylo_core::protocol::encode_frame;
use tylo_core::{DomainEvent, decode_frame};
use tylo_monitor::{BusConfig, Config, SinkConfig};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_device_and_log_config() {
    let file = write_config(
        r#"
        [monitor]
        namespace = "cabin"

        [bus]
        type = "device"
        path = "/dev/ttyAMA0"

        [sink]
        type = "log"

        [server]
        http_addr = "127.0.0.1:9000"
        "#,
    );

    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.monitor.namespace, "cabin");
    assert!(!config.monitor.publish_unknown);
    assert!(matches!(config.bus, BusConfig::Device { ref path } if *path == PathBuf::from("/dev/ttyAMA0")));
    assert!(matches!(config.sink, SinkConfig::Log));
    assert!(!config.decoder.experimental_codes);
    assert_eq!(config.server.http_addr.port(), 9000);
}

#[test]
fn loads_tcp_and_http_config() {
    let file = write_config(
        r#"
        [monitor]
        namespace = "sauna"
        publish_unknown = true

        [bus]
        type = "tcp"
        addr = "192.168.1.50:4001"

        [sink]
        type = "http"
        url = "http://localhost:8123/api/webhook/sauna"
        token = "secret"

        [decoder]
        experimental_codes = true

        [server]
        http_addr = "0.0.0.0:8082"
        "#,
    );

    let config = Config::load(file.path()).unwrap();

    assert!(config.monitor.publish_unknown);
    match config.bus {
        BusConfig::Tcp {
            addr,
            reconnect_max_secs,
        } => {
            assert_eq!(addr.port(), 4001);
            assert_eq!(reconnect_max_secs, 60);
        }
        other => panic!("expected tcp bus, got {other:?}"),
    }
    match config.sink {
        SinkConfig::Http {
            url,
            token,
            timeout_secs,
        } => {
            assert_eq!(url, "http://localhost:8123/api/webhook/sauna");
            assert_eq!(token.as_deref(), Some("secret"));
            assert_eq!(timeout_secs, 5);
        }
        other => panic!("expected http sink, got {other:?}"),
    }

    // the experimental decoder knows the state acknowledge
    let raw = encode_frame(&[0x40, 0x09, 0x71, 0x80, 0x00, 0x03, 0xc0, 0x00]);
    assert_eq!(
        config.decoder.decoder().decode_frame(&raw).into_event(),
        Some(DomainEvent::StateAcknowledge {
            light: true,
            heater: true,
        })
    );
    assert!(matches!(
        decode_frame(&raw).into_event(),
        Some(DomainEvent::RawUnknown { .. })
    ));
}

#[test]
fn rejects_unknown_bus_type() {
    let file = write_config(
        r#"
        [monitor]
        namespace = "sauna"

        [bus]
        type = "modbus"

        [sink]
        type = "log"

        [server]
        http_addr = "0.0.0.0:8082"
        "#,
    );

    assert!(Config::load(file.path()).is_err());
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(&dir.path().join("tylo-monitor.toml")).is_err());
}

#[test]
fn defaults() {
    let config = Config::default();

    assert_eq!(config.monitor.namespace, "sauna");
    assert!(!config.monitor.publish_unknown);
    assert!(matches!(config.bus, BusConfig::Device { .. }));
    assert!(matches!(config.sink, SinkConfig::Log));
    assert_eq!(config.server.http_addr.port(), 8082);
}

#[test]
fn example_config_parses() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tylo-monitor.example.toml");
    let config = Config::load(&path).unwrap();
    assert_eq!(config.monitor.namespace, "sauna");
}
