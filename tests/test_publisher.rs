mod common;
use common::*;

use sungrow_bridge::mqtt::Mqtt;

fn publisher(broker: Option<MockBroker>) -> (Publisher<MockInflux, MockBroker>, MockInflux) {
    let influx = MockInflux::default();
    let config = Factory::config();
    (Publisher::new(influx.clone(), broker, &config.mqtt), influx)
}

#[test]
fn message_formats_two_decimals() {
    common_setup();

    let spec = Factory::spec("Grid_frequency");

    let message = Message::for_metric("home/solar/sungrow", &spec, 49.987, true);
    assert_eq!(message.topic, "home/solar/sungrow/Grid_frequency");
    assert_eq!(message.payload, "49.99");
    assert!(message.retain);

    let message = Message::for_metric("ns", &spec, -100.0, false);
    assert_eq!(message.topic, "ns/Grid_frequency");
    assert_eq!(message.payload, "-100.00");
    assert!(!message.retain);
}

#[tokio::test]
async fn store_writes_a_point() {
    common_setup();

    let (mut publisher, influx) = publisher(None);
    let spec = Factory::spec("Daily_power");

    publisher.store(&spec, 12.5).await.unwrap();

    assert_eq!(
        influx.points(),
        vec![Point {
            measurement: "Daily power".to_owned(),
            sensor: "Sungrow-SG8K-D".to_owned(),
            value: 12.5,
        }]
    );
}

#[tokio::test]
async fn push_is_skipped_without_mqtt() {
    common_setup();

    let (mut publisher, _) = publisher(None);

    assert!(publisher.push(&REGISTERS[0], 1.0).await.is_none());
    assert!(publisher.maintain().await.is_none());
}

#[tokio::test]
async fn push_connects_first() {
    common_setup();

    let broker = MockBroker::default();
    let (mut publisher, _) = publisher(Some(broker.clone()));

    publisher.push(&REGISTERS[0], 1.0).await.unwrap().unwrap();

    assert_eq!(broker.connects(), 1);
    assert_eq!(broker.published().len(), 1);
    assert_eq!(broker.published()[0].payload, "1.00");
}

#[tokio::test]
async fn push_reports_one_error_when_refused() {
    common_setup();

    let broker = MockBroker::refusing();
    let (mut publisher, _) = publisher(Some(broker.clone()));

    let result = publisher.push(&REGISTERS[0], 1.0).await.unwrap();

    assert!(matches!(result, Err(Error::Broker(_))));
    assert!(broker.published().is_empty());
}

#[tokio::test]
async fn maintain_reconnects_dropped_session() {
    common_setup();

    let broker = MockBroker::default();
    let (mut publisher, _) = publisher(Some(broker.clone()));

    publisher.push(&REGISTERS[0], 1.0).await.unwrap().unwrap();
    assert!(publisher.maintain().await.is_none());

    broker.drop_session();
    publisher.maintain().await.unwrap().unwrap();
    assert_eq!(broker.connects(), 2);
    assert_eq!(broker.services(), 2);

    broker.drop_session();
    broker.set_refuse(true);
    assert!(publisher.maintain().await.unwrap().is_err());
}

#[tokio::test]
async fn mqtt_client_refuses_to_publish_before_connecting() {
    common_setup();

    let config = Factory::config();
    let mut mqtt = Mqtt::new(&config.mqtt);
    assert!(!mqtt.is_connected());

    let message = Message::for_metric("ns", &REGISTERS[0], 1.0, true);
    let err = mqtt.publish(&message).await.unwrap_err();
    assert!(err.to_string().contains("not connected"));

    // nothing to tear down
    mqtt.stop().await;
    mqtt.service().await;
}
