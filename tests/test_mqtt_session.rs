mod common;
use common::*;

use sungrow_bridge::mqtt::Mqtt;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

/// What the broker does with the first session after sending CONNACK.
/// Later sessions are always held open.
#[derive(Clone, Copy)]
enum FirstSession {
    Close,
    CloseAfterOnePacket,
}

async fn serve(mut stream: TcpStream, first: Option<FirstSession>) {
    let mut buf = [0u8; 1024];

    if !matches!(stream.read(&mut buf).await, Ok(n) if n > 0) {
        return;
    }
    if stream.write_all(&CONNACK).await.is_err() {
        return;
    }

    match first {
        Some(FirstSession::Close) => {}
        Some(FirstSession::CloseAfterOnePacket) => {
            let _ = stream.read(&mut buf).await;
        }
        None => loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        },
    }
}

async fn broker(first: FirstSession) -> (u16, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let sessions = Arc::new(AtomicUsize::new(0));

    let counter = sessions.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let behaviour = if n == 0 { Some(first) } else { None };
            tokio::spawn(serve(stream, behaviour));
        }
    });

    (port, sessions)
}

fn client(port: u16) -> Mqtt {
    let mut config = Factory::config();
    config.mqtt.host = "127.0.0.1".to_owned();
    config.mqtt.port = port;
    config.mqtt.timeout_ms = Some(2000);
    Mqtt::new(&config.mqtt)
}

#[tokio::test]
async fn connect_succeeds_even_if_online_message_is_lost() {
    common_setup();

    let (port, sessions) = broker(FirstSession::Close).await;
    let mut mqtt = client(port);

    mqtt.connect().await.unwrap();
    assert_eq!(sessions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reconnects_after_the_broker_drops_the_session() {
    common_setup();

    let (port, sessions) = broker(FirstSession::CloseAfterOnePacket).await;
    let mut mqtt = client(port);

    mqtt.connect().await.unwrap();
    assert!(mqtt.is_connected());

    for _ in 0..50 {
        mqtt.service().await;
        if !mqtt.is_connected() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!mqtt.is_connected());

    mqtt.connect().await.unwrap();
    assert!(mqtt.is_connected());
    assert_eq!(sessions.load(Ordering::SeqCst), 2);

    let message = Message::for_metric("home/solar/sungrow", &REGISTERS[0], 10.0, true);
    mqtt.publish(&message).await.unwrap();
}
