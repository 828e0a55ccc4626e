//! Packets over an in-memory duplex pipe using the tokio codec.
//!
//! Run with:
//!   cargo run --example async-loopback --features async

use buspacket::frame::{BusCodec, EcfFlag, Packet, PacketType};
use futures_util::{SinkExt, StreamExt};
use tokio_util::codec::Framed;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (ground, onboard) = tokio::io::duplex(1024);
    let mut ground = Framed::new(ground, BusCodec::default());
    let mut onboard = Framed::new(onboard, BusCodec::default());

    let command = Packet::new(PacketType::Tc, 12, EcfFlag::Present, b"deploy-antenna")?;
    ground.send(command).await?;

    if let Some(received) = onboard.next().await {
        let received = received?;
        eprintln!(
            "onboard got TC apid={} payload={:?}",
            received.apid(),
            String::from_utf8_lossy(received.payload())
        );

        let ack = Packet::new(PacketType::Tm, received.apid(), EcfFlag::Present, b"ack")?;
        onboard.send(ack).await?;
    }

    if let Some(reply) = ground.next().await {
        let reply = reply?;
        eprintln!("ground got TM apid={} length={}", reply.apid(), reply.length());
    }

    Ok(())
}
