//! Datagram transport — OSC over UDP.
//!
//! The dashboard never blocks on the network: `recv` waits at most the
//! given duration for a first datagram, then drains whatever else is
//! already queued. Datagrams that fail to decode are logged and dropped;
//! loss is acceptable on this channel.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use rosc::{OscPacket, OscType};
use tokio::net::UdpSocket;
use tracing::warn;

use crate::error::DashResult;
use crate::value::Value;

/// Largest datagram we accept.
const MAX_DATAGRAM: usize = 65_536;
/// Datagrams drained per `recv` after the first, so input stays responsive.
const DRAIN_LIMIT: usize = 256;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub address: String,
    pub args: Vec<Value>,
}

impl Message {
    pub fn new(address: &str, args: Vec<Value>) -> Self {
        Self {
            address: address.to_string(),
            args,
        }
    }
}

/// Source of inbound messages.
#[async_trait]
pub trait Transport: Send {
    /// Wait up to `wait` for messages. An empty batch means the wait elapsed.
    async fn recv(&mut self, wait: Duration) -> DashResult<Vec<Message>>;
}

pub struct UdpTransport {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Listen on all interfaces. Port 0 picks a free port.
    pub async fn bind(port: u16) -> DashResult<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        Ok(Self {
            socket,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> DashResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn recv(&mut self, wait: Duration) -> DashResult<Vec<Message>> {
        let mut out = Vec::new();
        let n = match tokio::time::timeout(wait, self.socket.recv_from(&mut self.buf)).await {
            Err(_elapsed) => return Ok(out),
            Ok(result) => result?.0,
        };
        decode_into(&self.buf[..n], &mut out);

        for _ in 0..DRAIN_LIMIT {
            match self.socket.try_recv_from(&mut self.buf) {
                Ok((n, _)) => decode_into(&self.buf[..n], &mut out),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }
}

/// Decode one datagram, appending every message it carries.
pub fn decode_into(datagram: &[u8], out: &mut Vec<Message>) {
    match rosc::decoder::decode_udp(datagram) {
        Ok((_, packet)) => flatten(packet, out),
        Err(e) => warn!(error = ?e, len = datagram.len(), "dropping undecodable datagram"),
    }
}

fn flatten(packet: OscPacket, out: &mut Vec<Message>) {
    match packet {
        OscPacket::Message(msg) => out.push(Message {
            address: msg.addr,
            args: msg.args.into_iter().map(to_value).collect(),
        }),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}

fn to_value(arg: OscType) -> Value {
    match arg {
        OscType::Int(i) => Value::Int(i as i64),
        OscType::Long(i) => Value::Int(i),
        OscType::Float(x) => Value::Float(x as f64),
        OscType::Double(x) => Value::Float(x),
        OscType::String(s) => Value::Text(s),
        OscType::Char(c) => Value::Text(c.to_string()),
        OscType::Bool(b) => Value::Int(b as i64),
        OscType::Nil => Value::Text("nil".into()),
        OscType::Inf => Value::Float(f64::INFINITY),
        other => Value::Text(format!("{other:?}")),
    }
}
