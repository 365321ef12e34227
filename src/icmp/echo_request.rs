use crate::checksum::checksum;
use crate::icmp::SequenceNumber;
use crate::ping_error::{PingError, PingErrorKind, PingResult};
use crate::IpVersion;
use pnet_packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet_packet::icmp::{IcmpCode, IcmpTypes};
use pnet_packet::icmpv6::{Icmpv6Code, Icmpv6Packet, Icmpv6Types, MutableIcmpv6Packet};
use pnet_packet::Packet;
use rand::Rng;

pub const PAYLOAD_SIZE: usize = 56;
/// Bytes of ICMP data put on the wire per probe: echo header plus payload.
pub const PACKET_SIZE: usize = 8 + PAYLOAD_SIZE;

pub(crate) fn random_payload() -> [u8; PAYLOAD_SIZE] {
    let mut payload = [0u8; PAYLOAD_SIZE];
    rand::thread_rng().fill(&mut payload[..]);
    payload
}

pub(crate) fn new_echo_request(
    ip_version: IpVersion,
    identifier: u16,
    sequence_number: SequenceNumber,
    payload: &[u8],
) -> PingResult<Vec<u8>> {
    let package = match ip_version {
        IpVersion::V4 => new_icmpv4_package(identifier, sequence_number, payload),
        IpVersion::V6 => new_icmpv6_package(identifier, sequence_number, payload),
    };
    package.ok_or_else(|| PingError::new(PingErrorKind::Io, "could not create ICMP package"))
}

fn new_icmpv4_package(identifier: u16, sequence_number: SequenceNumber, payload: &[u8]) -> Option<Vec<u8>> {
    let buf = vec![0u8; EchoRequestPacket::minimum_packet_size() + payload.len()];
    let mut package = MutableEchoRequestPacket::owned(buf)?;
    package.set_icmp_type(IcmpTypes::EchoRequest);
    package.set_icmp_code(IcmpCode::new(0));
    package.set_identifier(identifier);
    package.set_sequence_number(sequence_number.into());
    package.set_payload(payload);

    package.set_checksum(0_u16);
    let checksum = checksum(package.packet());
    package.set_checksum(checksum);
    Some(package.packet().to_vec())
}

// The kernel fills in the ICMPv6 checksum, it covers a pseudo header we never see.
fn new_icmpv6_package(identifier: u16, sequence_number: SequenceNumber, payload: &[u8]) -> Option<Vec<u8>> {
    let mut body = Vec::with_capacity(4 + payload.len());
    body.extend_from_slice(&identifier.to_be_bytes());
    body.extend_from_slice(&u16::from(sequence_number).to_be_bytes());
    body.extend_from_slice(payload);

    let buf = vec![0u8; Icmpv6Packet::minimum_packet_size() + body.len()];
    let mut package = MutableIcmpv6Packet::owned(buf)?;
    package.set_icmpv6_type(Icmpv6Types::EchoRequest);
    package.set_icmpv6_code(Icmpv6Code::new(0));
    package.set_checksum(0_u16);
    package.set_payload(&body);
    Some(package.packet().to_vec())
}
