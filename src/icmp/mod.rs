mod echo_request;
pub(crate) use echo_request::{new_echo_request, random_payload};
pub use echo_request::{PACKET_SIZE, PAYLOAD_SIZE};

mod sequence_number;
pub use sequence_number::SequenceNumber;

mod socket;
pub use socket::raw_socket::RawSocket;
pub use socket::{IcmpSocket, ReceivedPacket};
#[cfg(test)]
pub(crate) use socket::tests;

mod ttl;
pub use ttl::Ttl;
