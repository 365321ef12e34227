#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub use checksum::checksum;
pub use config::*;
pub use icmp::{IcmpSocket, RawSocket, ReceivedPacket, SequenceNumber, Ttl, PACKET_SIZE, PAYLOAD_SIZE};
pub use ping_error::{PingError, PingErrorKind, PingResult};
pub use probe_session::{ProbeOutcome, ProbeReply, ProbeSession};
pub use statistics::{ProbeStatistics, StatisticsReport};
pub use stop_condition::StopCondition;

mod checksum;
mod config;
mod icmp;
mod ping_error;
mod probe_session;
mod statistics;
mod stop_condition;
