use crate::icmp::{
    new_echo_request, random_payload, IcmpSocket, RawSocket, ReceivedPacket, SequenceNumber, PACKET_SIZE,
    PAYLOAD_SIZE,
};
use crate::ping_error::{PingError, PingResult};
use crate::{ProbeConfig, ProbeStatistics, StatisticsReport, StopCondition};
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

/// Upper bound of a single blocking wait, so a stop request is noticed promptly.
const WAIT_SLICE: Duration = Duration::from_millis(100);
const RECV_BUFFER_SIZE: usize = 1024;

/// Result of sending one echo request.
#[derive(Debug)]
pub enum ProbeOutcome {
    Reply(ProbeReply),
    Timeout(SequenceNumber),
    /// Waiting for readability failed.
    WaitFailed(io::Error),
    /// The socket was readable but reading failed or returned nothing.
    ReadFailed(io::Error),
    Stopped,
}

#[derive(Debug)]
pub struct ProbeReply {
    pub packet: ReceivedPacket,
    pub sequence_number: SequenceNumber,
    pub rtt: Duration,
}

enum WaitOutcome {
    Ready,
    TimedOut,
    Failed(io::Error),
    Stopped,
}

/// One ping session against one destination. Owns the socket and the statistics.
pub struct ProbeSession<S, W> {
    config: ProbeConfig,
    socket: S,
    destination: socket2::SockAddr,
    identifier: u16,
    payload: [u8; PAYLOAD_SIZE],
    statistics: ProbeStatistics,
    stop_condition: StopCondition,
    out: W,
}

impl<W: Write> ProbeSession<RawSocket, W> {
    /// Parses the destination and opens the raw socket for the configured IP version.
    pub fn open(config: ProbeConfig, stop_condition: StopCondition, out: W) -> PingResult<Self> {
        let ip_addr = config.ip_version.parse_address(&config.address)?;
        let socket = RawSocket::new(config.ip_version).map_err(|e| PingError::from_socket_error(&e))?;
        Ok(Self::with_socket(config, ip_addr, socket, stop_condition, out))
    }
}

impl<S, W> ProbeSession<S, W>
where
    S: IcmpSocket,
    W: Write,
{
    pub fn with_socket(
        config: ProbeConfig,
        ip_addr: IpAddr,
        socket: S,
        stop_condition: StopCondition,
        out: W,
    ) -> Self {
        #[allow(clippy::cast_possible_truncation)] // ICMP identifiers are 16 bits wide
        let identifier = std::process::id() as u16;
        ProbeSession {
            config,
            socket,
            destination: SocketAddr::new(ip_addr, 0).into(),
            identifier,
            payload: random_payload(),
            statistics: ProbeStatistics::new(),
            stop_condition,
            out,
        }
    }

    pub fn statistics(&self) -> &ProbeStatistics {
        &self.statistics
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn report(&self) -> StatisticsReport<'_> {
        StatisticsReport { address: &self.config.address, statistics: &self.statistics, timeout: self.config.timeout }
    }

    /// Probes until the configured count is reached or a stop is requested, then prints the summary.
    pub fn run(&mut self) -> PingResult<()> {
        writeln!(self.out, "Pinging {} with {} bytes of data:", self.config.address, PACKET_SIZE)?;
        tracing::debug!(
            identifier = self.identifier,
            count = self.config.count,
            flood = self.config.flood,
            "session start"
        );

        let mut sequence_number = SequenceNumber::start_value();
        while self.config.has_probes_left(self.statistics.sent()) && !self.stop_condition.get_should_stop() {
            let outcome = self.probe(sequence_number)?;
            self.print_outcome(&outcome)?;
            sequence_number = sequence_number.next();

            let pause = matches!(outcome, ProbeOutcome::Reply(_))
                && !self.config.flood
                && self.config.has_probes_left(self.statistics.sent());
            if pause && self.stop_condition.wait_timeout(self.config.interval) {
                tracing::debug!("stop requested during pause");
            }
        }

        let report = self.report().to_string();
        write!(self.out, "{report}")?;
        self.out.flush()?;
        Ok(())
    }

    /// Sends one echo request and waits for whatever arrives next.
    pub fn probe(&mut self, sequence_number: SequenceNumber) -> PingResult<ProbeOutcome> {
        let package = new_echo_request(self.config.ip_version, self.identifier, sequence_number, &self.payload)?;

        let start_time = Instant::now();
        if let Err(e) = self.socket.send_to(&package, &self.destination) {
            tracing::debug!("send of icmp_seq {} failed: {}", sequence_number, e);
        }
        self.statistics.record_sent();
        tracing::trace!("icmp_seq {} sent", sequence_number);

        match self.wait_for_reply() {
            WaitOutcome::Ready => {}
            WaitOutcome::TimedOut => return Ok(ProbeOutcome::Timeout(sequence_number)),
            WaitOutcome::Failed(e) => return Ok(ProbeOutcome::WaitFailed(e)),
            WaitOutcome::Stopped => return Ok(ProbeOutcome::Stopped),
        }

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let outcome = match self.socket.recv(&mut buf) {
            Ok(packet) if packet.size > 0 => {
                let rtt = start_time.elapsed();
                self.statistics.record_reply(rtt.as_secs_f64() * 1000.0);
                ProbeOutcome::Reply(ProbeReply { packet, sequence_number, rtt })
            }
            Ok(_) => ProbeOutcome::ReadFailed(io::Error::new(io::ErrorKind::UnexpectedEof, "no data received")),
            Err(e) => ProbeOutcome::ReadFailed(e),
        };
        Ok(outcome)
    }

    fn wait_for_reply(&self) -> WaitOutcome {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            if self.stop_condition.get_should_stop() {
                return WaitOutcome::Stopped;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut;
            }
            match self.socket.wait_readable((deadline - now).min(WAIT_SLICE)) {
                Ok(true) => return WaitOutcome::Ready,
                Ok(false) => {}
                Err(e) => return WaitOutcome::Failed(e),
            }
        }
    }

    fn print_outcome(&mut self, outcome: &ProbeOutcome) -> io::Result<()> {
        match outcome {
            ProbeOutcome::Reply(ProbeReply { packet, sequence_number, rtt }) => {
                let ttl = packet.ttl.map_or_else(|| "?".to_string(), |ttl| ttl.to_string());
                writeln!(
                    self.out,
                    "{} bytes from {}: icmp_seq={} ttl={} time={:.2} ms",
                    packet.size,
                    self.config.address,
                    sequence_number,
                    ttl,
                    rtt.as_secs_f64() * 1000.0
                )?;
                if Some(packet.source) != self.destination_ip() {
                    tracing::debug!("reply came from {} instead of {}", packet.source, self.config.address);
                }
            }
            ProbeOutcome::Timeout(sequence_number) => {
                writeln!(self.out, "Request timeout for icmp_seq {sequence_number}")?;
            }
            ProbeOutcome::WaitFailed(e) => {
                tracing::debug!("waiting for reply failed: {}", e);
                eprintln!("poll: {e}");
            }
            ProbeOutcome::ReadFailed(e) => {
                tracing::debug!("reading reply failed: {}", e);
                eprintln!("recvfrom: {e}");
            }
            ProbeOutcome::Stopped => {
                tracing::debug!("stop requested while waiting for reply");
            }
        }
        Ok(())
    }

    fn destination_ip(&self) -> Option<IpAddr> {
        self.destination.as_socket().map(|addr| addr.ip())
    }
}
