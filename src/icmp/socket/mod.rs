use crate::icmp::Ttl;
use std::net::IpAddr;
use std::{io, time::Duration};

pub(crate) mod raw_socket;

/// What a read from an ICMP socket yields once the network-layer header is stripped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReceivedPacket {
    /// Length of the ICMP message.
    pub size: usize,
    pub source: IpAddr,
    /// `None` when the network-layer header was not delivered with the message.
    pub ttl: Option<Ttl>,
}

pub trait IcmpSocket {
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize>;

    /// Blocks until a message can be read or `timeout` elapses, returning whether one is ready.
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool>;

    fn recv(&self, buf: &mut [u8]) -> io::Result<ReceivedPacket>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use crate::StopCondition;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;

    /// Scripted behaviour of the mock for one probe, consumed when the probe is sent.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub(crate) enum OnProbe {
        Reply { ttl: u8 },
        Timeout,
        WaitError,
        ReadError,
        EmptyRead,
        /// Stops the session while it waits for the reply.
        Interrupt,
    }

    type VecOfBuffersAndAddresses = Arc<Mutex<Vec<(Vec<u8>, IpAddr)>>>;

    #[derive(Clone)]
    pub(crate) struct SocketMock {
        script: Arc<Mutex<VecDeque<OnProbe>>>,
        current: Arc<Mutex<Option<OnProbe>>>,
        sent: VecOfBuffersAndAddresses,
        received_cnt: Arc<Mutex<u16>>,
        stop_condition: Option<StopCondition>,
    }

    impl SocketMock {
        pub(crate) fn new(script: &[OnProbe]) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.iter().copied().collect())),
                current: Arc::new(Mutex::new(None)),
                sent: Arc::new(Mutex::new(vec![])),
                received_cnt: Arc::new(Mutex::new(0)),
                stop_condition: None,
            }
        }

        pub(crate) fn with_stop_condition(mut self, stop_condition: StopCondition) -> Self {
            self.stop_condition = Some(stop_condition);
            self
        }

        pub(crate) fn sent_packets(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().iter().map(|(buf, _)| buf.clone()).collect()
        }

        pub(crate) fn should_send_number_of_messages(&self, n: usize) -> &Self {
            assert_eq!(n, self.sent.lock().unwrap().len());
            self
        }

        pub(crate) fn should_send_to_address(&self, addr: &IpAddr) -> &Self {
            assert!(self.sent.lock().unwrap().iter().all(|e| *addr == e.1));
            self
        }

        pub(crate) fn should_receive_number_of_messages(&self, n: u16) -> &Self {
            assert_eq!(n, *self.received_cnt.lock().unwrap());
            self
        }
    }

    impl IcmpSocket for SocketMock {
        fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize> {
            // An exhausted script behaves like a silent host.
            let on_probe = self.script.lock().unwrap().pop_front().unwrap_or(OnProbe::Timeout);
            *self.current.lock().unwrap() = Some(on_probe);
            self.sent.lock().unwrap().push((
                buf.to_vec(),
                addr.as_socket()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "error in extracting IP address from SockAddr"))?
                    .ip(),
            ));
            Ok(buf.len())
        }

        fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
            let on_probe = *self.current.lock().unwrap();
            match on_probe {
                Some(OnProbe::Reply { .. } | OnProbe::ReadError | OnProbe::EmptyRead) => Ok(true),
                Some(OnProbe::WaitError) => Err(io::Error::new(io::ErrorKind::Other, "simulating poll error in mock")),
                Some(OnProbe::Interrupt) => {
                    if let Some(stop_condition) = &self.stop_condition {
                        stop_condition.set_should_stop();
                    }
                    Ok(false)
                }
                Some(OnProbe::Timeout) | None => {
                    std::thread::sleep(timeout);
                    Ok(false)
                }
            }
        }

        fn recv(&self, buf: &mut [u8]) -> io::Result<ReceivedPacket> {
            let on_probe = self.current.lock().unwrap().take();
            let ttl = match on_probe {
                Some(OnProbe::Reply { ttl }) => ttl,
                Some(OnProbe::EmptyRead) => {
                    return Ok(ReceivedPacket { size: 0, source: "127.0.0.1".parse().unwrap(), ttl: None });
                }
                _ => return Err(io::Error::new(io::ErrorKind::Other, "simulating read error in mock")),
            };

            let (request, source) = self.sent.lock().unwrap().last().cloned().expect("reply without request");
            if buf.len() < request.len() {
                return Err(io::Error::new(io::ErrorKind::Other, "buffer too small"));
            }
            // Echo the request back as the reply.
            buf[..request.len()].copy_from_slice(&request);
            buf[0] = 0;
            *self.received_cnt.lock().unwrap() += 1;

            Ok(ReceivedPacket { size: request.len(), source, ttl: Some(Ttl(ttl)) })
        }
    }
}
