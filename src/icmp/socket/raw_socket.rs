use super::{IcmpSocket, ReceivedPacket};
use crate::icmp::Ttl;
use crate::IpVersion;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use socket2::{Domain, Protocol, Type};
use std::mem::{self, MaybeUninit};
use std::net::{IpAddr, Ipv6Addr};
use std::os::unix::io::AsRawFd;
use std::{io, ptr, time::Duration};

const IPV6_HEADER_LEN: usize = 40;

/// Room for a handful of control messages; only the hop limit is asked for.
#[repr(C, align(8))]
struct ControlBuffer([u8; 64]);

pub struct RawSocket {
    socket: socket2::Socket,
    ip_version: IpVersion,
}

impl RawSocket {
    pub fn new(ip_version: IpVersion) -> Result<Self, io::Error> {
        let (domain, protocol) = match ip_version {
            IpVersion::V4 => (Domain::IPV4, Protocol::ICMPV4),
            IpVersion::V6 => (Domain::IPV6, Protocol::ICMPV6),
        };
        tracing::trace!("creating raw {} socket", ip_version);
        let socket = socket2::Socket::new(domain, Type::RAW, Some(protocol))?;
        if ip_version == IpVersion::V6 {
            // The kernel strips the IPv6 header; ask for the hop limit as ancillary data instead.
            enable_hop_limit_reporting(&socket)?;
        }
        Ok(RawSocket { socket, ip_version })
    }

    fn recv_ipv6(&self, buf: &mut [u8]) -> io::Result<ReceivedPacket> {
        let mut iov = libc::iovec { iov_base: buf.as_mut_ptr().cast(), iov_len: buf.len() };
        // SAFETY: all-zero is a valid `sockaddr_in6` and `msghdr`.
        let mut source: libc::sockaddr_in6 = unsafe { mem::zeroed() };
        let mut msg: libc::msghdr = unsafe { mem::zeroed() };
        let mut control = ControlBuffer([0; 64]);
        #[allow(clippy::cast_possible_truncation)]
        let namelen = mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t;
        msg.msg_namelen = namelen;
        msg.msg_controllen = mem::size_of::<ControlBuffer>() as _;
        msg.msg_name = ptr::addr_of_mut!(source).cast();
        msg.msg_iov = ptr::addr_of_mut!(iov);
        msg.msg_iovlen = 1;
        msg.msg_control = ptr::addr_of_mut!(control).cast();

        // SAFETY: every pointer in `msg` refers to a live local or to `buf`, with matching lengths.
        let n = unsafe { libc::recvmsg(self.socket.as_raw_fd(), &mut msg, 0) };
        let n = usize::try_from(n).map_err(|_| io::Error::last_os_error())?;
        let source = IpAddr::V6(Ipv6Addr::from(source.sin6_addr.s6_addr));
        // SAFETY: `msg` was filled by `recvmsg` and its control buffer is still alive.
        let hop_limit = unsafe { hop_limit_from_control(&msg) };
        if hop_limit.is_none() {
            tracing::debug!("reply from {} carried no hop limit", source);
        }
        Ok(parse_ipv6_datagram(&buf[..n], source, hop_limit))
    }
}

fn enable_hop_limit_reporting(socket: &socket2::Socket) -> io::Result<()> {
    let enable: libc::c_int = 1;
    #[allow(clippy::cast_possible_truncation)]
    let len = mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: the option value points to a live `c_int` of the given length.
    let result = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_IPV6,
            libc::IPV6_RECVHOPLIMIT,
            ptr::addr_of!(enable).cast(),
            len,
        )
    };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Finds the `IPV6_HOPLIMIT` control message.
///
/// # Safety
///
/// `msg.msg_control` must point to `msg.msg_controllen` readable bytes holding
/// well-formed control messages, as left by `recvmsg`.
unsafe fn hop_limit_from_control(msg: &libc::msghdr) -> Option<u8> {
    let mut cmsg = libc::CMSG_FIRSTHDR(msg);
    while !cmsg.is_null() {
        if (*cmsg).cmsg_level == libc::IPPROTO_IPV6 && (*cmsg).cmsg_type == libc::IPV6_HOPLIMIT {
            let hop_limit = ptr::read_unaligned(libc::CMSG_DATA(cmsg).cast::<libc::c_int>());
            return u8::try_from(hop_limit).ok();
        }
        cmsg = libc::CMSG_NXTHDR(msg, cmsg);
    }
    None
}

impl IcmpSocket for RawSocket {
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        self.socket.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
        // Peeking a single byte leaves the datagram queued for `recv`.
        let mut probe = [MaybeUninit::<u8>::uninit(); 1];
        match self.socket.peek(&mut probe) {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => Ok(false),
            // A signal landed on this thread; the caller re-checks whether it should stop.
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<ReceivedPacket> {
        if self.ip_version == IpVersion::V6 {
            return self.recv_ipv6(buf);
        }
        // Socket2 gives a safety guaranty which allows us to do an unsafe cast from `&mut [u8]`
        // to `&mut [std::mem::MaybeUninit<u8>]`: it never writes uninitialized bytes.
        // https://docs.rs/socket2/0.4.7/socket2/struct.Socket.html#method.recv
        let (n, socket_addr) = self.socket.recv_from(unsafe {
            &mut *(std::ptr::addr_of_mut!(*buf) as *mut [std::mem::MaybeUninit<u8>])
        })?;
        let source = socket_addr
            .as_socket()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "reply from a non-IP address"))?
            .ip();
        Ok(parse_ipv4_datagram(&buf[..n], source))
    }
}

/// On a raw IPv4 socket we get the whole IP packet.
pub(crate) fn parse_ipv4_datagram(datagram: &[u8], source: IpAddr) -> ReceivedPacket {
    match Ipv4Packet::new(datagram) {
        Some(ipv4_packet) => {
            let header_len = usize::from(ipv4_packet.get_header_length()) * 4;
            ReceivedPacket {
                size: datagram.len().saturating_sub(header_len),
                source,
                ttl: Some(Ttl::from(ipv4_packet.get_ttl())),
            }
        }
        None => {
            tracing::warn!("received {} bytes, too short for an IPv4 header", datagram.len());
            ReceivedPacket { size: datagram.len(), source, ttl: None }
        }
    }
}

/// Linux strips the IPv6 header on raw ICMPv6 sockets, so the hop limit usually comes from
/// the `IPV6_HOPLIMIT` control message. A header, when present, takes precedence.
pub(crate) fn parse_ipv6_datagram(datagram: &[u8], source: IpAddr, hop_limit: Option<u8>) -> ReceivedPacket {
    let ipv6_packet = Ipv6Packet::new(datagram).filter(|packet| packet.get_version() == 6);
    match ipv6_packet {
        Some(ipv6_packet) if datagram.len() > IPV6_HEADER_LEN => ReceivedPacket {
            size: datagram.len() - IPV6_HEADER_LEN,
            source,
            ttl: Some(Ttl::from(ipv6_packet.get_hop_limit())),
        },
        _ => ReceivedPacket { size: datagram.len(), source, ttl: hop_limit.map(Ttl::from) },
    }
}
