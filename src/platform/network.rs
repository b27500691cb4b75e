//! Network capability: address resolution, TCP and UDP sockets, and a
//! millisecond-timeout readiness select.

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs, UdpSocket};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkResult {
    Fail,
    Success,
}

/// How a socket will be used; decided at creation like the original
/// flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketFlags {
    pub udp: bool,
    pub non_blocking: bool,
}

/// Resolved address list for bind/connect/send-to.
#[derive(Debug, Clone)]
pub struct NetworkAddress {
    addresses: Vec<SocketAddr>,
}

impl NetworkAddress {
    /// Resolves `address:service`; a `None` address means the wildcard
    /// interface.
    pub fn create(address: Option<&str>, service: &str) -> Option<NetworkAddress> {
        let host = address.unwrap_or("0.0.0.0");
        let port: u16 = match service.parse() {
            Ok(port) => port,
            Err(_) => return None,
        };
        match (host, port).to_socket_addrs() {
            Ok(addresses) => {
                let addresses: Vec<SocketAddr> = addresses.collect();
                if addresses.is_empty() {
                    None
                } else {
                    Some(NetworkAddress { addresses })
                }
            }
            Err(e) => {
                log::error!(
                    "[platform::network] failed to resolve {}:{}: {}",
                    host,
                    service,
                    e
                );
                None
            }
        }
    }

    pub fn first(&self) -> SocketAddr {
        self.addresses[0]
    }
}

impl From<SocketAddr> for NetworkAddress {
    fn from(address: SocketAddr) -> Self {
        Self {
            addresses: vec![address],
        }
    }
}

/// Sender details attached to a UDP receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketReceiverInfo {
    pub address: String,
    pub port: u16,
}

enum SocketState {
    Created(SocketFlags),
    Udp(UdpSocket),
    Listener(TcpListener),
    Stream(TcpStream),
}

/// A socket in one of its lifecycle states: created, bound (UDP or TCP
/// listener), or connected stream.
pub struct Socket {
    state: SocketState,
    flags: SocketFlags,
}

impl Socket {
    pub fn create(flags: SocketFlags) -> Socket {
        Socket {
            state: SocketState::Created(flags),
            flags,
        }
    }

    /// Binds to the first resolved address: UDP socket or TCP listener
    /// depending on the creation flags.
    pub fn bind(&mut self, address: &NetworkAddress) -> NetworkResult {
        let target = address.first();
        if self.flags.udp {
            match UdpSocket::bind(target) {
                Ok(socket) => {
                    self.apply_non_blocking_udp(&socket);
                    self.state = SocketState::Udp(socket);
                    NetworkResult::Success
                }
                Err(e) => {
                    log::error!("[platform::network] udp bind {}: {}", target, e);
                    NetworkResult::Fail
                }
            }
        } else {
            match TcpListener::bind(target) {
                Ok(listener) => {
                    if self.flags.non_blocking {
                        let _ = listener.set_nonblocking(true);
                    }
                    self.state = SocketState::Listener(listener);
                    NetworkResult::Success
                }
                Err(e) => {
                    log::error!("[platform::network] tcp bind {}: {}", target, e);
                    NetworkResult::Fail
                }
            }
        }
    }

    /// TCP connect to the first resolved address.
    pub fn connect(&mut self, address: &NetworkAddress) -> NetworkResult {
        let target = address.first();
        match TcpStream::connect(target) {
            Ok(stream) => {
                if self.flags.non_blocking {
                    let _ = stream.set_nonblocking(true);
                }
                self.state = SocketState::Stream(stream);
                NetworkResult::Success
            }
            Err(e) => {
                log::error!("[platform::network] connect {}: {}", target, e);
                NetworkResult::Fail
            }
        }
    }

    /// Marks a bound TCP socket as accepting. Binding already listens on
    /// this platform, so this only validates the state.
    pub fn listen(&self) -> NetworkResult {
        match self.state {
            SocketState::Listener(_) => NetworkResult::Success,
            _ => NetworkResult::Fail,
        }
    }

    /// Accepts one pending connection.
    pub fn accept(&self) -> Option<Socket> {
        let SocketState::Listener(ref listener) = self.state else {
            return None;
        };
        match listener.accept() {
            Ok((stream, _)) => {
                if self.flags.non_blocking {
                    let _ = stream.set_nonblocking(true);
                }
                Some(Socket {
                    state: SocketState::Stream(stream),
                    flags: self.flags,
                })
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::WouldBlock {
                    log::error!("[platform::network] accept: {}", e);
                }
                None
            }
        }
    }

    /// Stream send; returns bytes sent.
    pub fn send(&mut self, data: &[u8]) -> Option<usize> {
        let SocketState::Stream(ref mut stream) = self.state else {
            return None;
        };
        match stream.write(data) {
            Ok(sent) => Some(sent),
            Err(e) => {
                log::error!("[platform::network] send: {}", e);
                None
            }
        }
    }

    /// Stream receive; returns bytes received.
    pub fn recv(&mut self, buffer: &mut [u8]) -> Option<usize> {
        let SocketState::Stream(ref mut stream) = self.state else {
            return None;
        };
        match stream.read(buffer) {
            Ok(received) => Some(received),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::WouldBlock {
                    log::error!("[platform::network] recv: {}", e);
                }
                None
            }
        }
    }

    /// UDP datagram send; binds an ephemeral local socket on first use of
    /// an unbound socket.
    pub fn send_to(&mut self, address: &NetworkAddress, data: &[u8]) -> Option<usize> {
        if let SocketState::Created(_) = self.state {
            let wildcard = NetworkAddress::create(None, "0")?;
            if self.bind(&wildcard) != NetworkResult::Success {
                return None;
            }
        }
        let SocketState::Udp(ref socket) = self.state else {
            return None;
        };
        match socket.send_to(data, address.first()) {
            Ok(sent) => Some(sent),
            Err(e) => {
                log::error!("[platform::network] send_to: {}", e);
                None
            }
        }
    }

    /// UDP datagram receive with sender info.
    pub fn recv_from(&self, buffer: &mut [u8]) -> Option<(usize, SocketReceiverInfo)> {
        let SocketState::Udp(ref socket) = self.state else {
            return None;
        };
        match socket.recv_from(buffer) {
            Ok((received, sender)) => Some((
                received,
                SocketReceiverInfo {
                    address: sender.ip().to_string(),
                    port: sender.port(),
                },
            )),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::WouldBlock {
                    log::error!("[platform::network] recv_from: {}", e);
                }
                None
            }
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            SocketState::Udp(socket) => socket.local_addr().ok(),
            SocketState::Listener(listener) => listener.local_addr().ok(),
            SocketState::Stream(stream) => stream.local_addr().ok(),
            SocketState::Created(_) => None,
        }
    }

    fn apply_non_blocking_udp(&self, socket: &UdpSocket) {
        if self.flags.non_blocking {
            let _ = socket.set_nonblocking(true);
        }
    }

    #[cfg(unix)]
    fn raw_fd(&self) -> Option<std::os::unix::io::RawFd> {
        use std::os::unix::io::AsRawFd;
        match &self.state {
            SocketState::Udp(socket) => Some(socket.as_raw_fd()),
            SocketState::Listener(listener) => Some(listener.as_raw_fd()),
            SocketState::Stream(stream) => Some(stream.as_raw_fd()),
            SocketState::Created(_) => None,
        }
    }
}

/// Readiness select over a set of sockets with a millisecond timeout; the
/// flag slice is filled with per-socket readability. The only
/// timeout-bearing call in the capability set.
#[cfg(unix)]
pub fn select_sockets(
    sockets: &[&Socket],
    ready: &mut [bool],
    timeout_milliseconds: u32,
) -> NetworkResult {
    assert_eq!(sockets.len(), ready.len());

    let mut poll_fds: Vec<libc::pollfd> = Vec::with_capacity(sockets.len());
    for socket in sockets {
        let Some(fd) = socket.raw_fd() else {
            return NetworkResult::Fail;
        };
        poll_fds.push(libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        });
    }

    let result = unsafe {
        libc::poll(
            poll_fds.as_mut_ptr(),
            poll_fds.len() as libc::nfds_t,
            timeout_milliseconds as libc::c_int,
        )
    };
    if result < 0 {
        log::error!("[platform::network] poll failed");
        return NetworkResult::Fail;
    }

    for (flag, poll_fd) in ready.iter_mut().zip(&poll_fds) {
        *flag = poll_fd.revents & libc::POLLIN != 0;
    }
    NetworkResult::Success
}

#[cfg(not(unix))]
pub fn select_sockets(
    sockets: &[&Socket],
    ready: &mut [bool],
    _timeout_milliseconds: u32,
) -> NetworkResult {
    // no poll on this platform; report everything readable and let the
    // non-blocking reads sort it out
    assert_eq!(sockets.len(), ready.len());
    for flag in ready.iter_mut() {
        *flag = true;
    }
    NetworkResult::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    const UDP: SocketFlags = SocketFlags {
        udp: true,
        non_blocking: false,
    };
    const TCP: SocketFlags = SocketFlags {
        udp: false,
        non_blocking: false,
    };

    fn loopback(port: u16) -> NetworkAddress {
        NetworkAddress::create(Some("127.0.0.1"), &port.to_string()).expect("resolvable")
    }

    #[test]
    fn test_address_resolution() {
        let address = NetworkAddress::create(Some("127.0.0.1"), "8080").expect("resolvable");
        assert_eq!(address.first().port(), 8080);
        assert!(NetworkAddress::create(Some("###"), "not-a-port").is_none());
    }

    #[test]
    fn test_udp_roundtrip_with_receiver_info() {
        let mut receiver = Socket::create(UDP);
        assert_eq!(receiver.bind(&loopback(0)), NetworkResult::Success);
        let receiver_addr = receiver.local_addr().expect("bound");

        let mut sender = Socket::create(UDP);
        assert_eq!(sender.bind(&loopback(0)), NetworkResult::Success);
        let sender_addr = sender.local_addr().expect("bound");

        let sent = sender
            .send_to(&NetworkAddress::from(receiver_addr), b"ping")
            .expect("sendable");
        assert_eq!(sent, 4);

        let mut buffer = [0u8; 16];
        let (received, info) = receiver.recv_from(&mut buffer).expect("receivable");
        assert_eq!(&buffer[..received], b"ping");
        assert_eq!(info.port, sender_addr.port());
    }

    #[test]
    fn test_tcp_accept_and_stream() {
        let mut listener = Socket::create(TCP);
        assert_eq!(listener.bind(&loopback(0)), NetworkResult::Success);
        assert_eq!(listener.listen(), NetworkResult::Success);
        let listen_addr = listener.local_addr().expect("bound");

        let mut client = Socket::create(TCP);
        assert_eq!(
            client.connect(&NetworkAddress::from(listen_addr)),
            NetworkResult::Success
        );

        let mut server_side = listener.accept().expect("pending connection");
        client.send(b"hello").expect("sendable");

        let mut buffer = [0u8; 16];
        let received = server_side.recv(&mut buffer).expect("receivable");
        assert_eq!(&buffer[..received], b"hello");
    }

    #[test]
    fn test_select_reports_readiness() {
        let mut receiver = Socket::create(UDP);
        receiver.bind(&loopback(0));
        let receiver_addr = receiver.local_addr().expect("bound");

        let mut ready = [false];
        // nothing pending: times out not-ready on platforms with poll
        #[cfg(unix)]
        {
            assert_eq!(
                select_sockets(&[&receiver], &mut ready, 10),
                NetworkResult::Success
            );
            assert!(!ready[0]);
        }

        let mut sender = Socket::create(UDP);
        sender.bind(&loopback(0));
        sender
            .send_to(&NetworkAddress::from(receiver_addr), b"x")
            .expect("sendable");

        assert_eq!(
            select_sockets(&[&receiver], &mut ready, 1000),
            NetworkResult::Success
        );
        assert!(ready[0]);
    }

    #[test]
    fn test_wrong_state_operations_fail() {
        let mut socket = Socket::create(TCP);
        assert_eq!(socket.listen(), NetworkResult::Fail);
        assert!(socket.accept().is_none());
        assert!(socket.send(b"x").is_none());
        assert!(socket.recv(&mut [0u8; 4]).is_none());
    }
}
