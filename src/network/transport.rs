//! Byte-stream transports: standard input/output or one TCP client

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};

use crate::error::TransportError;

/// Read exactly `buf.len()` bytes, looping over short reads.
///
/// An orderly end of stream before the buffer is full is reported as
/// [`TransportError::Closed`]; the partial period is discarded.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<(), TransportError> {
    let mut offset = 0;
    while offset < buf.len() {
        match reader.read(&mut buf[offset..]) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => offset += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Io(e)),
        }
    }
    Ok(())
}

/// Write all of `buf`, looping over short writes, then flush.
pub fn write_full<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<(), TransportError> {
    let mut offset = 0;
    while offset < buf.len() {
        match writer.write(&buf[offset..]) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => offset += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(classify_write_error(e)),
        }
    }
    writer.flush().map_err(classify_write_error)
}

/// A peer that hung up is an orderly close, not a failure.
fn classify_write_error(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => TransportError::Closed,
        _ => TransportError::Io(e),
    }
}

/// The open byte stream for a session
pub enum Transport {
    /// Standard input for reading, standard output for writing
    Stdio { input: io::Stdin, output: io::Stdout },
    /// An accepted TCP client
    Tcp(TcpStream),
}

impl Transport {
    pub fn stdio() -> Self {
        Transport::Stdio {
            input: io::stdin(),
            output: io::stdout(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Transport::Stdio { .. } => "stdio".to_string(),
            Transport::Tcp(stream) => match stream.peer_addr() {
                Ok(peer) => format!("tcp://{}", peer),
                Err(_) => "tcp".to_string(),
            },
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Stdio { input, .. } => input.read(buf),
            Transport::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Stdio { output, .. } => output.write(buf),
            Transport::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Stdio { output, .. } => output.flush(),
            Transport::Tcp(stream) => stream.flush(),
        }
    }
}

/// Listening socket that serves exactly one client
pub struct TcpEndpoint {
    socket: Socket,
}

impl TcpEndpoint {
    /// Bind and listen with a backlog of one.
    pub fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let bind_err = |e: io::Error| TransportError::BindFailed(format!("{}: {}", addr, e));

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.bind(&SockAddr::from(addr)).map_err(bind_err)?;
        socket.listen(1).map_err(bind_err)?;

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket
            .local_addr()?
            .as_socket()
            .ok_or_else(|| TransportError::BindFailed("listener has no inet address".to_string()))
    }

    /// Block until one client connects, then stop listening.
    ///
    /// The receive buffer is sized to `recv_buffer` bytes to absorb jitter.
    pub fn accept_one(self, recv_buffer: usize) -> Result<(TcpStream, SocketAddr), TransportError> {
        let (conn, peer) = self
            .socket
            .accept()
            .map_err(|e| TransportError::AcceptFailed(e.to_string()))?;

        if let Err(e) = conn.set_recv_buffer_size(recv_buffer) {
            tracing::warn!("Failed to set receive buffer to {} bytes: {}", recv_buffer, e);
        }
        if let Err(e) = conn.set_nodelay(true) {
            tracing::warn!("Failed to disable Nagle: {}", e);
        }

        let peer = peer
            .as_socket()
            .ok_or_else(|| TransportError::AcceptFailed("peer has no inet address".to_string()))?;
        Ok((conn.into(), peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    /// Reader that hands out at most `chunk` bytes per call
    struct ChunkedReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
        interrupt_next: bool,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(io::ErrorKind::Interrupted.into());
            }
            self.interrupt_next = true;
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    /// Writer that accepts at most `chunk` bytes per call
    struct ShortWriter {
        out: Vec<u8>,
        chunk: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len());
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_full_assembles_short_reads() {
        let mut reader = ChunkedReader {
            data: (0..30).collect(),
            pos: 0,
            chunk: 10,
            interrupt_next: false,
        };
        let mut buf = [0u8; 30];
        read_full(&mut reader, &mut buf).unwrap();
        assert_eq!(buf.to_vec(), (0..30).collect::<Vec<u8>>());
    }

    #[test]
    fn test_read_full_reports_eof_mid_period() {
        let mut reader = ChunkedReader {
            data: vec![1; 5],
            pos: 0,
            chunk: 4,
            interrupt_next: false,
        };
        let mut buf = [0u8; 8];
        assert!(matches!(read_full(&mut reader, &mut buf), Err(TransportError::Closed)));
    }

    #[test]
    fn test_write_full_loops_over_short_writes() {
        let mut writer = ShortWriter { out: Vec::new(), chunk: 3 };
        write_full(&mut writer, &[7; 20]).unwrap();
        assert_eq!(writer.out, vec![7; 20]);
    }

    #[test]
    fn test_write_zero_is_closed() {
        let mut writer = ShortWriter { out: Vec::new(), chunk: 0 };
        assert!(matches!(write_full(&mut writer, &[1]), Err(TransportError::Closed)));
    }

    #[test]
    fn test_tcp_accepts_one_client() {
        let endpoint = TcpEndpoint::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = endpoint.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            for part in [[1u8; 10], [2u8; 10], [3u8; 10]] {
                stream.write_all(&part).unwrap();
                thread::sleep(Duration::from_millis(5));
            }
        });

        let (mut stream, peer) = endpoint.accept_one(4 * 30).unwrap();
        assert!(peer.ip().is_loopback());

        let mut buf = [0u8; 30];
        read_full(&mut stream, &mut buf).unwrap();
        assert_eq!(&buf[..10], &[1; 10]);
        assert_eq!(&buf[20..], &[3; 10]);

        client.join().unwrap();
        assert!(matches!(read_full(&mut stream, &mut buf), Err(TransportError::Closed)));
    }
}
