use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// Unix domain socket transport.
///
/// Stands in for the Windows named pipe on Unix platforms. The host side
/// only calls [`UnixDomainSocket::connect`]; `bind`/`accept` exist for the
/// counterpart (the `listen` CLI command and tests).
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl UnixDomainSocket {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on a filesystem-path Unix domain socket.
    ///
    /// A stale socket left at `path` is removed first; any other kind of
    /// file there is an error.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let label = endpoint_label(&path);
        let bind_error = |source| TransportError::Bind {
            endpoint: label.clone(),
            source,
        };

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(bind_error)?;
            if !metadata.file_type().is_socket() {
                return Err(bind_error(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_error)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_error)?;
        std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_SOCKET_MODE),
        )
        .map_err(bind_error)?;
        let created = std::fs::symlink_metadata(&path).map_err(bind_error)?;

        info!(?path, "listening on unix domain socket");

        Ok(Self {
            listener,
            created_inode: Some((created.dev(), created.ino())),
            path,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<IpcStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted connection");
        Ok(IpcStream::from_unix(stream))
    }

    /// Connect to a listening Unix domain socket.
    ///
    /// Fails immediately with `NotFound`/`ConnectionRefused` when nobody is
    /// listening; it never waits for a listener to appear.
    pub fn connect(path: impl AsRef<Path>) -> Result<IpcStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            endpoint: endpoint_label(path),
            source,
        })?;
        debug!(?path, "connected to unix domain socket");
        Ok(IpcStream::from_unix(stream))
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        let Some((expected_dev, expected_ino)) = self.created_inode else {
            return;
        };
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
            }
        }
    }
}

fn endpoint_label(path: &Path) -> String {
    format!("unix:{}", path.display())
}

/// Bytes readable without blocking, or an error once the peer has hung up.
///
/// `FIONREAD` alone cannot tell "no data yet" from "peer closed" (both are
/// zero), so a zero count is confirmed with a non-blocking peek.
pub(crate) fn bytes_available(stream: &UnixStream) -> Result<usize> {
    let fd = stream.as_raw_fd();

    let mut count: libc::c_int = 0;
    // SAFETY: `fd` is an open socket owned by `stream`, and `count` is a valid
    // writable `c_int` as FIONREAD requires.
    let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut count as *mut libc::c_int) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    if count > 0 {
        return Ok(count as usize);
    }

    let mut probe = 0u8;
    // SAFETY: `probe` is a valid one-byte buffer and `fd` is an open socket.
    // MSG_PEEK leaves the byte queued; MSG_DONTWAIT keeps the call from blocking.
    let peeked = unsafe {
        libc::recv(
            fd,
            (&mut probe as *mut u8).cast::<libc::c_void>(),
            1,
            libc::MSG_PEEK | libc::MSG_DONTWAIT,
        )
    };
    match peeked {
        0 => Err(TransportError::Closed),
        n if n > 0 => Ok(n as usize),
        _ => {
            let err = std::io::Error::last_os_error();
            match err.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => Ok(0),
                _ => Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Connection;
    use std::io::{Read, Write};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tickpipe-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bind_accept_connect() {
        let dir = temp_dir("uds-basic");
        let sock_path = dir.join("test.sock");

        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let path_clone = sock_path.clone();
        let handle = std::thread::spawn(move || {
            let mut client = UnixDomainSocket::connect(&path_clone).unwrap();
            client.write_all(b"hello\n").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 6];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello\n");

        handle.join().unwrap();

        drop(listener);
        assert!(
            !sock_path.exists(),
            "socket file should be cleaned up on drop"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_without_listener_is_transient() {
        let dir = temp_dir("uds-absent");
        let err = UnixDomainSocket::connect(dir.join("nobody.sock")).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(err.is_transient());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_to_stale_socket_is_transient() {
        let dir = temp_dir("uds-stale");
        let sock_path = dir.join("stale.sock");
        // A bound-then-dropped std listener leaves the file without a listener.
        drop(UnixListener::bind(&sock_path).unwrap());

        let err = UnixDomainSocket::connect(&sock_path).unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = UnixDomainSocket::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn bind_default_permissions_hardened() {
        let dir = temp_dir("uds-perms");
        let sock_path = dir.join("perm.sock");

        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_rejects_existing_non_socket_file() {
        let dir = temp_dir("uds-file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = UnixDomainSocket::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bytes_available_tracks_queued_data() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let mut stream = IpcStream::from_unix(left);

        assert_eq!(stream.bytes_available().unwrap(), 0);

        right.write_all(b"abc\n").unwrap();
        assert_eq!(stream.bytes_available().unwrap(), 4);

        let mut buf = [0u8; 2];
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 2);
        assert_eq!(stream.bytes_available().unwrap(), 2);
    }

    #[test]
    fn bytes_available_reports_peer_close() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut stream = IpcStream::from_unix(left);
        drop(right);

        let err = stream.bytes_available().unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn queued_data_is_still_readable_after_peer_close() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let mut stream = IpcStream::from_unix(left);
        right.write_all(b"last\n").unwrap();
        drop(right);

        assert_eq!(stream.bytes_available().unwrap(), 5);
        let mut buf = [0u8; 16];
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 5);
        assert!(matches!(
            stream.bytes_available(),
            Err(TransportError::Closed)
        ));
    }
}
