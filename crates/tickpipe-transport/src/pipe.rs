use std::fs::{File, OpenOptions};
use std::os::windows::io::AsRawHandle;

use tracing::debug;
use windows_sys::Win32::Foundation::{GetLastError, ERROR_BROKEN_PIPE, ERROR_MORE_DATA, HANDLE};
use windows_sys::Win32::Storage::FileSystem::ReadFile;
use windows_sys::Win32::System::Pipes::{
    PeekNamedPipe, SetNamedPipeHandleState, PIPE_READMODE_MESSAGE,
};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// Open the client end of an existing named pipe.
///
/// `ERROR_FILE_NOT_FOUND` (no server yet) and `ERROR_PIPE_BUSY` (all
/// instances taken) surface as transient `Connect` errors.
pub fn connect(name: &str) -> Result<IpcStream> {
    let path = Endpoint::pipe_path(name);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|source| TransportError::Connect {
            endpoint: format!("pipe:{name}"),
            source,
        })?;

    let mode = PIPE_READMODE_MESSAGE;
    // SAFETY: the handle is owned by `file` and stays open for the call;
    // `mode` outlives the call and the optional pointers are null.
    let ok = unsafe {
        SetNamedPipeHandleState(
            raw(&file),
            &mode,
            std::ptr::null(),
            std::ptr::null(),
        )
    };
    if ok == 0 {
        // Byte-mode pipes reject message reads; the line codec copes either way.
        debug!(%path, "pipe stays in byte read mode");
    }

    debug!(%path, "connected to named pipe");
    Ok(IpcStream::from_pipe(file))
}

pub(crate) fn bytes_available(file: &File) -> Result<usize> {
    let mut available: u32 = 0;
    // SAFETY: the handle is owned by `file`; only the total-available out
    // pointer is requested and it points at a live `u32`.
    let ok = unsafe {
        PeekNamedPipe(
            raw(file),
            std::ptr::null_mut(),
            0,
            std::ptr::null_mut(),
            &mut available,
            std::ptr::null_mut(),
        )
    };
    if ok == 0 {
        return Err(last_error());
    }
    Ok(available as usize)
}

/// Read one chunk. In message mode a message larger than `buf` fails with
/// `ERROR_MORE_DATA` after filling the buffer; that is a partial read, not
/// an error.
pub(crate) fn read_chunk(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
    let mut read: u32 = 0;
    // SAFETY: `buf` is valid for `len` writable bytes, `read` is a live out
    // pointer, and the handle is synchronous so no OVERLAPPED is needed.
    let ok = unsafe {
        ReadFile(
            raw(file),
            buf.as_mut_ptr(),
            len,
            &mut read,
            std::ptr::null_mut(),
        )
    };
    if ok == 0 {
        // SAFETY: reads the calling thread's last-error value.
        let code = unsafe { GetLastError() };
        if code == ERROR_MORE_DATA {
            return Ok(read as usize);
        }
        if code == ERROR_BROKEN_PIPE {
            return Err(TransportError::Closed);
        }
        return Err(std::io::Error::from_raw_os_error(code as i32).into());
    }
    Ok(read as usize)
}

fn raw(file: &File) -> HANDLE {
    file.as_raw_handle() as HANDLE
}

fn last_error() -> TransportError {
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(ERROR_BROKEN_PIPE as i32) {
        TransportError::Closed
    } else {
        err.into()
    }
}
