//! Line-oriented command execution over a byte stream
//!
//! # Cancel Safety
//! [`Executor::read_line`] only ever appends to the read buffer, so a read abandoned by a timeout loses nothing.
//! Whatever half-line it leaves behind is thrown away by the purge that starts the next exchange, which keeps a
//! late reply from being taken as the answer to the next command.

use std::{
    fmt,
    io,
    sync::atomic::{ AtomicBool, Ordering },
    time::Duration,
};
use tokio::{
    io::{ AsyncRead, AsyncWrite, AsyncReadExt, AsyncWriteExt },
    sync::Mutex,
    time::timeout,
};
use tokio_serial::SerialPortBuilderExt;
use tracing::{ debug, info, warn };
use crate::{
    error::Error,
    settings::SerialSettings,
};

/// Upper bound on how much unsolicited data one purge will throw away
const MAX_PURGE_READS: usize = 64;

/// Something that can open the byte stream a device is attached to
///
/// Opening is separated from the protocol so that you are not restricted to a particular hardware interface. A
/// TCP/IP serial bridge or an in-memory pipe works just as well as a local RS232 line.
pub trait Connector: Send + Sync + 'static
{
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn open(&self) -> io::Result<Self::Stream>;

    /// Human readable description of where the stream leads, used in logs
    fn describe(&self) -> String;
}

/// Opens a local serial port
///
/// SCPI meters are only driven at 9600 baud, no parity, 8 data bits, 1 stop bit. Anything else is rejected when
/// the connector is built rather than when the port is opened.
#[derive(Debug, Clone)]
pub struct SerialConnector
{
    settings: SerialSettings,
}

impl SerialConnector
{
    pub const SUPPORTED_FRAMING: &'static str = "9600,N,8,1";

    pub fn new(settings_str: &str) -> Result<Self, Error>
    {
        Self::with_settings(settings_str.parse()?)
    }

    pub fn with_settings(settings: SerialSettings) -> Result<Self, Error>
    {
        if !settings.is_9600_8n1() {
            return Err(Error::UnsupportedSerialSettings {
                expected: Self::SUPPORTED_FRAMING,
                actual: settings.to_string(),
            });
        }

        Ok(Self {
            settings: settings,
        })
    }

    pub fn settings(&self) -> &SerialSettings
    {
        &self.settings
    }
}

impl Connector for SerialConnector
{
    type Stream = tokio_serial::SerialStream;

    fn open(&self) -> io::Result<Self::Stream>
    {
        tokio_serial::new(self.settings.port_name(), self.settings.baud_rate())
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(io::Error::from)
    }

    fn describe(&self) -> String
    {
        self.settings.to_string()
    }
}

pub(crate) struct Executor<T>
{
    line_ending: &'static str,
    io_handle: T,
    read_buf: Vec<u8>,
}

impl <T> Executor<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    pub(crate) fn with(line_ending: &'static str, io_handle: T) -> Self
    {
        Self {
            line_ending: line_ending,
            io_handle: io_handle,
            read_buf: Vec::with_capacity(128),
        }
    }

    /// Drops the first `n` bytes from the read buffer
    ///
    /// Drops all bytes if `n >= self.read_buf.len()`
    fn drop_first(&mut self, n: usize)
    {
        if n >= self.read_buf.len() {
            self.read_buf.clear();
        }
        else {
            // relocate any bytes after the Nth byte to index 0
            self.read_buf.rotate_left(n);
            // chop off the bytes we just consumed
            self.read_buf.truncate(self.read_buf.len() - n);
            self.read_buf.shrink_to(128);
        }
    }

    /// Returns the index of the first linefeed in the read buffer, starting the search at `start_hint`
    fn find_line_ending(&self, start_hint: usize) -> Option<usize>
    {
        self.read_buf
            .get(start_hint..)?
            .iter()
            .position(|byte| *byte == 0x0A)
            .map(|index| index + start_hint)
    }

    /// Reads a line (series of bytes terminated by `LF` / 0x0A) into the read buffer and returns how many bytes
    /// are in the line, terminator included
    ///
    /// The stream ending before a full line arrives is reported as `UnexpectedEof`.
    ///
    /// # Cancel Safety
    /// This function is cancel safe e.g. when used inside of a `tokio::select!` or `timeout`. It never destroys
    /// contents of the read buffer, only appends.
    async fn read_line(&mut self) -> Result<usize, io::Error>
    {
        let mut end_index = self.find_line_ending(0);

        while end_index.is_none() {
            let mut temp_buf = [0u8; 64];

            let bytes_read = self.io_handle.read(&mut temp_buf[..]).await?;
            if bytes_read == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
            }

            let prior_end = self.read_buf.len();
            self.read_buf.extend_from_slice(&temp_buf[..bytes_read]);
            end_index = self.find_line_ending(prior_end);
        }

        Ok(end_index.map_or(0, |index| index + 1))
    }

    /// Removes the first `size` bytes from the read buffer and decodes them without the line terminator
    fn take_string(&mut self, size: usize) -> String
    {
        let size = size.min(self.read_buf.len());
        let line = &self.read_buf[..size];
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let response = String::from_utf8_lossy(line).into_owned();
        self.drop_first(size);

        response
    }

    /// Discards everything already buffered or waiting on the stream without blocking
    pub(crate) async fn purge(&mut self) -> Result<usize, io::Error>
    {
        let mut discarded = self.read_buf.len();
        self.read_buf.clear();

        for _ in 0..MAX_PURGE_READS {
            let mut temp_buf = [0u8; 64];

            match timeout(Duration::ZERO, self.io_handle.read(&mut temp_buf[..])).await {
                Ok(Ok(0)) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
                Ok(Ok(bytes_read)) => discarded += bytes_read,
                Ok(Err(err)) => return Err(err),
                // nothing pending
                Err(_) => break,
            }
        }

        Ok(discarded)
    }

    /// Sends the given command and returns the single line the device answers with
    pub(crate) async fn exec_cmd(&mut self, cmd: &str) -> Result<String, io::Error>
    {
        let purged = self.purge().await?;
        if purged > 0 {
            debug!(bytes = purged, "discarded unsolicited input");
        }

        let serialized = format!("{}{}", cmd, self.line_ending);
        self.io_handle.write_all(serialized.as_bytes()).await?;
        self.io_handle.flush().await?;

        let response_len = self.read_line().await?;
        Ok(self.take_string(response_len))
    }

    pub(crate) async fn shutdown(&mut self) -> Result<(), io::Error>
    {
        self.io_handle.shutdown().await
    }
}

/// Serialized, timeout-bounded SCPI exchanges with one device
///
/// Only one command is ever in flight. A second caller waits for the first caller's reply (or timeout) before its
/// own command is written, so replies cannot be attributed to the wrong request.
///
/// Nothing here fails loudly. A link that cannot be opened is simply not connected, and a command that gets no
/// usable answer yields `None`.
pub struct ScpiTransport<C>
    where C: Connector
{
    connector: C,
    read_timeout: Duration,
    executor: Mutex<Option<Executor<C::Stream>>>,
    connected: AtomicBool,
}

impl <C> ScpiTransport<C>
    where C: Connector
{
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(250);

    pub fn new(connector: C) -> Self
    {
        Self {
            connector: connector,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            executor: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Bounds how long a single command may wait for its reply
    pub fn with_timeout(mut self, read_timeout: Duration) -> Self
    {
        self.read_timeout = read_timeout;
        self
    }

    pub fn connector(&self) -> &C
    {
        &self.connector
    }

    pub fn read_timeout(&self) -> Duration
    {
        self.read_timeout
    }

    /// Opens the link and flushes anything already waiting on it
    ///
    /// Returns whether the link is open afterwards. Connecting an open transport does nothing.
    pub async fn connect(&self) -> bool
    {
        let mut guard = self.executor.lock().await;
        if guard.is_some() {
            return true;
        }

        let link = self.connector.describe();
        let stream = match self.connector.open() {
            Ok(stream) => stream,
            Err(err) => {
                warn!(%link, error = %err, "could not open link");
                return false;
            }
        };

        let mut executor = Executor::with("\n", stream);
        if let Err(err) = executor.purge().await {
            warn!(%link, error = %err, "link failed while flushing input");
            return false;
        }

        *guard = Some(executor);
        self.connected.store(true, Ordering::SeqCst);
        info!(%link, "connected");

        true
    }

    /// Flushes and closes the link. Does nothing if it is already closed.
    pub async fn disconnect(&self)
    {
        let mut guard = self.executor.lock().await;
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut executor) = guard.take() {
            // the link is going away regardless
            let _ = executor.purge().await;
            let _ = executor.shutdown().await;
            info!(link = %self.connector.describe(), "disconnected");
        }
    }

    /// Whether the link is open. Says nothing about whether the device is answering.
    pub fn is_connected(&self) -> bool
    {
        self.connected.load(Ordering::SeqCst)
    }

    /// Sends one command and waits a bounded time for its one-line reply
    ///
    /// Returns `None` when not connected, on timeout, or on any I/O failure. A link that reports end of stream or a
    /// broken pipe is closed.
    pub async fn send_command<D>(&self, cmd: D) -> Option<String>
        where D: fmt::Display
    {
        let cmd = cmd.to_string();
        if !self.is_connected() {
            return None;
        }

        let mut guard = self.executor.lock().await;
        let executor = guard.as_mut()?;

        match timeout(self.read_timeout, executor.exec_cmd(&cmd)).await {
            Ok(Ok(response)) => {
                debug!(%cmd, %response, "exchange");
                Some(response)
            }
            Ok(Err(err)) if is_link_lost(&err) => {
                warn!(%cmd, error = %err, "link lost");
                *guard = None;
                self.connected.store(false, Ordering::SeqCst);
                None
            }
            Ok(Err(err)) => {
                warn!(%cmd, error = %err, "exchange failed");
                None
            }
            Err(_) => {
                debug!(%cmd, timeout_ms = self.read_timeout.as_millis() as u64, "no reply");
                None
            }
        }
    }
}

fn is_link_lost(err: &io::Error) -> bool
{
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}
