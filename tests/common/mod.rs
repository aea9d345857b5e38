//! A scripted stand-in for a meter on the other end of an in-memory pipe

#![allow(dead_code)]

use std::{
    collections::{ HashMap, VecDeque },
    io,
    sync::{ Arc, Mutex },
    time::Duration,
};
use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream };
use arcs_dmm::{ Connector, ScpiTransport };

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply
{
    Line(String),
    /// Answer only after the given delay
    Delayed(Duration, String),
    /// Say nothing, letting the host time out
    Silent,
    /// Close the pipe
    HangUp,
}

pub fn line(text: &str) -> Reply
{
    Reply::Line(text.to_string())
}

#[derive(Default)]
struct ScriptState
{
    replies: HashMap<String, VecDeque<Reply>>,
    received: Vec<String>,
}

/// Replies per command, consumed in order. The last reply for a command repeats forever.
#[derive(Clone, Default)]
pub struct Script
{
    state: Arc<Mutex<ScriptState>>,
}

impl Script
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn on(self, cmd: &str, replies: &[Reply]) -> Self
    {
        self.state
            .lock()
            .unwrap()
            .replies
            .insert(cmd.to_string(), replies.iter().cloned().collect());
        self
    }

    pub fn received(&self) -> Vec<String>
    {
        self.state.lock().unwrap().received.clone()
    }

    pub fn count(&self, cmd: &str) -> usize
    {
        self.received().iter().filter(|received| *received == cmd).count()
    }

    fn answer(&self, cmd: &str) -> Reply
    {
        let mut state = self.state.lock().unwrap();
        state.received.push(cmd.to_string());

        match state.replies.get_mut(cmd) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Reply::Silent),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Silent),
            None => Reply::Silent,
        }
    }
}

/// Connector handing out pipes served by a [`Script`]
pub struct FakeConnector
{
    script: Script,
    reachable: bool,
}

impl FakeConnector
{
    pub fn new(script: Script) -> Self
    {
        Self {
            script: script,
            reachable: true,
        }
    }

    pub fn unreachable() -> Self
    {
        Self {
            script: Script::new(),
            reachable: false,
        }
    }
}

impl Connector for FakeConnector
{
    type Stream = DuplexStream;

    fn open(&self) -> io::Result<Self::Stream>
    {
        if !self.reachable {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        let (host, device) = tokio::io::duplex(1024);
        tokio::spawn(serve(device, self.script.clone()));
        Ok(host)
    }

    fn describe(&self) -> String
    {
        "fake meter".to_string()
    }
}

async fn serve(device: DuplexStream, script: Script)
{
    let (reader, mut writer) = tokio::io::split(device);
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(cmd)) = lines.next_line().await {
        match script.answer(cmd.trim()) {
            Reply::Line(text) => {
                if writer.write_all(format!("{}\r\n", text).as_bytes()).await.is_err() {
                    return;
                }
            }
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                if writer.write_all(format!("{}\r\n", text).as_bytes()).await.is_err() {
                    return;
                }
            }
            Reply::Silent => {}
            Reply::HangUp => return,
        }
    }
}

/// Transport to a scripted meter with a short read timeout
pub fn transport(script: &Script) -> ScpiTransport<FakeConnector>
{
    ScpiTransport::new(FakeConnector::new(script.clone())).with_timeout(SHORT_TIMEOUT)
}
