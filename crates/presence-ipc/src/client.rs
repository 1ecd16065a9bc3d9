//! IPC client implementation

use presence_api::{Command, Event, Request, Response, ResponsePayload, ResponseResult};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::{IpcError, IpcResult};

/// IPC client for presenced
pub struct IpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_request_id: u64,
}

impl IpcClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
        })
    }

    /// Send a command and wait for its response
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = Request::new(request_id, command);
        let mut json = serde_json::to_string(&request)?;
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;

        let response = self.read_response().await?;
        if response.request_id != request_id {
            return Err(IpcError::InvalidMessage(format!(
                "expected response to request {request_id}, got {}",
                response.request_id
            )));
        }

        Ok(response)
    }

    /// Read the next response line. Events that were already queued for a
    /// subscribed connection are skipped.
    async fn read_response(&mut self) -> IpcResult<Response> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(IpcError::ConnectionClosed);
            }

            match serde_json::from_str::<Response>(line.trim()) {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if serde_json::from_str::<Event>(line.trim()).is_err() {
                        return Err(e.into());
                    }
                }
            }
        }
    }

    /// Send a command and unwrap the payload, turning error responses into
    /// `IpcError::ServerError`
    pub async fn call(&mut self, command: Command) -> IpcResult<ResponsePayload> {
        match self.send(command).await?.result {
            ResponseResult::Ok(payload) => Ok(payload),
            ResponseResult::Err(e) => Err(IpcError::ServerError(e.message)),
        }
    }

    /// Subscribe to events and consume this client to return an event stream
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        self.call(Command::SubscribeEvents).await?;

        Ok(EventStream {
            reader: self.reader,
            _writer: self.writer,
        })
    }
}

/// Stream of events from presenced
pub struct EventStream {
    reader: BufReader<OwnedReadHalf>,
    // Keeps the connection open; closing it would end the subscription
    _writer: OwnedWriteHalf,
}

impl EventStream {
    /// Wait for the next event
    pub async fn next(&mut self) -> IpcResult<Event> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }

        let event: Event = serde_json::from_str(line.trim())?;
        Ok(event)
    }
}
