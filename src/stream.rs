use crate::client::Client;
use crate::error::{Error, Result};
use crate::post::Post;

use futures::StreamExt;

use std::fmt;

/// A geographic bounding box, in degrees: west/south/east/north edges.
///
/// Serialized as the push feed's `locations` filter parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// What the handler wants the session to do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamAction {
    /// Keep the session open and wait for the next event.
    Continue,
    /// Close the session. Terminal; a new session is needed to reconnect.
    Stop,
}

/// What a [`StreamSession`] hands to its event handler.
#[derive(Debug, PartialEq)]
pub enum StreamEvent {
    /// A decoded post matching the filter.
    Post(Post),
    /// A recoverable fault: an undecodable payload, a transport hiccup or a stall notice.
    /// The session stays connected unless the handler answers [`StreamAction::Stop`].
    Transient(String),
}

/// Lifecycle of a [`StreamSession`]. `Closed` and `Errored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connected,
    Closed,
    Errored,
}

/// A single long-lived push-feed connection.
///
/// Unlike the pull-path listings, delivery here is driven by the remote service, so no
/// request pacing applies. The session runs once: after it reaches a terminal state the
/// caller constructs a new one to reconnect; no automatic reconnection is attempted.
#[derive(Debug)]
pub struct StreamSession<'a> {
    client: &'a Client,
    state: SessionState,
}

impl<'a> StreamSession<'a> {
    pub fn new(client: &'a Client) -> Self {
        StreamSession {
            client,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Open the filtered push feed and deliver events to `handler` until it asks to stop or
    /// the remote side ends the feed.
    ///
    /// Transient faults are logged, surfaced to the handler as [`StreamEvent::Transient`]
    /// and otherwise swallowed. The connection is owned by this future and therefore closed
    /// on every exit path, a handler panic included.
    pub async fn run<H>(&mut self, filter: &BoundingBox, mut handler: H) -> Result<()>
    where
        H: FnMut(StreamEvent) -> StreamAction,
    {
        if self.state != SessionState::Idle {
            return Err(Error::SessionTerminal);
        }

        let query = [("locations", filter.to_string())];

        let response = match self
            .client
            .get_endpoint_query("/statuses/filter.json", &query)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.state = SessionState::Errored;
                return Err(e);
            }
        };

        self.state = SessionState::Connected;

        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut stopped = false;

        'session: while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(error = ?e, "transient transport error on push feed");

                    if handler(StreamEvent::Transient(format!("{:?}", e))) == StreamAction::Stop {
                        stopped = true;
                        break 'session;
                    }

                    continue;
                }
            };

            buffer.extend_from_slice(&chunk);

            // Events are newline-delimited; blank lines are keep-alives.
            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();

                if let Some(event) = decode_line(&line) {
                    if handler(event) == StreamAction::Stop {
                        stopped = true;
                        break 'session;
                    }
                }
            }
        }

        // A last event may arrive without a trailing delimiter when the feed ends.
        if !stopped {
            if let Some(event) = decode_line(&buffer) {
                handler(event);
            }
        }

        self.state = SessionState::Closed;
        Ok(())
    }
}

fn decode_line(line: &[u8]) -> Option<StreamEvent> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();

    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<Post>(line) {
        Ok(post) => Some(StreamEvent::Post(post)),
        Err(e) => {
            tracing::warn!(error = %e, "undecodable push feed payload");
            Some(StreamEvent::Transient(e.to_string()))
        }
    }
}

impl Client {
    /// Create a push-feed session bound to this client's connection settings.
    ///
    /// ```no_run
    /// # use aviary::client::{AuthMode, Client};
    /// # use aviary::stream::{BoundingBox, StreamAction, StreamEvent};
    /// # #[tokio::main]
    /// # async fn main() -> aviary::error::Result<()> {
    /// let client = Client::new(
    ///     "https://stream.example.com",
    ///     "MyProject/1.0 (by my@email)",
    ///     AuthMode::User,
    /// )?;
    ///
    /// let bay_area = BoundingBox {
    ///     west: -122.75,
    ///     south: 36.8,
    ///     east: -121.75,
    ///     north: 37.8,
    /// };
    ///
    /// let mut session = client.stream_session();
    /// session
    ///     .run(&bay_area, |event| {
    ///         if let StreamEvent::Post(post) = event {
    ///             println!("{}", post.text);
    ///         }
    ///         StreamAction::Continue
    ///     })
    ///     .await?;
    /// # Ok(()) }
    /// ```
    pub fn stream_session(&self) -> StreamSession<'_> {
        StreamSession::new(self)
    }
}
