//! Per-connection command loop
//!
//! A `ServerSession` is the server-side protocol state machine for one
//! connection: it reads one command at a time, executes it against the
//! session's own object registry, and writes the response before reading the
//! next command. Execution is strictly FIFO; a long-running method call
//! blocks the connection until it completes.
//!
//! Protocol violations (malformed lines, unknown ids, types or methods) are
//! answered with an error outcome and the connection stays alive; only
//! transport failures end the session.

use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::objects::{ObjectError, ObjectFactory, ObjectRegistry};
use crate::protocol::{Command, CommandEndpoint, ErrorKind, ProtocolError, Request, Response};

use super::ServerError;

/// How the accept loop should proceed after a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionVerdict {
    /// Keep accepting new connections
    Continue,
    /// Stop the whole listener (explicit `stop` command)
    Stop,
}

/// Server-side session over one connection
pub struct ServerSession<R, W> {
    endpoint: CommandEndpoint<R, W>,
    registry: ObjectRegistry,
    factory: Arc<ObjectFactory>,
    session_id: Uuid,
    commands_executed: u64,
}

impl<R, W> ServerSession<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a session with a fresh, empty registry
    pub fn new(endpoint: CommandEndpoint<R, W>, factory: Arc<ObjectFactory>) -> Self {
        let session_id = Uuid::new_v4();
        debug!(session_id = %session_id, "Session created");
        Self {
            endpoint,
            registry: ObjectRegistry::new(),
            factory,
            session_id,
            commands_executed: 0,
        }
    }

    /// Run the command loop to completion
    ///
    /// Returns [`SessionVerdict::Continue`] when the peer disconnected or
    /// sent `close`, [`SessionVerdict::Stop`] on an explicit `stop`.
    pub async fn run(&mut self) -> Result<SessionVerdict, ServerError> {
        loop {
            let request = match self.endpoint.read_request().await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    info!(
                        session_id = %self.session_id,
                        commands_executed = self.commands_executed,
                        live_objects = self.registry.len(),
                        "Peer closed the connection"
                    );
                    return Ok(SessionVerdict::Continue);
                }
                Err(ProtocolError::Decode { line, error }) => {
                    warn!(session_id = %self.session_id, line = %line, error = %error, "Malformed command line");
                    self.endpoint
                        .write_response(&Response::error(0, ErrorKind::MalformedCommand, error))
                        .await
                        .map_err(io_error)?;
                    continue;
                }
                Err(ProtocolError::Io(e)) => return Err(ServerError::Io(e)),
            };

            self.commands_executed += 1;
            if let Some(verdict) = self.execute(request).await? {
                info!(
                    session_id = %self.session_id,
                    commands_executed = self.commands_executed,
                    ?verdict,
                    "Session ended by command"
                );
                return Ok(verdict);
            }
        }
    }

    /// Execute one command; `Some(verdict)` ends the session
    async fn execute(&mut self, request: Request) -> Result<Option<SessionVerdict>, ServerError> {
        let request_id = request.request_id;
        debug!(
            session_id = %self.session_id,
            request_id,
            command = request.command.name(),
            "Executing command"
        );

        match request.command {
            Command::NewObject { spec } => {
                let result = self
                    .registry
                    .create(self.factory.as_ref(), &spec)
                    .map(|id| Some(json!(id)));
                self.respond(request_id, result).await?;
            }

            Command::DeleteObject { object_id } => {
                // fire-and-forget: failures are logged, never answered
                if let Err(e) = self.registry.destroy(object_id) {
                    warn!(
                        session_id = %self.session_id,
                        object_id = %object_id,
                        error = %e,
                        "delete_object failed"
                    );
                }
            }

            Command::CallMethod {
                object_id,
                method,
                args,
            } => {
                let result = self.registry.call_method(object_id, &method, &args);
                self.respond(request_id, result).await?;
            }

            Command::Ping => {
                self.write_ok(request_id, Some(json!("pong"))).await?;
            }

            Command::Help => {
                let text = self.usage_text();
                self.write_ok(request_id, Some(json!(text))).await?;
            }

            Command::Close => return Ok(Some(SessionVerdict::Continue)),

            Command::Stop => return Ok(Some(SessionVerdict::Stop)),
        }

        Ok(None)
    }

    async fn respond(
        &mut self,
        request_id: u64,
        result: Result<Option<serde_json::Value>, ObjectError>,
    ) -> Result<(), ServerError> {
        let response = match result {
            Ok(value) => Response::ok(request_id, value),
            Err(e) => {
                warn!(session_id = %self.session_id, request_id, error = %e, "Command failed");
                Response::error(request_id, e.wire_kind(), e.to_string())
            }
        };
        self.endpoint
            .write_response(&response)
            .await
            .map_err(io_error)
    }

    async fn write_ok(
        &mut self,
        request_id: u64,
        value: Option<serde_json::Value>,
    ) -> Result<(), ServerError> {
        self.endpoint
            .write_response(&Response::ok(request_id, value))
            .await
            .map_err(io_error)
    }

    fn usage_text(&self) -> String {
        format!(
            "commands: new_object {{spec}} | delete_object {{object_id}} | \
             call_method {{object_id, method, args}} | ping | help | close | stop\n\
             registered types: {}",
            self.factory.type_names().join(", ")
        )
    }

    /// Commands executed so far on this session
    pub fn commands_executed(&self) -> u64 {
        self.commands_executed
    }
}

fn io_error(e: ProtocolError) -> ServerError {
    match e {
        ProtocolError::Io(io) => ServerError::Io(io),
        ProtocolError::Decode { error, .. } => {
            ServerError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ObjectId, ObjectSpec, Outcome};
    use tokio::io::{duplex, split};

    type TestClient = CommandEndpoint<
        tokio::io::ReadHalf<tokio::io::DuplexStream>,
        tokio::io::WriteHalf<tokio::io::DuplexStream>,
    >;

    fn session_pair() -> (
        ServerSession<tokio::io::ReadHalf<tokio::io::DuplexStream>, tokio::io::WriteHalf<tokio::io::DuplexStream>>,
        TestClient,
    ) {
        let (client_side, server_side) = duplex(16 * 1024);
        let (server_read, server_write) = split(server_side);
        let (client_read, client_write) = split(client_side);

        let session = ServerSession::new(
            CommandEndpoint::new(server_read, server_write),
            Arc::new(ObjectFactory::with_builtins()),
        );
        let client = CommandEndpoint::new(client_read, client_write);
        (session, client)
    }

    async fn expect_ok(client: &mut TestClient, request_id: u64) -> Option<serde_json::Value> {
        let response = client.read_response().await.unwrap().unwrap();
        assert_eq!(response.request_id, request_id);
        match response.outcome {
            Outcome::Ok { value } => value,
            Outcome::Error { kind, message } => panic!("Expected ok, got {kind}: {message}"),
        }
    }

    #[tokio::test]
    async fn test_create_call_delete_lifecycle() {
        let (mut session, mut client) = session_pair();
        let driver = tokio::spawn(async move { session.run().await });

        let spec = ObjectSpec::new("counter").with_option("start", 5);
        client
            .write_request(&Request::new(1, Command::NewObject { spec }))
            .await
            .unwrap();
        let id: ObjectId = serde_json::from_value(expect_ok(&mut client, 1).await.unwrap()).unwrap();
        assert_eq!(id, ObjectId(1));

        client
            .write_request(&Request::new(
                2,
                Command::CallMethod {
                    object_id: id,
                    method: "increment".to_string(),
                    args: vec![json!(3)],
                },
            ))
            .await
            .unwrap();
        assert_eq!(expect_ok(&mut client, 2).await, Some(json!(8)));

        client
            .write_request(&Request::new(3, Command::DeleteObject { object_id: id }))
            .await
            .unwrap();

        // deleted object is gone: the very next call must fail
        client
            .write_request(&Request::new(
                4,
                Command::CallMethod {
                    object_id: id,
                    method: "value".to_string(),
                    args: vec![],
                },
            ))
            .await
            .unwrap();
        let response = client.read_response().await.unwrap().unwrap();
        assert_eq!(response.request_id, 4);
        match response.outcome {
            Outcome::Error { kind, .. } => assert_eq!(kind, ErrorKind::UnknownObjectId),
            other => panic!("Expected error outcome, got {other:?}"),
        }

        client.write_request(&Request::new(5, Command::Close)).await.unwrap();
        let verdict = driver.await.unwrap().unwrap();
        assert_eq!(verdict, SessionVerdict::Continue);
    }

    #[tokio::test]
    async fn test_fifo_ordering_of_responses() {
        let (mut session, mut client) = session_pair();
        let driver = tokio::spawn(async move { session.run().await });

        let spec = ObjectSpec::new("counter");
        client
            .write_request(&Request::new(1, Command::NewObject { spec }))
            .await
            .unwrap();

        // pipeline three increments without reading anything back
        for request_id in 2..=4 {
            client
                .write_request(&Request::new(
                    request_id,
                    Command::CallMethod {
                        object_id: ObjectId(1),
                        method: "increment".to_string(),
                        args: vec![],
                    },
                ))
                .await
                .unwrap();
        }

        assert_eq!(expect_ok(&mut client, 1).await, Some(json!(1)));
        assert_eq!(expect_ok(&mut client, 2).await, Some(json!(1)));
        assert_eq!(expect_ok(&mut client, 3).await, Some(json!(2)));
        assert_eq!(expect_ok(&mut client, 4).await, Some(json!(3)));

        client.write_request(&Request::new(5, Command::Stop)).await.unwrap();
        assert_eq!(driver.await.unwrap().unwrap(), SessionVerdict::Stop);
    }

    #[tokio::test]
    async fn test_unknown_type_is_answered_not_fatal() {
        let (mut session, mut client) = session_pair();
        let driver = tokio::spawn(async move { session.run().await });

        client
            .write_request(&Request::new(
                1,
                Command::NewObject {
                    spec: ObjectSpec::new("learner"),
                },
            ))
            .await
            .unwrap();
        let response = client.read_response().await.unwrap().unwrap();
        match response.outcome {
            Outcome::Error { kind, .. } => assert_eq!(kind, ErrorKind::UnknownType),
            other => panic!("Expected error outcome, got {other:?}"),
        }

        // connection is still alive
        client.write_request(&Request::new(2, Command::Ping)).await.unwrap();
        assert_eq!(expect_ok(&mut client, 2).await, Some(json!("pong")));

        drop(client);
        assert_eq!(driver.await.unwrap().unwrap(), SessionVerdict::Continue);
    }

    #[tokio::test]
    async fn test_void_method_answers_null_value() {
        let (mut session, mut client) = session_pair();
        let driver = tokio::spawn(async move { session.run().await });

        client
            .write_request(&Request::new(
                1,
                Command::NewObject {
                    spec: ObjectSpec::new("running_stats"),
                },
            ))
            .await
            .unwrap();
        expect_ok(&mut client, 1).await;

        client
            .write_request(&Request::new(
                2,
                Command::CallMethod {
                    object_id: ObjectId(1),
                    method: "observe".to_string(),
                    args: vec![json!(1.5)],
                },
            ))
            .await
            .unwrap();
        assert_eq!(expect_ok(&mut client, 2).await, None);

        drop(client);
        driver.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_eof_without_close_continues_listener() {
        let (mut session, client) = session_pair();
        drop(client);
        assert_eq!(session.run().await.unwrap(), SessionVerdict::Continue);
    }

    #[tokio::test]
    async fn test_help_lists_builtin_types() {
        let (mut session, mut client) = session_pair();
        let driver = tokio::spawn(async move { session.run().await });

        client.write_request(&Request::new(1, Command::Help)).await.unwrap();
        let value = expect_ok(&mut client, 1).await.unwrap();
        let text = value.as_str().unwrap();
        assert!(text.contains("counter"));
        assert!(text.contains("running_stats"));

        drop(client);
        driver.await.unwrap().unwrap();
    }
}
