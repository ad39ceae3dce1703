//! WebSocket 服务端
//!
//! 连接流程：
//! 1. 客户端在 `auth_timeout` 内发送 `{"type":"auth","token":"..."}`
//! 2. 认证通过后服务端回复 `_system/connected`，开始转发 hub 中的消息
//! 3. 认证失败或超时回复 `_system/auth_failed` / `_system/auth_timeout` 并关闭
//!
//! 认证后客户端发来的文本帧只处理 `ping`，其余忽略。

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, info, warn};
use wastelink_shared::events::{RelayEvent, RelayEventType, system_event};

use crate::auth::Authenticator;
use crate::error::{RelayError, Result};
use crate::hub::Hub;

/// 默认认证超时
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket 端点状态
///
/// 宿主服务通过 `FromRef` 把它嵌入自己的路由状态。
#[derive(Clone)]
pub struct RelayState {
    pub hub: Arc<Hub>,
    pub authenticator: Arc<dyn Authenticator>,
    pub auth_timeout: Duration,
}

impl RelayState {
    pub fn new(hub: Arc<Hub>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            hub,
            authenticator,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }
}

/// `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(relay): State<RelayState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

async fn handle_socket(socket: WebSocket, relay: RelayState) {
    let (mut sender, mut receiver) = socket.split();

    let auth = tokio::time::timeout(
        relay.auth_timeout,
        authenticate(&mut receiver, relay.authenticator.as_ref()),
    )
    .await;

    let user_id = match auth {
        Ok(Ok(user_id)) => user_id,
        Ok(Err(RelayError::Closed)) => {
            debug!("Relay client closed before authenticating");
            return;
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Relay authentication failed");
            let _ = send_event(&mut sender, &RelayEvent::system(system_event::AUTH_FAILED)).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
        Err(_) => {
            warn!(timeout_secs = relay.auth_timeout.as_secs(), "Relay authentication timed out");
            let _ = send_event(&mut sender, &RelayEvent::system(system_event::AUTH_TIMEOUT)).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let mut subscription = relay.hub.register(&user_id);
    info!(user_id = %user_id, connection_id = subscription.id(), "Relay client connected");

    if send_event(&mut sender, &RelayEvent::system(system_event::CONNECTED))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            outbound = subscription.recv() => {
                let Some(event) = outbound else { break };
                if let Err(e) = send_event(&mut sender, &event).await {
                    debug!(error = %e, "Relay send failed, closing connection");
                    break;
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if is_ping(text.as_str())
                            && send_event(&mut sender, &RelayEvent::pong()).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(error = %e, "Relay receive error");
                        break;
                    }
                    // 协议层 ping/pong 由 axum 处理
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!(user_id = %user_id, connection_id = subscription.id(), "Relay client disconnected");
}

/// 等待首个文本帧并校验令牌
async fn authenticate<S>(receiver: &mut S, authenticator: &dyn Authenticator) -> Result<String>
where
    S: Stream<Item = std::result::Result<Message, axum::Error>> + Unpin,
{
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                let token = parse_auth_frame(text.as_str())?;
                return authenticator.authenticate(&token).await;
            }
            Some(Ok(Message::Close(_))) | None => return Err(RelayError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// 解析认证帧，返回令牌
pub fn parse_auth_frame(text: &str) -> Result<String> {
    let event: RelayEvent =
        serde_json::from_str(text).map_err(|_| RelayError::AuthFrameExpected)?;

    match (event.event_type, event.token) {
        (RelayEventType::Auth, Some(token)) if !token.is_empty() => Ok(token),
        _ => Err(RelayError::AuthFrameExpected),
    }
}

fn is_ping(text: &str) -> bool {
    serde_json::from_str::<RelayEvent>(text)
        .map(|e| e.event_type == RelayEventType::Ping)
        .unwrap_or(false)
}

async fn send_event<S>(sender: &mut S, event: &RelayEvent) -> Result<()>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let payload = serde_json::to_string(event)?;
    sender.send(Message::Text(payload.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuthenticator;
    use futures::stream;

    #[test]
    fn test_parse_auth_frame() {
        assert_eq!(
            parse_auth_frame(r#"{"type":"auth","token":"abc"}"#).unwrap(),
            "abc"
        );
    }

    #[test]
    fn test_parse_auth_frame_rejects_other_frames() {
        let cases = [
            r#"{"type":"ping"}"#,
            r#"{"type":"auth"}"#,
            r#"{"type":"auth","token":""}"#,
            r#"not json"#,
            r#"{"type":"unknown","token":"abc"}"#,
        ];
        for case in cases {
            assert!(
                matches!(parse_auth_frame(case), Err(RelayError::AuthFrameExpected)),
                "{case}"
            );
        }
    }

    #[test]
    fn test_is_ping() {
        assert!(is_ping(r#"{"type":"ping"}"#));
        assert!(!is_ping(r#"{"type":"pong"}"#));
        assert!(!is_ping("garbage"));
    }

    #[tokio::test]
    async fn test_authenticate_uses_authenticator() {
        let mut auth = MockAuthenticator::new();
        auth.expect_authenticate()
            .times(1)
            .returning(|_| Ok("user-9".to_string()));

        let frames = vec![
            Ok(Message::Ping(axum::body::Bytes::new())),
            Ok(Message::Text(r#"{"type":"auth","token":"good"}"#.into())),
        ];
        let mut receiver = stream::iter(frames);

        let user_id = authenticate(&mut receiver, &auth).await.unwrap();
        assert_eq!(user_id, "user-9");
    }

    #[tokio::test]
    async fn test_authenticate_closed_stream() {
        let auth = MockAuthenticator::new();
        let mut receiver = stream::iter(Vec::<std::result::Result<Message, axum::Error>>::new());

        assert!(matches!(
            authenticate(&mut receiver, &auth).await,
            Err(RelayError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_non_auth_first_frame() {
        let auth = MockAuthenticator::new();
        let frames = vec![Ok(Message::Text(r#"{"type":"ping"}"#.into()))];
        let mut receiver = stream::iter(frames);

        assert!(matches!(
            authenticate(&mut receiver, &auth).await,
            Err(RelayError::AuthFrameExpected)
        ));
    }
}
