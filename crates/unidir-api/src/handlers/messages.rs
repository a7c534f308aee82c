// Unidir
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Messaging handlers

use crate::auth::SessionContext;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{json_response, parse_json};
use crate::messaging::{self, MessageFeed};
use crate::models::SendMessageRequest;
use http_body_util::Full;
use hyper::{Request, Response, StatusCode, body::Bytes};
use metrics::counter;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Send a message
/// POST /api/v1/messages
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = crate::messaging::Message),
        (status = 400, description = "Empty or oversized content"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Messaging"
)]
pub async fn send_message(body: Bytes, session: &SessionContext, feed: Arc<MessageFeed>) -> ApiResult<Response<Full<Bytes>>> {
    let request: SendMessageRequest = parse_json(&body)?;
    let message = feed.send(session, &request.content, request.receiver_id).await?;
    json_response(StatusCode::CREATED, &message)
}

/// The caller's most recent sent and received messages
/// GET /api/v1/messages
#[utoipa::path(
    get,
    path = "/api/v1/messages",
    responses(
        (status = 200, description = "Up to 100 messages in arrival order", body = [crate::messaging::MessageEntry]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Messaging"
)]
pub async fn list_messages(session: &SessionContext, feed: Arc<MessageFeed>) -> ApiResult<Response<Full<Bytes>>> {
    let messages = feed.visible(session).await?;
    json_response(StatusCode::OK, &messages)
}

/// Mark a received message as read
/// POST /api/v1/messages/{id}/read
#[utoipa::path(
    post,
    path = "/api/v1/messages/{id}/read",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message marked as read", body = crate::messaging::Message),
        (status = 403, description = "Caller is not the receiver"),
        (status = 404, description = "Message not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Messaging"
)]
pub async fn mark_read(id: &str, session: &SessionContext, feed: Arc<MessageFeed>) -> ApiResult<Response<Full<Bytes>>> {
    let message_id = Uuid::parse_str(id).map_err(|_| ApiError::bad_request(format!("Invalid message id: {}", id)))?;
    let message = feed.mark_read(session, message_id).await?;
    json_response(StatusCode::OK, &message)
}

/// Live feed of the caller's messages over WebSocket
/// GET /api/v1/messages/stream
///
/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// also be passed as the `access_token` query parameter.
#[utoipa::path(
    get,
    path = "/api/v1/messages/stream",
    params(("access_token" = Option<String>, Query, description = "Bearer token when no Authorization header is sent")),
    responses(
        (status = 101, description = "Switching to WebSocket; each frame is a FeedEvent", body = crate::messaging::FeedEvent),
        (status = 400, description = "Not a WebSocket upgrade request"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Messaging"
)]
pub async fn stream_messages(mut request: Request<()>, session: &SessionContext, feed: Arc<MessageFeed>) -> ApiResult<Response<Full<Bytes>>> {
    if !hyper_tungstenite::is_upgrade_request(&request) {
        return Err(ApiError::bad_request("Expected a WebSocket upgrade request"));
    }

    let (response, websocket) = hyper_tungstenite::upgrade(&mut request, None).map_err(|e| {
        warn!("WebSocket handshake rejected: {}", e);
        ApiError::bad_request(format!("WebSocket upgrade failed: {}", e))
    })?;

    // Subscribe before answering so nothing sent after the handshake is missed
    let receiver = feed.subscribe();
    let user_id = session.user_id;

    counter!("unidir_stream_connections_total", 1);
    info!("Message stream opened for {}", user_id);

    tokio::spawn(async move {
        match websocket.await {
            Ok(websocket) => {
                if let Err(e) = messaging::stream_to(websocket, user_id, receiver).await {
                    warn!("Message stream of {} ended with error: {}", user_id, e);
                }
            }
            Err(e) => error!("WebSocket upgrade of {} failed: {}", user_id, e),
        }
    });

    Ok(response)
}
