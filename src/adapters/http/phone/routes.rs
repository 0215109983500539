//! Axum router configuration for the phone webhooks.
//!
//! The provider may be configured to call back with GET or POST, so every
//! route accepts both.

use axum::{routing::get, Router};

use super::handlers::{
    call_status, inbound_call, outbound_call, prompt, prompt_response, receive_recording,
    timeout, transcribe, PhoneAppState,
};

/// Create the phone webhook router, mounted at `/phone`.
///
/// # Routes
///
/// ## Call flow (answered with voice markup)
/// - `/:tree/inbound` - New inbound call
/// - `/:tree/outbound` - Outbound call answered
/// - `/:tree/prompt/:turn` - Play a prompt
/// - `/:tree/prompt_response/:turn` - Caller answered
/// - `/:tree/timeout/:turn` - Caller gave no input
///
/// ## Callbacks (answered with an empty document)
/// - `/status` - Call status changed
/// - `/receive_recording/:turn` - Recording available
/// - `/transcribe/:turn` - Transcription finished
pub fn phone_routes() -> Router<PhoneAppState> {
    Router::new()
        // Call flow
        .route("/:tree/inbound", get(inbound_call).post(inbound_call))
        .route("/:tree/outbound", get(outbound_call).post(outbound_call))
        .route("/:tree/prompt/:turn", get(prompt).post(prompt))
        .route(
            "/:tree/prompt_response/:turn",
            get(prompt_response).post(prompt_response),
        )
        .route("/:tree/timeout/:turn", get(timeout).post(timeout))
        // Callbacks
        .route("/status", get(call_status).post(call_status))
        .route(
            "/receive_recording/:turn",
            get(receive_recording).post(receive_recording),
        )
        .route("/transcribe/:turn", get(transcribe).post(transcribe))
}

pub fn phone_router() -> Router<PhoneAppState> {
    Router::new().nest("/phone", phone_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::application::handlers::phone::testing::{favourite_tree, Harness};
    use crate::ports::TurnRepository;

    fn state(h: &Harness) -> PhoneAppState {
        PhoneAppState {
            registry: h.registry.clone(),
            sessions: h.sessions(),
            turns: h.turns(),
            recordings: h.recordings(),
            callers: h.callers(),
            scheduler: h.scheduler(),
            policy: h.policy(),
            settings: h.settings.clone(),
            account_sid: Arc::from("AC123"),
        }
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(h: &Harness, request: Request<Body>) -> (StatusCode, String) {
        let app = phone_router().with_state(state(h));
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    const INBOUND: &str =
        "AccountSid=AC123&CallSid=CA1&From=%2B16135550000&To=%2B16135551234&CallStatus=ringing";

    #[test]
    fn phone_router_creates_router() {
        let h = Harness::new(vec![favourite_tree()]);
        let _: Router<()> = phone_router().with_state(state(&h));
    }

    #[tokio::test]
    async fn inbound_post_greets_and_redirects() {
        let h = Harness::new(vec![favourite_tree()]);

        let (status, body) = send(&h, post("/phone/favourite/inbound", INBOUND)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<Say"));
        assert!(body.contains("Welcome."));
        assert!(body.contains("<Redirect"));
        assert!(body.contains("/phone/favourite/prompt/"));
        assert_eq!(h.store.session_count().await, 1);
    }

    #[tokio::test]
    async fn inbound_get_reads_query_string() {
        let h = Harness::new(vec![favourite_tree()]);
        let request = Request::builder()
            .uri(format!("/phone/favourite/inbound?{}", INBOUND))
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&h, request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<Redirect"));
    }

    #[tokio::test]
    async fn wrong_account_gets_bare_hangup() {
        let h = Harness::new(vec![favourite_tree()]);
        let body = INBOUND.replace("AC123", "AC999");

        let (status, body) = send(&h, post("/phone/favourite/inbound", &body)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.ends_with("<Response><Hangup/></Response>"));
        assert_eq!(h.store.session_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_tree_is_404() {
        let h = Harness::new(vec![favourite_tree()]);
        let (status, _) = send(&h, post("/phone/nope/inbound", INBOUND)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn prompt_renders_gather_for_turn() {
        let h = Harness::new(vec![favourite_tree()]);
        send(&h, post("/phone/favourite/inbound", INBOUND)).await;
        let session = h.session("CA1").await;
        let turn = h.store.turns_for(session.id()).await.remove(0);

        let (status, body) = send(
            &h,
            post(
                &format!("/phone/favourite/prompt/{}", turn.id()),
                "AccountSid=AC123&CallSid=CA1&CallStatus=in-progress",
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<Gather"));
        assert!(body.contains("Pick a number"));
        assert!(body.contains(&format!("/phone/favourite/prompt_response/{}", turn.id())));
    }

    #[tokio::test]
    async fn status_callback_returns_empty_document() {
        let h = Harness::new(vec![favourite_tree()]);
        send(&h, post("/phone/favourite/inbound", INBOUND)).await;

        let (status, body) = send(
            &h,
            post("/phone/status", "AccountSid=AC123&CallSid=CA1&CallStatus=completed"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.ends_with("<Response></Response>"));
        assert!(h.session("CA1").await.is_completed());
    }

    #[tokio::test]
    async fn receive_recording_attaches_to_turn() {
        let h = Harness::new(vec![favourite_tree()]);
        send(&h, post("/phone/favourite/inbound", INBOUND)).await;
        let session = h.session("CA1").await;
        let turn = h.store.turns_for(session.id()).await.remove(0);

        let (status, _) = send(
            &h,
            post(
                &format!("/phone/receive_recording/{}", turn.id()),
                "AccountSid=AC123&CallSid=CA1&RecordingSid=RE1&RecordingUrl=https%3A%2F%2Fapi.example.com%2FRE1",
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let stored = TurnRepository::find_by_id(h.store.as_ref(), turn.id())
            .await
            .unwrap()
            .unwrap();
        assert!(stored.recording_id().is_some());
    }

    #[tokio::test]
    async fn malformed_turn_id_is_rejected() {
        let h = Harness::new(vec![favourite_tree()]);
        let (status, _) = send(
            &h,
            post("/phone/favourite/prompt/not-a-uuid", "AccountSid=AC123&CallSid=CA1"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
