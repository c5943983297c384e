use std::{sync::Arc, time::Duration};

use actix_web::{body::MessageBody, dev::ServiceResponse, http::StatusCode, test, web, App};
use serde_json::{json, Value};

use eventure::{
    configure_app,
    gateway::GatewayError,
    models::{Event, User},
    service::{auth::jwt::{self, JwtKeys}, log::LoggerMiddleware},
    state::AppState,
    store::{MemoryStore, Store},
    testing::{self, StubGateway},
};

const SECRET: &str = "integration-secret";

struct Harness {
    store: Arc<MemoryStore>,
    keys: JwtKeys,
    organizer: User,
    attendee: User,
}

impl Harness {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let organizer = store.create_user(testing::organizer()).await.unwrap();
        let attendee = store.create_user(testing::attendee()).await.unwrap();
        Self {
            store,
            keys: JwtKeys::new(SECRET, Duration::from_secs(3600)),
            organizer,
            attendee,
        }
    }

    fn state(&self, gateway: StubGateway) -> web::Data<AppState> {
        web::Data::new(AppState::new(self.store.clone(), Arc::new(gateway), self.keys.clone()))
    }

    fn bearer(&self, user: &User) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", jwt::create(&self.keys, user).unwrap()))
    }

    async fn event(&self, price: i64) -> Event {
        self.store
            .create_event(testing::paid_event(self.organizer.id, price))
            .await
            .unwrap()
    }
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().wrap(LoggerMiddleware).configure(configure_app($state))).await
    };
}

async fn json_of<B: MessageBody>(res: ServiceResponse<B>) -> (StatusCode, Value) {
    let status = res.status();
    let body = test::read_body(res).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[actix_rt::test]
async fn free_ticket_then_double_check_in() {
    let h = Harness::new().await;
    let event = h.event(0).await;
    let app = app!(h.state(StubGateway::new()));

    let req = test::TestRequest::post()
        .uri("/api/tickets/free")
        .insert_header(h.bearer(&h.attendee))
        .set_json(json!({ "eventId": event.id }))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["ticket"]["status"], "confirmed");
    assert_eq!(body["ticket"]["event"], event.id.to_string());
    let code = body["ticket"]["ticketCode"].as_str().unwrap().to_string();

    let scan = || {
        test::TestRequest::post()
            .uri("/api/tickets/validate")
            .insert_header(h.bearer(&h.organizer))
            .set_json(json!({ "code": code, "eventId": event.id }))
            .to_request()
    };

    let (status, body) = json_of(test::call_service(&app, scan()).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wasCheckedIn"], false);
    assert_eq!(body["ticket"]["checkedIn"], true);
    assert_eq!(body["ticket"]["event"]["_id"], event.id.to_string());
    assert_eq!(body["ticket"]["user"]["id"], h.attendee.id.to_string());

    let (status, body) = json_of(test::call_service(&app, scan()).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wasCheckedIn"], true);
    assert_eq!(body["ticket"]["checkedIn"], true);
}

#[actix_rt::test]
async fn duplicate_free_ticket_is_a_bad_request() {
    let h = Harness::new().await;
    let event = h.event(0).await;
    let app = app!(h.state(StubGateway::new()));

    for expected in [StatusCode::OK, StatusCode::BAD_REQUEST] {
        let req = test::TestRequest::post()
            .uri("/api/tickets/free")
            .insert_header(h.bearer(&h.attendee))
            .set_json(json!({ "eventId": event.id }))
            .to_request();
        let (status, body) = json_of(test::call_service(&app, req).await).await;
        assert_eq!(status, expected);
        if status == StatusCode::BAD_REQUEST {
            assert_eq!(body["error"], "You already have a ticket for this event");
        }
    }
}

#[actix_rt::test]
async fn paid_ticket_is_issued_from_a_verified_reference() {
    let h = Harness::new().await;
    let event = h.event(5_000).await;
    let app = app!(h.state(StubGateway::new().with_success("ref_ok", 500_000, "NGN")));

    let req = test::TestRequest::post()
        .uri("/api/payments/verify")
        .insert_header(h.bearer(&h.attendee))
        .set_json(json!({ "reference": "ref_ok", "eventId": event.id, "ticketType": "regular", "quantity": 1 }))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticket"]["status"], "confirmed");
    assert_eq!(body["ticket"]["price"]["amount"], 5000.0);
    assert_eq!(body["payment"]["status"], "completed");
    assert_eq!(body["payment"]["transactionId"], "ref_ok");
    assert_eq!(body["payment"]["ticket"], body["ticket"]["_id"]);

    let req = test::TestRequest::get()
        .uri("/api/payments")
        .insert_header(h.bearer(&h.attendee))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[actix_rt::test]
async fn declined_and_unreachable_gateway_answers() {
    let h = Harness::new().await;
    let event = h.event(5_000).await;
    let gateway = StubGateway::new()
        .with_failure("ref_failed", GatewayError::NotSuccessful("failed".to_string()))
        .with_failure("ref_down", GatewayError::Transport("connection refused".to_string()))
        .with_failure("ref_slow", GatewayError::Timeout);
    let app = app!(h.state(gateway));

    for (reference, expected) in [
        ("ref_failed", StatusCode::BAD_REQUEST),
        ("ref_down", StatusCode::BAD_GATEWAY),
        ("ref_slow", StatusCode::GATEWAY_TIMEOUT),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/payments/verify")
            .insert_header(h.bearer(&h.attendee))
            .set_json(json!({ "reference": reference, "eventId": event.id }))
            .to_request();
        let (status, body) = json_of(test::call_service(&app, req).await).await;
        assert_eq!(status, expected, "{reference}");
        assert!(body["error"].is_string());
    }
    assert!(h.store.list_tickets_for_user(h.attendee.id).await.unwrap().is_empty());
}

#[actix_rt::test]
async fn wrong_event_and_foreign_organizer_are_rejected() {
    let h = Harness::new().await;
    let event = h.event(0).await;
    let other = h.event(0).await;
    let ticket = h
        .store
        .issue_ticket(testing::free_ticket(&event, h.attendee.id))
        .await
        .unwrap();
    let rival = h.store.create_user(testing::organizer()).await.unwrap();
    let app = app!(h.state(StubGateway::new()));

    let req = test::TestRequest::post()
        .uri("/api/tickets/validate")
        .insert_header(h.bearer(&h.organizer))
        .set_json(json!({ "code": ticket.ticket_code, "eventId": other.id }))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This ticket is not for the selected event");

    let req = test::TestRequest::post()
        .uri("/api/tickets/validate")
        .insert_header(h.bearer(&rival))
        .set_json(json!({ "code": ticket.ticket_code, "eventId": event.id }))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You are not the organizer for this event");

    let stored = h.store.find_ticket(ticket.id).await.unwrap().unwrap();
    assert!(!stored.checked_in);
}

#[actix_rt::test]
async fn missing_or_invalid_tokens_are_unauthorized() {
    let h = Harness::new().await;
    let event = h.event(0).await;
    let app = app!(h.state(StubGateway::new()));

    let req = test::TestRequest::post()
        .uri("/api/tickets/free")
        .set_json(json!({ "eventId": event.id }))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");

    let forged = JwtKeys::new("someone-else", Duration::from_secs(3600));
    let req = test::TestRequest::post()
        .uri("/api/tickets/free")
        .insert_header(("Authorization", format!("Bearer {}", jwt::create(&forged, &h.attendee).unwrap())))
        .set_json(json!({ "eventId": event.id }))
        .to_request();
    let (status, _) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // public reads stay open to anonymous callers
    let req = test::TestRequest::get().uri("/api/events").to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[actix_rt::test]
async fn malformed_body_is_a_json_bad_request() {
    let h = Harness::new().await;
    let app = app!(h.state(StubGateway::new()));

    let req = test::TestRequest::post()
        .uri("/api/tickets/free")
        .insert_header(h.bearer(&h.attendee))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[actix_rt::test]
async fn register_login_and_create_event() {
    let h = Harness::new().await;
    let app = app!(h.state(StubGateway::new()));

    let req = test::TestRequest::post()
        .uri("/api/users/register")
        .set_json(json!({
            "name": "Ngozi Eze",
            "email": "ngozi@example.com",
            "password": "organizer1",
            "passwordConfirm": "organizer1",
            "role": "organizer",
            "organizationName": "Eze Events"
        }))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.get("pwdHash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/users/login")
        .set_json(json!({ "email": "ngozi@example.com", "password": "organizer1" }))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let event = json!({
        "title": "Lagos Tech Summit",
        "category": "Technology",
        "date": { "startDate": "2030-05-01T09:00:00Z", "endDate": "2030-05-01T17:00:00Z" },
        "price": { "amount": 0 },
        "availableTickets": { "total": 300 },
        "status": "published"
    });
    let req = test::TestRequest::post()
        .uri("/api/events")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(&event)
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["event"]["status"], "published");
    assert_eq!(body["event"]["price"]["currency"], "NGN");

    let req = test::TestRequest::post()
        .uri("/api/events")
        .insert_header(h.bearer(&h.attendee))
        .set_json(&event)
        .to_request();
    let (status, _) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ngozi@example.com");
}

#[actix_rt::test]
async fn organizer_edits_and_cancels_their_event() {
    let h = Harness::new().await;
    let event = h.event(0).await;
    let app = app!(h.state(StubGateway::new()));
    let uri = format!("/api/events/{}", event.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(h.bearer(&h.organizer))
        .set_json(json!({ "title": "Afrobeats Live: Encore", "availableTickets": { "total": 50 } }))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["title"], "Afrobeats Live: Encore");
    assert_eq!(body["event"]["availableTickets"]["total"], 50);
    assert_eq!(body["event"]["category"], "Music");

    let other = h.store.create_user(testing::organizer()).await.unwrap();
    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(h.bearer(&other))
        .to_request();
    let (status, _) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete().uri(&uri).to_request();
    let (status, _) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(h.bearer(&h.organizer))
        .to_request();
    let (status, body) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["status"], "cancelled");

    let req = test::TestRequest::post()
        .uri("/api/tickets/free")
        .insert_header(h.bearer(&h.attendee))
        .set_json(json!({ "eventId": event.id }))
        .to_request();
    let (status, _) = json_of(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
