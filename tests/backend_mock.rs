//! Session behaviour against a mock content backend.

use community_gen::{
    Block, ClientConfig, CommunityGenError, Entity, GeneratedContent, HttpBackend, Language,
    SelectedApi, Session, TargetAudience, Upload, WritingStyle,
};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_for(server: &MockServer) -> Session {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .timeout_secs(5)
        .build()
        .unwrap();
    Session::new(Arc::new(HttpBackend::new(config).unwrap()))
}

fn fill_form(session: &mut Session) {
    session.set_community_name("Vista Azul");
    session.set_location("Cancún");
    session.set_target_audience(TargetAudience::Families);
    session.set_writing_style([WritingStyle::Narrative, WritingStyle::SeoFriendly]);
    session.set_language(Language::Spanish);
    session.set_selected_api(SelectedApi::Anthropic);
    session.set_entities(vec![Entity::new(json!({"amenity": "pool"}))]);
}

fn brochure() -> Upload {
    Upload::new("brochure.pdf", b"%PDF-1.7 fake".to_vec())
}

#[tokio::test]
async fn test_upload_sends_file_part_and_stores_entities_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract-info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "entities": [{"name": "a"}, {"name": "b"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let count = session.upload(brochure()).await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(
        session.form().entities,
        vec![
            Entity::new(json!({"name": "a"})),
            Entity::new(json!({"name": "b"}))
        ]
    );

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""), "multipart body: {body}");
    assert!(body.contains("filename=\"brochure.pdf\""));
    assert!(body.contains("%PDF-1.7 fake"));
}

#[tokio::test]
async fn test_upload_from_disk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract-info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"entities": [1, 2, 3]})))
        .expect(1)
        .mount(&server)
        .await;

    let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    tmp.write_all(b"%PDF-1.4").unwrap();

    let mut session = session_for(&server);
    assert_eq!(session.upload_file(tmp.path()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_upload_failure_leaves_entities_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract-info/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "PDF unreadable"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let before = vec![Entity::new(json!("kept"))];
    session.set_entities(before.clone());

    let err = session.upload(brochure()).await.unwrap_err();
    match err {
        CommunityGenError::UploadFailed { status, detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail, "PDF unreadable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.form().entities, before);
}

#[tokio::test]
async fn test_upload_without_entities_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract-info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let err = session.upload(brochure()).await.unwrap_err();
    assert!(matches!(err, CommunityGenError::MalformedResponse { .. }));
    assert!(session.form().entities.is_empty());
}

#[tokio::test]
async fn test_generate_sends_all_seven_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate-content/"))
        .and(body_partial_json(json!({
            "communityName": "Vista Azul",
            "location": "Cancún",
            "entities": [{"amenity": "pool"}],
            "targetAudience": "families",
            "writingStyle": ["seo_friendly", "narrative"],
            "language": "spanish",
            "selectedAPI": "anthropic"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "generated_text": "### Title\n\nBody text"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    fill_form(&mut session);

    let content = session.generate().await.unwrap();
    assert_eq!(
        content,
        &GeneratedContent::Markdown("### Title\n\nBody text".to_string())
    );
    assert!(!session.is_generating());
    assert_eq!(
        session.rendered(),
        vec![
            Block::Heading {
                level: 3,
                text: "Title".into()
            },
            Block::Paragraph {
                text: "Body text".into()
            },
        ]
    );

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body.as_object().unwrap().len(), 7);
}

#[tokio::test]
async fn test_generate_with_content_blocks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate-content/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "generated_text": [
                {"type": "text", "text": "A"},
                {"type": "image", "source": "x.png"},
                {"type": "text", "text": "B"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    fill_form(&mut session);
    session.generate().await.unwrap();

    assert_eq!(
        session.rendered(),
        vec![
            Block::Paragraph { text: "A".into() },
            Block::Paragraph { text: "B".into() },
        ]
    );
}

#[tokio::test]
async fn test_incomplete_form_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    fill_form(&mut session);
    session.set_location("   ");

    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, CommunityGenError::Validation(_)));
    assert!(session.generated().is_none());
}

#[tokio::test]
async fn test_payload_too_large_keeps_previous_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate-content/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"generated_text": "First"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/generate-content/"))
        .respond_with(ResponseTemplate::new(413).set_body_string("Request Entity Too Large"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    fill_form(&mut session);
    session.generate().await.unwrap();

    let err = session.generate().await.unwrap_err();
    assert!(matches!(
        err,
        CommunityGenError::PayloadTooLarge {
            limit_bytes: 5_242_880,
            ..
        }
    ));
    assert_eq!(
        session.generated(),
        Some(&GeneratedContent::Markdown("First".to_string()))
    );
    assert!(!session.is_generating());
}

#[tokio::test]
async fn test_server_error_uses_message_from_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate-content/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "message": "Invalid API selection"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    fill_form(&mut session);

    match session.generate().await.unwrap_err() {
        CommunityGenError::GenerationFailed { status, detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail, "Invalid API selection");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!session.is_generating());
    assert!(session.generated().is_none());
}

#[tokio::test]
async fn test_held_busy_flag_blocks_generation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    fill_form(&mut session);
    let flag = session.busy_flag();
    let _guard = flag.try_acquire().unwrap();

    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, CommunityGenError::GenerationInProgress));
}

#[tokio::test]
async fn test_backend_version() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "1.0.0"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder().base_url(server.uri()).build().unwrap();
    let backend = HttpBackend::new(config).unwrap();
    assert_eq!(backend.version().await.unwrap(), "1.0.0");
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Port 9 (discard) is closed on test hosts.
    let config = ClientConfig::builder()
        .base_url("http://127.0.0.1:9")
        .timeout_secs(2)
        .build()
        .unwrap();
    let mut session = Session::new(Arc::new(HttpBackend::new(config).unwrap()));

    let err = session.upload(brochure()).await.unwrap_err();
    assert!(matches!(err, CommunityGenError::Network { .. }));
}

#[tokio::test]
async fn test_malformed_block_elements_are_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate-content/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "generated_text": [
                {"type": "text", "text": "A"},
                {"text": "x"},
                "stray",
                {"type": "text", "text": "B"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    fill_form(&mut session);
    session.generate().await.unwrap();

    assert_eq!(
        session.rendered(),
        vec![
            Block::Paragraph { text: "A".into() },
            Block::Paragraph { text: "B".into() },
        ]
    );
}

#[tokio::test]
async fn test_oversized_upload_is_payload_too_large() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract-info/"))
        .respond_with(ResponseTemplate::new(413).set_body_json(json!({
            "detail": "File too large. Maximum size allowed is 5MB."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let err = session.upload(brochure()).await.unwrap_err();

    assert!(matches!(err, CommunityGenError::PayloadTooLarge { .. }));
    assert_eq!(
        err.to_string(),
        "File too large. Please upload a file less than 5MB."
    );
    assert!(session.form().entities.is_empty());
}
