use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xmlapi_core::{Element, MoveWhere, Operation, Version, XmlApiClient, XmlApiError};

fn xml(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/xml")
}

#[tokio::test]
async fn get_config_sends_key_and_returns_result_node() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .and(header("x-pan-key", "test-key"))
        .and(body_string_contains("action=get"))
        .respond_with(xml(
            r#"<response status="success" code="19"><result total-count="1" count="1"><address><entry name="web"><ip-netmask>10.0.0.1/32</ip-netmask></entry></address></result></response>"#,
        ))
        .mount(&server)
        .await;

    let client = XmlApiClient::with_base_url(&server.uri(), "test-key").unwrap();
    let node = client.get_config("/config/shared/address").await.unwrap();

    assert_eq!(node.name, "address");
    let entry = node.child("entry").unwrap();
    assert_eq!(entry.attribute("name"), Some("web"));
    assert_eq!(entry.child_text("ip-netmask"), Some("10.0.0.1/32"));
}

#[tokio::test]
async fn empty_get_result_is_object_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .respond_with(xml(
            r#"<response status="success" code="19"><result total-count="0" count="0"/></response>"#,
        ))
        .mount(&server)
        .await;

    let client = XmlApiClient::with_base_url(&server.uri(), "test-key").unwrap();
    let err = client
        .get_config("/config/shared/address/entry[@name='nope']")
        .await
        .unwrap_err();
    assert!(err.is_object_not_found());
}

#[tokio::test]
async fn show_config_error_code_seven_is_object_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .and(body_string_contains("action=show"))
        .respond_with(xml(
            r#"<response status="error" code="7"><msg>No such node</msg></response>"#,
        ))
        .mount(&server)
        .await;

    let client = XmlApiClient::with_base_url(&server.uri(), "test-key").unwrap();
    let err = client.show_config("/config/shared/tag").await.unwrap_err();
    assert!(matches!(err, XmlApiError::ObjectNotFound));
}

#[tokio::test]
async fn api_error_carries_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .respond_with(xml(
            r#"<response status="error" code="12"><msg><line>Invalid syntax</line></msg></response>"#,
        ))
        .mount(&server)
        .await;

    let client = XmlApiClient::with_base_url(&server.uri(), "test-key").unwrap();
    let err = client
        .edit_config(
            "/config/shared/tag/entry[@name='a']",
            &Element::new("entry").with_attribute("name", "a"),
        )
        .await
        .unwrap_err();
    match err {
        XmlApiError::Api { code, message } => {
            assert_eq!(code, Some(12));
            assert_eq!(message, "Invalid syntax");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn http_failure_keeps_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let client = XmlApiClient::with_base_url(&server.uri(), "test-key").unwrap();
    let err = client
        .delete_config("/config/shared/tag/entry[@name='a']")
        .await
        .unwrap_err();
    match err {
        XmlApiError::Http { status, body } => {
            assert_eq!(status.as_u16(), 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn chunked_multi_config_posts_each_chunk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .and(body_string_contains("action=multi-config"))
        .and(body_string_contains("target=0079000001"))
        .respond_with(xml(
            r#"<response status="success" code="20"><response id="1" status="success"><msg>ok</msg></response></response>"#,
        ))
        .expect(2)
        .mount(&server)
        .await;

    let client = XmlApiClient::with_base_url(&server.uri(), "test-key")
        .unwrap()
        .with_target("0079000001");
    let chunks = vec![
        vec![Operation::Delete {
            xpath: "/config/shared/tag/entry[@name='a']".into(),
        }],
        vec![Operation::Move {
            xpath: "/config/shared/rulebase/security/rules/entry[@name='r']".into(),
            position: MoveWhere::Top,
            destination: None,
        }],
        Vec::new(),
    ];
    let responses = client
        .chunked_multi_config(&chunks, true, &[])
        .await
        .unwrap();

    assert_eq!(responses.len(), 2);
    assert!(responses.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn system_info_parses_version() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .and(body_string_contains("type=op"))
        .respond_with(xml(
            r#"<response status="success"><result><system><hostname>fw01</hostname><model>PA-440</model><serial>0079000001</serial><sw-version>10.2.4-h3</sw-version></system></result></response>"#,
        ))
        .mount(&server)
        .await;

    let mut client = XmlApiClient::with_base_url(&server.uri(), "test-key").unwrap();
    let version = client.refresh_version().await.unwrap();

    assert_eq!(version, Version::new(10, 2, 4));
    assert_eq!(client.version(), Version::new(10, 2, 4));
}

#[tokio::test]
async fn read_nodes_returns_every_selected_node() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/"))
        .and(body_string_contains("action=get"))
        .respond_with(xml(
            r#"<response status="success" code="19"><result total-count="2" count="2"><entry name="a"/><entry name="b"/></result></response>"#,
        ))
        .mount(&server)
        .await;

    let client = XmlApiClient::with_base_url(&server.uri(), "test-key").unwrap();
    let nodes = client
        .read_nodes("get", "/config/shared/tag/entry[starts-with(@name,'a')]")
        .await
        .unwrap();

    let names: Vec<_> = nodes.iter().filter_map(|n| n.attribute("name")).collect();
    assert_eq!(names, vec!["a", "b"]);
}
