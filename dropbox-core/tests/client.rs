use dropbox_core::{
    CopySource, DropboxClient, DropboxConfig, DropboxError, MetadataOptions, Root, StaticToken,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn file_json(path: &str) -> serde_json::Value {
    json!({
        "size": "225.4KB",
        "rev": "35e97029684fe",
        "thumb_exists": false,
        "bytes": 230783,
        "modified": "Tue, 19 Jul 2011 21:55:38 +0000",
        "client_mtime": "Mon, 18 Jul 2011 18:04:35 +0000",
        "path": path,
        "is_dir": false,
        "icon": "page_white_acrobat",
        "root": "dropbox",
        "mime_type": "application/pdf"
    })
}

#[tokio::test]
async fn account_info_sends_bearer_token_and_locale() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/account/info"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("locale", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "referral_link": "https://www.dropbox.com/referrals/r1a2n3d4m5s6t7",
            "display_name": "John P. User",
            "uid": 12345678,
            "country": "US",
            "quota_info": {
                "shared": 253738410565u64,
                "quota": 107374182400000u64,
                "normal": 680031877871u64
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DropboxClient::with_base_url(&server.uri(), "test-token").unwrap();
    let account = client.account_info().await.unwrap();

    assert_eq!(account.display_name, "John P. User");
    assert_eq!(account.uid, 12345678);
    assert_eq!(account.quota_info.quota, 107374182400000);
}

#[tokio::test]
async fn configured_locale_is_the_default_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/media/dropbox/Photos/a.jpg"))
        .and(query_param("locale", "fr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://dl.dropboxusercontent.com/1/view/abc/Photos/a.jpg",
            "expires": "Thu, 16 Sep 2011 01:01:25 +0000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = DropboxConfig::default()
        .with_base_url(&server.uri())
        .with_locale("fr");
    let client = DropboxClient::with_config(config, StaticToken::new("t")).unwrap();
    let link = client.media("/Photos/a.jpg").await.unwrap();

    assert!(link.url.ends_with("/Photos/a.jpg"));
}

#[tokio::test]
async fn metadata_lists_children_with_clamped_limit() {
    let server = MockServer::start().await;

    let mut folder = file_json("/Photos");
    folder["is_dir"] = json!(true);
    folder["hash"] = json!("37eb1ba1849d4b0fb0b28caf7ef3af52");
    folder["contents"] = json!([file_json("/Photos/a.pdf")]);

    Mock::given(method("GET"))
        .and(path("/metadata/dropbox/Photos"))
        .and(query_param("list", "true"))
        .and(query_param("include_deleted", "false"))
        .and(query_param("file_limit", "25000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder))
        .expect(1)
        .mount(&server)
        .await;

    let client = DropboxClient::with_base_url(&server.uri(), "test-token").unwrap();
    let entry = client
        .metadata(
            "/Photos",
            &MetadataOptions {
                list: true,
                file_limit: Some(99_999),
                ..MetadataOptions::default()
            },
        )
        .await
        .unwrap();

    assert!(entry.is_dir);
    let contents = entry.contents.expect("listing requested");
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].path, "/Photos/a.pdf");
    assert!(contents[0].contents.is_none());
}

#[tokio::test]
async fn metadata_without_limit_uses_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/dropbox/a.pdf"))
        .and(query_param("file_limit", "10000"))
        .and(query_param("rev", "35e97029684fe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("/a.pdf")))
        .expect(1)
        .mount(&server)
        .await;

    let client = DropboxClient::with_base_url(&server.uri(), "test-token").unwrap();
    let entry = client
        .metadata(
            "a.pdf",
            &MetadataOptions {
                rev: Some("35e97029684fe".into()),
                file_limit: Some(0),
                ..MetadataOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(entry.bytes, 230783);
    assert_eq!(entry.modified_at().unwrap().year(), 2011);
}

#[tokio::test]
async fn search_clamps_file_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/sandbox/Docs"))
        .and(query_param("query", "report 2014"))
        .and(query_param("file_limit", "1000"))
        .and(query_param("include_deleted", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([file_json("/Docs/report 2014.pdf")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = DropboxConfig::default()
        .with_base_url(&server.uri())
        .with_root(Root::Sandbox);
    let client = DropboxClient::with_config(config, StaticToken::new("t")).unwrap();
    let results = client
        .search("/Docs", "report 2014", Some(5000), true)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn revisions_default_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/revisions/dropbox/a.pdf"))
        .and(query_param("rev_limit", "10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([file_json("/a.pdf"), file_json("/a.pdf")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = DropboxClient::with_base_url(&server.uri(), "test-token").unwrap();
    let revisions = client.revisions("/a.pdf", None).await.unwrap();

    assert_eq!(revisions.len(), 2);
}

#[tokio::test]
async fn copy_from_reference_uses_copy_ref_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/copy_ref/dropbox/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "copy_ref": "z1X6ATl6aWtzOGq0c3g5Ng",
            "expires": "Fri, 31 Jan 2042 21:01:05 +0000"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fileops/copy"))
        .and(query_param("root", "dropbox"))
        .and(query_param("to_path", "/Shared/a.pdf"))
        .and(query_param("from_copy_ref", "z1X6ATl6aWtzOGq0c3g5Ng"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("/Shared/a.pdf")))
        .expect(1)
        .mount(&server)
        .await;

    let source = DropboxClient::with_base_url(&server.uri(), "owner-token").unwrap();
    let copy_ref = source.copy_ref("/a.pdf").await.unwrap();

    let other_account = source.with_credentials(StaticToken::new("other-token"));
    let entry = other_account
        .copy(CopySource::Ref(&copy_ref.copy_ref), "/Shared/a.pdf")
        .await
        .unwrap();

    assert_eq!(entry.path, "/Shared/a.pdf");
}

#[tokio::test]
async fn file_operations_send_root_and_paths() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fileops/move"))
        .and(query_param("root", "dropbox"))
        .and(query_param("from_path", "/a.pdf"))
        .and(query_param("to_path", "/b.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("/b.pdf")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fileops/create_folder"))
        .and(query_param("path", "/New"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": "/New", "is_dir": true, "bytes": 0
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fileops/delete"))
        .and(query_param("path", "/b.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": "/b.pdf", "is_deleted": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/restore/dropbox/b.pdf"))
        .and(query_param("rev", "35e97029684fe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("/b.pdf")))
        .expect(1)
        .mount(&server)
        .await;

    let client = DropboxClient::with_base_url(&server.uri(), "test-token").unwrap();

    assert_eq!(client.move_entry("/a.pdf", "/b.pdf").await.unwrap().path, "/b.pdf");
    assert!(client.create_folder("/New").await.unwrap().is_dir);
    assert!(client.delete("/b.pdf").await.unwrap().is_deleted);
    assert_eq!(
        client.restore("/b.pdf", "35e97029684fe").await.unwrap().rev,
        "35e97029684fe"
    );
}

#[tokio::test]
async fn shares_sends_short_url_only_when_asked() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/shares/dropbox/a.pdf"))
        .and(query_param("short_url", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://db.tt/APqhX1",
            "expires": "Tue, 01 Jan 2030 00:00:00 +0000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DropboxClient::with_base_url(&server.uri(), "test-token").unwrap();
    let link = client.shares("/a.pdf", true).await.unwrap();

    assert_eq!(link.url, "https://db.tt/APqhX1");
}

#[tokio::test]
async fn missing_token_is_rejected_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = DropboxClient::with_base_url(&server.uri(), "").unwrap();
    let err = client.account_info().await.unwrap_err();

    assert!(matches!(err, DropboxError::NotAuthenticated));
}

#[tokio::test]
async fn status_codes_become_typed_errors() {
    let server = MockServer::start().await;

    Mock::given(path("/metadata/dropbox/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "Path '/missing' not found"
        })))
        .mount(&server)
        .await;
    Mock::given(path("/account/info"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid access token"
        })))
        .mount(&server)
        .await;
    Mock::given(path("/revisions/dropbox/a.pdf"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"rev_limit": "must be at most 1000"}
        })))
        .mount(&server)
        .await;
    Mock::given(path("/fileops/delete"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;
    Mock::given(path("/copy_ref/dropbox/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = DropboxClient::with_base_url(&server.uri(), "test-token").unwrap();

    assert!(matches!(
        client
            .metadata("/missing", &MetadataOptions::default())
            .await
            .unwrap_err(),
        DropboxError::NotFound
    ));
    assert!(matches!(
        client.account_info().await.unwrap_err(),
        DropboxError::NotAuthenticated
    ));
    assert!(matches!(
        client.revisions("/a.pdf", Some(10)).await.unwrap_err(),
        DropboxError::BadRequest(msg) if msg == "rev_limit: must be at most 1000"
    ));
    assert!(matches!(
        client.delete("/x").await.unwrap_err(),
        DropboxError::Api { status, .. } if status.as_u16() == 503
    ));
    assert!(matches!(
        client.copy_ref("/a.pdf").await.unwrap_err(),
        DropboxError::MalformedReply(_)
    ));
}
