#![allow(clippy::unwrap_used)]
// Integration tests for `NetBoxClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dnasync_api::netbox::models::{NbSite, SiteWrite, TagRef, endpoint};
use dnasync_api::{Error, NetBoxClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NetBoxClient) {
    let server = MockServer::start().await;
    let client = NetBoxClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn site(id: u64, slug: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Site {id}"),
        "slug": slug,
        "status": { "value": "active", "label": "Active" },
        "tags": [{ "id": 1, "name": "Cisco DNA Center", "slug": "cisco-dna-center" }]
    })
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_token_header_is_sent() {
    let server = MockServer::start().await;
    let token: SecretString = "nb-token".to_string().into();
    let client = NetBoxClient::from_token(&server.uri(), &token, &TransportConfig::default())
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .and(header("Authorization", "Token nb-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 0, "next": null, "results": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sites: Vec<NbSite> = client.list(endpoint::SITES, &[]).await.unwrap();
    assert!(sites.is_empty());
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_follows_next_links() {
    let (server, client) = setup().await;
    let client = client.with_page_size(1);

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .and(query_param("tag", "cisco-dna-center"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": format!("{}/api/dcim/sites/?tag=cisco-dna-center&limit=1&offset=1", server.uri()),
            "results": [site(1, "site-a")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "next": null,
            "results": [site(2, "site-b")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sites: Vec<NbSite> = client
        .list(endpoint::SITES, &[("tag", "cisco-dna-center".into())])
        .await
        .unwrap();

    let slugs: Vec<_> = sites.iter().map(|s| s.slug.as_str()).collect();
    assert_eq!(slugs, vec!["site-a", "site-b"]);
    assert_eq!(sites[0].tags[0].slug, "cisco-dna-center");
}

#[tokio::test]
async fn test_find_returns_none_on_empty_page() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/sites/"))
        .and(query_param("slug", "nope"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 0, "next": null, "results": []
        })))
        .mount(&server)
        .await;

    let found: Option<NbSite> = client
        .find(endpoint::SITES, &[("slug", "nope".into())])
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_count_reads_total() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/"))
        .and(query_param("tenant_id", "3"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 42, "next": "ignored", "results": [{}]
        })))
        .mount(&server)
        .await;

    let count = client
        .count(endpoint::DEVICES, &[("tenant_id", "3".into())])
        .await
        .unwrap();
    assert_eq!(count, 42);
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_sends_only_changed_fields() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/dcim/sites/9/"))
        .and(body_json(json!({
            "physical_address": "1 Main St",
            "tags": [{ "slug": "cisco-dna-center" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(site(9, "site-9")))
        .expect(1)
        .mount(&server)
        .await;

    let body = SiteWrite {
        physical_address: Some("1 Main St".into()),
        tags: Some(vec![TagRef::new("cisco-dna-center")]),
        ..SiteWrite::default()
    };
    let updated: NbSite = client.update(endpoint::SITES, 9, &body).await.unwrap();
    assert_eq!(updated.id, 9);
}

#[tokio::test]
async fn test_delete_hits_object_url() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/ipam/ip-addresses/5/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete(endpoint::IP_ADDRESSES, 5).await.unwrap();
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_validation_errors_are_flattened() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/dcim/sites/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "slug": ["site with this slug already exists."]
        })))
        .mount(&server)
        .await;

    let body = SiteWrite {
        name: Some("Dup".into()),
        slug: Some("dup".into()),
        ..SiteWrite::default()
    };
    let err = client
        .create::<NbSite, _>(endpoint::SITES, &body)
        .await
        .unwrap_err();

    match err {
        Error::NetBox { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "slug: site with this slug already exists.");
        }
        other => panic!("expected NetBox error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/tenancy/tenants/77/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .mount(&server)
        .await;

    let err = client
        .get::<serde_json::Value>(endpoint::TENANTS, 77)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
