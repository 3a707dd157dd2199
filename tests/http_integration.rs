//! Integration tests for the GCP client using wiremock
//!
//! These tests verify the client behavior against mocked endpoints: response
//! classification, request shape and pagination.

use serde::Deserialize;
use serde_json::json;
use tgcp_inventory::gcp::auth::Credentials;
use tgcp_inventory::gcp::client::{Endpoints, GcpClient};
use tgcp_inventory::resource::{fetch_all, Items, ListRequest};
use tgcp_inventory::ApiError;
use wiremock::matchers::{
    bearer_token, body_json, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GcpClient {
    GcpClient::with_credentials(
        "test-project",
        "us-central1",
        Endpoints::single(&server.uri()).unwrap(),
        Credentials::fixed("test-token"),
    )
    .unwrap()
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

mod http_client_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_success_returns_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/global/networks"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "default"}, {"name": "vpc-1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client
            .get(&client.compute_global_url("networks"), &[])
            .await
            .unwrap();

        assert_eq!(response["items"].as_array().unwrap().len(), 2);
        assert_eq!(response["items"][1]["name"], "vpc-1");
    }

    #[tokio::test]
    async fn test_permission_denied_is_access_denied() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/storage/v1/b"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "caller does not have storage.buckets.list access",
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get(&client.storage_url("b"), &[]).await.unwrap_err();

        assert!(err.is_access_denied());
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("storage.buckets.list"));
    }

    #[tokio::test]
    async fn test_rate_limited_403_is_a_plain_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "Rate Limit Exceeded",
                    "errors": [{"reason": "rateLimitExceeded"}]
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get(&client.pubsub_url("topics"), &[]).await.unwrap_err();

        assert!(!err.is_access_denied());
        assert!(matches!(err, ApiError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_not_found_keeps_provider_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "The resource 'vpc-9' was not found"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .get(&client.compute_global_url("networks/vpc-9"), &[])
            .await
            .unwrap_err();

        match err {
            ApiError::Status {
                status, message, ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "The resource 'vpc-9' was not found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json {"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get(&client.dns_url("managedZones"), &[]).await.unwrap_err();

        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client.get(&client.pubsub_url("topics"), &[]).await.unwrap();

        assert!(response.is_null());
    }

    #[tokio::test]
    async fn test_post_sends_json_body_and_query() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/test-project:getIamPolicy"))
            .and(query_param("alt", "json"))
            .and(body_json(json!({"options": {"requestedPolicyVersion": 3}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bindings": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let body = json!({"options": {"requestedPolicyVersion": 3}});
        let response = client
            .post(
                &client.resourcemanager_url("getIamPolicy"),
                &[("alt", "json".to_string())],
                Some(&body),
            )
            .await
            .unwrap();

        assert_eq!(response["bindings"], json!([]));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = GcpClient::with_credentials(
            "test-project",
            "us-central1",
            Endpoints::single("http://127.0.0.1:1").unwrap(),
            Credentials::fixed("test-token"),
        )
        .unwrap();

        let err = client.get(&client.pubsub_url("topics"), &[]).await.unwrap_err();

        assert!(matches!(err, ApiError::Transport { .. }));
        assert_eq!(err.status(), None);
    }
}

mod pagination_tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_all_follows_page_tokens() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/topics"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "topics": [{"name": "orders"}, {"name": "invoices"}],
                "nextPageToken": "p2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/test-project/topics"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "topics": [{"name": "audit"}],
                "nextPageToken": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ListRequest::get(client.pubsub_url("topics"), Items::Key("topics"));
        let topics: Vec<Named> = fetch_all(&client, request).await.unwrap();

        let names: Vec<&str> = topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "invoices", "audit"]);
    }

    #[tokio::test]
    async fn test_missing_items_key_is_an_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"kind": "compute#networkList"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ListRequest::get(client.compute_global_url("networks"), Items::Key("items"));
        let networks: Vec<Named> = fetch_all(&client, request).await.unwrap();

        assert!(networks.is_empty());
    }

    #[tokio::test]
    async fn test_aggregated_list_is_flattened() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/compute/v1/projects/test-project/aggregated/disks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": {
                    "zones/us-central1-a": {"disks": [{"name": "disk-a"}]},
                    "zones/us-east1-b": {"warning": {"code": "NO_RESULTS_ON_PAGE"}},
                    "zones/us-central1-f": {"disks": [{"name": "disk-f1"}, {"name": "disk-f2"}]}
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ListRequest::get(
            client.compute_aggregated_url("disks"),
            Items::Aggregated("disks"),
        );
        let disks: Vec<Named> = fetch_all(&client, request).await.unwrap();

        let mut names: Vec<String> = disks.into_iter().map(|d| d.name).collect();
        names.sort();
        assert_eq!(names, vec!["disk-a", "disk-f1", "disk-f2"]);
    }

    #[tokio::test]
    async fn test_malformed_item_fails_the_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "topics": [{"name": "orders"}, {"name": 42}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = ListRequest::get(client.pubsub_url("topics"), Items::Key("topics"));
        let err = fetch_all::<Named>(&client, request).await.unwrap_err();

        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_post_list_sends_body_on_every_page() {
        let server = MockServer::start().await;
        let body = json!({"instanceState": "ALL"});
        let list_path =
            "/compute/v1/projects/test-project/zones/us-central1-a/instanceGroups/web/listInstances";

        Mock::given(method("POST"))
            .and(path(list_path))
            .and(body_json(body.clone()))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"instance": "zones/us-central1-a/instances/web-1"}],
                "nextPageToken": "next"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(list_path))
            .and(body_json(body.clone()))
            .and(query_param("pageToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"instance": "zones/us-central1-a/instances/web-2"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        #[derive(Debug, Deserialize)]
        struct Member {
            instance: String,
        }

        let client = client_for(&server);
        let request = ListRequest::post(
            client.compute_zonal_url("us-central1-a", "instanceGroups/web/listInstances"),
            Items::Key("items"),
            body,
        );
        let members: Vec<Member> = fetch_all(&client, request).await.unwrap();

        assert_eq!(members.len(), 2);
        assert!(members[1].instance.ends_with("web-2"));
    }
}
