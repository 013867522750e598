//! Cleanup driven through the signed Block Storage client against a mock API.

use std::sync::Arc;
use std::time::Duration;

use blockstorage_sdk::{BlockstorageClient, ClientOptions, RequestSigner, RetryPolicy};
use pruner::{ClassSelection, CleanupError, CleanupOrchestrator, CleanupPlan, ResourceClass};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &[u8] = include_bytes!("../src/blockstorage-sdk/tests/fixtures/test_key.pem");
const COMPARTMENT: &str = "ocid1.compartment.oc1..api";

fn client(server: &MockServer) -> Arc<BlockstorageClient> {
    let signer = RequestSigner::from_pem("tenancy/user/fp", KEY).unwrap();
    let options = ClientOptions {
        timeout: Duration::from_secs(5),
        page_limit: 50,
        retry: RetryPolicy::disabled(),
    };
    Arc::new(BlockstorageClient::with_endpoint(&server.uri(), signer, options).unwrap())
}

fn plan(classes: ClassSelection, keep: i64) -> CleanupPlan {
    CleanupPlan {
        compartment_id: COMPARTMENT.to_string(),
        keep,
        classes,
        dry_run: false,
        concurrency: 2,
        inter_item_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_boot_volume_cleanup_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/20160918/bootVolumeBackups"))
        .and(query_param("compartmentId", COMPARTMENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "bvb-new",
                "bootVolumeId": "bv-1",
                "displayName": "newest",
                "lifecycleState": "AVAILABLE",
                "timeCreated": "2024-04-03T00:00:00Z"
            },
            {
                "id": "bvb-old",
                "bootVolumeId": "bv-1",
                "displayName": "oldest",
                "lifecycleState": "AVAILABLE",
                "timeCreated": "2024-04-01T00:00:00Z"
            },
            {
                "id": "bvb-mid",
                "bootVolumeId": "bv-1",
                "displayName": "middle",
                "lifecycleState": "AVAILABLE",
                "timeCreated": "2024-04-02T00:00:00Z"
            },
            {
                "id": "bvb-pending",
                "bootVolumeId": "bv-1",
                "lifecycleState": "CREATING",
                "timeCreated": "2024-03-01T00:00:00Z"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    for id in ["bvb-old", "bvb-mid"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/20160918/bootVolumeBackups/{id}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/20160918/volumeBackups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator =
        CleanupOrchestrator::new(client(&server), plan(ClassSelection::BootOnly, 1)).unwrap();
    let report = orchestrator.execute().await.unwrap();

    assert_eq!(report.total_deleted(), 2);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_api_delete_error_counts_as_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/20160918/volumeBackups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "vb-2",
                "volumeId": "v-1",
                "lifecycleState": "AVAILABLE",
                "timeCreated": "2024-04-02T00:00:00Z"
            },
            {
                "id": "vb-1",
                "volumeId": "v-1",
                "lifecycleState": "AVAILABLE",
                "timeCreated": "2024-04-01T00:00:00Z"
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/20160918/volumeBackups/vb-1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "Conflict",
            "message": "Backup is in use"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator =
        CleanupOrchestrator::new(client(&server), plan(ClassSelection::BlockOnly, 1)).unwrap();
    let report = orchestrator.execute().await.unwrap();

    let block = report.class(ResourceClass::BlockVolume).unwrap();
    assert_eq!(block.errors, 1);
    assert!(matches!(
        &block.outcomes[0].status,
        pruner::DeletionStatus::Failed(reason) if reason.contains("Backup is in use")
    ));
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_listing_error_aborts_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/20160918/bootVolumeBackups"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "NotAuthenticated",
            "message": "The required information to complete authentication was not provided."
        })))
        .mount(&server)
        .await;

    let orchestrator =
        CleanupOrchestrator::new(client(&server), plan(ClassSelection::Both, 1)).unwrap();
    let err = orchestrator.execute().await.unwrap_err();

    assert!(matches!(
        err,
        CleanupError::Listing {
            class: ResourceClass::BootVolume,
            ..
        }
    ));
}
