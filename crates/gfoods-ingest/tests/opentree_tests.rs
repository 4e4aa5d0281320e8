//! Open Tree of Life job against a mocked TNRS endpoint

use gfoods_common::types::SourceKind;
use gfoods_ingest::{run_job, RunConfig};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

const INPUT: &str = "\
\"\",\"food_com\",\"food_sci\",\"synonyms_open_tree_of_life\",\"synonyms_wiki_search\",\"synonyms_ncbi\"
\"1\",\"garlic\",\"Allium_sativum\",\"stale value\",\"wiki kept\",\"\"
\"2\",\"house stew\",\"\",\"\",\"\",\"ncbi kept\"
\"3\",\"mystery\",\"Fakeus nonexistus\",\"\",\"\",\"\"
";

fn write_input(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("ndm_foods.csv");
    std::fs::write(&path, INPUT).unwrap();
    path
}

fn config(input: &Path, server: &MockServer) -> RunConfig {
    RunConfig::new(SourceKind::OpenTree, input)
        .with_base_url(server.uri())
        .with_throttle(Duration::ZERO)
        .with_contact("tests@example.org")
}

fn match_names_response() -> serde_json::Value {
    json!({
        "results": [
            {
                "name": "Allium sativum",
                "matches": [
                    {
                        "score": 0.9,
                        "is_synonym": true,
                        "is_approximate_match": false,
                        "taxon": {"ott_id": 1, "synonyms": ["wrong pick"]}
                    },
                    {
                        "score": 1.0,
                        "is_synonym": false,
                        "is_approximate_match": false,
                        "taxon": {
                            "ott_id": 2,
                            "name": "Allium sativum",
                            "synonyms": ["Allium sativum L.", "Allium sativum", ""]
                        }
                    }
                ]
            },
            {"name": "Fakeus nonexistus", "matches": []}
        ]
    })
}

async fn mount_match_names(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v3/tnrs/match_names"))
        .and(body_json(json!({
            "names": ["Allium sativum", "Fakeus nonexistus"],
            "include_synonyms": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(match_names_response()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_opentree_fills_column_in_place() {
    let server = MockServer::start().await;
    mount_match_names(&server).await;
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir);

    let report = run_job(&config(&input, &server)).await.unwrap();

    assert_eq!(report.processed(), 2);
    assert_eq!(report.resolved(), 1);
    assert_eq!(report.not_found(), 1);
    assert_eq!(report.skipped, 1);

    let written = std::fs::read_to_string(&input).unwrap();
    assert_eq!(
        written,
        "\
\"\",\"food_com\",\"food_sci\",\"synonyms_open_tree_of_life\",\"synonyms_wiki_search\",\"synonyms_ncbi\"
\"1\",\"garlic\",\"Allium_sativum\",\"Allium sativum L.;Allium sativum\",\"wiki kept\",\"\"
\"2\",\"house stew\",\"\",\"\",\"\",\"ncbi kept\"
\"3\",\"mystery\",\"Fakeus nonexistus\",\"\",\"\",\"\"
"
    );
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let server = MockServer::start().await;
    mount_match_names(&server).await;
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir);

    run_job(&config(&input, &server)).await.unwrap();
    let first = std::fs::read(&input).unwrap();
    run_job(&config(&input, &server)).await.unwrap();
    let second = std::fs::read(&input).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_output_flag_leaves_input_untouched() {
    let server = MockServer::start().await;
    mount_match_names(&server).await;
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir);
    let output = dir.path().join("sample.csv");

    let report = run_job(&config(&input, &server).with_output(&output)).await.unwrap();

    assert_eq!(report.output, output);
    assert_eq!(std::fs::read_to_string(&input).unwrap(), INPUT);
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("\"Allium sativum L.;Allium sativum\""));
}

#[tokio::test]
async fn test_transient_failure_is_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/tnrs/match_names"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_match_names(&server).await;
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir);

    let report = run_job(&config(&input, &server)).await.unwrap();

    assert_eq!(report.resolved(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rate_limit_records_failure_and_continues() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/tnrs/match_names"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir);

    let report = run_job(&config(&input, &server)).await.unwrap();

    assert_eq!(report.failed(), 2);
    // 429 is not transient, so no retry
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    let written = std::fs::read_to_string(&input).unwrap();
    assert!(written.contains("\"1\",\"garlic\",\"Allium_sativum\",\"\",\"wiki kept\""));
}

#[tokio::test]
async fn test_limit_processes_first_eligible_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/tnrs/match_names"))
        .and(body_json(json!({"names": ["Allium sativum"], "include_synonyms": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"name": "Allium sativum", "matches": [{"score": 1.0, "taxon": {"synonyms": ["Allium sativum L."]}}]}]
        })))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir);

    let report = run_job(&config(&input, &server).with_limit(1)).await.unwrap();

    assert_eq!(report.processed(), 1);
    let written = std::fs::read_to_string(&input).unwrap();
    assert!(written.contains("\"Allium sativum L.\""));
    assert!(written.contains("\"3\",\"mystery\",\"Fakeus nonexistus\",\"\""));
}

#[tokio::test]
async fn test_results_without_name_echo_match_by_position() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/tnrs/match_names"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"matches": [{"score": 1.0, "taxon": {"synonyms": ["Allium sativum L."]}}]},
                {"matches": []}
            ]
        })))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir);

    let report = run_job(&config(&input, &server)).await.unwrap();

    assert_eq!(report.resolved(), 1);
    assert_eq!(report.not_found(), 1);
    let written = std::fs::read_to_string(&input).unwrap();
    assert!(written.contains("\"1\",\"garlic\",\"Allium_sativum\",\"Allium sativum L.\",\"wiki kept\""));
    assert!(written.contains("\"3\",\"mystery\",\"Fakeus nonexistus\",\"\""));
}
