//! NCBI job against mocked E-utilities

use gfoods_common::types::SourceKind;
use gfoods_ingest::pipeline::OutcomeStatus;
use gfoods_ingest::{run_job, LookupFailure, RunConfig};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const CONTACT: &str = "tests@example.org";

const GARLIC_XML: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE TaxaSet PUBLIC "-//NLM//DTD Taxon, 14th January 2002//EN" "https://www.ncbi.nlm.nih.gov/entrez/query/DTD/taxon.dtd">
<TaxaSet><Taxon>
    <TaxId>4682</TaxId>
    <ScientificName>Allium sativum</ScientificName>
    <OtherNames>
        <GenbankCommonName>garlic</GenbankCommonName>
        <Synonym>Allium pekinense</Synonym>
        <Name>
            <ClassCDE>authority</ClassCDE>
            <DispName>Allium sativum L.</DispName>
        </Name>
        <EquivalentName>Allium sativum var. sativum</EquivalentName>
        <CommonName>garlic</CommonName>
    </OtherNames>
    <Rank>species</Rank>
</Taxon></TaxaSet>"#;

fn config(input: &Path, server: &MockServer) -> RunConfig {
    RunConfig::new(SourceKind::Ncbi, input)
        .with_base_url(server.uri())
        .with_throttle(Duration::ZERO)
        .with_contact(CONTACT)
}

async fn mount_esearch(server: &MockServer, term: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "taxonomy"))
        .and(query_param("term", term))
        .and(query_param("retmode", "json"))
        .and(query_param("email", CONTACT))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_efetch(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("db", "taxonomy"))
        .and(query_param("id", "4682"))
        .and(query_param("retmode", "xml"))
        .and(query_param("email", CONTACT))
        .respond_with(ResponseTemplate::new(200).set_body_raw(GARLIC_XML, "text/xml"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ncbi_collects_other_names_in_priority_order() {
    let server = MockServer::start().await;
    mount_esearch(
        &server,
        "Allium sativum",
        200,
        json!({"esearchresult": {"count": "1", "idlist": ["4682"]}}),
    )
    .await;
    mount_efetch(&server).await;
    mount_esearch(
        &server,
        "Fakeus nonexistus",
        200,
        json!({"esearchresult": {"count": "0", "idlist": []}}),
    )
    .await;
    mount_esearch(
        &server,
        "Oryza sativa",
        429,
        json!({"error": "API rate limit exceeded"}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("ndm_foods.csv");
    std::fs::write(
        &input,
        "idx,food_com,food_sci,synonyms_ncbi\n1,garlic,Allium_sativum,\n2,mystery,Fakeus nonexistus,old\n3,rice,Oryza sativa,old\n",
    )
    .unwrap();

    let report = run_job(&config(&input, &server)).await.unwrap();

    assert_eq!(report.processed(), 3);
    assert_eq!(report.resolved(), 1);
    assert_eq!(report.not_found(), 1);
    assert_eq!(report.failed(), 1);

    let written = std::fs::read_to_string(&input).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(
        lines[1],
        r#""1","garlic","Allium_sativum","Allium pekinense;Allium sativum var. sativum;garlic""#
    );
    assert_eq!(lines[2], r#""2","mystery","Fakeus nonexistus","""#);
    assert_eq!(lines[3], r#""3","rice","Oryza sativa","""#);
}

#[tokio::test]
async fn test_ncbi_requests_carry_contact_and_user_agent() {
    let server = MockServer::start().await;
    mount_esearch(
        &server,
        "Allium sativum",
        200,
        json!({"esearchresult": {"idlist": ["4682"]}}),
    )
    .await;
    mount_efetch(&server).await;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("foods.csv");
    std::fs::write(&input, "idx,food_com,food_sci\n1,garlic,Allium sativum\n").unwrap();

    run_job(&config(&input, &server)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in requests {
        let agent = request.headers.get("user-agent").unwrap().to_str().unwrap();
        assert_eq!(agent, format!("gFoodsScraper/0.1 (+{})", CONTACT));
        assert!(request
            .url
            .query_pairs()
            .any(|(k, v)| k == "tool" && v == "gFoodsScraper"));
    }
}

#[tokio::test]
async fn test_ncbi_rejects_batching() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("foods.csv");
    std::fs::write(&input, "idx,food_com,food_sci\n1,garlic,Allium sativum\n").unwrap();

    let err = run_job(&config(&input, &server).with_batch_size(10)).await.unwrap_err();

    assert!(err.is_configuration());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ncbi_esearch_error_messages_are_classified() {
    let server = MockServer::start().await;
    mount_esearch(
        &server,
        "Allium sativum",
        200,
        json!({"error": "API rate limit exceeded", "count": "4"}),
    )
    .await;
    mount_esearch(
        &server,
        "Oryza sativa",
        200,
        json!({"esearchresult": {"idlist": [], "ERROR": "Invalid query syntax"}}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("foods.csv");
    std::fs::write(
        &input,
        "idx,food_com,food_sci\n1,garlic,Allium sativum\n2,rice,Oryza sativa\n",
    )
    .unwrap();

    let report = run_job(&config(&input, &server)).await.unwrap();

    assert_eq!(report.failed(), 2);
    assert_eq!(
        report.outcomes[0].status,
        OutcomeStatus::Failed(LookupFailure::RateLimited)
    );
    assert!(matches!(
        &report.outcomes[1].status,
        OutcomeStatus::Failed(LookupFailure::Malformed(msg)) if msg.contains("Invalid query syntax")
    ));
    // No id, so efetch is never called
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_ncbi_efetch_without_taxon_is_malformed() {
    let server = MockServer::start().await;
    mount_esearch(
        &server,
        "Allium sativum",
        200,
        json!({"esearchresult": {"idlist": ["4682"]}}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", "4682"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<?xml version="1.0" ?><TaxaSet></TaxaSet>"#,
            "text/xml",
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("foods.csv");
    std::fs::write(&input, "idx,food_com,food_sci,synonyms_ncbi\n1,garlic,Allium sativum,old\n").unwrap();

    let report = run_job(&config(&input, &server)).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert!(matches!(
        &report.outcomes[0].status,
        OutcomeStatus::Failed(LookupFailure::Malformed(msg)) if msg.contains("4682")
    ));
    let written = std::fs::read_to_string(&input).unwrap();
    assert_eq!(written.lines().nth(1), Some(r#""1","garlic","Allium sativum","""#));
}
