mod common;

use common::{sample_rates, sample_snapshot, StaticCountries, StaticRates};
use country_ledger::{
    CountryFilter, CountryService, GdpSort, QueryError, ReconciliationEngine, SqliteCountryStore,
    SvgSummaryRenderer,
};
use std::sync::Arc;
use tempfile::TempDir;

fn service(dir: &TempDir) -> CountryService {
    let store = SqliteCountryStore::open(dir.path().join("countries.db")).unwrap();
    let engine = ReconciliationEngine::new(
        Arc::new(store),
        StaticCountries::new(sample_snapshot()),
        StaticRates::new(sample_rates()),
        Arc::new(SvgSummaryRenderer::new(dir.path().join("cache"))),
    );
    CountryService::new(engine)
}

async fn refreshed_service(dir: &TempDir) -> CountryService {
    let service = service(dir);
    service.run_reconciliation().await.unwrap();
    service
}

#[tokio::test]
async fn test_summary_image_missing_until_first_run() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir);

    assert!(matches!(
        service.summary_image(),
        Err(QueryError::ArtifactNotFound)
    ));

    service.run_reconciliation().await.unwrap();

    let image = service.summary_image().unwrap();
    assert_eq!(image.content_type, "image/svg+xml");
    let svg = String::from_utf8(image.bytes).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Total number of countries: 3"));
    assert!(svg.contains("Nigeria"));
}

#[tokio::test]
async fn test_get_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let service = refreshed_service(&dir).await;

    let france = service.get_by_name("FRANCE").unwrap();
    assert_eq!(france.name, "France");
    assert_eq!(france.capital.as_deref(), Some("Paris"));

    match service.get_by_name("Atlantis") {
        Err(QueryError::RecordNotFound { name }) => assert_eq!(name, "Atlantis"),
        other => panic!("expected RecordNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let service = refreshed_service(&dir).await;

    service.delete_by_name("ghana").unwrap();

    assert_eq!(service.get_all().unwrap().len(), 2);
    assert!(matches!(
        service.delete_by_name("Ghana"),
        Err(QueryError::RecordNotFound { .. })
    ));
}

#[tokio::test]
async fn test_filter_by_region_and_sort() {
    let dir = tempfile::tempdir().unwrap();
    let service = refreshed_service(&dir).await;

    let africa = service
        .get_by_filter(&CountryFilter {
            region: Some("africa".to_string()),
            ..Default::default()
        })
        .unwrap();
    let names: Vec<_> = africa.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Ghana", "Nigeria"]);

    let by_gdp = service
        .get_by_filter(&CountryFilter {
            sort: Some(GdpSort::GdpDesc),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_gdp.len(), 3);
    assert!(by_gdp
        .windows(2)
        .all(|pair| pair[0].estimated_gdp >= pair[1].estimated_gdp));

    let euro = service
        .get_by_filter(&CountryFilter {
            currency: Some("eur".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(euro.len(), 1);
    assert_eq!(euro[0].name, "France");
}

#[tokio::test]
async fn test_status_before_and_after_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir);

    let empty = service.get_status().unwrap();
    assert_eq!(empty.total_countries, 0);
    assert!(empty.last_refreshed_at.is_none());

    let report = service.run_reconciliation().await.unwrap();
    let status = service.get_status().unwrap();

    assert_eq!(status.total_countries, 3);
    assert_eq!(status.last_refreshed_at, report.refreshed_at);
}

#[tokio::test]
async fn test_concurrent_refreshes_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(service(&dir));

    let (a, b) = tokio::join!(service.run_reconciliation(), service.run_reconciliation());
    let (a, b) = (a.unwrap(), b.unwrap());

    // One run inserts everything, the other sees the committed rows
    assert_eq!(a.inserted + b.inserted, 3);
    assert_eq!(a.updated + b.updated, 3);
    assert_eq!(service.get_status().unwrap().total_countries, 3);
}
