//! End-to-end tests: HTTP price documents → snapshot cache → ranked fleets
//!
//! A mockito server stands in for the pricing endpoints and the snapshots
//! live in a temporary directory.

use fleetcmp::config::Config;
use fleetcmp::exit_codes::{codes, exit_code_for_anyhow};
use fleetcmp::fetch::HttpFetcher;
use fleetcmp::fleet::{self, Candidate, Constraints, FleetSize, SortKey};
use fleetcmp::freshness::{CatalogLoader, RefreshFlags};
use fleetcmp::pipeline::{load_enriched_catalog, PricingSources};
use fleetcmp::retry::ExponentialBackoffPolicy;
use fleetcmp::store::{BlobStore, FsBlobStore};
use fleetcmp::FleetError;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tempfile::TempDir;

const SPOT_FEED: &str = r#"callback({"vers":0.01,"config":{"rate":"perhr","valueColumns":["linux","mswin"],"currencies":["USD"],"regions":[
  {"region":"us-east","instanceTypes":[{"type":"generalCurrentGen","sizes":[
    {"size":"m4.large","valueColumns":[{"name":"linux","prices":{"USD":"0.04"}},{"name":"mswin","prices":{"USD":"0.13"}}]},
    {"size":"c4.xlarge","valueColumns":[{"name":"linux","prices":{"USD":"N/A*"}}]}
  ]}]},
  {"region":"eu-ireland","instanceTypes":[{"type":"generalCurrentGen","sizes":[
    {"size":"m4.large","valueColumns":[{"name":"linux","prices":{"USD":"0.05"}}]}
  ]}]}
]}});"#;

struct Product {
    sku: &'static str,
    name: &'static str,
    location: &'static str,
    vcpu: &'static str,
    memory: &'static str,
    storage: &'static str,
    os: &'static str,
    demand: &'static str,
}

const PRODUCTS: &[Product] = &[
    Product {
        sku: "M4L",
        name: "m4.large",
        location: "US East (N. Virginia)",
        vcpu: "2",
        memory: "8 GiB",
        storage: "EBS only",
        os: "Linux",
        demand: "0.1000000000",
    },
    Product {
        sku: "M4LW",
        name: "m4.large",
        location: "US East (N. Virginia)",
        vcpu: "2",
        memory: "8 GiB",
        storage: "EBS only",
        os: "Windows",
        demand: "0.1920000000",
    },
    Product {
        sku: "C4XL",
        name: "c4.xlarge",
        location: "US East (N. Virginia)",
        vcpu: "4",
        memory: "7.5 GiB",
        storage: "EBS only",
        os: "Linux",
        demand: "0.1990000000",
    },
    Product {
        sku: "M4LIE",
        name: "m4.large",
        location: "EU (Ireland)",
        vcpu: "2",
        memory: "8 GiB",
        storage: "EBS only",
        os: "Linux",
        demand: "0.1110000000",
    },
];

fn offer_file() -> String {
    let mut products = Map::new();
    let mut on_demand = Map::new();
    for p in PRODUCTS {
        products.insert(
            p.sku.to_string(),
            json!({
                "sku": p.sku,
                "productFamily": "Compute Instance",
                "attributes": {
                    "instanceType": p.name,
                    "location": p.location,
                    "vcpu": p.vcpu,
                    "memory": p.memory,
                    "storage": p.storage,
                    "clockSpeed": "2.4 GHz",
                    "networkPerformance": "Moderate",
                    "operatingSystem": p.os,
                    "licenseModel": "No License required",
                    "preInstalledSw": "NA",
                    "tenancy": "Shared"
                }
            }),
        );
        let offer = format!("{}.JRTCKXETXF", p.sku);
        let dimension = format!("{}.6YS6EN2CT7", offer);
        on_demand.insert(
            p.sku.to_string(),
            json!({ offer: { "priceDimensions": { dimension: { "pricePerUnit": { "USD": p.demand } } } } }),
        );
    }
    // Dedicated tenancy entries are dropped by the ingestor
    products.insert(
        "DEDICATED".to_string(),
        json!({
            "sku": "DEDICATED",
            "productFamily": "Compute Instance",
            "attributes": {
                "instanceType": "m4.large",
                "location": "US East (N. Virginia)",
                "vcpu": "2",
                "memory": "8 GiB",
                "storage": "EBS only",
                "operatingSystem": "Linux",
                "licenseModel": "No License required",
                "preInstalledSw": "NA",
                "tenancy": "Dedicated"
            }
        }),
    );
    let document: Value = json!({
        "formatVersion": "v1.0",
        "products": products,
        "terms": { "OnDemand": on_demand }
    });
    document.to_string()
}

struct Harness {
    server: mockito::ServerGuard,
    cache: TempDir,
    config: Config,
}

impl Harness {
    async fn new() -> Self {
        let server = mockito::Server::new_async().await;
        let cache = TempDir::new().unwrap();
        let mut config = Config::default();
        config.pricing.demand_url = format!("{}/offers/ec2/index.json", server.url());
        config.pricing.spot_url = format!("{}/spot.js", server.url());
        config.cache.dir = Some(cache.path().to_path_buf());
        Self {
            server,
            cache,
            config,
        }
    }

    async fn serve_prices(&mut self, hits: usize) -> (mockito::Mock, mockito::Mock) {
        let demand = self
            .server
            .mock("GET", "/offers/ec2/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(offer_file())
            .expect(hits)
            .create_async()
            .await;
        let spot = self
            .server
            .mock("GET", "/spot.js")
            .with_status(200)
            .with_body(SPOT_FEED)
            .expect(hits)
            .create_async()
            .await;
        (demand, spot)
    }

    fn store(&self) -> FsBlobStore {
        FsBlobStore::new(self.config.cache.resolve_dir().unwrap())
    }

    async fn search(
        &self,
        flags: RefreshFlags,
        include_spot: bool,
        constraints: &Constraints,
    ) -> fleetcmp::Result<Vec<Candidate>> {
        let fetcher = HttpFetcher::new(
            ExponentialBackoffPolicy::new(self.config.download.max_attempts)
                .with_initial_delay(Duration::from_millis(1)),
        )
        .quiet();
        let store = self.store();
        let loader = CatalogLoader::new(&fetcher, &store, flags);
        let sources = PricingSources::from_config(&self.config);
        let catalog = load_enriched_catalog(&loader, &sources, include_spot).await?;
        fleet::search(&catalog, constraints)
    }
}

fn single_instance() -> Constraints {
    Constraints {
        region: "us-east-1".to_string(),
        os: "linux".to_string(),
        min_cpu: 1,
        min_memory_gib: 1.0,
        fleet: FleetSize::Exact(1),
        sort: SortKey::Demand,
        ..Constraints::default()
    }
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("cost should be known");
    assert!((actual - expected).abs() < 1e-6, "expected {}, got {}", expected, actual);
}

#[tokio::test]
async fn test_cheapest_single_instance() {
    let mut harness = Harness::new().await;
    let (demand, spot) = harness.serve_prices(1).await;

    let ranked = harness
        .search(RefreshFlags::default(), true, &single_instance())
        .await
        .unwrap();

    assert_eq!(ranked.len(), 2);
    let best = &ranked[0];
    assert_eq!(best.instance.name, "m4.large");
    assert_eq!(best.instance.specs.os, "Linux");
    assert_eq!(best.count, 1);
    assert_close(best.demand_monthly, 72.0);
    assert_close(best.spot_monthly, 28.8);

    // "N/A*" in the feed leaves the spot price unknown
    assert_eq!(ranked[1].instance.name, "c4.xlarge");
    assert_eq!(ranked[1].spot_monthly, None);

    demand.assert_async().await;
    spot.assert_async().await;
}

#[tokio::test]
async fn test_snapshots_are_reused_within_ttl() {
    let mut harness = Harness::new().await;
    let (demand, spot) = harness.serve_prices(1).await;

    let first = harness
        .search(RefreshFlags::default(), true, &single_instance())
        .await
        .unwrap();
    let second = harness
        .search(RefreshFlags::default(), true, &single_instance())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(harness.cache.path().join("ec2.cache").is_file());
    assert!(harness.cache.path().join("spot.cache").is_file());
    demand.assert_async().await;
    spot.assert_async().await;
}

#[tokio::test]
async fn test_force_download_refetches() {
    let mut harness = Harness::new().await;
    let (demand, spot) = harness.serve_prices(2).await;
    let force = RefreshFlags {
        force_download: true,
        skip_download: false,
    };

    harness.search(RefreshFlags::default(), true, &single_instance()).await.unwrap();
    harness.search(force, true, &single_instance()).await.unwrap();

    demand.assert_async().await;
    spot.assert_async().await;
}

#[tokio::test]
async fn test_offline_mode_uses_existing_snapshots() {
    let mut harness = Harness::new().await;
    let (demand, spot) = harness.serve_prices(1).await;
    let offline = RefreshFlags {
        force_download: false,
        skip_download: true,
    };

    harness.search(RefreshFlags::default(), true, &single_instance()).await.unwrap();
    let ranked = harness.search(offline, true, &single_instance()).await.unwrap();

    assert_close(ranked[0].spot_monthly, 28.8);
    demand.assert_async().await;
    spot.assert_async().await;
}

#[tokio::test]
async fn test_offline_mode_without_snapshots_is_user_error() {
    let harness = Harness::new().await;
    let offline = RefreshFlags {
        force_download: false,
        skip_download: true,
    };

    let err = harness.search(offline, true, &single_instance()).await.unwrap_err();

    assert!(matches!(err, FleetError::CacheUnusable { .. }));
    assert_eq!(exit_code_for_anyhow(&anyhow::Error::from(err)), codes::USER_ERROR);
}

#[tokio::test]
async fn test_no_spot_skips_spot_feed() {
    let mut harness = Harness::new().await;
    let demand = harness
        .server
        .mock("GET", "/offers/ec2/index.json")
        .with_status(200)
        .with_body(offer_file())
        .expect(1)
        .create_async()
        .await;
    let spot = harness
        .server
        .mock("GET", "/spot.js")
        .expect(0)
        .create_async()
        .await;

    let ranked = harness
        .search(RefreshFlags::default(), false, &single_instance())
        .await
        .unwrap();

    assert!(ranked.iter().all(|c| c.spot_monthly.is_none()));
    assert!(harness.store().read("spot.cache").unwrap().is_none());
    demand.assert_async().await;
    spot.assert_async().await;
}

#[tokio::test]
async fn test_fleet_sizing_and_spot_ranking() {
    let mut harness = Harness::new().await;
    let _mocks = harness.serve_prices(1).await;
    let constraints = Constraints {
        fleet: FleetSize::Targets {
            cpu: 8,
            memory_gib: 16.0,
        },
        sort: SortKey::Spot,
        ..single_instance()
    };

    let ranked = harness
        .search(RefreshFlags::default(), true, &constraints)
        .await
        .unwrap();

    // m4.large: max(16/8, 8/2) = 4; c4.xlarge: max(16/7.5, 8/4) = 3
    assert_eq!(ranked[0].instance.name, "m4.large");
    assert_eq!(ranked[0].count, 4);
    assert_close(ranked[0].spot_monthly, 0.04 * 4.0 * 720.0);
    assert_eq!(ranked[1].instance.name, "c4.xlarge");
    assert_eq!(ranked[1].count, 3);
}

#[tokio::test]
async fn test_region_filter_uses_region_codes() {
    let mut harness = Harness::new().await;
    let _mocks = harness.serve_prices(1).await;
    let constraints = Constraints {
        region: "eu-west-1".to_string(),
        ..single_instance()
    };

    let ranked = harness
        .search(RefreshFlags::default(), true, &constraints)
        .await
        .unwrap();

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].instance.region_name, "EU (Ireland)");
    assert_close(ranked[0].spot_monthly, 0.05 * 720.0);
}

#[tokio::test]
async fn test_download_failure_is_system_error() {
    let mut harness = Harness::new().await;
    harness.config.download.max_attempts = 2;
    let demand = harness
        .server
        .mock("GET", "/offers/ec2/index.json")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let err = harness
        .search(RefreshFlags::default(), true, &single_instance())
        .await
        .unwrap_err();

    assert!(matches!(err, FleetError::Retryable { .. }));
    assert_eq!(exit_code_for_anyhow(&anyhow::Error::from(err)), codes::SYSTEM_ERROR);
    assert!(harness.store().read("ec2.cache").unwrap().is_none());
    demand.assert_async().await;
}

#[tokio::test]
async fn test_malformed_offer_file_is_decode_error() {
    let mut harness = Harness::new().await;
    let _mock = harness
        .server
        .mock("GET", "/offers/ec2/index.json")
        .with_status(200)
        .with_body("<html>Service Unavailable</html>")
        .create_async()
        .await;

    let err = harness
        .search(RefreshFlags::default(), true, &single_instance())
        .await
        .unwrap_err();

    assert!(matches!(err, FleetError::Decode { .. }));
}
