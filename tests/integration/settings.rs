//! Solution settings discovery through the manager's solution directory.

use std::sync::Arc;

use tempfile::TempDir;

use wspm::config::{CertificateSource, SolutionConfig, CONFIG_FILE_NAME};
use wspm::host::HostWorkspace;
use wspm::solution::SolutionManager;
use wspm::test_utils::MockWorkspace;

#[tokio::test]
async fn test_settings_load_from_open_solution_directory() {
    crate::init_tracing();
    let solution_dir = TempDir::new().expect("temp dir");
    std::fs::write(
        solution_dir.path().join(CONFIG_FILE_NAME),
        r#"
[sources]
internal = "https://feeds.corp.example.com/v3/index.json"

[[client-certificates]]
name = "internal"
from-pem = "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----"
"#,
    )
    .expect("write settings");

    let workspace = Arc::new(MockWorkspace::new());
    workspace.set_open(solution_dir.path().join("app.sln"));
    let manager = SolutionManager::new(Arc::clone(&workspace) as Arc<dyn HostWorkspace>);
    manager.initialize();
    manager.ready().await;

    let dir = manager.solution_directory().expect("open solution has a directory");
    let config = SolutionConfig::load_from_dir(&dir).await.expect("valid settings");

    assert_eq!(config.sources.len(), 1);
    let certificate = config.certificate_for("internal").expect("entry present");
    assert!(matches!(
        certificate.source,
        CertificateSource::FromPem { .. }
    ));

    let data = certificate.resolve(&dir).await.expect("inline PEM resolves");
    assert!(String::from_utf8(data.bytes).unwrap().contains("BEGIN CERTIFICATE"));
}

#[tokio::test]
async fn test_settings_default_when_solution_has_no_file() {
    let solution_dir = TempDir::new().expect("temp dir");
    let config = SolutionConfig::load_from_dir(solution_dir.path())
        .await
        .expect("missing file is fine");
    assert_eq!(config, SolutionConfig::default());
}
