use cxxcache_infrastructure::Settings;

#[tokio::test]
async fn build_wires_every_adapter_against_a_tempdir_db() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        db_path: dir.path().join("cxxcache.db").to_string_lossy().into_owned(),
        ..Settings::default()
    };

    let app = cxxcache::composition::build(&settings).await.unwrap();
    let info = app
        .orchestrator
        .get_workspace_info("nonexistent-workspace")
        .await
        .unwrap();
    assert!(info.active_context_ids.is_empty());
}
