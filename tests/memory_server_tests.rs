use serde_json::json;
use urbackup_gateway::models::BackupKind;
use urbackup_gateway::normalize::roster_from_status;
use urbackup_gateway::upstream::{BackupServer, MemoryServer};

#[tokio::test]
async fn test_memory_add_and_list_clients() {
    let server = MemoryServer::new();
    assert!(server.add_client("alice").await.unwrap());
    assert!(server.add_client("bob").await.unwrap());

    let status = server.status().await.unwrap();
    let roster = roster_from_status(&status).unwrap();
    let names: Vec<_> = roster.iter().map(|c| (c.id, c.name.as_str())).collect();
    assert_eq!(names, vec![(1, "alice"), (2, "bob")]);
}

#[tokio::test]
async fn test_memory_add_duplicate_name_fails() {
    let server = MemoryServer::new();
    assert!(server.add_client("alice").await.unwrap());
    assert!(!server.add_client("alice").await.unwrap());
}

#[tokio::test]
async fn test_memory_remove_client() {
    let server = MemoryServer::new();
    let id = server.seed_client("alice").await;

    assert!(server.remove_client(id).await.unwrap());
    assert!(!server.remove_client(id).await.unwrap());

    let roster = roster_from_status(&server.status().await.unwrap()).unwrap();
    assert!(roster.is_empty());
}

#[tokio::test]
async fn test_memory_rename_client() {
    let server = MemoryServer::new();
    let id = server.seed_client("alice").await;
    server.seed_client("bob").await;

    assert!(!server.rename_client(id, "bob").await.unwrap());
    assert!(server.rename_client(id, "carol").await.unwrap());

    let roster = roster_from_status(&server.status().await.unwrap()).unwrap();
    assert_eq!(roster[0].name, "carol");
}

#[tokio::test]
async fn test_memory_settings_round_trip() {
    let server = MemoryServer::new();
    let id = server.seed_client("alice").await;

    assert!(server
        .change_client_setting(id, "quota", "1024")
        .await
        .unwrap());
    let settings = server.client_settings(id).await.unwrap();
    assert_eq!(settings["quota"], json!({"value": "1024"}));
    assert_eq!(settings["clientid"], json!(id));
}

#[tokio::test]
async fn test_memory_settings_unknown_client() {
    let server = MemoryServer::new();
    assert!(server.client_settings(99).await.is_err());
    assert!(!server.change_client_setting(99, "quota", "1").await.unwrap());
}

#[tokio::test]
async fn test_memory_authkey() {
    let server = MemoryServer::new();
    let id = server.seed_client("alice").await;
    let key = server.client_authkey(id).await.unwrap();
    assert!(!key.is_empty());
}

#[tokio::test]
async fn test_memory_backups_and_delete() {
    let server = MemoryServer::new();
    let id = server.seed_client("alice").await;
    server
        .seed_backup(id, json!({"backup_id": 1, "total_bytes": 10}))
        .await;
    server.seed_backup(id, json!({"backup_id": 2})).await;

    assert!(server.delete_backup(id, 1).await.unwrap());
    assert!(!server.delete_backup(id, 1).await.unwrap());
    assert_eq!(
        server.client_backups(id).await.unwrap(),
        vec![json!({"backup_id": 2})]
    );
}

#[tokio::test]
async fn test_memory_start_backup_records_kind() {
    let server = MemoryServer::new();
    let id = server.seed_client("alice").await;

    assert!(server.start_backup(id, BackupKind::FullImage).await.unwrap());
    assert!(!server.start_backup(id + 1, BackupKind::FullFile).await.unwrap());
    assert_eq!(
        server.started_backups().await,
        vec![(id, BackupKind::FullImage)]
    );
}

#[tokio::test]
async fn test_memory_logs() {
    let server = MemoryServer::new();
    let id = server.seed_client("alice").await;
    assert!(server.client_logs(id).await.unwrap().is_empty());

    server
        .seed_log(id, json!({"time": 1700000000, "msg": "Backup finished"}))
        .await;
    assert_eq!(server.client_logs(id).await.unwrap().len(), 1);
}
