use super::*;

#[test]
fn cert_paths_live_in_the_certs_dir() {
    let paths = CertPaths::in_dir(Path::new("/srv/floorboard/certs"));
    assert_eq!(paths.cert, Path::new("/srv/floorboard/certs/cert.pem"));
    assert_eq!(paths.key, Path::new("/srv/floorboard/certs/key.pem"));
}

#[test]
fn missing_pair_does_not_exist() {
    let dir = std::env::temp_dir().join(format!("floorboard-certs-{}", uuid::Uuid::new_v4()));
    assert!(!CertPaths::in_dir(&dir).exist());
}

#[tokio::test]
async fn existing_pair_is_reused_without_openssl() {
    let dir = std::env::temp_dir().join(format!("floorboard-certs-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(CERT_FILE), "cert").unwrap();
    std::fs::write(dir.join(KEY_FILE), "key").unwrap();

    let paths = ensure_self_signed(&dir).await.unwrap();
    assert_eq!(std::fs::read_to_string(&paths.cert).unwrap(), "cert");
}
