// tests/state_store.rs
use board_watch::store::{StateSnapshot, StateStore};
use board_watch::SEEN_CAP;
use std::fs;

#[tokio::test]
async fn missing_file_is_a_cold_start() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("nope/seen.json"));
    let snap = store.load().await;
    assert!(snap.is_empty());
}

#[tokio::test]
async fn malformed_file_is_a_cold_start() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("seen.json");
    fs::write(&p, "{ this is not json").unwrap();
    let snap = StateStore::new(&p).load().await;
    assert_eq!(snap, StateSnapshot::default());

    fs::write(&p, r#"{"dept": "should be a list"}"#).unwrap();
    assert!(StateStore::new(&p).load().await.is_empty());
}

#[tokio::test]
async fn legacy_file_from_older_runs_loads() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("state.json");
    fs::write(&p, r#"{"dept": ["376", "375", 374], "lab": []}"#).unwrap();
    let snap = StateStore::new(&p).load().await;
    assert_eq!(snap.len(), 2);
    let dept = snap.get("dept").unwrap();
    assert!(dept.seen.contains("374"));
    assert_eq!(dept.empty_streak, 0);
}

#[tokio::test]
async fn save_creates_dir_and_roundtrips_presence() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("state/seen.json");
    let store = StateStore::new(&p);

    let mut snap = StateSnapshot::default();
    let dept = snap.entry_mut("dept");
    dept.seen.insert("10");
    dept.seen.insert("11");
    dept.empty_streak = 2;
    snap.entry_mut("lab").seen.insert("3");

    store.save(&snap).await.unwrap();
    assert!(p.exists());
    assert!(!p.with_extension("json.tmp").exists());

    let back = store.load().await;
    assert_eq!(back, snap);

    // ids stored as strings, largest first
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&p).unwrap()).unwrap();
    assert_eq!(raw["dept"]["seen"], serde_json::json!(["11", "10"]));
    assert_eq!(raw["dept"]["empty_streak"], 2);
}

#[tokio::test]
async fn save_trims_each_target_to_largest_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("seen.json"));

    let mut snap = StateSnapshot::default();
    let big = snap.entry_mut("big");
    // inserted out of order, mixed widths
    for n in (1..=(SEEN_CAP + 500)).rev() {
        big.seen.insert(n.to_string());
    }
    snap.entry_mut("small").seen.insert("1");

    store.save(&snap).await.unwrap();
    let back = store.load().await;

    let big = &back.get("big").unwrap().seen;
    assert_eq!(big.len(), SEEN_CAP);
    let smallest_kept = 501;
    assert!(big.contains(&smallest_kept.to_string()));
    assert!(!big.contains(&(smallest_kept - 1).to_string()));
    assert_eq!(back.get("small").unwrap().seen.len(), 1);
}

#[tokio::test]
async fn save_trim_compares_ids_numerically() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("seen.json"));

    let mut snap = StateSnapshot::default();
    let t = snap.entry_mut("t");
    for n in 1..=SEEN_CAP {
        t.seen.insert(format!("{n:06}"));
    }
    let wide = "9".repeat(25);
    t.seen.insert(wide.clone());

    store.save(&snap).await.unwrap();
    let back = store.load().await;
    let seen = &back.get("t").unwrap().seen;
    assert_eq!(seen.len(), SEEN_CAP);
    assert!(seen.contains(&wide));
    assert!(!seen.contains("000001"));
    assert!(seen.contains("000002"));
}
