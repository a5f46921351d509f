//! LocalCluster against stand-in node and populate binaries
//!
//! The stand-ins are shell scripts that mimic the layout the real binaries
//! produce. Everything runs in one test so no script is still open for
//! writing while another test forks.

#![cfg(unix)]

use serde_json::{json, Value};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use syncwatch_cluster::{
    ClusterBringup, ClusterLayout, DatasetSeeder, DatasetSource, GenesisPopulate, LocalCluster,
};
use syncwatch_core::{HarnessConfig, NodeRole, TopologyConfig};

const FAKE_NODE: &str = r#"#!/bin/sh
home=""
cmd=""
boot=""
while [ "$#" -gt 0 ]; do
  case "$1" in
    --home) home="$2"; shift 2 ;;
    --v) v="$2"; shift 2 ;;
    --n) n="$2"; shift 2 ;;
    --shards) shift 2 ;;
    --prefix) prefix="$2"; shift 2 ;;
    --boot-nodes) boot="$2"; shift 2 ;;
    testnet) cmd=testnet; shift ;;
    run) cmd=run; shift ;;
    *) shift ;;
  esac
done
case "$cmd" in
  testnet)
    i=0
    total=$((v + n))
    while [ "$i" -lt "$total" ]; do
      d="$home/$prefix$i"
      mkdir -p "$d"
      echo '{"min_gas_price": "100", "epoch_length": 500}' > "$d/genesis.json"
      echo '{"network": {"addr": "0.0.0.0:24567"}, "rpc": {"addr": "0.0.0.0:3030"}, "tracked_shards": []}' > "$d/config.json"
      echo "{\"account_id\": \"\", \"public_key\": \"ed25519:key$i\"}" > "$d/node_key.json"
      i=$((i + 1))
    done
    ;;
  run)
    if [ -f "$home/crash" ]; then
      echo "refusing to start" >&2
      exit 3
    fi
    echo "$boot" > "$home/boot_nodes"
    echo "node started"
    exec sleep 30
    ;;
  *)
    echo "unknown command" >&2
    exit 2
    ;;
esac
"#;

const FAKE_POPULATE: &str = r#"#!/bin/sh
while [ "$#" -gt 0 ]; do
  case "$1" in
    --home) home="$2"; shift 2 ;;
    --additional-accounts-num) accounts="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "$accounts" > "$home/populated"
"#;

fn install_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn read_json(path: PathBuf) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

async fn wait_for_file(path: &Path) -> String {
    for _ in 0..50 {
        if let Ok(contents) = tokio::fs::read_to_string(path).await {
            if !contents.is_empty() {
                return contents;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("{} never appeared", path.display());
}

#[tokio::test(flavor = "multi_thread")]
async fn local_cluster_lifecycle() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("syncwatch_cluster=debug")
        .try_init();

    let root = tempfile::tempdir().unwrap();
    let bin = root.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    install_script(&bin, "near", FAKE_NODE);
    install_script(&bin, "genesis-populate", FAKE_POPULATE);

    let config = HarnessConfig {
        binary_root: bin,
        work_dir: root.path().join("work"),
        ..HarnessConfig::default()
    };

    // Leftovers from an earlier run must be cleared
    let stale = config.work_dir.join("test0");
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join("leftover"), "x").unwrap();

    let layout = ClusterLayout::new(TopologyConfig::default())
        .with_chain_override("epoch_length", 20)
        .with_chain_override("max_inflation_rate", json!([0, 1]))
        .with_node_override(1, "tracked_shards", json!([0]))
        .with_node_override(2, "tracked_shards", json!([0]));

    let mut cluster = LocalCluster::new(config.clone());
    let homes = cluster.init(&layout).await.unwrap();

    assert_eq!(homes.len(), 3);
    assert!(!stale.join("leftover").exists());
    assert_eq!(homes[0].role, NodeRole::Validator);
    assert_eq!(homes[1].role, NodeRole::Observer);
    assert_eq!(homes[2].role, NodeRole::Observer);
    assert_eq!(homes[2].public_key, "ed25519:key2");
    assert_eq!(homes[1].rpc_addr.port(), config.rpc_base_port + 1);

    for home in &homes {
        let genesis = read_json(home.dir.join("genesis.json"));
        assert_eq!(genesis["epoch_length"], json!(20));
        assert_eq!(genesis["max_inflation_rate"], json!([0, 1]));
        assert_eq!(genesis["min_gas_price"], json!("100"));

        let client = read_json(home.dir.join("config.json"));
        assert_eq!(client["network"]["addr"], json!(home.addr.to_string()));
        assert_eq!(client["rpc"]["addr"], json!(home.rpc_addr.to_string()));
    }
    assert_eq!(read_json(homes[0].dir.join("config.json"))["tracked_shards"], json!([]));
    assert_eq!(read_json(homes[1].dir.join("config.json"))["tracked_shards"], json!([0]));

    // Seeding
    let seeder = GenesisPopulate::new(config.populate_binary_path());
    let dirs: Vec<PathBuf> = homes.iter().map(|home| home.dir.clone()).collect();
    seeder
        .seed(&DatasetSource::Generate { accounts: 7 }, &dirs)
        .await
        .unwrap();
    for dir in &dirs {
        assert_eq!(std::fs::read_to_string(dir.join("populated")).unwrap().trim(), "7");
    }

    // Launch leader and early observer
    let leader = cluster.launch(&homes[0], None).await.unwrap();
    assert_eq!(leader.role, NodeRole::Validator);
    let early = cluster.add_observer(&homes[1], &leader).await.unwrap();
    assert_eq!(early.name(), "node1");
    assert_eq!(cluster.running(), 2);

    let boot = wait_for_file(&homes[1].dir.join("boot_nodes")).await;
    assert_eq!(boot.trim(), format!("ed25519:key0@{}", homes[0].addr));
    let stdout = wait_for_file(&homes[0].dir.join("stdout")).await;
    assert_eq!(stdout.trim(), "node started");

    let err = cluster.add_observer(&homes[0], &leader).await.unwrap_err();
    assert_eq!(err.error_code(), "UNEXPECTED_ROLE");

    // A node that dies on startup is reported
    std::fs::write(homes[2].dir.join("crash"), "").unwrap();
    let err = cluster.add_observer(&homes[2], &leader).await.unwrap_err();
    assert_eq!(err.error_code(), "EARLY_EXIT");
    assert_eq!(cluster.running(), 2);

    std::fs::remove_file(homes[2].dir.join("crash")).unwrap();
    let late = cluster.add_observer(&homes[2], &leader).await.unwrap();
    assert_eq!(late.ordinal, 2);
    assert_eq!(cluster.running(), 3);

    cluster.shutdown().await.unwrap();
    assert_eq!(cluster.running(), 0);
}
