//! Configuration specs
//!
//! Verify that a loaded config drives the on-disk layout.

use crate::prelude::*;
use mdj_journal::JournalPaths;

#[test]
fn config_file_renames_store_directories() {
    let state = tempfile::TempDir::new().unwrap();
    let config_path = state.path().join("journal.toml");
    std::fs::write(
        &config_path,
        "sync_writes = false\njournal_dir_name = \"index\"\nmds_dir_name = \"blobs\"\n",
    )
    .unwrap();
    let config = JournalConfig::load(&config_path).unwrap();

    let device = Device::new(MetadataVer::V2);
    let paths = JournalPaths::for_device(
        state.path(),
        &device.uid,
        &device.signer.verifying_key(),
        &device.tlf,
    );
    let mut j = MdJournal::open(
        config,
        paths.dir.clone(),
        device.uid.clone(),
        device.signer.verifying_key(),
        device.tlf.clone(),
        FakeCrypto,
        device.clock.clone(),
    )
    .unwrap();
    device.put_chain(&mut j, 1, None, 2);

    assert!(paths.dir.starts_with(state.path().join("tlfs").join("shared-folder")));
    assert!(paths.dir.join("index").is_dir());
    assert!(paths.dir.join("blobs").is_dir());
    assert!(!paths.dir.join("md_journal").exists());
}

#[test]
fn unknown_config_keys_are_rejected() {
    assert!(JournalConfig::from_toml_str("flush_interval = 5").is_err());
}
