use polytone_core::MtsTuningStore;
use polytone_domain_tuning::OctaveFormat;
use polytone_infra_storage_fs::FsTuningDirectory;
use polytone_ports::tuning::TuningError;
use pretty_assertions::assert_eq;
use std::fs;

fn two_byte_bank(pc: usize, value: u16) -> Vec<u8> {
    let mut data = vec![0xf0, 0x7e, 0x7f, 0x08, 0x09, 0x03, 0x7f, 0x7f];
    for i in 0..12 {
        let v = if i == pc { value } else { 0x2000 };
        data.push((v >> 7) as u8 & 0x7f);
        data.push(v as u8 & 0x7f);
    }
    data.push(0xf7);
    data
}

#[test]
fn banks_load_from_a_directory() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("zarlino.syx"), two_byte_bank(4, 0x1000)).unwrap();
    fs::write(dir.path().join("kirnberger.syx"), two_byte_bank(7, 0x3000)).unwrap();
    fs::write(dir.path().join("truncated.syx"), &two_byte_bank(0, 0)[..20]).unwrap();

    let store = MtsTuningStore::load(&FsTuningDirectory::new(dir.path().to_path_buf())).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.names().collect::<Vec<_>>(), vec!["kirnberger", "zarlino"]);

    let zarlino = store.bank(2).unwrap();
    assert_eq!(zarlino.tuning.format, OctaveFormat::TwoByte);
    assert_eq!(zarlino.tuning.offsets[4], -0.5);
    assert_eq!(store.bank(1).unwrap().tuning.offsets[7], 0.5);
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = FsTuningDirectory::new(dir.path().join("absent"));
    assert!(matches!(
        MtsTuningStore::load(&source),
        Err(TuningError::DirectoryNotFound(_))
    ));
}
