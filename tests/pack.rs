use stagec::bundle::{self, Archive};
use stagec::pack::{self, StageData, StagePack};
use stagec::shader::{Binding, BindingType, Stage, Target};

fn stage(target: Target, entry_point: &str) -> StageData {
    StageData {
        shader_name: "blur".into(),
        target,
        entry_point: entry_point.into(),
        stage: Stage::Pixel,
        bindings: vec![
            Binding {
                name: "albedo".into(),
                ty: BindingType::Texture,
                register: 0,
            },
            Binding {
                name: "Params".into(),
                ty: BindingType::ConstantBuffer,
                register: 1,
            },
        ],
        byte_code: vec![0xDE, 0xAD, 0xBE, 0xEF],
    }
}

#[test]
fn binary_round_trip_preserves_membership_and_records() {
    let mut pack = StagePack::new();
    pack.add_stage(stage(Target::Gl40, "main")).unwrap();
    pack.add_stage(stage(Target::Vk10, "main")).unwrap();
    pack.add_stage(stage(Target::Mt, "main_mt")).unwrap();
    let buf = pack.to_bytes().unwrap();
    let decoded = StagePack::from_bytes(&buf).unwrap();
    assert_eq!(decoded.len(), 3);
    for target in [Target::Gl40, Target::Vk10, Target::Mt] {
        let original = pack.get(target).unwrap();
        let read = decoded.get(target).unwrap();
        assert_eq!(read, original);
    }
    let targets: Vec<Target> = decoded.stages().map(|v| v.target).collect();
    assert_eq!(targets, vec![Target::Gl40, Target::Vk10, Target::Mt]);
}

#[test]
fn json_round_trip_preserves_membership_and_records() {
    let mut pack = StagePack::new();
    pack.add_stage(stage(Target::Gl40, "main")).unwrap();
    pack.add_stage(stage(Target::Es31, "main")).unwrap();
    let buf = pack.to_json().unwrap();
    let decoded = StagePack::from_json(&buf).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.get(Target::Gl40).unwrap(), pack.get(Target::Gl40).unwrap());
    assert_eq!(decoded.get(Target::Es31).unwrap(), pack.get(Target::Es31).unwrap());
    assert!(decoded.get(Target::Vk10).is_none());
}

#[test]
fn serializing_an_empty_pack_fails() {
    let pack = StagePack::new();
    assert!(matches!(pack.to_bytes(), Err(pack::error::WriteError::Empty)));
    assert!(matches!(pack.to_json(), Err(pack::error::WriteError::Empty)));
}

#[test]
fn duplicate_target_insertion_is_rejected() {
    let mut pack = StagePack::new();
    pack.add_stage(stage(Target::Gl40, "main")).unwrap();
    let err = pack.add_stage(stage(Target::Gl40, "other")).unwrap_err();
    assert!(matches!(err, pack::error::WriteError::DuplicateTarget(Target::Gl40)));
    assert_eq!(pack.len(), 1);
    assert_eq!(pack.get(Target::Gl40).unwrap().entry_point, "main");
}

#[test]
fn bad_signature_is_rejected() {
    let mut pack = StagePack::new();
    pack.add_stage(stage(Target::Gl40, "main")).unwrap();
    let mut buf = pack.to_bytes().unwrap();
    buf[0] = b'X';
    let err = StagePack::from_bytes(&buf).unwrap_err();
    assert!(matches!(err, pack::error::ReadError::BadSignature(_)));
}

#[test]
fn bad_version_is_rejected() {
    let mut pack = StagePack::new();
    pack.add_stage(stage(Target::Gl40, "main")).unwrap();
    let mut buf = pack.to_bytes().unwrap();
    buf[3] = 0xFF;
    let err = StagePack::from_bytes(&buf).unwrap_err();
    assert!(matches!(err, pack::error::ReadError::BadVersion(_)));
}

#[test]
fn truncated_packs_are_rejected() {
    let mut pack = StagePack::new();
    pack.add_stage(stage(Target::Gl40, "main")).unwrap();
    let buf = pack.to_bytes().unwrap();
    let err = StagePack::from_bytes(&buf[..buf.len() - 2]).unwrap_err();
    assert!(matches!(err, pack::error::ReadError::Eos(_)));
}

#[test]
fn invalid_target_code_is_rejected() {
    let mut pack = StagePack::new();
    pack.add_stage(stage(Target::Gl40, "main")).unwrap();
    let mut buf = pack.to_bytes().unwrap();
    // First record starts right after the 9 byte header.
    buf[9] = 0x7F;
    let err = StagePack::from_bytes(&buf).unwrap_err();
    assert!(matches!(err, pack::error::ReadError::InvalidCode(_, 0x7F)));
}

#[test]
fn archive_round_trip_preserves_entries() {
    let mut blur = StagePack::new();
    blur.add_stage(stage(Target::Gl40, "main")).unwrap();
    let mut tonemap = StagePack::new();
    tonemap.add_stage(stage(Target::Gl40, "main")).unwrap();
    tonemap.add_stage(stage(Target::Vk10, "main")).unwrap();
    let mut archive = Archive::new();
    archive.add_entry("blur", blur).unwrap();
    archive.add_entry("tonemap", tonemap).unwrap();
    let buf = archive.to_bytes().unwrap();
    let decoded = Archive::from_bytes(&buf).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.get("blur").unwrap().len(), 1);
    assert_eq!(decoded.get("tonemap").unwrap().len(), 2);
    assert!(decoded.get("bloom").is_none());
    let names: Vec<&str> = decoded.entries().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["blur", "tonemap"]);
}

#[test]
fn serializing_an_empty_archive_fails() {
    let archive = Archive::new();
    assert!(matches!(archive.to_bytes(), Err(bundle::WriteError::Empty)));
}

#[test]
fn duplicate_archive_entries_are_rejected() {
    let mut blur = StagePack::new();
    blur.add_stage(stage(Target::Gl40, "main")).unwrap();
    let mut archive = Archive::new();
    archive.add_entry("blur", blur).unwrap();
    let mut again = StagePack::new();
    again.add_stage(stage(Target::Gl40, "main")).unwrap();
    let err = archive.add_entry("blur", again).unwrap_err();
    assert!(matches!(err, bundle::WriteError::DuplicateName(_)));
}
