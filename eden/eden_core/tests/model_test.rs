use eden_core::{
    Error, HookSource, LifecycleError, LifecycleStage, PermissionDescriptor, PermissionError,
    PermissionKind, PermissionState,
};

#[test]
fn test_descriptor_keys_collapse_equivalent_spellings() {
    let spellings = [
        r#"{"name":"read","path":"/etc/passwd"}"#,
        r#"{"name":"read","path":"/etc//passwd"}"#,
        r#"{"name":"read","path":"/etc/ssh/../passwd"}"#,
        r#"{"name":"read","path":"file:///etc/passwd"}"#,
    ];
    let keys: Vec<PermissionDescriptor> = spellings
        .iter()
        .map(|json| {
            serde_json::from_str::<PermissionDescriptor>(json)
                .unwrap()
                .normalize()
        })
        .collect();
    assert!(keys.iter().all(|key| *key == keys[0]));
    assert_eq!(keys[0].to_string(), "read(/etc/passwd)");
}

#[test]
fn test_every_kind_has_an_unscoped_form() {
    for kind in PermissionKind::ALL {
        let descriptor = PermissionDescriptor::unscoped_of(kind);
        assert!(descriptor.is_unscoped());
        assert!(descriptor.broader().is_empty());
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["name"], kind.as_str());
    }
}

#[test]
fn test_state_literals() {
    assert_eq!(PermissionState::default(), PermissionState::Prompt);
    assert_eq!(
        serde_json::to_string(&PermissionState::Granted).unwrap(),
        "\"granted\""
    );
    assert!(PermissionState::Denied.is_decided());
    assert!(!PermissionState::Prompt.is_decided());
}

#[test]
fn test_stage_walk_visits_every_stage_once() {
    let mut current = Some(LifecycleStage::first());
    let mut visited = Vec::new();
    while let Some(stage) = current {
        visited.push(stage);
        current = stage.successor();
    }
    assert_eq!(visited, LifecycleStage::ALL.to_vec());
}

#[test]
fn test_lifecycle_hook_descriptor_matches_locator() {
    let source = HookSource::parse("file:///plugins/a/../b.js").unwrap();
    let descriptor = PermissionDescriptor::lifecycle_hook(source.as_str());
    assert_eq!(descriptor.scope(), Some("/plugins/b.js"));
    assert_eq!(
        PermissionDescriptor::lifecycle_hook("file:///plugins/b.js"),
        descriptor
    );
}

#[test]
fn test_errors_convert_into_root() {
    let error: Error = LifecycleError::UnknownStage("os-reboot".into()).into();
    assert!(matches!(error, Error::Lifecycle(_)));

    let error: Error = PermissionError::Denied(PermissionDescriptor::SystemCtl).into();
    assert_eq!(
        error.to_string(),
        "Permission error: Permission denied: system-ctl"
    );
}
