use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::media(Stage::Concat, "x")
            .to_string()
            .contains("media processing error at concat:")
    );
    assert!(
        ReelError::service(Stage::Generation, ServiceStatus::Timeout, "x")
            .to_string()
            .contains("(timeout)")
    );
    assert!(
        ReelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn stage_and_remedy_follow_the_variant() {
    let cutout = ReelError::service(Stage::Cutout, ServiceStatus::NoOutput, "empty mask");
    assert_eq!(cutout.stage(), Some(Stage::Cutout));
    assert!(cutout.remedy().contains("different photo"));

    let timeout = ReelError::service(Stage::Generation, ServiceStatus::Timeout, "300s");
    assert!(timeout.is_transient());
    assert!(timeout.remedy().contains("try again"));

    let mux = ReelError::media(Stage::Mux, "exit 1");
    assert_eq!(mux.stage(), Some(Stage::Mux));
    assert!(!mux.is_transient());
    assert!(mux.remedy().contains("music"));
}
