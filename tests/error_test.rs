use std::io;

use medikit::error::Error;
use medikit::feature::FeatureName;

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();

    match err {
        Error::IoError(_) => (),
        _ => panic!("Expected IoError variant"),
    }

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(Error::from(json_err), Error::JsonError(_)));
}

#[test]
fn test_error_display() {
    let err = Error::ConfigError("invalid config".to_string());
    assert_eq!(err.to_string(), "Configuration error: invalid config.");

    let err =
        Error::UnmetDependency { feature: FeatureName::Pytest, requires: FeatureName::Python };
    assert_eq!(err.to_string(), "Unmet dependency: pytest requires python.");

    let err = Error::UnknownFeature { name: "cobol".to_string() };
    assert_eq!(err.to_string(), "Unknown feature 'cobol'.");

    let err = Error::PipelineNotStarted { name: "release".to_string() };
    assert!(err.to_string().contains("medikit pipeline release start"));
}
