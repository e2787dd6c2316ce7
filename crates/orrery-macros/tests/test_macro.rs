use orrery_macros::ConfigDefaults;

#[test]
fn test_defaults_are_applied() {
    #[derive(ConfigDefaults, Clone, Debug, PartialEq)]
    struct TimelineSection {
        #[default(0.0)]
        pub start: f64,

        #[default(365.25)]
        pub length: f64,

        #[default("day")]
        pub unit: String,

        #[default(None)]
        pub seed: Option<u64>,

        #[default(vec![1.0, 0.0, 0.0])]
        pub axis: Vec<f64>,
    }

    let section = TimelineSection::default();
    assert_eq!(section.start, 0.0);
    assert_eq!(section.length, 365.25);
    assert_eq!(section.unit, "day");
    assert_eq!(section.seed, None);
    assert_eq!(section.axis, vec![1.0, 0.0, 0.0]);
}

#[test]
fn test_computed_defaults() {
    #[derive(ConfigDefaults, Clone, Debug, PartialEq)]
    struct GaussSection {
        #[default(0.01720209895 * 0.01720209895)]
        pub gravitational_constant: f64,

        #[default(4 * 5)]
        pub max_iterations: usize,
    }

    let section = GaussSection::default();
    assert!((section.gravitational_constant - 2.959122082855911e-4).abs() < 1e-18);
    assert_eq!(section.max_iterations, 20);
}

#[test]
fn test_nested_sections() {
    #[derive(ConfigDefaults, Clone, Debug, PartialEq)]
    struct Inner {
        #[default(1.5)]
        pub factor: f64,
    }

    #[derive(ConfigDefaults, Clone, Debug, PartialEq)]
    struct Outer {
        #[default(Inner::default())]
        pub collision: Inner,

        #[default(Inner { factor: 0.0 })]
        pub close_encounter: Inner,
    }

    let outer = Outer::default();
    assert_eq!(outer.collision.factor, 1.5);
    assert_eq!(outer.close_encounter.factor, 0.0);
}

#[test]
fn test_range_validation() {
    #[derive(ConfigDefaults, Clone, Debug, PartialEq)]
    struct IntegratorSection {
        #[default(-10.0)]
        #[range(-16.0..=0.0)]
        pub accuracy: f64,

        #[default(20)]
        #[range(1..)]
        pub max_iterations: usize,

        #[default(1.0)]
        pub initial_step: f64,
    }

    let section = IntegratorSection::default();
    assert!(section.validate_ranges().is_ok());

    let too_loose = IntegratorSection {
        accuracy: 0.5,
        ..section.clone()
    };
    let message = too_loose.validate_ranges().unwrap_err();
    assert!(message.contains("accuracy"), "unexpected message: {message}");

    let edge = IntegratorSection {
        accuracy: -16.0,
        ..section.clone()
    };
    assert!(edge.validate_ranges().is_ok());

    let no_retries = IntegratorSection {
        max_iterations: 0,
        ..section
    };
    assert!(
        no_retries
            .validate_ranges()
            .unwrap_err()
            .contains("max_iterations")
    );
}

#[test]
fn test_half_open_range() {
    #[derive(ConfigDefaults, Clone, Debug, PartialEq)]
    struct CollisionSection {
        #[default(0.5)]
        #[range(0.0..1.0)]
        pub factor: f64,
    }

    assert!(CollisionSection::default().validate_ranges().is_ok());
    assert!(
        CollisionSection { factor: 1.0 }
            .validate_ranges()
            .is_err()
    );
}

#[test]
fn test_with_serde() {
    use serde::{Deserialize, Serialize};

    #[derive(ConfigDefaults, Serialize, Deserialize, Clone, Debug, PartialEq)]
    #[serde(default)]
    struct OutputSection {
        #[default("out")]
        pub directory: String,

        #[default("phases.txt")]
        pub phases: String,
    }

    let parsed: OutputSection = serde_json::from_str(r#"{"directory": "runs"}"#).unwrap();
    assert_eq!(parsed.directory, "runs");
    assert_eq!(parsed.phases, "phases.txt");

    let json = serde_json::to_string(&OutputSection::default()).unwrap();
    assert!(json.contains("\"out\""));
}
