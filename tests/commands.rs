//! Command dispatch and configuration tests for the `Mind` facade.

use std::io::Write;

use akh_mind::config::MindConfig;
use akh_mind::error::{CommandError, ConfigError, MindError};
use akh_mind::mind::{Answer, Command, Mind};
use akh_mind::value::{GroupKind, Shape, Value};

fn associate(mind: &mut Mind, left: Value, right: Value, intensity: f64) -> Answer {
    mind.execute(Command::Associate {
        left,
        right,
        intensity,
    })
    .unwrap()
}

fn compare(mind: &mut Mind, left: Value, right: Value) -> bool {
    match mind.execute(Command::Compare { left, right }).unwrap() {
        Answer::Compared { equal, .. } => equal,
        other => panic!("unexpected answer {other:?}"),
    }
}

#[test]
fn associate_builds_missing_ideas() {
    let mut mind = Mind::named("dimo").unwrap();
    let answer = associate(&mut mind, Value::text("one"), Value::Number(1.0), 1.0);
    assert_eq!(answer, Answer::Associated { linked: true });
    assert!(mind.stats().ideas >= 2);
    assert!(compare(&mut mind, Value::text("one"), Value::Number(1.0)));
}

#[test]
fn comparison_follows_association_chains() {
    let mut mind = Mind::named("dimo").unwrap();
    associate(&mut mind, Value::text("one"), Value::Number(1.0), 1.0);
    associate(&mut mind, Value::Number(1.0), Value::text("number"), 1.0);
    assert!(compare(&mut mind, Value::text("one"), Value::text("number")));
    assert!(compare(&mut mind, Value::text("number"), Value::text("one")));
}

#[test]
fn negative_intensity_disassociates() {
    let mut mind = Mind::named("dimo").unwrap();
    associate(&mut mind, Value::text("hot"), Value::text("warm"), 1.0);
    associate(&mut mind, Value::text("warm"), Value::text("cold"), 1.0);
    assert!(compare(&mut mind, Value::text("hot"), Value::text("cold")));

    let answer = associate(&mut mind, Value::text("hot"), Value::text("cold"), -1.0);
    assert_eq!(answer, Answer::Associated { linked: true });
    assert!(!compare(&mut mind, Value::text("hot"), Value::text("cold")));
    assert_eq!(mind.stats().disassociations, 1);
}

#[test]
fn case_variants_compare_equal() {
    let mut mind = Mind::named("dimo").unwrap();
    mind.execute(Command::Create {
        value: Value::text("Dimo"),
    })
    .unwrap();
    assert!(compare(&mut mind, Value::text("Dimo"), Value::text("dimo")));
}

#[test]
fn nan_intensity_is_an_error() {
    let mut mind = Mind::named("dimo").unwrap();
    let err = mind
        .execute(Command::Associate {
            left: Value::text("a"),
            right: Value::text("b"),
            intensity: f64::NAN,
        })
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidIntensity { .. }));
}

#[test]
fn interpret_command_gathers_associated_numbers() {
    let mut mind = Mind::named("dimo").unwrap();
    associate(&mut mind, Value::text("cat"), Value::Number(4.0), 1.0);
    let answer = mind
        .execute(Command::Interpret {
            value: Value::text("cat"),
            shape: Some(Shape::Number),
            depth: None,
        })
        .unwrap();
    let Answer::Interpreted { data, depth } = answer else {
        panic!("expected an interpretation");
    };
    assert!(depth.is_some());
    assert!(data.contains(&Value::Number(4.0)));
}

#[test]
fn long_unknown_text_does_not_compare_equal() {
    let mut mind = Mind::named("dimo").unwrap();
    associate(&mut mind, Value::text("ab"), Value::text("ba"), 1.0);
    let long = Value::text("ab".repeat(1000));
    assert!(!compare(&mut mind, long.clone(), Value::text("ab")));
    assert!(!compare(&mut mind, long, Value::text("ab".repeat(999))));
}

#[test]
fn handles_of_another_mind_are_unknown() {
    let mut home = Mind::named("home").unwrap();
    let Answer::Created { idea: Some(pair) } = home
        .execute(Command::Create {
            value: Value::code("(big dog)"),
        })
        .unwrap()
    else {
        panic!("expected a created idea");
    };
    associate(&mut home, Value::text("big"), Value::Number(7.0), 1.0);

    let mut away = Mind::named("away").unwrap();
    let mut far = Vec::new();
    for w in ["big", "dog"] {
        match away.execute(Command::Create { value: Value::text(w) }).unwrap() {
            Answer::Created { idea: Some(id) } => far.push(id),
            other => panic!("unexpected answer {other:?}"),
        }
    }
    let foreign = Value::ideas(GroupKind::All, far.clone());

    let answer = home
        .execute(Command::Compare {
            left: foreign,
            right: Value::code("(big dog)"),
        })
        .unwrap();
    assert_eq!(
        answer,
        Answer::Compared {
            equal: false,
            matched: None
        }
    );
    assert!(compare(&mut home, Value::code("(big dog)"), Value::idea(pair)));

    let answer = home
        .execute(Command::Interpret {
            value: Value::idea(far[0]),
            shape: Some(Shape::Number),
            depth: None,
        })
        .unwrap();
    let Answer::Interpreted { data, .. } = answer else {
        panic!("expected an interpretation");
    };
    assert!(data.is_empty());
}

#[test]
fn json_script_runs_in_order() {
    let script = r#"[
        {"command": "create", "value": {"text": "swan"}},
        {"command": "associate", "left": {"text": "swan"}, "right": {"text": "bird"}},
        {"command": "compare", "left": {"text": "swan"}, "right": {"text": "bird"}}
    ]"#;
    let commands: Vec<Command> = serde_json::from_str(script).unwrap();
    let mut mind = Mind::named("script").unwrap();
    let answers = mind.run(commands).unwrap();
    assert_eq!(answers.len(), 3);
    assert!(matches!(answers[0], Answer::Created { idea: Some(_) }));
    assert_eq!(answers[1], Answer::Associated { linked: true });
    assert!(matches!(answers[2], Answer::Compared { equal: true, .. }));

    let json = serde_json::to_string(&answers[1]).unwrap();
    assert_eq!(json, r#"{"answer":"associated","linked":true}"#);
}

#[test]
fn run_stops_at_first_error() {
    let mut mind = Mind::named("script").unwrap();
    let result = mind.run([
        Command::Create {
            value: Value::text("a"),
        },
        Command::Associate {
            left: Value::text("a"),
            right: Value::text("b"),
            intensity: f64::NAN,
        },
    ]);
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "name = \"dimo\"\n\n[ontology]\ndepth_limit = 3\npersist_cache = false"
    )
    .unwrap();

    let config = MindConfig::load(file.path()).unwrap();
    assert_eq!(config.name, "dimo");
    assert_eq!(config.ontology.depth_limit, 3);
    assert!(!config.ontology.persist_cache);
    assert_eq!(config.ontology.max_reduce_depth, 32);

    let mind = Mind::new(config).unwrap();
    assert_eq!(mind.name(), "dimo");
    assert_eq!(mind.ontology().owner(), "dimo");
}

#[test]
fn config_round_trips_through_toml() {
    let config = MindConfig::with_name("roundtrip");
    let rendered = config.to_toml().unwrap();
    assert_eq!(MindConfig::from_toml_str(&rendered).unwrap(), config);
}

#[test]
fn missing_config_file_is_a_read_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = MindConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let err = MindConfig::from_toml_str("name = [").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn zero_depth_limit_is_invalid() {
    let err = MindConfig::from_toml_str("[ontology]\ndepth_limit = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));

    let mut config = MindConfig::default();
    config.name = " ".into();
    assert!(matches!(
        Mind::new(config),
        Err(MindError::Config(ConfigError::Invalid { .. }))
    ));
}
