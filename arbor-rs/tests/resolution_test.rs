//! Resolution of raw input against a populated command manager.

use arbor::{
    ArgumentSpec, Command, CommandBuilder, CommandError, CommandManager, Conflict, FlagSpec,
    Invocation, ParseFailure, RegistrationError, ResolveError, TypeTag,
};

#[derive(Debug, Clone)]
struct Player {
    name: String,
}

fn alice() -> Player {
    Player {
        name: "Alice".to_string(),
    }
}

fn register(manager: &CommandManager<Player>, builder: CommandBuilder<Player>) {
    let command = builder
        .handler(|inv: &Invocation<Player>| format!("{}: {}", inv.sender().name, inv.input()))
        .build()
        .expect("valid command");
    manager.register_command(command).expect("registration succeeds");
}

fn manager() -> CommandManager<Player> {
    let manager = CommandManager::new(|_: &Player, _: &str| true);

    register(
        &manager,
        Command::builder("give")
            .required("player", TypeTag::STRING)
            .required("item", TypeTag::STRING)
            .optional_with_default("amount", TypeTag::INTEGER, "1"),
    );
    register(
        &manager,
        Command::builder("team").literal("create").required("name", TypeTag::STRING),
    );
    register(
        &manager,
        Command::builder("team").literal("delete").required("name", TypeTag::STRING),
    );
    register(
        &manager,
        Command::builder("heal").optional("amount", TypeTag::INTEGER),
    );
    register(
        &manager,
        Command::builder("broadcast")
            .required("channel", TypeTag::STRING)
            .optional_with_default("priority", TypeTag::INTEGER, "0")
            .flag(FlagSpec::presence("loud").short('l'))
            .flag(FlagSpec::valued("repeat", TypeTag::INTEGER).short('r').default_input("1")),
    );
    register(
        &manager,
        Command::builder("say").argument(
            ArgumentSpec::required("message", TypeTag::STRING).with_config("mode", "greedy"),
        ),
    );
    register(
        &manager,
        Command::builder("shout")
            .argument(ArgumentSpec::required("message", TypeTag::STRING).with_config("mode", "greedy"))
            .flag(FlagSpec::presence("loud").short('l'))
            .flag(FlagSpec::valued("times", TypeTag::INTEGER).default_input("1")),
    );
    register(
        &manager,
        Command::builder("gamemode").argument(
            ArgumentSpec::required("mode", TypeTag::CHOICE)
                .with_config("choices", vec!["survival", "creative", "spectator"]),
        ),
    );

    manager
}

fn resolve_err(manager: &CommandManager<Player>, input: &str) -> ResolveError {
    match manager.resolve(alice(), input) {
        Ok(invocation) => panic!("expected '{}' to fail, resolved {:?}", input, invocation),
        Err(err) => err,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_all_arguments_given() {
    let manager = manager();
    let invocation = manager.resolve(alice(), "give Alice sword 3").unwrap();

    assert_eq!(invocation.get::<String>("player").map(String::as_str), Some("Alice"));
    assert_eq!(invocation.get::<String>("item").map(String::as_str), Some("sword"));
    assert_eq!(invocation.get::<i64>("amount"), Some(&3));
    assert_eq!(invocation.command().syntax(), "give <player> <item> [amount]");
}

#[test]
fn test_omitted_optional_uses_default() {
    let manager = manager();
    let invocation = manager.resolve(alice(), "give Alice sword").unwrap();
    assert_eq!(invocation.get::<i64>("amount"), Some(&1));
}

#[test]
fn test_omitted_optional_without_default_is_absent() {
    let manager = manager();
    let invocation = manager.resolve(alice(), "heal").unwrap();
    assert!(!invocation.values().contains("amount"));
    assert_eq!(invocation.get_or("amount", 20_i64), 20);
}

#[test]
fn test_missing_required_is_incomplete() {
    let manager = manager();
    let err = resolve_err(&manager, "give Alice");
    assert_eq!(
        err,
        ResolveError::Incomplete {
            path: vec!["give".into(), "<player>".into()],
            expected: vec!["<item>".into()],
        }
    );
    assert_eq!(err.to_string(), "incomplete command 'give <player>', expected: <item>");
}

#[test]
fn test_sibling_literals_resolve_independently() {
    let manager = manager();

    let create = manager.resolve(alice(), "team create red").unwrap();
    assert_eq!(create.command().syntax(), "team create <name>");
    assert_eq!(create.get::<String>("name").map(String::as_str), Some("red"));

    let delete = manager.resolve(alice(), "team delete red").unwrap();
    assert_eq!(delete.command().syntax(), "team delete <name>");
}

#[test]
fn test_unknown_literal() {
    let manager = manager();
    let err = resolve_err(&manager, "team list");
    assert_eq!(
        err,
        ResolveError::UnknownLiteral {
            path: vec!["team".into()],
            token: "list".into(),
            expected: vec!["create".into(), "delete".into()],
        }
    );

    let err = resolve_err(&manager, "team");
    assert!(matches!(err, ResolveError::Incomplete { expected, .. } if expected == ["create", "delete"]));
}

#[test]
fn test_catch_all_value_siblings_are_ambiguous() {
    let manager = manager();
    register(&manager, Command::builder("x").required("a", TypeTag::INTEGER));

    let command = Command::builder("x")
        .required("b", TypeTag::STRING)
        .handler(|_: &Invocation<Player>| ())
        .build()
        .unwrap();
    let err = manager.register_command(command).unwrap_err();

    match err {
        RegistrationError::Ambiguous(err) => {
            assert_eq!(err.path, vec!["x".to_string()]);
            assert!(matches!(err.conflict, Conflict::ValueSibling { .. }));
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
    assert!(manager.resolve(alice(), "x 5").is_ok());
}

// ============================================================================
// Structural Failures
// ============================================================================

#[test]
fn test_unknown_and_empty_command() {
    let manager = manager();
    assert_eq!(
        resolve_err(&manager, "fly"),
        ResolveError::NoSuchCommand { name: "fly".into() }
    );
    assert_eq!(
        resolve_err(&manager, "   "),
        ResolveError::NoSuchCommand { name: String::new() }
    );
}

#[test]
fn test_too_many_arguments() {
    let manager = manager();
    let err = resolve_err(&manager, "give Alice sword 3 extra tokens");
    assert_eq!(
        err,
        ResolveError::TooManyArguments {
            path: vec!["give".into(), "<player>".into(), "<item>".into(), "[amount]".into()],
            extra: vec!["extra".into(), "tokens".into()],
        }
    );
}

#[test]
fn test_parse_failure_names_argument() {
    let manager = manager();
    let err = resolve_err(&manager, "give Alice sword three");
    match err {
        ResolveError::ArgumentParse {
            argument, source, ..
        } => {
            assert_eq!(argument, "amount");
            assert_eq!(source, ParseFailure::invalid("three", "integer"));
        }
        other => panic!("expected parse failure, got {:?}", other),
    }
}

#[test]
fn test_resolution_is_idempotent() {
    let manager = manager();
    for input in ["team list", "give Alice", "give Alice sword three"] {
        assert_eq!(resolve_err(&manager, input), resolve_err(&manager, input));
    }

    let first = manager.resolve(alice(), "give Bob bread 2").unwrap();
    let second = manager.resolve(alice(), "give Bob bread 2").unwrap();
    assert!(std::sync::Arc::ptr_eq(first.command(), second.command()));
    assert_eq!(first.values().names(), second.values().names());
    assert_eq!(first.get::<i64>("amount"), second.get::<i64>("amount"));
}

// ============================================================================
// Parsers
// ============================================================================

#[test]
fn test_greedy_string_takes_rest_of_line() {
    let manager = manager();
    let invocation = manager.resolve(alice(), "say hello   there world").unwrap();
    assert_eq!(
        invocation.get::<String>("message").map(String::as_str),
        Some("hello there world")
    );
}

#[test]
fn test_greedy_string_stops_at_known_flags() {
    let manager = manager();

    let invocation = manager.resolve(alice(), "shout hello --loud").unwrap();
    assert_eq!(invocation.get::<String>("message").map(String::as_str), Some("hello"));
    assert_eq!(invocation.get::<bool>("loud"), Some(&true));

    let invocation = manager
        .resolve(alice(), "shout hello there --times 3 -l")
        .unwrap();
    assert_eq!(
        invocation.get::<String>("message").map(String::as_str),
        Some("hello there")
    );
    assert_eq!(invocation.get::<i64>("times"), Some(&3));
    assert_eq!(invocation.get::<bool>("loud"), Some(&true));

    let invocation = manager.resolve(alice(), "shout hello there").unwrap();
    assert_eq!(
        invocation.get::<String>("message").map(String::as_str),
        Some("hello there")
    );
    assert_eq!(invocation.get::<bool>("loud"), Some(&false));
    assert_eq!(invocation.get::<i64>("times"), Some(&1));

    let invocation = manager.resolve(alice(), "shout use --force wisely").unwrap();
    assert_eq!(
        invocation.get::<String>("message").map(String::as_str),
        Some("use --force wisely")
    );
}

#[test]
fn test_greedy_string_completes_flags() {
    let manager = manager();
    assert_eq!(
        manager.suggest(&alice(), "shout hello --"),
        vec!["--loud".to_string(), "--times".to_string()]
    );
    assert_eq!(manager.suggest(&alice(), "shout hello --loud --"), vec!["--times".to_string()]);
}

#[test]
fn test_choice_yields_canonical_spelling() {
    let manager = manager();
    let invocation = manager.resolve(alice(), "gamemode CREATIVE").unwrap();
    assert_eq!(invocation.get::<String>("mode").map(String::as_str), Some("creative"));

    let err = resolve_err(&manager, "gamemode hardcore");
    assert!(matches!(
        err,
        ResolveError::ArgumentParse {
            source: ParseFailure::UnknownChoice { .. },
            ..
        }
    ));
}

#[test]
fn test_negative_number_is_a_value() {
    let manager = manager();
    let invocation = manager.resolve(alice(), "broadcast global -5").unwrap();
    assert_eq!(invocation.get::<i64>("priority"), Some(&-5));
}

// ============================================================================
// Flags
// ============================================================================

#[test]
fn test_flags_in_any_order() {
    let manager = manager();
    for input in ["broadcast global 2 -l --repeat 3", "broadcast global 2 -r 3 --loud"] {
        let invocation = manager.resolve(alice(), input).unwrap();
        assert_eq!(invocation.get::<i64>("priority"), Some(&2));
        assert_eq!(invocation.get::<bool>("loud"), Some(&true));
        assert_eq!(invocation.get::<i64>("repeat"), Some(&3));
    }
}

#[test]
fn test_flag_defaults() {
    let manager = manager();
    let invocation = manager.resolve(alice(), "broadcast global 4").unwrap();
    assert_eq!(invocation.get::<bool>("loud"), Some(&false));
    assert_eq!(invocation.get::<i64>("repeat"), Some(&1));
}

#[test]
fn test_flag_skips_optional_with_default() {
    let manager = manager();
    let invocation = manager.resolve(alice(), "broadcast global --loud").unwrap();
    assert_eq!(invocation.get::<i64>("priority"), Some(&0));
    assert_eq!(invocation.get::<bool>("loud"), Some(&true));
}

#[test]
fn test_unknown_and_repeated_flags() {
    let manager = manager();

    let err = resolve_err(&manager, "broadcast global 1 --whisper");
    assert!(matches!(
        err,
        ResolveError::ArgumentParse {
            source: ParseFailure::UnknownFlag { flag },
            ..
        } if flag == "--whisper"
    ));

    let err = resolve_err(&manager, "broadcast global --loud -l");
    assert!(matches!(
        err,
        ResolveError::ArgumentParse {
            source: ParseFailure::RepeatedFlag { flag },
            ..
        } if flag == "--loud"
    ));
}

#[test]
fn test_valued_flag_without_value() {
    let manager = manager();
    let err = resolve_err(&manager, "broadcast global --repeat");
    assert!(matches!(
        err,
        ResolveError::ArgumentParse {
            argument,
            source: ParseFailure::NoInput,
            ..
        } if argument == "repeat"
    ));
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn test_execute_reports_resolution_failure_through_handle() {
    let manager = manager();
    let mut handle = manager.execute_command(alice(), "give Alice");
    assert!(handle.is_finished());
    let err = handle.try_take().unwrap().unwrap_err();
    assert!(matches!(err, CommandError::Resolve(ResolveError::Incomplete { .. })));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_execute_runs_handler() {
    let manager = manager();
    let mut handle = manager.execute_command(alice(), "team create red");
    let output = handle.try_take().unwrap().unwrap();
    assert_eq!(output.to_string(), "Alice: team create red");
}
