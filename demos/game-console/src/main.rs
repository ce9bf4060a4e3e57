use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use arbor::{
    ArgumentParser, ArgumentSpec, CommandError, CommandMeta, CommandResult, FlagSpec,
    FromInvocation, Invocation, ManagerSettings, Output, ParseFailure, Parsed, ParserConfig,
    PermissionPolicy, TracingConfig, TracingFormat, TypeTag,
};
use arbor_host::{NativeSender, PermissionTable, PlatformManager, SenderMapper};
use clap::{Parser, ValueEnum};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};

// ============================================
// Command Line
// ============================================

#[derive(Parser, Debug)]
#[command(name = "game-console", about = "Interactive console for a toy game server")]
struct Cli {
    /// Name of the operator typing commands
    #[arg(long = "as", default_value = "console", env = "GAME_OPERATOR")]
    operator: String,

    /// Permission table (JSON); without one the operator may do anything
    #[arg(long)]
    permissions: Option<std::path::PathBuf>,

    /// Players online for the session
    #[arg(long, value_delimiter = ',', default_value = "Alice,Bob,Carol")]
    players: Vec<String>,

    /// Worker tasks running commands
    #[arg(long, default_value_t = 2)]
    workers: usize,

    #[arg(long, value_enum, default_value_t = Policy::PerNode)]
    policy: Policy,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    PerNode,
    TerminalOnly,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

// ============================================
// Senders
// ============================================

/// The native side: whoever sits at the console.
#[derive(Clone)]
struct Operator {
    name: String,
    table: Arc<PermissionTable>,
}

impl NativeSender for Operator {
    fn has_permission(&self, permission: &str) -> bool {
        self.table.check(&self.name, permission)
    }
}

/// What handlers see.
#[derive(Debug, Clone)]
struct Sender {
    name: String,
    world: Arc<World>,
}

#[derive(Debug, Default)]
struct World {
    inventories: Mutex<BTreeMap<String, BTreeMap<String, i64>>>,
    teams: Mutex<Vec<String>>,
}

// ============================================
// Platform Parser
// ============================================

struct OnlinePlayer {
    online: Vec<String>,
}

impl ArgumentParser for OnlinePlayer {
    fn parse(&self, tokens: &[&str]) -> Result<Parsed, ParseFailure> {
        let token = tokens.first().ok_or(ParseFailure::NoInput)?;
        self.online
            .iter()
            .find(|name| name.eq_ignore_ascii_case(token))
            .map(|name| Parsed::new(1, name.clone()))
            .ok_or_else(|| ParseFailure::invalid(*token, "online player"))
    }

    fn suggestions(&self, partial: &str) -> Vec<String> {
        let partial = partial.to_lowercase();
        self.online
            .iter()
            .filter(|name| name.to_lowercase().starts_with(&partial))
            .cloned()
            .collect()
    }
}

// ============================================
// Handlers
// ============================================

#[derive(FromInvocation)]
struct GiveArgs {
    player: String,
    item: String,
    amount: i64,
    #[arbor(default)]
    silent: bool,
}

fn give(inv: &Invocation<Sender>) -> CommandResult<Output> {
    let args: GiveArgs = inv.args()?;
    let world = &inv.sender().world;
    let total = {
        let mut inventories = world.inventories.lock();
        let count = inventories
            .entry(args.player.clone())
            .or_default()
            .entry(args.item.clone())
            .or_default();
        *count += args.amount;
        *count
    };
    if args.silent {
        return Ok(Output::Silent);
    }
    Ok(Output::text(format!(
        "{} gave {} x{} to {} (now {})",
        inv.sender().name,
        args.item,
        args.amount,
        args.player,
        total
    )))
}

fn inventory(inv: &Invocation<Sender>) -> CommandResult<String> {
    let player = inv.require::<String>("player")?;
    let inventories = inv.sender().world.inventories.lock();
    let lines: Vec<String> = inventories
        .get(player)
        .map(|items| {
            items
                .iter()
                .map(|(item, count)| format!("{} x{}", item, count))
                .collect()
        })
        .unwrap_or_default();
    if lines.is_empty() {
        return Ok(format!("{} has nothing", player));
    }
    Ok(format!("{}: {}", player, lines.join(", ")))
}

fn team_create(inv: &Invocation<Sender>) -> CommandResult<String> {
    let name = inv.require::<String>("name")?;
    let mut teams = inv.sender().world.teams.lock();
    if teams.contains(name) {
        return Err(arbor::HandlerError::user(format!("team '{}' already exists", name)));
    }
    teams.push(name.clone());
    Ok(format!("created team {}", name))
}

fn team_delete(inv: &Invocation<Sender>) -> CommandResult<String> {
    let name = inv.require::<String>("name")?;
    let mut teams = inv.sender().world.teams.lock();
    let before = teams.len();
    teams.retain(|team| team != name);
    if teams.len() == before {
        return Err(arbor::HandlerError::prerequisite(
            format!("team '{}' exists", name),
            "run 'team list' to see existing teams",
        ));
    }
    Ok(format!("deleted team {}", name))
}

fn team_list(inv: &Invocation<Sender>) -> String {
    let teams = inv.sender().world.teams.lock();
    if teams.is_empty() {
        "no teams".to_string()
    } else {
        teams.join(", ")
    }
}

// ============================================
// Setup
// ============================================

fn build_platform(
    cli: &Cli,
    table: &Arc<PermissionTable>,
    world: &Arc<World>,
) -> anyhow::Result<PlatformManager<Operator, Sender>> {
    let lookup = Arc::clone(table);
    let shared_world = Arc::clone(world);
    let mapper = SenderMapper::new(
        move |operator: Operator| Sender {
            name: operator.name,
            world: Arc::clone(&shared_world),
        },
        move |sender: &Sender| Operator {
            name: sender.name.clone(),
            table: Arc::clone(&lookup),
        },
    );

    let online = cli.players.clone();
    let mut settings = ManagerSettings::scheduled(cli.workers);
    settings.permission_policy = match cli.policy {
        Policy::PerNode => PermissionPolicy::PerNode,
        Policy::TerminalOnly => PermissionPolicy::TerminalOnly,
    };

    let platform = PlatformManager::builder("game-console", mapper)
        .parser("player", move |_: &ParserConfig| OnlinePlayer {
            online: online.clone(),
        })
        .default_meta(CommandMeta::new().with("platform", "game-console"))
        .settings(settings)
        .build()
        .context("failed to start the command manager")?;

    let commands = [
        platform
            .command_builder("give")
            .required("player", "player")
            .argument(
                ArgumentSpec::required("item", TypeTag::CHOICE)
                    .with_config("choices", vec!["sword", "bread", "torch"]),
            )
            .argument(
                ArgumentSpec::optional("amount", TypeTag::INTEGER)
                    .with_config("min", 1)
                    .with_config("max", 64)
                    .default_input("1"),
            )
            .flag(FlagSpec::presence("silent").short('s'))
            .permission("game.give")
            .description("Give items to a player")
            .handler(give),
        platform
            .command_builder("inventory")
            .required("player", "player")
            .description("Show a player's items")
            .handler(inventory),
        platform
            .command_builder("team")
            .literal("create")
            .required("name", TypeTag::STRING)
            .permission("game.team.create")
            .description("Create a team")
            .handler(team_create),
        platform
            .command_builder("team")
            .literal("delete")
            .required("name", TypeTag::STRING)
            .permission("game.team.delete")
            .description("Delete a team")
            .handler(team_delete),
        platform
            .command_builder("team")
            .literal_with_aliases("list", ["ls"])
            .description("List teams")
            .handler(team_list),
        platform
            .command_builder("say")
            .argument(ArgumentSpec::required("message", TypeTag::STRING).with_config("mode", "greedy"))
            .description("Broadcast a message")
            .handler(|inv: &Invocation<Sender>| -> CommandResult<String> {
                let message = inv.require::<String>("message")?;
                Ok(format!("[{}] {}", inv.sender().name, message))
            }),
    ];

    for builder in commands {
        let command = builder.build()?;
        platform.register_command(command)?;
    }
    Ok(platform)
}

fn load_table(cli: &Cli) -> anyhow::Result<PermissionTable> {
    match &cli.permissions {
        Some(path) => PermissionTable::load(path)
            .with_context(|| format!("failed to load permissions from {}", path.display())),
        None => {
            let table = PermissionTable::new();
            table.grant(cli.operator.clone(), "*");
            Ok(table)
        }
    }
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    arbor::init_subscriber_with_config(TracingConfig {
        format: match cli.log_format {
            LogFormat::Pretty => TracingFormat::Pretty,
            LogFormat::Compact => TracingFormat::Compact,
            LogFormat::Json => TracingFormat::Json,
        },
        filter: Some("warn,arbor=info".to_string()),
        ..Default::default()
    });

    let table = Arc::new(load_table(&cli)?);
    let world = Arc::new(World::default());
    let platform = build_platform(&cli, &table, &world)?;
    let operator = Operator {
        name: cli.operator.clone(),
        table: Arc::clone(&table),
    };

    println!("game console as '{}'; 'help' lists commands, '?<input>' completes", operator.name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if line == "help" {
            for help in platform.help_native(operator.clone()) {
                println!("  {}", help);
            }
            continue;
        }
        if let Some(partial) = line.strip_prefix('?') {
            println!("{}", platform.suggest_native(operator.clone(), partial).join("  "));
            continue;
        }

        match platform.execute_native(operator.clone(), line).await {
            Ok(output) if output.is_empty() => {}
            Ok(output) => println!("{}", output),
            Err(CommandError::Resolve(err)) => {
                println!("{}", err);
                let sender = platform.mapper().map_in(operator.clone());
                for hint in platform.manager().syntax_hints(&sender, &err) {
                    println!("  usage: {}", hint);
                }
            }
            Err(err) => {
                tracing::debug!(exit_code = err.exit_code(), "command failed");
                println!("{}", err);
            }
        }
    }
    Ok(())
}
