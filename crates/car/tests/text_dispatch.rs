//! Integration tests for prefix text commands: routing, arguments, checks and
//! error rendering.

mod common;

use car::model::Permissions;
use car::{
    ArgType, Argument, Args, Bot, CarError, Cog, CogClass, CommandBuilder, CommandResult, Context,
    Declaration, GuildOnly, Outcome, RequiresPermissions, Stage,
};
use common::{RecordingResponder, Via, dm_message, guild_message};
use std::sync::Arc;

struct Basics;

async fn ping(ctx: Arc<Context>, _args: Args) -> CommandResult {
    ctx.respond("Pong!").await
}

async fn add(ctx: Arc<Context>, args: Args) -> CommandResult {
    let sum = args.int("a")? + args.int("b")?;
    ctx.respond(sum.to_string()).await
}

async fn echo(ctx: Arc<Context>, args: Args) -> CommandResult {
    let times = args.int("times")?;
    let text = args.str("text")?;
    ctx.respond(vec![text; times as usize].join(" ")).await
}

async fn fail(_ctx: Arc<Context>, _args: Args) -> CommandResult {
    Err(CarError::command("No attachment found!"))
}

async fn boom(_ctx: Arc<Context>, _args: Args) -> CommandResult {
    Err(CarError::Internal(anyhow::anyhow!("database connection reset")))
}

async fn ok(ctx: Arc<Context>, _args: Args) -> CommandResult {
    ctx.respond("ok").await
}

impl Cog for Basics {
    fn commands(self: Arc<Self>) -> Result<Vec<Declaration>, CarError> {
        Ok(vec![
            CommandBuilder::new("ping").handler(ping).alias("p").build_mixed()?,
            CommandBuilder::new("add")
                .handler(add)
                .arg(Argument::new("a", ArgType::Int))
                .arg(Argument::new("b", ArgType::Int))
                .build_text()?,
            CommandBuilder::new("echo")
                .handler(echo)
                .arg(Argument::new("times", ArgType::Int).default(1))
                .arg(Argument::new("text", ArgType::Str))
                .slurp_last_argument()
                .build_text()?,
            CommandBuilder::new("fail").handler(fail).build_text()?,
            CommandBuilder::new("boom").handler(boom).build_text()?,
            CommandBuilder::new("server").handler(ok).check(GuildOnly).build_text()?,
            CommandBuilder::new("moderate")
                .handler(ok)
                .check(RequiresPermissions::all(["manage_guild"]))
                .build_text()?,
        ])
    }
}

fn bot() -> Bot {
    let bot = Bot::with_defaults();
    bot.add_cog_class(CogClass::new("Basics", |_| Basics)).unwrap();
    bot.load("Basics").unwrap();
    bot
}

async fn run(bot: &Bot, content: &str) -> (Option<Outcome>, Arc<RecordingResponder>) {
    let responder = RecordingResponder::new();
    let handle = bot.process_message(dm_message(content), responder.clone()).await;
    let outcome = match handle {
        Some(handle) => Some(handle.await.unwrap()),
        None => None,
    };
    (outcome, responder)
}

#[tokio::test]
async fn test_ping_and_alias() {
    let bot = bot();

    let (outcome, responder) = run(&bot, ".ping").await;
    assert_eq!(outcome, Some(Outcome::Completed));
    assert_eq!(responder.texts(), vec!["Pong!"]);
    assert_eq!(responder.replies()[0].0, Via::Respond);

    let (outcome, responder) = run(&bot, ".p").await;
    assert_eq!(outcome, Some(Outcome::Completed));
    assert_eq!(responder.texts(), vec!["Pong!"]);
}

#[tokio::test]
async fn test_non_invocations_are_ignored() {
    let bot = bot();

    assert_eq!(run(&bot, "ping").await.0, None);
    assert_eq!(run(&bot, ".").await.0, None);
    assert_eq!(run(&bot, ".unknown stuff").await.0, None);

    let mut from_bot = dm_message(".ping");
    from_bot.author.bot = true;
    let responder = RecordingResponder::new();
    assert!(bot.process_message(from_bot, responder.clone()).await.is_none());
    assert!(responder.replies().is_empty());
}

#[tokio::test]
async fn test_positional_arguments() {
    let bot = bot();
    let (outcome, responder) = run(&bot, ".add 2 40").await;
    assert_eq!(outcome, Some(Outcome::Completed));
    assert_eq!(responder.texts(), vec!["42"]);
}

#[tokio::test]
async fn test_missing_argument_renders_outline() {
    let bot = bot();
    let (outcome, responder) = run(&bot, ".add 2").await;
    assert_eq!(
        outcome,
        Some(Outcome::Failed {
            stage: Stage::Parsed,
            code: "bad_argument"
        })
    );

    let text = &responder.texts()[0];
    assert!(text.starts_with(":x: ``.add 2 ``**__`[b]`__**"), "{text}");
    assert!(text.contains("I am missing this argument!"));
    assert!(text.contains("Correct usage:\n``.add [a] [b]``"));
}

#[tokio::test]
async fn test_bad_conversion_is_highlighted() {
    let bot = bot();
    let (_, responder) = run(&bot, ".add two 2").await;
    let text = &responder.texts()[0];
    assert!(text.starts_with(":x: ``.add ``**__`two`__**`` [b]``"), "{text}");
    assert!(text.contains("This argument must be an integer!"));
}

#[tokio::test]
async fn test_kwargs_and_slurp() {
    let bot = bot();

    let (_, responder) = run(&bot, r#".echo 1 hello   "big" world"#).await;
    assert_eq!(responder.texts(), vec![r#"hello   "big" world"#]);

    let (_, responder) = run(&bot, ".echo -times 2 hi").await;
    assert_eq!(responder.texts(), vec!["hi hi"]);

    let (_, responder) = run(&bot, ".echo 3 yo").await;
    assert_eq!(responder.texts(), vec!["yo yo yo"]);
}

#[tokio::test]
async fn test_slurp_keeps_spacing_around_flags() {
    let bot = bot();
    let (_, responder) = run(&bot, ".echo a    b -times 2  c").await;
    assert_eq!(responder.texts(), vec!["a    b c a    b c"]);
}

#[tokio::test]
async fn test_missing_flag_value() {
    let bot = bot();
    let (outcome, responder) = run(&bot, ".echo hi -times").await;
    assert!(matches!(
        outcome,
        Some(Outcome::Failed {
            stage: Stage::Parsed,
            ..
        })
    ));
    assert!(responder.texts()[0].contains("Missing value for flag `-times`!"));
}

#[tokio::test]
async fn test_command_and_unknown_errors() {
    let bot = bot();

    let (outcome, responder) = run(&bot, ".fail").await;
    assert_eq!(
        outcome,
        Some(Outcome::Failed {
            stage: Stage::Executing,
            code: "command_error"
        })
    );
    assert_eq!(responder.texts(), vec![":x: No attachment found!"]);

    let (_, responder) = run(&bot, ".boom").await;
    assert_eq!(responder.texts(), vec![":x: Something went wrong!"]);
}

#[tokio::test]
async fn test_checks_short_circuit() {
    let bot = bot();

    let (outcome, responder) = run(&bot, ".server").await;
    assert_eq!(
        outcome,
        Some(Outcome::Failed {
            stage: Stage::Checked,
            code: "check_failed"
        })
    );
    assert_eq!(
        responder.texts(),
        vec![":x: This command is only available in servers!"]
    );

    // Permission checks outside a guild are a declaration mistake.
    let (_, responder) = run(&bot, ".moderate").await;
    assert_eq!(responder.texts(), vec![":x: Something went wrong!"]);
}

#[tokio::test]
async fn test_permissions_in_guild() {
    let bot = bot();

    let responder = RecordingResponder::new();
    let outcome = bot
        .process_message(guild_message(".moderate", Permissions::default()), responder.clone())
        .await
        .unwrap()
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Failed { stage: Stage::Checked, .. }));
    assert!(responder.texts()[0].contains("`manage_guild`"));

    let responder = RecordingResponder::new();
    let outcome = bot
        .process_message(
            guild_message(".moderate", Permissions::new(["manage_guild"])),
            responder.clone(),
        )
        .await
        .unwrap()
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(responder.texts(), vec!["ok"]);
}

#[tokio::test]
async fn test_usage_counters() {
    let bot = bot();
    run(&bot, ".ping").await;
    run(&bot, ".p").await;
    run(&bot, ".add 1 1").await;

    let stats = bot.registry().read().command_stats();
    assert_eq!(stats[0], ("ping".to_string(), 2));
    assert_eq!(stats[1], ("add".to_string(), 1));
}
