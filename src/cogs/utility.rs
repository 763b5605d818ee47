//! Utility cog: dice, timers, links and a few small games.

use super::command;
use car::converter::{FromChoices, InRange, ToUrl};
use car::model::Embed;
use car::{
    ArgType, Argument, Args, CarError, Cog, CommandBuilder, CommandResult, Context, Declaration,
    GuildOnly, Surface,
};
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;

/// Sites `link` accepts.
const LINK_SITES: &[&str] = &["youtube.com", "youtu.be", "soundcloud.com", "bandcamp.com"];

const HANDS: &[&str] = &["rock", "paper", "scissors"];

/// Longest timer, in seconds.
const MAX_TIMER: i64 = 3600;

pub struct Utility;

/// Result of a rock-paper-scissors round from the player's side.
fn judge(player: &str, bot: &str) -> &'static str {
    match (player, bot) {
        (p, b) if p == b => "It's a tie!",
        ("rock", "scissors") | ("paper", "rock") | ("scissors", "paper") => "You win!",
        _ => "I win!",
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 { a.abs() } else { gcd(b, a % b) }
}

impl Utility {
    async fn roll(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let sides = args.int("sides")?;
        let n = rand::thread_rng().gen_range(1..=sides);
        ctx.respond(format!(":game_die: You rolled **{n}** (d{sides})"))
            .await
    }

    async fn echo(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        ctx.respond(args.str("text")?).await
    }

    async fn timer(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let seconds = args.float("duration")?;
        ctx.defer().await?;
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;

        let done = format!("{} Time's up! ({seconds}s)", ctx.author.mention());
        match ctx.surface {
            Surface::Structured => ctx.edit_response(done).await,
            Surface::Text => ctx.respond(done).await,
        }
    }

    async fn link(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        ctx.respond(format!("<{}>", args.str("url")?)).await
    }

    async fn whois(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let member = args.member("member")?;
        let embed = Embed::default()
            .titled(member.user.tag())
            .field("Display name", member.display_name())
            .field("ID", member.user.id.to_string())
            .field("Mention", member.user.mention());
        ctx.respond(embed).await
    }

    async fn choose(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let player = args.str("hand")?;
        let bot = HANDS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("rock");
        ctx.respond(format!("I choose **{bot}**. {}", judge(player, bot)))
            .await
    }

    async fn add(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let sum = args.float("a")? + args.float("b")?;
        ctx.respond(sum.to_string()).await
    }

    async fn frac(self: Arc<Self>, ctx: Arc<Context>, args: Args) -> CommandResult {
        let (num, den) = (args.int("numerator")?, args.int("denominator")?);
        if den == 0 {
            return Err(CarError::command("Can't divide by zero!"));
        }
        let d = gcd(num, den) * den.signum();
        let (n, m) = (num / d, den / d);
        ctx.respond(format!("{num}/{den} = {n}/{m} = {}", n as f64 / m as f64))
            .await
    }
}

impl Cog for Utility {
    fn category(&self) -> Option<&str> {
        Some("Utility")
    }

    fn commands(self: Arc<Self>) -> Result<Vec<Declaration>, CarError> {
        Ok(vec![
            CommandBuilder::new("roll")
                .description("Rolls a die")
                .arg(
                    Argument::new("sides", ArgType::Int)
                        .description("number of sides")
                        .default(6)
                        .range(InRange::between(2, 1000)),
                )
                .handler(command(&self, Self::roll))
                .build_mixed()?,
            CommandBuilder::new("echo")
                .description("Repeats what you said")
                .arg(Argument::new("text", ArgType::Str))
                .slurp_last_argument()
                .handler(command(&self, Self::echo))
                .build_text()?,
            CommandBuilder::new("timer")
                .description("Pings you after a while")
                .max_concurrency(1)
                .arg(
                    Argument::new("duration", ArgType::Seconds)
                        .range(InRange::between(1, MAX_TIMER)),
                )
                .handler(command(&self, Self::timer))
                .build_mixed()?,
            CommandBuilder::new("link")
                .description("Shares a music link")
                .arg(
                    Argument::new("url", ArgType::Url)
                        .converter(ToUrl::allowing(LINK_SITES.iter().copied())),
                )
                .handler(command(&self, Self::link))
                .build_mixed()?,
            CommandBuilder::new("whois")
                .description("Shows who someone is")
                .check(GuildOnly)
                .arg(Argument::new("member", ArgType::Member))
                .handler(command(&self, Self::whois))
                .build_mixed()?,
            CommandBuilder::new("choose")
                .description("Plays rock paper scissors")
                .arg(
                    Argument::new("hand", ArgType::Str)
                        .choices(FromChoices::labels(HANDS.iter().copied())),
                )
                .handler(command(&self, Self::choose))
                .build_mixed()?,
            CommandBuilder::group("math", "Math commands").build_structured()?,
            CommandBuilder::new("math add")
                .description("Adds two numbers")
                .arg(Argument::new("a", ArgType::Float))
                .arg(Argument::new("b", ArgType::Float))
                .handler(command(&self, Self::add))
                .build_structured()?,
            CommandBuilder::new("math frac")
                .description("Reduces a fraction")
                .arg(Argument::new("numerator", ArgType::Int))
                .arg(Argument::new("denominator", ArgType::Int))
                .handler(command(&self, Self::frac))
                .build_structured()?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cogs::testing::{Recorder, dm, in_guild, interaction, option, subcommand};
    use car::{Bot, CogClass, InboundMessage};
    use serde_json::json;

    fn bot() -> Bot {
        let bot = Bot::with_defaults();
        bot.add_cog_class(CogClass::new("Utility", |_| Utility)).unwrap();
        bot.load("Utility").unwrap();
        bot
    }

    async fn run(bot: &Bot, msg: InboundMessage) -> Vec<String> {
        let recorder = Recorder::new();
        bot.process_message(msg, recorder.clone())
            .await
            .unwrap()
            .await
            .unwrap();
        recorder.texts()
    }

    #[tokio::test]
    async fn test_roll_stays_in_range() {
        let bot = bot();
        for _ in 0..20 {
            let text = run(&bot, dm(".roll 2")).await.remove(0);
            assert!(
                text == ":game_die: You rolled **1** (d2)" || text == ":game_die: You rolled **2** (d2)",
                "{text}"
            );
        }
        let text = run(&bot, dm(".roll 1")).await.remove(0);
        assert!(text.contains("This number must be ≥ 2!"), "{text}");
    }

    #[tokio::test]
    async fn test_echo_keeps_spacing() {
        let bot = bot();
        assert_eq!(run(&bot, dm(".echo hello   there")).await, vec!["hello   there"]);
    }

    #[tokio::test]
    async fn test_timer() {
        let bot = bot();
        assert_eq!(
            run(&bot, dm(".timer 0:01")).await,
            vec!["<@100> Time's up! (1s)"]
        );
        let text = run(&bot, dm(".timer 2:00:00")).await.remove(0);
        assert!(text.contains("This number must be ≤ 3600!"), "{text}");
    }

    #[tokio::test]
    async fn test_link_allow_list() {
        let bot = bot();
        assert_eq!(
            run(&bot, dm(".link youtube.com/watch?v=dQw4w9WgXcQ")).await,
            vec!["<https://youtube.com/watch?v=dQw4w9WgXcQ>"]
        );
        let text = run(&bot, dm(".link https://example.com")).await.remove(0);
        assert!(text.contains("Disallowed site!"), "{text}");
    }

    #[tokio::test]
    async fn test_whois() {
        let bot = bot();
        let recorder = Recorder::new();
        bot.process_message(in_guild(".whois Bob", &[]), recorder.clone())
            .await
            .unwrap()
            .await
            .unwrap();
        let embed = recorder.last().embed.unwrap();
        assert_eq!(embed.title.as_deref(), Some("bobby#0001"));
        assert_eq!(embed.fields[1].value, "101");

        let text = run(&bot, dm(".whois Bob")).await.remove(0);
        assert_eq!(text, ":x: This command is only available in servers!");
    }

    #[tokio::test]
    async fn test_choose() {
        let bot = bot();
        let text = run(&bot, dm(".choose paper")).await.remove(0);
        assert!(text.starts_with("I choose **"), "{text}");
        let text = run(&bot, dm(".choose lizard")).await.remove(0);
        assert!(text.contains("This argument must be"), "{text}");
    }

    #[test]
    fn test_judge() {
        assert_eq!(judge("rock", "rock"), "It's a tie!");
        assert_eq!(judge("rock", "scissors"), "You win!");
        assert_eq!(judge("rock", "paper"), "I win!");
        assert_eq!(judge("scissors", "paper"), "You win!");
    }

    #[tokio::test]
    async fn test_math_group() {
        let bot = bot();
        let recorder = Recorder::new();
        bot.process_interaction(
            interaction(
                "math",
                vec![subcommand("add", vec![option("a", 10, json!(1.5)), option("b", 10, json!(2))])],
            ),
            recorder.clone(),
        )
        .unwrap()
        .await
        .unwrap();
        assert_eq!(recorder.texts(), vec!["3.5"]);

        let recorder = Recorder::new();
        bot.process_interaction(
            interaction(
                "math",
                vec![subcommand(
                    "frac",
                    vec![option("numerator", 4, json!(6)), option("denominator", 4, json!(-8))],
                )],
            ),
            recorder.clone(),
        )
        .unwrap()
        .await
        .unwrap();
        assert_eq!(recorder.texts(), vec!["6/-8 = -3/4 = -0.75"]);

        let recorder = Recorder::new();
        bot.process_interaction(
            interaction(
                "math",
                vec![subcommand(
                    "frac",
                    vec![option("numerator", 4, json!(1)), option("denominator", 4, json!(0))],
                )],
            ),
            recorder.clone(),
        )
        .unwrap()
        .await
        .unwrap();
        assert_eq!(recorder.texts(), vec![":x: Can't divide by zero!"]);
    }

    #[test]
    fn test_export_contains_math_group() {
        let bot = bot();
        let export = bot.export();
        let math = export.iter().find(|c| c["name"] == "math").unwrap();
        let names: Vec<_> = math["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["add", "frac"]);
        assert!(export.iter().all(|c| c["name"] != "echo"));
    }
}
