//! Per-invocation pipeline: checks, argument resolution, execution and
//! error rendering.
//!
//! Every invocation walks `received -> checked -> parsed -> executing ->
//! done`. Errors are caught once, here, and turned into a reply or a log
//! entry depending on their kind.

use crate::command::{Command, StructuredCommand, TextCommand};
use crate::context::Context;
use crate::error::CarError;
use crate::event::{InteractionData, InteractionOption};
use crate::enums::OptionType;
use crate::model::{Embed, Reply};
use crate::telemetry::{CommandTimer, spans};
use crate::tokenizer::{Tokenizer, filter_kwargs};
use crate::value::{ArgValue, Args};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Instrument, debug, error, warn};

/// Pipeline stage an invocation reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Checked,
    Parsed,
    Executing,
    Done,
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Failed while entering `stage`; the error was rendered or logged.
    Failed { stage: Stage, code: &'static str },
    /// Stale or unknown structured invocation; nothing was sent.
    Dropped,
}

enum Resolved {
    Ready,
    Stale,
}

/// Walk subcommand frames and return the command path and the leaf options.
pub fn resolve_path(data: &InteractionData) -> (String, Vec<InteractionOption>) {
    let mut path = vec![data.name.clone()];
    let mut options = data.options.clone();

    while let Some(first) = options.first()
        && OptionType::is_command_frame(first.kind)
    {
        path.push(first.name.clone());
        options = first.options.clone().unwrap_or_default();
    }

    (path.join(" "), options)
}

/// Run a text command against the input that followed its name.
pub async fn run_text(cmd: Arc<TextCommand>, ctx: Arc<Context>, input: String) -> Outcome {
    let span = invocation_span(cmd.name(), &ctx);
    async move {
        let _timer = CommandTimer::new(cmd.name(), "text");
        let command = Command::Text(cmd.clone());

        if let Err(err) = command.run_checks(&ctx).await {
            return fail(&command, &ctx, &Args::new(), Stage::Checked, err).await;
        }

        let mut args = Args::new();
        if let Err(err) = resolve_text_args(&cmd, &ctx, &input, &mut args).await {
            return fail(&command, &ctx, &args, Stage::Parsed, err).await;
        }

        execute(&command, ctx, args).await
    }
    .instrument(span)
    .await
}

/// Run a structured command against the leaf options of its payload.
pub async fn run_structured(
    cmd: Arc<StructuredCommand>,
    ctx: Arc<Context>,
    options: Vec<InteractionOption>,
) -> Outcome {
    let span = invocation_span(cmd.name(), &ctx);
    async move {
        let _timer = CommandTimer::new(cmd.name(), "structured");
        let command = Command::Structured(cmd.clone());

        if let Err(err) = command.run_checks(&ctx).await {
            return fail(&command, &ctx, &Args::new(), Stage::Checked, err).await;
        }

        let mut args = Args::new();
        match resolve_structured_args(&cmd, &ctx, &options, &mut args).await {
            Ok(Resolved::Ready) => {}
            Ok(Resolved::Stale) => return Outcome::Dropped,
            Err(err) => return fail(&command, &ctx, &args, Stage::Parsed, err).await,
        }

        execute(&command, ctx, args).await
    }
    .instrument(span)
    .await
}

fn invocation_span(name: &str, ctx: &Context) -> tracing::Span {
    spans::invocation(
        name,
        ctx.surface.as_str(),
        ctx.author.id.0,
        ctx.guild.as_ref().map(|g| g.id.0),
    )
}

async fn execute(command: &Command, ctx: Arc<Context>, args: Args) -> Outcome {
    debug!(args = args.len(), "executing");
    match command.run(ctx.clone(), args.clone()).await {
        Ok(()) => Outcome::Completed,
        Err(err) => fail(command, &ctx, &args, Stage::Executing, err).await,
    }
}

/// Resolve text arguments in declaration order.
///
/// Bound values are kept in `args` as they are resolved so a failure can
/// render them in the outline.
pub async fn resolve_text_args(
    cmd: &TextCommand,
    ctx: &Context,
    input: &str,
    args: &mut Args,
) -> Result<(), CarError> {
    let (positional, kwargs) = filter_kwargs(input)?;
    let mut tok = Tokenizer::new(&positional);
    let last = cmd.core.arguments().len().saturating_sub(1);
    let mut defaults = Vec::new();

    for (i, arg) in cmd.core.arguments().values().enumerate() {
        let raw = if let Some(value) = kwargs.get(arg.name()) {
            value.clone()
        } else if tok.is_eof() {
            if arg.is_required() {
                return Err(CarError::missing_argument(arg.name()));
            }
            defaults.push((arg.name().to_string(), arg.default_value()));
            continue;
        } else if cmd.slurp_last_argument && i == last {
            tok.remaining()
        } else {
            tok.next_token()
        };

        args.insert(arg.name(), ArgValue::Str(raw.clone()));
        let value = arg
            .converter_ref()
            .convert(ctx, ArgValue::Str(raw))
            .await
            .map_err(|err| err.highlighted(arg.name()))?;
        args.insert(arg.name(), value);
    }

    for (name, value) in defaults {
        args.insert(name, value);
    }
    Ok(())
}

async fn resolve_structured_args(
    cmd: &StructuredCommand,
    ctx: &Context,
    options: &[InteractionOption],
    args: &mut Args,
) -> Result<Resolved, CarError> {
    let given: HashMap<&str, &InteractionOption> =
        options.iter().map(|o| (o.name.as_str(), o)).collect();

    for arg in cmd.core.arguments().values() {
        let Some(raw) = given
            .get(arg.name())
            .and_then(|o| o.value.as_ref())
            .map(ArgValue::from_json)
        else {
            if arg.is_required() {
                return Err(CarError::missing_argument(arg.name()));
            }
            args.insert(arg.name(), arg.default_value());
            continue;
        };

        // The platform already enforced the registered choices and bounds.
        if arg.kind().matches(&raw) {
            args.insert(arg.name(), raw);
            continue;
        }

        match arg.converter_ref().convert_structured(ctx, raw).await {
            Ok(value) => args.insert(arg.name(), value),
            Err(err) => {
                warn!(
                    command = %cmd.name(),
                    argument = %arg.name(),
                    error = %err,
                    "structured payload does not match the registered schema; dropping"
                );
                return Ok(Resolved::Stale);
            }
        }
    }

    Ok(Resolved::Ready)
}

/// Render an error for the invoking user.
pub fn render_error(command: &Command, ctx: &Context, args: &Args, err: &CarError) -> Reply {
    let description = match err {
        CarError::Check(message) | CarError::Command(message) => format!(":x: {message}"),
        CarError::Argument { message, highlight } => format!(
            ":x: {}\n\n{message}\n\nCorrect usage:\n{}",
            command.outline(args, &ctx.prefix, highlight.as_deref()),
            command.usage(&ctx.prefix)
        ),
        _ => ":x: Something went wrong!".to_string(),
    };
    Reply::embed(Embed::described(description))
}

async fn fail(
    command: &Command,
    ctx: &Context,
    args: &Args,
    stage: Stage,
    err: CarError,
) -> Outcome {
    if err.is_user_facing() {
        debug!(stage = ?stage, code = err.error_code(), error = %err, "invocation rejected");
    } else {
        error!(
            command = %command.name(),
            stage = ?stage,
            code = err.error_code(),
            error = ?err,
            "unhandled error in command"
        );
    }

    let reply = render_error(command, ctx, args, &err);
    let delivered = if ctx.should_respond() {
        ctx.respond(reply).await
    } else {
        ctx.send(reply).await
    };
    if let Err(send_err) = delivered {
        error!(command = %command.name(), error = %send_err, "failed to deliver error reply");
    }

    Outcome::Failed {
        stage,
        code: err.error_code(),
    }
}
