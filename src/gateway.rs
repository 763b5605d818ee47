//! Console gateway: newline-delimited JSON frames on stdin/stdout.
//!
//! Every inbound line is one frame tagged by `t`. Each frame is handed to the
//! bot, which spawns its own task. Messages are routed on a task of their
//! own since resolving a guild prefix can wait on the database. Replies from
//! those tasks are funnelled through an mpsc channel into a single writer
//! task so output lines never interleave.

use async_trait::async_trait;
use car::model::{ChannelId, EventId, Guild, Member, Reply};
use car::{Bot, CarError, EventPayload, InboundMessage, Interaction, Outbox, Responder};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the outbound frame queue.
const OUTBOUND_QUEUE: usize = 256;

/// Finished task handles are pruned once this many are pending.
const PRUNE_THRESHOLD: usize = 64;

/// One inbound line.
#[derive(Debug, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum InFrame {
    Message(InboundMessage),
    Interaction(Interaction),
    Event {
        name: String,
        #[serde(default)]
        payload: Value,
    },
}

#[derive(Debug, Deserialize)]
struct MemberEvent {
    guild: Arc<Guild>,
    member: Member,
}

impl InFrame {
    /// Typed payload for the events the bot knows, `Raw` for the rest.
    fn event_payload(name: &str, payload: Value) -> EventPayload {
        let member = |payload: &Value| MemberEvent::deserialize(payload).ok();
        match name {
            "member_join" => match member(&payload) {
                Some(MemberEvent { guild, member }) => EventPayload::MemberJoin { guild, member },
                None => EventPayload::Raw(payload),
            },
            "member_leave" => match member(&payload) {
                Some(MemberEvent { guild, member }) => EventPayload::MemberLeave { guild, member },
                None => EventPayload::Raw(payload),
            },
            _ => EventPayload::Raw(payload),
        }
    }
}

/// How a reply answers its invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Via {
    Send,
    Respond,
    Edit,
}

/// One outbound line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum OutFrame {
    Reply {
        event: EventId,
        channel: ChannelId,
        via: Via,
        #[serde(flatten)]
        reply: Reply,
    },
    Defer {
        event: EventId,
        channel: ChannelId,
    },
    DeleteResponse {
        event: EventId,
    },
    /// Message posted by a listener, not tied to an invocation.
    Post {
        channel: ChannelId,
        #[serde(flatten)]
        reply: Reply,
    },
}

fn closed() -> CarError {
    CarError::Platform("console writer has shut down".into())
}

/// Responder for a single inbound message or interaction.
pub struct ConsoleResponder {
    event: EventId,
    channel: ChannelId,
    out: mpsc::Sender<OutFrame>,
    started: AtomicBool,
}

impl ConsoleResponder {
    pub fn new(event: EventId, channel: ChannelId, out: mpsc::Sender<OutFrame>) -> Arc<Self> {
        Arc::new(Self {
            event,
            channel,
            out,
            started: AtomicBool::new(false),
        })
    }

    async fn emit(&self, frame: OutFrame) -> Result<(), CarError> {
        self.out.send(frame).await.map_err(|_| closed())
    }

    async fn reply(&self, via: Via, reply: Reply) -> Result<(), CarError> {
        self.emit(OutFrame::Reply {
            event: self.event,
            channel: self.channel,
            via,
            reply,
        })
        .await
    }
}

#[async_trait]
impl Responder for ConsoleResponder {
    async fn send(&self, reply: Reply) -> Result<(), CarError> {
        self.reply(Via::Send, reply).await
    }

    async fn respond(&self, reply: Reply) -> Result<(), CarError> {
        self.started.store(true, Ordering::Release);
        self.reply(Via::Respond, reply).await
    }

    async fn defer(&self) -> Result<(), CarError> {
        self.started.store(true, Ordering::Release);
        self.emit(OutFrame::Defer {
            event: self.event,
            channel: self.channel,
        })
        .await
    }

    async fn edit_response(&self, reply: Reply) -> Result<(), CarError> {
        self.reply(Via::Edit, reply).await
    }

    async fn delete_response(&self) -> Result<(), CarError> {
        self.emit(OutFrame::DeleteResponse { event: self.event }).await
    }

    fn response_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

/// Outbox shared by every listener task.
#[derive(Clone)]
pub struct ConsoleOutbox {
    out: mpsc::Sender<OutFrame>,
}

impl ConsoleOutbox {
    pub fn new(out: mpsc::Sender<OutFrame>) -> Self {
        Self { out }
    }
}

#[async_trait]
impl Outbox for ConsoleOutbox {
    async fn send_to(&self, channel: ChannelId, reply: Reply) -> Result<(), CarError> {
        self.out
            .send(OutFrame::Post { channel, reply })
            .await
            .map_err(|_| closed())
    }
}

/// Spawn the single writer task. It exits, handing the writer back, once
/// every sender has been dropped.
pub fn spawn_writer<W>(mut writer: W) -> (mpsc::Sender<OutFrame>, JoinHandle<io::Result<W>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<OutFrame>(OUTBOUND_QUEUE);
    let handle = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let mut line = match serde_json::to_string(&frame) {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "Failed to encode outbound frame");
                    continue;
                }
            };
            line.push('\n');
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(writer)
    });
    (tx, handle)
}

/// Totals reported when the input stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub frames: usize,
    pub invalid: usize,
    pub tasks: usize,
}

/// Drop finished handles, returning how many were removed.
fn prune<T>(handles: &mut Vec<JoinHandle<T>>) -> usize {
    let before = handles.len();
    handles.retain(|h| !h.is_finished());
    before - handles.len()
}

/// Read frames until EOF, then wait for every spawned task to finish.
pub async fn run<R>(bot: &Bot, reader: R, out: mpsc::Sender<OutFrame>) -> io::Result<GatewayStats>
where
    R: AsyncBufRead + Unpin,
{
    let outbox: Arc<dyn Outbox> = Arc::new(ConsoleOutbox::new(out.clone()));
    let mut lines = reader.lines();
    let mut invocations: Vec<JoinHandle<car::Outcome>> = Vec::new();
    let mut routed: Vec<JoinHandle<()>> = Vec::new();
    let mut listeners: Vec<JoinHandle<()>> = Vec::new();
    let mut stats = GatewayStats::default();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let frame = match serde_json::from_str::<InFrame>(line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed frame");
                stats.invalid += 1;
                continue;
            }
        };
        stats.frames += 1;

        match frame {
            InFrame::Message(msg) => {
                let responder = ConsoleResponder::new(msg.id, msg.channel.id, out.clone());
                listeners.extend(bot.dispatch_event(
                    "message",
                    EventPayload::Message(msg.clone()),
                    outbox.clone(),
                ));
                // Prefix resolution may hit the database; keep it off the read loop.
                let bot = bot.clone();
                routed.push(tokio::spawn(async move {
                    if let Some(handle) = bot.process_message(msg, responder).await
                        && let Err(e) = handle.await
                    {
                        error!(error = %e, "Invocation task panicked");
                    }
                }));
            }
            InFrame::Interaction(interaction) => {
                let responder =
                    ConsoleResponder::new(interaction.id, interaction.channel.id, out.clone());
                match bot.process_interaction(interaction, responder) {
                    Some(handle) => invocations.push(handle),
                    None => debug!("Ignoring non chat-input interaction"),
                }
            }
            InFrame::Event { name, payload } => {
                let payload = InFrame::event_payload(&name, payload);
                listeners.extend(bot.dispatch_event(&name, payload, outbox.clone()));
            }
        }

        if invocations.len() + routed.len() + listeners.len() >= PRUNE_THRESHOLD {
            stats.tasks += prune(&mut invocations) + prune(&mut routed) + prune(&mut listeners);
        }
    }

    stats.tasks += invocations.len() + routed.len() + listeners.len();

    for result in join_all(invocations).await {
        if let Err(e) = result {
            error!(error = %e, "Invocation task panicked");
        }
    }
    for result in join_all(routed).await {
        if let Err(e) = result {
            error!(error = %e, "Message routing task panicked");
        }
    }
    for result in join_all(listeners).await {
        if let Err(e) = result {
            error!(error = %e, "Listener task panicked");
        }
    }

    info!(frames = stats.frames, invalid = stats.invalid, tasks = stats.tasks, "Input closed");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use car::{Args, CarError, Cog, CogClass, CommandBuilder, CommandResult, Context, Declaration, Event, Listener};
    use serde_json::json;

    struct Echoes;

    async fn ping(ctx: Arc<Context>, _args: Args) -> CommandResult {
        ctx.respond("Pong!").await
    }

    async fn slow(ctx: Arc<Context>, _args: Args) -> CommandResult {
        ctx.defer().await?;
        ctx.edit_response("finally").await
    }

    async fn welcome(event: Arc<Event>) -> CommandResult {
        if let EventPayload::MemberJoin { member, .. } = &event.payload {
            event
                .outbox
                .send_to(ChannelId(9), Reply::text(format!("hi {}", member.display_name())))
                .await?;
        }
        Ok(())
    }

    impl Cog for Echoes {
        fn commands(self: Arc<Self>) -> Result<Vec<Declaration>, CarError> {
            Ok(vec![
                CommandBuilder::new("ping").handler(ping).build_mixed()?,
                CommandBuilder::new("slow").handler(slow).build_structured()?,
            ])
        }

        fn listeners(self: Arc<Self>) -> Vec<Listener> {
            vec![Listener::new("member_join", welcome)]
        }
    }

    fn bot() -> Bot {
        let bot = Bot::with_defaults();
        bot.add_cog_class(CogClass::new("Echoes", |_| Echoes)).unwrap();
        bot.load("Echoes").unwrap();
        bot
    }

    async fn drive(input: &str) -> (GatewayStats, Vec<Value>) {
        let bot = bot();
        let (tx, writer) = spawn_writer(Vec::new());
        let stats = run(&bot, input.as_bytes(), tx).await.unwrap();
        let output = writer.await.unwrap().unwrap();
        let frames = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (stats, frames)
    }

    #[tokio::test]
    async fn test_message_frame_round_trip() {
        let input = concat!(
            r#"{"t":"message","id":7,"content":".ping","author":{"id":100,"name":"tester"},"channel":{"id":1,"kind":"dm"}}"#,
            "\n\n",
            r#"{"t":"message","id":8,"content":"just chatting","author":{"id":100,"name":"tester"},"channel":{"id":1,"kind":"dm"}}"#,
            "\n",
        );
        let (stats, frames) = drive(input).await;
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.invalid, 0);
        assert_eq!(
            frames,
            vec![json!({"t": "reply", "event": 7, "channel": 1, "via": "respond", "content": "Pong!"})]
        );
    }

    #[tokio::test]
    async fn test_interaction_defer_then_edit() {
        let input = r#"{"t":"interaction","id":3,"user":{"id":100,"name":"tester"},"channel":{"id":4,"kind":"text"},"data":{"type":1,"name":"slow"}}"#;
        let (_, frames) = drive(input).await;
        assert_eq!(
            frames,
            vec![
                json!({"t": "defer", "event": 3, "channel": 4}),
                json!({"t": "reply", "event": 3, "channel": 4, "via": "edit", "content": "finally"}),
            ]
        );
    }

    #[tokio::test]
    async fn test_member_event_reaches_listener() {
        let input = r#"{"t":"event","name":"member_join","payload":{"guild":{"id":500},"member":{"user":{"id":101,"name":"bobby"},"nick":"Bob"}}}"#;
        let (stats, frames) = drive(input).await;
        assert_eq!(stats.tasks, 1);
        assert_eq!(frames, vec![json!({"t": "post", "channel": 9, "content": "hi Bob"})]);
    }

    /// Guild prefixes resolve only once the gate opens; DMs resolve at once.
    struct GatedPrefix(Arc<tokio::sync::Notify>);

    #[async_trait]
    impl car::PrefixSource for GatedPrefix {
        async fn prefix(&self, guild: Option<car::model::GuildId>) -> String {
            if guild.is_some() {
                self.0.notified().await;
            }
            ".".to_string()
        }
    }

    #[tokio::test]
    async fn test_slow_prefix_lookup_does_not_block_later_frames() {
        use std::time::Duration;
        use tokio::time::timeout;

        let gate = Arc::new(tokio::sync::Notify::new());
        let bot = Bot::new(
            Arc::new(car::MemoryClearanceStore::new()),
            Arc::new(GatedPrefix(gate.clone())),
        );
        bot.add_cog_class(CogClass::new("Echoes", |_| Echoes)).unwrap();
        bot.load("Echoes").unwrap();

        let (mut client, server) = tokio::io::duplex(4096);
        let (tx, mut rx) = mpsc::channel(16);
        let gateway = tokio::spawn(async move {
            run(&bot, tokio::io::BufReader::new(server), tx).await
        });

        let input = concat!(
            r#"{"t":"message","id":7,"content":".ping","author":{"id":100,"name":"tester"},"channel":{"id":2,"kind":"text"},"guild":{"id":500}}"#,
            "\n",
            r#"{"t":"message","id":8,"content":".ping","author":{"id":100,"name":"tester"},"channel":{"id":1,"kind":"dm"}}"#,
            "\n",
        );
        client.write_all(input.as_bytes()).await.unwrap();

        let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert!(matches!(first, OutFrame::Reply { event: EventId(8), .. }), "{first:?}");

        gate.notify_one();
        let second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert!(matches!(second, OutFrame::Reply { event: EventId(7), .. }), "{second:?}");

        drop(client);
        let stats = gateway.await.unwrap().unwrap();
        assert_eq!(stats.frames, 2);
    }

    #[tokio::test]
    async fn test_malformed_frames_are_counted() {
        let input = "not json\n{\"t\":\"teleport\"}\n";
        let (stats, frames) = drive(input).await;
        assert_eq!(stats.frames, 0);
        assert_eq!(stats.invalid, 2);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_unknown_event_payload_stays_raw() {
        let payload = InFrame::event_payload("member_join", json!({"guild": 1}));
        assert!(matches!(payload, EventPayload::Raw(_)));
        let payload = InFrame::event_payload("reaction_add", json!({"emoji": "x"}));
        assert!(matches!(payload, EventPayload::Raw(v) if v["emoji"] == "x"));
    }
}
