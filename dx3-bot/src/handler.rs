//! Discord event handler.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use dx3_core::types::ServerId;
use serenity::all::{
    ChannelId, Command as SlashCommand, CommandDataOptionValue, CommandInteraction, Context,
    CreateEmbed, CreateEmbedFooter, CreateMessage, EditInteractionResponse, Embed, EventHandler,
    GuildId, Interaction, Message, Ready,
};
use tracing::{debug, info, warn};

use crate::dice;
use crate::dispatch::{Dispatcher, Invocation};
use crate::error::BotError;
use crate::format::{Card, Reply};
use crate::slash;

/// Routes gateway events to the [`Dispatcher`].
pub struct Handler {
    dispatcher: Arc<Dispatcher>,
    register_slash: bool,
}

impl Handler {
    /// Create a handler.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, register_slash: bool) -> Self {
        Self {
            dispatcher,
            register_slash,
        }
    }

    async fn on_dice_bot(&self, ctx: &Context, msg: &Message, server: ServerId) {
        let text = message_text(&msg.content, &msg.embeds);
        let Some(value) = dice::parse_d10_result(&text) else {
            return;
        };
        debug!(server = %server, author = %msg.author.name, value, "Dice-bot result seen");
        if let Some(reply) = self.dispatcher.on_dice_result(server, value).await {
            send(ctx, msg.channel_id, reply).await;
        }
    }

    async fn on_slash(&self, ctx: &Context, command: &CommandInteraction) {
        let options: Vec<(String, String)> = command
            .data
            .options
            .iter()
            .filter_map(|o| match &o.value {
                CommandDataOptionValue::String(s) => Some((o.name.clone(), s.clone())),
                _ => None,
            })
            .collect();
        let Some(parsed) = slash::to_command(&command.data.name, &options) else {
            return;
        };

        if let Err(e) = command.defer(&ctx.http).await {
            warn!(command = %command.data.name, error = %e, "Could not defer interaction");
            return;
        }
        let inv = Invocation::new(
            server_of(command.guild_id, command.channel_id).0,
            command.user.id.get(),
        );
        let reply = match parsed {
            Ok(cmd) => self.dispatcher.execute(inv, cmd).await,
            Err(e) => Reply::text(BotError::from(e).user_message()),
        };

        let mut edit = EditInteractionResponse::new();
        if !reply.content.is_empty() {
            edit = edit.content(reply.content);
        }
        if let Some(card) = reply.card {
            edit = edit.embed(embed(card));
        }
        if let Err(e) = command.edit_response(&ctx.http, edit).await {
            warn!(command = %command.data.name, error = %e, "Could not send interaction response");
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "Connected to Discord");
        if !self.register_slash {
            return;
        }
        match SlashCommand::set_global_commands(&ctx.http, slash::definitions()).await {
            Ok(commands) => info!(count = commands.len(), "Slash commands registered"),
            Err(e) => warn!(error = %e, "Slash command registration failed"),
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let server = server_of(msg.guild_id, msg.channel_id);
        if msg.author.bot {
            let me = ctx.cache.current_user().id;
            if msg.author.id != me {
                self.on_dice_bot(&ctx, &msg, server).await;
            }
            return;
        }

        let inv = Invocation::new(server.0, msg.author.id.get());
        if let Some(reply) = self.dispatcher.handle_message(inv, &msg.content).await {
            send(&ctx, msg.channel_id, reply).await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            self.on_slash(&ctx, &command).await;
        }
    }
}

/// Guild id, or the channel id for direct messages.
fn server_of(guild: Option<GuildId>, channel: ChannelId) -> ServerId {
    ServerId(guild.map_or_else(|| channel.get(), GuildId::get))
}

/// Message text plus embed titles, descriptions and fields; dice bots
/// often put the result in an embed.
fn message_text(content: &str, embeds: &[Embed]) -> String {
    let mut text = content.to_string();
    for e in embeds {
        for part in [&e.title, &e.description].into_iter().flatten() {
            let _ = write!(text, "\n{part}");
        }
        for field in &e.fields {
            let _ = write!(text, "\n{} {}", field.name, field.value);
        }
    }
    text
}

fn embed(card: Card) -> CreateEmbed {
    let card = card.fit();
    let mut embed = CreateEmbed::new().title(card.title).colour(card.color);
    if !card.description.is_empty() {
        embed = embed.description(card.description);
    }
    embed = embed.fields(card.fields);
    if let Some(footer) = card.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    embed
}

async fn send(ctx: &Context, channel: ChannelId, reply: Reply) {
    let mut message = CreateMessage::new();
    if !reply.content.is_empty() {
        message = message.content(reply.content);
    }
    if let Some(card) = reply.card {
        message = message.embed(embed(card));
    }
    if let Err(e) = channel.send_message(&ctx.http, message).await {
        warn!(channel = %channel, error = %e, "Failed to send reply");
    }
}
