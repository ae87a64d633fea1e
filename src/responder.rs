//! Turns one inbound event into zero or more signed events.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use regex::Regex;
use tracing::{debug, info};

use crate::{
    access::AccessPolicy,
    command::{Command, CommandTable},
    compose,
    emoji::EmojiCodec,
    error::Result,
    event::Event,
    persona::PersonaTable,
    quiz::QuizEngine,
    relay::RelayClient,
    signer::Signer,
};

/// Static tables and collaborators shared by every invocation.
pub struct Context {
    pub policy: AccessPolicy,
    pub personas: PersonaTable,
    pub codec: EmojiCodec,
    pub commands: CommandTable,
    pub quiz: QuizEngine,
    pub relay: Arc<dyn RelayClient>,
}

impl Context {
    /// Built-in tables with the given relay and quiz engine.
    pub fn new(quiz: QuizEngine, relay: Arc<dyn RelayClient>) -> Self {
        Self {
            policy: AccessPolicy::default(),
            personas: PersonaTable::default(),
            codec: EmojiCodec::default(),
            commands: CommandTable::default(),
            quiz,
            relay,
        }
    }
}

#[derive(Clone)]
pub struct Responder {
    ctx: Arc<Context>,
    persona_marker: Regex,
}

impl Responder {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            persona_marker: Regex::new(r"^\\s\[\d+\]").expect("static pattern"),
        }
    }

    /// Answer `event` as `signer`, or post a new quiz when there is no event.
    ///
    /// `Ok(None)` means nothing should be published.
    pub async fn respond(
        &self,
        event: Option<&Event>,
        signer: &Signer,
    ) -> Result<Option<Vec<Event>>> {
        let Some(event) = event else {
            let now = unix_now();
            let events =
                self.ctx
                    .quiz
                    .generate(&self.ctx.codec, &mut rand::thread_rng(), signer, now)?;
            return Ok(Some(events));
        };
        if event.pubkey == signer.public_key() {
            debug!(id = %event.id, "ignoring own event");
            return Ok(None);
        }
        if !self.ctx.policy.is_allowed(event)? {
            return Ok(None);
        }
        let Some(command) = self.ctx.commands.parse(&event.content) else {
            return Ok(None);
        };

        let codec = &self.ctx.codec;
        let mut reply = match command {
            Command::Persona => compose::persona(event),
            Command::Shanten { hand } => compose::shanten(codec, event, &hand)?,
            Command::Score {
                hand,
                winning,
                round_wind,
                seat_wind,
            } => compose::score(
                codec,
                event,
                &hand,
                &winning,
                round_wind.as_deref(),
                seat_wind.as_deref(),
            )?,
            Command::Machi { hand } => compose::machi(codec, event, &hand)?,
            Command::QuizAnswer { points } => {
                self.ctx
                    .quiz
                    .grade(
                        codec,
                        self.ctx.relay.as_ref(),
                        signer.public_key(),
                        event,
                        points,
                    )
                    .await?
            }
        };

        let mut drafts = Vec::with_capacity(2);
        if let Some(end) = self.persona_marker.find(&reply.content).map(|m| m.end()) {
            reply.content.replace_range(..end, "");
            drafts.push(
                self.ctx
                    .personas
                    .draft_for(signer.public_key(), event.created_at.saturating_add(1))?,
            );
        }
        drafts.push(reply.into_draft(event));

        let signed = drafts
            .iter()
            .map(|d| signer.sign(d))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        info!(id = %event.id, replies = signed.len(), "responded");
        Ok(Some(signed))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
