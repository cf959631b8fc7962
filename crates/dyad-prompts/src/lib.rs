//! Dyad Prompts — natural-language instruction rendering.
//!
//! Renders the two instructions consumed by the turn-resolution engine:
//! the scene-advancer (responder) prompt and the validator prompt. Both
//! renderers are pure functions of their context: no I/O, no clock, no
//! randomness, so identical contexts always produce identical strings.

use std::fmt::Write as _;

use dyad_core::character::CharacterSheet;
use dyad_core::event::{Event, EventKind};

/// Required opening words of every first-turn scene.
pub const OPENING_SCENE_PREFIX: &str = "You enter a new space. In this space";

/// Everything the renderers may look at for one turn.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// The player character's sheet.
    pub pc: &'a CharacterSheet,
    /// The simulator character's sheet.
    pub npc: &'a CharacterSheet,
    /// Conversation history so far; empty on the opening turn.
    pub history: &'a [Event],
    /// The proposed action under validation, when rendering the validator.
    pub event_draft: Option<&'a Event>,
    /// Reason the previous attempt was rejected, fed back on retry.
    pub invalid_reason: Option<&'a str>,
}

fn kind_label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Info => "info",
        EventKind::Error => "error",
        EventKind::User => "user",
        EventKind::Assistant => "ai",
    }
}

fn write_history(out: &mut String, history: &[Event]) {
    let _ = writeln!(out, "Actions so far:");
    if history.is_empty() {
        let _ = writeln!(out, "None");
        return;
    }
    for event in history {
        let _ = writeln!(out, "- {}: {}", kind_label(event.kind), event.content);
    }
}

fn write_abilities(out: &mut String, label: &str, sheet: &CharacterSheet) {
    let _ = writeln!(out, "{label} abilities: [{}]", sheet.abilities.join(", "));
}

/// Renders the scene-advancer instructions.
///
/// With an empty history this renders the opening-scene branch; the
/// model is asked to set a 1-2 sentence shared scene starting with
/// [`OPENING_SCENE_PREFIX`]. Otherwise it renders the advance-scene
/// branch for the player's last action. A prior `invalid_reason` is
/// appended so a retried attempt carries the validator's feedback.
#[must_use]
pub fn render_responder(ctx: &PromptContext<'_>) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are the scene-advancer. The user controls their own character. \
         You play only the simulator's character (NPC). You must not speak or \
         act for the user's character."
    );
    let _ = writeln!(
        out,
        "- User's character: {} ({})",
        ctx.pc.name, ctx.pc.short_description
    );
    write_abilities(&mut out, "- User character", ctx.pc);
    let _ = writeln!(
        out,
        "- Simulator's character (your character): {} ({})",
        ctx.npc.name, ctx.npc.short_description
    );
    let _ = writeln!(
        out,
        "- Simulator character description: {}",
        ctx.npc.long_description
    );
    write_abilities(&mut out, "- Simulator character", ctx.npc);

    let _ = writeln!(out, "----");
    let _ = writeln!(out, "When advancing the scene:");
    let _ = writeln!(
        out,
        "0. Adjudicate the user's last action: assume success if it is within \
         the user character's abilities, and report the result of that action \
         in the world."
    );
    let _ = writeln!(
        out,
        "1. Sense-bounded narration: only narrate what the user's character \
         could presently perceive through their available senses."
    );
    let _ = writeln!(
        out,
        "2. Perception-bounded NPC behavior: simulator characters only react \
         to things they have the ability to detect."
    );
    let _ = writeln!(
        out,
        "3. No new user actions / no user internals: do not invent actions for \
         the user or narrate their thoughts or feelings."
    );
    let _ = writeln!(
        out,
        "4. Continuity and feasibility: all narration must remain physically \
         and logically continuous within each character's abilities."
    );
    let _ = writeln!(
        out,
        "5. Single observable step: advance the scene by one concrete, \
         externally observable outcome at a time."
    );
    let _ = writeln!(
        out,
        "6. No unexpressed internals: do not narrate internal states of any \
         agent unless expressed through observable behaviour."
    );

    if ctx.history.is_empty() {
        let _ = writeln!(
            out,
            "Describe a 1-2 sentence opening scene where both characters could \
             plausibly be present, setting the stage for a potential \
             interaction. It must start with \"{OPENING_SCENE_PREFIX}\". \
             Start the opening scene now."
        );
    } else {
        let _ = writeln!(
            out,
            "Your job is to advance the scene one step in response to the \
             user's last action. Provide a response to the last user action now."
        );
    }

    write_history(&mut out, ctx.history);

    if let Some(reason) = ctx.invalid_reason {
        let _ = writeln!(out, "{reason}");
        let _ = writeln!(
            out,
            "Provide a response to the last user action and ensure it follows \
             the rules."
        );
    }

    let _ = writeln!(
        out,
        "Write ONLY the scene output in the following JSON format - no \
         meta-text, no explanations, no reasoning: \
         {{\"event_draft\": {{\"type\": \"ai\", \"content\": \"<scene advancement>\"}}, \
         \"invalid_reason\": null}}"
    );

    out
}

/// Renders the validator instructions for the proposed action in
/// `ctx.event_draft`.
///
/// The rule block is selected by the draft's kind: first-turn rules
/// when history is empty, user-action rules for a `user` draft, and
/// simulator-response rules for an `assistant` draft. The relevant
/// character's abilities, the history, and the draft itself are
/// embedded verbatim.
#[must_use]
pub fn render_validator(ctx: &PromptContext<'_>) -> String {
    let mut out = String::new();

    let draft_kind = ctx.event_draft.map_or(EventKind::User, |e| e.kind);

    let _ = writeln!(
        out,
        "You are a validator that decides whether the `{}` proposed response \
         is valid.",
        kind_label(draft_kind)
    );

    if ctx.history.is_empty() {
        let _ = writeln!(out, "FIRST TURN:");
        let _ = writeln!(out, "1. MUST be an opening scene.");
        let _ = writeln!(out, "2. MUST begin with: \"{OPENING_SCENE_PREFIX}\".");
        let _ = writeln!(
            out,
            "3. MUST be 2-3 sentences setting a shared scene where both \
             characters could plausibly be present based on their descriptions \
             and abilities."
        );
    } else if draft_kind == EventKind::User {
        let _ = writeln!(out, "USER RESPONSE:");
        let _ = writeln!(
            out,
            "1. MUST describe plausible observable actions based on the \
             character's abilities. Repeating actions, leaving or returning \
             to the scene, or trying multiple times is allowed. Internal \
             states or conclusions like \"I figure out...\" are never valid \
             because they do not describe observable actions."
        );
        let _ = writeln!(
            out,
            "2. MUST NOT decide outcomes of their actions or the reactions of \
             other characters."
        );
        let _ = writeln!(
            out,
            "3. MAY use any object that could plausibly be present in the \
             scene, even if not yet mentioned, but never implausible objects."
        );
        let _ = writeln!(
            out,
            "4. MAY leave the scene or walk away, as long as it is within the \
             character's abilities."
        );
    } else {
        let _ = writeln!(out, "SIMULATOR RESPONSE:");
        let _ = writeln!(
            out,
            "0. Adjudicate the user's last action: assume success if it is \
             within the user character's abilities."
        );
        let _ = writeln!(
            out,
            "1. Sense-bounded narration: only narrate what the user's \
             character could presently perceive."
        );
        let _ = writeln!(
            out,
            "2. Perception-bounded NPC behavior: simulator characters only \
             react to things they can detect."
        );
        let _ = writeln!(
            out,
            "3. No new user actions / no user internals. 4. Continuity and \
             feasibility. 5. Single observable step. 6. No unexpressed \
             internals."
        );
    }

    let _ = writeln!(out, "----");
    match draft_kind {
        EventKind::Assistant => write_abilities(&mut out, "Simulator/non-player character", ctx.npc),
        _ => write_abilities(&mut out, "User/player character", ctx.pc),
    }
    let _ = writeln!(out, "----");

    write_history(&mut out, ctx.history);

    let _ = writeln!(out, "Next proposed action:");
    match ctx.event_draft {
        Some(draft) => {
            let _ = writeln!(out, "- {}: {}", kind_label(draft.kind), draft.content);
        }
        None => {
            let _ = writeln!(out, "None");
        }
    }

    let _ = writeln!(
        out,
        "Output format: {{\"invalid_reason\": \"<reason>\"}} if invalid, \
         otherwise {{\"events\": [{{\"type\": \"<type>\", \"content\": \
         \"<content>\"}}]}} copying the proposed action."
    );

    out
}
