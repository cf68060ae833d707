use std::{
	collections::{HashMap, HashSet, VecDeque},
	sync::{Arc, Mutex, RwLock},
};

use time::OffsetDateTime;
use uuid::Uuid;

use riffle_domain::entities;

use crate::{Error, Result};

const RECENT_CONTEXT_TURNS: usize = 3;
const RECENT_CONTEXT_CHARS: usize = 200;
/// Older turns scanned for entities and response summaries during compaction.
const OLDER_SUMMARY_TURNS: usize = 5;
const MAX_ENTITIES_PER_TURN: usize = 5;
const MAX_KEY_TOPICS: usize = 8;
const MAX_RESPONSE_SUMMARIES: usize = 3;
const RESPONSE_SUMMARY_CHARS: usize = 300;
/// Truncation for turns inside the recent window. Never applied to the most
/// recent turn: follow-ups reference numbered items from the latest answer.
const RECENT_TURN_CHARS: usize = 800;
const SUMMARY_EXCERPT_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	User,
	Assistant,
}

impl Role {
	pub fn label(&self) -> &'static str {
		match self {
			Self::User => "User",
			Self::Assistant => "Assistant",
		}
	}
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationTurn {
	pub role: Role,
	pub content: String,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
	pub turn_id: u64,
}

/// Context bundle consumed by the answer workflow and the transport layer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RagContext {
	pub recent_context: String,
	pub full_context: String,
	pub conversation_id: String,
	pub turn_count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationSummary {
	pub conversation_id: String,
	pub turn_count: usize,
	pub user_messages: usize,
	pub assistant_messages: usize,
	pub first_message: Option<String>,
	pub last_message: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub updated_at: Option<OffsetDateTime>,
}

/// Ordered turn history for one conversation id. Turns are immutable once
/// appended; history trims oldest-first past `max_history_turns`.
#[derive(Debug)]
pub struct ConversationContext {
	id: String,
	turns: VecDeque<ConversationTurn>,
	turn_counter: u64,
	created_at: OffsetDateTime,
	max_history_turns: usize,
}

impl ConversationContext {
	fn new(id: String, max_history_turns: usize) -> Self {
		Self {
			id,
			turns: VecDeque::new(),
			turn_counter: 0,
			created_at: OffsetDateTime::now_utc(),
			max_history_turns,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn turn_count(&self) -> usize {
		self.turns.len()
	}

	pub fn add_turn(&mut self, role: Role, content: &str) -> ConversationTurn {
		let turn = ConversationTurn {
			role,
			content: content.to_string(),
			timestamp: OffsetDateTime::now_utc(),
			turn_id: self.turn_counter,
		};

		self.turn_counter += 1;
		self.turns.push_back(turn.clone());

		while self.turns.len() > self.max_history_turns {
			self.turns.pop_front();
		}

		turn
	}

	/// The last three turns, truncated and role-labeled.
	pub fn recent_context(&self) -> String {
		let skip = self.turns.len().saturating_sub(RECENT_CONTEXT_TURNS);

		self.turns
			.iter()
			.skip(skip)
			.map(|turn| {
				format!(
					"{}: {}...",
					turn.role.label(),
					truncate_chars(&turn.content, RECENT_CONTEXT_CHARS)
				)
			})
			.collect::<Vec<_>>()
			.join("\n")
	}

	/// The verbatim window, role-labeled, no truncation.
	pub fn context_window(&self) -> String {
		let mut lines = Vec::new();

		for turn in &self.turns {
			lines.push(format!("{}:", turn.role.label()));
			lines.push(turn.content.clone());
			lines.push(String::new());
		}

		lines.join("\n")
	}

	/// Collapses older turns into a bounded summary while keeping the last
	/// `recent_window` turns near-verbatim. Idempotent: the output depends
	/// only on the stored turns. The single most recent turn is never
	/// truncated, so list numbering in the latest answer survives exactly.
	pub fn compact_context(&self, recent_window: usize) -> String {
		if self.turns.is_empty() {
			return String::new();
		}

		let total = self.turns.len();

		if total <= recent_window {
			return self.context_window();
		}

		let recent_start = total - recent_window;
		let older: Vec<&ConversationTurn> = self.turns.iter().take(recent_start).collect();
		let scan_start = older.len().saturating_sub(OLDER_SUMMARY_TURNS);
		let mut key_topics = Vec::new();
		let mut seen_topics = HashSet::new();
		let mut summaries = Vec::new();

		for (offset, turn) in older[scan_start..].iter().enumerate() {
			for entity in entities::extract_key_entities(&turn.content, MAX_ENTITIES_PER_TURN) {
				if key_topics.len() >= MAX_KEY_TOPICS {
					break;
				}
				if seen_topics.insert(entity.to_lowercase()) {
					key_topics.push(entity);
				}
			}

			if turn.role == Role::Assistant && !turn.content.is_empty() {
				let mut summary = truncate_chars(&turn.content, RESPONSE_SUMMARY_CHARS);

				if turn.content.chars().count() > RESPONSE_SUMMARY_CHARS {
					summary.push_str("...");
				}

				summaries.push(format!("Previous response {}: {summary}", offset + 1));
			}
		}

		let mut parts = Vec::new();

		if !key_topics.is_empty() || !summaries.is_empty() {
			parts.push("[PREVIOUS CONTEXT SUMMARY]".to_string());

			if !key_topics.is_empty() {
				parts.push(format!("Key topics discussed: {}", key_topics.join(", ")));
			}

			parts.extend(summaries.into_iter().take(MAX_RESPONSE_SUMMARIES));
			parts.push(String::new());
		}

		parts.push("[RECENT CONVERSATION]".to_string());

		let recent: Vec<&ConversationTurn> = self.turns.iter().skip(recent_start).collect();
		let last_index = recent.len() - 1;

		for (index, turn) in recent.iter().enumerate() {
			let content = if index != last_index
				&& turn.content.chars().count() > RECENT_TURN_CHARS
			{
				format!("{}...", truncate_chars(&turn.content, RECENT_TURN_CHARS))
			} else {
				turn.content.clone()
			};

			parts.push(format!("{}: {content}", turn.role.label()));
		}

		parts.join("\n")
	}

	pub fn context_for_rag(&self, compact: bool, recent_window: usize) -> RagContext {
		let full_context =
			if compact { self.compact_context(recent_window) } else { self.context_window() };

		RagContext {
			recent_context: self.recent_context(),
			full_context,
			conversation_id: self.id.clone(),
			turn_count: self.turns.len(),
		}
	}

	pub fn summary(&self) -> ConversationSummary {
		let user_messages = self.turns.iter().filter(|turn| turn.role == Role::User).count();
		let assistant_messages = self.turns.len() - user_messages;

		ConversationSummary {
			conversation_id: self.id.clone(),
			turn_count: self.turns.len(),
			user_messages,
			assistant_messages,
			first_message: self
				.turns
				.front()
				.map(|turn| truncate_chars(&turn.content, SUMMARY_EXCERPT_CHARS)),
			last_message: self
				.turns
				.back()
				.map(|turn| truncate_chars(&turn.content, SUMMARY_EXCERPT_CHARS)),
			created_at: self.created_at,
			updated_at: self.turns.back().map(|turn| turn.timestamp),
		}
	}
}

/// Shared map of conversation id to context. `add_turn` serializes per
/// conversation through the inner mutex; distinct ids mutate concurrently.
pub struct ConversationStore {
	cfg: riffle_config::Conversation,
	conversations: RwLock<HashMap<String, Arc<Mutex<ConversationContext>>>>,
}

impl ConversationStore {
	pub fn new(cfg: riffle_config::Conversation) -> Self {
		Self { cfg, conversations: RwLock::new(HashMap::new()) }
	}

	/// Returns the conversation for `conversation_id` or creates a fresh one
	/// (unknown ids also create fresh conversations, with a new id).
	pub fn get_or_create(
		&self,
		conversation_id: Option<&str>,
	) -> (String, Arc<Mutex<ConversationContext>>) {
		if let Some(id) = conversation_id {
			let guard = self.conversations.read().unwrap_or_else(|err| err.into_inner());

			if let Some(found) = guard.get(id) {
				return (id.to_string(), found.clone());
			}
		}

		let id = Uuid::new_v4().simple().to_string();
		let context = Arc::new(Mutex::new(ConversationContext::new(
			id.clone(),
			self.cfg.max_history_turns as usize,
		)));
		let mut guard = self.conversations.write().unwrap_or_else(|err| err.into_inner());

		guard.insert(id.clone(), context.clone());
		evict_oldest(&mut guard, self.cfg.max_conversations as usize);
		tracing::debug!(conversation_id = %id, "Conversation created.");

		(id, context)
	}

	pub fn get(&self, conversation_id: &str) -> Option<Arc<Mutex<ConversationContext>>> {
		let guard = self.conversations.read().unwrap_or_else(|err| err.into_inner());

		guard.get(conversation_id).cloned()
	}

	pub fn add_turn(
		&self,
		conversation_id: &str,
		role: Role,
		content: &str,
	) -> Result<ConversationTurn> {
		let Some(context) = self.get(conversation_id) else {
			return Err(Error::NotFound {
				message: format!("Conversation {conversation_id} does not exist."),
			});
		};
		let mut guard = context.lock().unwrap_or_else(|err| err.into_inner());

		Ok(guard.add_turn(role, content))
	}

	pub fn context_for_rag(&self, conversation_id: &str, compact: bool) -> Result<RagContext> {
		let Some(context) = self.get(conversation_id) else {
			return Err(Error::NotFound {
				message: format!("Conversation {conversation_id} does not exist."),
			});
		};
		let guard = context.lock().unwrap_or_else(|err| err.into_inner());

		Ok(guard.context_for_rag(compact, self.cfg.recent_window as usize))
	}

	pub fn delete(&self, conversation_id: &str) -> bool {
		let mut guard = self.conversations.write().unwrap_or_else(|err| err.into_inner());

		guard.remove(conversation_id).is_some()
	}

	pub fn list(&self) -> Vec<ConversationSummary> {
		let guard = self.conversations.read().unwrap_or_else(|err| err.into_inner());
		let mut summaries: Vec<ConversationSummary> = guard
			.values()
			.map(|context| context.lock().unwrap_or_else(|err| err.into_inner()).summary())
			.collect();

		summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));

		summaries
	}
}

fn evict_oldest(
	conversations: &mut HashMap<String, Arc<Mutex<ConversationContext>>>,
	max_conversations: usize,
) {
	while conversations.len() > max_conversations {
		let oldest = conversations
			.iter()
			.min_by_key(|(id, context)| {
				let guard = context.lock().unwrap_or_else(|err| err.into_inner());

				(guard.created_at, (*id).clone())
			})
			.map(|(id, _)| id.clone());
		let Some(id) = oldest else {
			return;
		};

		conversations.remove(&id);
		tracing::warn!(conversation_id = %id, "Evicted oldest conversation over store cap.");
	}
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
	text.chars().take(max_chars).collect()
}
