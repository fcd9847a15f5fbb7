//! Turn processor: one inbound message, end to end.
//!
//! A turn reads the user's history, asks the model what to do, resolves
//! any function call against the ticketing backend, persists the new turns
//! and delivers the outcome over the messaging channel.  Every step is a
//! plain `await` in sequence; the only concurrency is the per-user gate
//! that keeps two turns of the same user from interleaving.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tb_domain::conversation::{current_state, last_function_call, ConversationState, Turn};
use tb_domain::error::{Error, Result};
use tb_domain::tool::{FunctionCall, Message};
use tb_domain::trace::TraceEvent;
use tb_domain::FunctionName;
use tb_providers::{ChatResponse, LlmProvider, ModelOutput};
use tb_sessions::{user_key, ConversationStore};
use tb_ticketing::Event;
use tb_whatsapp::{EventCard, InboundContent, MessagingChannel};

use super::chat_request;
use super::resolver::{ContextResolver, ResolvedContext};
use super::session_lock::SessionLockMap;

/// What the user sees when the model could not produce a reply.
pub const APOLOGY: &str = "Sorry, I am unable to process your request at the moment.";

/// Recorded in place of a reply that could not be generated.
pub(crate) const GENERATION_ERROR: &str = "Response generation error";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Input
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct InboundTurn {
    /// Sender phone id; owns the conversation.
    pub user_id: String,
    /// Inbound message id, used for read receipts and reply quoting.
    pub message_id: String,
    pub content: InboundContent,
}

/// Outcome of the first model call of a turn.
enum FirstPass {
    Reply(String),
    Call(FunctionName, FunctionCall),
    /// Generation failed; an error turn was recorded.
    Apologized,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Processor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct TurnProcessor {
    llm: Arc<dyn LlmProvider>,
    channel: Arc<dyn MessagingChannel>,
    resolver: Arc<ContextResolver>,
    history: Arc<ConversationStore>,
    gate: Option<Arc<SessionLockMap>>,
    temperature: Option<f32>,
    pacing: Duration,
}

impl TurnProcessor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        channel: Arc<dyn MessagingChannel>,
        resolver: Arc<ContextResolver>,
        history: Arc<ConversationStore>,
    ) -> Self {
        Self {
            llm,
            channel,
            resolver,
            history,
            gate: None,
            temperature: None,
            pacing: Duration::from_millis(300),
        }
    }

    /// Serialize turns per user through `gate`.
    pub fn with_gate(mut self, gate: Arc<SessionLockMap>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Delay between consecutive event cards.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Run one turn.  Errors abort the turn; whatever was persisted before
    /// the failure stays in the history.
    pub async fn process(&self, turn: InboundTurn) -> Result<()> {
        let start = Instant::now();
        let _permit = match &self.gate {
            Some(gate) => Some(gate.acquire(&turn.user_id).await?),
            None => None,
        };

        let function = match &turn.content {
            InboundContent::Text(text) => self.on_text(&turn, text).await?,
            InboundContent::Location {
                latitude,
                longitude,
            } => self.on_location(&turn, *latitude, *longitude).await?,
            InboundContent::ButtonReply { id, .. } => self.on_button(&turn, id).await?,
        };

        let history = self.history.read(&turn.user_id).await?;
        TraceEvent::TurnCompleted {
            user_key: user_key(&turn.user_id),
            state: current_state(&history).to_string(),
            function: function.map(|f| f.to_string()),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();
        Ok(())
    }

    // ── message shapes ──────────────────────────────────────────────

    async fn on_text(&self, turn: &InboundTurn, text: &str) -> Result<Option<FunctionName>> {
        match self.first_pass(&turn.user_id, text).await? {
            FirstPass::Apologized => {
                self.reply(turn, APOLOGY).await?;
                Ok(None)
            }
            FirstPass::Reply(reply) => {
                self.reply(turn, &reply).await?;
                Ok(None)
            }
            FirstPass::Call(FunctionName::FindNearbyEvents, _) => {
                // Coordinates arrive with the user's next (location) message.
                self.channel.mark_read(&turn.message_id).await?;
                self.channel
                    .send_location_request(&turn.user_id, &turn.message_id)
                    .await?;
                Ok(Some(FunctionName::FindNearbyEvents))
            }
            FirstPass::Call(name, call) => {
                let context = self.resolver.resolve(&call, &turn.user_id).await?;
                self.deliver(turn, name, context).await?;
                Ok(Some(name))
            }
        }
    }

    async fn on_location(
        &self,
        turn: &InboundTurn,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<FunctionName>> {
        let events = self.resolver.nearby(latitude, longitude).await?;
        if events.is_empty() {
            let reply = self
                .fold_back(&turn.user_id, &ResolvedContext::Events(events))
                .await?;
            self.reply(turn, &reply).await?;
        } else {
            self.present_events(turn, FunctionName::FindNearbyEvents, events)
                .await?;
        }
        Ok(Some(FunctionName::FindNearbyEvents))
    }

    async fn on_button(&self, turn: &InboundTurn, button_id: &str) -> Result<Option<FunctionName>> {
        match self.first_pass(&turn.user_id, button_id).await? {
            FirstPass::Apologized => {
                self.reply(turn, APOLOGY).await?;
                Ok(None)
            }
            FirstPass::Reply(_) => Err(Error::ExpectedFunctionCall),
            FirstPass::Call(FunctionName::SelectEvent, call) => {
                let context = self.resolver.resolve(&call, &turn.user_id).await?;
                let reply = self.fold_back(&turn.user_id, &context).await?;
                self.reply(turn, &reply).await?;
                Ok(Some(FunctionName::SelectEvent))
            }
            FirstPass::Call(name, _) => Err(Error::WrongFunctionCall {
                expected: FunctionName::SelectEvent.to_string(),
                received: name.to_string(),
            }),
        }
    }

    // ── steps ───────────────────────────────────────────────────────

    /// Ask the model about `input` and persist the user and model turns.
    ///
    /// A text answer keeps the current state; a function call moves the
    /// conversation to that function's state.
    async fn first_pass(&self, user_id: &str, input: &str) -> Result<FirstPass> {
        let history = self.history.read(user_id).await?;
        let state = current_state(&history);
        let user_msg = Message::user(input);

        let mut messages: Vec<Message> = history.into_iter().map(|t| t.message).collect();
        messages.push(user_msg.clone());

        let response = match self.generate(messages).await {
            Ok(r) => r,
            Err(e) => {
                self.record_generation_error(user_id, &e).await?;
                return Ok(FirstPass::Apologized);
            }
        };

        match response.output().ok_or(Error::UnknownModelResponseType)? {
            ModelOutput::Text(text) => {
                self.history
                    .append(
                        user_id,
                        vec![
                            Turn::new(user_msg, state),
                            Turn::new(Message::model(text.clone()), state),
                        ],
                    )
                    .await?;
                Ok(FirstPass::Reply(text))
            }
            ModelOutput::FunctionCall(call) => {
                let name: FunctionName = call.name.parse()?;
                let next = name.next_state();
                tracing::debug!(function = %name, state = %next, "model requested function");
                self.history
                    .append(
                        user_id,
                        vec![
                            Turn::new(user_msg, next),
                            Turn::new(Message::function_call(call.clone()), next),
                        ],
                    )
                    .await?;
                Ok(FirstPass::Call(name, call))
            }
        }
    }

    /// Present a non-empty events list directly; anything else goes back
    /// through the model.
    async fn deliver(
        &self,
        turn: &InboundTurn,
        name: FunctionName,
        context: ResolvedContext,
    ) -> Result<()> {
        match context {
            ResolvedContext::Events(events) if !events.is_empty() => {
                self.present_events(turn, name, events).await
            }
            ResolvedContext::Events(_) => self.fold_and_reply(turn, &context).await,
            _ if name.is_search() => Err(Error::InvalidContextPayload),
            other => self.fold_and_reply(turn, &other).await,
        }
    }

    async fn fold_and_reply(&self, turn: &InboundTurn, context: &ResolvedContext) -> Result<()> {
        let reply = self.fold_back(&turn.user_id, context).await?;
        self.reply(turn, &reply).await
    }

    /// Record the events as the function result, then send one card per
    /// event.  A card that fails to send is logged and skipped.
    async fn present_events(
        &self,
        turn: &InboundTurn,
        name: FunctionName,
        events: Vec<Event>,
    ) -> Result<()> {
        let result = Message::function_result(
            name.as_str(),
            ResolvedContext::Events(events.clone()).to_value()?,
        );
        self.history
            .append(
                &turn.user_id,
                vec![Turn::new(result, ConversationState::EventQuery)],
            )
            .await?;

        self.channel.mark_read(&turn.message_id).await?;

        let mut sent = 0usize;
        for (i, event) in events.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            let card = EventCard {
                event_id: event.id,
                title: event.title.clone(),
                date: event.date,
                poster: event.poster.clone(),
            };
            match self.channel.send_event_card(&turn.user_id, &card).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::error!(event_id = event.id, error = %e, "failed to send event card");
                }
            }
        }
        tracing::info!(total = events.len(), sent, "event cards delivered");
        Ok(())
    }

    /// Feed `context` to the model as the result of the most recent
    /// function call and return its text reply.
    ///
    /// The function-result and reply turns keep the conversation's current
    /// state.  A generation failure records an error turn and yields the
    /// apology instead.
    async fn fold_back(&self, user_id: &str, context: &ResolvedContext) -> Result<String> {
        let history = self.history.read(user_id).await?;
        if history.is_empty() {
            return Err(Error::EmptyConversationHistory);
        }
        let state = current_state(&history);
        let name = last_function_call(&history)
            .ok_or(Error::MissingFunctionCall)?
            .name
            .clone();

        let result = Message::function_result(name, context.to_value()?);
        let mut messages: Vec<Message> = history.into_iter().map(|t| t.message).collect();
        messages.push(result.clone());

        let response = match self.generate(messages).await {
            Ok(r) => r,
            Err(e) => {
                self.record_generation_error(user_id, &e).await?;
                return Ok(APOLOGY.to_owned());
            }
        };

        let Some(ModelOutput::Text(text)) = response.output() else {
            return Err(Error::UnknownModelResponseType);
        };

        self.history
            .append(
                user_id,
                vec![
                    Turn::new(result, state),
                    Turn::new(Message::model(text.clone()), state),
                ],
            )
            .await?;
        Ok(text)
    }

    async fn generate(&self, messages: Vec<Message>) -> Result<ChatResponse> {
        self.llm
            .chat(&chat_request(messages, self.temperature))
            .await
    }

    async fn record_generation_error(&self, user_id: &str, err: &Error) -> Result<()> {
        tracing::error!(error = %err, "failed to generate model response");
        self.history
            .append(
                user_id,
                vec![Turn::new(
                    Message::model(GENERATION_ERROR),
                    ConversationState::ResponseError,
                )],
            )
            .await
    }

    /// Mark the inbound message read, then send `body` quoting it.
    async fn reply(&self, turn: &InboundTurn, body: &str) -> Result<()> {
        self.channel.mark_read(&turn.message_id).await?;
        self.channel
            .send_text(&turn.user_id, Some(&turn.message_id), body)
            .await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{sample_event, MockBackend, MockChannel, MockLlm, Sent};
    use serde_json::json;
    use tb_domain::tool::{Part, Role};
    use tb_sessions::SelectionStore;

    const USER: &str = "2348000000001";
    const MSG: &str = "wamid.in";

    struct Harness {
        processor: TurnProcessor,
        llm: Arc<MockLlm>,
        channel: Arc<MockChannel>,
        backend: Arc<MockBackend>,
        history: Arc<ConversationStore>,
        _dir: tempfile::TempDir,
    }

    fn harness(
        script: Vec<Result<ChatResponse>>,
        backend: MockBackend,
        channel: MockChannel,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let history =
            Arc::new(ConversationStore::new(dir.path(), chrono::Duration::hours(6)).unwrap());
        let selections =
            Arc::new(SelectionStore::new(dir.path(), chrono::Duration::hours(3)).unwrap());
        let llm = Arc::new(MockLlm::new(script));
        let channel = Arc::new(channel);
        let backend = Arc::new(backend);
        let resolver = Arc::new(ContextResolver::new(backend.clone(), selections));
        let processor = TurnProcessor::new(llm.clone(), channel.clone(), resolver, history.clone())
            .with_gate(Arc::new(SessionLockMap::new()))
            .with_pacing(Duration::ZERO);
        Harness {
            processor,
            llm,
            channel,
            backend,
            history,
            _dir: dir,
        }
    }

    fn inbound(content: InboundContent) -> InboundTurn {
        InboundTurn {
            user_id: USER.into(),
            message_id: MSG.into(),
            content,
        }
    }

    fn text(body: &str) -> InboundTurn {
        inbound(InboundContent::Text(body.into()))
    }

    fn states(turns: &[Turn]) -> Vec<ConversationState> {
        turns.iter().map(|t| t.state).collect()
    }

    #[tokio::test]
    async fn text_answer_is_replied_and_persisted() {
        let h = harness(
            vec![MockLlm::text("Hi! I'm Tejiri. What are you in the mood for?")],
            MockBackend::default(),
            MockChannel::default(),
        );
        h.processor.process(text("hello")).await.unwrap();

        assert_eq!(
            h.channel.sent(),
            vec![
                Sent::MarkRead(MSG.into()),
                Sent::Text {
                    to: USER.into(),
                    reply_to: Some(MSG.into()),
                    body: "Hi! I'm Tejiri. What are you in the mood for?".into(),
                },
            ]
        );
        let turns = h.history.read(USER).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].message, Message::user("hello"));
        assert_eq!(states(&turns), vec![ConversationState::Initial; 2]);

        let req = &h.llm.requests()[0];
        assert_eq!(req.tools.len(), 6);
        assert!(req.system_instruction.is_some());
    }

    #[tokio::test]
    async fn empty_search_goes_back_through_the_model() {
        let h = harness(
            vec![
                MockLlm::call(FunctionCall::new("find_events").with_arg("location", "Abuja")),
                MockLlm::text("No events in Abuja yet. Want to try another city?"),
            ],
            MockBackend::default(),
            MockChannel::default(),
        );
        h.processor.process(text("events in Abuja")).await.unwrap();

        let requests = h.llm.requests();
        assert_eq!(requests.len(), 2);
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, Role::System);
        assert_eq!(
            last.payload,
            Part::FunctionResult {
                name: "find_events".into(),
                response: json!({"events": []}),
            }
        );

        let turns = h.history.read(USER).await.unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(states(&turns), vec![ConversationState::EventQuery; 4]);
        assert_eq!(
            h.channel.texts(),
            vec!["No events in Abuja yet. Want to try another city?".to_owned()]
        );
    }

    #[tokio::test]
    async fn found_events_are_sent_as_cards_without_second_model_call() {
        let h = harness(
            vec![MockLlm::call(FunctionCall::new("find_trending_events"))],
            MockBackend::with_events(vec![sample_event(1), sample_event(2)]),
            MockChannel::default(),
        );
        h.processor.process(text("what's hot?")).await.unwrap();

        assert_eq!(h.llm.requests().len(), 1);
        assert_eq!(
            h.channel.sent(),
            vec![
                Sent::MarkRead(MSG.into()),
                Sent::EventCard { to: USER.into(), event_id: 1 },
                Sent::EventCard { to: USER.into(), event_id: 2 },
            ]
        );
        let turns = h.history.read(USER).await.unwrap();
        assert_eq!(turns.len(), 3);
        assert!(matches!(
            turns[2].payload(),
            Part::FunctionResult { name, .. } if name == "find_trending_events"
        ));
        assert_eq!(turns[2].state, ConversationState::EventQuery);
    }

    #[tokio::test(start_paused = true)]
    async fn event_cards_are_spaced_by_the_pacing_delay() {
        let h = harness(
            vec![MockLlm::call(FunctionCall::new("find_trending_events"))],
            MockBackend::with_events(vec![sample_event(1), sample_event(2), sample_event(3)]),
            MockChannel::default(),
        );
        let processor = h.processor.with_pacing(Duration::from_millis(300));
        processor.process(text("what's on?")).await.unwrap();

        let times = h.channel.card_times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(300), "gap {gap:?}");
            assert!(gap < Duration::from_millis(400), "gap {gap:?}");
        }
    }

    #[tokio::test]
    async fn failed_card_is_skipped() {
        let h = harness(
            vec![MockLlm::call(FunctionCall::new("find_trending_events"))],
            MockBackend::with_events(vec![sample_event(1), sample_event(2), sample_event(3)]),
            MockChannel::failing_cards(&[2]),
        );
        h.processor.process(text("trending")).await.unwrap();

        let cards: Vec<i64> = h
            .channel
            .sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::EventCard { event_id, .. } => Some(event_id),
                _ => None,
            })
            .collect();
        assert_eq!(cards, vec![1, 3]);
    }

    #[tokio::test]
    async fn nearby_request_asks_for_location_without_backend_call() {
        let h = harness(
            vec![MockLlm::call(FunctionCall::new("find_nearby_events"))],
            MockBackend::default(),
            MockChannel::default(),
        );
        h.processor.process(text("anything close by?")).await.unwrap();

        assert!(h.backend.calls().is_empty());
        assert_eq!(
            h.channel.sent(),
            vec![
                Sent::MarkRead(MSG.into()),
                Sent::LocationRequest { to: USER.into(), reply_to: MSG.into() },
            ]
        );
        let turns = h.history.read(USER).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(states(&turns), vec![ConversationState::EventQuery; 2]);
    }

    #[tokio::test]
    async fn model_failure_sends_apology_and_records_error_turn() {
        let h = harness(vec![MockLlm::fail()], MockBackend::default(), MockChannel::default());
        h.processor.process(text("hello")).await.unwrap();

        assert_eq!(h.channel.texts(), vec![APOLOGY.to_owned()]);
        let turns = h.history.read(USER).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].message, Message::model(GENERATION_ERROR));
        assert_eq!(turns[0].state, ConversationState::ResponseError);
    }

    #[tokio::test]
    async fn unknown_function_aborts_before_persisting() {
        let h = harness(
            vec![MockLlm::call(FunctionCall::new("book_flight"))],
            MockBackend::default(),
            MockChannel::default(),
        );
        let err = h.processor.process(text("fly me")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidFunctionName(_)));
        assert!(h.history.read(USER).await.unwrap().is_empty());
        assert!(h.channel.sent().is_empty());
    }

    #[tokio::test]
    async fn empty_model_output_is_rejected() {
        let h = harness(vec![MockLlm::text("   ")], MockBackend::default(), MockChannel::default());
        let err = h.processor.process(text("hello")).await.unwrap_err();
        assert!(matches!(err, Error::UnknownModelResponseType));
    }

    #[tokio::test]
    async fn tier_selection_is_confirmed_by_the_model() {
        let h = harness(
            vec![
                MockLlm::call(
                    FunctionCall::new("select_ticket_tier")
                        .with_arg("eventId", 7)
                        .with_arg("tierName", "VIP")
                        .with_arg("quantity", 2),
                ),
                MockLlm::text("Two VIP tickets noted. What email should the checkout link go to?"),
            ],
            MockBackend::default(),
            MockChannel::default(),
        );
        h.processor.process(text("2 VIP please")).await.unwrap();

        let turns = h.history.read(USER).await.unwrap();
        assert_eq!(states(&turns), vec![ConversationState::TicketTierSelected; 4]);
        assert_eq!(h.channel.texts().len(), 1);
    }

    #[tokio::test]
    async fn location_with_events_sends_cards() {
        let h = harness(
            vec![],
            MockBackend::with_events(vec![sample_event(4)]),
            MockChannel::default(),
        );
        h.processor
            .process(inbound(InboundContent::Location { latitude: 6.45, longitude: 3.39 }))
            .await
            .unwrap();

        assert_eq!(h.backend.calls(), vec!["nearby:6:3".to_owned()]);
        assert!(h.llm.requests().is_empty());
        assert!(h
            .channel
            .sent()
            .contains(&Sent::EventCard { to: USER.into(), event_id: 4 }));
    }

    #[tokio::test]
    async fn empty_location_result_needs_a_prior_function_call() {
        let h = harness(vec![], MockBackend::default(), MockChannel::default());
        let err = h
            .processor
            .process(inbound(InboundContent::Location { latitude: 6.4, longitude: 3.3 }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyConversationHistory));

        h.history
            .append(USER, vec![Turn::new(Message::user("hi"), ConversationState::Initial)])
            .await
            .unwrap();
        let err = h
            .processor
            .process(inbound(InboundContent::Location { latitude: 6.4, longitude: 3.3 }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingFunctionCall));
    }

    #[tokio::test]
    async fn empty_location_result_is_folded_into_nearby_call() {
        let h = harness(
            vec![
                MockLlm::call(FunctionCall::new("find_nearby_events")),
                MockLlm::text("Nothing near you right now."),
            ],
            MockBackend::default(),
            MockChannel::default(),
        );
        h.processor.process(text("near me")).await.unwrap();
        h.processor
            .process(inbound(InboundContent::Location { latitude: 9.05, longitude: 7.49 }))
            .await
            .unwrap();

        let turns = h.history.read(USER).await.unwrap();
        assert_eq!(turns.len(), 4);
        assert!(matches!(
            turns[2].payload(),
            Part::FunctionResult { name, .. } if name == "find_nearby_events"
        ));
        assert_eq!(h.channel.texts(), vec!["Nothing near you right now.".to_owned()]);
    }

    #[tokio::test]
    async fn button_reply_resolves_selected_event() {
        let h = harness(
            vec![
                MockLlm::call(FunctionCall::new("select_event").with_arg("eventId", 9)),
                MockLlm::text("Event 9 has a VIP tier at 50,000. How many tickets?"),
            ],
            MockBackend::default(),
            MockChannel::default(),
        );
        h.processor
            .process(inbound(InboundContent::ButtonReply {
                id: "I want to attend event with ID: 9".into(),
                title: "Select".into(),
            }))
            .await
            .unwrap();

        assert_eq!(h.backend.calls(), vec!["ticket_tiers:9".to_owned()]);
        let turns = h.history.read(USER).await.unwrap();
        assert_eq!(states(&turns), vec![ConversationState::EventSelected; 4]);
        assert_eq!(h.channel.texts().len(), 1);
    }

    #[tokio::test]
    async fn button_reply_requires_select_event_call() {
        let button = || {
            inbound(InboundContent::ButtonReply {
                id: "I want to attend event with ID: 9".into(),
                title: "Select".into(),
            })
        };

        let h = harness(vec![MockLlm::text("Sure!")], MockBackend::default(), MockChannel::default());
        let err = h.processor.process(button()).await.unwrap_err();
        assert!(matches!(err, Error::ExpectedFunctionCall));

        let h = harness(
            vec![MockLlm::call(FunctionCall::new("find_trending_events"))],
            MockBackend::default(),
            MockChannel::default(),
        );
        let err = h.processor.process(button()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::WrongFunctionCall { ref expected, ref received }
                if expected == "select_event" && received == "find_trending_events"
        ));
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_surfaces_after_persisting() {
        let h = harness(
            vec![MockLlm::text("hello there")],
            MockBackend::default(),
            MockChannel::failing_text(),
        );
        let err = h.processor.process(text("hi")).await.unwrap_err();
        assert!(matches!(err, Error::Delivery(_)));
        assert_eq!(h.history.read(USER).await.unwrap().len(), 2);
    }
}
