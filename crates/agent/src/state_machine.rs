//! The conversation state machine.
//!
//! A turn starts with user input and cycles between two active steps:
//! reasoning (one chain-wrapped model call) and tool execution (running
//! every tool the model requested). Single-step sessions never enter
//! tool execution; tool-augmented sessions may loop until the model
//! answers with text or the cycle cap is reached.
//!
//! Invariants:
//! - Messages append in chronological order; tool results land in the
//!   same order the model requested them.
//! - Exactly one model call per reasoning step.
//! - A turn always ends with assistant text, even at the cycle cap.

use chatloom_core::model::ModelRequest;
use chatloom_core::{Conversation, Error, Message};
use chatloom_gateway::ToolGateway;
use chatloom_middleware::{Chain, ChainOutput};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Reply substituted when a turn hits the tool cycle cap.
pub const CYCLE_CAP_NOTICE: &str = "I've reached the maximum number of tool execution cycles \
     for this turn. Please try a narrower request.";

/// Where the state machine is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start,
    Reasoning,
    ToolExec,
    End,
}

/// The shape of the session's graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// One reasoning step, then end. Tool requests are impossible
    /// because no tools are advertised.
    SingleStep,

    /// Reasoning may hand off to tool execution and back.
    ToolAugmented,
}

/// Pure transition function over the step graph.
pub fn next_step(topology: Topology, current: Step, wants_tools: bool) -> Step {
    match (current, topology) {
        (Step::Start, _) => Step::Reasoning,
        (Step::Reasoning, Topology::ToolAugmented) if wants_tools => Step::ToolExec,
        (Step::Reasoning, _) => Step::End,
        (Step::ToolExec, _) => Step::Reasoning,
        (Step::End, _) => Step::End,
    }
}

/// The outcome of one completed turn.
#[derive(Debug)]
pub struct TurnReport {
    /// The final assistant text.
    pub reply: String,

    /// How many tool execution cycles ran.
    pub cycles: u32,

    /// Warnings surfaced by middleware stages during the turn.
    pub warnings: Vec<String>,
}

/// Drives turns for one session.
pub struct StateMachine {
    chain: Chain,
    model_name: String,
    gateway: Arc<ToolGateway>,
    topology: Topology,
    max_cycles: u32,
    events: Option<mpsc::UnboundedSender<Message>>,
}

impl StateMachine {
    pub fn new(
        chain: Chain,
        model_name: impl Into<String>,
        gateway: Arc<ToolGateway>,
        topology: Topology,
        max_cycles: u32,
    ) -> Self {
        Self {
            chain,
            model_name: model_name.into(),
            gateway,
            topology,
            max_cycles,
            events: None,
        }
    }

    /// Stream every appended message to the given channel as it lands.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<Message>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    fn push(&self, conversation: &mut Conversation, message: Message) {
        if let Some(events) = &self.events {
            let _ = events.send(message.clone());
        }
        conversation.push(message);
    }

    async fn reason(&self, conversation: &Conversation) -> Result<ChainOutput, Error> {
        let mut request = ModelRequest::new(&self.model_name, conversation.messages.clone());
        if self.topology == Topology::ToolAugmented {
            request = request.with_tools(self.gateway.definitions());
        }
        self.chain.invoke(request).await
    }

    /// Run one full turn: append the user input, cycle through reasoning
    /// and tool execution, and return when assistant text lands.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
    ) -> Result<TurnReport, Error> {
        self.push(conversation, Message::user(input));

        let mut step = next_step(self.topology, Step::Start, false);
        let mut cycles = 0u32;
        let mut warnings = Vec::new();

        loop {
            debug_assert_eq!(step, Step::Reasoning);

            let output = self.reason(conversation).await?;
            warnings.extend(output.warnings);

            let wants_tools = output.message.wants_tools();
            let requests = output.message.tool_calls.clone();
            self.push(conversation, output.message);

            step = next_step(self.topology, Step::Reasoning, wants_tools);
            if step == Step::End {
                let reply = conversation
                    .last_assistant()
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                info!(cycles, "Turn completed");
                return Ok(TurnReport {
                    reply,
                    cycles,
                    warnings,
                });
            }

            cycles += 1;
            if cycles > self.max_cycles {
                warn!(max_cycles = self.max_cycles, "Tool cycle cap reached");
                self.push(conversation, Message::assistant(CYCLE_CAP_NOTICE));
                return Ok(TurnReport {
                    reply: CYCLE_CAP_NOTICE.into(),
                    cycles: cycles - 1,
                    warnings,
                });
            }

            debug!(cycle = cycles, tools = requests.len(), "Executing requested tools");

            // Run the requested tools concurrently, then fold results back
            // in request order.
            let invocations = requests
                .iter()
                .map(|r| self.gateway.invoke(&r.name, &r.query));
            let results = futures::future::join_all(invocations).await;

            for (request, result) in requests.into_iter().zip(results) {
                self.push(
                    conversation,
                    Message::tool_result(request.id, result.into_content()),
                );
            }

            step = next_step(self.topology, Step::ToolExec, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatloom_core::message::Role;
    use chatloom_core::model::{Model, ModelResponse};
    use chatloom_core::{ModelError, ToolCallRequest, ToolDescriptor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed sequence of responses, then repeats the last one.
    struct ScriptedModel {
        responses: Mutex<Vec<Message>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Message>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Model for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let message = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            Ok(ModelResponse {
                message,
                model: "scripted-model".into(),
                usage: None,
            })
        }
    }

    fn tool_call(name: &str, query: &str) -> Message {
        Message::tool_request(vec![ToolCallRequest {
            id: "call_1".into(),
            name: name.into(),
            query: query.into(),
        }])
    }

    fn machine(model: Arc<ScriptedModel>, gateway: ToolGateway, topology: Topology) -> StateMachine {
        StateMachine::new(
            Chain::new(model),
            "scripted-model",
            Arc::new(gateway),
            topology,
            10,
        )
    }

    #[test]
    fn transitions_cover_the_graph() {
        use Topology::*;
        assert_eq!(next_step(SingleStep, Step::Start, false), Step::Reasoning);
        assert_eq!(next_step(SingleStep, Step::Reasoning, true), Step::End);
        assert_eq!(next_step(ToolAugmented, Step::Reasoning, false), Step::End);
        assert_eq!(
            next_step(ToolAugmented, Step::Reasoning, true),
            Step::ToolExec
        );
        assert_eq!(next_step(ToolAugmented, Step::ToolExec, false), Step::Reasoning);
        assert_eq!(next_step(ToolAugmented, Step::End, true), Step::End);
    }

    #[tokio::test]
    async fn single_step_turn_is_one_model_call() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant(
            "Hello! How can I help you today?",
        )]));
        let sm = machine(Arc::clone(&model), ToolGateway::new(30), Topology::SingleStep);

        let mut conversation = Conversation::new();
        let report = sm.run_turn(&mut conversation, "Hello").await.unwrap();

        assert_eq!(report.reply, "Hello! How can I help you today?");
        assert_eq!(report.cycles, 0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, Role::User);
        assert_eq!(conversation.messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn tool_turn_folds_results_in_order() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_call("mcp_echo", "what is rust"),
            Message::assistant("Rust is a systems programming language."),
        ]));

        let mut gateway = ToolGateway::new(30);
        gateway
            .register(
                ToolDescriptor::new("mcp_echo", "sh")
                    .with_args(vec!["-c".into(), "printf 'tool says hi'".into()]),
            )
            .unwrap();

        let sm = machine(Arc::clone(&model), gateway, Topology::ToolAugmented);
        let mut conversation = Conversation::new();
        let report = sm
            .run_turn(&mut conversation, "Tell me about Rust")
            .await
            .unwrap();

        assert_eq!(report.reply, "Rust is a systems programming language.");
        assert_eq!(report.cycles, 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);

        // user, assistant(tool request), tool result, assistant text
        let roles: Vec<Role> = conversation.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(conversation.messages[2].content, "tool says hi");
        assert_eq!(conversation.messages[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn concurrent_tool_results_land_in_request_order() {
        // Two requests in one reasoning output: the first tool is slower
        // than the second, so completion order inverts request order.
        let model = Arc::new(ScriptedModel::new(vec![
            Message::tool_request(vec![
                ToolCallRequest {
                    id: "call_1".into(),
                    name: "mcp_slow".into(),
                    query: "first".into(),
                },
                ToolCallRequest {
                    id: "call_2".into(),
                    name: "mcp_fast".into(),
                    query: "second".into(),
                },
            ]),
            Message::assistant("Both tools answered."),
        ]));

        let mut gateway = ToolGateway::new(30);
        gateway
            .register(
                ToolDescriptor::new("mcp_slow", "sh")
                    .with_args(vec!["-c".into(), "sleep 0.3; printf 'slow result'".into()]),
            )
            .unwrap();
        gateway
            .register(
                ToolDescriptor::new("mcp_fast", "sh")
                    .with_args(vec!["-c".into(), "printf 'fast result'".into()]),
            )
            .unwrap();

        let sm = machine(Arc::clone(&model), gateway, Topology::ToolAugmented);
        let mut conversation = Conversation::new();
        let report = sm.run_turn(&mut conversation, "run both").await.unwrap();

        assert_eq!(report.reply, "Both tools answered.");
        assert_eq!(report.cycles, 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);

        let roles: Vec<Role> = conversation.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Tool,
                Role::Assistant
            ]
        );
        assert_eq!(conversation.messages[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(conversation.messages[2].content, "slow result");
        assert_eq!(conversation.messages[3].tool_call_id.as_deref(), Some("call_2"));
        assert_eq!(conversation.messages[3].content, "fast result");
    }

    #[tokio::test]
    async fn failed_tool_becomes_error_message_and_turn_continues() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_call("mcp_missing", "anything"),
            Message::assistant("I could not reach that tool, sorry."),
        ]));

        let sm = machine(Arc::clone(&model), ToolGateway::new(30), Topology::ToolAugmented);
        let mut conversation = Conversation::new();
        let report = sm.run_turn(&mut conversation, "go").await.unwrap();

        assert_eq!(report.reply, "I could not reach that tool, sorry.");
        assert!(conversation.messages[2].content.starts_with("Error:"));
    }

    #[tokio::test]
    async fn cycle_cap_ends_turn_with_notice() {
        // The model always wants tools; the cap must break the loop.
        let model = Arc::new(ScriptedModel::new(vec![tool_call("mcp_echo", "again")]));

        let mut gateway = ToolGateway::new(30);
        gateway
            .register(
                ToolDescriptor::new("mcp_echo", "sh")
                    .with_args(vec!["-c".into(), "printf 'more'".into()]),
            )
            .unwrap();

        let sm = StateMachine::new(
            Chain::new(Arc::clone(&model) as Arc<dyn Model>),
            "scripted-model",
            Arc::new(gateway),
            Topology::ToolAugmented,
            2,
        );

        let mut conversation = Conversation::new();
        let report = sm.run_turn(&mut conversation, "loop forever").await.unwrap();

        assert_eq!(report.reply, CYCLE_CAP_NOTICE);
        assert_eq!(report.cycles, 2);
        // cap + 1 reasoning calls happened, then the canned notice
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            conversation.last_assistant().unwrap().content,
            CYCLE_CAP_NOTICE
        );
    }

    #[tokio::test]
    async fn events_stream_every_message() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant(
            "Streaming reply for the event channel.",
        )]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sm = machine(model, ToolGateway::new(30), Topology::SingleStep).with_events(tx);

        let mut conversation = Conversation::new();
        sm.run_turn(&mut conversation, "Hello").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().role, Role::User);
        assert_eq!(rx.recv().await.unwrap().role, Role::Assistant);
    }
}
