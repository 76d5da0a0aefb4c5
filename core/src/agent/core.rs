//! Agent Core Implementation
use crate::agent::tool::Tool;
use crate::llm::{
    chat::{ChatMessage, ChatRequest, MessageRole},
    LlmClient, TokenUsage,
};
use anyhow::{anyhow, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Approximate token budget for the conversation history.
const CONTEXT_TOKEN_BUDGET: usize = 100_000;

/// The decision made by the agent after a step.
#[derive(Debug, Clone)]
pub enum AgentDecision {
    /// The LLM produced a text response (final answer or intermediate thought).
    Message(String, TokenUsage),
    /// The LLM wants to execute a tool.
    Action { tool: String, args: String },
    /// The agent has reached maximum iterations or an error occurred.
    Error(String),
}

/// The core Agent that manages the agentic loop.
pub struct Agent {
    llm_client: Arc<LlmClient>,
    tools: HashMap<String, Box<dyn Tool>>,
    max_iterations: usize,
    system_prompt_prefix: String,

    // State maintained between steps
    history: Vec<ChatMessage>,
    iteration_count: usize,
    total_usage: TokenUsage,
    pending_decision: Option<AgentDecision>,

    // Safety tracking
    last_tool_call: Option<(String, String)>,
    repetition_count: usize,
}

impl Agent {
    /// Create a new Agent with the provided LLM client and tools.
    pub fn new(
        client: Arc<LlmClient>,
        tools: Vec<Box<dyn Tool>>,
        system_prompt_prefix: String,
    ) -> Self {
        Self::with_max_iterations(client, tools, system_prompt_prefix, 10)
    }

    pub fn with_max_iterations(
        client: Arc<LlmClient>,
        tools: Vec<Box<dyn Tool>>,
        system_prompt_prefix: String,
        max_iterations: usize,
    ) -> Self {
        let mut tool_map = HashMap::new();
        for tool in tools {
            tool_map.insert(tool.name().to_string(), tool);
        }

        Self {
            llm_client: client,
            tools: tool_map,
            max_iterations,
            system_prompt_prefix,
            history: Vec::new(),
            iteration_count: 0,
            total_usage: TokenUsage::default(),
            pending_decision: None,
            last_tool_call: None,
            repetition_count: 0,
        }
    }

    /// Check if the agent has a pending decision to be returned.
    pub fn has_pending_decision(&self) -> bool {
        self.pending_decision.is_some()
    }

    /// Total token usage accumulated so far.
    pub fn total_usage(&self) -> &TokenUsage {
        &self.total_usage
    }

    /// Reset the agent's state for a new task.
    pub fn reset(&mut self, history: Vec<ChatMessage>) {
        self.history = history;
        self.iteration_count = 0;
        self.total_usage = TokenUsage::default();
        self.pending_decision = None;
        self.last_tool_call = None;
        self.repetition_count = 0;

        // Ensure system prompt is present
        if self.history.is_empty() || self.history[0].role != MessageRole::System {
            self.history
                .insert(0, ChatMessage::system(self.generate_system_prompt()));
        }
    }

    /// Perform a single step in the agentic loop.
    pub async fn step(&mut self, observation: Option<String>) -> Result<AgentDecision> {
        // 1. Hard iteration limit check
        if self.iteration_count >= self.max_iterations {
            return Ok(AgentDecision::Error(format!(
                "Maximum iteration limit ({}) reached. Task aborted to prevent infinite loop.",
                self.max_iterations
            )));
        }

        // 2. Return pending decision if we have one (an Action queued after a Thought)
        if let Some(decision) = self.pending_decision.take() {
            return Ok(decision);
        }

        if let Some(obs) = observation {
            self.history
                .push(ChatMessage::user(format!("Observation: {}", obs)));
        }

        self.history = prune_history(std::mem::take(&mut self.history), CONTEXT_TOKEN_BUDGET);

        let request = ChatRequest::new(self.llm_client.model().to_string(), self.history.clone());
        let response = self.llm_client.chat(&request).await?;
        let content = response.content;

        if let Some(usage) = &response.usage {
            self.total_usage.prompt_tokens += usage.prompt_tokens;
            self.total_usage.completion_tokens += usage.completion_tokens;
            self.total_usage.total_tokens += usage.total_tokens;
        }

        self.iteration_count += 1;

        // Parse the ReAct format
        let action_re = Regex::new(r"Action:\s*(.*)")?;
        let action_input_re = Regex::new(r"Action Input:\s*(.*)")?;

        let action = action_re.captures(&content).map(|c| c[1].trim().to_string());
        let action_input = action_input_re
            .captures(&content)
            .map(|c| c[1].trim().to_string());

        if let (Some(tool_name), Some(args)) = (action, action_input) {
            // Repetition check
            if let Some((last_tool, last_args)) = &self.last_tool_call {
                if *last_tool == tool_name && *last_args == args {
                    self.repetition_count += 1;
                    if self.repetition_count >= 3 {
                        return Ok(AgentDecision::Error(format!(
                            "Detected repeated tool call to '{}' with identical arguments. Breaking loop.",
                            tool_name
                        )));
                    }
                } else {
                    self.repetition_count = 0;
                }
            }
            self.last_tool_call = Some((tool_name.clone(), args.clone()));

            // If the content also contains "Final Answer:", prioritize the answer
            if content.contains("Final Answer:") {
                self.history.push(ChatMessage::assistant(content.clone()));
                return Ok(AgentDecision::Message(content, self.total_usage.clone()));
            }

            self.history.push(ChatMessage::assistant(content.clone()));

            let action_decision = AgentDecision::Action {
                tool: tool_name,
                args,
            };

            // Everything before "Action:" is the Thought; surface it first
            if let Some(pos) = content.find("Action:") {
                let thought = content[..pos].trim().to_string();
                if !thought.is_empty() {
                    self.pending_decision = Some(action_decision);
                    return Ok(AgentDecision::Message(thought, self.total_usage.clone()));
                }
            }

            return Ok(action_decision);
        }

        // Final answer or just a message
        self.history.push(ChatMessage::assistant(content.clone()));
        Ok(AgentDecision::Message(content, self.total_usage.clone()))
    }

    /// Drive the agentic loop to completion: execute tool calls, feed
    /// observations back, and return the final answer with token usage.
    pub async fn run(&mut self, history: Vec<ChatMessage>) -> Result<(String, TokenUsage)> {
        self.reset(history);

        let mut last_observation = None;

        loop {
            match self.step(last_observation.take()).await? {
                AgentDecision::Message(msg, usage) => {
                    if self.has_pending_decision() {
                        debug!(thought = %msg, "agent thought");
                        continue;
                    }
                    return Ok((msg, usage));
                }
                AgentDecision::Action { tool, args } => {
                    info!(%tool, "executing tool");
                    let observation = match self.tools.get(&tool) {
                        Some(t) => match t.call(&args).await {
                            Ok(output) => output,
                            Err(e) => {
                                warn!(%tool, error = %e, "tool call failed");
                                format!("Error: {}", e)
                            }
                        },
                        None => format!("Error: Tool '{}' not found.", tool),
                    };
                    debug!(%tool, observation = %truncate(&observation, 1000), "observation");
                    last_observation = Some(observation);
                }
                AgentDecision::Error(e) => return Err(anyhow!(e)),
            }
        }
    }

    /// Generate the system prompt with available tools and ReAct instructions.
    fn generate_system_prompt(&self) -> String {
        let mut tools_desc = String::new();
        for tool in self.tools.values() {
            tools_desc.push_str(&format!(
                "- {}: {}\n  Usage: {}\n",
                tool.name(),
                tool.description(),
                tool.usage()
            ));
        }

        format!(
            "{}\n\n\
            # Operational Protocol (ReAct)\n\
            You have access to the following tools:\n\n\
            {}\n\
            Use the following format:\n\n\
            Question: the input question you must answer\n\
            Thought: you should always think about what to do\n\
            Action: the action to take, should be one of [{}]\n\
            Action Input: the input to the action\n\
            Observation: the result of the action (STOP after providing Action Input and wait for this)\n\
            ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
            Thought: I now know the final answer\n\
            Final Answer: the final answer to the original input question\n\n\
            IMPORTANT: After providing an Action and Action Input, you MUST stop generating and \
            wait for the Observation. Do not hallucinate or predict the Observation. You MUST use \
            the tools to interact with the system.\n\n\
            Begin!",
            self.system_prompt_prefix,
            tools_desc,
            self.tools.keys().cloned().collect::<Vec<_>>().join(", ")
        )
    }
}

/// Prune history to stay within an approximate token budget, keeping the
/// system prompt and the most recent messages.
fn prune_history(history: Vec<ChatMessage>, limit: usize) -> Vec<ChatMessage> {
    if history.len() <= 1 {
        return history;
    }

    let total_chars: usize = history.iter().map(|msg| msg.content.len()).sum();
    let approx_tokens = total_chars / 4;
    if approx_tokens <= limit {
        return history;
    }

    let system_msg = history[0].clone();
    let mut pruned = vec![system_msg.clone()];

    let mut current_tokens = system_msg.content.len() / 4;
    let mut to_keep = Vec::new();

    // Iterate backwards to keep the most recent messages
    for msg in history.iter().skip(1).rev() {
        let msg_tokens = msg.content.len() / 4;
        if current_tokens + msg_tokens < limit {
            to_keep.push(msg.clone());
            current_tokens += msg_tokens;
        } else {
            break;
        }
    }

    to_keep.reverse();

    // Strict APIs (Gemini included) reject a conversation that resumes on an
    // assistant turn right after the system prompt.
    while !to_keep.is_empty() && to_keep[0].role != MessageRole::User {
        to_keep.remove(0);
    }

    pruned.extend(to_keep);
    pruned
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(idx, _)| *idx < max_len)
            .last()
            .map(|(idx, ch)| idx + ch.len_utf8())
            .unwrap_or(0);
        format!("{}... [truncated]", &s[..cut])
    }
}
