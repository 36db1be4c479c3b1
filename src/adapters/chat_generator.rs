//! [`ScheduleGenerator`] backed by an OpenAI-compatible chat-completions API.

use crate::adapters::schedule_document::ScheduleDocument;
use crate::config::toml_config::GeneratorConfig;
use crate::core::equivalence::equivalence_partner;
use crate::domain::model::TermPlan;
use crate::domain::ports::{GenerationRequest, ScheduleGenerator};
use crate::utils::error::{PlannerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;

const MAX_PROMPT_COURSES: usize = 20;

const SYSTEM_PROMPT: &str = "You are an expert academic advisor specializing in college transfer \
planning. Always respond with valid JSON only.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletionGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: 0.9,
        };

        let mut http = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        tracing::debug!("Calling chat endpoint: {}", self.endpoint);
        let response = http.send().await?;
        let status = response.status();
        tracing::debug!("Chat response status: {}", status);
        if !status.is_success() {
            return Err(PlannerError::generator(format!(
                "chat endpoint returned HTTP {}",
                status
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| PlannerError::generator("chat response has no message content"))
    }
}

#[async_trait]
impl ScheduleGenerator for ChatCompletionGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<TermPlan> {
        let prompt = build_prompt(&request);
        let content = self.complete(&prompt).await?;

        let document = ScheduleDocument::from_json_str(strip_code_fence(&content))
            .map_err(|e| PlannerError::generator(format!("unparseable schedule: {}", e)))?;
        let plan = document.into_term_plan()?;

        tracing::info!(
            "🤖 Generator '{}' proposed {} courses ({} units)",
            self.model,
            plan.courses.len(),
            plan.total_units
        );
        Ok(plan)
    }
}

/// Removes a surrounding ```json … ``` fence if the model added one.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn build_prompt(request: &GenerationRequest<'_>) -> String {
    let ctx = request.context;
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "Create a course schedule for ONE term for a student planning to transfer.\n"
    );
    let _ = writeln!(prompt, "STUDENT PROFILE:");
    let _ = writeln!(
        prompt,
        "- Current Institution: {} (PLAN COURSES FROM HERE ONLY)",
        ctx.source_institution
    );
    let _ = writeln!(
        prompt,
        "- Target Institution: {} (DO NOT plan courses from here)",
        ctx.target_institution
    );
    let _ = writeln!(prompt, "- Major: {}", ctx.major);
    let _ = writeln!(prompt, "- Planning Term: {}", ctx.term_label);
    let _ = writeln!(prompt, "- Target Units: {}\n", ctx.target_units.normalize());

    let _ = writeln!(prompt, "COMPLETED COURSES:");
    if request.completed.is_empty() {
        let _ = writeln!(prompt, "No completed courses on record.");
    }
    for course in request.completed {
        let grade = course.grade.as_deref().unwrap_or("N/A");
        let _ = writeln!(
            prompt,
            "- {} (also counts as {}), Grade: {}",
            course.code.trim(),
            equivalence_partner(&course.code),
            grade
        );
    }

    let _ = writeln!(
        prompt,
        "\nAVAILABLE COURSES AT {} (choose from these only):",
        ctx.source_institution
    );
    for course in request.available.iter().take(MAX_PROMPT_COURSES) {
        let _ = writeln!(
            prompt,
            "- {}: {} ({} units)",
            course.code,
            if course.title.is_empty() {
                &course.code
            } else {
                &course.title
            },
            course.units.normalize()
        );
    }
    if request.available.len() > MAX_PROMPT_COURSES {
        let _ = writeln!(
            prompt,
            "- ... and {} more",
            request.available.len() - MAX_PROMPT_COURSES
        );
    }

    if !request.exceptions.is_empty() {
        let _ = writeln!(prompt, "\nSPECIAL REQUIREMENTS (cannot be taken before transfer):");
        for exception in request.exceptions {
            let _ = writeln!(prompt, "- {}", exception.message);
        }
    }

    let _ = writeln!(
        prompt,
        "\nINSTRUCTIONS:\n\
         1. Select courses ONLY from {src}, never from {tgt}.\n\
         2. Select courses totaling approximately {units} units.\n\
         3. Avoid multiple courses from the same subject in one term (e.g. not MATH 1A and MATH 1B together).\n\
         4. Courses ending with \"H\" are honors versions equivalent to the regular course; choose one or the other, never both, and never one whose partner is completed.\n\
         5. Mention special requirements in \"warnings\".\n\
         6. If only same-subject courses remain, add one course with code \"GE\" for the remaining units and advise choosing a transferable GE course from the {src} catalog.\n\
         7. \"total_units\" must equal the sum of the course units.",
        src = ctx.source_institution,
        tgt = ctx.target_institution,
        units = ctx.target_units.normalize()
    );

    let _ = writeln!(
        prompt,
        "\nREQUIRED OUTPUT FORMAT (JSON only, no additional text):\n\
         {{\"quarter\": {{\"quarter_name\": \"{term}\", \"courses\": [{{\"course_code\": \"PHYS 4A\", \
         \"course_name\": \"Physics I\", \"units\": 4, \"category\": \"Major Prerequisites\", \
         \"reason\": \"...\"}}], \"total_units\": 4, \"notes\": \"...\", \"warnings\": []}}, \
         \"recommendations\": []}}",
        term = ctx.term_label
    );

    prompt
}
