use common::utils::generation::GenerationRequest;

pub static ANSWER_SYSTEM_PROMPT: &str = "Use the provided context to answer the question as best as possible. If the context is only partially relevant, try to answer anyway. If there is truly no information, say so.";

/// Returned when the generator replies without usable text.
pub static FALLBACK_ANSWER: &str = "Sorry, no answer could be generated.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub content: String,
    /// Sources of the chunks placed in the prompt context, in context order.
    pub sources: Vec<String>,
}

pub fn create_user_message(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}

pub fn build_generation_request(
    context: &str,
    question: &str,
    temperature: f32,
) -> GenerationRequest {
    GenerationRequest {
        system: ANSWER_SYSTEM_PROMPT.to_string(),
        user: create_user_message(context, question),
        temperature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_carries_context_then_question() {
        assert_eq!(
            create_user_message("Source: manual\nAven is a company.", "What is Aven?"),
            "Context:\nSource: manual\nAven is a company.\n\nQuestion: What is Aven?"
        );
    }

    #[test]
    fn generation_request_uses_fixed_instruction() {
        let request = build_generation_request("ctx", "q", 0.7);

        assert_eq!(request.system, ANSWER_SYSTEM_PROMPT);
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
        assert!(request.user.ends_with("Question: q"));
    }
}
