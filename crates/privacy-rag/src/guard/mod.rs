//! Privacy guard: policy prompt construction and output post-processing
//!
//! The guard encodes the privacy policy as a fixed system instruction and
//! bounds the retrieved context by a character budget before anything reaches
//! a generation backend. Enforcement is instructional: the guard does not
//! classify intent or inspect generated output for leakage.

use crate::types::PromptMessage;

/// Separator between retrieved documents in the context block
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Character budget for the joined context block. Enforced here, before the
/// backend's own token-level bound, because the two operate at different
/// granularities and both are needed.
pub const MAX_CONTEXT_CHARS: usize = 4000;

/// Marker appended when the context block is cut at the budget
pub const TRUNCATION_MARKER: &str = "...[TRUNCATED]";

/// The exact refusal the assistant must reply with for personal-data requests
pub const PRIVACY_REFUSAL: &str =
    "[PRIVACY BLOCK] I cannot verify this individual's data due to privacy regulations.";

const SYSTEM_INSTRUCTION: &str = r#"You are a secure AI assistant.

CORE DIRECTIVE:
You have access to a context that may contain BOTH 'Cybersecurity CVEs' and 'Personal Data'.
Your specific duty is to filter information based on the USER'S INTENT.

RULES:
1. IF the User asks about a PERSON (Name, Bio, Details) AND the context contains that Personal Data:
   -> ACTION: REFUSE.
   -> RESPONSE: "[PRIVACY BLOCK] I cannot verify this individual's data due to privacy regulations."

2. IF the User asks about a CVE (Vulnerability, Technical Detail):
   -> ACTION: ANSWER detailedly using the context.
   -> IGNORE any Personal Data present in the context (do not mention it).

3. NEVER leak Personal Data (Phones, Emails, Address) under any circumstance.
"#;

/// Builds guarded generation requests and post-processes answers
pub struct PrivacyGuard;

impl PrivacyGuard {
    /// Build the two-message generation request: the fixed policy instruction
    /// and a user message carrying the bounded context plus the literal query.
    pub fn build_prompt(query: &str, retrieved_docs: &[String]) -> Vec<PromptMessage> {
        let mut context = retrieved_docs.join(CONTEXT_SEPARATOR);

        if context.chars().count() > MAX_CONTEXT_CHARS {
            context = context.chars().take(MAX_CONTEXT_CHARS).collect();
            context.push_str(TRUNCATION_MARKER);
        }

        let user_content = format!("CONTEXT:\n{}\n\nUSER REQUEST:\n{}\n", context, query);

        vec![
            PromptMessage::system(SYSTEM_INSTRUCTION),
            PromptMessage::user(user_content),
        ]
    }

    /// Trim incidental whitespace. No content inspection.
    pub fn post_process(generated: &str) -> String {
        generated.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn prompt_is_exactly_system_then_user() {
        let docs = vec!["doc one".to_string(), "doc two".to_string()];
        let messages = PrivacyGuard::build_prompt("a question", &docs);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("doc one\n---\ndoc two"));
        assert!(messages[1].content.ends_with("USER REQUEST:\na question\n"));
    }

    #[test]
    fn instruction_carries_the_exact_refusal() {
        let messages = PrivacyGuard::build_prompt("q", &[]);
        assert!(messages[0].content.contains(PRIVACY_REFUSAL));
    }

    #[test]
    fn short_context_is_not_truncated() {
        let docs = vec!["short".to_string()];
        let messages = PrivacyGuard::build_prompt("q", &docs);
        assert!(!messages[1].content.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn oversized_context_is_cut_at_the_budget() {
        let docs = vec!["x".repeat(3000), "y".repeat(3000)];
        let messages = PrivacyGuard::build_prompt("q", &docs);
        let content = &messages[1].content;

        assert!(content.contains(TRUNCATION_MARKER));

        // context block between the prelude and the user request
        let start = "CONTEXT:\n".len();
        let end = content.find("\n\nUSER REQUEST:").unwrap();
        let context_block = &content[start..end];
        assert_eq!(
            context_block.chars().count(),
            MAX_CONTEXT_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn post_process_trims_whitespace_only() {
        assert_eq!(PrivacyGuard::post_process("  an answer \n"), "an answer");
        assert_eq!(PrivacyGuard::post_process("kept [PRIVACY BLOCK] text"), "kept [PRIVACY BLOCK] text");
    }
}
