//! Message builders for the three pipeline stages.
//!
//! Each builder returns exactly two messages, system then user. Upstream
//! stage output is embedded verbatim; nothing here parses or validates it.

use copilot_shared::Message;

/// Inputs shared by every stage's prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    /// Business named in the personas, e.g. "Olivetto olive oil importers".
    pub company: &'a str,
    pub customer_email: &'a str,
    pub knowledge: &'a str,
}

impl<'a> PromptInputs<'a> {
    pub fn new(company: &'a str, customer_email: &'a str, knowledge: &'a str) -> Self {
        Self {
            company,
            customer_email,
            knowledge,
        }
    }

    /// Grounded JSON draft answer.
    pub fn draft_messages(&self) -> Vec<Message> {
        let system = format!(
            "You are a customer support assistant responding to customers emailing the help center for {company}.\n\
             Send a polite response to the customer.\n\
             If they ask questions, use ONLY the provided Knowledge Base context.\n\
             If the KB does not contain enough information to answer safely, you may ask 1-2 clarifying questions.\n\
             Return your response in JSON with keys:\n  \
             short_answer, needs_clarification (true/false), clarifying_questions (array), kb_quotes (array of exact quotes used)\n",
            company = self.company,
        );
        let user = format!(
            "CUSTOMER EMAIL:\n{email}\n\n\
             KNOWLEDGE BASE (use as grounding context):\n{kb}\n",
            email = self.customer_email,
            kb = self.knowledge,
        );
        vec![Message::system(system), Message::user(user)]
    }

    /// QA review of `draft` with a closed-set verdict.
    pub fn review_messages(&self, draft: &str) -> Vec<Message> {
        let system = format!(
            "You are a strict support QA reviewer analyzing replies sent to customers who have emailed the help center for {company}.\n\
             Check the draft for:\n\
             1) Unsupported claims (not in KB)\n\
             2) Missing/weak grounding (should quote KB)\n\
             3) Tone issues (too cold, too verbose, too apologetic)\n\
             Return JSON with keys:\n  \
             unsupported_claims (array), missing_grounding (array), tone_notes (array), recommended_changes (array), verdict (\"ok\"|\"needs_human\"|\"revise\")\n",
            company = self.company,
        );
        let user = format!(
            "CUSTOMER EMAIL:\n{email}\n\n\
             KNOWLEDGE BASE:\n{kb}\n\n\
             DRAFT ANSWER JSON:\n{draft}\n",
            email = self.customer_email,
            kb = self.knowledge,
        );
        vec![Message::system(system), Message::user(user)]
    }

    /// Plain email body incorporating the review.
    pub fn final_email_messages(&self, draft: &str, review: &str) -> Vec<Message> {
        let system = format!(
            "You are a customer support agent writing the final reply to the customer who emailed the help center for {company}.\n\
             Use the KB for all factual/policy statements.\n\
             Incorporate reviewer feedback.\n\
             Keep it concise, warm, and actionable.\n\
             Output ONLY the email body (no JSON).",
            company = self.company,
        );
        let user = format!(
            "CUSTOMER EMAIL:\n{email}\n\n\
             KNOWLEDGE BASE:\n{kb}\n\n\
             DRAFT ANSWER JSON:\n{draft}\n\n\
             REVIEW JSON:\n{review}\n",
            email = self.customer_email,
            kb = self.knowledge,
        );
        vec![Message::system(system), Message::user(user)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_shared::Role;

    const COMPANY: &str = "Olivetto olive oil importers";
    const EMAIL: &str = "Where is my order?";
    const KB: &str = "### FILE: shipping.md\nOrders ship within 2 business days.";

    fn inputs() -> PromptInputs<'static> {
        PromptInputs::new(COMPANY, EMAIL, KB)
    }

    fn assert_system_then_user(messages: &[Message]) {
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn draft_prompt_embeds_email_and_kb() {
        let messages = inputs().draft_messages();
        assert_system_then_user(&messages);

        let system = messages[0].text();
        assert!(system.contains(COMPANY));
        assert!(system.contains("use ONLY the provided Knowledge Base"));
        for key in ["short_answer", "needs_clarification", "clarifying_questions", "kb_quotes"] {
            assert!(system.contains(key), "missing key {key}");
        }

        let user = messages[1].text();
        assert!(user.starts_with("CUSTOMER EMAIL:\nWhere is my order?\n\n"));
        assert!(user.contains(KB));
    }

    #[test]
    fn review_prompt_embeds_draft_verbatim() {
        let draft = "not even json {";
        let messages = inputs().review_messages(draft);
        assert_system_then_user(&messages);

        let system = messages[0].text();
        assert!(system.contains(r#"verdict ("ok"|"needs_human"|"revise")"#));
        assert!(system.contains("Unsupported claims"));

        let user = messages[1].text();
        assert!(user.contains(EMAIL));
        assert!(user.contains(KB));
        assert!(user.ends_with("DRAFT ANSWER JSON:\nnot even json {\n"));
    }

    #[test]
    fn final_prompt_embeds_all_artifacts() {
        let messages = inputs().final_email_messages(r#"{"short_answer":"soon"}"#, "");
        assert_system_then_user(&messages);

        assert!(messages[0].text().ends_with("Output ONLY the email body (no JSON)."));

        let user = messages[1].text();
        assert!(user.contains(EMAIL));
        assert!(user.contains(KB));
        assert!(user.contains("DRAFT ANSWER JSON:\n{\"short_answer\":\"soon\"}\n\n"));
        assert!(user.ends_with("REVIEW JSON:\n\n"));
    }

    #[test]
    fn builders_are_pure() {
        assert_eq!(inputs().draft_messages(), inputs().draft_messages());
        assert_eq!(inputs().review_messages("d"), inputs().review_messages("d"));
    }
}
