//! Prompts for contract analysis and legal chat.
//!
//! Both prompts end with the contract text, cut to [`CONTRACT_CHAR_LIMIT`]
//! characters. Everything before it is fixed apart from the client profile.

use lexai_core::{truncate_chars, AnalysisProfile, UserProfileContext};

/// Most contract characters ever placed in a prompt.
pub const CONTRACT_CHAR_LIMIT: usize = 30_000;

/// Synthetic model turn that follows the chat system context.
pub const CHAT_ACKNOWLEDGEMENT: &str =
    "Understood. I am ready to provide legal guidance or analyze the contract. How can I assist you today?";

/// Reply format the analysis prompt asks for.
///
/// Must stay in step with `analysis_result.schema.json` in lexai-core.
const ANALYSIS_OUTPUT_FORMAT: &str = r#"{
    "summary": "A brief 2-sentence executive summary.",
    "overall_risk_score": (integer 0-100),
    "clauses": [
        {
            "clause_type": "Name of clause",
            "risk_level": "High/Medium/Low",
            "text_snippet": "Exact quote from text",
            "reasoning": "Explanation relative to {industry} standards.",
            "recommendation": "Brief suggestion."
        }
    ]
}"#;

/// Opening of the chat system context, before any user profile.
const CHAT_PERSONA: &str = r#"You are an expert lawyer and legal assistant. You are capable of answering general legal questions, providing guidance on legal principles, and analyzing specific contracts.

If the user asks a general legal question, answer it clearly and professionally as a lawyer would.
If the user asks about the contract provided below, refer explicitly to its clauses and answer based on the text.

Always maintain a professional, knowledgeable, and helpful tone."#;

const PERSONALIZATION_INSTRUCTION: &str =
    "Please personalize your responses based on this user's profile when relevant.";

/// Build the single-shot analysis prompt.
pub fn build_analysis_prompt(contract_text: &str, profile: &AnalysisProfile) -> String {
    let output_format = ANALYSIS_OUTPUT_FORMAT.replace("{industry}", &profile.industry);

    format!(
        r#"You are an expert Legal Risk Analyst acting as a copilot for a client in the '{industry}' industry.
Their risk tolerance is '{risk_tolerance}'. Their role in this contract is '{role}'.

Analyze the following contract text. Identify key clauses and assess their risk strictly based on the client's profile.

CRITICAL INSTRUCTION:
Return the output ONLY as a valid JSON object matching this structure:
{output_format}

Contract Text:
{contract}
"#,
        industry = profile.industry,
        risk_tolerance = profile.risk_tolerance,
        role = profile.role,
        output_format = output_format,
        contract = truncate_chars(contract_text, CONTRACT_CHAR_LIMIT),
    )
}

/// Build the context sent as the first user turn of every chat.
pub fn build_chat_system_context(
    contract_context: &str,
    user_context: Option<&UserProfileContext>,
) -> String {
    let mut context = String::from(CHAT_PERSONA);

    if let Some(profile) = user_context.and_then(render_user_profile) {
        context.push_str(&profile);
    }

    context.push_str("\n\n---\nPROVIDED CONTRACT TEXT (if any):\n");
    context.push_str(truncate_chars(contract_context, CONTRACT_CHAR_LIMIT));
    context.push_str("\n---\n");
    context
}

/// `USER PROFILE:` block, or `None` when no field would be rendered.
fn render_user_profile(user: &UserProfileContext) -> Option<String> {
    let fields = user.prompt_fields();
    if fields.is_empty() {
        return None;
    }

    let lines: Vec<String> = fields
        .iter()
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect();

    Some(format!(
        "\n\nUSER PROFILE:\n{}\n\n{}",
        lines.join("\n"),
        PERSONALIZATION_INSTRUCTION
    ))
}
