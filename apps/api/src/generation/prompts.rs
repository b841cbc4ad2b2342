// Fixed conversation turns for cover letter generation. The configurable
// system / instructions / opening-message prompts come from the active
// `PromptConfig`; everything here is constant scaffolding between them.

use crate::llm_client::{ChatMessage, GenerationRequest};
use crate::prompt_config::PromptConfig;
use crate::records::models::Record;

pub const PERSONAL_INFO_PREFIX: &str = "Here is my info: ";
pub const ASK_FOR_JOB: &str = "Great! What job are you applying for?";
pub const JOB_LISTING_PREFIX: &str = "This is the job listing: ";
pub const ASK_FOR_TEMPLATE: &str = "Great! What letter template should use?";
pub const TEMPLATE_PREFIX: &str = "Here it is: ";

/// Renders the job listing block sent for one record.
pub fn job_listing(record: &Record) -> String {
    let mut listing = format!(
        "Company: {}\nPosition Title: {}\ndescription: {}",
        record.company, record.job_title, record.job_description
    );
    if !record.additional_info.trim().is_empty() {
        listing.push('\n');
        listing.push_str(&record.additional_info);
    }
    listing
}

/// Builds the eight-turn conversation for one record.
pub fn build_request(
    config: &PromptConfig,
    personal_info: &str,
    template: &str,
    record: &Record,
) -> GenerationRequest {
    GenerationRequest {
        messages: vec![
            ChatMessage::system(config.system_message.as_str()),
            ChatMessage::user(config.instructions.as_str()),
            ChatMessage::assistant(config.first_message.as_str()),
            ChatMessage::user(format!("{PERSONAL_INFO_PREFIX}{personal_info}")),
            ChatMessage::assistant(ASK_FOR_JOB),
            ChatMessage::user(format!("{JOB_LISTING_PREFIX}{}", job_listing(record))),
            ChatMessage::assistant(ASK_FOR_TEMPLATE),
            ChatMessage::user(format!("{TEMPLATE_PREFIX}{template}")),
        ],
    }
}
