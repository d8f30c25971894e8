// AI features: writing assistance, job matching, opportunity discovery,
// résumé import, avatar restyling and the coach chat.
// All model calls go through llm_client.

pub mod avatar;
pub mod coach;
pub mod handlers;
pub mod match_analysis;
pub mod opportunities;
pub mod prompts;
pub mod resume_import;
pub mod writing;
