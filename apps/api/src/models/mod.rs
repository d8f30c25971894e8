pub mod job;
pub mod resume;
pub mod user;

pub use job::{Job, JobOrigin, JobPatch, JobStatus};
pub use resume::{ExtractedResume, Resume, ResumeSection};
pub use user::UserSession;
