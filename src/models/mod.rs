pub mod analysis;
pub mod audit;
pub mod chat;
pub mod message;
pub mod report;

pub use analysis::{Analysis, NewAnalysis};
pub use audit::Audit;
pub use chat::{Chat, ChatState};
pub use message::{Message, Role};
pub use report::{AuditFinding, AuditFindingExample, AuditSlide, AuditTagCloud, Severity};
