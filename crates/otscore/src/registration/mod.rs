//! Registration state machine: wizard, review and the applicant registry

pub mod approval;
pub mod callback;
pub mod correlation;
pub mod dispatch;
pub mod events;
pub mod fee;
pub mod registry;
pub mod types;
pub mod validation;
pub mod wizard;

pub use approval::{ApprovalGate, Decision};
pub use callback::{CallbackCommand, CallbackKind};
pub use correlation::{CorrelationMap, ReplyTargets};
pub use dispatch::{route, Inbound, Route};
pub use events::{ChannelDirectory, ChannelInfo, EventBus, EventReceiver, RegistrationEvent, Submission};
pub use fee::{Fee, FeeSchedule};
pub use registry::{ApplicantStore, MemoryStore, Registry};
pub use types::{ApplicantFields, ApplicantId, ApplicantRecord, Status, Step};
pub use validation::{FieldRules, StepInput, ValidationError};
pub use wizard::{BackOutcome, StepOutcome, Wizard};
