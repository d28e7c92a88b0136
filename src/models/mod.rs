pub mod dues;
pub mod invoice;
pub mod ledger;
pub mod user;
pub mod verification_token;

// Re-export common types
pub use dues::{
    CreateDuesRequest, DuesDefinition, DuesDefinitionResponse, DuesParticipant, NewDuesDefinition,
    NewDuesParticipant, ParticipantUpdateResponse, UpdateParticipantsRequest,
};
pub use invoice::{
    Invoice, InvoiceStatus, NewInvoice, ReviewDecision, ReviewInvoiceRequest, TransitionError,
    VerificationStatus,
};
pub use ledger::{EntryType, LedgerEntry, NewLedgerEntry};
pub use user::{
    CreateResidentRequest, CreateResidentResponse, LoginRequest, LoginResponse, NewUser, User,
    UserError, UserInfo, UserRole,
};
pub use verification_token::{
    ForgotPasswordRequest, NewVerificationToken, ResetPasswordRequest, TokenPurpose,
    VerificationToken, VerifyEmailRequest,
};
