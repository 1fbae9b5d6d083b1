pub use token_protocol::{
    Connection, ErrorKind, ErrorView, InputField, PendingInput, SessionPhase, SessionSnapshot,
    TokenAction, TokenMetadata, TransactionResult,
};
