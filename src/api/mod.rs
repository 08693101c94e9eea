pub mod admin;
pub mod assembler;
pub mod openai;
pub mod sse;
pub mod types;
