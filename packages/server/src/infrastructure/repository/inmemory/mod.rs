//! InMemory Repository 実装

pub mod challenge;
pub mod user;

pub use challenge::InMemoryChallengeRepository;
pub use user::InMemoryUserRepository;
