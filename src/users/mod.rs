mod memory;
mod postgres;
mod repo;
mod repo_types;

pub use memory::MemoryUserRepository;
pub use postgres::PgUserRepository;
pub use repo::{RepoError, RepoResult, UserRepository};
pub use repo_types::{AttemptLimit, NewUser, User};
