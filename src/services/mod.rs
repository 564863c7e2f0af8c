//! Services for domain logic and external collaborators.

pub mod accounts;
pub mod connections;
pub mod media;
pub mod posts;
pub mod push;
pub mod search;

pub use accounts::AccountsService;
pub use connections::ConnectionService;
pub use media::MediaService;
pub use posts::PostService;
pub use push::PushService;
pub use search::SearchService;
